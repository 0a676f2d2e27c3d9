mod cli;
mod clone;
mod observability;
mod output;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use dxdeploy_core::{DeployReport, Deployer};
use dxdeploy_db_postgres::{PgFixtureStoreFactory, PostgresConfig};
use tracing::warn;

use cli::Cli;
use output::print_error;

#[tokio::main]
async fn main() {
    // .env is optional
    if let Err(e) = dotenvy::dotenv()
        && !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
    {
        eprintln!("Warning: Failed to load .env file: {e}");
    }

    let cli = Cli::parse();
    observability::init_tracing(&cli.log_level);

    match run(&cli).await {
        Ok(report) if report.is_success() => {}
        Ok(_) => std::process::exit(1),
        Err(e) => {
            print_error(&format!("{e:#}"));
            std::process::exit(1);
        }
    }
}

async fn run(cli: &Cli) -> Result<DeployReport> {
    let config = cli.deploy_config();
    let database_url = config.database_url.clone();
    let mut deployer = Deployer::new(config).context("Invalid configuration")?;
    if let Some(url) = database_url {
        let config = PostgresConfig::new(url).with_connect_timeout_ms(cli.db_connect_timeout_ms);
        deployer = deployer.with_fixture_store(Arc::new(PgFixtureStoreFactory::new(config)));
    }

    let report = match cli.github_source() {
        Some(source) => {
            let parent = match &cli.directory {
                Some(dir) => dir.clone(),
                None => std::env::current_dir().context("Failed to read current directory")?,
            };
            let repository = clone::clone_repository(&source, &parent).await?;
            let result = deployer.deploy(repository.path()).await;
            if let Err(e) = repository.remove().await {
                warn!(error = %e, "Failed to clean up clone");
            }
            result?
        }
        None => deployer.deploy(&cli.project).await?,
    };

    output::print_summary(&report);
    Ok(report)
}
