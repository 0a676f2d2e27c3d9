use std::path::PathBuf;

use clap::{ArgAction, Parser};
use clap::builder::BoolishValueParser;
use dxdeploy_core::{DEFAULT_MAX_DEPTH, DEFAULT_TEST_COMMAND, DeployConfig};

use crate::clone::GithubSource;

#[derive(Parser, Debug)]
#[command(name = "dxdeploy")]
#[command(about = "Deploy a manifest project to the API")]
#[command(version)]
pub struct Cli {
    /// Project directory to deploy
    #[arg(default_value = ".")]
    pub project: PathBuf,

    /// API base URL, without the /api/<id> suffix
    #[arg(long, env = "API_BASE_URL")]
    pub base_url: String,

    /// Id of the API to deploy to
    #[arg(long, env = "API_ID")]
    pub api_id: String,

    /// Value of the Authorization header
    #[arg(long, env = "AUTH", hide_env_values = true)]
    pub auth: String,

    /// Deploy production env vars and skip tests
    #[arg(long, env = "PRODUCTION", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub production: bool,

    /// Fixture database URL, required when the project has tests manifests
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Database connection timeout in milliseconds
    #[arg(long, default_value_t = 5000)]
    pub db_connect_timeout_ms: u64,

    /// Command used to run test files; the file glob is appended
    #[arg(long, env = "DXDEPLOY_TEST_COMMAND", default_value = DEFAULT_TEST_COMMAND)]
    pub test_command: String,

    /// Maximum directory depth below the project root
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,

    /// GitHub user owning the repository to clone and deploy
    #[arg(long, requires = "github_repo")]
    pub github_user: Option<String>,

    /// GitHub repository to clone and deploy
    #[arg(long, requires = "github_user")]
    pub github_repo: Option<String>,

    /// Directory the repository is cloned into (defaults to the current directory)
    #[arg(long)]
    pub directory: Option<PathBuf>,

    /// Log level, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    pub fn deploy_config(&self) -> DeployConfig {
        DeployConfig::new(&self.base_url, &self.api_id, &self.auth)
            .with_production(self.production)
            .with_database_url(self.database_url.clone())
            .with_test_command(&self.test_command)
            .with_max_depth(self.max_depth)
    }

    pub fn github_source(&self) -> Option<GithubSource> {
        match (&self.github_user, &self.github_repo) {
            (Some(user), Some(repo)) => Some(GithubSource::new(user, repo)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: [&str; 7] = [
        "dxdeploy",
        "--base-url",
        "https://api.example.com",
        "--api-id",
        "7",
        "--auth",
        "token",
    ];

    fn parse(extra: &[&str]) -> Cli {
        Cli::try_parse_from(REQUIRED.iter().chain(extra)).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.project, PathBuf::from("."));
        assert_eq!(cli.max_depth, DEFAULT_MAX_DEPTH);
        assert!(cli.github_source().is_none());

        let config = cli.deploy_config();
        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.api_id, "7");
        assert_eq!(config.auth, "token");
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_production_flag() {
        let cli = parse(&["--production"]);
        assert!(cli.production);
        assert!(cli.deploy_config().production);
        assert!(!parse(&[]).production);
    }

    #[test]
    fn test_project_and_database() {
        let cli = parse(&[
            "site",
            "--database-url",
            "postgres://localhost/app",
            "--test-command",
            "npx mocha --exit",
        ]);
        assert_eq!(cli.project, PathBuf::from("site"));

        let config = cli.deploy_config();
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/app"));
        assert_eq!(config.test_command, "npx mocha --exit");
    }

    #[test]
    fn test_github_source_requires_both_parts() {
        let cli = parse(&["--github-user", "dav-apps", "--github-repo", "api"]);
        let source = cli.github_source().unwrap();
        assert_eq!(source.url(), "https://github.com/dav-apps/api");

        let err = Cli::try_parse_from(REQUIRED.iter().chain(&["--github-user", "dav-apps"]));
        assert!(err.is_err());
    }
}
