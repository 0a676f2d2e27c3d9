//! Deployment orchestration.
//!
//! Walks the project tree and dispatches every classified manifest, one at a
//! time: remote resources are pushed to the API, tests manifests are seeded
//! and handed to the test runner. A failing manifest is logged and counted;
//! only configuration and traversal errors abort the run.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::DeployConfig;
use crate::error::{DeployError, SeedError};
use crate::fixtures::{FixtureData, FixtureStoreFactory, SeedReport, seed_fixtures};
use crate::manifest::{Classification, Manifest, TestsManifest, classify};
use crate::remote::{ApiClient, RemoteSync};
use crate::runner::{CommandTestRunner, TestRunner, test_glob};
use crate::walker::DirectoryWalker;

/// Counts gathered over a deployment run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployReport {
    /// Remote resources accepted by the API.
    pub synced: usize,
    /// Manifests skipped as incomplete or of unknown type.
    pub skipped: usize,
    /// Resources, manifests or fixture batches that failed.
    pub failed: usize,
    /// Tests manifests whose fixtures were seeded.
    pub seeded: usize,
    /// Test runner invocations.
    pub tested: usize,
}

impl DeployReport {
    /// Returns `true` if nothing failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Runs deployments for one [`DeployConfig`].
pub struct Deployer {
    config: DeployConfig,
    sync: RemoteSync,
    fixtures: Option<Arc<dyn FixtureStoreFactory>>,
    runner: Arc<dyn TestRunner>,
}

impl Deployer {
    /// Creates a deployer that runs tests with the configured command line.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Config` if the configuration is invalid.
    pub fn new(config: DeployConfig) -> Result<Self, DeployError> {
        config.validate()?;
        let runner = CommandTestRunner::from_command_line(&config.test_command)
            .map_err(|e| DeployError::config(e.to_string()))?;
        let sync = RemoteSync::new(ApiClient::new(&config), config.production);
        Ok(Self {
            config,
            sync,
            fixtures: None,
            runner: Arc::new(runner),
        })
    }

    /// Sets the fixture database used by tests manifests.
    #[must_use]
    pub fn with_fixture_store(mut self, factory: Arc<dyn FixtureStoreFactory>) -> Self {
        self.fixtures = Some(factory);
        self
    }

    /// Replaces the test runner.
    #[must_use]
    pub fn with_test_runner(mut self, runner: Arc<dyn TestRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    /// Deploys every manifest below `root`.
    ///
    /// # Errors
    ///
    /// Returns `DeployError` if the root is unusable, the tree cannot be read,
    /// or a tests manifest is found without a fixture database.
    pub async fn deploy(&self, root: &Path) -> Result<DeployReport, DeployError> {
        info!(
            root = %root.display(),
            api_id = %self.config.api_id,
            production = self.config.production,
            "Starting deployment"
        );

        let mut report = DeployReport::default();
        for dir in DirectoryWalker::new(root, self.config.max_depth)? {
            let dir = dir?;
            match classify(&dir).await {
                Ok(Classification::Manifest { path, manifest }) => {
                    debug!(path = %path.display(), kind = manifest.kind(), "Found manifest");
                    self.apply(&dir.path, &manifest, &mut report).await?;
                }
                Ok(Classification::Skipped { path, reason }) => {
                    warn!(path = %path.display(), %reason, "Skipping manifest");
                    report.skipped += 1;
                }
                Ok(Classification::Unrecognized) => {
                    debug!(dir = %dir.path.display(), "No manifest in directory");
                }
                Err(e) => {
                    error!(error = %e, "Failed to read manifest");
                    report.failed += 1;
                }
            }
        }

        info!(
            synced = report.synced,
            skipped = report.skipped,
            failed = report.failed,
            seeded = report.seeded,
            tested = report.tested,
            "Deployment finished"
        );
        Ok(report)
    }

    async fn apply(
        &self,
        dir: &Path,
        manifest: &Manifest,
        report: &mut DeployReport,
    ) -> Result<(), DeployError> {
        if let Manifest::Tests(tests) = manifest {
            return self.run_tests(dir, tests, report).await;
        }

        for outcome in self.sync.sync(dir, manifest).await {
            match outcome.result {
                Ok(()) => {
                    info!(resource = %outcome.resource, "Synced");
                    report.synced += 1;
                }
                Err(e) => {
                    error!(resource = %outcome.resource, error = %e, "Sync failed");
                    report.failed += 1;
                }
            }
        }
        Ok(())
    }

    async fn run_tests(
        &self,
        dir: &Path,
        tests: &TestsManifest,
        report: &mut DeployReport,
    ) -> Result<(), DeployError> {
        if self.config.production {
            info!(dir = %dir.display(), "Skipping tests in production");
            return Ok(());
        }
        let Some(factory) = &self.fixtures else {
            return Err(DeployError::config(format!(
                "tests manifest in {} requires a database URL",
                dir.display()
            )));
        };

        if let Some(data) = &tests.data {
            match seed(factory.as_ref(), &dir.join(data)).await {
                Ok(seeded) => {
                    debug!(?seeded, "Seed report");
                    report.seeded += 1;
                }
                Err(e) => {
                    error!(
                        dir = %dir.display(),
                        category = %e.category(),
                        error = %e,
                        "Fixture seeding failed, not running tests"
                    );
                    report.failed += 1;
                    return Ok(());
                }
            }
        }

        let pattern = test_glob(dir, &tests.source);
        info!(%pattern, "Running tests");
        report.tested += 1;
        match self.runner.run(&pattern).await {
            Ok(run) => {
                if !run.stdout.trim().is_empty() {
                    info!("{}", run.stdout.trim_end());
                }
                if !run.stderr.trim().is_empty() {
                    warn!("{}", run.stderr.trim_end());
                }
                if run.success {
                    info!(exit_code = ?run.exit_code, "Test runner finished");
                } else {
                    warn!(exit_code = ?run.exit_code, "Test runner reported failures");
                }
            }
            Err(e) => {
                error!(error = %e, "Test runner failed");
                report.failed += 1;
            }
        }
        Ok(())
    }
}

/// Seeds one fixture data file over a dedicated connection.
///
/// The connection is closed whether seeding succeeds or not.
async fn seed(
    factory: &dyn FixtureStoreFactory,
    data_path: &Path,
) -> Result<SeedReport, SeedError> {
    let data = FixtureData::load(data_path).await?;
    let mut store = factory.connect().await?;
    let result = seed_fixtures(store.as_mut(), &data).await;
    if let Err(e) = store.close().await {
        warn!(error = %e, "Failed to close fixture connection");
    }
    result
}
