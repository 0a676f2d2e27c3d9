//! Run configuration shared by every deployment step.

use url::Url;

use crate::error::DeployError;
use crate::walker::DEFAULT_MAX_DEPTH;

/// Default command used to run test specs after seeding.
pub const DEFAULT_TEST_COMMAND: &str = "npx mocha";

/// Immutable configuration for a deployment run.
///
/// Built once at startup and passed by reference to every component, so the
/// production flag and credentials never change mid-run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployConfig {
    /// Base URL of the remote API, without the `/api/<id>` suffix.
    pub base_url: String,

    /// Identifier of the API whose resources are deployed.
    pub api_id: String,

    /// Value sent verbatim in the `Authorization` header.
    pub auth: String,

    /// Production runs select production env vars and skip tests manifests.
    pub production: bool,

    /// Connection URL of the fixture database, required by tests manifests.
    pub database_url: Option<String>,

    /// Command line of the external test runner; the test file glob is appended.
    pub test_command: String,

    /// Maximum directory depth visited below the project root.
    pub max_depth: usize,
}

impl DeployConfig {
    /// Creates a development configuration for the given API.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        api_id: impl Into<String>,
        auth: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_id: api_id.into(),
            auth: auth.into(),
            production: false,
            database_url: None,
            test_command: DEFAULT_TEST_COMMAND.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Sets the production flag.
    #[must_use]
    pub fn with_production(mut self, production: bool) -> Self {
        self.production = production;
        self
    }

    /// Sets the fixture database URL.
    #[must_use]
    pub fn with_database_url(mut self, url: Option<String>) -> Self {
        self.database_url = url.filter(|u| !u.trim().is_empty());
        self
    }

    /// Sets the test runner command line.
    #[must_use]
    pub fn with_test_command(mut self, command: impl Into<String>) -> Self {
        self.test_command = command.into();
        self
    }

    /// Sets the maximum traversal depth.
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Checks that all required options are present and well formed.
    pub fn validate(&self) -> Result<(), DeployError> {
        if self.base_url.trim().is_empty() {
            return Err(DeployError::config("base URL must not be empty"));
        }
        Url::parse(&self.base_url)
            .map_err(|e| DeployError::config(format!("invalid base URL {}: {e}", self.base_url)))?;
        if self.api_id.trim().is_empty() {
            return Err(DeployError::config("API id must not be empty"));
        }
        if self.auth.trim().is_empty() {
            return Err(DeployError::config("auth token must not be empty"));
        }
        if self.max_depth == 0 {
            return Err(DeployError::config("max depth must be > 0"));
        }
        Ok(())
    }

    /// Full URL of a resource collection on the remote API.
    #[must_use]
    pub fn api_url(&self, resource: &str) -> String {
        format!("{}/api/{}/{}", self.base_url, self.api_id, resource)
    }
}
