//! # dxdeploy-core
//!
//! Deploys a project tree of JSON manifests to a remote API.
//!
//! ## Overview
//!
//! A deployment walks the project directory depth-first, classifies the
//! manifest found in each directory and acts on it:
//!
//! - `endpoint`, `function`, `functions`, `errors` and `env` manifests are
//!   pushed to the API with idempotent `PUT` requests
//! - `tests` manifests seed a fixture database and then run the test specs
//!
//! ## Example
//!
//! ```ignore
//! use std::path::Path;
//! use dxdeploy_core::{DeployConfig, Deployer};
//!
//! async fn deploy() -> Result<(), dxdeploy_core::DeployError> {
//!     let config = DeployConfig::new("https://api.example.com", "7", "token");
//!     let report = Deployer::new(config)?.deploy(Path::new(".")).await?;
//!     println!("{} resources synced", report.synced);
//!     Ok(())
//! }
//! ```
//!
//! ## Fixture stores
//!
//! Seeding runs against the [`FixtureStoreFactory`] trait. An in-memory
//! implementation lives in [`fixtures::memory`]; the PostgreSQL one is
//! provided by a separate crate.

pub mod config;
pub mod deploy;
mod error;
pub mod fixtures;
pub mod manifest;
pub mod reconcile;
pub mod remote;
pub mod runner;
pub mod walker;

pub use config::{DEFAULT_TEST_COMMAND, DeployConfig};
pub use deploy::{DeployReport, Deployer};
pub use error::{
    DeployError, ErrorCategory, ManifestError, RunnerError, SeedError, SyncError,
};
pub use fixtures::{
    FixtureData, FixtureStore, FixtureStoreFactory, FixtureTransaction, SeedReport, seed_fixtures,
};
pub use manifest::{Classification, MANIFEST_KINDS, Manifest, classify};
pub use reconcile::{PropertyPlan, PropertyUpdate, StoredProperty, reconcile_properties};
pub use remote::{ApiClient, RemoteSync, SyncOutcome};
pub use runner::{CommandTestRunner, TestRun, TestRunner};
pub use walker::{DEFAULT_MAX_DEPTH, DirectoryWalker, ManifestDir};

/// Prelude module for convenient imports.
///
/// ```ignore
/// use dxdeploy_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::DeployConfig;
    pub use crate::deploy::{DeployReport, Deployer};
    pub use crate::error::{DeployError, SeedError};
    pub use crate::fixtures::{
        FixtureData, FixtureStore, FixtureStoreFactory, FixtureTransaction, PriceFixture,
        PurchaseFixture, TableObjectFixture,
    };
    pub use crate::reconcile::StoredProperty;
}
