//! Manifest kinds and classification.
//!
//! A manifest is a JSON object with a `type` field. Each kind has its own set
//! of required fields; a manifest that names an unknown kind or lacks a
//! required field is skipped rather than treated as fatal, so half-written
//! manifests do not block a deployment.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::ManifestError;
use crate::walker::ManifestDir;

/// Every `type` value [`Manifest`] accepts.
pub const MANIFEST_KINDS: [&str; 6] = [
    "endpoint",
    "function",
    "functions",
    "errors",
    "env",
    "tests",
];

/// A typed deployment manifest.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Manifest {
    Endpoint(EndpointManifest),
    Function(FunctionManifest),
    Functions(FunctionsManifest),
    Errors(ErrorsManifest),
    Env(EnvManifest),
    Tests(TestsManifest),
}

impl Manifest {
    /// The `type` value of this manifest.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Endpoint(_) => "endpoint",
            Self::Function(_) => "function",
            Self::Functions(_) => "functions",
            Self::Errors(_) => "errors",
            Self::Env(_) => "env",
            Self::Tests(_) => "tests",
        }
    }

    /// Semantic checks serde cannot express.
    fn validate(&self) -> Result<(), String> {
        match self {
            Self::Endpoint(m) if m.path.is_empty() || m.method.is_empty() => {
                Err("endpoint path and method must not be empty".into())
            }
            Self::Function(m) if m.name.is_empty() => Err("function name must not be empty".into()),
            Self::Functions(m) if m.functions.iter().any(|f| f.name.is_empty()) => {
                Err("function name must not be empty".into())
            }
            Self::Errors(m) if !(m.errors.is_array() || m.errors.is_object()) => {
                Err("`errors` must be an array or an object".into())
            }
            _ => Ok(()),
        }
    }
}

/// An HTTP endpoint backed by a command script.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EndpointManifest {
    pub path: String,
    pub method: String,
    /// Command script, relative to the manifest directory.
    pub source: PathBuf,
    #[serde(default)]
    pub caching: bool,
}

/// A callable function backed by a command script.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FunctionManifest {
    pub name: String,
    pub params: Vec<String>,
    /// Command script, relative to the manifest directory.
    pub source: PathBuf,
}

/// Several functions declared in one manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FunctionsManifest {
    pub functions: Vec<FunctionManifest>,
}

/// The API's error catalog, sent verbatim.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorsManifest {
    pub errors: Value,
}

/// Environment variables for both deployment targets.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EnvManifest {
    pub production: Map<String, Value>,
    pub development: Map<String, Value>,
}

impl EnvManifest {
    /// The variables for the selected target.
    #[must_use]
    pub fn select(&self, production: bool) -> &Map<String, Value> {
        if production {
            &self.production
        } else {
            &self.development
        }
    }
}

/// Test fixtures and specs, used only outside production.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TestsManifest {
    /// Fixture data file, relative to the manifest directory.
    #[serde(default)]
    pub data: Option<PathBuf>,
    /// Directory holding the test specs, relative to the manifest directory.
    #[serde(default = "default_tests_source")]
    pub source: PathBuf,
}

fn default_tests_source() -> PathBuf {
    PathBuf::from(".")
}

/// Outcome of inspecting a directory for a manifest.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// A complete manifest was found.
    Manifest { path: PathBuf, manifest: Manifest },
    /// A manifest was found but cannot be acted upon.
    Skipped { path: PathBuf, reason: String },
    /// No JSON file in the directory declares a `type`.
    Unrecognized,
}

/// Finds and parses the manifest of a directory.
///
/// JSON files are tried in name order; the first one whose top-level `type`
/// names a known manifest kind is the manifest. Files with an unknown `type`
/// (a `package.json` with `"type": "module"`) only count when no file names a
/// known kind, in which case the first of them is reported as skipped. Files
/// without a string `type` (fixture data, package descriptors) are left alone.
///
/// # Errors
///
/// Returns `ManifestError` if a JSON file cannot be read or is not valid JSON.
pub async fn classify(dir: &ManifestDir) -> Result<Classification, ManifestError> {
    let mut unknown = None;
    for path in dir.json_files() {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ManifestError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let value: Value =
            serde_json::from_str(&content).map_err(|source| ManifestError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let Some(kind) = value.get("type").and_then(Value::as_str) else {
            continue;
        };
        if MANIFEST_KINDS.contains(&kind) {
            return Ok(classify_value(path, value));
        }
        if unknown.is_none() {
            unknown = Some(classify_value(path, value));
        }
    }
    Ok(unknown.unwrap_or(Classification::Unrecognized))
}

/// Classifies an already parsed manifest object.
#[must_use]
pub fn classify_value(path: &Path, value: Value) -> Classification {
    let path = path.to_path_buf();
    match serde_json::from_value::<Manifest>(value) {
        Ok(manifest) => match manifest.validate() {
            Ok(()) => Classification::Manifest { path, manifest },
            Err(reason) => Classification::Skipped { path, reason },
        },
        Err(e) => Classification::Skipped {
            path,
            reason: e.to_string(),
        },
    }
}
