//! Remote resource synchronisation.
//!
//! Every resource is pushed with a single `PUT` carrying its complete
//! definition; the API decides whether that creates or replaces the
//! resource, so repeating a deployment converges to the same remote state.

use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::DeployConfig;
use crate::error::SyncError;
use crate::manifest::{EndpointManifest, EnvManifest, ErrorsManifest, FunctionManifest, Manifest};

/// Thin HTTP client for the resource API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: DeployConfig,
}

impl ApiClient {
    /// Creates a client with a default HTTP transport.
    #[must_use]
    pub fn new(config: &DeployConfig) -> Self {
        Self::with_http_client(config, reqwest::Client::new())
    }

    /// Creates a client on top of a preconfigured HTTP transport.
    #[must_use]
    pub fn with_http_client(config: &DeployConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            config: config.clone(),
        }
    }

    /// Sends `body` to `PUT /api/<id>/<resource>`.
    pub async fn put<T: Serialize + ?Sized>(
        &self,
        resource: &str,
        body: &T,
    ) -> Result<(), SyncError> {
        let url = self.config.api_url(resource);
        let resp = self
            .http
            .put(&url)
            .header(reqwest::header::AUTHORIZATION, &self.config.auth)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|source| SyncError::Transport {
                url: url.clone(),
                source,
            })?;
        handle_response(url, resp).await
    }
}

async fn handle_response(url: String, resp: reqwest::Response) -> Result<(), SyncError> {
    let status = resp.status();
    if status.is_success() {
        debug!(%url, status = status.as_u16(), "Resource accepted");
        return Ok(());
    }

    let body = resp.text().await.unwrap_or_default();
    Err(SyncError::Rejected {
        url,
        status: status.as_u16(),
        detail: error_detail(&body),
    })
}

/// Extracts the `errors` member of an API error body, falling back to the
/// raw body.
fn error_detail(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body)
        && let Some(errors) = json.get("errors")
    {
        return errors.to_string();
    }
    body.trim().to_string()
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct EndpointPayload<'a> {
    pub path: &'a str,
    pub method: &'a str,
    pub commands: &'a str,
    pub caching: bool,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct FunctionPayload<'a> {
    pub name: &'a str,
    /// Parameter names joined with `,`.
    pub params: String,
    pub commands: &'a str,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ErrorsPayload<'a> {
    pub errors: &'a Value,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct EnvVarsPayload<'a> {
    pub env_vars: &'a Map<String, Value>,
}

/// Result of pushing one resource.
#[derive(Debug)]
pub struct SyncOutcome {
    /// Short label such as `function add` or `endpoint GET /users`.
    pub resource: String,
    pub result: Result<(), SyncError>,
}

/// Pushes endpoint, function, errors and env manifests to the remote API.
#[derive(Debug, Clone)]
pub struct RemoteSync {
    client: ApiClient,
    production: bool,
}

impl RemoteSync {
    #[must_use]
    pub fn new(client: ApiClient, production: bool) -> Self {
        Self { client, production }
    }

    /// Pushes every resource declared by `manifest`.
    ///
    /// Returns one outcome per resource; a `functions` manifest yields one per
    /// function. `tests` manifests are not remote resources and yield nothing.
    pub async fn sync(&self, dir: &Path, manifest: &Manifest) -> Vec<SyncOutcome> {
        match manifest {
            Manifest::Endpoint(m) => vec![SyncOutcome {
                resource: format!("endpoint {} {}", m.method.to_uppercase(), m.path),
                result: self.sync_endpoint(dir, m).await,
            }],
            Manifest::Function(m) => vec![self.function_outcome(dir, m).await],
            Manifest::Functions(m) => {
                let mut outcomes = Vec::with_capacity(m.functions.len());
                for function in &m.functions {
                    outcomes.push(self.function_outcome(dir, function).await);
                }
                outcomes
            }
            Manifest::Errors(m) => vec![SyncOutcome {
                resource: "errors".to_string(),
                result: self.sync_errors(m).await,
            }],
            Manifest::Env(m) => vec![SyncOutcome {
                resource: "env vars".to_string(),
                result: self.sync_env(m).await,
            }],
            Manifest::Tests(_) => Vec::new(),
        }
    }

    async fn function_outcome(&self, dir: &Path, m: &FunctionManifest) -> SyncOutcome {
        SyncOutcome {
            resource: format!("function {}", m.name),
            result: self.sync_function(dir, m).await,
        }
    }

    pub async fn sync_endpoint(&self, dir: &Path, m: &EndpointManifest) -> Result<(), SyncError> {
        let commands = read_commands(dir, &m.source).await?;
        self.client
            .put(
                "endpoint",
                &EndpointPayload {
                    path: &m.path,
                    method: &m.method,
                    commands: &commands,
                    caching: m.caching,
                },
            )
            .await
    }

    pub async fn sync_function(&self, dir: &Path, m: &FunctionManifest) -> Result<(), SyncError> {
        let commands = read_commands(dir, &m.source).await?;
        self.client
            .put(
                "function",
                &FunctionPayload {
                    name: &m.name,
                    params: m.params.join(","),
                    commands: &commands,
                },
            )
            .await
    }

    pub async fn sync_errors(&self, m: &ErrorsManifest) -> Result<(), SyncError> {
        self.client
            .put("errors", &ErrorsPayload { errors: &m.errors })
            .await
    }

    pub async fn sync_env(&self, m: &EnvManifest) -> Result<(), SyncError> {
        self.client
            .put(
                "env_vars",
                &EnvVarsPayload {
                    env_vars: m.select(self.production),
                },
            )
            .await
    }
}

async fn read_commands(dir: &Path, source: &Path) -> Result<String, SyncError> {
    let path = dir.join(source);
    tokio::fs::read_to_string(&path)
        .await
        .map_err(|source| SyncError::Source { path, source })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use assert_json_diff::assert_json_eq;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn sync_for(server: &MockServer, production: bool) -> RemoteSync {
        let config = DeployConfig::new(server.uri(), "42", "secret-token");
        RemoteSync::new(ApiClient::new(&config), production)
    }

    fn manifest(value: Value) -> Manifest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_payload_shapes() {
        let payload = FunctionPayload {
            name: "add",
            params: ["a", "b"].join(","),
            commands: "RETURN a+b",
        };
        assert_json_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"name": "add", "params": "a,b", "commands": "RETURN a+b"})
        );

        let payload = EndpointPayload {
            path: "/users",
            method: "get",
            commands: "RETURN 1",
            caching: false,
        };
        assert_json_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"path": "/users", "method": "get", "commands": "RETURN 1", "caching": false})
        );
    }

    #[test]
    fn test_error_detail() {
        assert_eq!(
            error_detail(r#"{"errors": [{"code": 2101, "message": "Syntax error"}]}"#),
            r#"[{"code":2101,"message":"Syntax error"}]"#
        );
        assert_eq!(error_detail("Bad Gateway\n"), "Bad Gateway");
    }

    #[tokio::test]
    async fn test_function_is_put_with_joined_params() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/42/function"))
            .and(header("Authorization", "secret-token"))
            .and(header("Content-Type", "application/json"))
            .and(body_json(json!({
                "name": "add",
                "params": "a,b",
                "commands": "RETURN a+b"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("add.dx"), "RETURN a+b").unwrap();
        let m = manifest(json!({
            "type": "function",
            "name": "add",
            "params": ["a", "b"],
            "source": "add.dx"
        }));

        let outcomes = sync_for(&server, false).sync(tmp.path(), &m).await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].resource, "function add");
        assert!(outcomes[0].result.is_ok());
    }

    #[tokio::test]
    async fn test_env_uses_development_variant() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/42/env_vars"))
            .and(body_json(json!({"env_vars": {"X": "2"}})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let m = manifest(json!({
            "type": "env",
            "production": {"X": "1"},
            "development": {"X": "2"}
        }));
        let outcomes = sync_for(&server, false).sync(Path::new("."), &m).await;
        assert!(outcomes[0].result.is_ok());
    }

    #[tokio::test]
    async fn test_env_uses_production_variant() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/42/env_vars"))
            .and(body_json(json!({"env_vars": {"X": "1"}})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let m = manifest(json!({
            "type": "env",
            "production": {"X": "1"},
            "development": {"X": "2"}
        }));
        let outcomes = sync_for(&server, true).sync(Path::new("."), &m).await;
        assert!(outcomes[0].result.is_ok());
    }

    #[tokio::test]
    async fn test_endpoint_and_errors_payloads() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/42/endpoint"))
            .and(body_json(json!({
                "path": "/users/:id",
                "method": "get",
                "commands": "RETURN id",
                "caching": true
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/42/errors"))
            .and(body_json(json!({"errors": [{"code": 1, "message": "Boom"}]})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("get.dx"), "RETURN id").unwrap();
        let sync = sync_for(&server, false);

        let endpoint = manifest(json!({
            "type": "endpoint",
            "path": "/users/:id",
            "method": "get",
            "source": "get.dx",
            "caching": true
        }));
        let errors = manifest(json!({
            "type": "errors",
            "errors": [{"code": 1, "message": "Boom"}]
        }));

        let outcomes = sync.sync(tmp.path(), &endpoint).await;
        assert_eq!(outcomes[0].resource, "endpoint GET /users/:id");
        assert!(outcomes[0].result.is_ok());
        assert!(sync.sync(tmp.path(), &errors).await[0].result.is_ok());
    }

    #[tokio::test]
    async fn test_functions_are_independent() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/42/function"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("ok.dx"), "RETURN 1").unwrap();
        let m = manifest(json!({
            "type": "functions",
            "functions": [
                {"name": "missing", "params": [], "source": "missing.dx"},
                {"name": "ok", "params": [], "source": "ok.dx"}
            ]
        }));

        let outcomes = sync_for(&server, false).sync(tmp.path(), &m).await;
        assert_eq!(outcomes.len(), 2);
        assert!(matches!(
            outcomes[0].result,
            Err(SyncError::Source { .. })
        ));
        assert!(outcomes[1].result.is_ok());
    }

    #[tokio::test]
    async fn test_rejection_carries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/42/errors"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"errors": [{"code": 2102, "message": "Invalid"}]})),
            )
            .mount(&server)
            .await;

        let m = manifest(json!({"type": "errors", "errors": []}));
        let outcomes = sync_for(&server, false).sync(Path::new("."), &m).await;
        match &outcomes[0].result {
            Err(SyncError::Rejected { status, detail, .. }) => {
                assert_eq!(*status, 400);
                assert!(detail.contains("2102"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_repeated_sync_sends_identical_payloads() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/42/function"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("add.dx"), "RETURN a+b").unwrap();
        let m = manifest(json!({
            "type": "function",
            "name": "add",
            "params": ["a", "b"],
            "source": "add.dx"
        }));
        let sync = sync_for(&server, false);
        sync.sync(tmp.path(), &m).await;
        sync.sync(tmp.path(), &m).await;

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].body, requests[1].body);
    }

    #[tokio::test]
    async fn test_tests_manifest_is_not_synced() {
        let server = MockServer::start().await;
        let m = manifest(json!({"type": "tests"}));
        assert!(sync_for(&server, false).sync(Path::new("."), &m).await.is_empty());
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
