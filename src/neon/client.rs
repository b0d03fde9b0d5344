use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{
    Client, RequestBuilder, StatusCode,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue},
};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::{
    BranchProvider, ProviderError,
    models::{
        ApiErrorBody, Branch, BranchResponse, BranchSpec, BranchesResponse, ConnectionQuery,
        ConnectionUriResponse, CreateBranch, CreateBranchBody, CreatedBranch, Endpoint,
        EndpointSpec, EndpointsResponse, RestoreBody, RestoreSnapshot, Snapshot,
        SnapshotResponse, SnapshotsResponse,
    },
};
use crate::{config::Credentials, names::sanitize_branch_name};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// [`BranchProvider`] talking to the Neon REST API
#[derive(Debug, Clone)]
pub struct NeonClient {
    http: Client,
    base_url: String,
    project_id: String,
}

impl NeonClient {
    /// # Errors
    ///
    /// Returns an error if the API key is not a valid header value or the
    /// HTTP client cannot be built
    pub fn new(credentials: &Credentials, base_url: &str) -> Result<Self, ProviderError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", credentials.api_key.trim()))
            .map_err(|e| ProviderError::InvalidApiKey(e.to_string()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id: credentials.project_id.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        project_url(&self.base_url, &self.project_id, path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T, ProviderError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!("{what}: {status}");

        if status == StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(
                error_message(&body).unwrap_or_else(|| what.to_string()),
            ));
        }

        if !status.is_success() {
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: error_message(&body)
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string()),
            });
        }

        // DELETE may answer with an empty body
        let body = if body.trim().is_empty() { "null" } else { body.as_str() };
        serde_json::from_str(body).map_err(|e| ProviderError::Decode(format!("{what}: {e}")))
    }
}

fn project_url(base_url: &str, project_id: &str, path: &str) -> String {
    format!("{base_url}/projects/{project_id}{path}")
}

/// The API's `message` field, or the raw body when it is not JSON
fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(ApiErrorBody {
            message: Some(message),
            ..
        }) if !message.is_empty() => Some(message),
        _ => Some(body.to_string()),
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[async_trait]
impl BranchProvider for NeonClient {
    async fn list_branches(&self) -> Result<Vec<Branch>, ProviderError> {
        let response: BranchesResponse = self
            .send(self.http.get(self.url("/branches")), "list branches")
            .await?;
        Ok(response.branches)
    }

    async fn get_branch(&self, branch_id: &str) -> Result<Branch, ProviderError> {
        let response: BranchResponse = self
            .send(
                self.http.get(self.url(&format!("/branches/{branch_id}"))),
                "get branch",
            )
            .await?;
        Ok(response.branch)
    }

    async fn create_branch(&self, request: &CreateBranch) -> Result<CreatedBranch, ProviderError> {
        let name = sanitize_branch_name(&request.name);
        let body = CreateBranchBody {
            branch: BranchSpec {
                parent_id: &request.parent_id,
                name: &name,
                expires_at: timestamp(request.expires_at),
            },
            endpoints: vec![EndpointSpec {
                endpoint_type: "read_write",
            }],
        };
        self.send(
            self.http.post(self.url("/branches")).json(&body),
            "create branch",
        )
        .await
    }

    async fn delete_branch(&self, branch_id: &str) -> Result<(), ProviderError> {
        let _: serde_json::Value = self
            .send(
                self.http
                    .delete(self.url(&format!("/branches/{branch_id}"))),
                "delete branch",
            )
            .await?;
        Ok(())
    }

    async fn list_endpoints(&self, branch_id: &str) -> Result<Vec<Endpoint>, ProviderError> {
        let response: EndpointsResponse = self
            .send(
                self.http
                    .get(self.url(&format!("/branches/{branch_id}/endpoints"))),
                "list endpoints",
            )
            .await?;
        Ok(response.endpoints)
    }

    async fn create_snapshot(
        &self,
        branch_id: &str,
        name: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Snapshot, ProviderError> {
        let expires_at = timestamp(expires_at);
        let response: SnapshotResponse = self
            .send(
                self.http
                    .post(self.url(&format!("/branches/{branch_id}/snapshot")))
                    .query(&[("name", name), ("expires_at", expires_at.as_str())]),
                "create snapshot",
            )
            .await?;
        Ok(response.snapshot)
    }

    async fn list_snapshots(&self) -> Result<Vec<Snapshot>, ProviderError> {
        let response: SnapshotsResponse = self
            .send(self.http.get(self.url("/snapshots")), "list snapshots")
            .await?;
        Ok(response.snapshots)
    }

    async fn restore_snapshot(
        &self,
        snapshot_id: &str,
        request: &RestoreSnapshot,
    ) -> Result<Branch, ProviderError> {
        let body = RestoreBody {
            name: &request.name,
            expires_at: request.expires_at.map(timestamp),
            finalize_restore: request.finalize_restore,
        };
        let response: BranchResponse = self
            .send(
                self.http
                    .post(self.url(&format!("/snapshots/{snapshot_id}/restore")))
                    .json(&body),
                "restore snapshot",
            )
            .await?;
        Ok(response.branch)
    }

    async fn connection_uri(&self, query: &ConnectionQuery) -> Result<String, ProviderError> {
        let pooled = if query.pooled { "true" } else { "false" };
        let response: ConnectionUriResponse = self
            .send(
                self.http.get(self.url("/connection_uri")).query(&[
                    ("branch_id", query.branch_id.as_str()),
                    ("database_name", query.database.as_str()),
                    ("role_name", query.role.as_str()),
                    ("pooled", pooled),
                ]),
                "get connection uri",
            )
            .await?;
        Ok(response.uri)
    }
}
