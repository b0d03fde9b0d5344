use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::names::sanitize_branch_name;

/// Neon branch, a copy-on-write clone of its parent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub protected: bool,
    #[serde(default)]
    pub current_state: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Branch {
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    #[must_use]
    pub fn state(&self) -> &str {
        self.current_state.as_deref().unwrap_or("unknown")
    }
}

/// Compute endpoint attached to a branch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: String,
    pub branch_id: String,
    pub host: String,
    #[serde(default, rename = "type")]
    pub endpoint_type: Option<String>,
    #[serde(default)]
    pub pooler_enabled: bool,
    #[serde(default)]
    pub current_state: Option<String>,
}

impl Endpoint {
    #[must_use]
    pub fn is_read_write(&self) -> bool {
        self.endpoint_type.as_deref() == Some("read_write")
    }
}

/// Point in time capture of a branch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub source_branch_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<String>,
}

impl Snapshot {
    /// A missing status is treated as active, older API versions omit it
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status.as_deref().is_none_or(|status| status == "active")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParameters {
    pub database: String,
    pub role: String,
    pub host: String,
    #[serde(default)]
    pub pooler_host: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionUri {
    pub connection_uri: String,
    #[serde(default)]
    pub connection_parameters: Option<ConnectionParameters>,
}

impl ConnectionUri {
    /// The pooled variant routes through the pooler host instead of the
    /// endpoint host
    #[must_use]
    pub fn pooled(&self) -> Option<String> {
        let params = self.connection_parameters.as_ref()?;
        let pooler = params.pooler_host.as_deref().filter(|h| !h.is_empty())?;
        let direct = format!("@{}", params.host);
        self.connection_uri
            .contains(&direct)
            .then(|| self.connection_uri.replacen(&direct, &format!("@{pooler}"), 1))
    }
}

/// Response of branch creation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedBranch {
    pub branch: Branch,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    #[serde(default)]
    pub connection_uris: Vec<ConnectionUri>,
}

impl CreatedBranch {
    /// First connection string, pooled when requested and available
    #[must_use]
    pub fn connection_uri(&self, pooled: bool) -> Option<String> {
        let first = self.connection_uris.first()?;
        if pooled && let Some(uri) = first.pooled() {
            return Some(uri);
        }
        Some(first.connection_uri.clone())
    }
}

/// Branch creation request, the name is sanitized on construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateBranch {
    pub parent_id: String,
    pub name: String,
    pub expires_at: DateTime<Utc>,
    pub pooled: bool,
}

impl CreateBranch {
    #[must_use]
    pub fn new(parent_id: &str, name: &str, expires_at: DateTime<Utc>, pooled: bool) -> Self {
        Self {
            parent_id: parent_id.to_string(),
            name: sanitize_branch_name(name),
            expires_at,
            pooled,
        }
    }
}

/// Snapshot restore request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreSnapshot {
    pub name: String,
    pub expires_at: Option<DateTime<Utc>>,
    /// `false` leaves the restored branch unfinalized so it can be inspected
    /// before it becomes the official target
    pub finalize_restore: bool,
}

/// Connection string lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionQuery {
    pub branch_id: String,
    pub database: String,
    pub role: String,
    pub pooled: bool,
}

#[derive(Debug, Deserialize)]
pub struct BranchesResponse {
    pub branches: Vec<Branch>,
}

#[derive(Debug, Deserialize)]
pub struct BranchResponse {
    pub branch: Branch,
}

#[derive(Debug, Deserialize)]
pub struct EndpointsResponse {
    pub endpoints: Vec<Endpoint>,
}

#[derive(Debug, Deserialize)]
pub struct SnapshotsResponse {
    pub snapshots: Vec<Snapshot>,
}

#[derive(Debug, Deserialize)]
pub struct SnapshotResponse {
    pub snapshot: Snapshot,
}

#[derive(Debug, Deserialize)]
pub struct ConnectionUriResponse {
    pub uri: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateBranchBody<'a> {
    pub branch: BranchSpec<'a>,
    pub endpoints: Vec<EndpointSpec>,
}

#[derive(Debug, Serialize)]
pub struct BranchSpec<'a> {
    pub parent_id: &'a str,
    pub name: &'a str,
    pub expires_at: String,
}

#[derive(Debug, Serialize)]
pub struct EndpointSpec {
    #[serde(rename = "type")]
    pub endpoint_type: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RestoreBody<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    pub finalize_restore: bool,
}
