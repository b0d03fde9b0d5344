#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use neonsync::{
    config::{EnvUpdate, Lookup, Settings, Workspace},
    git::{BranchDeletion, GitError, GitRef, Vcs},
    neon::{
        Branch, BranchProvider, ConnectionQuery, ConnectionUri, CreateBranch, CreatedBranch,
        Endpoint, ProviderError, RestoreSnapshot, Snapshot,
        models::ConnectionParameters,
    },
    workflows::Context,
};
use std::{collections::HashMap, path::PathBuf, sync::Mutex, time::Duration};
use tempfile::TempDir;

pub const PROJECT_ID: &str = "proj-test-123";
pub const NEW_HOST: &str = "ep-new-123456.us-east-2.aws.neon.tech";
pub const NEW_POOLER_HOST: &str = "ep-new-123456-pooler.us-east-2.aws.neon.tech";

pub fn branch(id: &str, name: &str) -> Branch {
    Branch {
        id: id.into(),
        name: name.into(),
        current_state: Some("ready".into()),
        ..Branch::default()
    }
}

pub fn child(id: &str, name: &str, parent: &str) -> Branch {
    Branch {
        parent_id: Some(parent.into()),
        ..branch(id, name)
    }
}

pub fn snapshot(id: &str, name: &str) -> Snapshot {
    Snapshot {
        id: id.into(),
        name: name.into(),
        source_branch_id: Some("p1".into()),
        status: Some("active".into()),
        ..Snapshot::default()
    }
}

pub fn uri_for(branch_id: &str) -> String {
    format!("postgresql://neondb_owner:pw@ep-{branch_id}.us-east-2.aws.neon.tech/neondb")
}

/// Every provider call, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListBranches,
    GetBranch(String),
    CreateBranch(CreateBranch),
    DeleteBranch(String),
    ListEndpoints(String),
    CreateSnapshot {
        branch_id: String,
        name: String,
        expires_at: DateTime<Utc>,
    },
    ListSnapshots,
    RestoreSnapshot {
        snapshot_id: String,
        request: RestoreSnapshot,
    },
    ConnectionUri(ConnectionQuery),
}

/// In-memory Neon project
#[derive(Default)]
pub struct MockProvider {
    pub branches: Mutex<Vec<Branch>>,
    pub snapshots: Mutex<Vec<Snapshot>>,
    pub endpoints: Mutex<HashMap<String, Vec<Endpoint>>>,
    pub calls: Mutex<Vec<Call>>,
    /// `get_branch` reports `init` this many times before the stored state
    pub pending_polls: Mutex<u32>,
    /// `delete_branch` answers 404
    pub delete_not_found: bool,
    /// `connection_uri` fails
    pub uri_fails: bool,
    /// Branch ids whose `list_endpoints` fails
    pub endpoint_failures: Vec<String>,
}

impl MockProvider {
    pub fn with_branches(branches: Vec<Branch>) -> Self {
        Self {
            branches: Mutex::new(branches),
            ..Self::default()
        }
    }

    pub fn with_snapshots(self, snapshots: Vec<Snapshot>) -> Self {
        *self.snapshots.lock().unwrap() = snapshots;
        self
    }

    pub fn with_endpoint(self, endpoint: Endpoint) -> Self {
        self.endpoints
            .lock()
            .unwrap()
            .entry(endpoint.branch_id.clone())
            .or_default()
            .push(endpoint);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::DeleteBranch(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn created(&self) -> Vec<CreateBranch> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::CreateBranch(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn restores(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::RestoreSnapshot { .. }))
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl BranchProvider for MockProvider {
    async fn list_branches(&self) -> Result<Vec<Branch>, ProviderError> {
        self.record(Call::ListBranches);
        Ok(self.branches.lock().unwrap().clone())
    }

    async fn get_branch(&self, branch_id: &str) -> Result<Branch, ProviderError> {
        self.record(Call::GetBranch(branch_id.into()));
        let mut branch = self
            .branches
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.id == branch_id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(format!("branch {branch_id}")))?;

        let mut pending = self.pending_polls.lock().unwrap();
        if *pending > 0 {
            *pending -= 1;
            branch.current_state = Some("init".into());
        } else if branch.current_state.is_none() {
            branch.current_state = Some("ready".into());
        }
        Ok(branch)
    }

    async fn create_branch(&self, request: &CreateBranch) -> Result<CreatedBranch, ProviderError> {
        self.record(Call::CreateBranch(request.clone()));
        let branch = Branch {
            id: "br-new-123456".into(),
            name: request.name.clone(),
            parent_id: Some(request.parent_id.clone()),
            current_state: Some("init".into()),
            expires_at: Some(request.expires_at),
            ..Branch::default()
        };
        self.branches.lock().unwrap().push(branch.clone());

        Ok(CreatedBranch {
            branch,
            endpoints: Vec::new(),
            connection_uris: vec![ConnectionUri {
                connection_uri: format!(
                    "postgresql://neondb_owner:pw@{NEW_HOST}/neondb?sslmode=require"
                ),
                connection_parameters: Some(ConnectionParameters {
                    database: "neondb".into(),
                    role: "neondb_owner".into(),
                    host: NEW_HOST.into(),
                    pooler_host: Some(NEW_POOLER_HOST.into()),
                }),
            }],
        })
    }

    async fn delete_branch(&self, branch_id: &str) -> Result<(), ProviderError> {
        self.record(Call::DeleteBranch(branch_id.into()));
        if self.delete_not_found {
            return Err(ProviderError::NotFound(format!("branch {branch_id}")));
        }
        self.branches.lock().unwrap().retain(|b| b.id != branch_id);
        Ok(())
    }

    async fn list_endpoints(&self, branch_id: &str) -> Result<Vec<Endpoint>, ProviderError> {
        self.record(Call::ListEndpoints(branch_id.into()));
        if self.endpoint_failures.iter().any(|id| id == branch_id) {
            return Err(ProviderError::Api {
                status: 500,
                message: "internal error".into(),
            });
        }
        Ok(self
            .endpoints
            .lock()
            .unwrap()
            .get(branch_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_snapshot(
        &self,
        branch_id: &str,
        name: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Snapshot, ProviderError> {
        self.record(Call::CreateSnapshot {
            branch_id: branch_id.into(),
            name: name.into(),
            expires_at,
        });
        let snapshot = Snapshot {
            id: "snap-new".into(),
            name: name.into(),
            source_branch_id: Some(branch_id.into()),
            expires_at: Some(expires_at),
            status: Some("creating".into()),
            ..Snapshot::default()
        };
        self.snapshots.lock().unwrap().push(snapshot.clone());
        Ok(snapshot)
    }

    async fn list_snapshots(&self) -> Result<Vec<Snapshot>, ProviderError> {
        self.record(Call::ListSnapshots);
        Ok(self.snapshots.lock().unwrap().clone())
    }

    async fn restore_snapshot(
        &self,
        snapshot_id: &str,
        request: &RestoreSnapshot,
    ) -> Result<Branch, ProviderError> {
        self.record(Call::RestoreSnapshot {
            snapshot_id: snapshot_id.into(),
            request: request.clone(),
        });
        let branch = Branch {
            id: "br-restored".into(),
            name: request.name.clone(),
            parent_id: Some("p1".into()),
            expires_at: request.expires_at,
            ..Branch::default()
        };
        self.branches.lock().unwrap().push(branch.clone());
        Ok(branch)
    }

    async fn connection_uri(&self, query: &ConnectionQuery) -> Result<String, ProviderError> {
        self.record(Call::ConnectionUri(query.clone()));
        if self.uri_fails {
            return Err(ProviderError::Api {
                status: 500,
                message: "internal error".into(),
            });
        }
        Ok(uri_for(&query.branch_id))
    }
}

/// In-memory git working copy
pub struct FakeVcs {
    pub repository: bool,
    pub current: Mutex<GitRef>,
    pub branches: Mutex<Vec<String>>,
    pub commits: Vec<String>,
    /// Branches whose safe delete is rejected
    pub unmerged: Vec<String>,
    pub remote: Option<String>,
    pub dirty: bool,
    pub has_remote: bool,
    pub log: Mutex<Vec<String>>,
}

impl FakeVcs {
    pub fn on(current: &str, branches: &[&str]) -> Self {
        Self {
            repository: true,
            current: Mutex::new(GitRef::Branch(current.into())),
            branches: Mutex::new(branches.iter().map(ToString::to_string).collect()),
            commits: Vec::new(),
            unmerged: Vec::new(),
            remote: None,
            dirty: false,
            has_remote: true,
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn current(&self) -> GitRef {
        self.current.lock().unwrap().clone()
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn has_branch(&self, name: &str) -> bool {
        self.branches.lock().unwrap().iter().any(|b| b == name)
    }

    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

impl Vcs for FakeVcs {
    fn ensure_repository(&self) -> Result<(), GitError> {
        if self.repository {
            Ok(())
        } else {
            Err(GitError::NotARepository(PathBuf::from("/fake")))
        }
    }

    fn current_ref(&self) -> GitRef {
        self.current()
    }

    fn checkout(&self, target: &str) -> Result<(), GitError> {
        self.record(format!("checkout {target}"));
        if !self.has_branch(target) {
            return Err(GitError::RefNotFound(target.into()));
        }
        *self.current.lock().unwrap() = GitRef::Branch(target.into());
        Ok(())
    }

    fn checkout_detached(&self, commit: &str) -> Result<(), GitError> {
        self.record(format!("checkout --detach {commit}"));
        if !self.commits.iter().any(|c| c == commit) {
            return Err(GitError::RefNotFound(commit.into()));
        }
        *self.current.lock().unwrap() = GitRef::Detached(commit.chars().take(7).collect());
        Ok(())
    }

    fn create_branch(&self, name: &str, from: &str) -> Result<(), GitError> {
        self.record(format!("checkout -b {name} {from}"));
        if self.has_branch(name) {
            return Err(GitError::Command {
                command: format!("checkout -b {name}"),
                stderr: format!("a branch named '{name}' already exists"),
            });
        }
        self.branches.lock().unwrap().push(name.into());
        *self.current.lock().unwrap() = GitRef::Branch(name.into());
        Ok(())
    }

    fn delete_branch(&self, name: &str, force: bool) -> Result<BranchDeletion, GitError> {
        self.record(format!("branch -d {name}"));
        if self.current().branch() == Some(name) {
            return Err(GitError::Command {
                command: format!("branch -d {name}"),
                stderr: format!("cannot delete branch '{name}' checked out"),
            });
        }
        if !self.has_branch(name) {
            return Err(GitError::RefNotFound(name.into()));
        }
        self.branches.lock().unwrap().retain(|b| b != name);
        if !force && self.unmerged.iter().any(|b| b == name) {
            Ok(BranchDeletion::ForceDeleted)
        } else {
            Ok(BranchDeletion::Deleted)
        }
    }

    fn pull(&self) -> Result<(), GitError> {
        self.record("pull".into());
        if self.has_remote {
            Ok(())
        } else {
            Err(GitError::Command {
                command: "pull".into(),
                stderr: "There is no tracking information for the current branch.".into(),
            })
        }
    }

    fn remote_default_branch(&self) -> Option<String> {
        self.remote.clone()
    }

    fn has_uncommitted_changes(&self) -> bool {
        self.dirty
    }
}

/// Workspace in a temporary directory plus everything a workflow needs
pub struct Harness {
    pub dir: TempDir,
    pub workspace: Workspace,
    pub settings: Settings,
    pub lookup: Lookup,
    pub provider: MockProvider,
    pub vcs: FakeVcs,
}

impl Harness {
    pub fn new(provider: MockProvider, vcs: FakeVcs) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(dir.path(), None);
        let settings = Settings {
            ready_timeout: Duration::from_secs(2),
            ready_interval: Duration::from_millis(1),
            ..Settings::default()
        };
        Self {
            dir,
            workspace,
            settings,
            lookup: Lookup::default(),
            provider,
            vcs,
        }
    }

    pub fn with_env_file(self, text: &str) -> Self {
        std::fs::write(&self.workspace.env_file, text).unwrap();
        self
    }

    /// A directory where the env file should be, so every write fails
    pub fn with_env_file_blocked(self) -> Self {
        std::fs::create_dir(&self.workspace.env_file).unwrap();
        self
    }

    pub fn with_lookup(mut self, file: &[(&str, &str)]) -> Self {
        self.lookup = Lookup::from_pairs(Vec::<(&str, &str)>::new(), file.iter().copied());
        self
    }

    pub fn manual(mut self) -> Self {
        self.settings.env_update = EnvUpdate::Manual;
        self
    }

    pub fn context(&self) -> Context<'_> {
        Context {
            workspace: &self.workspace,
            settings: &self.settings,
            lookup: &self.lookup,
            project_id: PROJECT_ID,
            provider: &self.provider,
            vcs: &self.vcs,
        }
    }

    pub fn env_text(&self) -> String {
        std::fs::read_to_string(&self.workspace.env_file).unwrap_or_default()
    }

    pub fn env_value(&self, key: &str) -> Option<String> {
        neonsync::envfile::get(&self.env_text(), key)
    }
}
