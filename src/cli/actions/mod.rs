mod run;

use crate::config::{EnvUpdate, Workspace};

/// Options shared by every command
#[derive(Debug, Clone)]
pub struct Globals {
    pub workspace: Workspace,
    pub env_update: EnvUpdate,
}

/// Action enum representing each possible command
#[derive(Debug)]
pub enum Action {
    InitNewFeature {
        globals: Globals,
        branch: Option<String>,
    },
    CreateSnapshot {
        globals: Globals,
        commit: String,
    },
    TestCommitId {
        globals: Globals,
        commit: String,
        checkout: bool,
    },
    RestoreProd {
        globals: Globals,
    },
    CleanupFeature {
        globals: Globals,
        branch: Option<String>,
        delete_git_branch: bool,
    },
    WhichDb {
        globals: Globals,
    },
}

impl Action {
    /// Execute the action
    ///
    /// # Errors
    ///
    /// Returns an error if the action fails to execute
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }

    #[must_use]
    pub const fn globals(&self) -> &Globals {
        match self {
            Self::InitNewFeature { globals, .. }
            | Self::CreateSnapshot { globals, .. }
            | Self::TestCommitId { globals, .. }
            | Self::RestoreProd { globals }
            | Self::CleanupFeature { globals, .. }
            | Self::WhichDb { globals } => globals,
        }
    }

    /// Command name as typed on the command line
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::InitNewFeature { .. } => "init-new-feature",
            Self::CreateSnapshot { .. } => "create-snapshot",
            Self::TestCommitId { .. } => "test-commit-id",
            Self::RestoreProd { .. } => "restore-prod",
            Self::CleanupFeature { .. } => "cleanup-feature",
            Self::WhichDb { .. } => "which-db",
        }
    }

    /// Hints printed after a failure
    #[must_use]
    pub const fn troubleshooting(&self) -> &'static [&'static str] {
        match self {
            Self::InitNewFeature { .. } => &[
                "check NEON_API_KEY and NEON_PROJECT_ID in your .env file",
                "make sure the project has a `production` or `main` branch",
                "commit or stash local changes if the checkout was refused",
            ],
            Self::CreateSnapshot { .. } => &[
                "pass the full or abbreviated (7+ characters) commit id",
                "check that the API key can create snapshots in this project",
            ],
            Self::TestCommitId { .. } => &[
                "snapshots only exist for commits deployed with `neonsync create-snapshot`",
                "run `git fetch` if the commit is not available locally, or pass --no-checkout",
                "raise NEONSYNC_READY_TIMEOUT_SECS if the restore is slow",
            ],
            Self::RestoreProd { .. } => &[
                "add PRODUCTION_DATABASE_URL to your .env file",
                "commit or stash local changes if the checkout was refused",
            ],
            Self::CleanupFeature { .. } => &[
                "protected branches (main, develop, production...) are never cleaned up",
                "set DEVELOPMENT_DATABASE_URL to skip the development branch lookup",
            ],
            Self::WhichDb { .. } => &[
                "DATABASE_URL must point at a Neon host (ep-...neon.tech)",
                "check that NEON_PROJECT_ID is the project that owns the endpoint",
            ],
        }
    }
}
