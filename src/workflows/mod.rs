//! Workflow orchestrators
//!
//! Each workflow is a linear sequence of steps. A failing required step
//! returns an error, a failing optional step prints a warning and the
//! workflow carries on. Nothing is rolled back.

pub mod cleanup_feature;
pub mod create_snapshot;
pub mod init_new_feature;
pub mod restore_prod;
pub mod test_commit_id;
pub mod which_db;

use crate::{
    config::{EnvUpdate, Lookup, Settings, Workspace},
    envfile::EnvFile,
    git::Vcs,
    neon::{Branch, BranchProvider, ConnectionQuery, console_url},
    report::{mask_uri, step, warning},
};

/// Lifetime of feature and test branches, in days
pub const BRANCH_TTL_DAYS: i64 = 14;

/// Lifetime of production snapshots, in months
pub const SNAPSHOT_TTL_MONTHS: u32 = 4;

/// Everything a workflow talks to, passed explicitly
pub struct Context<'a> {
    pub workspace: &'a Workspace,
    pub settings: &'a Settings,
    pub lookup: &'a Lookup,
    pub project_id: &'a str,
    pub provider: &'a dyn BranchProvider,
    pub vcs: &'a dyn Vcs,
}

impl Context<'_> {
    #[must_use]
    pub fn connection_query(&self, branch_id: &str) -> ConnectionQuery {
        ConnectionQuery {
            branch_id: branch_id.to_string(),
            database: self.settings.database.clone(),
            role: self.settings.role.clone(),
            pooled: true,
        }
    }
}

/// How `DATABASE_URL` ended up after a workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvOutcome {
    Updated,
    /// Manual mode, instructions were printed
    Instructed,
    /// The write failed, instructions were printed
    WriteFailed,
    /// No connection string could be obtained
    Unavailable,
}

impl EnvOutcome {
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Updated => "updated",
            Self::Instructed => "not changed (manual mode)",
            Self::WriteFailed => "not changed (write failed)",
            Self::Unavailable => "not changed (no connection string)",
        }
    }

    /// Outcome when there is no URL to write
    #[must_use]
    pub const fn without_url(mode: EnvUpdate) -> Self {
        match mode {
            EnvUpdate::Manual => Self::Instructed,
            EnvUpdate::Auto => Self::Unavailable,
        }
    }
}

/// Point `DATABASE_URL` at `url`, backing up the previous value first when
/// `backup_key` is given.
///
/// A failed write is only a warning, the remote change already happened and
/// must not be undone because of the local file.
#[must_use]
pub fn apply_database_url(
    workspace: &Workspace,
    mode: EnvUpdate,
    url: &str,
    backup_key: Option<&str>,
) -> EnvOutcome {
    if mode == EnvUpdate::Manual {
        print_manual_update(workspace, url);
        return EnvOutcome::Instructed;
    }

    let result = EnvFile::load(&workspace.env_file).and_then(|mut env| {
        if let Some(backup_key) = backup_key
            && env.backup(crate::config::DATABASE_URL, backup_key)
        {
            step(format!("Backed up previous DATABASE_URL as {backup_key}"));
        }
        env.set(crate::config::DATABASE_URL, url);
        env.save()
    });

    match result {
        Ok(()) => {
            step(format!(
                "Updated DATABASE_URL in {} to {}",
                workspace.env_file.display(),
                mask_uri(url)
            ));
            EnvOutcome::Updated
        }
        Err(e) => {
            warning(format!(
                "could not update {}: {e}",
                workspace.env_file.display()
            ));
            print_manual_update(workspace, url);
            EnvOutcome::WriteFailed
        }
    }
}

fn print_manual_update(workspace: &Workspace, url: &str) {
    println!();
    println!(
        "Update {} manually with:",
        workspace.env_file.display()
    );
    println!("  DATABASE_URL=\"{url}\"");
    println!();
}

/// Warn before checkouts that would carry local changes along
pub fn warn_if_dirty(vcs: &dyn Vcs) {
    if vcs.has_uncommitted_changes() {
        warning("you have uncommitted changes, they will follow you to the new checkout");
    }
}

/// Best-effort pull, a missing remote is not an error
pub fn pull_best_effort(vcs: &dyn Vcs) {
    match vcs.pull() {
        Ok(()) => step("Pulled latest changes"),
        Err(e) => warning(format!("git pull failed, continuing with local state: {e}")),
    }
}

/// Connection string of a branch, `None` with a warning when the lookup fails
pub async fn fetch_connection_uri(ctx: &Context<'_>, branch_id: &str) -> Option<String> {
    match ctx
        .provider
        .connection_uri(&ctx.connection_query(branch_id))
        .await
    {
        Ok(uri) => Some(uri),
        Err(e) => {
            warning(format!("could not fetch the connection string: {e}"));
            None
        }
    }
}

/// Point the user at the console when the connection string has to be copied
/// by hand
pub fn print_console_instructions(ctx: &Context<'_>, branch: &Branch) {
    println!();
    println!("Copy the connection string of branch {} from:", branch.name);
    println!("  {}", console_url(ctx.project_id, &branch.id));
    println!(
        "and set it as DATABASE_URL in {}",
        ctx.workspace.env_file.display()
    );
    println!();
}
