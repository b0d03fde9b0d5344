use crate::{
    cli::actions::{Action, Globals},
    config::{EnvUpdate, Workspace},
};
use anyhow::{Context, Result, anyhow};
use clap::ArgMatches;
use std::path::PathBuf;

fn globals(matches: &ArgMatches) -> Result<Globals> {
    let dir = matches
        .get_one::<String>("dir")
        .map_or_else(|| PathBuf::from("."), PathBuf::from);
    let env_file = matches.get_one::<String>("env-file").map(PathBuf::from);

    let env_update = matches
        .get_one::<String>("env-update")
        .map(|mode| mode.parse::<EnvUpdate>().map_err(|e| anyhow!(e)))
        .transpose()?
        .unwrap_or_default();

    Ok(Globals {
        workspace: Workspace::new(dir, env_file.as_deref()),
        env_update,
    })
}

/// Convert `ArgMatches` into typed Action enum with validation
///
/// # Errors
///
/// Returns an error on an unknown subcommand or a missing required argument
pub fn dispatch(matches: &ArgMatches) -> Result<Action> {
    let globals = globals(matches)?;

    match matches.subcommand() {
        Some(("init-new-feature", sub)) => Ok(Action::InitNewFeature {
            globals,
            branch: sub.get_one::<String>("branch").cloned(),
        }),
        Some(("create-snapshot", sub)) => Ok(Action::CreateSnapshot {
            globals,
            commit: sub
                .get_one::<String>("commit")
                .cloned()
                .context("commit id is required")?,
        }),
        Some(("test-commit-id", sub)) => Ok(Action::TestCommitId {
            globals,
            commit: sub
                .get_one::<String>("commit")
                .cloned()
                .context("commit id is required")?,
            checkout: !sub.get_flag("no-checkout"),
        }),
        Some(("restore-prod", _)) => Ok(Action::RestoreProd { globals }),
        Some(("cleanup-feature", sub)) => Ok(Action::CleanupFeature {
            globals,
            branch: sub.get_one::<String>("branch").cloned(),
            delete_git_branch: sub.get_flag("delete-git-branch"),
        }),
        Some(("which-db", _)) => Ok(Action::WhichDb { globals }),
        Some((name, _)) => Err(anyhow!("unknown command: {name}")),
        None => Err(anyhow!("a command is required, see --help")),
    }
}
