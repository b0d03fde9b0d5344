//! `create-snapshot`: capture production as `prod-<commit>` so the commit
//! can be tested later against the data it shipped with.

use anyhow::{Context as _, Result, anyhow};
use chrono::{Months, Utc};

use super::{Context, SNAPSHOT_TTL_MONTHS};
use crate::{
    names::{snapshot_name, validate_commit_id},
    neon::resolve_production_branch,
    report::{Summary, format_countdown, step, warning},
};

/// # Errors
///
/// Fails on a malformed commit id, a missing production branch or a rejected
/// snapshot request
pub async fn run(ctx: &Context<'_>, commit: &str) -> Result<Summary> {
    let commit = validate_commit_id(commit)?;
    let name = snapshot_name(commit);

    let branches = ctx
        .provider
        .list_branches()
        .await
        .context("failed to list Neon branches")?;
    let production = resolve_production_branch(&branches).ok_or_else(|| {
        anyhow!(
            "no production branch found in Neon project {}",
            ctx.project_id
        )
    })?;

    let existing = ctx
        .provider
        .find_snapshot_by_name(&name)
        .await
        .context("failed to list snapshots")?;

    let (title, snapshot) = if let Some(snapshot) = existing {
        warning(format!("snapshot {name} already exists, not creating another one"));
        ("Snapshot already exists", snapshot)
    } else {
        let expires_at = Utc::now()
            .checked_add_months(Months::new(SNAPSHOT_TTL_MONTHS))
            .ok_or_else(|| anyhow!("snapshot expiry is out of range"))?;
        let snapshot = ctx
            .provider
            .create_snapshot(&production.id, &name, expires_at)
            .await
            .with_context(|| format!("failed to create snapshot {name}"))?;
        step(format!(
            "Created snapshot {} of {}",
            snapshot.name, production.name
        ));
        ("Snapshot created", snapshot)
    };

    Ok(Summary::new(title)
        .row("Snapshot", snapshot.name.as_str())
        .row("Snapshot ID", snapshot.id.as_str())
        .row("Source branch", production.name.as_str())
        .row("Commit", commit)
        .row("Expires", format_countdown(snapshot.expires_at, Utc::now()))
        .next_step(format!(
            "Run `neonsync test-commit-id {commit}` to test this commit against this data"
        )))
}
