use super::{Action, Globals};
use crate::{
    config::{Credentials, Lookup, Settings, Workspace},
    git::{GitCli, Vcs},
    neon::NeonClient,
    report::print_troubleshooting,
    workflows::{
        Context, cleanup_feature, create_snapshot, init_new_feature, restore_prod,
        test_commit_id, which_db,
    },
};
use anyhow::Result;
use tracing::{debug, info};

/// Everything needed to talk to Neon, built only by commands that do
struct Remote {
    settings: Settings,
    credentials: Credentials,
    client: NeonClient,
}

impl Remote {
    fn connect(globals: &Globals, lookup: &Lookup) -> Result<Self> {
        let settings = Settings::from_lookup(lookup, globals.env_update)?;
        let credentials = Credentials::resolve(lookup)?;
        let client = NeonClient::new(&credentials, &settings.api_url)?;
        debug!(
            "project {} via {} ({}/{})",
            credentials.project_id, settings.api_url, settings.database, settings.role
        );
        Ok(Self {
            settings,
            credentials,
            client,
        })
    }

    fn context<'a>(
        &'a self,
        workspace: &'a Workspace,
        lookup: &'a Lookup,
        vcs: &'a dyn Vcs,
    ) -> Context<'a> {
        Context {
            workspace,
            settings: &self.settings,
            lookup,
            project_id: &self.credentials.project_id,
            provider: &self.client,
            vcs,
        }
    }
}

/// Execute the action's business logic by delegating to the appropriate workflow
pub async fn execute(action: Action) -> Result<()> {
    info!("running {}", action.name());

    let result = run(&action).await;
    if result.is_err() {
        print_troubleshooting(action.troubleshooting());
    }
    result
}

async fn run(action: &Action) -> Result<()> {
    let globals = action.globals();
    let workspace = &globals.workspace;
    let lookup = Lookup::load(&workspace.env_file)?;
    let vcs = GitCli::new(workspace.root.clone());

    let summary = match action {
        Action::RestoreProd { .. } => {
            restore_prod::run(workspace, &vcs, &lookup, globals.env_update)?
        }
        Action::InitNewFeature { branch, .. } => {
            let remote = Remote::connect(globals, &lookup)?;
            let ctx = remote.context(workspace, &lookup, &vcs);
            init_new_feature::run(&ctx, branch.as_deref()).await?
        }
        Action::CreateSnapshot { commit, .. } => {
            let remote = Remote::connect(globals, &lookup)?;
            let ctx = remote.context(workspace, &lookup, &vcs);
            create_snapshot::run(&ctx, commit).await?
        }
        Action::TestCommitId {
            commit, checkout, ..
        } => {
            let remote = Remote::connect(globals, &lookup)?;
            let ctx = remote.context(workspace, &lookup, &vcs);
            test_commit_id::run(&ctx, commit, *checkout).await?
        }
        Action::CleanupFeature {
            branch,
            delete_git_branch,
            ..
        } => {
            let remote = Remote::connect(globals, &lookup)?;
            let ctx = remote.context(workspace, &lookup, &vcs);
            cleanup_feature::run(&ctx, branch.as_deref(), *delete_git_branch).await?
        }
        Action::WhichDb { .. } => {
            let remote = Remote::connect(globals, &lookup)?;
            let ctx = remote.context(workspace, &lookup, &vcs);
            which_db::run(&ctx).await?
        }
    };

    println!("{summary}");
    Ok(())
}
