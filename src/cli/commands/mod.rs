use clap::{
    Arg, ArgAction, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

/// Pure clap command definitions with zero business logic
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new(env!("CARGO_PKG_NAME"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("dir")
                .default_value(".")
                .global(true)
                .help("git working copy to operate on")
                .long("dir")
                .short('C')
                .value_name("PATH"),
        )
        .arg(
            Arg::new("env-file")
                .global(true)
                .help("env file holding DATABASE_URL [default: <dir>/.env]")
                .long("env-file")
                .value_name("PATH"),
        )
        .arg(
            Arg::new("env-update")
                .default_value("auto")
                .env("NEONSYNC_ENV_UPDATE")
                .global(true)
                .help("rewrite DATABASE_URL automatically or only print instructions")
                .long("env-update")
                .long_help(
                    "What to do with DATABASE_URL once the Neon side is done:\n\n\
                    - auto: write it into the env file, backing up the previous value\n\
                    - manual: leave the env file alone and print what to change",
                )
                .value_name("MODE")
                .value_parser(["auto", "manual"]),
        )
        .arg(
            Arg::new("verbose")
                .action(ArgAction::Count)
                .global(true)
                .help("increase log verbosity, -vv for debug")
                .long("verbose")
                .short('v'),
        )
        .subcommand(
            Command::new("init-new-feature")
                .about("create a git branch and a Neon branch cloned from production")
                .arg(
                    Arg::new("branch")
                        .help("feature branch name [default: current branch]")
                        .value_name("BRANCH"),
                ),
        )
        .subcommand(
            Command::new("create-snapshot")
                .about("snapshot production as prod-<commit>, run on deploy")
                .arg(
                    Arg::new("commit")
                        .help("commit id, 7 to 40 hex characters")
                        .required(true)
                        .value_name("COMMIT"),
                ),
        )
        .subcommand(
            Command::new("test-commit-id")
                .about("check out a commit and restore the production data it shipped with")
                .arg(
                    Arg::new("commit")
                        .help("commit id, 7 to 40 hex characters")
                        .required(true)
                        .value_name("COMMIT"),
                )
                .arg(
                    Arg::new("no-checkout")
                        .action(ArgAction::SetTrue)
                        .help("restore the data but leave the working copy alone")
                        .long("no-checkout"),
                ),
        )
        .subcommand(
            Command::new("restore-prod")
                .about("go back to main and the production DATABASE_URL"),
        )
        .subcommand(
            Command::new("cleanup-feature")
                .about("delete a feature's Neon branch and switch back to development")
                .arg(
                    Arg::new("branch")
                        .help("feature branch name [default: current branch]")
                        .value_name("BRANCH"),
                )
                .arg(
                    Arg::new("delete-git-branch")
                        .action(ArgAction::SetTrue)
                        .help("also delete the local git branch")
                        .long("delete-git-branch")
                        .short('g'),
                ),
        )
        .subcommand(
            Command::new("which-db").about("show which Neon branch DATABASE_URL points at"),
        )
}
