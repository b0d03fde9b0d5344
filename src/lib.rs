//! Keep git branches and Neon database branches in lockstep.
//!
//! # Module Organization
//!
//! - `cli` - clap commands, dispatch and action execution
//! - `config` - credentials, settings and env file lookup
//! - `envfile` - line preserving `.env` editing
//! - `git` - the [`git::Vcs`] trait and its git CLI implementation
//! - `names` - branch and commit naming rules
//! - `neon` - Neon API client and branch resolution
//! - `report` - summaries and console output
//! - `workflows` - one orchestrator per subcommand

pub mod cli;
pub mod config;
pub mod envfile;
pub mod git;
pub mod names;
pub mod neon;
pub mod report;
pub mod workflows;
