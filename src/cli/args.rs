use std::path::PathBuf;

use clap::Parser;

/// Clones a git repository into <workspace>/gitworks/<host>/<path>.
#[derive(Debug, Parser)]
#[clap(version)]
pub struct CliArgs {
    /// Repository url, e.g. https://github.com/owner/repo.git or git@github.com:owner/repo.git
    pub url: Option<String>,
    /// Test mode: use the current directory as workspace root
    #[clap(short, long, conflicts_with = "directory")]
    pub test: bool,
    /// Workspace root, overrides the configured default and the home directory
    #[clap(short, long)]
    pub directory: Option<PathBuf>,
    /// Saves DIR as the default workspace root and exits
    #[clap(long, value_name = "DIR")]
    pub set_default: Option<PathBuf>,
}
