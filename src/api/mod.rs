use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::{
    cli::command_handlers::do_clone,
    config::ConfigError,
    git::{CloneError, GitCloner},
    resolver::{resolve, ClonePath, ResolveError},
};

mod builder;

pub use builder::KcloneBuilder;

#[derive(Error, Debug)]
pub enum KcloneError {
    #[error("Missing git url. Usage: kclone <git url>")]
    Usage,
    #[error("Could not determine the workspace root: {0}")]
    Environment(String),
    #[error(transparent)]
    InvalidUrl(#[from] ResolveError),
    #[error("Clone failed: {0}")]
    Clone(#[from] CloneError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Clones repositories under `<workspace root>/gitworks`.
pub struct Kclone {
    cloner: GitCloner,
    workspace_root: PathBuf,
}

impl Kclone {
    pub fn builder() -> KcloneBuilder {
        KcloneBuilder::default()
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Computes where `url` would be cloned without touching the filesystem
    pub fn resolve(&self, url: &str) -> Result<ClonePath, KcloneError> {
        Ok(resolve(url, &self.workspace_root)?)
    }

    /// Recursively clones `url` into its resolved path and returns that path
    pub fn clone(&self, url: &str) -> Result<ClonePath, KcloneError> {
        do_clone(&self.cloner, &self.workspace_root, url)
    }
}
