use std::path::{Path, PathBuf};

use log::info;

use crate::{
    config::KcloneConfig,
    git::GitCloner,
    resolver::{resolve, ClonePath},
    KcloneError,
};

/// Handler to the clone command
/// Resolves the destination of `url` under `workspace_root` and clones it there
pub fn do_clone(
    cloner: &GitCloner,
    workspace_root: &Path,
    url: &str,
) -> Result<ClonePath, KcloneError> {
    let clone_path = resolve(url, workspace_root)?;

    cloner.clone(url, clone_path.path())?;

    info!("Clone complete!");
    Ok(clone_path)
}

/// Handler to the `--set-default` flag
/// Stores `directory`, made absolute against the current directory, in the user configuration
pub fn do_set_default(directory: &Path) -> Result<PathBuf, KcloneError> {
    let file = KcloneConfig::file()?;
    let directory = absolute(directory)
        .map_err(|e| KcloneError::Environment(format!("could not read current directory: {e}")))?;

    KcloneConfig::save_workspace_root(&file, &directory)?;
    info!(
        "Default workspace root set to {} in {}",
        directory.display(),
        file.display()
    );
    Ok(directory)
}

/// Convenience commands for the freshly cloned repository
pub fn open_hints(clone_path: &ClonePath) -> Vec<String> {
    vec![
        format!("explorer {}", clone_path),
        format!("code     {}", clone_path),
    ]
}

fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
