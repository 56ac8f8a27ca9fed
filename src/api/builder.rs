use std::path::PathBuf;

use home::home_dir;
use log::debug;

use crate::{config::KcloneConfig, git::GitCloner, Kclone, KcloneError};

#[derive(Default)]
pub struct KcloneBuilder {
    workspace_root: Option<PathBuf>,
    test_mode: bool,
    config: Option<KcloneConfig>,
    git_config: Option<git2::Config>,
}

impl KcloneBuilder {
    /// Directory that receives the `gitworks` tree.
    ///
    /// Takes precedence over test mode and the configured default.
    pub fn workspace_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(path.into());
        self
    }

    /// Use the current directory as workspace root.
    pub fn test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }

    /// User configuration.
    ///
    /// Defaults to [`KcloneConfig::load`].
    pub fn config(mut self, config: KcloneConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Git configuration used to look up credential helpers.
    ///
    /// Defaults to the global/system git configuration.
    pub fn git_config(mut self, git_config: git2::Config) -> Self {
        self.git_config = Some(git_config);
        self
    }

    pub fn try_build(self) -> Result<Kclone, KcloneError> {
        let Self {
            workspace_root,
            test_mode,
            config,
            git_config,
        } = self;

        let configured_root = if workspace_root.is_some() || test_mode {
            None
        } else {
            match config {
                Some(config) => config.workspace_root,
                None => KcloneConfig::load()?.workspace_root,
            }
        };

        let workspace_root =
            select_workspace_root(workspace_root, test_mode, configured_root, home_dir)?;
        debug!("Using workspace root {}", workspace_root.display());

        let cloner = match git_config {
            Some(git_config) => GitCloner::new(git_config),
            None => GitCloner::from_default_config()?,
        };

        Ok(Kclone {
            cloner,
            workspace_root,
        })
    }
}

fn select_workspace_root(
    explicit: Option<PathBuf>,
    test_mode: bool,
    configured: Option<PathBuf>,
    home: impl FnOnce() -> Option<PathBuf>,
) -> Result<PathBuf, KcloneError> {
    if let Some(root) = explicit {
        return Ok(root);
    }
    if test_mode {
        return Ok(PathBuf::from("."));
    }
    if let Some(root) = configured {
        return Ok(root);
    }
    home().ok_or_else(|| {
        KcloneError::Environment("home directory not found, please define $HOME".to_owned())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn home() -> Option<PathBuf> {
        Some(PathBuf::from("/home/user"))
    }

    #[test]
    fn explicit_root_wins() {
        let root =
            select_workspace_root(Some("/work".into()), true, Some("/cfg".into()), home).unwrap();
        assert_eq!(root, PathBuf::from("/work"));
    }

    #[test]
    fn test_mode_uses_current_directory() {
        let root = select_workspace_root(None, true, Some("/cfg".into()), home).unwrap();
        assert_eq!(root, PathBuf::from("."));
    }

    #[test]
    fn configured_root_before_home() {
        let root = select_workspace_root(None, false, Some("/cfg".into()), home).unwrap();
        assert_eq!(root, PathBuf::from("/cfg"));
    }

    #[test]
    fn home_is_the_default() {
        let root = select_workspace_root(None, false, None, home).unwrap();
        assert_eq!(root, PathBuf::from("/home/user"));
    }

    #[test]
    fn missing_home_is_an_environment_error() {
        let error = select_workspace_root(None, false, None, || None).unwrap_err();
        assert!(matches!(error, KcloneError::Environment(_)), "{error:?}");
    }

    #[test]
    fn build_with_injected_configuration() {
        let kclone = KcloneBuilder::default()
            .config(KcloneConfig {
                workspace_root: Some("/configured".into()),
            })
            .git_config(git2::Config::new().unwrap())
            .try_build()
            .unwrap();
        assert_eq!(kclone.workspace_root(), PathBuf::from("/configured").as_path());

        let clone_path = kclone
            .resolve("git@github.com:git-fixtures/basic.git")
            .unwrap();
        assert_eq!(
            clone_path.path(),
            PathBuf::from_iter(["/configured", "gitworks", "github.com", "git-fixtures", "basic"])
                .as_path()
        );
    }

    #[test]
    fn build_in_test_mode_ignores_configuration() {
        let kclone = KcloneBuilder::default()
            .test_mode(true)
            .config(KcloneConfig {
                workspace_root: Some("/configured".into()),
            })
            .git_config(git2::Config::new().unwrap())
            .try_build()
            .unwrap();
        assert_eq!(kclone.workspace_root(), PathBuf::from(".").as_path());
    }
}
