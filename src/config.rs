use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use config::{Config, Environment, File, FileFormat};
use home::home_dir;
use log::debug;
use serde::Deserialize;
use thiserror::Error;
use toml::{Table, Value};

const CONFIG_FILE_NAME: &str = ".kclone.toml";
const WORKSPACE_TABLE: &str = "workspace";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Could not read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Could not parse {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("Could not serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Could not write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
    #[error("Expected `{key}` to be a table in {path}")]
    NotATable { path: String, key: String },
    #[error("Could not find home dir. Please define $HOME env variable.")]
    NoHome,
}

/// User level settings, read from `~/.kclone.toml` and `KCLONE_*` variables.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct KcloneConfig {
    pub workspace_root: Option<PathBuf>,
}

impl KcloneConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let raw_config = RawConfig::load(default_config_file().as_deref(), None)?;

        Ok(Self {
            workspace_root: raw_config.workspace.root,
        })
    }

    /// Location of the user configuration file.
    pub fn file() -> Result<PathBuf, ConfigError> {
        default_config_file().ok_or(ConfigError::NoHome)
    }

    /// Persists `root` as the default workspace root, keeping every other key of `file`.
    pub fn save_workspace_root(file: &Path, root: &Path) -> Result<(), ConfigError> {
        let mut document = if file.exists() {
            let contents = std::fs::read_to_string(file).map_err(|source| ConfigError::Read {
                path: file.display().to_string(),
                source,
            })?;
            contents
                .parse::<Table>()
                .map_err(|source| ConfigError::Parse {
                    path: file.display().to_string(),
                    source,
                })?
        } else {
            Table::new()
        };

        let workspace = document
            .entry(WORKSPACE_TABLE)
            .or_insert(Value::Table(Table::new()))
            .as_table_mut()
            .ok_or_else(|| ConfigError::NotATable {
                path: file.display().to_string(),
                key: WORKSPACE_TABLE.to_owned(),
            })?;
        workspace.insert("root".to_owned(), Value::try_from(root)?);

        std::fs::write(file, toml::to_string_pretty(&document)?).map_err(|source| {
            ConfigError::Write {
                path: file.display().to_string(),
                source,
            }
        })
    }
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct RawConfig {
    #[serde(default)]
    workspace: WorkspaceConfig,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct WorkspaceConfig {
    root: Option<PathBuf>,
}

impl RawConfig {
    fn load(
        file: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder();
        if let Some(file) = file {
            debug!("Loading configuration from {}", file.display());
            builder = builder.add_source(
                File::from(file)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }
        builder
            .add_source(
                Environment::with_prefix("KCLONE")
                    .separator("_")
                    .source(env),
            )
            .build()?
            .try_deserialize()
    }
}

fn default_config_file() -> Option<PathBuf> {
    home_dir().map(|home| home.join(CONFIG_FILE_NAME))
}
