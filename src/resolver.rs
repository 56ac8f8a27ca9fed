use std::{
    fmt::Display,
    path::{Component, Path, PathBuf},
    sync::OnceLock,
};

use regex_lite::Regex;
use thiserror::Error;

/// Directory created under the workspace root that holds every clone.
pub const WORKSPACE_DIRECTORY_NAME: &str = "gitworks";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Invalid git url `{0}`, expected `https://host/owner/repo.git` or `git@host:owner/repo.git`")]
    InvalidUrl(String),
}

/// Host and repository path extracted from a git url.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UrlComponents {
    pub host: String,
    /// Everything between the host separator and the `.git` suffix, always `/` separated.
    pub repo_path: String,
}

impl UrlComponents {
    pub fn parse(url: &str) -> Result<UrlComponents, ResolveError> {
        let invalid = || ResolveError::InvalidUrl(url.to_owned());

        let captures = url_regex().captures(url).ok_or_else(invalid)?;
        let host = captures.name("host").ok_or_else(invalid)?.as_str();
        let repo_path = captures.name("path").ok_or_else(invalid)?.as_str();

        if !is_plain_segment(host) || !repo_path.split('/').all(is_plain_segment) {
            return Err(invalid());
        }

        Ok(UrlComponents {
            host: host.to_owned(),
            repo_path: repo_path.to_owned(),
        })
    }

    /// Path of the clone relative to the workspace root.
    pub fn to_path(&self) -> PathBuf {
        let mut result = PathBuf::from(WORKSPACE_DIRECTORY_NAME);

        result.push(&self.host);
        for segment in self.repo_path.split('/') {
            result.push(segment);
        }

        result
    }
}

impl Display for UrlComponents {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}/{}", self.host, self.repo_path)
    }
}

/// Local destination of a clone, derived from a url and a workspace root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClonePath {
    components: UrlComponents,
    path: PathBuf,
}

impl ClonePath {
    pub fn components(&self) -> &UrlComponents {
        &self.components
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.path
    }
}

impl AsRef<Path> for ClonePath {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

impl Display for ClonePath {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Resolves `url` to `<workspace_root>/gitworks/<host>/<repo path>`.
pub fn resolve(url: &str, workspace_root: &Path) -> Result<ClonePath, ResolveError> {
    let components = UrlComponents::parse(url)?;
    let path = workspace_root.join(components.to_path());
    Ok(ClonePath { components, path })
}

fn url_regex() -> &'static Regex {
    static URL_REGEX: OnceLock<Regex> = OnceLock::new();
    URL_REGEX.get_or_init(|| {
        Regex::new(
            r"^(?:https?://|[0-9A-Za-z._-]+@)(?P<host>[0-9A-Za-z.]+)[/:](?P<path>.+)\.git$",
        )
        .unwrap()
    })
}

// Segments become directory names, so anything that could walk out of the
// workspace or act as a separator or drive prefix on another platform is refused.
fn is_plain_segment(segment: &str) -> bool {
    if segment.is_empty() || segment.contains(['\\', ':']) {
        return false;
    }
    let mut components = Path::new(segment).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
