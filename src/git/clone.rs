use std::{
    io,
    path::{Path, PathBuf},
};

use git2::{
    build::{CheckoutBuilder, RepoBuilder},
    Config, Cred, CredentialType, FetchOptions, RemoteCallbacks, Repository,
    SubmoduleUpdateOptions,
};
use log::{info, trace};
use thiserror::Error;

use super::{
    known_hosts::{check_certificate, default_known_hosts_files},
    progress::{CheckoutProgress, SidebandProgress, TransferProgress, TransferStats},
};

#[derive(Error, Debug)]
pub enum CloneError {
    #[error("Destination {} already exists and is not an empty directory", path.display())]
    DestinationExists { path: PathBuf },
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),
    #[error("Failed to update submodule {name}: {source}")]
    Submodule { name: String, source: git2::Error },
    #[error("IO error: {0}")]
    IO(#[from] io::Error),
}

/// Performs recursive clones, reporting progress on stderr.
pub struct GitCloner {
    git_config: Config,
    known_hosts_files: Vec<PathBuf>,
}

impl GitCloner {
    pub fn new(git_config: Config) -> GitCloner {
        GitCloner {
            git_config,
            known_hosts_files: default_known_hosts_files(),
        }
    }

    /// Uses the user's global/system git configuration for credential helpers.
    pub fn from_default_config() -> Result<GitCloner, CloneError> {
        Ok(Self::new(Config::open_default()?))
    }

    pub fn known_hosts_files(mut self, files: Vec<PathBuf>) -> Self {
        self.known_hosts_files = files;
        self
    }

    /// Clones `url` into `destination`, then every submodule, recursively.
    ///
    /// `destination` must not exist or be an empty directory. Nothing is
    /// cleaned up on failure.
    pub fn clone(&self, url: &str, destination: &Path) -> Result<Repository, CloneError> {
        check_destination(destination)?;

        info!("git clone {} {} --recursive", url, destination.display());

        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut repo_builder = RepoBuilder::new();
        repo_builder
            .fetch_options(self.fetch_options())
            .with_checkout(checkout_builder());
        let repo = repo_builder.clone(url, destination)?;

        self.update_submodules(&repo)?;

        Ok(repo)
    }

    fn update_submodules(&self, repo: &Repository) -> Result<(), CloneError> {
        for mut submodule in repo.submodules()? {
            let name = submodule.name().unwrap_or("<unnamed>").to_owned();
            info!(
                "Cloning submodule {} ({}) into {}",
                name,
                submodule.url().unwrap_or("<no url>"),
                submodule.path().display()
            );

            let mut update_options = SubmoduleUpdateOptions::new();
            update_options
                .fetch(self.fetch_options())
                .checkout(checkout_builder());

            let nested = submodule
                .update(true, Some(&mut update_options))
                .and_then(|_| submodule.open())
                .map_err(|source| CloneError::Submodule {
                    name: name.clone(),
                    source,
                })?;

            self.update_submodules(&nested)?;
        }
        Ok(())
    }

    fn fetch_options(&self) -> FetchOptions<'_> {
        let mut callbacks = RemoteCallbacks::new();

        let mut attempts = CredentialAttempts::new();
        callbacks.credentials(move |url, username, allowed_types| {
            trace!(
                "Requested credentials for {}, username {:?}, allowed types {:?}",
                url,
                username,
                allowed_types
            );
            match attempts.next(allowed_types) {
                // Asking for ssh username
                Some(CredentialKind::Username) => Cred::username(username.unwrap_or("git")),
                Some(CredentialKind::SshAgent) => {
                    Cred::ssh_key_from_agent(username.unwrap_or("git"))
                }
                // HTTP auth
                Some(CredentialKind::CredentialHelper) => {
                    Cred::credential_helper(&self.git_config, url, username)
                }
                None => Err(git2::Error::from_str("no valid authentication available")),
            }
        });

        callbacks.certificate_check(|certificate, host| {
            check_certificate(&self.known_hosts_files, certificate, host)
        });

        let mut sideband = SidebandProgress::new(io::stderr());
        callbacks.sideband_progress(move |data| sideband.forward(data));

        let mut transfer = TransferProgress::new(io::stderr());
        callbacks.transfer_progress(move |progress| {
            transfer.update(TransferStats::from(&progress));
            true
        });

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(callbacks);
        fetch_options
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CredentialKind {
    Username,
    SshAgent,
    CredentialHelper,
}

/// libgit2 keeps asking while credentials are rejected, so each kind is offered once.
struct CredentialAttempts {
    attempted: CredentialType,
}

impl CredentialAttempts {
    fn new() -> Self {
        CredentialAttempts {
            attempted: CredentialType::empty(),
        }
    }

    fn next(&mut self, allowed_types: CredentialType) -> Option<CredentialKind> {
        let candidates = [
            (CredentialType::USERNAME, CredentialKind::Username),
            (CredentialType::SSH_KEY, CredentialKind::SshAgent),
            (
                CredentialType::USER_PASS_PLAINTEXT,
                CredentialKind::CredentialHelper,
            ),
        ];
        for (credential_type, kind) in candidates {
            if allowed_types.contains(credential_type) && !self.attempted.contains(credential_type)
            {
                self.attempted.insert(credential_type);
                return Some(kind);
            }
        }
        None
    }
}

fn checkout_builder() -> CheckoutBuilder<'static> {
    let mut progress = CheckoutProgress::new(io::stderr());
    let mut checkout = CheckoutBuilder::new();
    checkout.progress(move |path, completed, total| progress.update(path, completed, total));
    checkout
}

fn check_destination(destination: &Path) -> Result<(), CloneError> {
    if !destination.exists() {
        return Ok(());
    }
    if destination.is_dir() && std::fs::read_dir(destination)?.next().is_none() {
        return Ok(());
    }
    Err(CloneError::DestinationExists {
        path: destination.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use git2::Signature;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn cloner() -> GitCloner {
        GitCloner::new(Config::new().unwrap()).known_hosts_files(vec![])
    }

    fn commit_all(repo: &Repository, message: &str) {
        let mut index = repo.index().unwrap();
        index
            .add_all(["*"], git2::IndexAddOption::DEFAULT, None)
            .unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let signature = Signature::now("kclone", "kclone@example.com").unwrap();
        let parent = repo.head().ok().and_then(|head| head.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
            .unwrap();
    }

    fn source_repo(dir: &Path, file: &str, content: &str) -> Repository {
        let repo = Repository::init(dir).unwrap();
        std::fs::write(dir.join(file), content).unwrap();
        commit_all(&repo, "initial commit");
        repo
    }

    fn url(path: &Path) -> String {
        path.to_str().unwrap().to_owned()
    }

    #[test]
    fn each_credential_kind_is_offered_once() {
        let mut attempts = CredentialAttempts::new();
        assert_eq!(
            attempts.next(CredentialType::USERNAME),
            Some(CredentialKind::Username)
        );
        assert_eq!(attempts.next(CredentialType::USERNAME), None);
        assert_eq!(
            attempts.next(CredentialType::SSH_KEY),
            Some(CredentialKind::SshAgent)
        );
        assert_eq!(attempts.next(CredentialType::SSH_KEY), None);
        assert_eq!(
            attempts.next(CredentialType::USER_PASS_PLAINTEXT),
            Some(CredentialKind::CredentialHelper)
        );
        assert_eq!(attempts.next(CredentialType::USER_PASS_PLAINTEXT), None);
    }

    #[test]
    fn rejected_credential_falls_back_to_next_kind() {
        let mut attempts = CredentialAttempts::new();
        let allowed = CredentialType::SSH_KEY | CredentialType::USER_PASS_PLAINTEXT;
        assert_eq!(attempts.next(allowed), Some(CredentialKind::SshAgent));
        assert_eq!(attempts.next(allowed), Some(CredentialKind::CredentialHelper));
        assert_eq!(attempts.next(allowed), None);
    }

    #[test]
    fn clone_populates_destination() {
        let workspace = TempDir::new().unwrap();
        let source = workspace.path().join("source");
        source_repo(&source, "README.md", "hello");

        let destination = workspace.path().join("gitworks").join("local").join("basic");
        let repo = cloner().clone(&url(&source), &destination).unwrap();

        assert!(!repo.is_bare());
        assert_eq!(
            std::fs::read_to_string(destination.join("README.md")).unwrap(),
            "hello"
        );
    }

    #[test]
    fn clone_into_empty_directory() {
        let workspace = TempDir::new().unwrap();
        let source = workspace.path().join("source");
        source_repo(&source, "README.md", "hello");

        let destination = workspace.path().join("empty");
        std::fs::create_dir(&destination).unwrap();

        cloner().clone(&url(&source), &destination).unwrap();
        assert!(destination.join("README.md").exists());
    }

    #[test]
    fn clone_refuses_existing_destination() {
        let workspace = TempDir::new().unwrap();
        let source = workspace.path().join("source");
        source_repo(&source, "README.md", "hello");

        let destination = workspace.path().join("taken");
        std::fs::create_dir(&destination).unwrap();
        std::fs::write(destination.join("keep.txt"), "mine").unwrap();

        let error = cloner()
            .clone(&url(&source), &destination)
            .err()
            .expect("clone should fail");
        assert!(
            matches!(error, CloneError::DestinationExists { ref path } if path == &destination),
            "{error:?}"
        );
        assert_eq!(
            std::fs::read_to_string(destination.join("keep.txt")).unwrap(),
            "mine"
        );
        assert!(!destination.join("README.md").exists());
    }

    #[test]
    fn clone_refuses_file_destination() {
        let workspace = TempDir::new().unwrap();
        let destination = workspace.path().join("file");
        std::fs::write(&destination, "").unwrap();

        let error = cloner()
            .clone(&url(&workspace.path().join("source")), &destination)
            .err()
            .expect("clone should fail");
        assert!(matches!(error, CloneError::DestinationExists { .. }), "{error:?}");
    }

    #[test]
    fn clone_reports_missing_remote() {
        let workspace = TempDir::new().unwrap();
        let destination = workspace.path().join("destination");

        let error = cloner()
            .clone(&url(&workspace.path().join("missing")), &destination)
            .err()
            .expect("clone should fail");
        assert!(matches!(error, CloneError::Git(_)), "{error:?}");
    }

    #[test]
    fn clone_recurses_into_submodules() {
        let workspace = TempDir::new().unwrap();
        let library = workspace.path().join("library");
        source_repo(&library, "lib.txt", "library");

        let application = workspace.path().join("application");
        let repo = source_repo(&application, "app.txt", "application");
        {
            let mut submodule = repo
                .submodule(&url(&library), Path::new("vendor/library"), true)
                .unwrap();
            submodule.clone(None).unwrap();
            submodule.add_finalize().unwrap();
        }
        commit_all(&repo, "add submodule");

        let destination = workspace.path().join("clone");
        cloner().clone(&url(&application), &destination).unwrap();

        assert!(destination.join("app.txt").exists());
        assert_eq!(
            std::fs::read_to_string(destination.join("vendor").join("library").join("lib.txt"))
                .unwrap(),
            "library"
        );
    }
}
