use std::path::{Path, PathBuf};

use git2::{cert::Cert, CertificateCheckStatus};
use home::home_dir;
use log::trace;
use ssh_key::{known_hosts::HostPatterns, KnownHosts};

const GLOBAL_KNOWN_HOSTS: &str = "/etc/ssh/ssh_known_hosts";

/// Known hosts files consulted for ssh host keys, in lookup order.
pub fn default_known_hosts_files() -> Vec<PathBuf> {
    let mut files = vec![PathBuf::from(GLOBAL_KNOWN_HOSTS)];
    if let Some(home) = home_dir() {
        files.push(home.join(".ssh").join("known_hosts"));
    }
    files
}

/// Accepts ssh host keys listed in one of `files`, otherwise defers to libgit2.
pub fn check_certificate(
    files: &[PathBuf],
    certificate: &Cert<'_>,
    host: &str,
) -> Result<CertificateCheckStatus, git2::Error> {
    if let Some(hostkey) = certificate.as_hostkey().and_then(|h| h.hostkey()) {
        for file in files {
            if file_contains_key(file, host, hostkey) {
                return Ok(CertificateCheckStatus::CertificateOk);
            }
        }
        trace!("No known host entry matched the host key of {}", host);
    }
    Ok(CertificateCheckStatus::CertificatePassthrough)
}

fn file_contains_key(file: &Path, host: &str, hostkey: &[u8]) -> bool {
    trace!("Loading {}", file.display());
    let entries = match KnownHosts::read_file(file) {
        Ok(entries) => entries,
        Err(error) => {
            trace!("Could not load {}: {}", file.display(), error);
            return false;
        }
    };

    entries.into_iter().any(|entry| {
        host_matches_patterns(host, entry.host_patterns()) && {
            trace!(
                "Found known host entry for {} ({}) in {}",
                host,
                entry.public_key().algorithm(),
                file.display()
            );
            entry.public_key().to_bytes().as_deref() == Ok(hostkey)
        }
    })
}

fn host_matches_patterns(host: &str, patterns: &HostPatterns) -> bool {
    match patterns {
        HostPatterns::Patterns(patterns) => {
            let host = host.to_lowercase();
            let mut match_found = false;
            for pattern in patterns {
                let pattern = pattern.to_lowercase();
                // * and ? wildcards are not yet supported
                if let Some(pattern) = pattern.strip_prefix('!') {
                    if pattern == host {
                        return false;
                    }
                } else {
                    match_found |= pattern == host;
                }
            }
            match_found
        }
        // Not yet supported
        HostPatterns::HashedName { .. } => false,
    }
}
