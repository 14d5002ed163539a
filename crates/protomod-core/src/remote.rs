//! # Remote Identifiers
//!
//! A remote names a version-controlled schema repository in DNS-path form:
//! `host/path[/more...]`, e.g. `example.com/org/pkg` or `github.com/org/repo/sub`.
//!
//! [`RemoteId::parse`] validates and canonicalizes the identifier. The
//! canonical form doubles as the cache-relative directory for the dependency,
//! so it must be filesystem-safe and injective:
//!
//! - the host is lowercased and must contain a dot,
//! - path segments are non-empty, never `.` or `..`, and use only
//!   `[A-Za-z0-9._~-]`,
//! - schemes (`https://`), user info (`git@`), ports and backslashes are
//!   rejected,
//! - one trailing `/` is trimmed.
//!
//! Two inputs map to the same cache directory only if they canonicalize to
//! the same string.

use std::fmt;
use std::path::PathBuf;

use crate::error::{ProtoError, ProtoResult};

/// Hosts whose repositories live exactly at `host/owner/repo`.
const REPO_ROOT_HOSTS: &[&str] = &["github.com", "gitlab.com", "bitbucket.org"];

/// A validated, canonical remote identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RemoteId(String);

impl RemoteId {
    /// Validate and canonicalize a remote identifier.
    pub fn parse(raw: &str) -> ProtoResult<Self> {
        let reject = |reason: &str| ProtoError::RemoteFormat {
            remote: raw.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(reject("remote is empty"));
        }
        if trimmed.contains("://") {
            return Err(reject("schemes are not allowed; use host/path form"));
        }
        if trimmed.contains('\\') {
            return Err(reject("backslashes are not allowed"));
        }
        let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);

        let mut segments = trimmed.split('/');
        let host = segments.next().unwrap_or_default();
        let path: Vec<&str> = segments.collect();

        if host.is_empty() {
            return Err(reject("missing host"));
        }
        if !host.contains('.') {
            return Err(reject("host must be a domain name containing a dot"));
        }
        if host.starts_with('.') || host.ends_with('.') {
            return Err(reject("host must not start or end with a dot"));
        }
        if !host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        {
            return Err(reject("host may only contain letters, digits, '.' and '-'"));
        }
        if path.is_empty() {
            return Err(reject("missing repository path after host"));
        }
        for segment in &path {
            if segment.is_empty() {
                return Err(reject("empty path segment"));
            }
            if *segment == "." || *segment == ".." {
                return Err(reject("relative path segments are not allowed"));
            }
            if !segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '~' | '-'))
            {
                return Err(reject(&format!("invalid characters in segment {segment:?}")));
            }
        }

        let mut canonical = host.to_ascii_lowercase();
        for segment in path {
            canonical.push('/');
            canonical.push_str(segment);
        }
        Ok(Self(canonical))
    }

    /// The canonical identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The lowercased host component.
    pub fn host(&self) -> &str {
        self.0.split('/').next().unwrap_or_default()
    }

    /// The part of the identifier naming the repository to clone.
    ///
    /// For well-known forges this is `host/owner/repo`; any deeper segments
    /// address a directory inside that repository. Elsewhere the whole
    /// identifier is the repository.
    pub fn repo_root(&self) -> &str {
        if REPO_ROOT_HOSTS.contains(&self.host()) {
            let end = self
                .0
                .match_indices('/')
                .nth(2)
                .map(|(idx, _)| idx)
                .unwrap_or(self.0.len());
            &self.0[..end]
        } else {
            &self.0
        }
    }

    /// HTTPS clone URL for the repository.
    pub fn clone_url(&self) -> String {
        format!("https://{}", self.repo_root())
    }

    /// Relative directory for this remote inside the cache directory.
    pub fn relative_dir(&self) -> PathBuf {
        self.0.split('/').collect()
    }

    /// Relative directory of the repository checkout holding this remote.
    /// Equal to [`relative_dir`](Self::relative_dir) unless the remote
    /// addresses a subdirectory of a forge repository.
    pub fn checkout_dir(&self) -> PathBuf {
        self.repo_root().split('/').collect()
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
