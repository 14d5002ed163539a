//! Version-control fetch collaborator.
//!
//! The resolver never talks to a VCS directly. It hands a destination, a
//! clone URL, and a revision to a [`Fetcher`]; [`GitFetcher`] is the
//! production implementation and shells out to `git`.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Command;

use crate::error::{ProtoError, ProtoResult};

/// Materializes a remote repository at a revision.
pub trait Fetcher {
    /// Populate `dest` with the repository at `url`, checked out at
    /// `revision`. An empty revision means the remote's default branch.
    fn fetch_at_revision(&self, dest: &Path, url: &str, revision: &str) -> ProtoResult<()>;

    /// Whether `dir` holds a checkout made by this fetcher, as opposed to a
    /// plain directory (for example a subdirectory of another checkout).
    fn is_checkout(&self, dir: &Path) -> bool {
        dir.is_dir()
    }
}

impl<F: Fetcher + ?Sized> Fetcher for &F {
    fn fetch_at_revision(&self, dest: &Path, url: &str, revision: &str) -> ProtoResult<()> {
        (**self).fetch_at_revision(dest, url, revision)
    }

    fn is_checkout(&self, dir: &Path) -> bool {
        (**self).is_checkout(dir)
    }
}

/// Never fetches. Resolution through it only succeeds against a warm cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineFetcher;

impl Fetcher for OfflineFetcher {
    fn fetch_at_revision(&self, dest: &Path, url: &str, revision: &str) -> ProtoResult<()> {
        Err(ProtoError::Fetch {
            url: url.to_string(),
            revision: revision.to_string(),
            detail: format!("{} is not in the cache; run `proto fetch`", dest.display()),
        })
    }
}

/// Fetches with the `git` command line client: a clone followed by a
/// checkout of the pinned revision.
#[derive(Debug, Clone)]
pub struct GitFetcher {
    program: String,
}

impl Default for GitFetcher {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitFetcher {
    /// Use `program` as the git executable.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, args: &[&OsStr], url: &str, revision: &str) -> ProtoResult<()> {
        let fail = |detail: String| ProtoError::Fetch {
            url: url.to_string(),
            revision: revision.to_string(),
            detail,
        };
        tracing::debug!(program = %self.program, ?args, "running vcs command");
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|e| fail(format!("failed to run {}: {e}", self.program)))?;
        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(fail(format!("{} ({})", stderr.trim(), output.status)))
        }
    }
}

impl Fetcher for GitFetcher {
    fn fetch_at_revision(&self, dest: &Path, url: &str, revision: &str) -> ProtoResult<()> {
        if revision.starts_with('-') {
            return Err(ProtoError::Fetch {
                url: url.to_string(),
                revision: revision.to_string(),
                detail: "revision must not start with '-'".to_string(),
            });
        }
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ProtoError::io(parent, e))?;
        }

        self.run(
            &[
                OsStr::new("clone"),
                OsStr::new("--quiet"),
                OsStr::new("--"),
                OsStr::new(url),
                dest.as_os_str(),
            ],
            url,
            revision,
        )?;

        if !revision.is_empty() {
            self.run(
                &[
                    OsStr::new("-C"),
                    dest.as_os_str(),
                    OsStr::new("checkout"),
                    OsStr::new("--quiet"),
                    OsStr::new(revision),
                ],
                url,
                revision,
            )?;
        }
        Ok(())
    }

    fn is_checkout(&self, dir: &Path) -> bool {
        dir.join(".git").exists()
    }
}
