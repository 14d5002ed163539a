//! Error types for workspace, resolution, and compilation operations.
//!
//! Every variant carries the path, remote, or program it concerns so a
//! failure printed by the CLI points at the offending input.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the proto build core.
#[derive(Debug, Error)]
pub enum ProtoError {
    /// A path could not be made absolute.
    #[error("cannot resolve path {path}: {source}")]
    Path {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A file that must exist was not found.
    #[error("file not found: {path}")]
    NotFound { path: PathBuf },

    /// The workspace has no `proto.yaml`.
    #[error("no proto.yaml detected in {root}")]
    MissingDescriptor { root: PathBuf },

    /// The descriptor file is not valid YAML for a workspace descriptor.
    #[error("failed to parse descriptor at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    /// The descriptor could not be serialized.
    #[error("failed to serialize descriptor: {0}")]
    Serialize(#[from] serde_yaml::Error),

    /// A remote identifier is not in `host/path` form.
    #[error("invalid remote {remote:?}: {reason}")]
    RemoteFormat { remote: String, reason: String },

    /// The version-control collaborator failed to fetch a dependency.
    #[error("failed to fetch {url} at revision {revision:?}: {detail}")]
    Fetch {
        url: String,
        revision: String,
        detail: String,
    },

    /// A dependency refers back to one of its ancestors.
    #[error("dependency cycle detected at {remote}")]
    DependencyCycle { remote: String },

    /// Two dependencies would share or nest their cache checkouts.
    #[error("{remote} conflicts with cached checkout {existing}: {reason}")]
    CacheConflict {
        remote: String,
        existing: String,
        reason: String,
    },

    /// The caller's deadline passed before the named step could start.
    #[error("deadline exceeded before {stage}")]
    DeadlineExceeded { stage: String },

    /// Walking the workspace tree failed.
    #[error("failed to walk workspace: {0}")]
    Walk(#[from] walkdir::Error),

    /// A path cannot be passed to the compiler as UTF-8 text.
    #[error("path is not valid UTF-8: {}", path.display())]
    NonUtf8Path { path: PathBuf },

    /// The compiler process could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// The compiler process exited unsuccessfully.
    #[error("{program} exited with {status}\n{output}")]
    NonZeroExit {
        program: String,
        status: String,
        output: String,
    },

    /// The compiler process ran past its timeout and was killed.
    #[error("{program} timed out after {seconds}s\n{output}")]
    TimedOut {
        program: String,
        seconds: u64,
        output: String,
    },

    /// A post-write check failed.
    #[error("validation error: {0}")]
    Validation(String),

    /// The tool configuration file is unreadable or malformed.
    #[error("invalid configuration at {path}: {detail}")]
    Config { path: PathBuf, detail: String },

    /// Filesystem I/O failed on the given path.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ProtoError {
    /// Wrap an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias for core operations.
pub type ProtoResult<T> = Result<T, ProtoError>;
