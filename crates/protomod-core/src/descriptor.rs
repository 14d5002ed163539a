//! # Workspace Descriptors
//!
//! A [`WorkspaceDescriptor`] is the `proto.yaml` at the root of a workspace:
//! the workspace's remote identity, its pinned revision, and its build
//! configuration (code-generation plugins and dependency descriptors).
//!
//! ```text
//! WorkspaceDescriptor
//! ├── remote / version / commit
//! ├── build (BuildConfig)
//! │   ├── plugins [PluginSpec { name, out, opt }]
//! │   └── deps    [WorkspaceDescriptor ...]
//! └── local_root  (absolute, never serialized)
//! ```
//!
//! All filesystem access is relative to `local_root`; nothing here changes
//! the process working directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ProtoError, ProtoResult};
use crate::paths;

/// File name of the descriptor at a workspace root.
pub const DESCRIPTOR_FILE: &str = "proto.yaml";

/// Plugin used by a freshly initialized workspace.
pub const DEFAULT_PLUGIN: &str = "go";

/// Output directory of the default plugin, relative to the workspace root.
pub const DEFAULT_PLUGIN_OUT: &str = "gen/";

/// A code-generation plugin invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginSpec {
    /// Plugin name, e.g. `go` for `protoc-gen-go`.
    pub name: String,
    /// Output directory relative to the workspace root.
    #[serde(default)]
    pub out: String,
    /// Option string passed through verbatim as `--<name>_opt`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub opt: String,
}

impl PluginSpec {
    /// Plugin with no options.
    pub fn new(name: impl Into<String>, out: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            out: out.into(),
            opt: String::new(),
        }
    }

    /// Set the option string.
    pub fn with_opt(mut self, opt: impl Into<String>) -> Self {
        self.opt = opt.into();
        self
    }
}

/// Build configuration of a workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Plugins in flag order.
    #[serde(default)]
    pub plugins: Vec<PluginSpec>,
    /// Dependencies in declaration order.
    #[serde(default)]
    pub deps: Vec<WorkspaceDescriptor>,
}

/// Whether [`WorkspaceDescriptor::init`] created a new descriptor or kept an
/// existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    Created,
    Reinitialized,
}

/// One workspace's identity and build configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceDescriptor {
    /// Remote identifier in `host/path` form.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub remote: String,
    /// Free-form version label.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    /// Pinned revision. Empty means the remote's default branch.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub commit: String,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(skip)]
    local_root: PathBuf,
}

impl WorkspaceDescriptor {
    /// Fresh descriptor rooted at `local_path` with the default plugin and no
    /// dependencies.
    pub fn new(
        local_path: impl AsRef<Path>,
        remote: impl Into<String>,
        version: impl Into<String>,
    ) -> ProtoResult<Self> {
        let local_root = paths::absolutize(local_path.as_ref())?;
        Ok(Self {
            remote: remote.into(),
            version: version.into(),
            commit: String::new(),
            build: BuildConfig {
                plugins: vec![PluginSpec::new(DEFAULT_PLUGIN, DEFAULT_PLUGIN_OUT)],
                deps: Vec::new(),
            },
            local_root,
        })
    }

    /// A dependency declaration: remote plus optional pinned commit.
    pub fn dependency(remote: impl Into<String>, commit: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
            commit: commit.into(),
            ..Self::default()
        }
    }

    /// Load a descriptor from `file`. The workspace root becomes the file's
    /// directory.
    pub fn load(file: impl AsRef<Path>) -> ProtoResult<Self> {
        let file = file.as_ref();
        let content = std::fs::read_to_string(file).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ProtoError::NotFound {
                    path: file.to_path_buf(),
                }
            } else {
                ProtoError::io(file, e)
            }
        })?;
        let mut descriptor: Self =
            serde_yaml::from_str(&content).map_err(|source| ProtoError::Parse {
                path: file.to_path_buf(),
                source,
            })?;
        let abs = paths::absolutize(file)?;
        descriptor.local_root = abs
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));
        Ok(descriptor)
    }

    /// Load the descriptor of the workspace at `root`.
    pub fn load_workspace(root: impl AsRef<Path>) -> ProtoResult<Self> {
        Self::load(root.as_ref().join(DESCRIPTOR_FILE))
    }

    /// Absolute workspace root.
    pub fn local_root(&self) -> &Path {
        &self.local_root
    }

    /// Re-root the descriptor. Relative paths are made absolute.
    pub fn set_local_root(&mut self, root: impl AsRef<Path>) -> ProtoResult<()> {
        self.local_root = paths::absolutize(root.as_ref())?;
        Ok(())
    }

    /// Path of this workspace's `proto.yaml`.
    pub fn descriptor_path(&self) -> PathBuf {
        self.local_root.join(DESCRIPTOR_FILE)
    }

    /// Write the descriptor, creating or re-initializing the workspace.
    ///
    /// An existing `proto.yaml` wins for `remote` and `build`, so re-running
    /// init never drops declared dependencies. `version` and `commit` come
    /// from `self`.
    pub fn init(&mut self) -> ProtoResult<InitOutcome> {
        std::fs::create_dir_all(&self.local_root)
            .map_err(|e| ProtoError::io(&self.local_root, e))?;

        let path = self.descriptor_path();
        let outcome = if path.is_file() {
            let existing = Self::load(&path)?;
            self.remote = existing.remote;
            self.build = existing.build;
            tracing::warn!(root = %self.local_root.display(), "reinitializing existing workspace");
            InitOutcome::Reinitialized
        } else {
            InitOutcome::Created
        };

        self.save()?;
        self.validate().map_err(|e| ProtoError::Validation(e.to_string()))?;
        tracing::info!(path = %path.display(), ?outcome, "wrote descriptor");
        Ok(outcome)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> ProtoResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Write `proto.yaml` at the workspace root.
    pub fn save(&self) -> ProtoResult<()> {
        let yaml = self.to_yaml()?;
        let path = self.descriptor_path();
        std::fs::write(&path, yaml).map_err(|e| ProtoError::io(&path, e))
    }

    /// Check that the workspace root holds a `proto.yaml`.
    pub fn validate(&self) -> ProtoResult<()> {
        if self.descriptor_path().is_file() {
            Ok(())
        } else {
            Err(ProtoError::MissingDescriptor {
                root: self.local_root.clone(),
            })
        }
    }
}
