//! # Init Subcommand
//!
//! Creates `proto.yaml` in a workspace, or re-initializes an existing one
//! while keeping its remote and build configuration.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use protomod_core::{InitOutcome, RemoteId, WorkspaceDescriptor};

/// Arguments for `proto init`.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Remote identifier of this workspace (e.g. example.com/org/pkg).
    pub remote: String,

    /// Directory to initialize.
    #[arg(short, long, default_value = ".")]
    pub dir: PathBuf,

    /// Version label recorded in proto.yaml.
    #[arg(long, default_value = "v1")]
    pub version: String,
}

/// Execute `proto init`.
pub fn run_init(args: &InitArgs) -> Result<u8> {
    RemoteId::parse(&args.remote)?;

    let mut workspace =
        WorkspaceDescriptor::new(&args.dir, args.remote.as_str(), args.version.as_str())
            .with_context(|| format!("invalid directory {}", args.dir.display()))?;

    let outcome = workspace.init().context("failed to initialize repo")?;
    let root = workspace.local_root().display();
    match outcome {
        InitOutcome::Created => println!("Initialized proto repo in {root}"),
        InitOutcome::Reinitialized => println!("Reinitializing existing repo in {root}"),
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(remote: &str, dir: &std::path::Path) -> InitArgs {
        InitArgs {
            remote: remote.to_string(),
            dir: dir.to_path_buf(),
            version: "v1".to_string(),
        }
    }

    #[test]
    fn init_writes_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(run_init(&args("example.com/org/pkg", dir.path())).unwrap(), 0);
        let ws = WorkspaceDescriptor::load_workspace(dir.path()).unwrap();
        assert_eq!(ws.remote, "example.com/org/pkg");
        assert_eq!(ws.version, "v1");
    }

    #[test]
    fn init_rejects_malformed_remote_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run_init(&args("https://example.com/org/pkg", dir.path())).is_err());
        assert!(!dir.path().join("proto.yaml").exists());
    }

    #[test]
    fn second_init_keeps_first_remote() {
        let dir = tempfile::tempdir().unwrap();
        run_init(&args("example.com/org/pkg", dir.path())).unwrap();
        run_init(&args("example.com/org/other", dir.path())).unwrap();
        let ws = WorkspaceDescriptor::load_workspace(dir.path()).unwrap();
        assert_eq!(ws.remote, "example.com/org/pkg");
    }
}
