//! # Fetch Subcommand
//!
//! Populates `<dir>/.proto/` with every dependency declared in `proto.yaml`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use protomod_core::{ResolveMode, ToolConfig, WorkspaceDescriptor};

/// Arguments for `proto fetch`.
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Workspace directory containing proto.yaml.
    #[arg(short, long, default_value = ".")]
    pub dir: PathBuf,

    /// Reuse checkouts already in .proto/ instead of wiping the cache.
    #[arg(long)]
    pub keep_cache: bool,

    /// Levels of nested dependencies to follow (overrides the config file).
    #[arg(long)]
    pub depth: Option<usize>,
}

/// Execute `proto fetch`.
pub fn run_fetch(args: &FetchArgs, config: &ToolConfig) -> Result<u8> {
    let workspace = WorkspaceDescriptor::load_workspace(&args.dir)
        .with_context(|| format!("failed to load workspace {}", args.dir.display()))?;

    let mode = if args.keep_cache {
        ResolveMode::Incremental
    } else {
        ResolveMode::Clean
    };
    let graph = crate::resolver(config, mode, args.depth, None)
        .resolve_all(&workspace)
        .context("failed to resolve dependencies")?;

    for (_, node) in graph.iter() {
        println!("{} -> {}", node.remote, node.resolved.cache_path.display());
    }
    println!("Fetched {} dependencies", graph.len());
    Ok(0)
}
