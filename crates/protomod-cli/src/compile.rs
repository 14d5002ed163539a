//! # Compile Subcommand
//!
//! Builds the `protoc` invocation for a workspace and runs it. With
//! `--fetch` the dependency cache is refreshed first; with `--dry-run` the
//! invocation is printed and nothing is executed.
//!
//! When `max_depth` is above 1 and `--fetch` is not given, transitive
//! includes come from the cache left by an earlier `proto fetch`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use protomod_core::{
    execute, DependencyGraph, Invocation, InvocationBuilder, OfflineFetcher, ResolveMode,
    ResolveOptions, Resolver, ToolConfig, WorkspaceDescriptor,
};

/// Arguments for `proto compile`.
#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Workspace directory containing proto.yaml.
    #[arg(short, long, default_value = ".")]
    pub dir: PathBuf,

    /// Resolve dependencies before compiling.
    #[arg(long)]
    pub fetch: bool,

    /// Print the compiler invocation without running it.
    #[arg(long)]
    pub dry_run: bool,

    /// With --dry-run, print the invocation as a JSON array.
    #[arg(long, requires = "dry_run")]
    pub json: bool,
}

/// Execute `proto compile`.
pub fn run_compile(args: &CompileArgs, config: &ToolConfig) -> Result<u8> {
    let workspace = WorkspaceDescriptor::load_workspace(&args.dir)
        .with_context(|| format!("failed to load workspace {}", args.dir.display()))?;

    let graph = dependency_graph(&workspace, config, args.fetch)?;
    let invocation = plan(&workspace, config, graph.as_ref())?;

    if args.dry_run {
        if args.json {
            println!("{}", serde_json::to_string_pretty(invocation.as_slice())?);
        } else {
            println!("{invocation}");
        }
        return Ok(0);
    }

    let root = workspace.local_root().display();
    let result = execute(&invocation, config.compile_timeout())
        .with_context(|| format!("failed to compile protos in {root}"))?;
    print!("{}", result.output);
    Ok(0)
}

/// Graph of resolved dependencies, or `None` when immediate includes suffice.
fn dependency_graph(
    workspace: &WorkspaceDescriptor,
    config: &ToolConfig,
    fetch: bool,
) -> Result<Option<DependencyGraph>> {
    if fetch {
        let graph = crate::resolver(config, ResolveMode::Clean, None, None)
            .resolve_all(workspace)
            .context("failed to resolve dependencies")?;
        return Ok(Some(graph));
    }
    if config.max_depth <= 1 {
        return Ok(None);
    }
    let options = ResolveOptions {
        mode: ResolveMode::Incremental,
        max_depth: config.max_depth,
        ..ResolveOptions::default()
    };
    let graph = Resolver::with_options(OfflineFetcher, options)
        .resolve_all(workspace)
        .context("failed to read dependency cache")?;
    Ok(Some(graph))
}

fn plan(
    workspace: &WorkspaceDescriptor,
    config: &ToolConfig,
    graph: Option<&DependencyGraph>,
) -> Result<Invocation> {
    let mut builder = InvocationBuilder::new(workspace).compiler(config.compiler.as_str());
    if let Some(graph) = graph {
        builder = builder.with_resolved(graph);
    }
    builder
        .build()
        .context("failed to assemble compiler invocation")
}
