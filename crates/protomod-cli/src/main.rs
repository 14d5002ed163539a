//! # proto CLI entry point
//!
//! Parses command-line arguments, loads the optional tool configuration,
//! and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use protomod_cli::compile::{run_compile, CompileArgs};
use protomod_cli::fetch::{run_fetch, FetchArgs};
use protomod_cli::init::{run_init, InitArgs};
use protomod_core::ToolConfig;

/// Protobuf workspace tool.
///
/// Declares a workspace's schema dependencies in `proto.yaml`, fetches them
/// into `.proto/`, and drives `protoc` over the workspace's own files.
#[derive(Parser, Debug)]
#[command(name = "proto", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a tool configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create or re-initialize proto.yaml in a directory.
    Init(InitArgs),

    /// Compile the workspace's schema files with protoc.
    Compile(CompileArgs),

    /// Fetch declared dependencies into .proto/.
    Fetch(FetchArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    tracing::debug!("proto CLI starting");

    let result = ToolConfig::load_or_default(cli.config.as_deref())
        .context("failed to load configuration")
        .and_then(|config| match &cli.command {
            Commands::Init(args) => run_init(args),
            Commands::Compile(args) => run_compile(args, &config),
            Commands::Fetch(args) => run_fetch(args, &config),
        });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
