//! # protomod-cli: The `proto` Command
//!
//! Thin clap front end over `protomod-core`.
//!
//! ## Subcommands
//!
//! - `proto init <remote>`: Create or re-initialize `proto.yaml`.
//! - `proto fetch`: Resolve declared dependencies into `.proto/`.
//! - `proto compile`: Run `protoc` over the workspace.
//!
//! ```bash
//! proto init example.com/org/pkg --dir schemas
//! proto fetch --dir schemas
//! proto compile --dir schemas
//! ```
//!
//! ## Crate Policy
//!
//! - Handlers return an exit code; any error exits 1.
//! - No resolution or invocation logic lives here.

pub mod compile;
pub mod fetch;
pub mod init;

use std::time::Instant;

use protomod_core::{GitFetcher, ResolveMode, ResolveOptions, Resolver, ToolConfig};

/// Build a git-backed resolver from the tool configuration.
pub fn resolver(
    config: &ToolConfig,
    mode: ResolveMode,
    max_depth: Option<usize>,
    deadline: Option<Instant>,
) -> Resolver<GitFetcher> {
    let options = ResolveOptions {
        mode,
        max_depth: max_depth.unwrap_or(config.max_depth).max(1),
        retries: config.fetch_retries,
        deadline,
    };
    Resolver::with_options(GitFetcher::new(&config.git), options)
}
