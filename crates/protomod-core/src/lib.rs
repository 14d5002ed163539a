//! # protomod-core: Schema Workspace Build Core
//!
//! Resolves a workspace's declared schema dependencies into a local cache
//! and assembles the `protoc` invocation that compiles the workspace.
//!
//! ## Flow
//!
//! 1. [`WorkspaceDescriptor`] is loaded from `proto.yaml` (or created by
//!    [`WorkspaceDescriptor::init`]).
//! 2. [`Resolver`] fetches each dependency into `<root>/.proto/<remote>/`
//!    through a [`Fetcher`] (by default [`GitFetcher`]).
//! 3. [`enumerate_local_files`] lists the workspace's own `.proto` files.
//! 4. [`InvocationBuilder`] combines include paths, plugin flags, and files;
//!    [`execute`] runs the compiler.
//!
//! ## Crate Policy
//!
//! - Every operation takes its workspace root explicitly; the process
//!   working directory is never changed.
//! - No `.unwrap()` outside tests.
//! - Schema syntax is never parsed here; that is the compiler's job.

pub mod config;
pub mod descriptor;
pub mod enumerate;
pub mod error;
pub mod fetcher;
pub mod invocation;
pub mod paths;
pub mod remote;
pub mod resolver;

pub use config::ToolConfig;
pub use descriptor::{BuildConfig, InitOutcome, PluginSpec, WorkspaceDescriptor, DESCRIPTOR_FILE};
pub use enumerate::enumerate_local_files;
pub use error::{ProtoError, ProtoResult};
pub use fetcher::{Fetcher, GitFetcher, OfflineFetcher};
pub use invocation::{execute, CompilerOutput, Invocation, InvocationBuilder, COMPILER};
pub use remote::RemoteId;
pub use resolver::{
    dependency_path, DependencyGraph, DependencyNode, NodeId, ResolveMode, ResolveOptions,
    ResolvedDependency, Resolver, CACHE_DIR,
};
