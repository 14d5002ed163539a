//! # Compiler Invocation
//!
//! Builds and runs the external schema compiler command:
//!
//! ```text
//! protoc -I<workspace> -I<dep>... --<plugin>_out=<dir> --<plugin>_opt=<opts>... <file>...
//! ```
//!
//! Include flags come in declaration order of `build.deps`, plugin flag pairs
//! in declaration order of `build.plugins`, and files sorted, so the same
//! workspace always yields the same command line.

use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::descriptor::WorkspaceDescriptor;
use crate::enumerate::enumerate_local_files;
use crate::error::{ProtoError, ProtoResult};
use crate::paths::{join_clean, path_to_arg};
use crate::resolver::{dependency_path, DependencyGraph};

/// Default compiler executable.
pub const COMPILER: &str = "protoc";

/// A complete compiler command line. The first element is the program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    args: Vec<String>,
}

impl Invocation {
    pub fn program(&self) -> &str {
        &self.args[0]
    }

    /// Arguments after the program name.
    pub fn arguments(&self) -> &[String] {
        &self.args[1..]
    }

    /// The full argument vector, program first.
    pub fn as_slice(&self) -> &[String] {
        &self.args
    }

    pub fn into_vec(self) -> Vec<String> {
        self.args
    }
}

impl std::fmt::Display for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.args.join(" "))
    }
}

/// Assembles an [`Invocation`] for a workspace.
#[derive(Debug, Clone)]
pub struct InvocationBuilder<'a> {
    workspace: &'a WorkspaceDescriptor,
    compiler: String,
    resolved: Option<&'a DependencyGraph>,
}

impl<'a> InvocationBuilder<'a> {
    pub fn new(workspace: &'a WorkspaceDescriptor) -> Self {
        Self {
            workspace,
            compiler: COMPILER.to_string(),
            resolved: None,
        }
    }

    /// Use a different compiler executable.
    pub fn compiler(mut self, compiler: impl Into<String>) -> Self {
        self.compiler = compiler.into();
        self
    }

    /// Also add include flags for transitive dependencies in `graph`,
    /// after the immediate ones.
    pub fn with_resolved(mut self, graph: &'a DependencyGraph) -> Self {
        self.resolved = Some(graph);
        self
    }

    /// Build the command line. Nothing is returned unless every path
    /// component resolves.
    pub fn build(&self) -> ProtoResult<Invocation> {
        let root = self.workspace.local_root();
        let mut args = vec![self.compiler.clone(), include_flag(root)?];

        for dep in &self.workspace.build.deps {
            let dep_dir = join_clean(root, &dependency_path(dep)?);
            args.push(include_flag(&dep_dir)?);
        }

        if let Some(graph) = self.resolved {
            for (_, node) in graph.iter().filter(|(_, n)| n.depth > 1) {
                args.push(include_flag(&node.resolved.cache_path)?);
            }
        }

        for plugin in &self.workspace.build.plugins {
            let out = join_clean(root, Path::new(&plugin.out));
            args.push(format!("--{}_out={}", plugin.name, path_to_arg(&out)?));
            args.push(format!("--{}_opt={}", plugin.name, plugin.opt));
        }

        for file in enumerate_local_files(root)? {
            args.push(path_to_arg(&file)?);
        }

        tracing::debug!(args = args.len(), "built compiler invocation");
        Ok(Invocation { args })
    }
}

fn include_flag(path: &Path) -> ProtoResult<String> {
    Ok(format!("-I{}", path_to_arg(path)?))
}

/// Text captured from a successful compiler run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOutput {
    /// Standard output and standard error, interleaved in arrival order.
    pub output: String,
}

/// Run `invocation`, capturing its output.
///
/// Both streams are read concurrently into one buffer, each chunk appended
/// as it arrives, so diagnostics keep their relative order. The captured
/// text is returned on success and carried inside
/// [`ProtoError::NonZeroExit`] or [`ProtoError::TimedOut`] on failure. With a
/// timeout the child is killed once it elapses.
pub fn execute(invocation: &Invocation, timeout: Option<Duration>) -> ProtoResult<CompilerOutput> {
    let program = invocation.program().to_string();
    tracing::info!(%program, args = invocation.arguments().len(), "running compiler");

    let mut child = Command::new(&program)
        .args(invocation.arguments())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ProtoError::Spawn {
            program: program.clone(),
            source,
        })?;

    let sink = Arc::new(Mutex::new(Vec::new()));
    let drains = [
        drain(child.stdout.take(), &sink),
        drain(child.stderr.take(), &sink),
    ];

    let deadline = timeout.map(|t| Instant::now() + t);
    let status = loop {
        let polled = match child.try_wait() {
            Ok(polled) => polled,
            Err(source) => {
                abandon(&mut child);
                if let Err(e) = collect_output(drains, &sink) {
                    tracing::debug!(error = %e, "discarding compiler output");
                }
                return Err(ProtoError::Spawn { program, source });
            }
        };
        if let Some(status) = polled {
            break Some(status);
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            abandon(&mut child);
            break None;
        }
        std::thread::sleep(Duration::from_millis(10));
    };

    let output = collect_output(drains, &sink)?;

    match status {
        Some(status) if status.success() => Ok(CompilerOutput { output }),
        Some(status) => Err(ProtoError::NonZeroExit {
            program,
            status: status.to_string(),
            output,
        }),
        None => Err(ProtoError::TimedOut {
            program,
            seconds: timeout.map(|t| t.as_secs()).unwrap_or_default(),
            output,
        }),
    }
}

/// Kill and reap a child we no longer wait on.
fn abandon(child: &mut Child) {
    // The process may exit between the last poll and the kill.
    let _ = child.kill();
    let _ = child.wait();
}

type Drain = JoinHandle<io::Result<()>>;
type Sink = Arc<Mutex<Vec<u8>>>;

fn drain<R: Read + Send + 'static>(pipe: Option<R>, sink: &Sink) -> Option<Drain> {
    let sink = Arc::clone(sink);
    pipe.map(|mut pipe| {
        std::thread::spawn(move || {
            let mut chunk = [0u8; 8192];
            loop {
                let n = match pipe.read(&mut chunk) {
                    Ok(0) => return Ok(()),
                    Ok(n) => n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                };
                sink.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .extend_from_slice(&chunk[..n]);
            }
        })
    })
}

/// Join every reader, then take the shared buffer.
fn collect_output(drains: [Option<Drain>; 2], sink: &Sink) -> ProtoResult<String> {
    for handle in drains.into_iter().flatten() {
        handle
            .join()
            .map_err(|_| io::Error::other("output reader panicked"))
            .and_then(|read| read)
            .map_err(|e| ProtoError::io("<compiler output>", e))?;
    }
    let bytes = std::mem::take(&mut *sink.lock().unwrap_or_else(PoisonError::into_inner));
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
