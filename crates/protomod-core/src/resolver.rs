//! # Dependency Resolution
//!
//! Materializes declared dependencies into the workspace cache:
//!
//! ```text
//! <root>/.proto/<canonical remote>/   include directory of a dependency
//! <root>/.proto/<repo root>/          checkout holding that directory
//! ```
//!
//! The two coincide except for forge subpath remotes such as
//! `github.com/org/repo/protos`, which share the `github.com/org/repo`
//! checkout with every other remote in the same repository. Within one
//! resolution no checkout may sit inside another; such layouts fail with
//! [`ProtoError::CacheConflict`].
//!
//! Resolution is sequential and fail-fast. Dependencies are fetched one at a
//! time in declaration order and the first failure aborts the run. The cache
//! is owned entirely by the resolver: [`ResolveMode::Clean`] deletes it before
//! anything is fetched.
//!
//! ## Dependency graph
//!
//! Descriptors nest in `proto.yaml`, but resolution flattens them into a
//! [`DependencyGraph`] arena. Each node records its parent, which makes
//! cycle detection an ancestor walk and keeps the depth bound explicit.
//! The default depth of 1 resolves only the root's immediate `deps`. A larger
//! `max_depth` reads each fetched dependency's own `proto.yaml` and resolves
//! its deps breadth-first into the same cache.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::descriptor::{WorkspaceDescriptor, DESCRIPTOR_FILE};
use crate::error::{ProtoError, ProtoResult};
use crate::fetcher::Fetcher;
use crate::paths;
use crate::remote::RemoteId;

/// Name of the dependency cache directory at a workspace root.
pub const CACHE_DIR: &str = ".proto";

/// Absolute cache directory of the workspace at `root`.
pub fn cache_dir(root: &Path) -> PathBuf {
    root.join(CACHE_DIR)
}

/// Cache-relative location of a dependency: `.proto/<canonical remote>`.
///
/// Pure: performs no I/O and no fetch.
pub fn dependency_path(dependency: &WorkspaceDescriptor) -> ProtoResult<PathBuf> {
    let remote = RemoteId::parse(&dependency.remote)?;
    Ok(remote_path(&remote))
}

fn remote_path(remote: &RemoteId) -> PathBuf {
    Path::new(CACHE_DIR).join(remote.relative_dir())
}

fn checkout_path(remote: &RemoteId) -> PathBuf {
    Path::new(CACHE_DIR).join(remote.checkout_dir())
}

/// What to do with an existing cache before resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolveMode {
    /// Delete the whole cache and re-fetch everything.
    #[default]
    Clean,
    /// Keep existing checkouts; fetch only dependencies missing from the cache.
    Incremental,
}

/// Tunables for [`Resolver`].
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    pub mode: ResolveMode,
    /// How many levels of `deps` to follow. 1 means immediate deps only.
    pub max_depth: usize,
    /// Extra attempts per fetch after the first failure.
    pub retries: u32,
    /// Checked before each dependency is resolved.
    pub deadline: Option<Instant>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            mode: ResolveMode::Clean,
            max_depth: 1,
            retries: 0,
            deadline: None,
        }
    }
}

/// A dependency present in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDependency {
    pub descriptor: WorkspaceDescriptor,
    /// Absolute include directory, `<root>/.proto/<canonical remote>`.
    pub cache_path: PathBuf,
    /// Absolute path of the repository checkout containing `cache_path`.
    pub checkout_path: PathBuf,
}

impl ResolvedDependency {
    fn locate(root: &Path, remote: &RemoteId, descriptor: &WorkspaceDescriptor) -> Self {
        Self {
            descriptor: descriptor.clone(),
            cache_path: paths::join_clean(root, &remote_path(remote)),
            checkout_path: paths::join_clean(root, &checkout_path(remote)),
        }
    }
}

/// Index of a node in a [`DependencyGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One resolved dependency in the graph.
#[derive(Debug, Clone)]
pub struct DependencyNode {
    pub remote: RemoteId,
    pub resolved: ResolvedDependency,
    /// 1 for the root's immediate deps.
    pub depth: usize,
    /// `None` for the root's immediate deps.
    pub parent: Option<NodeId>,
}

/// Arena of resolved dependencies, in resolution order.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<DependencyNode>,
    by_remote: HashMap<RemoteId, NodeId>,
}

impl DependencyGraph {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&DependencyNode> {
        self.nodes.get(id.0)
    }

    pub fn find(&self, remote: &RemoteId) -> Option<NodeId> {
        self.by_remote.get(remote).copied()
    }

    /// Nodes in resolution order: immediate deps first, then each deeper level.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &DependencyNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// `id` followed by its parent chain up to an immediate dependency.
    pub fn ancestors(&self, id: Option<NodeId>) -> impl Iterator<Item = &DependencyNode> {
        let mut next = id;
        std::iter::from_fn(move || {
            let node = self.get(next?)?;
            next = node.parent;
            Some(node)
        })
    }

    fn push(&mut self, node: DependencyNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.by_remote.insert(node.remote.clone(), id);
        self.nodes.push(node);
        id
    }
}

/// Resolves a workspace's dependencies through a [`Fetcher`].
#[derive(Debug, Clone)]
pub struct Resolver<F> {
    fetcher: F,
    options: ResolveOptions,
}

impl<F: Fetcher> Resolver<F> {
    pub fn new(fetcher: F) -> Self {
        Self::with_options(fetcher, ResolveOptions::default())
    }

    pub fn with_options(fetcher: F, options: ResolveOptions) -> Self {
        Self { fetcher, options }
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Resolve every dependency declared by `workspace`.
    pub fn resolve_all(&self, workspace: &WorkspaceDescriptor) -> ProtoResult<DependencyGraph> {
        let root = workspace.local_root();
        if self.options.mode == ResolveMode::Clean {
            clear_cache(root)?;
        }

        let own_remote = RemoteId::parse(&workspace.remote).ok();
        let mut graph = DependencyGraph::default();
        let mut queue: VecDeque<(WorkspaceDescriptor, usize, Option<NodeId>)> = workspace
            .build
            .deps
            .iter()
            .cloned()
            .map(|dep| (dep, 1, None))
            .collect();

        while let Some((dep, depth, parent)) = queue.pop_front() {
            self.check_deadline(&dep.remote)?;
            let remote = RemoteId::parse(&dep.remote)?;

            let is_cycle = own_remote.as_ref() == Some(&remote)
                || graph.ancestors(parent).any(|n| n.remote == remote);
            if is_cycle {
                return Err(ProtoError::DependencyCycle {
                    remote: remote.to_string(),
                });
            }
            if graph.find(&remote).is_some() {
                tracing::debug!(%remote, "dependency already resolved");
                continue;
            }

            let resolved = match self.shared_checkout(&graph, root, &remote, &dep)? {
                Some(shared) => shared,
                None => self.resolve(root, &dep)?,
            };
            let nested = if depth < self.options.max_depth {
                nested_deps(&resolved.cache_path)?
            } else {
                Vec::new()
            };
            let id = graph.push(DependencyNode {
                remote,
                resolved,
                depth,
                parent,
            });
            queue.extend(nested.into_iter().map(|child| (child, depth + 1, Some(id))));
        }

        tracing::info!(resolved = graph.len(), "dependencies resolved");
        Ok(graph)
    }

    /// Ensure one dependency is present in the cache of the workspace at `root`.
    pub fn resolve(
        &self,
        root: &Path,
        dependency: &WorkspaceDescriptor,
    ) -> ProtoResult<ResolvedDependency> {
        let remote = RemoteId::parse(&dependency.remote)?;
        let cache = cache_dir(root);
        std::fs::create_dir_all(&cache).map_err(|e| ProtoError::io(&cache, e))?;

        let resolved = ResolvedDependency::locate(root, &remote, dependency);
        let dest = resolved.checkout_path.clone();

        if self.options.mode == ResolveMode::Incremental && dest.exists() {
            if !self.fetcher.is_checkout(&dest) {
                return Err(ProtoError::CacheConflict {
                    remote: remote.to_string(),
                    existing: dest.display().to_string(),
                    reason: "directory exists but is not a checkout; run a clean fetch"
                        .to_string(),
                });
            }
            tracing::debug!(%remote, path = %dest.display(), "reusing cached dependency");
            return Ok(resolved);
        }

        let url = remote.clone_url();
        let mut attempt = 0;
        loop {
            tracing::info!(%remote, %url, commit = %dependency.commit, "fetching dependency");
            match self
                .fetcher
                .fetch_at_revision(&dest, &url, &dependency.commit)
            {
                Ok(()) => return Ok(resolved),
                Err(e) if attempt < self.options.retries => {
                    attempt += 1;
                    tracing::warn!(%remote, attempt, error = %e, "fetch failed, retrying");
                    remove_dir_if_exists(&dest)?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// The already-resolved checkout `remote` lives in, if any. Errors when
    /// the checkout is pinned to another revision or when the two checkouts
    /// would nest.
    fn shared_checkout(
        &self,
        graph: &DependencyGraph,
        root: &Path,
        remote: &RemoteId,
        dependency: &WorkspaceDescriptor,
    ) -> ProtoResult<Option<ResolvedDependency>> {
        let located = ResolvedDependency::locate(root, remote, dependency);
        let wanted = &located.checkout_path;
        for (_, node) in graph.iter() {
            let existing = &node.resolved.checkout_path;
            let conflict = |reason: String| ProtoError::CacheConflict {
                remote: remote.to_string(),
                existing: existing.display().to_string(),
                reason,
            };
            if existing == wanted {
                let pinned = &node.resolved.descriptor.commit;
                if *pinned != dependency.commit {
                    return Err(conflict(format!(
                        "checkout is pinned at {pinned:?} but {remote} requires {:?}",
                        dependency.commit
                    )));
                }
                tracing::debug!(%remote, path = %wanted.display(), "sharing checkout");
                return Ok(Some(located));
            }
            if existing.starts_with(wanted) || wanted.starts_with(existing) {
                return Err(conflict(format!(
                    "checkouts of {remote} and {} would nest",
                    node.remote
                )));
            }
        }
        Ok(None)
    }

    fn check_deadline(&self, remote: &str) -> ProtoResult<()> {
        match self.options.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(ProtoError::DeadlineExceeded {
                stage: format!("resolving {remote}"),
            }),
            _ => Ok(()),
        }
    }
}

/// Delete the workspace cache directory.
pub fn clear_cache(root: &Path) -> ProtoResult<()> {
    let cache = cache_dir(root);
    tracing::debug!(path = %cache.display(), "clearing dependency cache");
    remove_dir_if_exists(&cache)
}

fn remove_dir_if_exists(path: &Path) -> ProtoResult<()> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ProtoError::io(path, e)),
    }
}

/// Deps declared by a fetched dependency, if it ships a descriptor.
fn nested_deps(checkout: &Path) -> ProtoResult<Vec<WorkspaceDescriptor>> {
    let file = checkout.join(DESCRIPTOR_FILE);
    if !file.is_file() {
        return Ok(Vec::new());
    }
    Ok(WorkspaceDescriptor::load(&file)?.build.deps)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::time::Duration;

    use proptest::prelude::*;

    use super::*;

    /// Records fetches and writes a marker file into each destination.
    #[derive(Default)]
    struct RecordingFetcher {
        calls: RefCell<Vec<(PathBuf, String, String)>>,
        fail_urls: Vec<String>,
        failures_before_success: RefCell<u32>,
    }

    impl Fetcher for RecordingFetcher {
        fn fetch_at_revision(&self, dest: &Path, url: &str, revision: &str) -> ProtoResult<()> {
            self.calls
                .borrow_mut()
                .push((dest.to_path_buf(), url.to_string(), revision.to_string()));
            if self.fail_urls.iter().any(|u| u == url) {
                return Err(ProtoError::Fetch {
                    url: url.to_string(),
                    revision: revision.to_string(),
                    detail: "remote unreachable".to_string(),
                });
            }
            std::fs::create_dir_all(dest).unwrap();
            let mut pending = self.failures_before_success.borrow_mut();
            if *pending > 0 {
                *pending -= 1;
                return Err(ProtoError::Fetch {
                    url: url.to_string(),
                    revision: revision.to_string(),
                    detail: "transient".to_string(),
                });
            }
            std::fs::write(dest.join("fetched.proto"), revision).unwrap();
            Ok(())
        }
    }

    /// Behaves like `git clone`: refuses a non-empty destination and leaves
    /// a `.git` directory in each checkout.
    #[derive(Default)]
    struct CloneLikeFetcher {
        calls: RefCell<Vec<String>>,
    }

    impl Fetcher for CloneLikeFetcher {
        fn fetch_at_revision(&self, dest: &Path, url: &str, revision: &str) -> ProtoResult<()> {
            self.calls.borrow_mut().push(url.to_string());
            let occupied = std::fs::read_dir(dest)
                .map(|mut entries| entries.next().is_some())
                .unwrap_or(false);
            if occupied {
                return Err(ProtoError::Fetch {
                    url: url.to_string(),
                    revision: revision.to_string(),
                    detail: "destination path already exists and is not an empty directory"
                        .to_string(),
                });
            }
            std::fs::create_dir_all(dest.join(".git")).unwrap();
            Ok(())
        }

        fn is_checkout(&self, dir: &Path) -> bool {
            dir.join(".git").is_dir()
        }
    }

    fn workspace(root: &Path, deps: &[(&str, &str)]) -> WorkspaceDescriptor {
        let mut ws = WorkspaceDescriptor::new(root, "example.com/org/ws", "v1").unwrap();
        ws.build.deps = deps
            .iter()
            .map(|(r, c)| WorkspaceDescriptor::dependency(*r, *c))
            .collect();
        ws
    }

    #[test]
    fn dependency_path_is_under_cache_dir() {
        let dep = WorkspaceDescriptor::dependency("example.com/dep", "abc123");
        assert_eq!(
            dependency_path(&dep).unwrap(),
            PathBuf::from(".proto/example.com/dep")
        );
    }

    #[test]
    fn dependency_path_rejects_malformed_remote() {
        let dep = WorkspaceDescriptor::dependency("https://example.com/dep", "");
        assert!(matches!(
            dependency_path(&dep).unwrap_err(),
            ProtoError::RemoteFormat { .. }
        ));
    }

    #[test]
    fn resolve_fetches_into_cache_path() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace(dir.path(), &[]);
        let fetcher = RecordingFetcher::default();
        let resolver = Resolver::new(&fetcher);

        let dep = WorkspaceDescriptor::dependency("example.com/dep", "abc123");
        let resolved = resolver.resolve(ws.local_root(), &dep).unwrap();

        assert_eq!(
            resolved.cache_path,
            ws.local_root().join(".proto/example.com/dep")
        );
        assert!(resolved.cache_path.join("fetched.proto").is_file());
        let calls = fetcher.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, "https://example.com/dep");
        assert_eq!(calls[0].2, "abc123");
    }

    #[test]
    fn resolve_all_resolves_in_declaration_order() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace(
            dir.path(),
            &[("example.com/b", ""), ("example.com/a", "v2"), ("example.com/c", "")],
        );
        let fetcher = RecordingFetcher::default();
        let graph = Resolver::new(&fetcher).resolve_all(&ws).unwrap();

        let urls: Vec<String> = fetcher.calls.borrow().iter().map(|c| c.1.clone()).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/b",
                "https://example.com/a",
                "https://example.com/c"
            ]
        );
        assert_eq!(graph.len(), 3);
        assert!(graph.iter().all(|(_, n)| n.depth == 1 && n.parent.is_none()));
    }

    #[test]
    fn resolve_all_resolves_duplicates_once() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace(dir.path(), &[("example.com/a", ""), ("Example.com/a/", "")]);
        let fetcher = RecordingFetcher::default();
        let graph = Resolver::new(&fetcher).resolve_all(&ws).unwrap();
        assert_eq!(fetcher.calls.borrow().len(), 1);
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn resolve_all_is_fail_fast() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace(
            dir.path(),
            &[("example.com/a", ""), ("example.com/bad", ""), ("example.com/c", "")],
        );
        let fetcher = RecordingFetcher {
            fail_urls: vec!["https://example.com/bad".to_string()],
            ..Default::default()
        };
        let err = Resolver::new(&fetcher).resolve_all(&ws).unwrap_err();
        assert!(matches!(err, ProtoError::Fetch { .. }));
        assert_eq!(fetcher.calls.borrow().len(), 2);
    }

    #[test]
    fn clean_mode_wipes_stale_cache_without_deps() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join(".proto/example.com/stale");
        std::fs::create_dir_all(&stale).unwrap();
        std::fs::write(stale.join("old.proto"), "x").unwrap();

        let ws = workspace(dir.path(), &[]);
        let fetcher = RecordingFetcher::default();
        Resolver::new(&fetcher).resolve_all(&ws).unwrap();

        assert!(!dir.path().join(".proto").exists());
        assert!(fetcher.calls.borrow().is_empty());
    }

    #[test]
    fn incremental_mode_reuses_existing_checkout() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".proto/example.com/a")).unwrap();
        let ws = workspace(dir.path(), &[("example.com/a", ""), ("example.com/b", "")]);
        let fetcher = RecordingFetcher::default();
        let options = ResolveOptions {
            mode: ResolveMode::Incremental,
            ..Default::default()
        };
        Resolver::with_options(&fetcher, options)
            .resolve_all(&ws)
            .unwrap();

        let calls = fetcher.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, "https://example.com/b");
    }

    #[test]
    fn retries_transient_fetch_failures() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace(dir.path(), &[("example.com/a", "")]);
        let fetcher = RecordingFetcher {
            failures_before_success: RefCell::new(2),
            ..Default::default()
        };
        let options = ResolveOptions {
            retries: 2,
            ..Default::default()
        };
        Resolver::with_options(&fetcher, options)
            .resolve_all(&ws)
            .unwrap();
        assert_eq!(fetcher.calls.borrow().len(), 3);
    }

    #[test]
    fn no_retries_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace(dir.path(), &[("example.com/a", "")]);
        let fetcher = RecordingFetcher {
            failures_before_success: RefCell::new(1),
            ..Default::default()
        };
        assert!(Resolver::new(&fetcher).resolve_all(&ws).is_err());
        assert_eq!(fetcher.calls.borrow().len(), 1);
    }

    #[test]
    fn expired_deadline_stops_before_fetching() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace(dir.path(), &[("example.com/a", "")]);
        let fetcher = RecordingFetcher::default();
        let options = ResolveOptions {
            deadline: Instant::now().checked_sub(Duration::from_secs(1)),
            ..Default::default()
        };
        let err = Resolver::with_options(&fetcher, options)
            .resolve_all(&ws)
            .unwrap_err();
        assert!(matches!(err, ProtoError::DeadlineExceeded { .. }));
        assert!(fetcher.calls.borrow().is_empty());
    }

    #[test]
    fn malformed_remote_aborts_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace(dir.path(), &[("not a remote", "")]);
        let fetcher = RecordingFetcher::default();
        let err = Resolver::new(&fetcher).resolve_all(&ws).unwrap_err();
        assert!(matches!(err, ProtoError::RemoteFormat { .. }));
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace(dir.path(), &[("example.com/org/ws", "")]);
        let fetcher = RecordingFetcher::default();
        let err = Resolver::new(&fetcher).resolve_all(&ws).unwrap_err();
        assert!(matches!(err, ProtoError::DependencyCycle { .. }));
    }

    #[test]
    fn nested_remotes_on_generic_host_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace(
            dir.path(),
            &[("example.com/org/repo", ""), ("example.com/org/repo/sub", "")],
        );
        let fetcher = CloneLikeFetcher::default();
        let err = Resolver::new(&fetcher).resolve_all(&ws).unwrap_err();
        assert!(matches!(err, ProtoError::CacheConflict { .. }), "{err:?}");
        assert_eq!(*fetcher.calls.borrow(), vec!["https://example.com/org/repo"]);
    }

    #[test]
    fn nested_remotes_conflict_in_either_order() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace(
            dir.path(),
            &[("example.com/org/repo/sub", ""), ("example.com/org/repo", "")],
        );
        let fetcher = CloneLikeFetcher::default();
        let err = Resolver::new(&fetcher).resolve_all(&ws).unwrap_err();
        assert!(matches!(err, ProtoError::CacheConflict { .. }), "{err:?}");
    }

    #[test]
    fn forge_subpath_shares_repo_checkout() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace(
            dir.path(),
            &[("github.com/o/r", "v1"), ("github.com/o/r/protos", "v1")],
        );
        let fetcher = CloneLikeFetcher::default();
        let graph = Resolver::new(&fetcher).resolve_all(&ws).unwrap();

        assert_eq!(*fetcher.calls.borrow(), vec!["https://github.com/o/r"]);
        let nodes: Vec<&DependencyNode> = graph.iter().map(|(_, n)| n).collect();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].resolved.checkout_path, nodes[1].resolved.checkout_path);
        assert_eq!(
            nodes[1].resolved.cache_path,
            ws.local_root().join(".proto/github.com/o/r/protos")
        );
    }

    #[test]
    fn shared_checkout_with_different_revisions_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace(
            dir.path(),
            &[("github.com/o/r", "v1"), ("github.com/o/r/protos", "v2")],
        );
        let fetcher = CloneLikeFetcher::default();
        let err = Resolver::new(&fetcher).resolve_all(&ws).unwrap_err();
        assert!(matches!(err, ProtoError::CacheConflict { .. }), "{err:?}");
    }

    #[test]
    fn incremental_mode_rejects_directory_inside_another_checkout() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = CloneLikeFetcher::default();
        let options = ResolveOptions {
            mode: ResolveMode::Incremental,
            ..Default::default()
        };
        let resolver = Resolver::with_options(&fetcher, options);

        let first = workspace(dir.path(), &[("example.com/org/repo", "")]);
        resolver.resolve_all(&first).unwrap();
        std::fs::create_dir_all(dir.path().join(".proto/example.com/org/repo/sub")).unwrap();
        fetcher.calls.borrow_mut().clear();

        let second = workspace(dir.path(), &[("example.com/org/repo/sub", "")]);
        let err = resolver.resolve_all(&second).unwrap_err();
        assert!(matches!(err, ProtoError::CacheConflict { .. }), "{err:?}");
        assert!(fetcher.calls.borrow().is_empty());
    }

    fn overlapping_remote() -> impl Strategy<Value = String> {
        (
            prop::sample::select(vec!["example.com", "github.com"]),
            prop::collection::vec(prop::sample::select(vec!["a", "b"]), 1..4),
        )
            .prop_map(|(host, path)| format!("{host}/{}", path.join("/")))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Resolution either rejects the layout or yields checkouts that are
        /// shared or disjoint, never nested.
        #[test]
        fn resolved_checkouts_never_nest(
            remotes in prop::collection::vec(overlapping_remote(), 1..4)
        ) {
            let dir = tempfile::tempdir().unwrap();
            let deps: Vec<(&str, &str)> = remotes.iter().map(|r| (r.as_str(), "")).collect();
            let ws = workspace(dir.path(), &deps);
            let fetcher = CloneLikeFetcher::default();
            match Resolver::new(&fetcher).resolve_all(&ws) {
                Ok(graph) => {
                    for (_, a) in graph.iter() {
                        for (_, b) in graph.iter() {
                            let (x, y) = (&a.resolved.checkout_path, &b.resolved.checkout_path);
                            prop_assert!(x == y || !(x.starts_with(y) || y.starts_with(x)));
                        }
                    }
                }
                Err(ProtoError::CacheConflict { .. }) => {}
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
        }
    }

    #[test]
    fn ancestors_walks_parent_chain() {
        let mut graph = DependencyGraph::default();
        let node = |remote: &str, parent| DependencyNode {
            remote: RemoteId::parse(remote).unwrap(),
            resolved: ResolvedDependency {
                descriptor: WorkspaceDescriptor::dependency(remote, ""),
                cache_path: PathBuf::from("/ws/.proto").join(remote),
                checkout_path: PathBuf::from("/ws/.proto").join(remote),
            },
            depth: 1,
            parent,
        };
        let a = graph.push(node("example.com/a", None));
        let b = graph.push(node("example.com/b", Some(a)));
        let c = graph.push(node("example.com/c", Some(b)));

        let chain: Vec<&str> = graph.ancestors(Some(c)).map(|n| n.remote.as_str()).collect();
        assert_eq!(chain, vec!["example.com/c", "example.com/b", "example.com/a"]);
        assert_eq!(graph.ancestors(None).count(), 0);
        assert_eq!(graph.find(&RemoteId::parse("example.com/b").unwrap()), Some(b));
    }
}
