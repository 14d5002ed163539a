//! Lexical path helpers.
//!
//! Workspace paths are made absolute without touching the filesystem, so a
//! workspace directory need not exist yet when a descriptor is constructed.

use std::path::{Component, Path, PathBuf};

use crate::error::{ProtoError, ProtoResult};

/// Make `path` absolute against the process working directory and clean it.
pub fn absolutize(path: &Path) -> ProtoResult<PathBuf> {
    if path.is_absolute() {
        return Ok(normalize(path));
    }
    let cwd = std::env::current_dir().map_err(|source| ProtoError::Path {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(normalize(&cwd.join(path)))
}

/// Join `rel` onto `base` and clean the result.
pub fn join_clean(base: &Path, rel: &Path) -> PathBuf {
    normalize(&base.join(rel))
}

/// Remove `.` components, resolve `..` against preceding components, and drop
/// trailing separators. `..` never climbs above the root.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let at_root = matches!(
                    out.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                );
                if at_root {
                    if !out.has_root() {
                        out.push("..");
                    }
                } else if out.ends_with("..") {
                    out.push("..");
                } else {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Render a path as a compiler argument.
pub fn path_to_arg(path: &Path) -> ProtoResult<String> {
    path.to_str()
        .map(str::to_string)
        .ok_or_else(|| ProtoError::NonUtf8Path {
            path: path.to_path_buf(),
        })
}
