//! Local schema file discovery.

use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::error::ProtoResult;

/// Substring marking a schema source file.
pub const SCHEMA_MARKER: &str = ".proto";

/// Substring marking a directory that holds fetched dependency content.
pub const CACHE_MARKER: &str = ".proto";

/// Every schema file under `root` that is not dependency cache content,
/// as absolute paths in lexicographic order.
///
/// A file is a schema file when its name contains [`SCHEMA_MARKER`]. Any
/// directory below `root` whose name contains [`CACHE_MARKER`] is skipped
/// along with everything beneath it.
pub fn enumerate_local_files(root: &Path) -> ProtoResult<Vec<PathBuf>> {
    let root = crate::paths::absolutize(root)?;
    let mut files = Vec::new();

    let walker = WalkDir::new(&root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !is_cache_dir(entry));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.file_name().to_string_lossy().contains(SCHEMA_MARKER) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    tracing::debug!(root = %root.display(), count = files.len(), "enumerated schema files");
    Ok(files)
}

fn is_cache_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry.file_name().to_string_lossy().contains(CACHE_MARKER)
}
