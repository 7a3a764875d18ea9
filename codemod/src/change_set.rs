//! In-memory staging of file edits for one flag's retirement.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use similar::TextDiff;
use tracing::debug;

use crate::error::{CodemodError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
struct StagedFile {
    original: String,
    updated: String,
}

/// Staged file contents keyed by repository-relative path. Nothing touches
/// the disk until [`ChangeSet::flush`].
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    files: BTreeMap<PathBuf, StagedFile>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage new contents for `path`. Edits that change nothing are dropped.
    pub fn stage(&mut self, path: impl Into<PathBuf>, original: String, updated: String) {
        let path = path.into();
        if original == updated {
            self.files.remove(&path);
            return;
        }
        self.files.insert(path, StagedFile { original, updated });
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path)
    }

    pub fn updated(&self, path: &Path) -> Option<&str> {
        self.files.get(path).map(|f| f.updated.as_str())
    }

    /// Unified diff of every staged file, paths prefixed `a/` and `b/`.
    pub fn unified_diff(&self) -> String {
        let mut out = String::new();
        for (path, file) in &self.files {
            let old_header = format!("a/{}", path.display());
            let new_header = format!("b/{}", path.display());
            let diff = TextDiff::from_lines(&file.original, &file.updated);
            let mut unified = diff.unified_diff();
            unified.context_radius(3).header(&old_header, &new_header);
            out.push_str(&unified.to_string());
        }
        out
    }

    /// Write every staged file under `root`. Each file goes through a temp
    /// file in its own directory and is renamed into place.
    pub fn flush(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.files.len());
        for (path, file) in &self.files {
            let target = root.join(path);
            write_atomically(&target, &file.updated)?;
            debug!(path = %path.display(), "wrote file");
            written.push(path.clone());
        }
        Ok(written)
    }
}

fn write_atomically(target: &Path, contents: &str) -> Result<()> {
    let write_err = |source: std::io::Error| CodemodError::FileWrite {
        path: target.to_path_buf(),
        source,
    };
    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(contents.as_bytes()).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    if let Ok(metadata) = std::fs::metadata(target) {
        tmp.as_file()
            .set_permissions(metadata.permissions())
            .map_err(write_err)?;
    }
    tmp.persist(target).map_err(|err| write_err(err.error))?;
    Ok(())
}
