//! Literal text search over a source tree.
//!
//! Walks one or more roots with the `ignore` crate (so `.gitignore`,
//! `.ignore` and hidden-file rules apply), keeps files whose extension is
//! in the allow-list, and reports every line containing any of the needles.
//! Results are ordered by path, then line.

use std::path::{Path, PathBuf};

use anyhow::Context;
use ignore::WalkBuilder;
use serde::Serialize;

#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Roots to walk, relative to the search base. Empty means the base itself.
    pub roots: Vec<PathBuf>,
    /// File extensions to include, without the dot. Empty means all files.
    pub extensions: Vec<String>,
    /// Paths (relative to the base) that are never reported.
    pub exclude: Vec<PathBuf>,
}

/// One matching line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineMatch {
    /// Path relative to the search base.
    pub path: PathBuf,
    /// 1-based.
    pub line_number: usize,
    pub line: String,
}

pub fn search_literal(
    base: &Path,
    options: &SearchOptions,
    needles: &[String],
) -> anyhow::Result<Vec<LineMatch>> {
    let mut matches = Vec::new();
    if needles.is_empty() {
        return Ok(matches);
    }

    for file in candidate_files(base, options)? {
        let absolute = base.join(&file);
        let contents = match std::fs::read_to_string(&absolute) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::InvalidData => {
                tracing::debug!(path = %file.display(), "Skipping non-UTF-8 file");
                continue;
            }
            Err(err) => {
                return Err(err).with_context(|| format!("reading {}", absolute.display()));
            }
        };

        for (idx, line) in contents.lines().enumerate() {
            if needles.iter().any(|needle| line.contains(needle.as_str())) {
                matches.push(LineMatch {
                    path: file.clone(),
                    line_number: idx + 1,
                    line: line.to_string(),
                });
            }
        }
    }

    Ok(matches)
}

/// Files under the configured roots, relative to `base`, sorted.
pub fn candidate_files(base: &Path, options: &SearchOptions) -> anyhow::Result<Vec<PathBuf>> {
    let roots: Vec<PathBuf> = if options.roots.is_empty() {
        vec![base.to_path_buf()]
    } else {
        options.roots.iter().map(|root| base.join(root)).collect()
    };

    let mut files = Vec::new();
    for root in roots {
        if !root.exists() {
            tracing::warn!(root = %root.display(), "Search root does not exist; skipping");
            continue;
        }

        let walker = WalkBuilder::new(&root)
            .require_git(false)
            .sort_by_file_path(|a, b| a.cmp(b))
            .build();

        for entry in walker {
            let entry = entry.with_context(|| format!("walking {}", root.display()))?;
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let path = entry.path();
            if !has_allowed_extension(path, &options.extensions) {
                continue;
            }
            let relative = path.strip_prefix(base).unwrap_or(path).to_path_buf();
            if options.exclude.iter().any(|ex| ex == &relative) {
                continue;
            }
            files.push(relative);
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

fn has_allowed_extension(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|allowed| allowed == ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn write(base: &Path, rel: &str, contents: &str) {
        let path = base.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn options(exts: &[&str]) -> SearchOptions {
        SearchOptions {
            roots: vec![PathBuf::from("src")],
            extensions: exts.iter().map(|e| e.to_string()).collect(),
            exclude: Vec::new(),
        }
    }

    #[test]
    fn finds_lines_in_allowed_extensions() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/a.ts", "const x = 1;\nif (isEnabled('events')) {}\n");
        write(dir.path(), "src/nested/b.tsx", "isEnabled('events')\n");
        write(dir.path(), "src/readme.md", "isEnabled('events')\n");
        write(dir.path(), "other/c.ts", "isEnabled('events')\n");

        let found = search_literal(
            dir.path(),
            &options(&["ts", "tsx"]),
            &["isEnabled('events'".to_string()],
        )
        .unwrap();

        assert_eq!(
            found,
            vec![
                LineMatch {
                    path: PathBuf::from("src/a.ts"),
                    line_number: 2,
                    line: "if (isEnabled('events')) {}".to_string(),
                },
                LineMatch {
                    path: PathBuf::from("src/nested/b.tsx"),
                    line_number: 1,
                    line: "isEnabled('events')".to_string(),
                },
            ]
        );
    }

    #[test]
    fn respects_gitignore_and_exclusions() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ".gitignore", "src/generated/\n");
        write(dir.path(), "src/generated/out.ts", "isEnabled('events')\n");
        write(dir.path(), "src/config/flags.ts", "isEnabled('events')\n");
        write(dir.path(), "src/screen.ts", "isEnabled('events')\n");

        let mut opts = options(&["ts"]);
        opts.exclude.push(PathBuf::from("src/config/flags.ts"));
        let files: Vec<PathBuf> =
            search_literal(dir.path(), &opts, &["isEnabled('events'".to_string()])
                .unwrap()
                .into_iter()
                .map(|m| m.path)
                .collect();

        assert_eq!(files, vec![PathBuf::from("src/screen.ts")]);
    }

    #[test]
    fn missing_root_yields_nothing() {
        let dir = TempDir::new().unwrap();
        let found =
            search_literal(dir.path(), &options(&[]), &["anything".to_string()]).unwrap();
        assert!(found.is_empty());
    }
}
