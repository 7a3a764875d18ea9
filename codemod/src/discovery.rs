//! Call-site discovery for a single flag.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use flagkit_file_search::{SearchOptions, search_literal};
use serde::Serialize;
use tracing::debug;

use crate::call_shape::CallShape;
use crate::config::ToolConfig;
use crate::error::{CodemodError, Result};
use crate::rewrite::{FileRewrite, Replacement, line_of, rewrite_calls};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallSite {
    /// Relative to the repository root.
    pub path: PathBuf,
    pub line_number: usize,
    pub line: String,
    /// `None` when the literal was found but no known call shape matched.
    pub shape: Option<CallShape>,
}

impl CallSite {
    pub fn is_recognised(&self) -> bool {
        self.shape.is_some()
    }
}

/// Rewrite plan for one file.
#[derive(Debug, Clone)]
pub struct PlannedFile {
    pub original: String,
    pub rewrite: FileRewrite,
}

#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub sites: Vec<CallSite>,
    pub files: BTreeMap<PathBuf, PlannedFile>,
}

impl Discovery {
    /// No literal reference to the flag outside the registry.
    pub fn is_safe_to_remove(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn unrecognised(&self) -> impl Iterator<Item = &CallSite> {
        self.sites.iter().filter(|site| !site.is_recognised())
    }

    pub fn shape_counts(&self) -> BTreeMap<CallShape, usize> {
        let mut counts = BTreeMap::new();
        for planned in self.files.values() {
            for (shape, n) in planned.rewrite.shape_counts() {
                *counts.entry(shape).or_insert(0) += n;
            }
        }
        counts
    }
}

pub fn needles(flag_id: &str) -> Vec<String> {
    vec![
        format!("isEnabled('{flag_id}'"),
        format!("isEnabled(\"{flag_id}\""),
    ]
}

/// Find every call of `flag_id` under the configured roots and plan its
/// rewrite. Nothing is written.
pub fn discover(
    root: &Path,
    config: &ToolConfig,
    flag_id: &str,
    replacement: &Replacement,
) -> Result<Discovery> {
    let options = SearchOptions {
        roots: config.search.roots.clone(),
        extensions: config.search.extensions.clone(),
        exclude: vec![config.registry.path.clone()],
    };
    let hits = search_literal(root, &options, &needles(flag_id)).map_err(CodemodError::Search)?;

    let mut discovery = Discovery::default();
    let mut hits_by_file: BTreeMap<PathBuf, Vec<_>> = BTreeMap::new();
    for hit in hits {
        hits_by_file.entry(hit.path.clone()).or_default().push(hit);
    }

    for (path, hits) in hits_by_file {
        let absolute = root.join(&path);
        let original =
            std::fs::read_to_string(&absolute).map_err(|source| CodemodError::FileRead {
                path: absolute.clone(),
                source,
            })?;
        let rewrite = rewrite_calls(&original, flag_id, replacement)
            .map_err(|err| CodemodError::Search(err.into()))?;

        let mut recognised: BTreeMap<usize, Vec<CallShape>> = BTreeMap::new();
        for call in &rewrite.calls {
            recognised
                .entry(line_of(&original, call.span.start))
                .or_default()
                .push(call.shape);
        }

        for hit in &hits {
            let shapes = recognised.remove(&hit.line_number).unwrap_or_default();
            if shapes.is_empty() {
                debug!(path = %path.display(), line = hit.line_number, "unrecognised call shape");
                discovery.sites.push(CallSite {
                    path: path.clone(),
                    line_number: hit.line_number,
                    line: hit.line.clone(),
                    shape: None,
                });
                continue;
            }
            for shape in shapes {
                debug!(path = %path.display(), line = hit.line_number, %shape, "call site");
                discovery.sites.push(CallSite {
                    path: path.clone(),
                    line_number: hit.line_number,
                    line: hit.line.clone(),
                    shape: Some(shape),
                });
            }
        }

        // Calls the literal search could not see, e.g. `isEnabled(\n'id')`.
        for (line_number, shapes) in recognised {
            let line = original
                .lines()
                .nth(line_number - 1)
                .unwrap_or_default()
                .to_string();
            for shape in shapes {
                discovery.sites.push(CallSite {
                    path: path.clone(),
                    line_number,
                    line: line.clone(),
                    shape: Some(shape),
                });
            }
        }

        if !rewrite.is_unchanged() {
            discovery
                .files
                .insert(path, PlannedFile { original, rewrite });
        }
    }

    discovery
        .sites
        .sort_by(|a, b| (&a.path, a.line_number).cmp(&(&b.path, b.line_number)));
    Ok(discovery)
}
