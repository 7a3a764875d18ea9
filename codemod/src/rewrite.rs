//! Replacement planning and call-site rewriting for one file.

use std::collections::BTreeMap;
use std::ops::Range;

use flagkit_flags::FlagDefinition;
use serde::Serialize;

use crate::call_shape::CallShape;

/// What every call site of a retired flag turns into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum Replacement {
    /// Keep the call, name the successor flag instead.
    RenameTo(String),
    /// Inline the production decision.
    Literal(bool),
}

impl std::fmt::Display for Replacement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Replacement::RenameTo(id) => write!(f, "rename to '{id}'"),
            Replacement::Literal(value) => write!(f, "inline `{value}`"),
        }
    }
}

pub fn resolve_replacement(flag: &FlagDefinition) -> Replacement {
    if let Some(successor) = flag.replaced_by.as_deref() {
        return Replacement::RenameTo(successor.to_string());
    }
    let live = if flag.force_enabled {
        true
    } else if flag.force_disabled {
        false
    } else {
        flag.mode_gates.live
    };
    Replacement::Literal(live)
}

/// One rewritten call expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenCall {
    pub shape: CallShape,
    /// Byte span of the call expression in the original text.
    pub span: Range<usize>,
    pub before: String,
    pub after: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileRewrite {
    pub updated: String,
    pub calls: Vec<RewrittenCall>,
}

impl FileRewrite {
    pub fn is_unchanged(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn shape_counts(&self) -> BTreeMap<CallShape, usize> {
        let mut counts = BTreeMap::new();
        for call in &self.calls {
            *counts.entry(call.shape).or_insert(0) += 1;
        }
        counts
    }
}

/// Rewrite every recognised call of `flag_id` in `text`.
///
/// Shapes are tried in [`CallShape::ALL`] order; a region claimed by an
/// earlier shape is never matched again by a later one.
pub fn rewrite_calls(
    text: &str,
    flag_id: &str,
    replacement: &Replacement,
) -> Result<FileRewrite, regex::Error> {
    let mut calls: Vec<RewrittenCall> = Vec::new();

    for shape in CallShape::ALL {
        let re = shape.regex(flag_id)?;
        for caps in re.captures_iter(text) {
            let Some(call) = caps.name("call") else {
                continue;
            };
            let span = call.range();
            if calls
                .iter()
                .any(|c| c.span.start < span.end && span.start < c.span.end)
            {
                continue;
            }
            let after = match replacement {
                Replacement::Literal(value) => value.to_string(),
                Replacement::RenameTo(successor) => {
                    let part = |name: &str| caps.name(name).map_or("", |m| m.as_str());
                    let arg = part("arg");
                    let quote = &arg[..1];
                    format!(
                        "{}{}{quote}{successor}{quote}{}",
                        part("callee"),
                        part("open"),
                        part("rest")
                    )
                }
            };
            calls.push(RewrittenCall {
                shape,
                span,
                before: call.as_str().to_string(),
                after,
            });
        }
    }

    calls.sort_by_key(|c| c.span.start);

    let mut updated = String::with_capacity(text.len());
    let mut cursor = 0;
    for call in &calls {
        updated.push_str(&text[cursor..call.span.start]);
        updated.push_str(&call.after);
        cursor = call.span.end;
    }
    updated.push_str(&text[cursor..]);

    Ok(FileRewrite { updated, calls })
}

/// 1-based line number of byte `offset`.
pub fn line_of(text: &str, offset: usize) -> usize {
    text[..offset].bytes().filter(|b| *b == b'\n').count() + 1
}
