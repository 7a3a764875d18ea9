//! Textual reader and editor for the flag registry source file.
//!
//! The registry is host-language source, not data, so it is read with
//! pattern matching rather than a syntax tree. Everything the auditor and
//! the codemod need is captured in [`FlagDeclaration`]: the parsed fields
//! plus the byte spans of the declaration in the file. Removal works off
//! those same spans, so reading and editing cannot disagree.
//!
//! Expected shape:
//!
//! ```text
//! export type FeatureFlagName =
//!   | 'messaging'
//!   | 'legacyInbox';
//!
//! export const FEATURE_FLAGS: Record<FeatureFlagName, FeatureFlagConfig> = {
//!   messaging: {
//!     enabledInDevelopment: true,
//!     enabledInDemo: true,
//!     enabledInLive: true,
//!     description: 'Direct messages',
//!     createdAt: '2024-01-10',
//!     usageCount: 0,
//!   },
//!   ...
//! };
//! ```

use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use flagkit_flags::{FlagDefinition, LifecycleStage, ModeGates, Role};
use regex::Regex;
use serde::Serialize;

use crate::error::{CodemodError, Result};

/// One flag as declared in the registry source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagDeclaration {
    pub definition: FlagDefinition,
    pub usage_count: u64,
    /// Span of the union member, including its leading `|` and whitespace.
    #[serde(skip)]
    pub union_member: Range<usize>,
    /// Span of the configuration block, whole lines including the trailing
    /// comma and newline.
    #[serde(skip)]
    pub block: Range<usize>,
}

impl FlagDeclaration {
    pub fn id(&self) -> &str {
        &self.definition.id
    }

    pub fn to_definition(&self) -> FlagDefinition {
        self.definition.clone()
    }
}

#[derive(Debug, Clone)]
pub struct RegistrySource {
    pub path: PathBuf,
    pub text: String,
    /// Span of the union body between `=` and `;`.
    union_body: Range<usize>,
    declarations: Vec<FlagDeclaration>,
}

impl RegistrySource {
    /// Read and parse the registry at `path`.
    pub fn load(path: &Path, union_type: &str) -> Result<Self> {
        if !path.is_file() {
            return Err(CodemodError::RegistryNotFound {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path).map_err(|source| CodemodError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, text, union_type)
    }

    pub fn parse(path: &Path, text: String, union_type: &str) -> Result<Self> {
        let union_re = Regex::new(&format!(
            r"\btype\s+{}\s*=([^;]*);",
            regex::escape(union_type)
        ))
        .map_err(|e| CodemodError::parse(path, e.to_string()))?;

        let masked = blank_comments(&text);
        let captures = union_re.captures(&masked).ok_or_else(|| {
            CodemodError::parse(path, format!("no `type {union_type} = ...;` declaration"))
        })?;
        let body = captures
            .get(1)
            .ok_or_else(|| CodemodError::parse(path, "empty union declaration"))?;
        let union_body = body.range();

        let mut declarations: Vec<FlagDeclaration> = Vec::new();
        for (id, member_span) in union_members(&text, &masked, union_body.clone()) {
            if declarations.iter().any(|d| d.definition.id == id) {
                return Err(CodemodError::parse(
                    path,
                    format!("flag '{id}' appears twice in {union_type}"),
                ));
            }
            let (block_span, body_span) = find_block(&text, &masked, &id).ok_or_else(|| {
                CodemodError::parse(path, format!("no configuration block for '{id}'"))
            })?;
            let fields = parse_fields(&masked[body_span]);
            let (definition, usage_count) = build_definition(&id, &fields)
                .map_err(|reason| CodemodError::parse(path, format!("flag '{id}': {reason}")))?;
            declarations.push(FlagDeclaration {
                definition,
                usage_count,
                union_member: member_span,
                block: block_span,
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            text,
            union_body,
            declarations,
        })
    }

    pub fn declarations(&self) -> &[FlagDeclaration] {
        &self.declarations
    }

    pub fn declaration(&self, id: &str) -> Option<&FlagDeclaration> {
        self.declarations.iter().find(|d| d.definition.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.declarations.iter().map(|d| d.definition.id.as_str())
    }

    pub fn definitions(&self) -> Vec<FlagDefinition> {
        self.declarations
            .iter()
            .map(FlagDeclaration::to_definition)
            .collect()
    }

    /// Source text with `id` removed from both the union and the config
    /// object. `None` when the id is not declared.
    pub fn without_flag(&self, id: &str) -> Option<String> {
        let decl = self.declaration(id)?;

        // Edits are applied back to front so earlier spans stay valid.
        let mut edits: Vec<(Range<usize>, &str)> = vec![(decl.block.clone(), "")];
        if self.declarations.len() == 1 {
            edits.push((self.union_body.clone(), " never"));
        } else {
            edits.push((decl.union_member.clone(), ""));
        }
        edits.sort_by_key(|(span, _)| std::cmp::Reverse(span.start));

        let mut text = self.text.clone();
        for (span, replacement) in edits {
            text.replace_range(span, replacement);
        }
        Some(text)
    }
}

/// Copy of `text` with every `//` and `/* */` comment blanked to spaces.
/// Byte offsets and newlines are preserved and string literals are kept, so
/// spans found in the copy index the original.
fn blank_comments(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == q || (b == b'\n' && q != b'`') {
                quote = None;
            }
            i += 1;
            continue;
        }
        let comment_end = match (b, bytes.get(i + 1)) {
            (b'/', Some(b'/')) => Some(text[i..].find('\n').map_or(text.len(), |n| i + n)),
            (b'/', Some(b'*')) => Some(text[i + 2..].find("*/").map_or(text.len(), |n| i + n + 4)),
            _ => None,
        };
        match comment_end {
            Some(end) => {
                out.push_str(&text[copied..i]);
                for c in text[i..end].chars() {
                    if c == '\n' {
                        out.push('\n');
                    } else {
                        out.extend(std::iter::repeat_n(' ', c.len_utf8()));
                    }
                }
                copied = end;
                i = end;
            }
            None => {
                if matches!(b, b'\'' | b'"' | b'`') {
                    quote = Some(b);
                }
                i += 1;
            }
        }
    }
    out.push_str(&text[copied..]);
    out
}

/// Ids in the union body, with absolute removable spans.
fn union_members(text: &str, masked: &str, body: Range<usize>) -> Vec<(String, Range<usize>)> {
    static MEMBER_RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    let member_re =
        MEMBER_RE.get_or_init(|| Regex::new(r#"['"]([^'"]+)['"]"#).expect("valid member regex"));
    member_re
        .captures_iter(&masked[body.clone()])
        .filter_map(|caps| {
            let quoted = caps.get(0)?;
            let id = caps.get(1)?.as_str().to_string();
            let quoted = body.start + quoted.start()..body.start + quoted.end();
            Some((id, member_span(text, masked, quoted, &body)))
        })
        .collect()
}

/// The quoted member plus its `|`, the whitespace before it and a comment
/// trailing it on the same line.
///
/// When the previous line ends in a comment and nothing but the closing `;`
/// follows the member, the span stays on the member's own line so the `;`
/// is not joined onto that comment.
fn member_span(
    text: &str,
    masked: &str,
    quoted: Range<usize>,
    body: &Range<usize>,
) -> Range<usize> {
    let bytes = text.as_bytes();
    let blanked = masked.as_bytes();
    let is_comment = |i: usize| blanked[i] != bytes[i];
    let skip_back = |mut i: usize| {
        while i > body.start && matches!(bytes[i - 1], b' ' | b'\t' | b'\r' | b'\n') {
            i -= 1;
        }
        i
    };

    let mut start = skip_back(quoted.start);
    if start > body.start && bytes[start - 1] == b'|' {
        start = skip_back(start - 1);
    }

    let mut end = quoted.end;
    let mut cursor = end;
    while cursor < body.end && matches!(bytes[cursor], b' ' | b'\t') {
        cursor += 1;
    }
    if cursor < body.end && is_comment(cursor) {
        while cursor < body.end && blanked[cursor] == b' ' && bytes[cursor] != b'\n' {
            cursor += 1;
        }
        end = cursor;
    }

    let line_follows = text[end..body.end]
        .trim_start_matches([' ', '\t', '\r'])
        .starts_with('\n');
    if start > body.start
        && is_comment(start - 1)
        && !line_follows
        && let Some(newline) = text[start..quoted.start].rfind('\n')
    {
        start += newline + 1;
    }
    start..end
}

/// Locate `id: { ... }` (key optionally quoted) in the comment-blanked copy.
/// Returns the removable span (whole lines, with any comment-only lines
/// directly above) and the span between the braces.
fn find_block(text: &str, masked: &str, id: &str) -> Option<(Range<usize>, Range<usize>)> {
    let key_re = Regex::new(&format!(
        r#"(?m)^[ \t]*['"]?{}['"]?[ \t]*:[ \t]*\{{"#,
        regex::escape(id)
    ))
    .ok()?;
    let m = key_re.find(masked)?;
    let open = m.end() - 1;
    let close = matching_brace(masked, open)?;

    let mut end = close + 1;
    let rest = &masked[end..];
    let trimmed = rest.trim_start_matches([' ', '\t']);
    end += rest.len() - trimmed.len();
    if trimmed.starts_with(',') {
        end += 1;
    }
    let rest = &masked[end..];
    let trimmed = rest.trim_start_matches([' ', '\t']);
    if trimmed.starts_with("\r\n") {
        end += rest.len() - trimmed.len() + 2;
    } else if trimmed.starts_with('\n') {
        end += rest.len() - trimmed.len() + 1;
    }

    let mut start = m.start();
    while let Some(line) = previous_line(masked, start) {
        let blank_here = masked[line.clone()].trim().is_empty();
        if !blank_here || text[line.clone()].trim().is_empty() {
            break;
        }
        start = line.start;
    }

    Some((start..end, open + 1..close))
}

/// Span of the line ending just before `start`, newline included. `start`
/// must be at the beginning of a line.
fn previous_line(text: &str, start: usize) -> Option<Range<usize>> {
    let before = text[..start].strip_suffix('\n')?;
    let line_start = before.rfind('\n').map_or(0, |n| n + 1);
    Some(line_start..start)
}

/// Index of the `}` matching the `{` at `open`, skipping string literals.
/// Expects comments to be blanked already.
fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = open;
    let mut quote: Option<u8> = None;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'\'' | b'"' | b'`' => quote = Some(b),
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FieldValue {
    Bool(bool),
    Number(u64),
    Str(String),
    List(Vec<String>),
    Other(String),
}

fn parse_fields(body: &str) -> Vec<(String, FieldValue)> {
    static FIELD_RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    let field_re = FIELD_RE.get_or_init(|| {
        Regex::new(
            r#"(?m)(?:^|,)[ \t\r\n]*([A-Za-z_$][\w$]*)[ \t]*:[ \t]*(true|false|\d+|'(?:[^'\\]|\\.)*'|"(?:[^"\\]|\\.)*"|\[[^\]]*\]|[^,\n}]+)"#,
        )
        .expect("valid field regex")
    });

    field_re
        .captures_iter(body)
        .filter_map(|caps| {
            let key = caps.get(1)?.as_str().to_string();
            let raw = caps.get(2)?.as_str().trim();
            Some((key, classify_value(raw)))
        })
        .collect()
}

fn classify_value(raw: &str) -> FieldValue {
    match raw {
        "true" => return FieldValue::Bool(true),
        "false" => return FieldValue::Bool(false),
        _ => {}
    }
    if let Ok(n) = raw.parse::<u64>() {
        return FieldValue::Number(n);
    }
    if let Some(s) = unquote(raw) {
        return FieldValue::Str(s);
    }
    if let Some(inner) = raw.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
        let items = inner
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| unquote(item).unwrap_or_else(|| item.to_string()))
            .collect();
        return FieldValue::List(items);
    }
    FieldValue::Other(raw.to_string())
}

fn unquote(raw: &str) -> Option<String> {
    let quoted = (raw.starts_with('\'') && raw.ends_with('\''))
        || (raw.starts_with('"') && raw.ends_with('"'));
    (quoted && raw.len() >= 2).then(|| raw[1..raw.len() - 1].to_string())
}

fn build_definition(
    id: &str,
    fields: &[(String, FieldValue)],
) -> std::result::Result<(FlagDefinition, u64), String> {
    let get = |key: &str| fields.iter().find(|(k, _)| k == key).map(|(_, v)| v);

    let required_bool = |key: &str| match get(key) {
        Some(FieldValue::Bool(b)) => Ok(*b),
        Some(other) => Err(format!("{key} must be a boolean, found {other:?}")),
        None => Err(format!("missing {key}")),
    };
    let optional_bool = |key: &str| match get(key) {
        Some(FieldValue::Bool(b)) => Ok(*b),
        Some(FieldValue::Other(v)) if v == "undefined" => Ok(false),
        Some(other) => Err(format!("{key} must be a boolean, found {other:?}")),
        None => Ok(false),
    };
    let optional_str = |key: &str| match get(key) {
        Some(FieldValue::Str(s)) => Some(s.clone()),
        _ => None,
    };

    let mode_gates = ModeGates::new(
        required_bool("enabledInDevelopment")?,
        required_bool("enabledInDemo")?,
        required_bool("enabledInLive")?,
    );

    let required_roles = match get("requiredRoles") {
        Some(FieldValue::List(items)) => items
            .iter()
            .map(|item| Role::new(item.rsplit('.').next().unwrap_or(item)))
            .collect(),
        Some(other) => return Err(format!("requiredRoles must be an array, found {other:?}")),
        None => Vec::new(),
    };

    let lifecycle_stage = match get("lifecycleStage") {
        Some(FieldValue::Str(s)) => {
            LifecycleStage::parse(s).ok_or_else(|| format!("unknown lifecycleStage '{s}'"))?
        }
        Some(other) => return Err(format!("lifecycleStage must be a string, found {other:?}")),
        None => LifecycleStage::default(),
    };

    let usage_count = match get("usageCount") {
        Some(FieldValue::Number(n)) => *n,
        Some(other) => return Err(format!("usageCount must be a number, found {other:?}")),
        None => 0,
    };

    let definition = FlagDefinition {
        id: id.to_string(),
        mode_gates,
        required_roles,
        lifecycle_stage,
        description: optional_str("description").unwrap_or_default(),
        created_at: optional_str("createdAt").unwrap_or_default(),
        expires_at: optional_str("expiresAt"),
        replaced_by: optional_str("replacedBy"),
        owner: optional_str("owner"),
        force_enabled: optional_bool("forceEnabled")?,
        force_disabled: optional_bool("forceDisabled")?,
    };
    Ok((definition, usage_count))
}
