//! Environment toggles for the runtime evaluator.
//!
//! Single IO boundary for the env vars the host reads at startup. Parsing
//! is split into pure resolve functions (unit testable, no env IO) and a
//! thin wrapper, [`EnvToggles::from_env`].
//!
//! | Canonical | Deprecated | Default |
//! |-----------|------------|---------|
//! | `FLAGKIT_FORCE_ENABLE` | `FLAGKIT_FORCE_ON` | (none) |
//! | `FLAGKIT_FORCE_DISABLE` | (none) | (none) |
//! | `FLAGKIT_MODE` | (none) | `live` |
//!
//! Flag lists are comma-separated ids. A deprecated var triggers a warning
//! once per process.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::types::Mode;

pub const FORCE_ENABLE_VAR: &str = "FLAGKIT_FORCE_ENABLE";
pub const FORCE_ENABLE_DEPRECATED_VAR: &str = "FLAGKIT_FORCE_ON";
pub const FORCE_DISABLE_VAR: &str = "FLAGKIT_FORCE_DISABLE";
pub const MODE_VAR: &str = "FLAGKIT_MODE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeprecationWarning {
    pub deprecated_key: String,
    pub canonical_key: String,
    /// Whether both deprecated and canonical were set.
    pub both_present: bool,
    pub message: String,
}

impl DeprecationWarning {
    pub fn force_on(both_present: bool) -> Self {
        let message = if both_present {
            format!(
                "Both '{FORCE_ENABLE_DEPRECATED_VAR}' (deprecated) and '{FORCE_ENABLE_VAR}' are set. \
                 Using canonical '{FORCE_ENABLE_VAR}'. Remove the deprecated env var."
            )
        } else {
            format!(
                "Env var '{FORCE_ENABLE_DEPRECATED_VAR}' is deprecated. Use '{FORCE_ENABLE_VAR}' instead."
            )
        };

        Self {
            deprecated_key: FORCE_ENABLE_DEPRECATED_VAR.to_string(),
            canonical_key: FORCE_ENABLE_VAR.to_string(),
            both_present,
            message,
        }
    }

    pub fn emit(&self) {
        tracing::warn!("{}", self.message);
    }
}

/// Flag ids forced on or off from outside the registry source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForceOverrides {
    enable: BTreeSet<String>,
    disable: BTreeSet<String>,
}

impl ForceOverrides {
    pub fn from_lists(enable: Option<&str>, disable: Option<&str>) -> Self {
        Self {
            enable: enable.map(parse_id_list).unwrap_or_default(),
            disable: disable.map(parse_id_list).unwrap_or_default(),
        }
    }

    pub fn enables(&self, id: &str) -> bool {
        self.enable.contains(id)
    }

    pub fn disables(&self, id: &str) -> bool {
        self.disable.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.enable.is_empty() && self.disable.is_empty()
    }

    /// Overridden ids that are not in `known`.
    pub fn unknown_ids<'a>(&self, known: impl Iterator<Item = &'a str>) -> Vec<String> {
        let known: BTreeSet<&str> = known.collect();
        self.enable
            .iter()
            .chain(self.disable.iter())
            .filter(|id| !known.contains(id.as_str()))
            .cloned()
            .collect()
    }
}

/// Everything the runtime resolves from the environment.
#[derive(Debug, Clone)]
pub struct EnvToggles {
    pub mode: Mode,
    pub overrides: ForceOverrides,
    pub warnings: Vec<DeprecationWarning>,
}

impl EnvToggles {
    /// Load toggles from the process environment. Call once at startup.
    pub fn from_env() -> Self {
        let canonical = std::env::var(FORCE_ENABLE_VAR).ok();
        let deprecated = std::env::var(FORCE_ENABLE_DEPRECATED_VAR).ok();
        let disable = std::env::var(FORCE_DISABLE_VAR).ok();
        let mode = std::env::var(MODE_VAR).ok();

        let (enable, warning) = resolve_force_enable(canonical.as_deref(), deprecated.as_deref());
        let mut warnings = Vec::new();
        if let Some(w) = warning {
            emit_warning_once(&w);
            warnings.push(w);
        }

        Self {
            mode: resolve_mode(mode.as_deref()),
            overrides: ForceOverrides::from_lists(enable, disable.as_deref()),
            warnings,
        }
    }
}

// ============================================================================
// PURE DECISION FUNCTIONS
// ============================================================================

/// Pick the force-enable list from the canonical and deprecated vars.
/// The canonical var wins when both are set.
pub fn resolve_force_enable<'a>(
    canonical: Option<&'a str>,
    deprecated: Option<&'a str>,
) -> (Option<&'a str>, Option<DeprecationWarning>) {
    match (canonical, deprecated) {
        (Some(c), Some(_)) => (Some(c), Some(DeprecationWarning::force_on(true))),
        (Some(c), None) => (Some(c), None),
        (None, Some(d)) => (Some(d), Some(DeprecationWarning::force_on(false))),
        (None, None) => (None, None),
    }
}

/// Resolve the execution mode. Unset or unknown values fall back to
/// [`Mode::Live`] so a misconfigured build fails closed.
pub fn resolve_mode(val: Option<&str>) -> Mode {
    match val {
        None => Mode::Live,
        Some(v) if v.trim().is_empty() => Mode::Live,
        Some(v) => Mode::parse(v).unwrap_or_else(|| {
            tracing::warn!(value = %v, "Unknown {MODE_VAR}; falling back to live");
            Mode::Live
        }),
    }
}

pub fn parse_id_list(val: &str) -> BTreeSet<String> {
    val.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

static WARNED_FORCE_ON: AtomicBool = AtomicBool::new(false);

fn emit_warning_once(warning: &DeprecationWarning) {
    if !WARNED_FORCE_ON.swap(true, Ordering::Relaxed) {
        warning.emit();
    }
}
