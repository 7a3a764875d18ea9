//! Core types for flag evaluation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Execution mode a flag's gate is defined against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Development,
    Demo,
    Live,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Development => "development",
            Mode::Demo => "demo",
            Mode::Live => "live",
        }
    }

    /// Parse from string (case-insensitive). Accepts the short forms
    /// `dev` and `prod` as well.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(Mode::Development),
            "demo" => Some(Mode::Demo),
            "live" | "prod" | "production" => Some(Mode::Live),
            _ => None,
        }
    }

    pub fn all() -> [Self; 3] {
        [Mode::Development, Mode::Demo, Mode::Live]
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The acting user's privilege level. Roles are open-ended strings owned by
/// the session layer; the flag system only compares them for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Role {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a flag sits in its retirement pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleStage {
    Beta,
    #[default]
    Stable,
    Deprecated,
    PlannedRemoval,
    Legacy,
}

impl LifecycleStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleStage::Beta => "beta",
            LifecycleStage::Stable => "stable",
            LifecycleStage::Deprecated => "deprecated",
            LifecycleStage::PlannedRemoval => "planned-removal",
            LifecycleStage::Legacy => "legacy",
        }
    }

    /// Parse the spellings found in registry sources: kebab-case,
    /// snake_case and camelCase are all accepted.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized: String = value
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "beta" => Some(LifecycleStage::Beta),
            "stable" => Some(LifecycleStage::Stable),
            "deprecated" => Some(LifecycleStage::Deprecated),
            "plannedremoval" => Some(LifecycleStage::PlannedRemoval),
            "legacy" => Some(LifecycleStage::Legacy),
            _ => None,
        }
    }
}

impl fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-mode candidacy: whether the flag may be "on" in each mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModeGates {
    pub development: bool,
    pub demo: bool,
    pub live: bool,
}

impl ModeGates {
    pub fn new(development: bool, demo: bool, live: bool) -> Self {
        Self {
            development,
            demo,
            live,
        }
    }

    pub fn for_mode(&self, mode: Mode) -> bool {
        match mode {
            Mode::Development => self.development,
            Mode::Demo => self.demo,
            Mode::Live => self.live,
        }
    }
}

/// Configuration of one registered capability.
///
/// Definitions are immutable once the registry is built. The usage counter
/// is kept by [`crate::FlagService`], not here.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FlagDefinition {
    pub id: String,
    pub mode_gates: ModeGates,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_roles: Vec<Role>,
    #[serde(default)]
    pub lifecycle_stage: LifecycleStage,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_at: String,
    /// Raw expiry as written in the registry (`YYYY-MM-DD` or RFC 3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaced_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default)]
    pub force_enabled: bool,
    #[serde(default)]
    pub force_disabled: bool,
}

impl FlagDefinition {
    pub fn owner_or_unknown(&self) -> &str {
        self.owner.as_deref().unwrap_or("unknown")
    }
}

/// What the evaluator knows about the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationContext {
    pub mode: Mode,
    pub role: Option<Role>,
    /// Tracking metadata only; never affects the decision.
    pub screen_name: Option<String>,
}

impl EvaluationContext {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            role: None,
            screen_name: None,
        }
    }

    pub fn with_role(mut self, role: impl Into<Role>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_screen(mut self, screen_name: impl Into<String>) -> Self {
        self.screen_name = Some(screen_name.into());
        self
    }
}
