//! Expiration audit over a parsed registry source.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use flagkit_flags::{ExpiryStatus, LifecycleStage, expiry_status};
use serde::Serialize;
use tracing::{debug, warn};

use crate::registry_source::{FlagDeclaration, RegistrySource};

/// Why a flag was selected for retirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExpiryReason {
    Expired,
    Deprecated,
    ExpiredAndDeprecated,
}

impl ExpiryReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpiryReason::Expired => "expired",
            ExpiryReason::Deprecated => "deprecated",
            ExpiryReason::ExpiredAndDeprecated => "expired and deprecated",
        }
    }
}

impl std::fmt::Display for ExpiryReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ExpiredFlag {
    pub declaration: FlagDeclaration,
    pub reason: ExpiryReason,
}

#[derive(Debug, Clone, Default)]
pub struct AuditResult {
    pub expired: BTreeMap<String, ExpiredFlag>,
    pub warnings: Vec<String>,
}

impl AuditResult {
    pub fn is_empty(&self) -> bool {
        self.expired.is_empty()
    }
}

/// `None` when the flag is neither past `expires_at` at `now` nor
/// deprecated. Uses the same rule as the runtime expiry warning.
pub fn expiry_reason(decl: &FlagDeclaration, now: DateTime<Utc>) -> Option<ExpiryReason> {
    let expired = match expiry_status(&decl.definition, now) {
        ExpiryStatus::Expired { .. } => true,
        ExpiryStatus::Malformed { raw } => {
            warn!(
                flag = %decl.id(),
                expires_at = %raw,
                "Unparseable expiresAt; treating flag as not expired"
            );
            false
        }
        ExpiryStatus::NoExpiry | ExpiryStatus::Active { .. } => false,
    };
    let deprecated = decl.definition.lifecycle_stage == LifecycleStage::Deprecated;

    match (expired, deprecated) {
        (true, true) => Some(ExpiryReason::ExpiredAndDeprecated),
        (true, false) => Some(ExpiryReason::Expired),
        (false, true) => Some(ExpiryReason::Deprecated),
        (false, false) => None,
    }
}

pub fn audit(source: &RegistrySource, target: Option<&str>, now: DateTime<Utc>) -> AuditResult {
    let mut result = AuditResult::default();

    for decl in source.declarations() {
        if let Some(replacement) = decl.definition.replaced_by.as_deref()
            && source.declaration(replacement).is_none()
        {
            let message = format!(
                "flag '{}' is replaced by '{replacement}', which is not in the registry",
                decl.id()
            );
            warn!("{message}");
            result.warnings.push(message);
        }
    }

    if let Some(target) = target
        && source.declaration(target).is_none()
    {
        let message = format!("flag '{target}' is not declared in {}", source.path.display());
        warn!("{message}");
        result.warnings.push(message);
        return result;
    }

    for decl in source.declarations() {
        if target.is_some_and(|t| t != decl.id()) {
            continue;
        }
        match expiry_reason(decl, now) {
            Some(reason) => {
                debug!(flag = %decl.id(), %reason, "flag selected for retirement");
                result.expired.insert(
                    decl.id().to_string(),
                    ExpiredFlag {
                        declaration: decl.clone(),
                        reason,
                    },
                );
            }
            None => debug!(flag = %decl.id(), "flag is current"),
        }
    }

    result
}

/// Expired or deprecated flags keyed by id.
pub fn find_expired_flags(
    source: &RegistrySource,
    target: Option<&str>,
    now: DateTime<Utc>,
) -> BTreeMap<String, FlagDeclaration> {
    audit(source, target, now)
        .expired
        .into_iter()
        .map(|(id, flag)| (id, flag.declaration))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use flagkit_flags::{Clock, FixedClock};
    use pretty_assertions::assert_eq;
    use std::path::Path;

    const REGISTRY: &str = r#"export type FeatureFlagName =
  | 'current'
  | 'pastDue'
  | 'dueToday'
  | 'retired'
  | 'broken'
  | 'orphaned';

export const FEATURE_FLAGS = {
  current: {
    enabledInDevelopment: true,
    enabledInDemo: true,
    enabledInLive: true,
    expiresAt: '2030-01-01',
  },
  pastDue: {
    enabledInDevelopment: true,
    enabledInDemo: true,
    enabledInLive: false,
    expiresAt: '2024-01-01',
  },
  dueToday: {
    enabledInDevelopment: true,
    enabledInDemo: true,
    enabledInLive: true,
    expiresAt: '2025-03-01',
  },
  retired: {
    enabledInDevelopment: false,
    enabledInDemo: false,
    enabledInLive: true,
    lifecycleStage: 'deprecated',
    expiresAt: '2024-01-01',
  },
  broken: {
    enabledInDevelopment: true,
    enabledInDemo: true,
    enabledInLive: true,
    expiresAt: 'someday',
  },
  orphaned: {
    enabledInDevelopment: true,
    enabledInDemo: true,
    enabledInLive: true,
    replacedBy: 'ghost',
    lifecycleStage: 'deprecated',
  },
};
"#;

    fn source() -> RegistrySource {
        RegistrySource::parse(Path::new("flags.ts"), REGISTRY.to_string(), "FeatureFlagName")
            .expect("fixture parses")
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date")
    }

    fn noon() -> DateTime<Utc> {
        FixedClock::new(date().and_hms_opt(12, 0, 0).expect("valid time").and_utc()).now()
    }

    #[test]
    fn selects_expired_and_deprecated_flags() {
        let result = audit(&source(), None, noon());
        let ids: Vec<&str> = result.expired.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["dueToday", "orphaned", "pastDue", "retired"]);
        assert_eq!(result.expired["pastDue"].reason, ExpiryReason::Expired);
        assert_eq!(
            result.expired["retired"].reason,
            ExpiryReason::ExpiredAndDeprecated
        );
        assert_eq!(result.expired["orphaned"].reason, ExpiryReason::Deprecated);
    }

    #[test]
    fn date_only_expiry_passes_at_the_start_of_its_day() {
        let src = source();
        let decl = src.declaration("dueToday").expect("declared");
        assert_eq!(expiry_reason(decl, noon()), Some(ExpiryReason::Expired));
        assert_eq!(
            expiry_reason(decl, FixedClock::end_of(date()).now()),
            Some(ExpiryReason::Expired)
        );
        let eve = date().pred_opt().expect("valid date");
        assert_eq!(expiry_reason(decl, FixedClock::end_of(eve).now()), None);
    }

    #[test]
    fn audit_agrees_with_runtime_usage_stats() {
        use flagkit_flags::{FlagRegistry, FlagService, UsageBuffer};
        use std::sync::Arc;

        let src = source();
        let registry = FlagRegistry::from_definitions(src.definitions()).expect("registry");
        for clock in [
            FixedClock::new(noon()),
            FixedClock::on(date()),
            FixedClock::end_of(date().pred_opt().expect("valid date")),
        ] {
            let service = FlagService::new(
                registry.clone(),
                Arc::new(clock),
                Arc::new(UsageBuffer::new()),
            );
            let stats = service.usage_stats();
            for decl in src.declarations() {
                let selected_as_expired = matches!(
                    expiry_reason(decl, clock.now()),
                    Some(ExpiryReason::Expired | ExpiryReason::ExpiredAndDeprecated)
                );
                assert_eq!(
                    stats[decl.id()].is_expired,
                    selected_as_expired,
                    "{} at {}",
                    decl.id(),
                    clock.now()
                );
            }
        }
    }

    #[test]
    fn malformed_expiry_is_not_expired() {
        let src = source();
        let decl = src.declaration("broken").expect("declared");
        assert_eq!(expiry_reason(decl, noon()), None);
    }

    #[test]
    fn target_restricts_the_audit() {
        let result = audit(&source(), Some("pastDue"), noon());
        assert_eq!(result.expired.len(), 1);
        assert!(result.expired.contains_key("pastDue"));

        let current = audit(&source(), Some("current"), noon());
        assert!(current.is_empty());
    }

    #[test]
    fn unknown_target_is_nothing_to_do() {
        let result = audit(&source(), Some("nope"), noon());
        assert!(result.is_empty());
        assert!(result.warnings.iter().any(|w| w.contains("'nope'")));
    }

    #[test]
    fn dangling_replacement_is_a_warning() {
        let result = audit(&source(), None, noon());
        assert_eq!(
            result.warnings,
            vec!["flag 'orphaned' is replaced by 'ghost', which is not in the registry".to_string()]
        );
    }

    #[test]
    fn find_expired_flags_returns_declarations() {
        let expired = find_expired_flags(&source(), None, noon());
        assert_eq!(expired["pastDue"].definition.expires_at.as_deref(), Some("2024-01-01"));
    }
}
