//! Pure flag decision logic.
//!
//! Precedence, first match wins:
//! 1. `force_enabled` → on
//! 2. `force_disabled` → off
//! 3. live mode with a closed live gate → off
//! 4. role gate: live combines with AND, every other mode with OR
//! 5. the mode gate alone
//!
//! The AND/OR split in step 4 is long-standing behaviour that callers rely
//! on; it is kept as is.

use chrono::{DateTime, NaiveDate, Utc};

use crate::types::{EvaluationContext, FlagDefinition, Mode};

/// Decide whether `flag` is active for `ctx`. No side effects.
pub fn decide(flag: &FlagDefinition, ctx: &EvaluationContext) -> bool {
    if flag.force_enabled {
        return true;
    }
    if flag.force_disabled {
        return false;
    }

    let mode_base = flag.mode_gates.for_mode(ctx.mode);

    // Fail closed in production.
    if ctx.mode == Mode::Live && !mode_base {
        return false;
    }

    if flag.required_roles.is_empty() {
        return mode_base;
    }

    let Some(role) = ctx.role.as_ref() else {
        return false;
    };
    let has_role = flag.required_roles.contains(role);

    if ctx.mode == Mode::Live {
        mode_base && has_role
    } else {
        mode_base || has_role
    }
}

/// Result of interpreting a flag's `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpiryStatus {
    NoExpiry,
    Active { expires_at: DateTime<Utc> },
    Expired { expires_at: DateTime<Utc> },
    /// Unparseable expiry; treated as not expired.
    Malformed { raw: String },
}

impl ExpiryStatus {
    pub fn is_expired(&self) -> bool {
        matches!(self, ExpiryStatus::Expired { .. })
    }
}

/// Parse an expiry written either as `YYYY-MM-DD` (midnight UTC) or as an
/// RFC 3339 timestamp.
pub fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_time(chrono::NaiveTime::MIN).and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub fn expiry_status(flag: &FlagDefinition, now: DateTime<Utc>) -> ExpiryStatus {
    let Some(raw) = flag.expires_at.as_deref() else {
        return ExpiryStatus::NoExpiry;
    };
    match parse_expiry(raw) {
        Some(expires_at) if expires_at < now => ExpiryStatus::Expired { expires_at },
        Some(expires_at) => ExpiryStatus::Active { expires_at },
        None => ExpiryStatus::Malformed {
            raw: raw.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ModeGates, Role};

    fn flag(gates: ModeGates, roles: &[&str]) -> FlagDefinition {
        FlagDefinition {
            id: "connectionRequests".to_string(),
            mode_gates: gates,
            required_roles: roles.iter().map(|r| Role::from(*r)).collect(),
            ..Default::default()
        }
    }

    fn ctx(mode: Mode, role: Option<&str>) -> EvaluationContext {
        let ctx = EvaluationContext::new(mode);
        match role {
            Some(role) => ctx.with_role(role),
            None => ctx,
        }
    }

    #[test]
    fn force_enabled_wins_everywhere() {
        let mut f = flag(ModeGates::new(false, false, false), &["admin"]);
        f.force_enabled = true;
        f.force_disabled = true;
        for mode in Mode::all() {
            for role in [None, Some("admin"), Some("guest")] {
                assert!(decide(&f, &ctx(mode, role)), "{mode} / {role:?}");
            }
        }
    }

    #[test]
    fn force_disabled_loses_to_nothing_else() {
        let mut f = flag(ModeGates::new(true, true, true), &[]);
        f.force_disabled = true;
        for mode in Mode::all() {
            for role in [None, Some("admin")] {
                assert!(!decide(&f, &ctx(mode, role)), "{mode} / {role:?}");
            }
        }
    }

    #[test]
    fn live_with_roles_is_gate_and_role() {
        for gate in [true, false] {
            let f = flag(ModeGates::new(false, false, gate), &["admin", "premium"]);
            assert_eq!(decide(&f, &ctx(Mode::Live, Some("admin"))), gate);
            assert!(!decide(&f, &ctx(Mode::Live, Some("member"))));
            assert!(!decide(&f, &ctx(Mode::Live, None)));
        }
    }

    #[test]
    fn non_live_with_roles_is_gate_or_role() {
        for mode in [Mode::Development, Mode::Demo] {
            for gate in [true, false] {
                let gates = match mode {
                    Mode::Development => ModeGates::new(gate, false, false),
                    _ => ModeGates::new(false, gate, false),
                };
                let f = flag(gates, &["admin"]);
                assert!(decide(&f, &ctx(mode, Some("admin"))));
                assert_eq!(decide(&f, &ctx(mode, Some("member"))), gate);
                // No role present short-circuits to off even when the gate is open.
                assert!(!decide(&f, &ctx(mode, None)));
            }
        }
    }

    #[test]
    fn without_roles_the_mode_gate_decides() {
        let f = flag(ModeGates::new(true, false, true), &[]);
        assert!(decide(&f, &ctx(Mode::Development, None)));
        assert!(!decide(&f, &ctx(Mode::Demo, Some("admin"))));
        assert!(decide(&f, &ctx(Mode::Live, None)));
    }

    #[test]
    fn expiry_parsing() {
        let now = parse_expiry("2025-03-01T12:00:00Z").unwrap();

        let mut f = flag(ModeGates::default(), &[]);
        assert_eq!(expiry_status(&f, now), ExpiryStatus::NoExpiry);

        f.expires_at = Some("2025-02-28".to_string());
        assert!(expiry_status(&f, now).is_expired());

        f.expires_at = Some("2025-03-02".to_string());
        assert!(matches!(
            expiry_status(&f, now),
            ExpiryStatus::Active { .. }
        ));

        f.expires_at = Some("2025-03-01T11:59:59+00:00".to_string());
        assert!(expiry_status(&f, now).is_expired());

        f.expires_at = Some("next quarter".to_string());
        let status = expiry_status(&f, now);
        assert!(!status.is_expired());
        assert_eq!(
            status,
            ExpiryStatus::Malformed {
                raw: "next quarter".to_string()
            }
        );
    }
}
