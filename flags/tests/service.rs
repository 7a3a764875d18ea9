use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::NaiveDate;
use flagkit_flags::{
    EvaluationContext, FixedClock, FlagDefinition, FlagError, FlagRegistry, FlagService,
    LifecycleStage, Mode, ModeGates, Role, TelemetrySink, UsageBuffer, UsageRecord,
};
use pretty_assertions::assert_eq;

/// Sink that rejects every record.
#[derive(Default)]
struct FailingSink {
    attempts: AtomicUsize,
}

impl TelemetrySink for FailingSink {
    fn record(&self, _record: UsageRecord) -> flagkit_flags::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(FlagError::Telemetry("collector offline".to_string()))
    }
}

fn registry() -> FlagRegistry {
    FlagRegistry::from_definitions([
        FlagDefinition {
            id: "messaging".to_string(),
            mode_gates: ModeGates::new(true, true, true),
            created_at: "2024-01-10".to_string(),
            ..Default::default()
        },
        FlagDefinition {
            id: "legacyInbox".to_string(),
            mode_gates: ModeGates::new(true, true, false),
            lifecycle_stage: LifecycleStage::Deprecated,
            expires_at: Some("2024-06-01".to_string()),
            replaced_by: Some("messaging".to_string()),
            owner: Some("inbox-team".to_string()),
            ..Default::default()
        },
        FlagDefinition {
            id: "recruiterTools".to_string(),
            mode_gates: ModeGates::new(false, false, true),
            required_roles: vec![Role::from("recruiter"), Role::from("admin")],
            ..Default::default()
        },
        FlagDefinition {
            id: "brokenExpiry".to_string(),
            mode_gates: ModeGates::new(true, true, true),
            expires_at: Some("soon".to_string()),
            ..Default::default()
        },
    ])
    .unwrap()
}

fn service_with_buffer() -> (FlagService, Arc<UsageBuffer>) {
    let buffer = Arc::new(UsageBuffer::new());
    let clock = FixedClock::on(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
    let service = FlagService::new(registry(), Arc::new(clock), buffer.clone());
    (service, buffer)
}

#[test]
fn every_evaluation_counts_once() {
    let (service, _) = service_with_buffer();
    let live = EvaluationContext::new(Mode::Live);

    assert!(service.is_enabled("messaging", &live).unwrap());
    assert!(!service.is_enabled("legacyInbox", &live).unwrap());
    assert!(!service.is_enabled("legacyInbox", &live).unwrap());

    assert_eq!(service.usage_count("messaging"), Some(1));
    assert_eq!(service.usage_count("legacyInbox"), Some(2));
    assert_eq!(service.usage_count("recruiterTools"), Some(0));
}

#[test]
fn sink_failure_does_not_change_the_decision() {
    let sink = Arc::new(FailingSink::default());
    let service = FlagService::new(
        registry(),
        Arc::new(FixedClock::on(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap())),
        sink.clone(),
    );
    let ctx = EvaluationContext::new(Mode::Live).with_role("recruiter");

    assert!(service.is_enabled("recruiterTools", &ctx).unwrap());
    assert!(!service.is_enabled("legacyInbox", &ctx).unwrap());
    assert_eq!(service.usage_count("recruiterTools"), Some(1));
    assert_eq!(service.usage_count("legacyInbox"), Some(1));
    assert_eq!(sink.attempts.load(Ordering::SeqCst), 2);
    assert!(service.collect_usage_data().is_empty());
}

#[test]
fn records_carry_context_and_drain_resets() {
    let (service, buffer) = service_with_buffer();
    let ctx = EvaluationContext::new(Mode::Demo)
        .with_role("member")
        .with_screen("ProfileScreen");

    service.is_enabled("messaging", &ctx).unwrap();
    service.is_enabled("recruiterTools", &ctx).unwrap();
    assert_eq!(buffer.len(), 2);

    let drained = service.collect_usage_data();
    assert_eq!(drained.len(), 2);
    assert_eq!(drained[0].flag_id, "messaging");
    assert!(drained[0].enabled);
    assert_eq!(drained[0].screen_name.as_deref(), Some("ProfileScreen"));
    assert_eq!(drained[0].role, Some(Role::from("member")));
    assert_eq!(drained[1].flag_id, "recruiterTools");
    assert!(!drained[1].enabled);

    assert!(service.collect_usage_data().is_empty());
    // Drain does not reset the counters.
    assert_eq!(service.usage_count("messaging"), Some(1));
}

#[test]
fn usage_stats_snapshot() {
    let (service, _) = service_with_buffer();
    let ctx = EvaluationContext::new(Mode::Development);
    service.is_enabled("legacyInbox", &ctx).unwrap();
    service.is_enabled("brokenExpiry", &ctx).unwrap();

    let stats = service.usage_stats();
    assert_eq!(stats.len(), 4);
    let legacy = &stats["legacyInbox"];
    assert_eq!(legacy.usage_count, 1);
    assert_eq!(legacy.lifecycle_stage, LifecycleStage::Deprecated);
    assert!(legacy.is_expired);
    assert!(!stats["messaging"].is_expired);
    assert!(!stats["brokenExpiry"].is_expired);
}

#[test]
fn unknown_flag_is_an_error() {
    let (service, buffer) = service_with_buffer();
    let err = service
        .is_enabled("nope", &EvaluationContext::new(Mode::Live))
        .unwrap_err();
    assert!(matches!(err, FlagError::UnknownFlag(id) if id == "nope"));
    assert!(buffer.is_empty());
}

#[test]
fn lookup_surface() {
    let (service, _) = service_with_buffer();
    assert_eq!(
        service.all_feature_names(),
        vec!["messaging", "legacyInbox", "recruiterTools", "brokenExpiry"]
    );
    let config = service.feature_config("legacyInbox").unwrap();
    assert_eq!(config.replaced_by.as_deref(), Some("messaging"));
    assert_eq!(config.owner_or_unknown(), "inbox-team");
}
