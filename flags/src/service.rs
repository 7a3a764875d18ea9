//! Constructor-injected flag service used by the host application.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::evaluator::{ExpiryStatus, decide, expiry_status};
use crate::registry::FlagRegistry;
use crate::telemetry::{TelemetrySink, UsageBuffer, UsageRecord};
use crate::types::{EvaluationContext, FlagDefinition, LifecycleStage};

/// Per-flag observability snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageStats {
    pub usage_count: u64,
    pub lifecycle_stage: LifecycleStage,
    pub is_expired: bool,
}

pub struct FlagService {
    registry: FlagRegistry,
    usage: HashMap<String, AtomicU64>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn TelemetrySink>,
}

impl FlagService {
    pub fn new(
        registry: FlagRegistry,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn TelemetrySink>,
    ) -> Self {
        let usage = registry
            .ids()
            .map(|id| (id.to_string(), AtomicU64::new(0)))
            .collect();
        Self {
            registry,
            usage,
            clock,
            sink,
        }
    }

    /// System clock and an in-memory [`UsageBuffer`].
    pub fn with_defaults(registry: FlagRegistry) -> Self {
        Self::new(
            registry,
            Arc::new(SystemClock),
            Arc::new(UsageBuffer::new()),
        )
    }

    pub fn registry(&self) -> &FlagRegistry {
        &self.registry
    }

    /// Evaluate `flag_id` for `ctx` and record the usage.
    ///
    /// Fails only for ids that are not registered.
    pub fn is_enabled(&self, flag_id: &str, ctx: &EvaluationContext) -> Result<bool> {
        let flag = self.registry.config(flag_id)?;
        self.warn_if_expired(flag);
        let enabled = decide(flag, ctx);
        self.record(flag, ctx, enabled);
        Ok(enabled)
    }

    /// Side-effecting half of an evaluation: bump the usage counter and hand
    /// a record to the telemetry sink. Sink failures are logged and dropped.
    pub fn record(&self, flag: &FlagDefinition, ctx: &EvaluationContext, enabled: bool) {
        if let Some(counter) = self.usage.get(&flag.id) {
            counter.fetch_add(1, Ordering::Relaxed);
        }

        let record = UsageRecord {
            flag_id: flag.id.clone(),
            enabled,
            role: ctx.role.clone(),
            mode: ctx.mode,
            screen_name: ctx.screen_name.clone(),
            timestamp: self.clock.now(),
        };
        if let Err(err) = self.sink.record(record) {
            tracing::warn!(flag = %flag.id, error = %err, "Failed to record feature flag usage");
        }
    }

    pub fn feature_config(&self, flag_id: &str) -> Result<&FlagDefinition> {
        self.registry.config(flag_id)
    }

    pub fn all_feature_names(&self) -> Vec<&str> {
        self.registry.ids().collect()
    }

    pub fn usage_count(&self, flag_id: &str) -> Option<u64> {
        self.usage
            .get(flag_id)
            .map(|counter| counter.load(Ordering::Relaxed))
    }

    pub fn usage_stats(&self) -> BTreeMap<String, UsageStats> {
        let now = self.clock.now();
        self.registry
            .iter()
            .map(|flag| {
                let stats = UsageStats {
                    usage_count: self.usage_count(&flag.id).unwrap_or(0),
                    lifecycle_stage: flag.lifecycle_stage,
                    is_expired: expiry_status(flag, now).is_expired(),
                };
                (flag.id.clone(), stats)
            })
            .collect()
    }

    /// Drain the telemetry sink for an external collector.
    pub fn collect_usage_data(&self) -> Vec<UsageRecord> {
        self.sink.drain()
    }

    fn warn_if_expired(&self, flag: &FlagDefinition) {
        match expiry_status(flag, self.clock.now()) {
            ExpiryStatus::Expired { expires_at } => {
                tracing::warn!(
                    flag = %flag.id,
                    owner = %flag.owner_or_unknown(),
                    replaced_by = flag.replaced_by.as_deref().unwrap_or("none"),
                    expired_at = %expires_at.date_naive(),
                    "Feature flag has expired and should be removed"
                );
            }
            ExpiryStatus::Malformed { raw } => {
                tracing::warn!(
                    flag = %flag.id,
                    expires_at = %raw,
                    "Feature flag has an unparseable expiry date; treating as not expired"
                );
            }
            ExpiryStatus::NoExpiry | ExpiryStatus::Active { .. } => {}
        }
    }
}

impl std::fmt::Debug for FlagService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlagService")
            .field("flags", &self.registry.len())
            .finish_non_exhaustive()
    }
}
