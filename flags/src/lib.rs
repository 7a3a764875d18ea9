//! Runtime side of the feature-flag lifecycle system.
//!
//! A [`FlagRegistry`] holds the static flag table. [`FlagService`] wraps it
//! together with an injected [`Clock`] and [`TelemetrySink`] and answers
//! `is_enabled` queries for the host application.
//!
//! Evaluation is split in two: [`evaluator::decide`] is a pure function of
//! the flag definition and the [`EvaluationContext`], while
//! [`FlagService::record`] performs the side effects (usage counter and
//! telemetry). [`FlagService::is_enabled`] composes both.

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod clock;
pub mod error;
pub mod evaluator;
pub mod overrides;
pub mod registry;
pub mod service;
pub mod telemetry;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{FlagError, Result};
pub use evaluator::{ExpiryStatus, decide, expiry_status};
pub use overrides::{EnvToggles, ForceOverrides};
pub use registry::FlagRegistry;
pub use service::{FlagService, UsageStats};
pub use telemetry::{TelemetrySink, UsageBuffer, UsageRecord};
pub use types::{EvaluationContext, FlagDefinition, LifecycleStage, Mode, ModeGates, Role};
