//! Offline retirement of expired feature flags.
//!
//! [`RetirementEngine::run`] parses the registry source, audits it for
//! expired or deprecated flags, and for each one discovers its call sites,
//! rewrites them in memory and removes the declaration. In
//! [`RunMode::Simulate`] the result is only reported. In [`RunMode::Apply`]
//! each flag's [`ChangeSet`] is flushed on its own branch and committed
//! through a [`flagkit_git_tooling::VersionControl`].

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod auditor;
pub mod call_shape;
pub mod change_set;
pub mod config;
pub mod discovery;
pub mod engine;
mod error;
pub mod registry_source;
pub mod report;
pub mod rewrite;

pub use auditor::{AuditResult, ExpiredFlag, ExpiryReason, audit, find_expired_flags};
pub use call_shape::CallShape;
pub use change_set::ChangeSet;
pub use config::{ConfigLoader, ToolConfig};
pub use discovery::{CallSite, Discovery, discover};
pub use engine::{FlagPlan, RetireRequest, RetirementEngine};
pub use error::{CodemodError, Result};
pub use registry_source::{FlagDeclaration, RegistrySource};
pub use report::{FlagOutcome, RetirementReport, RunMode, render_report_lines};
pub use rewrite::{Replacement, resolve_replacement, rewrite_calls};
