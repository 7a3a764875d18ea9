//! Per-flag retirement: audit, discover, rewrite, commit.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use flagkit_flags::FlagDefinition;
use flagkit_git_tooling::{
    PullRequestInstructions, VersionControl, branch_name_for_flag, commit_message,
};
use tracing::{info, warn};

use crate::auditor::{ExpiredFlag, audit};
use crate::change_set::ChangeSet;
use crate::config::ToolConfig;
use crate::discovery::{Discovery, discover};
use crate::error::{CodemodError, Result};
use crate::registry_source::{FlagDeclaration, RegistrySource};
use crate::report::{FlagOutcome, RetirementReport, RunMode};
use crate::rewrite::{Replacement, resolve_replacement};

/// One invocation of the retirement tool.
#[derive(Debug, Clone)]
pub struct RetireRequest {
    pub target: Option<String>,
    /// Instant the expiry audit runs at.
    pub now: DateTime<Utc>,
    pub mode: RunMode,
}

impl RetireRequest {
    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }
}

/// Everything that would change for one flag, staged in memory.
#[derive(Debug, Clone)]
pub struct FlagPlan {
    pub replacement: Replacement,
    pub discovery: Discovery,
    pub changes: ChangeSet,
}

pub struct RetirementEngine<V> {
    root: PathBuf,
    config: ToolConfig,
    vcs: V,
}

impl<V: VersionControl> RetirementEngine<V> {
    pub fn new(root: impl Into<PathBuf>, config: ToolConfig, vcs: V) -> Self {
        Self {
            root: root.into(),
            config,
            vcs,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    fn registry_path(&self) -> PathBuf {
        self.root.join(&self.config.registry.path)
    }

    fn load_registry(&self) -> Result<RegistrySource> {
        RegistrySource::load(&self.registry_path(), &self.config.registry.union_type)
    }

    pub fn run(&self, request: &RetireRequest) -> Result<RetirementReport> {
        let source = self.load_registry()?;
        let audit = audit(&source, request.target.as_deref(), request.now);

        let mut report = RetirementReport::new(
            request.mode,
            request.today(),
            self.config.registry.path.clone(),
        );
        report.warnings.extend(audit.warnings);

        if audit.expired.is_empty() {
            info!("No expired feature flags");
            return Ok(report);
        }

        for (id, expired) in &audit.expired {
            info!(flag = %id, reason = %expired.reason, mode = ?request.mode, "Retiring flag");
            let outcome = match request.mode {
                RunMode::Simulate => self.simulate(&source, expired)?,
                RunMode::Apply => match self.apply(id, expired)? {
                    Some(outcome) => outcome,
                    None => {
                        let message =
                            format!("flag '{id}' is no longer declared on the new branch; skipped");
                        warn!("{message}");
                        report.warnings.push(message);
                        continue;
                    }
                },
            };
            report.warnings.extend(unrecognised_warnings(&outcome));
            if let Some(message) = role_gate_warning(&expired.declaration.definition, &outcome) {
                warn!(flag = %id, "{message}");
                report.warnings.push(message);
            }
            report.flags.push(outcome);
        }

        Ok(report)
    }

    /// Stage every edit for one flag: rewritten call sites plus the
    /// registry without its declaration.
    pub fn plan(&self, source: &RegistrySource, decl: &FlagDeclaration) -> Result<FlagPlan> {
        let replacement = resolve_replacement(&decl.definition);
        let discovery = discover(&self.root, &self.config, decl.id(), &replacement)?;

        let mut changes = ChangeSet::new();
        for (path, planned) in &discovery.files {
            changes.stage(
                path.clone(),
                planned.original.clone(),
                planned.rewrite.updated.clone(),
            );
        }

        let registry_text = source.without_flag(decl.id()).ok_or_else(|| {
            CodemodError::parse(&source.path, format!("flag '{}' vanished", decl.id()))
        })?;
        changes.stage(
            self.config.registry.path.clone(),
            source.text.clone(),
            registry_text,
        );

        Ok(FlagPlan {
            replacement,
            discovery,
            changes,
        })
    }

    fn simulate(&self, source: &RegistrySource, expired: &ExpiredFlag) -> Result<FlagOutcome> {
        let plan = self.plan(source, &expired.declaration)?;
        let mut outcome = outcome_from_plan(expired, &plan);
        outcome.diff = plan.changes.unified_diff();
        Ok(outcome)
    }

    /// `None` when the declaration is gone once the new branch is checked
    /// out.
    fn apply(&self, id: &str, expired: &ExpiredFlag) -> Result<Option<FlagOutcome>> {
        let git = &self.config.git;
        let branch = branch_name_for_flag(&git.branch_prefix, id);
        self.vcs.start_branch(&git.trunk, &branch)?;

        let source = self.load_registry()?;
        let Some(decl) = source.declaration(id) else {
            return Ok(None);
        };
        let plan = self.plan(&source, decl)?;
        let written = plan.changes.flush(&self.root)?;
        info!(flag = %id, files = written.len(), "Wrote changes");

        let message = commit_message(&git.commit_template, id);
        let commit = self.vcs.commit_all(&message)?;

        let pushed = match (&commit, git.push) {
            (Some(_), true) => {
                self.vcs.push(&git.remote, &branch)?;
                true
            }
            _ => false,
        };

        let mut outcome = outcome_from_plan(expired, &plan);
        outcome.files_changed = written;
        outcome.pull_request = commit.as_ref().map(|_| {
            PullRequestInstructions::for_flag(id, &branch, &git.trunk, &git.remote, &message)
        });
        outcome.branch = Some(branch);
        outcome.commit = commit;
        outcome.pushed = pushed;
        Ok(Some(outcome))
    }
}

fn outcome_from_plan(expired: &ExpiredFlag, plan: &FlagPlan) -> FlagOutcome {
    let definition = &expired.declaration.definition;
    FlagOutcome {
        flag_id: definition.id.clone(),
        reason: expired.reason,
        owner: definition.owner_or_unknown().to_string(),
        replacement: plan.replacement.clone(),
        safe_to_remove: plan.discovery.is_safe_to_remove(),
        call_sites: plan.discovery.sites.clone(),
        shape_counts: plan.discovery.shape_counts(),
        files_changed: plan.changes.paths().map(Path::to_path_buf).collect(),
        diff: String::new(),
        branch: None,
        commit: None,
        pushed: false,
        pull_request: None,
    }
}

fn unrecognised_warnings(outcome: &FlagOutcome) -> Vec<String> {
    outcome
        .call_sites
        .iter()
        .filter(|site| site.shape.is_none())
        .map(|site| {
            format!(
                "{}:{}: call to '{}' has no known shape and was left unchanged",
                site.path.display(),
                site.line_number,
                outcome.flag_id
            )
        })
        .collect()
}

/// Inlining `true` for a flag that is role-gated in live drops the role check
/// at every rewritten call.
fn role_gate_warning(flag: &FlagDefinition, outcome: &FlagOutcome) -> Option<String> {
    let rewritten = outcome.call_sites.iter().any(|site| site.shape.is_some());
    if outcome.replacement != Replacement::Literal(true)
        || flag.required_roles.is_empty()
        || flag.force_enabled
        || !rewritten
    {
        return None;
    }
    let roles = flag
        .required_roles
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    Some(format!(
        "flag '{}' requires role(s) {roles} in live; inlining `true` enables it for every role",
        flag.id
    ))
}
