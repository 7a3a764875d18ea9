use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use flagkit_git_tooling::PullRequestInstructions;
use serde::Serialize;

use crate::auditor::ExpiryReason;
use crate::call_shape::CallShape;
use crate::discovery::CallSite;
use crate::rewrite::Replacement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Print the plan; write nothing and run no `git`.
    Simulate,
    /// Rewrite, edit the registry, branch, commit, push.
    Apply,
}

impl RunMode {
    pub fn is_simulation(&self) -> bool {
        matches!(self, RunMode::Simulate)
    }
}

/// Outcome of retiring one flag.
#[derive(Debug, Clone, Serialize)]
pub struct FlagOutcome {
    pub flag_id: String,
    pub reason: ExpiryReason,
    pub owner: String,
    pub replacement: Replacement,
    /// No call sites outside the registry.
    pub safe_to_remove: bool,
    pub call_sites: Vec<CallSite>,
    pub shape_counts: BTreeMap<CallShape, usize>,
    pub files_changed: Vec<PathBuf>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub diff: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    pub pushed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<PullRequestInstructions>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetirementReport {
    pub mode: RunMode,
    pub today: NaiveDate,
    pub registry: PathBuf,
    pub flags: Vec<FlagOutcome>,
    pub warnings: Vec<String>,
}

impl RetirementReport {
    pub fn new(mode: RunMode, today: NaiveDate, registry: PathBuf) -> Self {
        Self {
            mode,
            today,
            registry,
            flags: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

/// Human-readable rendering, one entry per line.
pub fn render_report_lines(report: &RetirementReport) -> Vec<String> {
    let mut lines = Vec::new();
    let heading = match report.mode {
        RunMode::Simulate => "Dry run",
        RunMode::Apply => "Retiring",
    };

    if report.flags.is_empty() {
        lines.push(format!(
            "No expired feature flags in {} as of {}.",
            report.registry.display(),
            report.today
        ));
    } else {
        lines.push(format!(
            "{heading}: {} expired feature flag(s) in {} as of {}",
            report.flags.len(),
            report.registry.display(),
            report.today
        ));
    }

    for flag in &report.flags {
        lines.push(String::new());
        lines.push(format!(
            "{} ({}, owner: {})",
            flag.flag_id, flag.reason, flag.owner
        ));
        if flag.safe_to_remove {
            lines.push("  No call sites; safe to remove".to_string());
        } else {
            lines.push(format!(
                "  {} call site(s), {}",
                flag.call_sites.len(),
                flag.replacement
            ));
            for site in &flag.call_sites {
                let shape = site.shape.map_or("unrecognised", |s| s.name());
                lines.push(format!(
                    "    {}:{} [{shape}] {}",
                    site.path.display(),
                    site.line_number,
                    site.line.trim()
                ));
            }
            for (shape, count) in &flag.shape_counts {
                lines.push(format!("  {shape}: {count}"));
            }
        }

        if report.mode.is_simulation() {
            if !flag.diff.is_empty() {
                lines.push("  Planned changes:".to_string());
                lines.extend(flag.diff.lines().map(|l| format!("    {l}")));
            }
            continue;
        }

        for path in &flag.files_changed {
            lines.push(format!("  wrote {}", path.display()));
        }
        if let Some(branch) = &flag.branch {
            lines.push(format!("  branch: {branch}"));
        }
        match &flag.commit {
            Some(commit) => lines.push(format!("  commit: {commit}")),
            None => lines.push("  nothing to commit".to_string()),
        }
        if flag.pushed {
            lines.push("  pushed".to_string());
        }
        if let Some(pr) = &flag.pull_request {
            lines.extend(pr.lines().into_iter().map(|l| format!("  {l}")));
        }
    }

    if !report.warnings.is_empty() {
        lines.push(String::new());
        lines.push("Warnings:".to_string());
        lines.extend(report.warnings.iter().map(|w| format!("  - {w}")));
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    fn outcome() -> FlagOutcome {
        FlagOutcome {
            flag_id: "legacyInbox".to_string(),
            reason: ExpiryReason::Expired,
            owner: "inbox-team".to_string(),
            replacement: Replacement::Literal(false),
            safe_to_remove: false,
            call_sites: vec![CallSite {
                path: PathBuf::from("src/Inbox.tsx"),
                line_number: 4,
                line: "  if (isEnabled('legacyInbox')) {".to_string(),
                shape: Some(CallShape::LocalPlain),
            }],
            shape_counts: BTreeMap::from([(CallShape::LocalPlain, 1)]),
            files_changed: Vec::new(),
            diff: String::new(),
            branch: None,
            commit: None,
            pushed: false,
            pull_request: None,
        }
    }

    #[test]
    fn empty_report_says_nothing_to_do() {
        let report = RetirementReport::new(
            RunMode::Simulate,
            today(),
            PathBuf::from("src/config/featureFlags.ts"),
        );
        assert_eq!(
            render_report_lines(&report),
            vec!["No expired feature flags in src/config/featureFlags.ts as of 2025-03-01."]
        );
    }

    #[test]
    fn dry_run_lists_sites() {
        let mut report = RetirementReport::new(RunMode::Simulate, today(), PathBuf::from("f.ts"));
        report.flags.push(outcome());
        let lines = render_report_lines(&report);
        assert_eq!(lines[0], "Dry run: 1 expired feature flag(s) in f.ts as of 2025-03-01");
        assert!(lines.contains(&"legacyInbox (expired, owner: inbox-team)".to_string()));
        assert!(lines.contains(&"  1 call site(s), inline `false`".to_string()));
        assert!(
            lines.contains(
                &"    src/Inbox.tsx:4 [local-plain] if (isEnabled('legacyInbox')) {".to_string()
            )
        );
    }

    #[test]
    fn json_shape_is_stable() {
        let mut report = RetirementReport::new(RunMode::Apply, today(), PathBuf::from("f.ts"));
        let mut flag = outcome();
        flag.branch = Some("chore/remove-flag-legacy-inbox".to_string());
        report.flags.push(flag);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["mode"], "apply");
        assert_eq!(json["today"], "2025-03-01");
        assert_eq!(json["flags"][0]["replacement"]["kind"], "literal");
        assert_eq!(json["flags"][0]["replacement"]["value"], false);
        assert_eq!(json["flags"][0]["shape_counts"]["LocalPlain"], 1);
        assert_eq!(json["flags"][0]["call_sites"][0]["shape"], "LocalPlain");
        assert_eq!(json["flags"][0]["branch"], "chore/remove-flag-legacy-inbox");
        assert!(json["flags"][0].get("commit").is_none());
    }
}
