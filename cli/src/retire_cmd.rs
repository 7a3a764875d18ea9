//! `flag-retire` command
//!
//! Finds expired or deprecated feature flags in the registry source,
//! rewrites their call sites and deletes their declarations.
//!
//! ## Usage
//!
//! - `flag-retire` : dry run over every expired flag
//! - `flag-retire --flag=<ID>` : restrict to one flag
//! - `flag-retire --create-pr` : apply; one branch and commit per flag, then
//!   print the manual pull request steps
//!
//! ## Exit Codes
//!
//! - 0: Success, or nothing to do
//! - 1: Registry, file or git error

use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use flagkit_codemod::config::ConfigLoader;
use flagkit_codemod::{RetireRequest, RetirementEngine, RunMode, render_report_lines};
use flagkit_flags::{Clock, FixedClock, SystemClock};
use flagkit_git_tooling::GitRepo;

/// Retire expired feature flags
#[derive(Debug, Parser)]
#[command(name = "flag-retire", version)]
pub struct RetireCli {
    /// Only consider this flag
    #[arg(long = "flag", value_name = "FLAG-ID")]
    pub flag: Option<String>,

    /// Print the plan without touching any file (the default)
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Apply: rewrite, branch, commit, push, and print PR instructions
    #[arg(long = "create-pr")]
    pub create_pr: bool,

    /// Repository root (defaults to current directory)
    #[arg(short = 'C', long = "cwd", value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Config file (defaults to ./flagkit.toml, then the user config dir)
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Registry source file, relative to the repository root
    #[arg(long = "registry", value_name = "PATH")]
    pub registry: Option<PathBuf>,

    /// Audit as of the end of this date instead of now
    #[arg(long = "today", value_name = "YYYY-MM-DD", value_parser = parse_date)]
    pub today: Option<NaiveDate>,

    /// Output as JSON instead of text
    #[arg(long = "json", short = 'j')]
    pub json: bool,
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|err| format!("{raw}: {err}"))
}

impl RetireCli {
    /// `--dry-run` always wins over `--create-pr`.
    pub fn mode(&self) -> RunMode {
        if self.create_pr && !self.dry_run {
            RunMode::Apply
        } else {
            RunMode::Simulate
        }
    }

    pub fn run(self) -> anyhow::Result<()> {
        let mode = self.mode();
        let cwd = match self.cwd {
            Some(cwd) => cwd,
            None => std::env::current_dir().context("resolving current directory")?,
        };

        let mut config = ConfigLoader::load_for(&cwd, self.config.as_deref())?;
        if let Some(registry) = self.registry {
            config.registry.path = registry;
        }

        let now = match self.today {
            Some(date) => FixedClock::end_of(date).now(),
            None => SystemClock.now(),
        };
        let request = RetireRequest {
            target: self.flag,
            now,
            mode,
        };
        tracing::debug!(cwd = %cwd.display(), ?request, "Starting flag retirement");

        let engine = RetirementEngine::new(&cwd, config, GitRepo::new(&cwd));
        let report = engine.run(&request)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            for line in render_report_lines(&report) {
                println!("{line}");
            }
        }
        Ok(())
    }
}
