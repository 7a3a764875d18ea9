//! Git automation for flag retirement.
//!
//! Each retired flag gets its own branch cut from trunk, a single commit
//! with a templated message, an optional push, and printed instructions for
//! opening the pull request by hand. Opening the PR itself is not automated.

mod branch;
mod errors;
mod pull_request;
mod repo;

pub use branch::{branch_name_for_flag, commit_message, kebab_case};
pub use errors::{GitToolingError, Result};
pub use pull_request::PullRequestInstructions;
pub use repo::{GitRepo, VersionControl};
