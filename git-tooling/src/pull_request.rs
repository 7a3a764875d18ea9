use serde::Serialize;

/// Manual steps for opening the retirement pull request.
///
/// Creating the PR is deliberately left to a human; this only renders what
/// they need to do it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequestInstructions {
    pub branch: String,
    pub base: String,
    pub remote: String,
    pub title: String,
    pub body: String,
}

impl PullRequestInstructions {
    pub fn for_flag(flag_id: &str, branch: &str, base: &str, remote: &str, title: &str) -> Self {
        let body = format!(
            "Removes the expired feature flag `{flag_id}`.\n\n\
             - Call sites rewritten by flag-retire\n\
             - Registry entry deleted\n\n\
             Please review the rewritten call sites before merging."
        );
        Self {
            branch: branch.to_string(),
            base: base.to_string(),
            remote: remote.to_string(),
            title: title.to_string(),
            body,
        }
    }

    /// Example invocation of the GitHub CLI that would open this PR.
    pub fn example_command(&self) -> String {
        format!(
            "gh pr create --base {} --head {} --title {:?} --body {:?}",
            self.base, self.branch, self.title, self.body
        )
    }

    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("Pull request for {} is not created automatically.", self.branch),
            "To open it:".to_string(),
            format!(
                "  1. Make sure {} is pushed to {}",
                self.branch, self.remote
            ),
            format!(
                "  2. Open a pull request from {} into {}",
                self.branch, self.base
            ),
            format!("  3. Title: {}", self.title),
            "Example:".to_string(),
            format!("  {}", self.example_command()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instructions_name_branch_and_base() {
        let pr = PullRequestInstructions::for_flag(
            "legacyInbox",
            "chore/remove-flag-legacy-inbox",
            "main",
            "origin",
            "chore: remove expired feature flag legacyInbox",
        );
        let lines = pr.lines();
        assert!(lines[0].contains("chore/remove-flag-legacy-inbox"));
        assert!(lines.iter().any(|l| l.contains("into main")));
        assert!(pr.example_command().starts_with(
            "gh pr create --base main --head chore/remove-flag-legacy-inbox"
        ));
        assert!(pr.body.contains("`legacyInbox`"));
    }
}
