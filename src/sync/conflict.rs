//! Tracking issue for upstream merges that GitHub cannot perform automatically.

use anyhow::Result;
use log::info;

use crate::github::{GitHubApi, GitHubRepo, Issue};

/// Title of the tracking issue; also how an existing one is found.
pub const CONFLICT_ISSUE_TITLE: &str = "Upstream sync blocked by merge conflict";

/// What [`report_conflict`] did to the issue tracker.
#[derive(Debug, Clone, PartialEq)]
pub enum IssueAction {
    Created(u64),
    Updated(u64),
    Unchanged(u64),
}

pub fn conflict_issue_body(upstream: &GitHubRepo, branch: &str, commit_url: &str) -> String {
    format!(
        "The scheduled sync could not merge `{upstream}:{branch}` into this repository \
because the changes conflict.\n\
\n\
Latest upstream commit: {commit_url}\n\
\n\
## How to resolve\n\
\n\
Pull from the upstream repository:\n\
\n\
```\n\
git pull https://github.com/{upstream}.git {branch}\n\
```\n\
\n\
The merge conflicts then have to be resolved by hand.\n\
\n\
Conflicts on GitHub workflow files that were deleted in this repository \
can be resolved by running `git rm` on those files again.\n\
\n\
Before committing the merge, check that the downstream package `version` \
and the constraints of every tracked upstream dependency match the upstream version.\n\
\n\
Version propagation and publishing stay paused until then. \
This issue is kept up to date by the sync job while the conflict persists.\n"
    )
}

/// Creates the tracking issue, or refreshes the body of the open one.
#[tracing::instrument(skip(github))]
pub async fn report_conflict<G: GitHubApi + ?Sized>(
    github: &G,
    repo: &GitHubRepo,
    upstream: &GitHubRepo,
    branch: &str,
) -> Result<IssueAction> {
    let commit = github.get_commit(upstream, branch).await?;
    let body = conflict_issue_body(upstream, branch, &commit.html_url);

    let issues = github.list_open_issues(repo).await?;
    let action = match find_tracking_issue(&issues) {
        None => {
            let issue = github
                .create_issue(repo, CONFLICT_ISSUE_TITLE, &body)
                .await?;
            info!("Opened conflict issue #{}", issue.number);
            IssueAction::Created(issue.number)
        }
        Some(existing) if existing.body_text() != body => {
            github
                .update_issue_body(repo, existing.number, &body)
                .await?;
            info!("Updated conflict issue #{}", existing.number);
            IssueAction::Updated(existing.number)
        }
        Some(existing) => {
            info!("Conflict issue #{} is already current", existing.number);
            IssueAction::Unchanged(existing.number)
        }
    };

    Ok(action)
}

fn find_tracking_issue(issues: &[Issue]) -> Option<&Issue> {
    issues
        .iter()
        .find(|issue| issue.title == CONFLICT_ISSUE_TITLE)
}
