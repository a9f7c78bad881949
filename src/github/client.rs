use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Method};
use serde_json::json;

use crate::http::HttpClient;

use super::repo::GitHubRepo;
use super::types::{Commit, Issue, MergeUpstream, RepoInfo};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Issues are listed at most this many pages deep (100 per page).
const MAX_ISSUE_PAGES: u32 = 10;

/// The subset of the GitHub REST API the sync job talks to.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GitHubApi: Send + Sync {
    async fn get_repo_info(&self, repo: &GitHubRepo) -> Result<RepoInfo>;
    async fn merge_upstream(&self, repo: &GitHubRepo, branch: &str) -> Result<MergeUpstream>;
    async fn get_commit(&self, repo: &GitHubRepo, reference: &str) -> Result<Commit>;
    async fn dispatch_workflow(
        &self,
        repo: &GitHubRepo,
        workflow: &str,
        reference: &str,
    ) -> Result<()>;
    async fn list_open_issues(&self, repo: &GitHubRepo) -> Result<Vec<Issue>>;
    async fn create_issue(&self, repo: &GitHubRepo, title: &str, body: &str) -> Result<Issue>;
    async fn update_issue_body(&self, repo: &GitHubRepo, number: u64, body: &str)
    -> Result<Issue>;
}

pub struct GitHub {
    http_client: HttpClient,
    api_url: String,
}

impl GitHub {
    #[tracing::instrument(skip(client, api_url))]
    pub fn new(client: Client, api_url: Option<String>) -> Self {
        let api_url = api_url
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        Self {
            http_client: HttpClient::new(client),
            api_url,
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn http_client(&self) -> &HttpClient {
        &self.http_client
    }

    fn repo_url(&self, repo: &GitHubRepo) -> String {
        format!("{}/repos/{}/{}", self.api_url, repo.owner, repo.repo)
    }
}

#[async_trait]
impl GitHubApi for GitHub {
    #[tracing::instrument(skip(self))]
    async fn get_repo_info(&self, repo: &GitHubRepo) -> Result<RepoInfo> {
        let url = self.repo_url(repo);
        debug!("Fetching repo info from {}...", url);
        self.http_client
            .get_json(&url)
            .await
            .with_context(|| format!("Failed to fetch repository info for {}", repo))
    }

    #[tracing::instrument(skip(self))]
    async fn merge_upstream(&self, repo: &GitHubRepo, branch: &str) -> Result<MergeUpstream> {
        let url = format!("{}/merge-upstream", self.repo_url(repo));
        debug!("Merging upstream into {}:{} via {}...", repo, branch, url);
        self.http_client
            .send_json(Method::POST, &url, &json!({ "branch": branch }))
            .await
            .with_context(|| format!("Failed to merge upstream into {}:{}", repo, branch))
    }

    #[tracing::instrument(skip(self))]
    async fn get_commit(&self, repo: &GitHubRepo, reference: &str) -> Result<Commit> {
        let url = format!("{}/commits/{}", self.repo_url(repo), reference);
        debug!("Fetching commit from {}...", url);
        self.http_client
            .get_json(&url)
            .await
            .with_context(|| format!("Failed to fetch commit {} of {}", reference, repo))
    }

    #[tracing::instrument(skip(self))]
    async fn dispatch_workflow(
        &self,
        repo: &GitHubRepo,
        workflow: &str,
        reference: &str,
    ) -> Result<()> {
        let url = format!(
            "{}/actions/workflows/{}/dispatches",
            self.repo_url(repo),
            workflow
        );
        debug!("Dispatching workflow via {}...", url);
        self.http_client
            .send_json_no_content(Method::POST, &url, &json!({ "ref": reference }))
            .await
            .with_context(|| format!("Failed to dispatch workflow {} on {}", workflow, repo))
    }

    #[tracing::instrument(skip(self))]
    async fn list_open_issues(&self, repo: &GitHubRepo) -> Result<Vec<Issue>> {
        let url = format!("{}/issues", self.repo_url(repo));
        let mut issues = Vec::new();
        let mut page = 1;

        while page <= MAX_ISSUE_PAGES {
            debug!("Fetching open issues page {} from {}...", page, url);

            let parsed: Vec<Issue> = self
                .http_client
                .get_json_with_query(
                    &url,
                    &[
                        ("state", "open"),
                        ("per_page", "100"),
                        ("page", &page.to_string()),
                    ],
                )
                .await
                .with_context(|| format!("Failed to list open issues of {}", repo))?;

            let len = parsed.len();
            issues.extend(parsed.into_iter().filter(|issue| !issue.is_pull_request()));

            if len < 100 {
                break;
            }

            page += 1;
        }

        Ok(issues)
    }

    #[tracing::instrument(skip(self, body))]
    async fn create_issue(&self, repo: &GitHubRepo, title: &str, body: &str) -> Result<Issue> {
        let url = format!("{}/issues", self.repo_url(repo));
        debug!("Creating issue via {}...", url);
        self.http_client
            .send_json(Method::POST, &url, &json!({ "title": title, "body": body }))
            .await
            .with_context(|| format!("Failed to create issue on {}", repo))
    }

    #[tracing::instrument(skip(self, body))]
    async fn update_issue_body(
        &self,
        repo: &GitHubRepo,
        number: u64,
        body: &str,
    ) -> Result<Issue> {
        let url = format!("{}/issues/{}", self.repo_url(repo), number);
        debug!("Updating issue via {}...", url);
        self.http_client
            .send_json(Method::PATCH, &url, &json!({ "body": body }))
            .await
            .with_context(|| format!("Failed to update issue #{} on {}", number, repo))
    }
}
