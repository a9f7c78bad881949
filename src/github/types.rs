use serde::{Deserialize, Serialize};

/// Repository information from `GET /repos/{owner}/{repo}`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct RepoInfo {
    pub full_name: String,
    pub default_branch: String,
    #[serde(default)]
    pub fork: bool,
    /// Present only for forks.
    #[serde(default)]
    pub parent: Option<ParentRepo>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ParentRepo {
    pub full_name: String,
    pub default_branch: String,
}

/// Response of `POST /repos/{owner}/{repo}/merge-upstream`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct MergeUpstream {
    #[serde(default)]
    pub message: String,
    /// `"fast-forward"`, `"merge"` or `"none"`.
    #[serde(default)]
    pub merge_type: Option<String>,
    #[serde(default)]
    pub base_branch: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Commit {
    pub sha: String,
    pub html_url: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    /// The issues API also returns pull requests; they carry this key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<serde_json::Value>,
}

impl Issue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    pub fn body_text(&self) -> &str {
        self.body.as_deref().unwrap_or_default()
    }
}
