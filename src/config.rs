use anyhow::Result;
use log::debug;
use reqwest::{
    Client,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue},
};

use crate::{github::GitHub, runtime::Runtime};

pub const USER_AGENT: &str = concat!("forksync/", env!("FORKSYNC_VERSION"));

pub struct Config<R: Runtime> {
    pub runtime: R,
    pub github: GitHub,
}

impl<R: Runtime> Config<R> {
    pub fn new(runtime: R, api_url: Option<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );

        match runtime.env_var("GITHUB_TOKEN") {
            Ok(token) if !token.trim().is_empty() => {
                let token = token.trim();
                let mut auth_value = HeaderValue::from_str(&format!("Bearer {}", token))?;
                auth_value.set_sensitive(true);
                headers.insert(AUTHORIZATION, auth_value);
                debug!("Using GITHUB_TOKEN for authentication: {}", mask_token(token));
            }
            _ => debug!("GITHUB_TOKEN not set, sending unauthenticated requests"),
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        let github = GitHub::new(client, api_url);

        Ok(Self { runtime, github })
    }
}

/// First four and last four characters, or all stars for short tokens.
fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}*********{}", head, tail)
}
