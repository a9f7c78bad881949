//! Error type for unsuccessful API responses.

use reqwest::{Method, Response, StatusCode};
use serde::Deserialize;

/// An HTTP response with a non-success status.
///
/// Carried inside `anyhow::Error`; callers recover it with `downcast_ref`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub method: Method,
    pub url: String,
    pub status: StatusCode,
    pub message: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl ApiError {
    /// Consumes a failed response, extracting GitHub's `message` field when present.
    pub async fn from_response(method: Method, url: &str, response: Response) -> Self {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => body.message,
            Err(_) => text.trim().to_string(),
        };

        Self {
            method,
            url: url.to_string(),
            status,
            message,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.status == StatusCode::CONFLICT
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} failed with HTTP {}", self.method, self.url, self.status.as_u16())?;
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if self.status == StatusCode::UNAUTHORIZED {
            write!(f, ". Check your GITHUB_TOKEN.")?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

/// Returns true if `error` wraps an [`ApiError`] with HTTP 409.
pub fn is_conflict(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<ApiError>()
        .is_some_and(ApiError::is_conflict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    fn api_error(status: StatusCode, message: &str) -> ApiError {
        ApiError {
            method: Method::POST,
            url: "https://api.github.com/repos/o/r/merge-upstream".to_string(),
            status,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_api_error_display() {
        let err = api_error(StatusCode::CONFLICT, "Merge conflict");
        assert_eq!(
            err.to_string(),
            "POST https://api.github.com/repos/o/r/merge-upstream failed with HTTP 409: Merge conflict"
        );

        let err = api_error(StatusCode::UNAUTHORIZED, "Bad credentials");
        assert!(err.to_string().contains("GITHUB_TOKEN"));

        let err = api_error(StatusCode::BAD_GATEWAY, "");
        assert!(err.to_string().ends_with("HTTP 502"));
    }

    #[test]
    fn test_is_conflict() {
        let err = anyhow::Error::from(api_error(StatusCode::CONFLICT, "conflict"));
        assert!(is_conflict(&err));

        let err = anyhow::Error::from(api_error(StatusCode::UNPROCESSABLE_ENTITY, "nope"));
        assert!(!is_conflict(&err));

        let err = anyhow::anyhow!("connection reset by peer");
        assert!(!is_conflict(&err));
    }

    #[test]
    fn test_is_conflict_through_context() {
        let result: anyhow::Result<()> =
            Err(api_error(StatusCode::CONFLICT, "conflict")).context("Failed to merge upstream");
        assert!(is_conflict(&result.unwrap_err()));
    }

    #[tokio::test]
    async fn test_from_response_reads_github_message() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/merge")
            .with_status(409)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message": "There are merge conflicts", "documentation_url": "x"}"#)
            .create_async()
            .await;

        let url = format!("{}/merge", server.url());
        let response = reqwest::Client::new().post(&url).send().await.unwrap();
        let err = ApiError::from_response(Method::POST, &url, response).await;

        assert!(err.is_conflict());
        assert_eq!(err.message, "There are merge conflicts");
    }

    #[tokio::test]
    async fn test_from_response_plain_text_body() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/broken")
            .with_status(500)
            .with_body("upstream exploded\n")
            .create_async()
            .await;

        let url = format!("{}/broken", server.url());
        let response = reqwest::Client::new().get(&url).send().await.unwrap();
        let err = ApiError::from_response(Method::GET, &url, response).await;

        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "upstream exploded");
    }
}
