//! HTTP client with uniform status handling for JSON APIs.

use anyhow::{Context, Result};
use log::debug;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::error::ApiError;

/// Thin wrapper over `reqwest::Client` that turns non-success statuses into [`ApiError`].
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Returns a reference to the underlying reqwest Client.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Performs a GET request and deserializes the JSON response.
    #[tracing::instrument(skip(self))]
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.get_json_with_query(url, &[]).await
    }

    /// Performs a GET request with query parameters and deserializes the JSON response.
    #[tracing::instrument(skip(self, query))]
    pub async fn get_json_with_query<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        debug!("GET JSON from {} with query {:?}...", url, query);

        let request = self.client.get(url).query(query);
        let response = self.execute(Method::GET, url, request).await?;

        response
            .json::<T>()
            .await
            .context("Failed to parse JSON response")
    }

    /// Sends a JSON body and deserializes the JSON response.
    #[tracing::instrument(skip(self, body))]
    pub async fn send_json<B, T>(&self, method: Method, url: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        debug!("{} JSON to {}...", method, url);

        let request = self.client.request(method.clone(), url).json(body);
        let response = self.execute(method, url, request).await?;

        response
            .json::<T>()
            .await
            .context("Failed to parse JSON response")
    }

    /// Sends a JSON body to an endpoint that answers without content (e.g. 204).
    #[tracing::instrument(skip(self, body))]
    pub async fn send_json_no_content<B>(&self, method: Method, url: &str, body: &B) -> Result<()>
    where
        B: Serialize + ?Sized + Sync,
    {
        debug!("{} JSON to {} (no content expected)...", method, url);

        let request = self.client.request(method.clone(), url).json(body);
        self.execute(method, url, request).await?;
        Ok(())
    }

    async fn execute(&self, method: Method, url: &str, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to send {} request to {}", method, url))?;

        if !response.status().is_success() {
            let err = ApiError::from_response(method, url, response).await;
            debug!("Request failed: {}", err);
            return Err(err.into());
        }

        Ok(response)
    }
}
