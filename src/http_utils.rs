use handled::Handle;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;

use crate::cli_utils;
use crate::commands::errors::{HttpOperationError, UserError};

/// Read-only client for the equide HTTP API.
pub struct EquideClient {
    client: Client,
    base_url: String,
}

impl EquideClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Constructs a full API URL from path segments, escaping each one.
    ///
    /// Horse names carry spaces and apostrophes, so they are never spliced into the path raw.
    pub fn api_url(&self, segments: &[&str]) -> Result<Url, HttpOperationError> {
        let mut url = Url::parse(&format!("{}/api/v1", self.base_url))
            .map_err(|e| HttpOperationError::new("build request URL", &e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| {
                HttpOperationError::new("build request URL", "base URL cannot have a path")
            })?
            .extend(segments);
        Ok(url)
    }

    /// Makes a GET request with query parameters and handles the response
    pub async fn get<T>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
        operation: &str,
    ) -> Result<T, HttpOperationError>
    where
        T: DeserializeOwned,
    {
        let url = self.api_url(segments)?;
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| HttpOperationError::new(operation, &e.to_string()))?;
        self.handle_response(response, operation).await
    }

    /// Handles HTTP response, deserializing success or returning error
    async fn handle_response<T>(
        &self,
        response: Response,
        operation: &str,
    ) -> Result<T, HttpOperationError>
    where
        T: DeserializeOwned,
    {
        if response.status().is_success() {
            response
                .json()
                .await
                .map_err(|e| HttpOperationError::new(operation, &e.to_string()))
        } else {
            Err(HttpOperationError::from_response(response, operation).await)
        }
    }
}

/// Execute an HTTP operation and exit on error with formatted message
pub async fn execute_or_exit<T, F, Fut>(operation: F) -> T
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, HttpOperationError>>,
{
    match operation().await {
        Ok(result) => result,
        Err(e) => match e.handle() {
            Some(UserError {
                message,
                usage_hint: Some(hint),
            }) => cli_utils::exit_with_usage_error(&message, &hint),
            Some(UserError { message, .. }) => cli_utils::exit_with_error(&message),
            None => cli_utils::exit_with_error(&e.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_urls_escape_segments() {
        let client = EquideClient::new("http://localhost:8080/".to_string());
        assert_eq!(
            client.api_url(&["genealogy", "JAG DE BELLOUET"]).unwrap().as_str(),
            "http://localhost:8080/api/v1/genealogy/JAG%20DE%20BELLOUET"
        );
        assert_eq!(
            client.api_url(&["horse", "3"]).unwrap().as_str(),
            "http://localhost:8080/api/v1/horse/3"
        );
        assert_eq!(
            client.api_url(&["stats", "A/B"]).unwrap().as_str(),
            "http://localhost:8080/api/v1/stats/A%2FB"
        );
    }
}
