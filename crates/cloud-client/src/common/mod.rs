//! Common utilities for the provisioning gateway client
//!
//! Provides shared functionality used across all API modules: URL building,
//! authentication headers, status-code normalization and pagination.

pub mod query;

use crate::error::CloudError;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Marker-paginated response wrapper from the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub next_marker: Option<String>,
}

/// HTTP client wrapper with authentication and region routing
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: String,
    region: String,
}

impl HttpClient {
    /// Create a new HTTP client wrapper
    pub fn new(client: Client, base_url: String, token: String, region: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            region,
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the region requests are routed to
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Build a full URL from a path
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    /// Get authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Get the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = self.build_url(path);
        debug!("{} {}", method, url);
        self.client
            .request(method, &url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .header("X-Region", &self.region)
            .header("X-Request-Id", uuid::Uuid::new_v4().to_string())
    }

    /// Map a non-success response onto the normalized error taxonomy
    async fn error_for_status(method: &str, path: &str, response: Response) -> CloudError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = format!("{} {} failed: {} - {}", method, path, status, body);
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CloudError::PermissionDenied(message),
            StatusCode::NOT_FOUND => CloudError::NotFound(message),
            StatusCode::CONFLICT => CloudError::conflict(path, body),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => CloudError::InvalidRequest(message),
            StatusCode::TOO_MANY_REQUESTS => CloudError::Unavailable(message),
            s if s.is_server_error() => CloudError::Unavailable(message),
            _ => CloudError::Api(message),
        }
    }

    fn transport_error(e: reqwest::Error) -> CloudError {
        if e.is_timeout() || e.is_connect() {
            CloudError::Unavailable(e.to_string())
        } else {
            CloudError::Http(e)
        }
    }

    async fn decode<T: for<'de> Deserialize<'de>>(path: &str, response: Response) -> Result<T, CloudError> {
        let response_text = response.text().await?;
        serde_json::from_str(&response_text).map_err(|e| {
            CloudError::Api(format!(
                "error decoding response body for {}: {} - Response (first 500 chars): {}",
                path,
                e,
                response_text.chars().take(500).collect::<String>()
            ))
        })
    }

    /// Make a GET request
    pub async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, CloudError> {
        let response = self
            .request(reqwest::Method::GET, path)
            .send()
            .await
            .map_err(Self::transport_error)?;

        if !response.status().is_success() {
            return Err(Self::error_for_status("GET", path, response).await);
        }
        Self::decode(path, response).await
    }

    /// Make a GET request, mapping 404 to `Ok(None)`
    pub async fn get_optional<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<Option<T>, CloudError> {
        match self.get(path).await {
            Ok(value) => Ok(Some(value)),
            Err(CloudError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Make a POST request
    pub async fn post<B: Serialize + ?Sized, T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, CloudError> {
        let response = self
            .request(reqwest::Method::POST, path)
            .json(body)
            .send()
            .await
            .map_err(Self::transport_error)?;

        if !response.status().is_success() {
            return Err(Self::error_for_status("POST", path, response).await);
        }
        Self::decode(path, response).await
    }

    /// Make a PUT request
    pub async fn put<B: Serialize + ?Sized, T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, CloudError> {
        let response = self
            .request(reqwest::Method::PUT, path)
            .json(body)
            .send()
            .await
            .map_err(Self::transport_error)?;

        if !response.status().is_success() {
            return Err(Self::error_for_status("PUT", path, response).await);
        }
        Self::decode(path, response).await
    }

    /// Make a PUT request whose response carries no body
    pub async fn put_no_content<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), CloudError> {
        let response = self
            .request(reqwest::Method::PUT, path)
            .json(body)
            .send()
            .await
            .map_err(Self::transport_error)?;

        if !response.status().is_success() {
            return Err(Self::error_for_status("PUT", path, response).await);
        }
        Ok(())
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str) -> Result<(), CloudError> {
        let response = self
            .request(reqwest::Method::DELETE, path)
            .send()
            .await
            .map_err(Self::transport_error)?;

        if !response.status().is_success() {
            return Err(Self::error_for_status("DELETE", path, response).await);
        }
        Ok(())
    }

    /// Fetch all pages of a marker-paginated listing
    pub async fn fetch_all_pages<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<Vec<T>, CloudError> {
        let mut all_results = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let page_path = match &marker {
                Some(m) => query::with_query(path, &[("Marker", m.as_str())]),
                None => path.to_string(),
            };
            debug!("Fetching page: {}", page_path);

            let page: PaginatedResponse<T> = self.get(&page_path).await?;
            all_results.extend(page.items);

            match page.next_marker {
                Some(next) if !next.is_empty() => marker = Some(next),
                _ => break,
            }
        }

        Ok(all_results)
    }
}
