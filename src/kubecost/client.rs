//! HTTP client for the Kubecost REST API
//!
//! One method per remote endpoint. No retries, caching or pagination:
//! failures from everything except [`KubecostClient::health_check`] are
//! returned to the caller unchanged. Response bodies come back as raw JSON
//! so every field the server sends reaches the caller untouched.

use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response};
use serde_json::Value;
use url::Url;

use crate::config::{Auth, KubecostConfig};

use super::types::{AllocationQuery, AssetQuery, BudgetRule};

const BUDGET_PATH: &[&str] = &["model", "budget"];
const ALLOCATION_PATH: &[&str] = &["model", "allocation"];
const ASSETS_PATH: &[&str] = &["model", "assets"];
const HEALTH_PATH: &[&str] = &["healthz"];

/// Errors from Kubecost API calls
#[derive(Debug, thiserror::Error)]
pub enum KubecostError {
    /// Connection failure, timeout, non-2xx status or undecodable body
    #[error(transparent)]
    Request(#[from] reqwest::Error),

    #[error("Invalid authorization header: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Cannot build endpoint URL from base '{0}'")]
    InvalidEndpoint(String),
}

/// Kubecost API client
#[derive(Debug, Clone)]
pub struct KubecostClient {
    http: reqwest::Client,
    base_url: Url,
}

impl KubecostClient {
    /// Build a client with the configured timeout and auth applied to every request
    pub fn new(config: &KubecostConfig) -> Result<Self, KubecostError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(AUTHORIZATION, authorization_header(&config.auth)?);

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
        })
    }

    /// Append path segments to the base URL's path (segments are percent-encoded)
    fn endpoint(&self, segments: &[&str]) -> Result<Url, KubecostError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| KubecostError::InvalidEndpoint(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        tracing::debug!(method = %method, url = %url, "Kubecost request");
        self.http.request(method, url)
    }

    /// Send, log the status and reject non-2xx responses
    async fn send(&self, request: RequestBuilder) -> Result<Response, KubecostError> {
        let response = request.send().await?;
        tracing::debug!(status = %response.status(), "Kubecost response");
        Ok(response.error_for_status()?)
    }

    async fn send_json(&self, request: RequestBuilder) -> Result<Value, KubecostError> {
        let response = self.send(request).await?;
        Ok(response.json::<Value>().await?)
    }

    // ------------------------------------------------------------------------
    // Budgets
    // ------------------------------------------------------------------------

    /// Create a budget rule, or update it when `rule.id` is set
    pub async fn create_or_update_budget(&self, rule: &BudgetRule) -> Result<Value, KubecostError> {
        let url = self.endpoint(BUDGET_PATH)?;
        self.send_json(self.request(Method::POST, url).json(rule)).await
    }

    pub async fn get_budget(&self, budget_id: &str) -> Result<Value, KubecostError> {
        let url = self.budget_url(budget_id)?;
        self.send_json(self.request(Method::GET, url)).await
    }

    pub async fn list_budgets(&self) -> Result<Value, KubecostError> {
        let url = self.endpoint(BUDGET_PATH)?;
        self.send_json(self.request(Method::GET, url)).await
    }

    pub async fn delete_budget(&self, budget_id: &str) -> Result<(), KubecostError> {
        let url = self.budget_url(budget_id)?;
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    fn budget_url(&self, budget_id: &str) -> Result<Url, KubecostError> {
        let mut segments = BUDGET_PATH.to_vec();
        segments.push(budget_id);
        self.endpoint(&segments)
    }

    // ------------------------------------------------------------------------
    // Reports
    // ------------------------------------------------------------------------

    pub async fn get_cost_allocation(&self, query: &AllocationQuery) -> Result<Value, KubecostError> {
        let url = self.endpoint(ALLOCATION_PATH)?;
        self.send_json(self.request(Method::GET, url).query(&query.query_pairs())).await
    }

    pub async fn get_assets(&self, query: &AssetQuery) -> Result<Value, KubecostError> {
        let url = self.endpoint(ASSETS_PATH)?;
        self.send_json(self.request(Method::GET, url).query(&query.query_pairs())).await
    }

    /// True if `/healthz` answers with a success status. Never errors.
    pub async fn health_check(&self) -> bool {
        let url = match self.endpoint(HEALTH_PATH) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!(error = %e, "Health check failed");
                return false;
            }
        };

        match self.send(self.request(Method::GET, url)).await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(error = %e, "Health check failed");
                false
            }
        }
    }
}

fn authorization_header(auth: &Auth) -> Result<HeaderValue, KubecostError> {
    let raw = match auth {
        Auth::Bearer { token } => format!("Bearer {}", token),
        Auth::Basic { username, password } => {
            let encoded = base64::engine::general_purpose::STANDARD
                .encode(format!("{}:{}", username, password));
            format!("Basic {}", encoded)
        }
    };

    let mut value = HeaderValue::from_str(&raw)?;
    value.set_sensitive(true);
    Ok(value)
}
