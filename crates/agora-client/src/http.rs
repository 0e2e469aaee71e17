//! HTTP client for the agora review API
//!
//! ## Endpoints
//!
//! | Operation | Request |
//! |-----------|---------|
//! | reviews | `GET /api/agents/{agent}/reviews?sortBy=&limit=&offset=` |
//! | own review | `GET /api/agents/{agent}/reviews/mine` |
//! | create | `POST /api/reviews` |
//! | update | `PUT /api/reviews/{id}` |
//! | delete | `DELETE /api/reviews/{id}` |
//! | helpful | `POST /api/reviews/{id}/helpful` |
//! | moderate | `PUT /api/reviews/{id}/status` |
//!
//! ## Authentication
//! - Header: `Authorization: Bearer {AGORA_API_TOKEN}`

use agora_core::config::{get_config, get_config_opt};
use agora_core::{
    AgentId, CreateReviewInput, DeleteResult, ErrorEnvelope, HelpfulRequest, HelpfulVote, Result,
    ReviewApi, ReviewError, ReviewId, ReviewPage, ReviewQuery, ReviewStatus, ReviewView,
    StatusRequest, UpdateReviewInput,
};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";

pub struct HttpReviewApi {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpReviewApi {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ReviewError::unknown(format!("Invalid API URL {}: {}", base_url, e)))?;
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            base_url,
            token: None,
        })
    }

    /// `AGORA_API_URL` and `AGORA_API_TOKEN`
    pub fn from_env() -> Result<Self> {
        let api = Self::new(&get_config("AGORA_API_URL", DEFAULT_BASE_URL))?;
        Ok(match get_config_opt("AGORA_API_TOKEN") {
            Some(token) => api.with_token(token),
            None => api,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ReviewError::unknown(format!("Invalid API URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self.client.request(method, url);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| ReviewError::network(e.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ReviewError::network(e.to_string()))?;
        debug!("Review API responded {} ({} bytes)", status, body.len());
        decode(status, &body)
    }
}

/// Decode a response body, mapping error envelopes back into `ReviewError`
fn decode<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T> {
    if status.is_success() {
        return serde_json::from_slice(body)
            .map_err(|e| ReviewError::unknown(format!("Malformed response: {}", e)));
    }

    match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(envelope) => Err(ReviewError::from_envelope(envelope)),
        Err(_) => Err(ReviewError::unknown(format!(
            "HTTP {}: {}",
            status,
            String::from_utf8_lossy(body)
        ))),
    }
}

#[async_trait]
impl ReviewApi for HttpReviewApi {
    async fn get_reviews(&self, query: &ReviewQuery) -> Result<ReviewPage> {
        let mut url = self.endpoint(&["api", "agents", query.agent_id.as_str(), "reviews"])?;
        url.query_pairs_mut()
            .append_pair("sortBy", query.sort_by.as_str())
            .append_pair("limit", &query.page.limit.to_string())
            .append_pair("offset", &query.page.offset.to_string());
        self.send(self.request(Method::GET, url)).await
    }

    async fn get_user_review(&self, agent_id: &AgentId) -> Result<Option<ReviewView>> {
        let url = self.endpoint(&["api", "agents", agent_id.as_str(), "reviews", "mine"])?;
        self.send(self.request(Method::GET, url)).await
    }

    async fn create_review(&self, input: CreateReviewInput) -> Result<ReviewView> {
        let url = self.endpoint(&["api", "reviews"])?;
        self.send(self.request(Method::POST, url).json(&input)).await
    }

    async fn update_review(&self, id: ReviewId, input: UpdateReviewInput) -> Result<ReviewView> {
        let url = self.endpoint(&["api", "reviews", &id.to_string()])?;
        self.send(self.request(Method::PUT, url).json(&input)).await
    }

    async fn delete_review(&self, id: ReviewId) -> Result<bool> {
        let url = self.endpoint(&["api", "reviews", &id.to_string()])?;
        let result: DeleteResult = self.send(self.request(Method::DELETE, url)).await?;
        Ok(result.success)
    }

    async fn mark_helpful(&self, id: ReviewId, helpful: bool) -> Result<HelpfulVote> {
        let url = self.endpoint(&["api", "reviews", &id.to_string(), "helpful"])?;
        self.send(self.request(Method::POST, url).json(&HelpfulRequest { helpful }))
            .await
    }

    async fn update_review_status(&self, id: ReviewId, status: ReviewStatus) -> Result<ReviewView> {
        let url = self.endpoint(&["api", "reviews", &id.to_string(), "status"])?;
        self.send(self.request(Method::PUT, url).json(&StatusRequest { status }))
            .await
    }
}
