use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::Deserialize;
use serde_json::Value;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const API_URL_VAR: &str = "CATALOG_API_URL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Movies,
    Actors,
}

impl Resource {
    pub fn path(&self) -> &'static str {
        match self {
            Resource::Movies => "/movies",
            Resource::Actors => "/actors",
        }
    }

    pub fn singular(&self) -> &'static str {
        match self {
            Resource::Movies => "movie",
            Resource::Actors => "actor",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path()[1..])
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    // No response was received.
    #[error("request failed: {0}")]
    Transport(String),
    #[error("server answered {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Status { status: u16, detail: Option<String> },
    #[error("JSON parse failed: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Conflict,
    BadRequest,
    NotFound,
    Server,
    Connectivity,
}

impl ApiError {
    pub fn failure(&self) -> Failure {
        match self {
            ApiError::Transport(_) => Failure::Connectivity,
            ApiError::Status { status: 409, .. } => Failure::Conflict,
            ApiError::Status { status: 400, .. } => Failure::BadRequest,
            ApiError::Status { status: 404, .. } => Failure::NotFound,
            ApiError::Status { .. } | ApiError::Decode(_) => Failure::Server,
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}

#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn list(&self, resource: Resource) -> Result<Value, ApiError>;
    async fn get(&self, resource: Resource, id: i64) -> Result<Value, ApiError>;
    async fn create(&self, resource: Resource, body: Value) -> Result<Value, ApiError>;
    async fn update(&self, resource: Resource, id: i64, body: Value) -> Result<Value, ApiError>;
    async fn delete(&self, resource: Resource, id: i64) -> Result<Value, ApiError>;
    async fn batch_delete(&self, resource: Resource, ids: &[i64]) -> Result<Value, ApiError>;
    async fn cast(&self, movie_id: i64) -> Result<Value, ApiError>;
}

#[derive(Debug, Clone)]
pub struct HttpCatalog {
    client: Client,
    base_url: String,
}

impl HttpCatalog {
    pub fn from_env() -> Result<Self> {
        let base_url = env::var(API_URL_VAR).with_context(|| format!("{API_URL_VAR} not set"))?;
        Self::new(&base_url)
    }

    pub fn new(base_url: &str) -> Result<Self> {
        Url::parse(base_url).with_context(|| format!("Invalid catalog URL '{base_url}'"))?;
        let user_agent = format!("cinecatalog/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .user_agent(user_agent)
            .build()
            .context("Failed to build catalog HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn item_url(&self, resource: Resource, id: i64) -> String {
        self.url(&format!("{}/{id}", resource.path()))
    }

    async fn send_json(&self, request: RequestBuilder) -> Result<Value, ApiError> {
        let res = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        debug!(status = status.as_u16(), "Catalog response received");

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                detail: parse_detail(&text),
            });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl CatalogApi for HttpCatalog {
    async fn list(&self, resource: Resource) -> Result<Value, ApiError> {
        let url = self.url(resource.path());
        debug!("GET {}", url);
        self.send_json(self.client.get(&url)).await
    }

    async fn get(&self, resource: Resource, id: i64) -> Result<Value, ApiError> {
        let url = self.item_url(resource, id);
        debug!("GET {}", url);
        self.send_json(self.client.get(&url)).await
    }

    async fn create(&self, resource: Resource, body: Value) -> Result<Value, ApiError> {
        let url = self.url(resource.path());
        debug!("POST {}", url);
        self.send_json(self.client.post(&url).json(&body)).await
    }

    async fn update(&self, resource: Resource, id: i64, body: Value) -> Result<Value, ApiError> {
        let url = self.item_url(resource, id);
        debug!("PUT {}", url);
        self.send_json(self.client.put(&url).json(&body)).await
    }

    async fn delete(&self, resource: Resource, id: i64) -> Result<Value, ApiError> {
        let url = self.item_url(resource, id);
        debug!("DELETE {}", url);
        self.send_json(self.client.delete(&url)).await
    }

    async fn batch_delete(&self, resource: Resource, ids: &[i64]) -> Result<Value, ApiError> {
        let url = self.url(&format!("{}/batch", resource.path()));
        debug!(count = ids.len(), "DELETE {}", url);
        self.send_json(self.client.delete(&url).json(ids)).await
    }

    async fn cast(&self, movie_id: i64) -> Result<Value, ApiError> {
        let url = self.url(&format!("{}/{movie_id}/actors", Resource::Movies.path()));
        debug!("GET {}", url);
        self.send_json(self.client.get(&url)).await
    }
}

// Non-string details are kept as JSON text.
fn parse_detail(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        detail: Option<Value>,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail? {
        Value::String(s) => Some(s),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_status_codes() {
        let status = |code| ApiError::Status {
            status: code,
            detail: None,
        };
        assert_eq!(status(409).failure(), Failure::Conflict);
        assert_eq!(status(400).failure(), Failure::BadRequest);
        assert_eq!(status(404).failure(), Failure::NotFound);
        assert_eq!(status(500).failure(), Failure::Server);
        assert_eq!(status(422).failure(), Failure::Server);
        assert_eq!(
            ApiError::Transport("connection refused".to_string()).failure(),
            Failure::Connectivity
        );
        assert_eq!(ApiError::Decode("eof".to_string()).failure(), Failure::Server);
    }

    #[test]
    fn extracts_detail_from_error_bodies() {
        assert_eq!(
            parse_detail(r#"{"detail":"Movie already exists!"}"#).as_deref(),
            Some("Movie already exists!")
        );
        assert_eq!(
            parse_detail(r#"{"detail":[{"loc":["body"]}]}"#).as_deref(),
            Some(r#"[{"loc":["body"]}]"#)
        );
        assert_eq!(parse_detail("Internal Server Error"), None);
        assert_eq!(parse_detail(r#"{"message":"x"}"#), None);
    }

    #[test]
    fn builds_urls_without_double_slash() {
        let catalog = HttpCatalog::new("http://localhost:8000/").expect("client");
        assert_eq!(catalog.base_url(), "http://localhost:8000");
        assert_eq!(
            catalog.item_url(Resource::Actors, 7),
            "http://localhost:8000/actors/7"
        );
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(HttpCatalog::new("not a url").is_err());
    }
}
