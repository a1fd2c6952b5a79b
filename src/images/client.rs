//! HTTP client for an OpenAI-compatible image generation API

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{Portrait, PortraitError, PortraitGenerator};
use crate::config::ImageConfig;

/// Image generation request
#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: &'a str,
    response_format: &'a str,
}

/// Image generation response
#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    #[serde(default)]
    b64_json: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

/// Token bucket per requester
#[derive(Debug)]
pub struct RateLimiter {
    /// key -> (tokens, last_refill)
    buckets: RwLock<HashMap<String, (f32, Instant)>>,
    max_tokens: f32,
    /// Tokens per second
    refill_rate: f32,
}

impl RateLimiter {
    pub fn per_minute(requests: u32) -> Self {
        let max_tokens = requests.max(1) as f32;
        Self {
            buckets: RwLock::new(HashMap::new()),
            max_tokens,
            refill_rate: max_tokens / 60.0,
        }
    }

    /// Take a token; false when the bucket is empty
    pub async fn consume(&self, key: &str) -> bool {
        let mut buckets = self.buckets.write().await;
        let now = Instant::now();

        let (tokens, last_refill) = buckets
            .entry(key.to_string())
            .or_insert((self.max_tokens, now));

        let elapsed = now.duration_since(*last_refill).as_secs_f32();
        let refilled = (*tokens + elapsed * self.refill_rate).min(self.max_tokens);
        *last_refill = now;

        if refilled >= 1.0 {
            *tokens = refilled - 1.0;
            true
        } else {
            *tokens = refilled;
            false
        }
    }
}

/// Image API client
#[derive(Debug)]
pub struct ImageClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    size: String,
    rate_limiter: RateLimiter,
}

impl ImageClient {
    pub fn new(config: &ImageConfig) -> Result<Self, PortraitError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            base_url: config.api_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            size: config.size.clone(),
            rate_limiter: RateLimiter::per_minute(config.requests_per_minute),
        })
    }

    /// Check if API key is configured
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Fetch an image the API returned by URL
    async fn download(&self, url: &str) -> Result<Portrait, PortraitError> {
        debug!("Downloading image from: {}", url);
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(PortraitError::Api(format!(
                "download failed: {}",
                response.status()
            )));
        }

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/png")
            .to_string();
        let data = response.bytes().await?.to_vec();

        Ok(Portrait { data, mime_type })
    }
}

#[async_trait]
impl PortraitGenerator for ImageClient {
    async fn generate(&self, key: &str, prompt: &str) -> Result<Portrait, PortraitError> {
        let api_key = self.api_key.as_ref().ok_or(PortraitError::NotConfigured)?;

        if !self.rate_limiter.consume(key).await {
            return Err(PortraitError::RateLimited(key.to_string()));
        }

        let request = ImageRequest {
            model: &self.model,
            prompt,
            n: 1,
            size: &self.size,
            response_format: "b64_json",
        };

        info!("Requesting portrait for {} from {}", key, self.model);

        let response = self
            .client
            .post(format!("{}/images/generations", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Image API error: {} - {}", status, body);
            return Err(PortraitError::Api(status.to_string()));
        }

        let image: ImageResponse = response.json().await?;
        let first = image.data.into_iter().next().ok_or(PortraitError::Empty)?;

        match (first.b64_json, first.url) {
            (Some(b64), _) => Ok(Portrait {
                data: BASE64.decode(b64)?,
                mime_type: "image/png".to_string(),
            }),
            (None, Some(url)) => self.download(&url).await,
            (None, None) => Err(PortraitError::Empty),
        }
    }
}
