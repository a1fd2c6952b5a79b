//! Character portrait generation
//!
//! The sheet engine only contributes the prompt text; this module turns it
//! into image bytes through an external image API.

mod client;

use async_trait::async_trait;
use thiserror::Error;

pub use client::{ImageClient, RateLimiter};

/// A generated image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Portrait {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// Portrait generation errors
#[derive(Debug, Error)]
pub enum PortraitError {
    #[error("image generation not configured")]
    NotConfigured,

    #[error("rate limit exceeded for {0}")]
    RateLimited(String),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("image API error: {0}")]
    Api(String),

    #[error("invalid image payload: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("no image generated")]
    Empty,
}

/// Turns a text prompt into an image
#[async_trait]
pub trait PortraitGenerator: Send + Sync {
    /// `key` identifies the requester for rate limiting
    async fn generate(&self, key: &str, prompt: &str) -> Result<Portrait, PortraitError>;
}
