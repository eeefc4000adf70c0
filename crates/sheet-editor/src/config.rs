//! Editor configuration
//!
//! Loaded from TOML; every field is optional and falls back to
//! [`EditorConfig::default`].

use crate::error::EditorError;
use serde::{Deserialize, Serialize};
use sheet_client::{ClientConfig, ClientError};
use std::path::Path;
use std::time::Duration;

/// Editor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Server root URL
    pub base_url: String,
    /// User identity sent with every request
    pub identity: String,
    /// Quiet period before a preview is sent, in milliseconds
    pub preview_delay_ms: u64,
    /// Quiet period before the share query is published, in milliseconds
    pub share_delay_ms: u64,
    /// Lease heartbeat and poll period in seconds
    pub heartbeat_secs: u64,
    /// Undo steps kept; 0 keeps everything
    pub history_depth: usize,
    /// Save attempts, the first one included
    pub save_attempts: usize,
    /// First delay between save attempts, in milliseconds
    pub save_backoff_ms: u64,
    /// Offset of a duplicate from its original
    pub duplicate_offset: (f64, f64),
    /// Per request timeout in seconds
    pub request_timeout_secs: u64,
}

impl EditorConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML
    ///
    /// # Errors
    /// - `EditorError::Config` for malformed TOML or mistyped fields
    pub fn from_toml_str(text: &str) -> Result<Self, EditorError> {
        toml::from_str(text).map_err(|e| EditorError::Config(e.to_string()))
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// - `EditorError::Config` when the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, EditorError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| EditorError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// With server root
    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// With user identity
    #[inline]
    #[must_use]
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }

    /// With preview quiet period
    #[inline]
    #[must_use]
    pub fn with_preview_delay(mut self, delay: Duration) -> Self {
        self.preview_delay_ms = millis(delay);
        self
    }

    /// With lease heartbeat period
    #[inline]
    #[must_use]
    pub fn with_heartbeat(mut self, period: Duration) -> Self {
        self.heartbeat_secs = period.as_secs().max(1);
        self
    }

    /// With history depth
    #[inline]
    #[must_use]
    pub fn with_history_depth(mut self, depth: usize) -> Self {
        self.history_depth = depth;
        self
    }

    /// With save attempts and first backoff delay
    #[inline]
    #[must_use]
    pub fn with_save_retry(mut self, attempts: usize, backoff: Duration) -> Self {
        self.save_attempts = attempts.max(1);
        self.save_backoff_ms = millis(backoff);
        self
    }

    /// Preview quiet period
    #[must_use]
    pub fn preview_delay(&self) -> Duration {
        Duration::from_millis(self.preview_delay_ms)
    }

    /// Share quiet period
    #[must_use]
    pub fn share_delay(&self) -> Duration {
        Duration::from_millis(self.share_delay_ms)
    }

    /// Lease heartbeat period
    #[must_use]
    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs.max(1))
    }

    /// First delay between save attempts
    #[must_use]
    pub fn save_backoff(&self) -> Duration {
        Duration::from_millis(self.save_backoff_ms)
    }

    /// HTTP client settings
    ///
    /// # Errors
    /// - `ClientError::Url` when the base URL does not parse
    pub fn client_config(&self) -> Result<ClientConfig, ClientError> {
        Ok(ClientConfig::new(&self.base_url, self.identity.clone())?
            .with_timeout(Duration::from_secs(self.request_timeout_secs)))
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/".to_string(),
            identity: "anonymous".to_string(),
            preview_delay_ms: 50,
            share_delay_ms: 500,
            heartbeat_secs: 10,
            history_depth: 100,
            save_attempts: 3,
            save_backoff_ms: 200,
            duplicate_offset: (40.0, 40.0),
            request_timeout_secs: 30,
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
