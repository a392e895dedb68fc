//! VulnCheck Client Core Library
//!
//! This is the core library for the VulnCheck client, providing token-cached
//! authentication, batched lookup orchestration, and result assembly against
//! the VulnCheck threat-intelligence API.
//!
//! ```no_run
//! use vulncheck_client_core::{ClientConfig, Entity, VulnCheckClient};
//!
//! # async fn run() -> vulncheck_client_core::Result<()> {
//! let config = ClientConfig {
//!     api_key: "vulncheck_secret".to_string(),
//!     ..ClientConfig::default()
//! };
//! let client = VulnCheckClient::new(config)?;
//! let results = client.lookup(&[Entity::cve("CVE-2023-0001")]).await?;
//! for result in results {
//!     if let Some(data) = result.data {
//!         println!("{}: {}", result.entity.value, data.summary.join(", "));
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod assemble;
pub mod auth;
pub mod batch;
pub mod correlate;
pub mod cpe;
pub mod entity;
pub mod error;
pub mod json_path;
pub mod queries;
pub mod request;
pub mod summary;

// Re-export main types
pub use api::VulnCheckClient;
pub use assemble::{CveDetails, LookupData, LookupDetails, LookupResult};
pub use auth::{AuthToken, Secret, TokenCache};
pub use batch::{AggregatedResult, BatchOptions, DEFAULT_CONCURRENCY_LIMIT, run_batch};
pub use entity::{Entity, EntityType};
pub use error::{Error, ErrorPayload, Result};
pub use request::{RawResult, RequestDescriptor, RequestExecutor};

/// User agent sent with every API request
pub const USER_AGENT: &str = concat!("vulncheck-client-rs-v", env!("CARGO_PKG_VERSION"));

/// Production API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.vulncheck.com";

/// Core client configuration
#[derive(Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub premium_api: bool,
    pub max_concurrent_lookups: usize,
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            premium_api: false,
            max_concurrent_lookups: DEFAULT_CONCURRENCY_LIMIT,
            request_timeout_secs: 30,
        }
    }
}

impl ClientConfig {
    /// Create a test configuration
    pub fn test() -> Self {
        Self {
            base_url: "http://127.0.0.1:9".to_string(),
            api_key: "test-secret-key".to_string(),
            premium_api: false,
            max_concurrent_lookups: 4,
            request_timeout_secs: 5,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::configuration("Base URL must not be empty"));
        }
        if self.api_key.trim().is_empty() {
            return Err(Error::configuration(
                "An API key is required; set one with `vulncheck config set client.api_key <key>`",
            ));
        }
        if self.max_concurrent_lookups == 0 {
            return Err(Error::configuration(
                "Concurrent lookup limit must be at least 1",
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::configuration(
                "Request timeout must be at least 1 second",
            ));
        }
        Ok(())
    }
}

// The API key never appears in debug output.
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("premium_api", &self.premium_api)
            .field("max_concurrent_lookups", &self.max_concurrent_lookups)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}
