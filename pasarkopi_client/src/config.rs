use std::time::Duration;

use log::*;

pub const DEFAULT_API_URL: &str = "http://localhost:3000";
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Base URL of the order service, without a trailing slash.
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_API_URL.to_string(), timeout: DEFAULT_API_TIMEOUT }
    }
}

impl StorefrontConfig {
    pub fn new_from_env_or_default() -> Self {
        let base_url = std::env::var("PASAR_API_URL").unwrap_or_else(|_| {
            warn!("🪛️ PASAR_API_URL not set, using {DEFAULT_API_URL} as default");
            DEFAULT_API_URL.to_string()
        });
        let base_url = base_url.trim_end_matches('/').to_string();
        let timeout = std::env::var("PASAR_API_TIMEOUT")
            .ok()
            .map(|raw| match raw.parse::<u64>() {
                Ok(secs) => Duration::from_secs(secs),
                Err(_) => {
                    error!("🪛️ PASAR_API_TIMEOUT ({raw}) is not a number of seconds, using the default");
                    DEFAULT_API_TIMEOUT
                },
            })
            .unwrap_or(DEFAULT_API_TIMEOUT);
        Self { base_url, timeout }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}
