use super::ConfigError;
use crate::rpc::RetryConfig;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// How to reach the Cedar service.
///
/// Durations are stored as integer seconds so the struct deserializes
/// cleanly from TOML; use the accessor methods when a `Duration` is needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Base URL of the service, e.g. `https://cedar.example.com`.
    pub base_url: String,

    /// API credentials sent as `Cedar-Api-User`/`Cedar-Api-Key` headers.
    /// Both or neither must be set.
    pub api_user: Option<String>,
    pub api_key: Option<String>,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Maximum idle connections kept per host.
    pub max_connections: usize,

    /// Idle connection keep-alive in seconds.
    pub keep_alive_secs: u64,

    pub user_agent: String,

    /// Gzip large request bodies (and accept gzip responses).
    pub enable_compression: bool,

    /// Retry policy for transient request failures.
    pub retry: RetryConfig,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_user: None,
            api_key: None,
            timeout_secs: 30,
            connect_timeout_secs: 10,
            max_connections: 10,
            keep_alive_secs: 60,
            user_agent: concat!("cedar-client/", env!("CARGO_PKG_VERSION")).to_string(),
            enable_compression: false,
            retry: RetryConfig::default(),
        }
    }
}

impl ConnectionConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ConnectionConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "must specify a base URL".to_string(),
            ));
        }
        Url::parse(&self.base_url).map_err(|e| {
            ConfigError::InvalidUrl(format!("invalid base URL '{}': {e}", self.base_url))
        })?;

        if self.api_user.is_some() != self.api_key.is_some() {
            return Err(ConfigError::InvalidConfig(
                "API user and API key must be specified together".to_string(),
            ));
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "request timeout must be greater than 0".to_string(),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidConfig(
                "retry max attempts must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    /// Builds the pooled HTTP client both the ingest and read paths share.
    pub(crate) fn http_client(&self) -> Result<Client, ConfigError> {
        let mut builder = ClientBuilder::new()
            .timeout(self.timeout())
            .connect_timeout(self.connect_timeout())
            .pool_max_idle_per_host(self.max_connections)
            .pool_idle_timeout(self.keep_alive())
            .user_agent(&self.user_agent);

        if self.enable_compression {
            builder = builder.gzip(true);
        }

        builder
            .build()
            .map_err(|e| ConfigError::InvalidConfig(format!("failed to build HTTP client: {e}")))
    }

    /// Credential headers for requests to the service; empty when no
    /// credentials are configured.
    pub(crate) fn credential_headers(&self) -> Result<HeaderMap, ConfigError> {
        let mut headers = HeaderMap::new();
        if let (Some(user), Some(key)) = (&self.api_user, &self.api_key) {
            headers.insert(
                HeaderName::from_static("cedar-api-user"),
                HeaderValue::from_str(user).map_err(|e| {
                    ConfigError::InvalidConfig(format!("invalid API user header: {e}"))
                })?,
            );
            headers.insert(
                HeaderName::from_static("cedar-api-key"),
                HeaderValue::from_str(key).map_err(|e| {
                    ConfigError::InvalidConfig(format!("invalid API key header: {e}"))
                })?,
            );
        }
        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_invalid_until_base_url_set() {
        let config = ConnectionConfig::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("must specify a base URL"));

        let config = ConnectionConfig::new("http://cedar.example.com");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_malformed_base_url() {
        let config = ConnectionConfig::new("not a url");
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl(_)));
    }

    #[test]
    fn test_credentials_must_be_paired() {
        let mut config = ConnectionConfig::new("http://cedar.example.com");
        config.api_user = Some("user".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("must be specified together"));

        config.api_key = Some("key".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_is_secure_by_scheme() {
        assert!(ConnectionConfig::new("https://cedar.example.com").is_secure());
        assert!(!ConnectionConfig::new("http://cedar.example.com").is_secure());
    }

    #[test]
    fn test_from_toml_str_with_partial_fields() {
        let config = ConnectionConfig::from_toml_str(
            r#"
            base_url = "https://cedar.example.com"
            api_user = "someone"
            api_key = "abc123"
            timeout_secs = 5

            [retry]
            max_attempts = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.base_url, "https://cedar.example.com");
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.retry.max_attempts, 3);
        // Unspecified fields keep their defaults.
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.max_connections, 10);
    }

    #[test]
    fn test_from_toml_str_rejects_invalid_config() {
        let err = ConnectionConfig::from_toml_str("timeout_secs = 5").unwrap_err();
        assert!(err.to_string().contains("must specify a base URL"));
    }

    #[test]
    fn test_credential_headers_empty_without_credentials() {
        let config = ConnectionConfig::new("http://cedar.example.com");
        assert!(config.credential_headers().unwrap().is_empty());

        let mut config = config;
        config.api_user = Some("someone".to_string());
        config.api_key = Some("abc123".to_string());
        let headers = config.credential_headers().unwrap();
        assert_eq!(headers.get("cedar-api-user").unwrap(), "someone");
        assert_eq!(headers.get("cedar-api-key").unwrap(), "abc123");
    }
}
