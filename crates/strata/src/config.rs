use std::env;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(&'static str),
}

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrataConfig {
    /// Application namespace, the table name prefix.
    pub app: String,
    /// Enables the in-process query cache.
    pub debug: bool,
    /// Overrides the DynamoDB endpoint (e.g. a local emulator).
    pub endpoint_url: Option<String>,
    /// AWS region (default: "us-east-1")
    pub region: String,
}

impl StrataConfig {
    pub fn new(app: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            debug: false,
            endpoint_url: None,
            region: "us-east-1".to_string(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `APP` - Application namespace (required)
    /// - `DEBUG` - `"true"` enables the query cache (default: false)
    /// - `AWS_ENDPOINT_URL` - DynamoDB endpoint override (optional)
    /// - `AWS_REGION` - AWS region (default: "us-east-1")
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let app = lookup("APP")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingEnv("APP"))?;

        Ok(Self {
            app,
            debug: lookup("DEBUG").is_some_and(|v| v.eq_ignore_ascii_case("true")),
            endpoint_url: lookup("AWS_ENDPOINT_URL").filter(|v| !v.is_empty()),
            region: lookup("AWS_REGION").unwrap_or_else(|| "us-east-1".to_string()),
        })
    }

    /// Table bound to a service: `{app}.{service_id}`.
    pub fn table_name(&self, service_id: &str) -> String {
        format!("{}.{}", self.app, service_id)
    }
}
