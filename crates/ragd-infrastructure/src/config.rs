//! Environment-driven configuration
//!
//! Every setting comes from a fixed set of environment variables merged
//! over compiled defaults; unknown variables are ignored. Validation runs
//! after the merge and fails fast on out-of-range values.

use figment::Figment;
use figment::providers::{Env, Serialized};
use ragd_domain::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Environment variables the service reads, and nothing else.
const ENV_KEYS: &[&str] = &[
    "SERVER_HOST",
    "SERVER_PORT",
    "STORE_URL",
    "VECTOR_STORE_URL",
    "COLLECTION_NAME",
    "EMBEDDING_PROVIDER",
    "EMBEDDING_MODEL",
    "EMBEDDING_URL",
    "OPENAI_API_KEY",
    "LLM_PROVIDER",
    "LLM_MODEL",
    "LLM_TEMPERATURE",
    "LLM_MAX_TOKENS",
    "OTEL_EXPORTER_OTLP_ENDPOINT",
    "OTEL_SERVICE_NAME",
    "OTEL_SAMPLE_RATE",
    "RERANK_ENABLED",
    "RERANK_MODEL",
    "RERANK_URL",
    "MAX_RETRIES",
    "HEARTBEAT_INTERVAL",
    "MAX_CONCURRENT_JOBS",
    "QUERY_CACHE_SIZE",
    "QUERY_CACHE_TTL",
    "RATE_LIMIT_REQUESTS",
    "RATE_LIMIT_WINDOW",
    "MAX_REQUEST_SIZE",
    "REQUEST_TIMEOUT",
    "ALLOWED_HOSTS",
    "CORS_ORIGINS",
    "LOG_STRUCTURED",
];

/// Application configuration, one field per environment variable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Bind address for the HTTP server
    pub server_host: String,
    /// Bind port for the HTTP server
    pub server_port: u16,
    /// Job store URL (`redis://…`) or `memory` for the in-process store
    pub store_url: String,
    /// Vector store URL (`http://…` Qdrant) or `memory`
    pub vector_store_url: String,
    /// Vector collection name
    pub collection_name: String,
    /// Embedding provider: `openai`, `local`, or `mock`
    pub embedding_provider: String,
    /// Embedding model name
    pub embedding_model: String,
    /// Base URL override for the `local` embedding provider
    pub embedding_url: Option<String>,
    /// API key for OpenAI-backed providers
    pub openai_api_key: Option<String>,
    /// LLM provider: `openai` or `dummy`
    pub llm_provider: String,
    /// Chat model used for answer generation
    pub llm_model: String,
    /// Sampling temperature for answer generation
    pub llm_temperature: f64,
    /// Completion token cap for answer generation
    pub llm_max_tokens: u32,
    /// OTLP endpoint, logged at startup for the observability contract
    pub otel_exporter_otlp_endpoint: Option<String>,
    /// Service name reported to the observability stack
    pub otel_service_name: String,
    /// Trace sample rate in `[0.0, 1.0]`
    pub otel_sample_rate: f64,
    /// Whether retrievers are wrapped with cross-encoder reranking
    pub rerank_enabled: bool,
    /// Cross-encoder model name
    pub rerank_model: String,
    /// Base URL of the rerank endpoint
    pub rerank_url: Option<String>,
    /// Fetch retries per ingestion job
    pub max_retries: u32,
    /// SSE heartbeat interval in seconds
    pub heartbeat_interval: u64,
    /// Admission ceiling for queued+running jobs
    pub max_concurrent_jobs: usize,
    /// Query cache capacity (entries)
    pub query_cache_size: u64,
    /// Query cache TTL in seconds
    pub query_cache_ttl: u64,
    /// Requests allowed per client IP per window
    pub rate_limit_requests: u32,
    /// Rate-limit window in seconds
    pub rate_limit_window: u64,
    /// Request body cap in bytes
    pub max_request_size: usize,
    /// Server-side request timeout in seconds
    pub request_timeout: u64,
    /// Comma-separated allowed `Host` values (unset = any)
    pub allowed_hosts: Option<String>,
    /// Comma-separated CORS origins, or `*`
    pub cors_origins: String,
    /// Emit JSON logs when true, human-readable otherwise
    pub log_structured: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".to_owned(),
            server_port: 8000,
            store_url: "memory".to_owned(),
            vector_store_url: "memory".to_owned(),
            collection_name: "docs_v1".to_owned(),
            embedding_provider: "mock".to_owned(),
            embedding_model: "BAAI/bge-m3".to_owned(),
            embedding_url: None,
            openai_api_key: None,
            llm_provider: "dummy".to_owned(),
            llm_model: "gpt-4o-mini".to_owned(),
            llm_temperature: 0.2,
            llm_max_tokens: 512,
            otel_exporter_otlp_endpoint: None,
            otel_service_name: "ragd".to_owned(),
            otel_sample_rate: 1.0,
            rerank_enabled: false,
            rerank_model: "BAAI/bge-reranker-v2-m3".to_owned(),
            rerank_url: None,
            max_retries: 3,
            heartbeat_interval: 30,
            max_concurrent_jobs: 10,
            query_cache_size: 1000,
            query_cache_ttl: 300,
            rate_limit_requests: 100,
            rate_limit_window: 60,
            max_request_size: 10 * 1024 * 1024,
            request_timeout: 30,
            allowed_hosts: None,
            cors_origins: "*".to_owned(),
            log_structured: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment over defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable fails to parse or validation finds
    /// an invalid value.
    pub fn from_env() -> Result<Self> {
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Env::raw().only(ENV_KEYS))
            .extract()
            .map_err(|e| Error::config(format!("failed to load configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate value ranges and enumerations.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigInvalid`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.embedding_provider.as_str(), "openai" | "local" | "mock") {
            return Err(Error::ConfigInvalid {
                key: "EMBEDDING_PROVIDER".to_owned(),
                message: format!(
                    "expected one of openai|local|mock, got '{}'",
                    self.embedding_provider
                ),
            });
        }
        if !matches!(self.llm_provider.as_str(), "openai" | "dummy") {
            return Err(Error::ConfigInvalid {
                key: "LLM_PROVIDER".to_owned(),
                message: format!("expected one of openai|dummy, got '{}'", self.llm_provider),
            });
        }
        if self.embedding_provider == "openai" && self.openai_api_key.is_none() {
            return Err(Error::ConfigInvalid {
                key: "OPENAI_API_KEY".to_owned(),
                message: "required when EMBEDDING_PROVIDER=openai".to_owned(),
            });
        }
        if self.max_concurrent_jobs == 0 {
            return Err(Error::ConfigInvalid {
                key: "MAX_CONCURRENT_JOBS".to_owned(),
                message: "must be at least 1".to_owned(),
            });
        }
        if self.heartbeat_interval == 0 {
            return Err(Error::ConfigInvalid {
                key: "HEARTBEAT_INTERVAL".to_owned(),
                message: "must be at least 1 second".to_owned(),
            });
        }
        if self.query_cache_size == 0 || self.query_cache_ttl == 0 {
            return Err(Error::ConfigInvalid {
                key: "QUERY_CACHE_SIZE".to_owned(),
                message: "cache size and TTL must be non-zero".to_owned(),
            });
        }
        if self.rate_limit_requests == 0 || self.rate_limit_window == 0 {
            return Err(Error::ConfigInvalid {
                key: "RATE_LIMIT_REQUESTS".to_owned(),
                message: "rate limit and window must be non-zero".to_owned(),
            });
        }
        if !(0.0..=1.0).contains(&self.otel_sample_rate) {
            return Err(Error::ConfigInvalid {
                key: "OTEL_SAMPLE_RATE".to_owned(),
                message: "must be within [0.0, 1.0]".to_owned(),
            });
        }
        Ok(())
    }

    /// Parsed `ALLOWED_HOSTS` list (empty = any host accepted).
    #[must_use]
    pub fn allowed_host_list(&self) -> Vec<String> {
        self.allowed_hosts
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(|host| host.trim().to_owned())
                    .filter(|host| !host.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Parsed `CORS_ORIGINS` list; `["*"]` means any origin.
    #[must_use]
    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(|origin| origin.trim().to_owned())
            .filter(|origin| !origin.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        AppConfig::default().validate().expect("defaults are valid");
    }

    #[rstest::rstest]
    #[case("openai")]
    #[case("local")]
    #[case("mock")]
    fn known_embedding_providers_pass(#[case] provider: &str) {
        let config = AppConfig {
            embedding_provider: provider.to_owned(),
            openai_api_key: Some("sk-test".to_owned()),
            ..AppConfig::default()
        };
        config.validate().expect("provider accepted");
    }

    #[test]
    fn unknown_embedding_provider_is_rejected() {
        let config = AppConfig {
            embedding_provider: "sbert".to_owned(),
            ..AppConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid { key, .. } if key == "EMBEDDING_PROVIDER"));
    }

    #[test]
    fn openai_embeddings_require_an_api_key() {
        let config = AppConfig {
            embedding_provider: "openai".to_owned(),
            ..AppConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid { key, .. } if key == "OPENAI_API_KEY"));
    }

    #[test]
    fn zero_admission_ceiling_is_rejected() {
        let config = AppConfig {
            max_concurrent_jobs: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn host_and_origin_lists_parse() {
        let config = AppConfig {
            allowed_hosts: Some("api.example.com, internal.example.com".to_owned()),
            cors_origins: "https://a.example.com,https://b.example.com".to_owned(),
            ..AppConfig::default()
        };
        assert_eq!(
            config.allowed_host_list(),
            vec!["api.example.com", "internal.example.com"]
        );
        assert_eq!(config.cors_origin_list().len(), 2);
        assert!(AppConfig::default().allowed_host_list().is_empty());
    }
}
