//! Application state wiring.
//!
//! Builds every provider from configuration and hands the routes one
//! cloneable state value. Providers are selected here, not through a
//! registry: `memory` backends for dev/test, remote backends otherwise.

use std::sync::Arc;
use std::time::Duration;

use ragd_application::answer::AnswerComposer;
use ragd_application::chunking::SemanticChunker;
use ragd_application::ingest::IngestPipeline;
use ragd_application::query::QueryService;
use ragd_application::retrieval::RetrieverFactory;
use ragd_domain::error::Result;
use ragd_domain::ports::{
    CrossEncoderProvider, EmbeddingProvider, JobProgress, JobStore, LexicalIndex, LlmProvider,
    MetricsSink, VectorStoreProvider,
};
use ragd_infrastructure::config::AppConfig;
use ragd_infrastructure::fetch::ContentFetcher;
use ragd_infrastructure::jobs::{JobOrchestrator, MemoryJobStore, RedisJobStore};
use ragd_infrastructure::metrics::{JsonExporter, MetricsExporter, MetricsRegistry};
use ragd_providers::cache::MokaResponseCache;
use ragd_providers::embedding::{
    LocalEmbeddingProvider, MockEmbeddingProvider, OpenAiEmbeddingProvider,
};
use ragd_providers::lexical::Bm25Index;
use ragd_providers::llm::{DummyLlmProvider, OpenAiLlmProvider};
use ragd_providers::pdf::UnconfiguredPdfExtractor;
use ragd_providers::rerank::{HttpCrossEncoderProvider, MockCrossEncoderProvider};
use ragd_providers::vector_store::{MemoryVectorStore, QdrantVectorStore};

use crate::middleware::security::SecurityState;
use crate::sse::SseManager;

const PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

/// Bearer-token check for the streaming routes.
///
/// Token format and validation are deployment concerns; the default
/// accepts any non-empty token.
pub trait StreamTokenValidator: Send + Sync {
    /// Returns `true` when the presented token may open a stream.
    fn validate(&self, token: &str) -> bool;
}

/// Default validator: any non-empty bearer token
#[derive(Debug, Default)]
pub struct AllowAnyToken;

impl StreamTokenValidator for AllowAnyToken {
    fn validate(&self, token: &str) -> bool {
        !token.trim().is_empty()
    }
}

/// Shared application state handed to every route
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<AppConfig>,
    /// Job lifecycle API
    pub orchestrator: Arc<JobOrchestrator>,
    /// Ingestion worker
    pub pipeline: Arc<IngestPipeline>,
    /// Query use case
    pub query: Arc<QueryService>,
    /// Vector store handle for readiness checks
    pub vector_store: Arc<dyn VectorStoreProvider>,
    /// Metrics registry
    pub metrics: Arc<MetricsRegistry>,
    /// Metrics wire-format exporter
    pub exporter: Arc<dyn MetricsExporter>,
    /// SSE connection manager
    pub sse: Arc<SseManager>,
    /// Rate-limit / size / timeout state
    pub security: Arc<SecurityState>,
    /// Stream bearer-token validator
    pub stream_auth: Arc<dyn StreamTokenValidator>,
}

/// Build the full application state from configuration.
///
/// # Errors
///
/// Returns an error when the job store is unreachable.
pub async fn build_state(config: AppConfig) -> Result<AppState> {
    let config = Arc::new(config);
    let metrics = Arc::new(MetricsRegistry::new());

    let store: Arc<dyn JobStore> = if config.store_url == "memory" {
        tracing::info!("using in-process job store");
        Arc::new(MemoryJobStore::new())
    } else {
        Arc::new(RedisJobStore::connect(&config.store_url).await?)
    };
    let orchestrator = Arc::new(JobOrchestrator::new(store, config.max_concurrent_jobs));

    let embedding: Arc<dyn EmbeddingProvider> = match config.embedding_provider.as_str() {
        "openai" => Arc::new(OpenAiEmbeddingProvider::new(
            config.openai_api_key.clone().unwrap_or_default(),
            None,
            config.embedding_model.clone(),
            PROVIDER_TIMEOUT,
        )),
        "local" => Arc::new(LocalEmbeddingProvider::new(
            config.embedding_url.clone(),
            config.embedding_model.clone(),
            None,
            PROVIDER_TIMEOUT,
        )),
        _ => Arc::new(MockEmbeddingProvider::new()),
    };

    let vector_store: Arc<dyn VectorStoreProvider> = if config.vector_store_url == "memory" {
        tracing::info!("using in-process vector store");
        Arc::new(MemoryVectorStore::new())
    } else {
        Arc::new(QdrantVectorStore::new(
            config.vector_store_url.clone(),
            PROVIDER_TIMEOUT,
        ))
    };

    let lexical: Arc<dyn LexicalIndex> = Arc::new(Bm25Index::new());

    let llm: Arc<dyn LlmProvider> = match (config.llm_provider.as_str(), &config.openai_api_key) {
        ("openai", Some(api_key)) => Arc::new(OpenAiLlmProvider::new(
            api_key.clone(),
            None,
            config.llm_model.clone(),
            config.llm_temperature,
            config.llm_max_tokens,
            PROVIDER_TIMEOUT,
        )),
        _ => {
            tracing::info!("llm provider initialized with dummy backend");
            Arc::new(DummyLlmProvider::new())
        }
    };

    let encoder: Arc<dyn CrossEncoderProvider> = match &config.rerank_url {
        Some(url) => Arc::new(HttpCrossEncoderProvider::new(
            url.clone(),
            config.rerank_model.clone(),
            PROVIDER_TIMEOUT,
        )),
        None => Arc::new(MockCrossEncoderProvider::new()),
    };

    let pipeline = Arc::new(IngestPipeline::new(
        Arc::clone(&orchestrator) as Arc<dyn JobProgress>,
        Arc::new(ContentFetcher::new(config.max_retries)),
        SemanticChunker::default(),
        Arc::clone(&embedding),
        Arc::clone(&vector_store),
        Arc::clone(&lexical),
        Arc::new(UnconfiguredPdfExtractor::new()),
        Arc::clone(&metrics) as Arc<dyn MetricsSink>,
        config.collection_name.clone(),
    ));

    let factory = RetrieverFactory::new(
        Arc::clone(&embedding),
        Arc::clone(&vector_store),
        Arc::clone(&lexical),
        encoder,
        config.collection_name.clone(),
        config.rerank_enabled,
    );
    let composer = AnswerComposer::new(llm, Arc::clone(&metrics) as Arc<dyn MetricsSink>);
    let cache = Arc::new(MokaResponseCache::new(
        config.query_cache_size,
        Duration::from_secs(config.query_cache_ttl),
    ));
    let query = Arc::new(QueryService::new(
        factory,
        composer,
        cache,
        Arc::clone(&metrics) as Arc<dyn MetricsSink>,
    ));

    Ok(AppState {
        security: Arc::new(SecurityState::new(&config)),
        sse: Arc::new(SseManager::new(Duration::from_secs(config.heartbeat_interval))),
        stream_auth: Arc::new(AllowAnyToken),
        config,
        orchestrator,
        pipeline,
        query,
        vector_store,
        metrics,
        exporter: Arc::new(JsonExporter),
    })
}
