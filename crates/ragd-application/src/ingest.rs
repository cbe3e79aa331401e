//! Staged ingestion pipeline.
//!
//! Runs one job: fetch → sanitize → chunk → embed → store → index,
//! publishing a progress update between stages. Failures terminate the
//! job with status `error` and are never re-raised to the caller that
//! started the job — that call already returned a `job_id`.

use std::sync::Arc;
use std::time::Duration;

use ragd_domain::entities::{DocumentType, JobPatch, JobStage, JobStatus, SemanticChunk};
use ragd_domain::error::{Error, Result};
use ragd_domain::ports::{
    ContentFetch, EmbeddingProvider, JobProgress, LexicalDocMeta, LexicalIndex, MetricsSink,
    PdfExtractor, VectorPayload, VectorRecord, VectorStoreProvider,
};
use ragd_domain::utils::{id, vectors};

use crate::chunking::{SemanticChunker, sanitize};

/// Ingestion pipeline wired over domain ports
pub struct IngestPipeline {
    progress: Arc<dyn JobProgress>,
    fetcher: Arc<dyn ContentFetch>,
    chunker: SemanticChunker,
    embedding: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStoreProvider>,
    lexical: Arc<dyn LexicalIndex>,
    pdf: Arc<dyn PdfExtractor>,
    metrics: Arc<dyn MetricsSink>,
    collection: String,
}

impl IngestPipeline {
    /// Wire a pipeline over its collaborators.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        progress: Arc<dyn JobProgress>,
        fetcher: Arc<dyn ContentFetch>,
        chunker: SemanticChunker,
        embedding: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStoreProvider>,
        lexical: Arc<dyn LexicalIndex>,
        pdf: Arc<dyn PdfExtractor>,
        metrics: Arc<dyn MetricsSink>,
        collection: String,
    ) -> Self {
        Self {
            progress,
            fetcher,
            chunker,
            embedding,
            vector_store,
            lexical,
            pdf,
            metrics,
            collection,
        }
    }

    /// Run one job to its terminal state, enforcing the job deadline.
    ///
    /// Never returns an error: failures are written into the job record.
    pub async fn run(
        &self,
        job_id: &str,
        content: String,
        document_type: DocumentType,
        timeout_seconds: u64,
    ) {
        let document_label = document_type.to_string();
        let deadline = Duration::from_secs(timeout_seconds);
        let started = std::time::Instant::now();

        let outcome = tokio::time::timeout(
            deadline,
            self.run_stages(job_id, content, document_type),
        )
        .await;
        self.metrics.record_duration(
            "ingest_job_duration_ms",
            started.elapsed().as_secs_f64() * 1000.0,
        );

        match outcome {
            Ok(Ok(chunks_created)) => {
                self.metrics.inc_counter("ingest_jobs_completed", &[]);
                self.metrics.inc_counter_by(
                    "documents_ingested",
                    &[],
                    #[allow(clippy::cast_precision_loss)]
                    {
                        chunks_created as f64
                    },
                );
                tracing::info!(job_id, chunks_created, "ingest job completed");
            }
            Ok(Err(error)) => {
                tracing::error!(job_id, %error, "ingest job failed");
                // Boundary policies carry their exact message; anything
                // else is wrapped as a generic ingestion failure.
                let message = match &error {
                    Error::EmptyContent | Error::NoChunks => error.to_string(),
                    other => format!("Ingestion failed: {other}"),
                };
                self.fail(job_id, &message).await;
                self.metrics.inc_counter(
                    "ingest_jobs_failed",
                    &[
                        ("status", "failed"),
                        ("document_type", document_label.as_str()),
                        ("reason", failure_reason(&error)),
                    ],
                );
            }
            Err(_) => {
                tracing::error!(job_id, timeout_seconds, "ingest job timed out");
                self.fail(job_id, "timeout").await;
                self.metrics.inc_counter(
                    "ingest_jobs_failed",
                    &[
                        ("status", "failed"),
                        ("document_type", document_label.as_str()),
                        ("reason", "timeout"),
                    ],
                );
            }
        }
    }

    async fn run_stages(
        &self,
        job_id: &str,
        content: String,
        document_type: DocumentType,
    ) -> Result<u64> {
        self.advance(
            job_id,
            JobStage::Fetching,
            10.0,
            "Fetching and cleaning content...",
        )
        .await?;
        let raw = self.fetch_content(content).await?;
        let prepared = self.sanitize(raw, document_type).await?;

        self.advance(
            job_id,
            JobStage::Chunking,
            20.0,
            "Splitting content into chunks...",
        )
        .await?;
        let chunks = self.chunker.chunk(&prepared, document_type);
        if chunks.is_empty() {
            return Err(Error::NoChunks);
        }
        tracing::info!(job_id, chunks = chunks.len(), "content split into chunks");

        self.advance(
            job_id,
            JobStage::Embedding,
            40.0,
            format!("Creating embeddings for {} chunks...", chunks.len()),
        )
        .await?;
        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let mut embeddings = self.embedding.embed_batch(&texts).await?;
        for vector in &mut embeddings {
            vectors::l2_normalize(vector);
        }
        if embeddings.len() != chunks.len() {
            return Err(Error::embedding(format!(
                "expected {} embeddings, provider returned {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        self.advance(
            job_id,
            JobStage::Storing,
            70.0,
            "Storing in vector database...",
        )
        .await?;
        self.vector_store
            .ensure_collection(&self.collection, self.embedding.dimensions())
            .await?;
        let records = Self::build_records(&chunks, embeddings);
        let stored = self.vector_store.upsert(&self.collection, records).await?;

        self.advance(
            job_id,
            JobStage::Indexing,
            85.0,
            "Building keyword index...",
        )
        .await?;
        let metadata: Vec<LexicalDocMeta> = chunks
            .iter()
            .map(|chunk| LexicalDocMeta {
                page: Some(chunk.page.unwrap_or(default_page(chunk))),
                doc_id: Some(id::generate().to_string()),
            })
            .collect();
        self.lexical.add_documents(texts, metadata)?;

        let chunks_created = stored as u64;
        let done = JobPatch {
            status: Some(JobStatus::Success),
            stage: Some(JobStage::Completed),
            progress: Some(100.0),
            message: Some(format!("Successfully ingested {chunks_created} chunks")),
            chunks_created: Some(chunks_created),
            ..JobPatch::default()
        };
        self.progress.advance(job_id, &done).await?;
        Ok(chunks_created)
    }

    async fn fetch_content(&self, content: String) -> Result<String> {
        if content.starts_with("http://") || content.starts_with("https://") {
            self.fetcher.fetch(&content).await
        } else {
            Ok(content)
        }
    }

    async fn sanitize(&self, raw: String, document_type: DocumentType) -> Result<String> {
        let prepared = match document_type {
            DocumentType::Text => raw,
            // Keep markup so the chunker can read heading structure; only
            // active content is removed here.
            DocumentType::Html => sanitize::strip_scripts_and_styles(&raw),
            DocumentType::Markdown => raw,
            DocumentType::Pdf => self.pdf.extract(raw.into_bytes()).await?,
        };

        let visible = match document_type {
            DocumentType::Html => sanitize::strip_html(&prepared),
            DocumentType::Markdown => sanitize::strip_markdown(&prepared),
            DocumentType::Text | DocumentType::Pdf => prepared.trim().to_owned(),
        };
        if visible.is_empty() {
            return Err(Error::EmptyContent);
        }
        Ok(prepared)
    }

    fn build_records(chunks: &[SemanticChunk], embeddings: Vec<Vec<f32>>) -> Vec<VectorRecord> {
        chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, vector)| VectorRecord {
                id: id::generate(),
                vector,
                payload: VectorPayload {
                    text: chunk.text.clone(),
                    page: Some(chunk.page.unwrap_or(default_page(chunk))),
                    chunk_index: chunk.chunk_index,
                    title: chunk.title.clone(),
                    section: chunk.section.clone(),
                    has_title_context: chunk.has_title_context(),
                },
            })
            .collect()
    }

    async fn advance(
        &self,
        job_id: &str,
        stage: JobStage,
        progress: f64,
        message: impl Into<String>,
    ) -> Result<()> {
        self.progress
            .advance(job_id, &JobPatch::progress(stage, progress, message))
            .await?;
        Ok(())
    }

    async fn fail(&self, job_id: &str, message: &str) {
        let patch = JobPatch::failed(message.to_owned());
        if let Err(error) = self.progress.advance(job_id, &patch).await {
            tracing::error!(job_id, %error, "failed to record job failure");
        }
    }
}

fn failure_reason(error: &Error) -> &'static str {
    match error {
        Error::EmptyContent => "empty_content",
        Error::NoChunks => "no_chunks",
        Error::Fetch { .. } | Error::Validation { .. } => "fetch",
        Error::Embedding { .. } => "embedding",
        Error::VectorStore { .. } => "vector_store",
        Error::Index { .. } => "index",
        Error::Provider { .. } => "provider",
        _ => "exception",
    }
}

fn default_page(chunk: &SemanticChunk) -> u32 {
    u32::try_from(chunk.chunk_index + 1).unwrap_or(u32::MAX)
}
