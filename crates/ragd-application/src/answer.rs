//! Answer composition over retrieved sources.
//!
//! Builds a source-grounded prompt (top five sources, 500 characters
//! each, with scores), calls the configured LLM, and returns an error
//! marker on provider failure rather than an ungrounded answer.

use std::sync::Arc;

use ragd_domain::entities::RetrievedSource;
use ragd_domain::ports::{LlmProvider, MetricsSink};

const PROMPT_SOURCES: usize = 5;
const SOURCE_CHARS: usize = 500;

/// LLM-backed answer composer
pub struct AnswerComposer {
    llm: Arc<dyn LlmProvider>,
    metrics: Arc<dyn MetricsSink>,
}

impl AnswerComposer {
    /// Create a composer over the configured LLM provider.
    #[must_use]
    pub fn new(llm: Arc<dyn LlmProvider>, metrics: Arc<dyn MetricsSink>) -> Self {
        Self { llm, metrics }
    }

    /// Build the grounded prompt for a question and its sources.
    #[must_use]
    pub fn build_prompt(question: &str, sources: &[RetrievedSource]) -> String {
        let context: Vec<String> = sources
            .iter()
            .take(PROMPT_SOURCES)
            .enumerate()
            .map(|(i, source)| {
                format!(
                    "Source {} (score: {:.3}): {}",
                    i + 1,
                    source.score,
                    truncate_chars(&source.text, SOURCE_CHARS)
                )
            })
            .collect();

        format!(
            "Based on the following sources, answer the question accurately and concisely.\n\n\
             SOURCES:\n{}\n\n\
             QUESTION: {question}\n\n\
             ANSWER: Provide a clear, accurate answer based only on the information in the \
             sources above. If the sources don't contain enough information to answer the \
             question, say so.",
            context.join("\n\n")
        )
    }

    /// Compose an answer for a question from its retrieved sources.
    pub async fn compose(&self, question: &str, sources: &[RetrievedSource]) -> String {
        if sources.is_empty() {
            return "I couldn't find relevant information to answer your question.".to_owned();
        }

        let prompt = Self::build_prompt(question, sources);
        tracing::debug!(prompt_length = prompt.len(), "composed answer prompt");

        match self.llm.generate(&prompt).await {
            Ok(completion) => {
                self.metrics
                    .inc_counter("llm_answers_generated", &[("provider", self.llm.provider_name())]);
                tracing::info!(
                    provider = self.llm.provider_name(),
                    answer_length = completion.text.len(),
                    total_tokens = completion.total_tokens().unwrap_or(0),
                    "llm answer generated"
                );
                completion.text
            }
            Err(error) => {
                self.metrics
                    .inc_counter("llm_answers_failed", &[("provider", self.llm.provider_name())]);
                tracing::error!(%error, "llm answer generation failed");
                format!("Error generating answer: {error}")
            }
        }
    }
}

fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use ragd_domain::error::{Error, Result};
    use ragd_domain::ports::LlmCompletion;

    use super::*;

    struct NullMetrics;

    impl MetricsSink for NullMetrics {
        fn inc_counter(&self, _name: &str, _labels: &[(&str, &str)]) {}
        fn inc_counter_by(&self, _name: &str, _labels: &[(&str, &str)], _value: f64) {}
        fn record_duration(&self, _name: &str, _duration_ms: f64) {}
        fn set_gauge(&self, _name: &str, _labels: &[(&str, &str)], _value: f64) {}
    }

    struct FailingLlm;

    #[async_trait]
    impl LlmProvider for FailingLlm {
        async fn generate(&self, _prompt: &str) -> Result<LlmCompletion> {
            Err(Error::provider("rate limited"))
        }

        fn provider_name(&self) -> &str {
            "failing"
        }
    }

    fn source(text: &str, score: f32) -> RetrievedSource {
        RetrievedSource::new(text.to_owned(), None, score)
    }

    #[test]
    fn prompt_enumerates_top_five_truncated_sources() {
        let sources: Vec<RetrievedSource> = (0..7)
            .map(|i| source(&format!("text {i} {}", "x".repeat(600)), 0.9))
            .collect();
        let prompt = AnswerComposer::build_prompt("What?", &sources);

        assert!(prompt.contains("Source 1 (score: 0.900)"));
        assert!(prompt.contains("Source 5"));
        assert!(!prompt.contains("Source 6"));
        assert!(prompt.contains("QUESTION: What?"));
        // Each excerpt is capped at 500 characters.
        for line in prompt.lines().filter(|line| line.starts_with("Source ")) {
            assert!(line.len() < 600, "source line too long: {}", line.len());
        }
    }

    #[tokio::test]
    async fn empty_sources_refuse_without_calling_the_llm() {
        let composer = AnswerComposer::new(Arc::new(FailingLlm), Arc::new(NullMetrics));
        let answer = composer.compose("What?", &[]).await;
        assert!(answer.contains("couldn't find relevant information"));
    }

    #[tokio::test]
    async fn provider_failure_returns_an_error_marker() {
        let composer = AnswerComposer::new(Arc::new(FailingLlm), Arc::new(NullMetrics));
        let answer = composer.compose("What?", &[source("something", 0.5)]).await;
        assert!(answer.starts_with("Error generating answer:"));
    }
}
