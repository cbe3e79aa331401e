//! Guarded content fetcher for the ingestion pipeline.
//!
//! URL fetches follow redirects, carry a connect+read timeout, and are
//! retried under the backoff policy for transport and timeout errors
//! only. Private-network and non-http(s) targets are rejected before any
//! connection is made.

use std::time::Duration;

use ragd_domain::error::{Error, Result};

use crate::retry::RetryPolicy;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP fetcher with SSRF guard and retry policy
pub struct ContentFetcher {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl ContentFetcher {
    /// Create a fetcher retrying up to `max_retries` times.
    #[must_use]
    pub fn new(max_retries: u32) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(FETCH_TIMEOUT)
                .connect_timeout(FETCH_TIMEOUT)
                .build()
                .unwrap_or_default(),
            policy: RetryPolicy::with_max_retries(max_retries),
        }
    }

    /// Returns `true` when the content argument should be fetched rather
    /// than used inline.
    #[must_use]
    pub fn is_url(content: &str) -> bool {
        content.starts_with("http://") || content.starts_with("https://")
    }

    /// Reject non-http(s) schemes, localhost, and private address ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] describing why the URL is refused.
    pub fn validate_url(url: &str) -> Result<()> {
        if !Self::is_url(url) {
            return Err(Error::validation("only HTTP/HTTPS URLs are allowed"));
        }

        let parsed: reqwest::Url = url
            .parse()
            .map_err(|e| Error::validation(format!("invalid URL: {e}")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| Error::validation("URL has no host"))?;

        if host.eq_ignore_ascii_case("localhost") || host == "0.0.0.0" {
            return Err(Error::validation("localhost URLs are not allowed"));
        }
        if host.starts_with("127.")
            || host.starts_with("10.")
            || host.starts_with("192.168.")
            || host.starts_with("172.16.")
        {
            return Err(Error::validation("private network addresses are not allowed"));
        }
        Ok(())
    }

    /// Fetch a document body from a validated URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for refused URLs and [`Error::Fetch`]
    /// when all attempts fail.
    pub async fn fetch(&self, url: &str) -> Result<String> {
        Self::validate_url(url)?;

        let body = self
            .policy
            .run(
                || async {
                    let response = self.client.get(url).send().await?;
                    let response = response.error_for_status()?;
                    response.text().await
                },
                |error: &reqwest::Error| error.is_timeout() || error.is_connect(),
            )
            .await
            .map_err(|e| Error::fetch_with_source(format!("failed to fetch {url}: {e}"), e))?;

        tracing::info!(url, content_length = body.len(), "fetched remote content");
        Ok(body)
    }
}

#[async_trait::async_trait]
impl ragd_domain::ports::ContentFetch for ContentFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        Self::fetch(self, url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    #[case("https://example.com/doc.html", true)]
    #[case("http://example.com", true)]
    #[case("ftp://example.com/doc", false)]
    #[case("https://localhost/doc", false)]
    #[case("https://LOCALHOST/doc", false)]
    #[case("http://127.0.0.1:9000/", false)]
    #[case("http://10.1.2.3/", false)]
    #[case("http://192.168.0.12/", false)]
    #[case("http://172.16.44.1/", false)]
    fn url_guard(#[case] url: &str, #[case] accepted: bool) {
        assert_eq!(ContentFetcher::validate_url(url).is_ok(), accepted, "{url}");
    }

    #[test]
    fn inline_content_is_not_a_url() {
        assert!(!ContentFetcher::is_url("Python is a programming language."));
        assert!(ContentFetcher::is_url("https://example.com"));
    }
}
