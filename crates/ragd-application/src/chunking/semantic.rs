//! Heading-aware semantic chunker with title bubbling.
//!
//! HTML and Markdown headings are replaced with `[TITLE_Lx] … [/TITLE]`
//! sentinels before cleaning, the cleaned text is split at sentinel
//! boundaries into sections, and each section inherits its ancestor title
//! path. Plain text falls back to paragraph-aware chunking, then to
//! sentence-aware chunking. Chunk sizes are whitespace-word counts.

use std::collections::HashMap;
use std::sync::LazyLock;

use ragd_domain::entities::{DocumentType, SemanticChunk};
use regex::Regex;

use super::sanitize;

static HTML_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?i)<h([1-6])[^>]*>(.*?)</h[1-6]>").expect("heading pattern is valid")
});
static MD_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?m)^(#{1,6})[ \t]+(.+?)[ \t]*$").expect("heading pattern is valid")
});
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"<[^>]+>").expect("tag pattern is valid")
});
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"\s+").expect("whitespace pattern is valid")
});
static PARAGRAPH_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"\n\s*\n").expect("paragraph pattern is valid")
});
static SENTENCE_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"[.!?]\s+").expect("sentence pattern is valid")
});

/// Chunker tuning knobs
#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    /// Target chunk size in whitespace-separated words
    pub chunk_size: usize,
    /// Overlap carried between consecutive chunks, in words
    pub chunk_overlap: usize,
    /// Prefer paragraph/sentence boundaries over hard word windows
    pub respect_boundaries: bool,
    /// Prefix chunks with their ancestor heading path
    pub enable_title_bubbling: bool,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 200,
            respect_boundaries: true,
            enable_title_bubbling: true,
        }
    }
}

/// A heading in document order
#[derive(Debug, Clone)]
struct Heading {
    level: u8,
    title: String,
}

/// Heading-aware chunker
#[derive(Debug, Clone, Default)]
pub struct SemanticChunker {
    config: ChunkerConfig,
}

impl SemanticChunker {
    /// Create a chunker with the given configuration.
    #[must_use]
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    /// Chunk a document, assigning `chunk_index` in emission order.
    #[must_use]
    pub fn chunk(&self, text: &str, document_type: DocumentType) -> Vec<SemanticChunk> {
        tracing::info!(
            text_length = text.len(),
            document_type = %document_type,
            "starting semantic chunking"
        );

        let mut chunks = match document_type {
            DocumentType::Html => self.chunk_html(text),
            DocumentType::Markdown => self.chunk_markdown(text),
            DocumentType::Text | DocumentType::Pdf => self.chunk_plain(text),
        };
        for (index, chunk) in chunks.iter_mut().enumerate() {
            chunk.chunk_index = index;
        }

        tracing::info!(chunks_created = chunks.len(), "semantic chunking completed");
        chunks
    }

    fn chunk_html(&self, html: &str) -> Vec<SemanticChunk> {
        let html = sanitize::strip_scripts_and_styles(html);
        let headings = Self::extract_html_headings(&html);
        let cleaned = Self::clean_html_with_sentinels(&html);

        if !headings.is_empty() && self.config.enable_title_bubbling {
            self.chunk_by_sections(&cleaned, &headings)
        } else {
            self.chunk_plain(&cleaned)
        }
    }

    fn chunk_markdown(&self, markdown: &str) -> Vec<SemanticChunk> {
        let headings = Self::extract_md_headings(markdown);
        let cleaned = Self::clean_markdown_with_sentinels(markdown);

        if !headings.is_empty() && self.config.enable_title_bubbling {
            self.chunk_by_sections(&cleaned, &headings)
        } else {
            self.chunk_plain(&cleaned)
        }
    }

    fn extract_html_headings(html: &str) -> Vec<Heading> {
        HTML_HEADING
            .captures_iter(html)
            .filter_map(|caps| {
                let level: u8 = caps.get(1)?.as_str().parse().ok()?;
                let title = HTML_TAG.replace_all(caps.get(2)?.as_str(), "");
                let title = title.trim().to_owned();
                (!title.is_empty()).then_some(Heading { level, title })
            })
            .collect()
    }

    fn extract_md_headings(markdown: &str) -> Vec<Heading> {
        MD_HEADING
            .captures_iter(markdown)
            .filter_map(|caps| {
                let level = u8::try_from(caps.get(1)?.as_str().len()).ok()?;
                let title = caps.get(2)?.as_str().trim().to_owned();
                (!title.is_empty()).then_some(Heading { level, title })
            })
            .collect()
    }

    fn clean_html_with_sentinels(html: &str) -> String {
        let with_sentinels = HTML_HEADING.replace_all(html, |caps: &regex::Captures<'_>| {
            let title = HTML_TAG.replace_all(&caps[2], "");
            format!("[TITLE_L{}] {} [/TITLE]", &caps[1], title.trim())
        });
        let text = HTML_TAG.replace_all(&with_sentinels, " ");
        WHITESPACE.replace_all(&text, " ").trim().to_owned()
    }

    fn clean_markdown_with_sentinels(markdown: &str) -> String {
        let with_sentinels = MD_HEADING.replace_all(markdown, |caps: &regex::Captures<'_>| {
            format!("[TITLE_L{}] {} [/TITLE]", caps[1].len(), caps[2].trim())
        });
        let text = sanitize::strip_markdown(&with_sentinels);
        WHITESPACE.replace_all(&text, " ").trim().to_owned()
    }

    fn chunk_plain(&self, text: &str) -> Vec<SemanticChunk> {
        if self.config.respect_boundaries {
            let paragraphs: Vec<&str> = PARAGRAPH_BOUNDARY.split(text).collect();
            if paragraphs.len() > 1 {
                return self.chunk_by_paragraphs(&paragraphs);
            }
        }
        self.chunk_by_sentences(text)
    }

    fn chunk_by_sections(&self, text: &str, headings: &[Heading]) -> Vec<SemanticChunk> {
        // Locate each heading's sentinel in the cleaned text.
        let mut positions: Vec<(usize, usize, u8, &str)> = Vec::new();
        for heading in headings {
            let pattern = format!(
                r"\[TITLE_L{}\]\s*{}\s*\[/TITLE\]",
                heading.level,
                regex::escape(&heading.title)
            );
            let Ok(sentinel) = Regex::new(&pattern) else {
                continue;
            };
            if let Some(found) = sentinel.find(text) {
                positions.push((found.start(), found.end(), heading.level, &heading.title));
            }
        }
        positions.sort_by_key(|&(start, ..)| start);

        // Slice sections between consecutive sentinels.
        let mut sections: Vec<(Option<String>, u8, &str)> = Vec::new();
        for (i, &(_, end, level, title)) in positions.iter().enumerate() {
            let section_end = positions
                .get(i + 1)
                .map_or(text.len(), |&(next_start, ..)| next_start);
            let section_text = text[end..section_end].trim();
            if !section_text.is_empty() {
                sections.push((Some(title.to_owned()), level, section_text));
            }
        }
        if sections.is_empty() {
            sections.push((None, 0, text));
        }

        let mut chunks = Vec::new();
        for (section_title, section_level, section_text) in sections {
            // Ancestor path: every heading at or above this section's
            // level, scanned in document order.
            let mut current_titles: Vec<String> = Vec::new();
            if self.config.enable_title_bubbling {
                for heading in headings {
                    if heading.level <= section_level {
                        current_titles.push(heading.title.clone());
                    }
                }
                if let Some(title) = &section_title {
                    if !current_titles.contains(title) {
                        current_titles.push(title.clone());
                    }
                }
            }

            for window in self.window_words(section_text) {
                let word_count = window.split_whitespace().count();
                let bubbled = self.config.enable_title_bubbling && !current_titles.is_empty();
                let text = if bubbled {
                    let context_tail = &current_titles[current_titles.len().saturating_sub(2)..];
                    format!("[Context: {}]\n\n{window}", context_tail.join(" > "))
                } else {
                    window
                };

                let mut metadata = HashMap::new();
                metadata.insert(
                    "section_level".to_owned(),
                    serde_json::Value::from(section_level),
                );
                metadata.insert(
                    "has_title_context".to_owned(),
                    serde_json::Value::from(bubbled),
                );

                chunks.push(SemanticChunk {
                    text,
                    title: section_title.clone(),
                    section: (!current_titles.is_empty()).then(|| current_titles.join(" > ")),
                    page: None,
                    chunk_index: 0,
                    word_count,
                    metadata,
                });
            }
        }
        chunks
    }

    fn chunk_by_paragraphs(&self, paragraphs: &[&str]) -> Vec<SemanticChunk> {
        let mut chunks = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut current_size = 0usize;

        for paragraph in paragraphs {
            let para_words = paragraph.split_whitespace().count();

            if current_size + para_words > self.config.chunk_size && !current.is_empty() {
                let text = current.join("\n\n");
                let overlap = Self::last_words(&text, self.config.chunk_overlap);
                chunks.push(Self::sized_chunk(text, current_size));

                if let Some(overlap) = overlap {
                    current_size = overlap.split_whitespace().count() + para_words;
                    current = vec![overlap, (*paragraph).to_owned()];
                } else {
                    current = vec![(*paragraph).to_owned()];
                    current_size = para_words;
                }
            } else {
                current.push((*paragraph).to_owned());
                current_size += para_words;
            }
        }

        if !current.is_empty() && current_size > 0 {
            chunks.push(Self::sized_chunk(current.join("\n\n"), current_size));
        }
        chunks
    }

    fn chunk_by_sentences(&self, text: &str) -> Vec<SemanticChunk> {
        let mut chunks = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut current_size = 0usize;

        for sentence in Self::split_sentences(text) {
            let sentence = sentence.trim();
            if sentence.is_empty() {
                continue;
            }
            let sent_words = sentence.split_whitespace().count();

            if current_size + sent_words > self.config.chunk_size && !current.is_empty() {
                chunks.push(Self::sized_chunk(current.join(" "), current_size));

                if self.config.chunk_overlap > 0 && current.len() > 1 {
                    // Carry the last two sentences into the next chunk.
                    let overlap: Vec<String> =
                        current[current.len() - 2..].iter().cloned().collect();
                    current_size = overlap
                        .iter()
                        .map(|s| s.split_whitespace().count())
                        .sum::<usize>()
                        + sent_words;
                    current = overlap;
                    current.push(sentence.to_owned());
                } else {
                    current = vec![sentence.to_owned()];
                    current_size = sent_words;
                }
            } else {
                current.push(sentence.to_owned());
                current_size += sent_words;
            }
        }

        if !current.is_empty() {
            chunks.push(Self::sized_chunk(current.join(" "), current_size));
        }
        chunks
    }

    /// Hard word windows for section content, stepping by
    /// `chunk_size - chunk_overlap`.
    fn window_words(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            return Vec::new();
        }
        let step = self.config.chunk_size.saturating_sub(self.config.chunk_overlap).max(1);

        let mut windows = Vec::new();
        let mut start = 0;
        while start < words.len() {
            let end = (start + self.config.chunk_size).min(words.len());
            windows.push(words[start..end].join(" "));
            if end == words.len() {
                break;
            }
            start += step;
        }
        windows
    }

    /// Sentence split on `[.!?]` followed by whitespace, punctuation kept
    /// with its sentence.
    fn split_sentences(text: &str) -> Vec<&str> {
        let mut sentences = Vec::new();
        let mut last = 0;
        for found in SENTENCE_BOUNDARY.find_iter(text) {
            sentences.push(&text[last..found.start() + 1]);
            last = found.end();
        }
        if last < text.len() {
            sentences.push(&text[last..]);
        }
        sentences
    }

    fn last_words(text: &str, count: usize) -> Option<String> {
        if count == 0 {
            return None;
        }
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            return None;
        }
        let tail = &words[words.len().saturating_sub(count)..];
        Some(tail.join(" "))
    }

    fn sized_chunk(text: String, word_count: usize) -> SemanticChunk {
        SemanticChunk {
            text,
            title: None,
            section: None,
            page: None,
            chunk_index: 0,
            word_count,
            metadata: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_chunker() -> SemanticChunker {
        SemanticChunker::new(ChunkerConfig {
            chunk_size: 10,
            chunk_overlap: 3,
            respect_boundaries: true,
            enable_title_bubbling: true,
        })
    }

    #[test]
    fn markdown_sections_bubble_their_title_path() {
        let chunker = SemanticChunker::default();
        let markdown = "# Guide\n\nIntro paragraph about the guide.\n\n\
                        ## Install\n\nRun the installer and follow the prompts.";
        let chunks = chunker.chunk(markdown, DocumentType::Markdown);

        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].text.starts_with("[Context: Guide]"));
        assert_eq!(chunks[0].title.as_deref(), Some("Guide"));
        assert_eq!(chunks[0].section.as_deref(), Some("Guide"));

        assert!(chunks[1].text.starts_with("[Context: Guide > Install]"));
        assert_eq!(chunks[1].title.as_deref(), Some("Install"));
        assert_eq!(chunks[1].section.as_deref(), Some("Guide > Install"));
        assert!(chunks[1].has_title_context());

        // Emission order indexing.
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[1].chunk_index, 1);
    }

    #[test]
    fn word_count_excludes_the_context_preamble() {
        let chunker = SemanticChunker::default();
        let markdown = "# Title\n\none two three four five";
        let chunks = chunker.chunk(markdown, DocumentType::Markdown);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].word_count, 5);
        assert!(chunks[0].text.contains("[Context: Title]"));
    }

    #[test]
    fn context_preamble_uses_last_two_path_components() {
        let chunker = SemanticChunker::default();
        let markdown = "# A\n\n## B\n\n### C\n\ndeep section body text";
        let chunks = chunker.chunk(markdown, DocumentType::Markdown);
        let deep = chunks
            .iter()
            .find(|chunk| chunk.title.as_deref() == Some("C"))
            .expect("deep chunk");
        assert!(deep.text.starts_with("[Context: B > C]"));
        assert_eq!(deep.section.as_deref(), Some("A > B > C"));
    }

    #[test]
    fn html_headings_survive_tag_stripping() {
        let chunker = SemanticChunker::default();
        let html = "<html><script>alert(1)</script><h1>Overview</h1>\
                    <p>The <b>service</b> answers questions.</p></html>";
        let chunks = chunker.chunk(html, DocumentType::Html);

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.starts_with("[Context: Overview]"));
        assert!(chunks[0].text.contains("The service answers questions."));
        assert!(!chunks[0].text.contains('<'));
        assert!(!chunks[0].text.contains("alert"));
    }

    #[test]
    fn paragraphs_accumulate_with_word_overlap() {
        let chunker = small_chunker();
        let text = "one two three four five six seven\n\n\
                    eight nine ten eleven twelve\n\n\
                    thirteen fourteen fifteen";
        let chunks = chunker.chunk(text, DocumentType::Text);

        assert!(chunks.len() >= 2);
        // Overlap: the second chunk re-carries the tail of the first.
        let first_tail: Vec<&str> = chunks[0].text.split_whitespace().rev().take(3).collect();
        for word in first_tail {
            assert!(chunks[1].text.contains(word));
        }
    }

    #[test]
    fn single_paragraph_falls_back_to_sentences() {
        let chunker = small_chunker();
        let text = "First sentence here with words. Second sentence follows right after. \
                    Third sentence makes it longer. Fourth sentence ends it.";
        let chunks = chunker.chunk(text, DocumentType::Text);

        assert!(chunks.len() >= 2);
        // Sentence overlap: last two sentences of a flushed chunk reappear.
        assert!(chunks[1].text.contains("Second sentence follows right after."));
    }

    #[test]
    fn empty_input_produces_no_chunks() {
        let chunker = SemanticChunker::default();
        assert!(chunker.chunk("", DocumentType::Text).is_empty());
        assert!(chunker.chunk("   \n\n  ", DocumentType::Text).is_empty());
    }

    #[test]
    fn bubbling_disabled_keeps_text_plain() {
        let chunker = SemanticChunker::new(ChunkerConfig {
            enable_title_bubbling: false,
            ..ChunkerConfig::default()
        });
        let markdown = "# Title\n\nbody text goes here";
        let chunks = chunker.chunk(markdown, DocumentType::Markdown);
        assert_eq!(chunks.len(), 1);
        assert!(!chunks[0].text.contains("[Context:"));
        // The sentinel still marks the heading in the cleaned stream.
        assert!(chunks[0].text.contains("[TITLE_L1] Title [/TITLE]"));
    }

    #[test]
    fn long_sections_produce_overlapping_windows() {
        let chunker = SemanticChunker::new(ChunkerConfig {
            chunk_size: 5,
            chunk_overlap: 2,
            respect_boundaries: true,
            enable_title_bubbling: true,
        });
        let words: Vec<String> = (1..=12).map(|i| format!("w{i}")).collect();
        let markdown = format!("# Long\n\n{}", words.join(" "));
        let chunks = chunker.chunk(&markdown, DocumentType::Markdown);

        assert!(chunks.len() > 1);
        // Step is chunk_size - overlap = 3, so the second window starts at w4.
        assert!(chunks[1].text.contains("w4"));
        for chunk in &chunks {
            assert!(chunk.word_count <= 5);
        }
    }
}
