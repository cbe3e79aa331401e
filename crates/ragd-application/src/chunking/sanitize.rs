//! Markup sanitizers.
//!
//! `strip_scripts_and_styles` runs before chunking so heading structure
//! survives for the chunker; the full strippers produce plain text and
//! back the emptiness check.

use std::sync::LazyLock;

use regex::Regex;

static SCRIPT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("script pattern is valid")
});
static STYLE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("style pattern is valid")
});
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"<[^>]+>").expect("tag pattern is valid")
});
static MD_LINK: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"\[([^\]]+)\]\([^\)]+\)").expect("link pattern is valid")
});
static MD_CODE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"`{1,3}[^`]+`{1,3}").expect("code pattern is valid")
});
static MD_EMPHASIS: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"[*_]{1,3}([^*_]+)[*_]{1,3}").expect("emphasis pattern is valid")
});
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"\s+").expect("whitespace pattern is valid")
});

/// Remove script and style blocks, keeping the rest of the markup.
#[must_use]
pub fn strip_scripts_and_styles(html: &str) -> String {
    let html = SCRIPT_BLOCK.replace_all(html, "");
    STYLE_BLOCK.replace_all(&html, "").into_owned()
}

/// Reduce HTML to plain text.
#[must_use]
pub fn strip_html(html: &str) -> String {
    let html = strip_scripts_and_styles(html);
    let text = HTML_TAG.replace_all(&html, " ");
    WHITESPACE.replace_all(&text, " ").trim().to_owned()
}

/// Reduce Markdown to plain text (links keep their labels).
#[must_use]
pub fn strip_markdown(markdown: &str) -> String {
    let text = MD_LINK.replace_all(markdown, "$1");
    let text = MD_CODE.replace_all(&text, " ");
    let text = MD_EMPHASIS.replace_all(&text, "$1");
    WHITESPACE.replace_all(&text, " ").trim().to_owned()
}
