//! Core domain types for BookForge book projects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current schema version for the book manifest format.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// BookId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one generation run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(pub Uuid);

impl BookId {
    /// Generate a new time-sortable book identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for BookId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for BookId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// ResearchRecord
// ---------------------------------------------------------------------------

/// A single normalized search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Result title, when the search API provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Source URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Extracted text snippet.
    pub snippet: String,
}

/// Normalized search-API response used as generation context.
///
/// Produced once per topic by the Researcher; immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchRecord {
    /// Synthesized answer text (may be empty if search and fallback both
    /// produced nothing — degraded input).
    pub answer: String,
    /// The query that produced this record.
    pub query: String,
    /// Related image URLs.
    #[serde(default)]
    pub images: Vec<String>,
    /// Ordered search hits.
    #[serde(default)]
    pub results: Vec<SearchResult>,
    /// Search API response time in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<f64>,
    /// Suggested follow-up queries.
    #[serde(default)]
    pub follow_up_questions: Vec<String>,
}

impl ResearchRecord {
    /// True when there is nothing to build a TOC from.
    pub fn is_empty(&self) -> bool {
        self.answer.is_empty() && self.results.is_empty()
    }

    /// Join all non-empty result snippets, one per line.
    pub fn joined_snippets(&self) -> String {
        self.results
            .iter()
            .filter(|r| !r.snippet.is_empty())
            .map(|r| r.snippet.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ---------------------------------------------------------------------------
// TableOfContents
// ---------------------------------------------------------------------------

/// Ordered chapter-title list, parsed from LLM output or from a review edit.
///
/// Entries containing the word "SECTION" (any case) are grouping headings:
/// they stay in the stored sequence for display but are excluded from
/// chapter generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableOfContents {
    /// All entries in order, section markers included.
    pub entries: Vec<String>,
}

impl TableOfContents {
    /// Parse a TOC from free text, one entry per line. Blank lines are
    /// dropped; surrounding whitespace is trimmed.
    pub fn from_text(text: &str) -> Self {
        let entries = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();
        Self { entries }
    }

    /// Render the TOC as editable free text, one entry per line.
    pub fn to_text(&self) -> String {
        self.entries.join("\n")
    }

    /// Whether a title is a section marker rather than a generated chapter.
    pub fn is_section_marker(title: &str) -> bool {
        title.to_uppercase().contains("SECTION")
    }

    /// Titles that get generated chapters, in order (section markers skipped).
    pub fn chapter_titles(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .map(String::as_str)
            .filter(|title| !Self::is_section_marker(title))
    }
}

// ---------------------------------------------------------------------------
// Chapter
// ---------------------------------------------------------------------------

/// One generated chapter. Appended to the project's chapter list in TOC
/// order; never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    /// TOC title this chapter was generated for.
    pub title: String,
    /// Markdown body (may be prefixed with an image reference).
    pub content: String,
    /// 2–3 sentence summary, used for image prompts.
    pub summary: String,
}

// ---------------------------------------------------------------------------
// BookManifest
// ---------------------------------------------------------------------------

/// The `book.json` structure written next to the merged document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookManifest {
    /// Schema version for forward compatibility.
    pub schema_version: u32,
    /// Unique identifier for this generation run.
    pub id: BookId,
    /// The book topic.
    pub topic: String,
    /// Tool version that produced this book.
    pub tool_version: String,
    /// Chat model used for text generation.
    pub text_model: String,
    /// Image model used for artwork, when images were enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_model: Option<String>,
    /// Number of generated chapters (section markers excluded).
    pub chapter_count: usize,
    /// Whether cover/chapter artwork was requested.
    pub images_enabled: bool,
    /// When the book was generated.
    pub created_at: DateTime<Utc>,
}
