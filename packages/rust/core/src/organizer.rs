//! ContentOrganizer: table-of-contents synthesis.
//!
//! Turns a research record into an ordered chapter list via one chat
//! request. The human review step (owned by the caller) is the consistency
//! check — no validation happens here beyond line-splitting.

use tracing::{debug, instrument};

use bookforge_openai::ChatClient;
use bookforge_shared::{ResearchRecord, Result, TableOfContents};

/// Sentinel line returned instead of a TOC when there is no research data
/// to work from. Signals failure as a value, not an error.
pub const EMPTY_RESEARCH_SENTINEL: &str =
    "Unable to generate Table of Contents due to lack of research data.";

/// System role for TOC generation.
const ORGANIZER_ROLE: &str =
    "You are an assistant that helps generate a table of contents for an e-book.";

/// Generate a table of contents for `topic` from the research record.
///
/// If the record carries neither an answer nor results, returns the sentinel
/// TOC without issuing any chat request.
#[instrument(skip_all, fields(topic = %topic))]
pub async fn build_toc(
    chat: &ChatClient,
    topic: &str,
    research: &ResearchRecord,
) -> Result<TableOfContents> {
    if research.is_empty() {
        debug!("no research data, returning sentinel TOC");
        return Ok(TableOfContents {
            entries: vec![EMPTY_RESEARCH_SENTINEL.to_string()],
        });
    }

    let instruction = toc_instruction(topic, &research.answer);
    let response = chat.complete(ORGANIZER_ROLE, &instruction).await?;

    let toc = TableOfContents::from_text(&response);
    debug!(entries = toc.entries.len(), "TOC generated");
    Ok(toc)
}

/// True when the TOC is the degraded-input sentinel rather than a real list.
pub fn is_sentinel(toc: &TableOfContents) -> bool {
    toc.entries.len() == 1 && toc.entries[0] == EMPTY_RESEARCH_SENTINEL
}

/// Build the TOC-generation instruction.
fn toc_instruction(topic: &str, answer: &str) -> String {
    format!(
        "Based on the following research data, generate a detailed table of contents \
         for an e-book on '{topic}':\n\n{answer}\n\n\
         Table of contents should only have chapters, but no sub chapters or sections. \
         Table of contents should be systematic, should start with high level topics and \
         gradually increase the depth on the topic rather than a random list. \
         Chapters should have CHAPTER 01 - Chapter name, CHAPTER 02 - Chapter name \
         and so on as prefix. Do not include the text Table of contents as a chapter. \
         Do not generate prefatory or introductory statements. Just show the output."
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
