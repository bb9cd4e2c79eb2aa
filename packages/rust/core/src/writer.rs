//! Writer: chapter prose and chapter summaries.
//!
//! Both operations share the same chat capability with a fixed e-book
//! writing system role. The chapter instruction is a long fixed template
//! parameterized only by topic and chapter title; the model is trusted to
//! self-regulate on redundancy across chapters.

use tracing::{debug, instrument};

use bookforge_openai::ChatClient;
use bookforge_shared::Result;

/// System role shared by chapter writing and summarization.
const WRITER_ROLE: &str = "You are an assistant that writes content for e-books.";

/// Generate the markdown body for one chapter.
///
/// Code-fence markers wrapping the whole response are stripped before the
/// text is returned.
#[instrument(skip_all, fields(chapter = %chapter_title))]
pub async fn write_chapter(chat: &ChatClient, topic: &str, chapter_title: &str) -> Result<String> {
    let instruction = chapter_instruction(topic, chapter_title);
    let content = chat.complete(WRITER_ROLE, &instruction).await?;
    let content = strip_code_fence(&content);
    debug!(chars = content.len(), "chapter written");
    Ok(content)
}

/// Summarize chapter content in 2–3 sentences (used for image prompts).
#[instrument(skip_all)]
pub async fn summarize(chat: &ChatClient, chapter_content: &str) -> Result<String> {
    let instruction = format!(
        "Summarize the following chapter content in 2-3 sentences:\n\n{chapter_content}"
    );
    chat.complete(WRITER_ROLE, &instruction).await
}

/// The fixed chapter-writing instruction template.
fn chapter_instruction(topic: &str, chapter_title: &str) -> String {
    format!(
        "Write a detailed content for {topic} book with chapter called {chapter_title}. \
         Use simple and understandable English. Follow the research data and do not \
         create imaginary content. It is suggested but not required to divide the \
         chapter into structured segments similar to an academic book, including any \
         relevant examples, facts, quotes, and notable people or brands only if \
         applicable. Each chapter should be around 750 to 1000 words. Segments might \
         include the following elements, all or a few or even none: an engaging \
         introduction with a brief overview of the segment, practical examples that \
         illustrate key points, factual information and quotes from credible sources \
         or notable figures, a short exercise or activity at the end to reinforce \
         learning, references for the key points made, and a closing summary that \
         recaps the main points discussed in the chapter. Go through past and future \
         topics from the table of contents so that there is no redundant content in \
         this chapter. Do not add prefatory statements, your own status, notes, \
         apologies or inconvenience remarks, such as not having access to the \
         internet, feel free to adjust, or fact-checking disclaimers. Do not leave \
         unfinished sentences. Do not generate any element you lack information for. \
         Make the content print ready without any remarks or feedback from your side. \
         Output should be well formatted markdown, for example H1 for the chapter \
         title and H2, H3 and other headings for segment titles."
    )
}

/// Strip a code fence wrapping the entire response (a leading fence line,
/// possibly carrying a language tag like `markdown`, and a trailing one).
fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();

    if let Some(rest) = trimmed.strip_prefix("```") {
        // Drop the rest of the fence line (it may carry a language tag).
        // A fence with no body line is not a wrapped response; keep it.
        if let Some((_, body)) = rest.split_once('\n') {
            let body = body.trim_end();
            let body = body.strip_suffix("```").unwrap_or(body);
            return body.trim().to_string();
        }
    }

    trimmed.to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
