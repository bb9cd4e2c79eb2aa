//! Designer: cover and chapter artwork.
//!
//! Prompt templates are pure functions; rendering issues one image
//! generation per asset and persists the bytes to the book folder. A failed
//! image never aborts the run — the caller logs and skips that asset.

use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use bookforge_openai::ImageClient;
use bookforge_shared::{BookForgeError, Result, sanitize_filename};

/// Cover image file name, one per book.
pub const COVER_FILE_NAME: &str = "cover_page.png";

/// Total character budget for an image prompt.
const MAX_PROMPT_CHARS: usize = 3800;

/// Marker appended when a chapter summary had to be truncated.
const TRUNCATION_MARKER: &str = "...";

/// Build the cover artwork prompt for a book topic.
pub fn cover_prompt(topic: &str) -> String {
    format!(
        "Create an artwork design on subject '{topic}'. The design should be minimal, \
         beautiful, and relevant to the topic. The artwork should not be too imaginary. \
         The artwork should not have actual book, book cover, book mockups and texts."
    )
}

/// Build the chapter artwork prompt, truncating the summary so the whole
/// prompt stays within the character budget.
pub fn chapter_prompt(chapter_title: &str, chapter_summary: &str) -> String {
    let base = format!(
        "Create an artwork design for the chapter titled '{chapter_title}'. The design \
         should be minimal, beautiful, and relevant to the topic. The artwork should \
         not be too imaginary. The artwork should not have actual book, book cover, \
         book mockups and texts. Here is a brief summary of the chapter: "
    );

    let budget = MAX_PROMPT_CHARS
        .saturating_sub(base.chars().count())
        .saturating_sub(TRUNCATION_MARKER.len());

    if chapter_summary.chars().count() > budget {
        let truncated: String = chapter_summary.chars().take(budget).collect();
        format!("{base}{truncated}{TRUNCATION_MARKER}")
    } else {
        format!("{base}{chapter_summary}")
    }
}

/// Deterministic image file name for a chapter title.
pub fn image_file_name(chapter_title: &str) -> String {
    format!("{}_image.png", sanitize_filename(chapter_title))
}

/// Markdown reference to a chapter's image, prefixed to the chapter body.
pub fn image_reference(chapter_title: &str) -> String {
    format!(
        "![{chapter_title} Image]({})\n\n",
        image_file_name(chapter_title)
    )
}

/// Generate and persist the cover image. Returns the written path.
#[instrument(skip_all, fields(topic = %topic))]
pub async fn render_cover(image: &ImageClient, folder: &Path, topic: &str) -> Result<PathBuf> {
    let bytes = image.generate(&cover_prompt(topic)).await?;
    write_image(folder, COVER_FILE_NAME, &bytes)
}

/// Generate and persist one chapter image. Returns the written path.
#[instrument(skip_all, fields(chapter = %chapter_title))]
pub async fn render_chapter_image(
    image: &ImageClient,
    folder: &Path,
    chapter_title: &str,
    chapter_summary: &str,
) -> Result<PathBuf> {
    let prompt = chapter_prompt(chapter_title, chapter_summary);
    let bytes = image.generate(&prompt).await?;
    write_image(folder, &image_file_name(chapter_title), &bytes)
}

fn write_image(folder: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(folder).map_err(|e| BookForgeError::io(folder, e))?;

    let path = folder.join(file_name);
    std::fs::write(&path, bytes).map_err(|e| BookForgeError::io(&path, e))?;

    debug!(path = %path.display(), bytes = bytes.len(), "wrote image");
    Ok(path)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cover_prompt_names_the_topic() {
        let prompt = cover_prompt("Modern Beekeeping");
        assert!(prompt.contains("'Modern Beekeeping'"));
        assert!(prompt.contains("minimal"));
    }

    #[test]
    fn short_summary_passes_through() {
        let prompt = chapter_prompt("CHAPTER 01 - The Hive", "Bees live in hives.");
        assert!(prompt.ends_with("Bees live in hives."));
        assert!(!prompt.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn long_summary_is_truncated_within_budget() {
        let summary = "bee ".repeat(2000);
        let prompt = chapter_prompt("CHAPTER 01 - The Hive", &summary);
        assert!(prompt.chars().count() <= MAX_PROMPT_CHARS);
        assert!(prompt.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn image_names_are_deterministic_and_safe() {
        assert_eq!(
            image_file_name("CHAPTER 01 - The Hive"),
            "CHAPTER_01_-_The_Hive_image.png"
        );
        // Same input, same name
        assert_eq!(
            image_file_name("CHAPTER 01 - The Hive"),
            image_file_name("CHAPTER 01 - The Hive")
        );
    }

    #[test]
    fn image_reference_points_at_the_file() {
        let md = image_reference("CHAPTER 01 - The Hive");
        assert_eq!(
            md,
            "![CHAPTER 01 - The Hive Image](CHAPTER_01_-_The_Hive_image.png)\n\n"
        );
    }
}
