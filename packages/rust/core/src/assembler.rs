//! Book assembly and persistence.
//!
//! Writes per-chapter markdown files as generation proceeds, merges all
//! chapters into the final document, and saves it with numeric suffix
//! disambiguation on repeat saves. Also writes the `book.json` manifest.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use bookforge_shared::{
    BookForgeError, BookManifest, Chapter, Result, sanitize_filename,
};

use crate::designer::COVER_FILE_NAME;

/// Closing line of every merged document.
pub const CLOSING_LINE: &str = "Thank you for reading.";

/// Merge all chapters into the final markdown document.
///
/// Layout: topic heading, cover image reference, attribution lines, a
/// "Table of Contents" listing, each chapter's full content in TOC order,
/// and the closing thank-you line.
pub fn merge_chapters(topic: &str, chapters: &[Chapter], author: &str, designer: &str) -> String {
    let mut out = format!("# {topic}\n\n");
    out.push_str(&format!("![Cover Page]({COVER_FILE_NAME})\n\n"));
    out.push_str(&format!("### Author: {author}\n"));
    out.push_str(&format!("### Designer: {designer}\n\n"));

    out.push_str("## Table of Contents\n\n");
    for chapter in chapters {
        out.push_str(&format!("- {}\n", chapter.title));
    }
    out.push('\n');

    for chapter in chapters {
        // Chapter content already includes its own heading (and image ref).
        out.push_str(&format!("\n\n{}\n\n", chapter.content));
    }

    out.push_str(&format!("{CLOSING_LINE}\n"));
    out
}

/// Write one chapter's markdown file into the book folder.
///
/// The folder is created lazily if missing. Returns the written path.
#[instrument(skip_all, fields(chapter = %chapter.title))]
pub fn write_chapter_file(folder: &Path, chapter: &Chapter) -> Result<PathBuf> {
    std::fs::create_dir_all(folder).map_err(|e| BookForgeError::io(folder, e))?;

    let path = folder.join(format!("{}.md", sanitize_filename(&chapter.title)));
    std::fs::write(&path, &chapter.content).map_err(|e| BookForgeError::io(&path, e))?;

    debug!(path = %path.display(), "wrote chapter file");
    Ok(path)
}

/// Save the merged document as `<sanitized-topic>.md`, appending `_01`,
/// `_02`, … when the file already exists. Returns the written path.
#[instrument(skip_all, fields(topic = %topic))]
pub fn save_book(folder: &Path, topic: &str, content: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(folder).map_err(|e| BookForgeError::io(folder, e))?;

    let base = sanitize_filename(topic);
    let mut path = folder.join(format!("{base}.md"));
    let mut counter = 1;
    while path.exists() {
        path = folder.join(format!("{base}_{counter:02}.md"));
        counter += 1;
    }

    std::fs::write(&path, content).map_err(|e| BookForgeError::io(&path, e))?;

    info!(path = %path.display(), "saved merged book");
    Ok(path)
}

/// Write the `book.json` manifest next to the merged document.
pub fn write_manifest(folder: &Path, manifest: &BookManifest) -> Result<()> {
    let path = folder.join("book.json");
    let json = serde_json::to_string_pretty(manifest)
        .map_err(|e| BookForgeError::validation(format!("manifest serialization failed: {e}")))?;
    std::fs::write(&path, json).map_err(|e| BookForgeError::io(&path, e))?;

    debug!(path = %path.display(), "wrote book manifest");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
