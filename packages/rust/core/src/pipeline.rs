//! End-to-end generation pipeline: topic → research → TOC → (review) →
//! chapters → optional artwork → merged book on disk.
//!
//! The human TOC review is an explicit suspension point: [`start`] runs
//! through TOC synthesis and returns, the caller collects an edited TOC,
//! and [`resume`] finishes the run. There is no implicit blocking wait and
//! no way to cancel once `resume` begins.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, instrument, warn};

use bookforge_openai::{ChatClient, ImageClient};
use bookforge_research::Researcher;
use bookforge_shared::{
    BookForgeError, BookId, BookManifest, CURRENT_SCHEMA_VERSION, Chapter, Result,
    TableOfContents, sanitize_filename,
};

use crate::{assembler, designer, organizer, writer};

/// Minimum topic length, in characters.
const MIN_TOPIC_CHARS: usize = 5;

/// Share of the progress bar allocated to TOC completion.
const TOC_PROGRESS_PERCENT: f64 = 15.0;

/// Configuration for one generation run.
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    /// Book topic (at least 5 characters).
    pub topic: String,
    /// Root directory under which the book folder is created.
    pub output_root: PathBuf,
    /// Whether to generate cover and chapter artwork.
    pub generate_images: bool,
    /// Tool version string, recorded in the manifest.
    pub tool_version: String,
}

/// All state for one generation run, passed through pipeline stages.
///
/// Owned value rather than shared mutable state: each stage takes it,
/// appends to it, and hands it on.
#[derive(Debug)]
pub struct BookProject {
    /// Run identifier.
    pub id: BookId,
    /// Book topic.
    pub topic: String,
    /// Book output folder (`<output_root>/<sanitized-topic>/`).
    pub folder: PathBuf,
    /// Table of contents; frozen when `resume` begins.
    pub toc: TableOfContents,
    /// Generated chapters in TOC order; append-only.
    pub chapters: Vec<Chapter>,
    /// Whether artwork generation was requested.
    pub generate_images: bool,
}

/// Output of [`start`]: the pipeline is suspended awaiting TOC review.
#[derive(Debug)]
pub struct TocReady {
    /// The project, with `toc` holding the generated table of contents.
    pub project: BookProject,
}

/// Result of a completed run.
#[derive(Debug)]
pub struct GenerateResult {
    /// Run identifier.
    pub book_id: BookId,
    /// Path to the merged markdown document.
    pub book_path: PathBuf,
    /// The book folder containing chapters, images, and manifest.
    pub folder: PathBuf,
    /// Number of generated chapters.
    pub chapter_count: usize,
    /// Number of images actually written (failed assets are skipped).
    pub images_written: usize,
    /// Total elapsed time across `resume`.
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called with the overall completion percentage (non-decreasing,
    /// ends at exactly 100).
    fn percent(&self, value: f64);
    /// Called when a chapter has been generated and written.
    fn chapter_written(&self, title: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &GenerateResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn percent(&self, _value: f64) {}
    fn chapter_written(&self, _title: &str, _current: usize, _total: usize) {}
    fn done(&self, _result: &GenerateResult) {}
}

// ---------------------------------------------------------------------------
// Stage 1: research + TOC (Idle → ResearchInProgress → TocReady)
// ---------------------------------------------------------------------------

/// Run research and TOC synthesis, then suspend for review.
///
/// Any failure here abandons the run: network errors from the search API,
/// and the degraded-input sentinel when research came back empty.
#[instrument(skip_all, fields(topic = %config.topic))]
pub async fn start(
    config: &GenerateConfig,
    researcher: &Researcher,
    chat: &ChatClient,
    progress: &dyn ProgressReporter,
) -> Result<TocReady> {
    let topic = config.topic.trim().to_string();
    if topic.chars().count() < MIN_TOPIC_CHARS {
        return Err(BookForgeError::validation(format!(
            "topic must be at least {MIN_TOPIC_CHARS} characters long"
        )));
    }

    let id = BookId::new();
    let folder = config.output_root.join(sanitize_filename(&topic));
    std::fs::create_dir_all(&folder).map_err(|e| BookForgeError::io(&folder, e))?;

    info!(%id, folder = %folder.display(), "starting generation run");

    progress.phase("Researching topic");
    let research = researcher.research(&topic, chat).await?;

    progress.phase("Generating table of contents");
    let toc = organizer::build_toc(chat, &topic, &research).await?;

    if organizer::is_sentinel(&toc) {
        return Err(BookForgeError::validation(
            organizer::EMPTY_RESEARCH_SENTINEL,
        ));
    }
    if toc.entries.is_empty() {
        return Err(BookForgeError::validation(
            "the model returned an empty table of contents",
        ));
    }

    progress.percent(TOC_PROGRESS_PERCENT);

    info!(entries = toc.entries.len(), "TOC ready for review");

    Ok(TocReady {
        project: BookProject {
            id,
            topic,
            folder,
            toc,
            chapters: Vec::new(),
            generate_images: config.generate_images,
        },
    })
}

// ---------------------------------------------------------------------------
// Stage 2: chapters + images + merge (ContentGeneration → … → Complete)
// ---------------------------------------------------------------------------

/// Resume the pipeline with the reviewed TOC and run it to completion.
///
/// Chapters are generated strictly in TOC order, one request at a time,
/// skipping section markers. A Writer failure aborts the run; chapter files
/// already written stay on disk. Designer failures only skip that asset.
#[instrument(skip_all, fields(id = %project.id, topic = %project.topic))]
pub async fn resume(
    mut project: BookProject,
    edited_toc: TableOfContents,
    config: &GenerateConfig,
    chat: &ChatClient,
    image: Option<&ImageClient>,
    progress: &dyn ProgressReporter,
) -> Result<GenerateResult> {
    let started = Instant::now();

    // Freeze the reviewed TOC.
    project.toc = edited_toc;

    let image = match (project.generate_images, image) {
        (true, None) => {
            return Err(BookForgeError::config(
                "image generation requested but no image client was provided",
            ));
        }
        (true, Some(client)) => Some(client),
        (false, _) => None,
    };

    let titles: Vec<String> = project.toc.chapter_titles().map(String::from).collect();
    if titles.is_empty() {
        return Err(BookForgeError::validation(
            "table of contents contains no chapter entries",
        ));
    }

    let total_units = progress_units(titles.len(), project.generate_images);
    let mut completed_units = 0usize;

    // --- Chapter generation ---
    progress.phase("Generating chapters");

    for (i, title) in titles.iter().enumerate() {
        let mut content = writer::write_chapter(chat, &project.topic, title).await?;

        if project.generate_images {
            // Reference is added up front; a later image failure leaves it
            // dangling, matching the per-asset skip policy.
            content = format!("{}{content}", designer::image_reference(title));
        }

        let summary = writer::summarize(chat, &content).await?;

        let chapter = Chapter {
            title: title.clone(),
            content,
            summary,
        };
        assembler::write_chapter_file(&project.folder, &chapter)?;
        project.chapters.push(chapter);

        completed_units += 1;
        progress.percent(percent_for(completed_units, total_units));
        progress.chapter_written(title, i + 1, titles.len());
    }

    // --- Artwork (conditional) ---
    let mut images_written = 0usize;

    if let Some(image) = image {
        progress.phase("Generating images");

        match designer::render_cover(image, &project.folder, &project.topic).await {
            Ok(path) => {
                info!(path = %path.display(), "cover image written");
                images_written += 1;
            }
            Err(e) => warn!(error = %e, "cover image failed, skipping"),
        }

        for chapter in &project.chapters {
            match designer::render_chapter_image(
                image,
                &project.folder,
                &chapter.title,
                &chapter.summary,
            )
            .await
            {
                Ok(path) => {
                    info!(path = %path.display(), "chapter image written");
                    images_written += 1;
                }
                Err(e) => {
                    warn!(chapter = %chapter.title, error = %e, "chapter image failed, skipping");
                }
            }

            completed_units += 1;
            progress.percent(percent_for(completed_units, total_units));
        }
    }

    // --- Merge and persist ---
    progress.phase("Finalizing content");

    let designer_model = image.map(|c| c.model().to_string());
    let merged = assembler::merge_chapters(
        &project.topic,
        &project.chapters,
        chat.model(),
        designer_model.as_deref().unwrap_or("none"),
    );
    let book_path = assembler::save_book(&project.folder, &project.topic, &merged)?;

    let manifest = BookManifest {
        schema_version: CURRENT_SCHEMA_VERSION,
        id: project.id.clone(),
        topic: project.topic.clone(),
        tool_version: config.tool_version.clone(),
        text_model: chat.model().to_string(),
        image_model: designer_model,
        chapter_count: project.chapters.len(),
        images_enabled: project.generate_images,
        created_at: chrono::Utc::now(),
    };
    assembler::write_manifest(&project.folder, &manifest)?;

    completed_units += 1;
    progress.percent(percent_for(completed_units, total_units));

    let result = GenerateResult {
        book_id: project.id,
        book_path,
        folder: project.folder,
        chapter_count: project.chapters.len(),
        images_written,
        elapsed: started.elapsed(),
    };

    progress.done(&result);

    info!(
        book_id = %result.book_id,
        chapters = result.chapter_count,
        images = result.images_written,
        elapsed_ms = result.elapsed.as_millis(),
        "generation complete"
    );

    Ok(result)
}

// ---------------------------------------------------------------------------
// Progress accounting
// ---------------------------------------------------------------------------

/// Total progress units after TOC completion: one per chapter, one per
/// chapter image when enabled, plus the final merge step.
fn progress_units(chapter_count: usize, images: bool) -> usize {
    chapter_count * if images { 2 } else { 1 } + 1
}

/// Map completed units onto [15%, 100%]. Completing all units yields
/// exactly 100.
fn percent_for(completed: usize, total: usize) -> f64 {
    TOC_PROGRESS_PERCENT + (100.0 - TOC_PROGRESS_PERCENT) * completed as f64 / total as f64
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_chat() -> ChatClient {
        ChatClient::new("test-key".into(), "gpt-4o".into(), 1500, 0.7).expect("client")
    }

    fn dummy_researcher() -> Researcher {
        Researcher::new("https://search.invalid/search", "test-key".into()).expect("researcher")
    }

    #[test]
    fn progress_units_match_run_shape() {
        assert_eq!(progress_units(8, false), 9);
        assert_eq!(progress_units(8, true), 17);
        assert_eq!(progress_units(1, false), 2);
    }

    #[test]
    fn progress_is_monotonic_and_ends_at_100() {
        for (chapters, images) in [(1, false), (8, false), (8, true), (30, true)] {
            let total = progress_units(chapters, images);
            let mut last = TOC_PROGRESS_PERCENT;
            for completed in 1..=total {
                let pct = percent_for(completed, total);
                assert!(pct >= last, "progress decreased: {pct} < {last}");
                last = pct;
            }
            assert_eq!(last, 100.0);
        }
    }

    #[tokio::test]
    async fn short_topic_is_rejected_before_any_request() {
        let config = GenerateConfig {
            topic: "Bee".into(),
            output_root: std::env::temp_dir(),
            generate_images: false,
            tool_version: "0.1.0-test".into(),
        };

        let err = start(&config, &dummy_researcher(), &dummy_chat(), &SilentProgress)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("at least 5 characters"));
    }

    #[tokio::test]
    async fn resume_requires_image_client_when_images_enabled() {
        let project = BookProject {
            id: BookId::new(),
            topic: "Modern Beekeeping".into(),
            folder: std::env::temp_dir().join(format!("bf-pipeline-{}", uuid::Uuid::now_v7())),
            toc: TableOfContents::from_text("CHAPTER 01 - Bees"),
            chapters: Vec::new(),
            generate_images: true,
        };
        let config = GenerateConfig {
            topic: "Modern Beekeeping".into(),
            output_root: std::env::temp_dir(),
            generate_images: true,
            tool_version: "0.1.0-test".into(),
        };

        let err = resume(
            project,
            TableOfContents::from_text("CHAPTER 01 - Bees"),
            &config,
            &dummy_chat(),
            None,
            &SilentProgress,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("no image client"));
    }

    #[tokio::test]
    async fn resume_rejects_toc_with_only_section_markers() {
        let project = BookProject {
            id: BookId::new(),
            topic: "Modern Beekeeping".into(),
            folder: std::env::temp_dir().join(format!("bf-pipeline-{}", uuid::Uuid::now_v7())),
            toc: TableOfContents { entries: vec![] },
            chapters: Vec::new(),
            generate_images: false,
        };
        let config = GenerateConfig {
            topic: "Modern Beekeeping".into(),
            output_root: std::env::temp_dir(),
            generate_images: false,
            tool_version: "0.1.0-test".into(),
        };

        let err = resume(
            project,
            TableOfContents::from_text("SECTION I - Basics\nSECTION II - Advanced"),
            &config,
            &dummy_chat(),
            None,
            &SilentProgress,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("no chapter entries"));
    }
}
