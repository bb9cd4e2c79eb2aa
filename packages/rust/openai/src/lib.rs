//! OpenAI API clients for BookForge.
//!
//! Two thin clients over the REST API:
//! - [`ChatClient`] — chat completions, the Writer-equivalent capability
//!   behind TOC synthesis, chapter text, summaries, and the research-answer
//!   fallback.
//! - [`ImageClient`] — image generations plus the follow-up download of the
//!   generated asset.
//!
//! Neither client retries; failures map to the shared error taxonomy and the
//! caller decides whether to abort or skip.

pub mod chat;
pub mod image;

pub use chat::ChatClient;
pub use image::ImageClient;
