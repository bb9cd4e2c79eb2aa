//! Core pipeline orchestration and domain logic for BookForge.
//!
//! This crate ties together research retrieval, TOC synthesis, chapter
//! writing, artwork generation, and book assembly into the end-to-end
//! generation workflow (`pipeline::start` / `pipeline::resume`).

pub mod assembler;
pub mod designer;
pub mod organizer;
pub mod pipeline;
pub mod writer;
