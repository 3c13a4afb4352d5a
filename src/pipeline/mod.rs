//! Pipeline stages for one chapter run.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and the orchestrator in [`crate::convert`] stays a flat sequence.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ text ──▶ llm ──▶ (render) ──▶ artifacts
//! (URL/path) (pdfium) (AI)   (table/graph) (files)
//! ```
//!
//! 1. [`input`]: canonicalise the user-supplied path or URL to a local PDF,
//!    downloading into the run's cache when needed
//! 2. [`text`]: pull page text out with pdfium inside `spawn_blocking`
//! 3. [`llm`]: structure extraction and study planner, the only stage
//!    talking to a model
//! 4. [`artifacts`]: directory layout, atomic writes, documentation body
//!
//! [`postprocess`] holds the deterministic text rules used on both sides of
//! the AI call; [`retry`] is the backoff loop shared by downloads and AI calls.

pub mod artifacts;
pub mod input;
pub mod llm;
pub mod postprocess;
pub mod retry;
pub mod text;
