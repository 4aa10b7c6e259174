//! Format-preserving DOCX translation.
//!
//! A document is opened as a [`docx::Document`], its runs are extracted into
//! [`translate::extractor::TextSegment`]s, translated through a
//! [`translate::backend::TranslationBackend`] with glossary terms masked, and
//! written back into the same runs with their formatting intact.

pub mod cli;
pub mod config;
pub mod docx;
pub mod error;
pub mod translate;
pub mod utils;
