//! Per-document orchestration and parallel batch mode

use rayon::prelude::*;
use std::path::{Path, PathBuf};

use super::backend::TranslationBackend;
use super::cache::TranslationCache;
use super::extractor::{ExtractorOptions, TextExtractor};
use super::glossary::Glossary;
use super::reassembler;
use super::translator::{SegmentStatus, SegmentTranslator, TranslateOptions};
use crate::docx::Document;
use crate::error::DocumentError;
use crate::utils::same_file;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Extracting,
    Translating,
    Reassembling,
    Done,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentReport {
    pub segments: usize,
    /// Segments whose text changed
    pub translated: usize,
    /// Segments resolved without a change (numbers, protected terms)
    pub unchanged: usize,
    /// Segments that kept their original text after a backend failure
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub target_lang: String,
    pub extractor: ExtractorOptions,
    pub translate: TranslateOptions,
}

impl PipelineOptions {
    pub fn new(target_lang: &str) -> Self {
        Self {
            target_lang: target_lang.to_string(),
            extractor: ExtractorOptions::default(),
            translate: TranslateOptions::default(),
        }
    }
}

type Progress<'a> = Box<dyn Fn(usize, usize) + Send + Sync + 'a>;

pub struct DocumentPipeline<'a> {
    backend: &'a dyn TranslationBackend,
    glossary: &'a Glossary,
    cache: Option<&'a TranslationCache>,
    options: PipelineOptions,
    progress: Option<Progress<'a>>,
    state: PipelineState,
}

impl<'a> DocumentPipeline<'a> {
    pub fn new(
        backend: &'a dyn TranslationBackend,
        glossary: &'a Glossary,
        options: PipelineOptions,
    ) -> Self {
        Self {
            backend,
            glossary,
            cache: None,
            options,
            progress: None,
            state: PipelineState::Idle,
        }
    }

    pub fn with_cache(mut self, cache: Option<&'a TranslationCache>) -> Self {
        self.cache = cache;
        self
    }

    /// `progress(done, total)` is called as segments resolve.
    pub fn with_progress<F>(mut self, progress: F) -> Self
    where
        F: Fn(usize, usize) + Send + Sync + 'a,
    {
        self.progress = Some(Box::new(progress));
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Translates `doc` in place. Per-segment failures are counted in the report;
    /// only document-level errors are returned.
    pub fn translate_document(&mut self, doc: &mut Document) -> Result<DocumentReport, DocumentError> {
        self.state = PipelineState::Extracting;
        let segments = TextExtractor::with_options(self.options.extractor)
            .extract(doc)
            .map_err(|e| self.fail(e))?;

        self.state = PipelineState::Translating;
        let total = segments.len();
        let translator = SegmentTranslator::new(self.backend, self.glossary)
            .with_cache(self.cache)
            .with_options(self.options.translate.clone());
        let results = match &self.progress {
            Some(cb) => translator.translate_with_progress(
                &segments,
                &self.options.target_lang,
                Some(|done: usize| cb(done, total)),
            ),
            None => translator.translate(&segments, &self.options.target_lang),
        };

        self.state = PipelineState::Reassembling;
        reassembler::apply(doc, &segments, &results).map_err(|e| self.fail(e))?;

        let mut report = DocumentReport {
            segments: total,
            ..DocumentReport::default()
        };
        for (segment, result) in segments.iter().zip(&results) {
            match result.status {
                SegmentStatus::Failed(_) => report.failed += 1,
                SegmentStatus::Ok if result.translated_text == segment.text => report.unchanged += 1,
                SegmentStatus::Ok => report.translated += 1,
            }
        }

        self.state = PipelineState::Done;
        Ok(report)
    }

    pub fn translate_bytes(&mut self, input: &[u8]) -> Result<(Vec<u8>, DocumentReport), DocumentError> {
        self.state = PipelineState::Idle;
        let mut doc = Document::from_bytes(input).map_err(|e| self.fail(e))?;
        let report = self.translate_document(&mut doc)?;
        let bytes = doc.to_bytes().map_err(|e| self.fail(e))?;
        Ok((bytes, report))
    }

    /// Reads `input` and writes the translation to `output`. Nothing is written
    /// unless every step succeeded.
    pub fn translate_file(&mut self, input: &Path, output: &Path) -> Result<DocumentReport, DocumentError> {
        self.state = PipelineState::Idle;
        if same_file(input, output) {
            return Err(self.fail(DocumentError::OutputIsInput(
                output.display().to_string(),
            )));
        }
        let mut doc = Document::open(input).map_err(|e| self.fail(e))?;
        let report = self.translate_document(&mut doc)?;
        doc.save(output).map_err(|e| self.fail(e))?;

        tracing::info!(
            "{} -> {}: {} translated, {} failed",
            input.display(),
            output.display(),
            report.translated,
            report.failed
        );
        Ok(report)
    }

    fn fail(&mut self, e: DocumentError) -> DocumentError {
        self.state = PipelineState::Failed;
        e
    }
}

#[derive(Debug, Clone)]
pub struct BatchJob {
    pub input: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug)]
pub struct DocumentOutcome {
    pub input: PathBuf,
    pub output: PathBuf,
    pub result: Result<DocumentReport, DocumentError>,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub documents: Vec<DocumentOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.documents.iter().filter(|d| d.result.is_ok()).count()
    }

    pub fn failed_documents(&self) -> usize {
        self.documents.len() - self.succeeded()
    }

    pub fn failed_segments(&self) -> usize {
        self.reports().map(|r| r.failed).sum()
    }

    pub fn translated_segments(&self) -> usize {
        self.reports().map(|r| r.translated).sum()
    }

    fn reports(&self) -> impl Iterator<Item = &DocumentReport> {
        self.documents.iter().filter_map(|d| d.result.as_ref().ok())
    }
}

/// Runs one pipeline per job across a worker pool. Outcomes keep job order.
/// A failing document never affects the others.
pub fn translate_documents<F>(
    jobs: &[BatchJob],
    backend: &dyn TranslationBackend,
    glossary: &Glossary,
    cache: Option<&TranslationCache>,
    options: &PipelineOptions,
    concurrency: usize,
    on_done: F,
) -> BatchReport
where
    F: Fn(&DocumentOutcome) + Send + Sync,
{
    let run = |job: &BatchJob| {
        let result = DocumentPipeline::new(backend, glossary, options.clone())
            .with_cache(cache)
            .translate_file(&job.input, &job.output);
        if let Err(e) = &result {
            tracing::warn!("Failed to translate {}: {}", job.input.display(), e);
        }
        let outcome = DocumentOutcome {
            input: job.input.clone(),
            output: job.output.clone(),
            result,
        };
        on_done(&outcome);
        outcome
    };

    let documents = match rayon::ThreadPoolBuilder::new()
        .num_threads(concurrency.max(1))
        .build()
    {
        Ok(pool) => pool.install(|| jobs.par_iter().map(run).collect()),
        Err(e) => {
            tracing::warn!("Worker pool unavailable, translating sequentially: {}", e);
            jobs.iter().map(run).collect()
        }
    };

    BatchReport { documents }
}
