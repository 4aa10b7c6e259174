//! Segment translation: glossary masking, batching, retries and response validation

use rayon::prelude::*;
use regex::{Captures, Regex};
use std::sync::{Arc, OnceLock};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use super::backend::TranslationBackend;
use super::cache::TranslationCache;
use super::extractor::TextSegment;
use super::glossary::{Glossary, ProtectionMap, is_fully_masked};
use crate::error::BackendError;
use crate::utils::{needs_translation, split_edge_whitespace, truncate_display};

#[derive(Debug, Clone, PartialEq)]
pub enum SegmentStatus {
    Ok,
    Failed(BackendError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranslationResult {
    pub segment_id: usize,
    /// Translation on success, the untouched source text on failure
    pub translated_text: String,
    pub status: SegmentStatus,
}

impl TranslationResult {
    fn ok(segment_id: usize, text: String) -> Self {
        Self {
            segment_id,
            translated_text: text,
            status: SegmentStatus::Ok,
        }
    }

    fn failed(segment: &TextSegment, error: BackendError) -> Self {
        Self {
            segment_id: segment.id,
            translated_text: segment.text.clone(),
            status: SegmentStatus::Failed(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == SegmentStatus::Ok
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts per request, first call included
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TranslateOptions {
    pub batch_size: usize,
    pub concurrency: usize,
    pub retry: RetryPolicy,
    pub max_length_ratio: f64,
    pub length_slack: usize,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        Self {
            batch_size: 20,
            concurrency: 4,
            retry: RetryPolicy::default(),
            max_length_ratio: 3.0,
            length_slack: 40,
        }
    }
}

struct Pending<'s> {
    index: usize,
    segment: &'s TextSegment,
    lead: &'s str,
    trail: &'s str,
    masked: String,
    map: ProtectionMap,
    spacing: SpacingMap,
}

fn spacing_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \u{00A0}]{2,}").unwrap())
}

/// Matches a spacing token together with the single spaces padding it.
fn spacing_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r" ?⟦\s*[Ww]\s*(\d+)\s*⟧ ?").unwrap())
}

/// Interior runs of two or more spaces, swapped for `⟦W{n}⟧` tokens so the
/// backend cannot collapse them.
#[derive(Debug, Clone, Default)]
struct SpacingMap {
    runs: Vec<String>,
}

impl SpacingMap {
    fn mask(text: &str) -> (String, Self) {
        let mut map = Self::default();
        let masked = spacing_re()
            .replace_all(text, |caps: &Captures| {
                let tok = format!(" ⟦W{}⟧ ", map.runs.len());
                map.runs.push(caps[0].to_string());
                tok
            })
            .into_owned();
        (masked, map)
    }

    fn missing_in(&self, text: &str) -> Vec<String> {
        let found: Vec<usize> = spacing_token_re()
            .captures_iter(text)
            .filter_map(|c| c[1].parse().ok())
            .collect();
        (0..self.runs.len())
            .filter(|i| !found.contains(i))
            .map(|i| format!("⟦W{}⟧", i))
            .collect()
    }

    fn restore(&self, text: &str) -> String {
        if self.runs.is_empty() {
            return text.to_string();
        }
        spacing_token_re()
            .replace_all(text, |caps: &Captures| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| self.runs.get(i))
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

fn separators(text: &str) -> Vec<char> {
    text.chars().filter(|c| matches!(c, '\t' | '\n')).collect()
}

pub struct SegmentTranslator<'a> {
    backend: &'a dyn TranslationBackend,
    glossary: &'a Glossary,
    cache: Option<&'a TranslationCache>,
    options: TranslateOptions,
}

impl<'a> SegmentTranslator<'a> {
    pub fn new(backend: &'a dyn TranslationBackend, glossary: &'a Glossary) -> Self {
        Self {
            backend,
            glossary,
            cache: None,
            options: TranslateOptions::default(),
        }
    }

    pub fn with_cache(mut self, cache: Option<&'a TranslationCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_options(mut self, options: TranslateOptions) -> Self {
        self.options = options;
        self
    }

    pub fn translate(&self, segments: &[TextSegment], target_lang: &str) -> Vec<TranslationResult> {
        self.translate_with_progress(segments, target_lang, None::<fn(usize)>)
    }

    /// One result per segment, in input order. `progress` receives the number
    /// of segments resolved so far.
    pub fn translate_with_progress<F>(
        &self,
        segments: &[TextSegment],
        target_lang: &str,
        progress: Option<F>,
    ) -> Vec<TranslationResult>
    where
        F: Fn(usize) + Send + Sync,
    {
        let provider = self.backend.name();
        let mut results: Vec<Option<TranslationResult>> = vec![None; segments.len()];
        let mut pending: Vec<Pending> = Vec::new();

        for (index, segment) in segments.iter().enumerate() {
            let (lead, core, trail) = split_edge_whitespace(&segment.text);
            if !needs_translation(core) {
                results[index] = Some(TranslationResult::ok(segment.id, segment.text.clone()));
                continue;
            }

            let (masked, map) = self.glossary.protect_all(core);
            if is_fully_masked(&masked) {
                let restored = self.glossary.restore_all(&masked, &map);
                results[index] = Some(TranslationResult::ok(
                    segment.id,
                    format!("{}{}{}", lead, restored, trail),
                ));
                continue;
            }

            let (masked, spacing) = SpacingMap::mask(&masked);
            if let Some(cached) = self
                .cache
                .and_then(|c| c.get(&masked, target_lang, provider))
            {
                let restored = self.glossary.restore_all(&spacing.restore(&cached), &map);
                results[index] = Some(TranslationResult::ok(
                    segment.id,
                    format!("{}{}{}", lead, restored, trail),
                ));
                continue;
            }

            pending.push(Pending {
                index,
                segment,
                lead,
                trail,
                masked,
                map,
                spacing,
            });
        }

        let resolved = segments.len() - pending.len();
        tracing::debug!(
            "{} segments resolved locally, {} sent to {}",
            resolved,
            pending.len(),
            provider
        );
        if let Some(cb) = &progress {
            cb(resolved);
        }

        if !pending.is_empty() {
            let counter = Arc::new(AtomicUsize::new(resolved));
            let batches: Vec<&[Pending]> = pending.chunks(self.options.batch_size.max(1)).collect();

            let run = |batch: &&[Pending]| {
                let out = self.translate_batch(batch, target_lang);
                let done = counter.fetch_add(batch.len(), Ordering::SeqCst) + batch.len();
                if let Some(cb) = &progress {
                    cb(done);
                }
                out
            };

            // Batch mode already runs each document on a bounded pool; share it.
            let batch_results: Vec<Vec<TranslationResult>> = if rayon::current_thread_index().is_some() {
                batches.par_iter().map(run).collect()
            } else {
                match rayon::ThreadPoolBuilder::new()
                    .num_threads(self.options.concurrency.max(1))
                    .build()
                {
                    Ok(pool) => pool.install(|| batches.par_iter().map(run).collect()),
                    Err(e) => {
                        tracing::warn!("Worker pool unavailable, translating sequentially: {}", e);
                        batches.iter().map(run).collect()
                    }
                }
            };

            for (item, result) in pending.iter().zip(batch_results.into_iter().flatten()) {
                results[item.index] = Some(result);
            }
        }

        segments
            .iter()
            .zip(results)
            .map(|(segment, result)| {
                result.unwrap_or_else(|| {
                    TranslationResult::failed(
                        segment,
                        BackendError::InvalidResponse("No result produced".to_string()),
                    )
                })
            })
            .collect()
    }

    fn translate_batch(&self, batch: &[Pending], target_lang: &str) -> Vec<TranslationResult> {
        let texts: Vec<String> = batch.iter().map(|p| p.masked.clone()).collect();
        let responses = self.call_with_retry(&texts, target_lang);

        batch
            .iter()
            .zip(responses)
            .map(|(item, response)| match self.validate(item, response) {
                Ok(masked_translation) => {
                    if let Some(cache) = self.cache {
                        if let Err(e) = cache.set(
                            &item.masked,
                            target_lang,
                            self.backend.name(),
                            &masked_translation,
                        ) {
                            tracing::debug!("Failed to cache translation: {}", e);
                        }
                    }
                    let restored = self
                        .glossary
                        .restore_all(&item.spacing.restore(&masked_translation), &item.map);
                    TranslationResult::ok(
                        item.segment.id,
                        format!("{}{}{}", item.lead, restored, item.trail),
                    )
                }
                Err(e) => {
                    tracing::warn!(
                        "Segment {} kept original text \"{}\": {}",
                        item.segment.id,
                        truncate_display(&item.segment.text, 40),
                        e
                    );
                    TranslationResult::failed(item.segment, e)
                }
            })
            .collect()
    }

    /// Calls the backend, re-sending only the texts that failed transiently.
    fn call_with_retry(&self, texts: &[String], target_lang: &str) -> Vec<Result<String, BackendError>> {
        let mut results = self.backend.translate_batch(texts, target_lang);
        if results.len() != texts.len() {
            let err = BackendError::InvalidResponse(format!(
                "Backend returned {} results for {} texts",
                results.len(),
                texts.len()
            ));
            return texts.iter().map(|_| Err(err.clone())).collect();
        }

        for attempt in 1..self.options.retry.max_attempts {
            let retry: Vec<usize> = results
                .iter()
                .enumerate()
                .filter(|(_, r)| matches!(r, Err(e) if e.is_transient()))
                .map(|(i, _)| i)
                .collect();
            if retry.is_empty() {
                break;
            }

            let delay = self.options.retry.delay(attempt);
            tracing::debug!(
                "Retrying {} texts (attempt {}) after {:?}",
                retry.len(),
                attempt + 1,
                delay
            );
            thread::sleep(delay);

            let again_texts: Vec<String> = retry.iter().map(|&i| texts[i].clone()).collect();
            let again = self.backend.translate_batch(&again_texts, target_lang);
            if again.len() != again_texts.len() {
                continue;
            }
            for (i, result) in retry.into_iter().zip(again) {
                results[i] = result;
            }
        }

        results
    }

    /// Checks a backend response against the masked input it answers.
    fn validate(
        &self,
        item: &Pending,
        response: Result<String, BackendError>,
    ) -> Result<String, BackendError> {
        let raw = response?;
        let translated = raw.trim();
        if translated.is_empty() {
            return Err(BackendError::InvalidResponse("Empty translation".to_string()));
        }

        let input_len = item.masked.chars().count();
        let limit = ((input_len as f64 * self.options.max_length_ratio).ceil() as usize)
            .max(input_len + self.options.length_slack);
        let output_len = translated.chars().count();
        if output_len > limit {
            return Err(BackendError::InvalidResponse(format!(
                "Response of {} chars exceeds bound of {} for {} char input",
                output_len, limit, input_len
            )));
        }

        let missing = item.map.missing_in(translated);
        if !missing.is_empty() {
            return Err(BackendError::InvalidResponse(format!(
                "Response lost glossary placeholders {:?}",
                missing
            )));
        }

        let missing = item.spacing.missing_in(translated);
        if !missing.is_empty() {
            return Err(BackendError::InvalidResponse(format!(
                "Response lost spacing placeholders {:?}",
                missing
            )));
        }

        if separators(translated) != separators(&item.masked) {
            return Err(BackendError::InvalidResponse(
                "Response changed the tab and line break layout".to_string(),
            ));
        }

        Ok(translated.to_string())
    }
}
