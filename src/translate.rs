//! # Translation Caller Interface
//!
//! The reconciliation engine only consumes fragment files that are already
//! translated. This module is the boundary to whatever produces them: a
//! [`Translator`] turns one source-language text of a given [`FieldKind`] into
//! target-language text.
//!
//! Retrying is a policy object, not a loop inside the caller:
//! [`RetryingTranslator`] wraps any translator, retries only
//! [`TranslateError::RateLimited`], and waits according to a [`RetryPolicy`].
//! The sleeper is injectable so tests run without waiting.
//!
//! [`fill_missing`] fills the empty target-language fields of a fragment
//! document on a bounded worker pool. No transport is provided here.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use log::{debug, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{Error, Result};
use crate::model::{FragmentDoc, Publication};

/// Which kind of text is being translated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Theme,
    Title,
    PublicationTitle,
    Date,
    Source,
    Content,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    /// The remote side asked us to slow down.
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("translation failed: {0}")]
    Failed(String),
    #[error("gave up after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

impl From<TranslateError> for Error {
    fn from(err: TranslateError) -> Self {
        Error::Translation {
            message: err.to_string(),
        }
    }
}

pub trait Translator: Send + Sync {
    fn translate(&self, text: &str, kind: FieldKind) -> std::result::Result<String, TranslateError>;
}

/// Exponential backoff with a cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 2000,
            max_delay_ms: 60_000,
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `attempt` (0-indexed); the first attempt never waits.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let delay = self.initial_delay_ms as f64 * self.multiplier.max(1.0).powi(exponent);
        Duration::from_millis(delay.min(self.max_delay_ms as f64) as u64)
    }
}

/// Retries rate-limited calls of an inner translator.
pub struct RetryingTranslator<T, S = fn(Duration)> {
    inner: T,
    policy: RetryPolicy,
    sleeper: S,
}

impl<T: Translator> RetryingTranslator<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            sleeper: std::thread::sleep,
        }
    }
}

impl<T, S> RetryingTranslator<T, S>
where
    T: Translator,
    S: Fn(Duration) + Send + Sync,
{
    pub fn with_sleeper(inner: T, policy: RetryPolicy, sleeper: S) -> Self {
        Self {
            inner,
            policy,
            sleeper,
        }
    }
}

impl<T, S> Translator for RetryingTranslator<T, S>
where
    T: Translator,
    S: Fn(Duration) + Send + Sync,
{
    fn translate(&self, text: &str, kind: FieldKind) -> std::result::Result<String, TranslateError> {
        let attempts = self.policy.max_attempts.max(1);
        for attempt in 0..attempts {
            let delay = self.policy.delay_for_attempt(attempt);
            if !delay.is_zero() {
                (self.sleeper)(delay);
            }
            match self.inner.translate(text, kind) {
                Err(TranslateError::RateLimited(reason)) => {
                    warn!(
                        "Rate limited on {:?} (attempt {}/{}): {}",
                        kind,
                        attempt + 1,
                        attempts,
                        reason
                    );
                }
                other => return other,
            }
        }
        Err(TranslateError::Exhausted { attempts })
    }
}

/// Outcome of [`fill_missing`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillReport {
    pub translated: usize,
    pub failed: Vec<String>,
}

fn fill(
    slot: &mut Option<String>,
    source: &str,
    kind: FieldKind,
    translator: &dyn Translator,
    report: &Mutex<FillReport>,
) {
    if slot.is_some() || source.trim().is_empty() {
        return;
    }
    let failure = match translator.translate(source, kind) {
        Ok(text) if !text.is_empty() => {
            *slot = Some(text);
            None
        }
        Ok(_) => Some(format!("{:?}: empty translation", kind)),
        Err(e) => Some(format!("{:?}: {}", kind, e)),
    };
    // A worker that panicked mid-update leaves the counts usable.
    let mut report = report.lock().unwrap_or_else(PoisonError::into_inner);
    match failure {
        None => report.translated += 1,
        Some(message) => report.failed.push(message),
    }
}

fn fill_publication(p: &mut Publication, translator: &dyn Translator, report: &Mutex<FillReport>) {
    fill(&mut p.title_ptbr, &p.title, FieldKind::Title, translator, report);
    fill(
        &mut p.publication_title_ptbr,
        &p.publication_title,
        FieldKind::PublicationTitle,
        translator,
        report,
    );
    fill(&mut p.content_ptbr, &p.content, FieldKind::Content, translator, report);
    p.refresh_translation_flag();
}

/// Fills every empty target-language field of `doc` using `workers` threads.
///
/// Fields that fail stay empty and are listed in the report.
pub fn fill_missing(doc: &mut FragmentDoc, translator: &dyn Translator, workers: usize) -> Result<FillReport> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .map_err(|e| Error::Translation {
            message: format!("Failed to start worker pool: {}", e),
        })?;
    let report = Mutex::new(FillReport::default());

    fill(
        &mut doc.theme_name_ptbr,
        &doc.theme_name,
        FieldKind::Theme,
        translator,
        &report,
    );
    pool.install(|| {
        doc.publications
            .par_iter_mut()
            .for_each(|p| fill_publication(p, translator, &report));
    });

    let report = report.into_inner().unwrap_or_else(PoisonError::into_inner);
    debug!(
        "Filled {} fields, {} failed",
        report.translated,
        report.failed.len()
    );
    Ok(report)
}
