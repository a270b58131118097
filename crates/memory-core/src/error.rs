//! Crate-wide error taxonomy.
//!
//! Mirrors the taxonomy in the design doc: validation errors reject
//! synchronously, store errors roll back and propagate, provider errors are
//! retried and then surfaced, parse errors are counted rather than thrown.

use thiserror::Error;

pub use crate::store::StorageError;

/// Top-level error type for operations that are allowed to fail outright
/// (anything not running inside a background tick).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CoreError {
    /// Caller supplied invalid input (bad id, out-of-range field, etc).
    #[error("validation error: {0}")]
    Validation(String),

    /// Underlying storage failure.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// LLM or embedder call failed after retries.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// A failure from an injected provider capability (LLM, embedder, sub-agent
/// executor). Carries whether the caller should retry.
#[derive(Debug, Error, Clone)]
#[error("{message}")]
pub struct ProviderError {
    pub message: String,
    pub retryable: bool,
}

impl ProviderError {
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

/// An LLM reply that could not be parsed into the structure a call site
/// expected. Per §7, these are counted, never thrown.
#[derive(Debug, Clone)]
pub struct ParseFailure {
    pub call_site: &'static str,
    pub detail: String,
}

impl std::fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "parse failure in {}: {}", self.call_site, self.detail)
    }
}

/// Summary returned by every background tick entry point. Ticks never
/// propagate errors out of their own entry point; each sub-step failure is
/// logged and folded in here instead.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct TickSummary {
    pub tick: String,
    pub sub_steps_run: Vec<String>,
    pub sub_step_errors: Vec<(String, String)>,
    pub duration_ms: i64,
}

impl TickSummary {
    pub fn new(tick: impl Into<String>) -> Self {
        Self {
            tick: tick.into(),
            ..Default::default()
        }
    }

    pub fn record_ok(&mut self, sub_step: impl Into<String>) {
        self.sub_steps_run.push(sub_step.into());
    }

    pub fn record_err(&mut self, sub_step: impl Into<String>, err: impl std::fmt::Display) {
        let name = sub_step.into();
        tracing::warn!(sub_step = %name, error = %err, "tick sub-step failed, isolating");
        self.sub_step_errors.push((name, err.to_string()));
    }

    pub fn is_clean(&self) -> bool {
        self.sub_step_errors.is_empty()
    }
}
