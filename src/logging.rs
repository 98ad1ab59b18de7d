/// Structured logging for the laureate pipeline
///
/// Installs a `tracing` subscriber with console output and an optional
/// plain-text log file, and provides the stage tags, failure classification
/// and summary helpers the pipeline logs through.

use std::fmt;
use std::fs::OpenOptions;

use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt as tracing_fmt, prelude::*};

use crate::config::LoggingConfig;
use crate::model::{FetchError, PipelineError};

// ---------------------------------------------------------------------------
// Pipeline stages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Normalize,
    Enrich,
    Aggregate,
    Output,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Fetch => write!(f, "FETCH"),
            Stage::Normalize => write!(f, "NORM"),
            Stage::Enrich => write!(f, "GEO"),
            Stage::Aggregate => write!(f, "AGG"),
            Stage::Output => write!(f, "OUT"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Unexpected failure - malformed request, changed response format, local network fault
    Unexpected,
    /// Unknown - remote outage or anything we cannot attribute
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Classify a page fetch failure
pub fn classify_fetch_failure(err: &FetchError) -> FailureType {
    match err {
        // 4xx means we built a bad request
        FetchError::HttpStatus { status, .. } if (400..500).contains(status) => {
            FailureType::Unexpected
        }
        // 5xx is the API's problem; 3xx we do not follow
        FetchError::HttpStatus { .. } => FailureType::Unknown,
        FetchError::Request(_) => FailureType::Unexpected,
        FetchError::Parse(_) => FailureType::Unexpected,
    }
}

// ---------------------------------------------------------------------------
// Subscriber setup
// ---------------------------------------------------------------------------

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over `config.level`. The returned guard flushes the file
/// writer when dropped, so the caller keeps it alive for the whole run.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>, PipelineError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| PipelineError::Config(format!("invalid log level '{}': {}", config.level, e)))?;

    let console_layer = tracing_fmt::layer().with_writer(std::io::stderr);

    let (file_layer, guard) = match &config.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = tracing_fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| PipelineError::Config(format!("logger already installed: {}", e)))?;

    Ok(guard)
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a failed page fetch with automatic classification
pub fn log_fetch_failure(offset: usize, err: &FetchError) {
    let failure_type = classify_fetch_failure(err);
    let message = format!("page at offset {} failed [{}]: {}", offset, failure_type, err);

    match failure_type {
        FailureType::Unexpected => error!(stage = %Stage::Fetch, "{}", message),
        FailureType::Unknown => warn!(stage = %Stage::Fetch, "{}", message),
    }
}

// ---------------------------------------------------------------------------
// Ingest Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of one ingestion run
pub fn log_ingest_summary(pages: usize, records: usize, rows: usize, skipped: usize, truncated: bool) {
    let message = format!(
        "Ingest complete: {} pages, {} records, {} rows, {} skipped{}",
        pages,
        records,
        rows,
        skipped,
        if truncated { " (truncated)" } else { "" }
    );

    if rows == 0 {
        error!(stage = %Stage::Normalize, "{}", message);
    } else if skipped > 0 || truncated {
        warn!(stage = %Stage::Normalize, "{}", message);
    } else {
        info!(stage = %Stage::Normalize, "{}", message);
    }
}
