//! Error types for the batch review framework.

use std::fmt;

/// Result type for batch review operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the batch review framework.
///
/// All fallible operations return `Result<T>` where `Result` is defined as
/// `std::result::Result<T, Error>`. Different variants represent different
/// failure modes. Nothing here is fatal to the process: every failure is
/// local to one review session and recoverable by returning to the
/// reviewing phase (and reloading, where staleness is involved).
///
/// Note that pre-submission findings (empty batch, invalid amounts) are NOT
/// errors: they travel in [`crate::summary::BatchSummary::issues`] so the
/// caller can render them next to the totals. `Error` is reserved for
/// operations that could not complete.
#[derive(Debug, Clone)]
pub enum Error {
    /// Eligibility provider failed to produce line items.
    ///
    /// Common causes:
    /// - Backend query failure
    /// - Malformed response payload
    ///
    /// **Recovery:** Retry the load (see `LoadConfig::with_retry`).
    Provider(String),

    /// Transport-level failure (network error, timeout).
    ///
    /// No partial state is committed on the client: the aggregator has no
    /// side effects and only the confirm operation could partially apply,
    /// which is the backend's responsibility.
    ///
    /// **Recovery:** Retry the operation.
    Transport(String),

    /// The confirm operation rejected the batch.
    ///
    /// Server-side validation failed for the submitted batch. The session
    /// returns to the reviewing phase with exclusion state preserved.
    ConfirmRejected(String),

    /// The batch went stale between load and confirm.
    ///
    /// An eligible item was paid or removed by another actor. Detected only
    /// by the confirm operation's rejection.
    ///
    /// **Recovery:** Reload the eligibility list, re-review, confirm again.
    StaleBatch(String),

    /// Credential provider could not produce a usable credential.
    Credential(String),

    /// Date range is inverted (`from` is after `to`).
    InvalidRange {
        /// Requested start date (ISO format)
        from: String,
        /// Requested end date (ISO format)
        to: String,
    },

    /// Monetary value could not be parsed exactly.
    ///
    /// Raised by `Money::from_str` for non-numeric input, more than two
    /// fractional digits, or values that overflow minor units.
    InvalidAmount(String),

    /// Operation is not legal in the session's current phase.
    ///
    /// Example: calling `confirm()` while a confirm is already in flight,
    /// or toggling exclusions before any items are loaded.
    InvalidPhase {
        /// Phase the operation requires
        expected: &'static str,
        /// Phase the session is actually in
        found: String,
    },

    /// Confirm was attempted while blocking issues are present.
    ///
    /// The summary's `can_process` flag is false; the message lists the
    /// blocking issue kinds.
    NotProcessable(String),

    /// Confirm refused because the session saw a staleness rejection and
    /// the eligibility list has not been reloaded since.
    NeedsReload,

    /// Integer overflow while folding monetary amounts.
    ///
    /// Practically unreachable for sane inputs (i64 minor units cover nine
    /// quintillion cents) but the fold never wraps silently.
    Overflow(String),

    /// Generic error with custom message.
    Other(String),
}

impl Error {
    /// True for failures worth retrying without user intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Provider(_) | Error::Transport(_))
    }

    /// True when the failure means the loaded item set is out of date.
    pub fn is_stale(&self) -> bool {
        matches!(self, Error::StaleBatch(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Provider(msg) => write!(f, "Provider error: {}", msg),
            Error::Transport(msg) => write!(f, "Transport error: {}", msg),
            Error::ConfirmRejected(msg) => write!(f, "Confirm rejected: {}", msg),
            Error::StaleBatch(msg) => write!(f, "Stale batch: {}", msg),
            Error::Credential(msg) => write!(f, "Credential error: {}", msg),
            Error::InvalidRange { from, to } => {
                write!(f, "Invalid date range: {} is after {}", from, to)
            }
            Error::InvalidAmount(msg) => write!(f, "Invalid amount: {}", msg),
            Error::InvalidPhase { expected, found } => {
                write!(f, "Invalid phase: expected {}, found {}", expected, found)
            }
            Error::NotProcessable(msg) => write!(f, "Batch not processable: {}", msg),
            Error::NeedsReload => {
                write!(f, "Eligibility list is stale: reload before confirming")
            }
            Error::Overflow(msg) => write!(f, "Arithmetic overflow: {}", msg),
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            Error::Transport(e.to_string())
        } else {
            Error::Provider(e.to_string())
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Transport(e.to_string())
    }
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Error::Other(e)
    }
}

impl From<&str> for Error {
    fn from(e: &str) -> Self {
        Error::Other(e.to_string())
    }
}
