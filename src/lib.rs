//! # batch-kit
//!
//! A type-safe, provider-agnostic payment batch review framework for Rust.
//!
//! ## Features
//!
//! - **Exact money:** Amounts are integer minor units end-to-end; batch
//!   totals never touch floating point
//! - **One exclusion rule:** The two-set item/freelancer exclusion logic
//!   lives in a single tested place instead of being re-implemented per view
//! - **Pure aggregation:** `(items, exclusions) -> summary` is a
//!   deterministic transform, safe to recompute on every render
//! - **Provider agnostic:** The eligibility query and the confirm operation
//!   are traits the caller implements; the core never speaks HTTP
//! - **Safe confirming:** Phase guards stop double submission, a
//!   deterministic idempotency key makes retries safe, and server totals are
//!   cross-checked against the local summary
//!
//! ## Quick Start
//!
//! ```ignore
//! use batch_kit::{
//!     BatchService, DateRange, FreelancerId, InMemoryApi, StaticCredential,
//! };
//!
//! // 1. Implement EligibilityProvider + ConfirmOperation for your backend
//! //    (InMemoryApi implements both, for tests and demos).
//! let api = InMemoryApi::new(StaticCredential::new("token"));
//!
//! // 2. Share one service across your application.
//! let service = BatchService::new(api.clone(), api);
//!
//! // 3. One review = one session.
//! let mut session = service.open_session();
//! session.load(DateRange::new(from, to)?).await?;
//!
//! // 4. Adjust exclusions; the summary recomputes on demand.
//! session.toggle_freelancer(FreelancerId::from("fl_b"))?;
//! let summary = session.summary();
//! println!("{} items, total {}", summary.included.len(), summary.total_amount);
//!
//! // 5. Confirm when the summary is processable.
//! if summary.can_process {
//!     let outcome = session.confirm().await?;
//!     assert!(!outcome.discrepancy);
//! }
//! ```

#[macro_use]
extern crate log;

pub mod entity;
pub mod error;
pub mod exclusions;
pub mod key;
pub mod money;
pub mod observability;
pub mod provider;
pub mod service;
pub mod session;
pub mod summary;

// Re-exports for convenience
pub use entity::{DateRange, FreelancerId, LineItem, LineItemId};
pub use error::{Error, Result};
pub use exclusions::ExclusionState;
pub use key::BatchKeyBuilder;
pub use money::Money;
pub use provider::{
    BatchResult, ConfirmOperation, ConfirmRequest, CredentialProvider, EligibilityProvider,
    InMemoryApi, StaticCredential,
};
pub use service::BatchService;
pub use session::{ConfirmOutcome, LoadConfig, ReviewSession, SessionPhase};
pub use summary::{summarize, BatchSummary, FreelancerGroup, Issue, IssueKind, Severity};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
