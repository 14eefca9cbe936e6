//! Review session state machine.
//!
//! One [`ReviewSession`] drives one batch review from date-range selection
//! through exclusion adjustments to the authoritative confirm:
//!
//! ```text
//! Selecting ──load──▶ Reviewing ──confirm──▶ Confirming ──▶ Confirmed
//!                        ▲                       │
//!                        └───────on failure──────┘
//! ```
//!
//! The session runs on whatever single logical actor drives the UI event
//! loop. All state mutation is synchronous; only `load` and `confirm`
//! suspend, and both mutate the session exclusively *after* their network
//! round-trip resolves. Dropping an in-flight `load` future therefore
//! cancels it without touching session state: a slow first query can never
//! overwrite the result of a fast second one, because starting the second
//! requires the first future to be gone.

use crate::entity::{DateRange, FreelancerId, LineItem, LineItemId};
use crate::error::{Error, Result};
use crate::exclusions::ExclusionState;
use crate::key::BatchKeyBuilder;
use crate::observability::{NoOpMetrics, ReviewMetrics};
use crate::provider::{BatchResult, ConfirmOperation, ConfirmRequest, EligibilityProvider};
use crate::summary::{BatchSummary, Severity};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Phase of a review session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// No eligible items loaded yet; choosing a date range.
    #[default]
    Selecting,
    /// Items loaded; exclusions being adjusted, summary recomputing.
    Reviewing,
    /// Confirm submission in flight. No further confirm triggers and no
    /// exclusion toggles until a terminal response arrives.
    Confirming,
    /// Batch committed. Terminal; a new review starts with `load`.
    Confirmed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Selecting => write!(f, "Selecting"),
            SessionPhase::Reviewing => write!(f, "Reviewing"),
            SessionPhase::Confirming => write!(f, "Confirming"),
            SessionPhase::Confirmed => write!(f, "Confirmed"),
        }
    }
}

/// Per-load configuration: retry behavior for the eligibility fetch.
///
/// Only retryable failures (transport, provider) are retried, with
/// exponential backoff. Confirm is never auto-retried by the session; a
/// caller-driven retry is safe thanks to the idempotency key.
///
/// # Example
///
/// ```ignore
/// let config = LoadConfig::default().with_retry(3);
/// session.load_with_config(range, config).await?;
/// ```
#[derive(Clone, Debug, Default)]
pub struct LoadConfig {
    /// Number of retry attempts (0 = no retry).
    pub retry_count: u32,
}

impl LoadConfig {
    /// Set retry count for this load.
    pub fn with_retry(mut self, count: u32) -> Self {
        self.retry_count = count;
        self
    }
}

/// Outcome of a successful confirm, including the cross-check verdict.
#[derive(Clone, Debug)]
pub struct ConfirmOutcome {
    /// The backend's authoritative result.
    pub result: BatchResult,
    /// True when the server's totals differ from the local summary, a
    /// sign of concurrent payment activity worth surfacing to the user.
    pub discrepancy: bool,
}

/// Drives one batch review against an eligibility provider and a confirm
/// operation.
///
/// # Example
///
/// ```ignore
/// let mut session = ReviewSession::new(provider, confirmer);
/// session.load(range).await?;
/// session.toggle_freelancer(FreelancerId::from("fl_b"))?;
/// let summary = session.summary();
/// if summary.can_process {
///     let outcome = session.confirm().await?;
///     println!("paid {} as {}", outcome.result.total_amount, outcome.result.batch_id);
/// }
/// ```
pub struct ReviewSession<P: EligibilityProvider, C: ConfirmOperation> {
    provider: Arc<P>,
    confirmer: Arc<C>,
    metrics: Box<dyn ReviewMetrics>,
    phase: SessionPhase,
    range: Option<DateRange>,
    items: Vec<LineItem>,
    exclusions: ExclusionState,
    generation: u64,
    needs_reload: bool,
}

impl<P: EligibilityProvider, C: ConfirmOperation> ReviewSession<P, C> {
    /// Create a session in the `Selecting` phase.
    pub fn new(provider: Arc<P>, confirmer: Arc<C>) -> Self {
        ReviewSession {
            provider,
            confirmer,
            metrics: Box::new(NoOpMetrics),
            phase: SessionPhase::Selecting,
            range: None,
            items: Vec::new(),
            exclusions: ExclusionState::new(),
            generation: 0,
            needs_reload: false,
        }
    }

    /// Set custom metrics handler.
    pub fn with_metrics(mut self, metrics: Box<dyn ReviewMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// The loaded date range, if any.
    pub fn range(&self) -> Option<DateRange> {
        self.range
    }

    /// The eligible items of the current load, in response order.
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Current exclusion state (read-only; mutate through the toggles).
    pub fn exclusions(&self) -> &ExclusionState {
        &self.exclusions
    }

    /// Monotonic counter identifying the current eligible snapshot.
    /// Bumped on every successful load.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True after a staleness rejection; `confirm` refuses to run until the
    /// eligibility list has been reloaded.
    pub fn needs_reload(&self) -> bool {
        self.needs_reload
    }

    /// Load eligible items for `range` with default configuration.
    pub async fn load(&mut self, range: DateRange) -> Result<()> {
        self.load_with_config(range, LoadConfig::default()).await
    }

    /// Load eligible items for `range`, retrying retryable failures.
    ///
    /// On success the session replaces its eligible snapshot, resets all
    /// exclusions (stale ids from a previous query must never suppress
    /// same-valued ids in the new one), clears any reload requirement, and
    /// enters `Reviewing`.
    ///
    /// Session state is untouched until the fetch resolves, so dropping the
    /// returned future cancels the load cleanly.
    ///
    /// # Errors
    /// - `Error::InvalidPhase` if a confirm is in flight
    /// - the provider's error once retries are exhausted
    pub async fn load_with_config(&mut self, range: DateRange, config: LoadConfig) -> Result<()> {
        if self.phase == SessionPhase::Confirming {
            return Err(self.phase_error("Selecting or Reviewing"));
        }

        let timer = Instant::now();
        let mut attempts = 0;
        let max_attempts = config.retry_count + 1;

        let items = loop {
            attempts += 1;
            match self.provider.fetch_eligible(&range).await {
                Ok(items) => break items,
                Err(e) => {
                    if attempts >= max_attempts || !e.is_retryable() {
                        self.metrics.record_error("load", &e.to_string());
                        warn!("✗ Load {} failed after {} attempt(s): {}", range, attempts, e);
                        return Err(e);
                    }
                    debug!(
                        "Load {} failed (attempt {}/{}), retrying: {}",
                        range, attempts, max_attempts, e
                    );
                    let delay =
                        tokio::time::Duration::from_millis(100 * 2_u64.pow(attempts - 1));
                    tokio::time::sleep(delay).await;
                }
            }
        };

        self.generation += 1;
        self.range = Some(range);
        self.items = items;
        self.exclusions.reset();
        self.needs_reload = false;
        self.phase = SessionPhase::Reviewing;

        self.metrics
            .record_load(&range.to_string(), self.items.len(), timer.elapsed());
        info!(
            "✓ Loaded {} item(s) for {} (generation {})",
            self.items.len(),
            range,
            self.generation
        );
        Ok(())
    }

    /// Toggle one line item in or out of the batch.
    ///
    /// # Errors
    /// Returns `Error::InvalidPhase` outside `Reviewing`.
    pub fn toggle_item(&mut self, id: LineItemId) -> Result<()> {
        self.require_reviewing()?;
        self.exclusions.toggle_item(id);
        Ok(())
    }

    /// Toggle a freelancer's entire item set in or out of the batch.
    ///
    /// # Errors
    /// Returns `Error::InvalidPhase` outside `Reviewing`.
    pub fn toggle_freelancer(&mut self, id: FreelancerId) -> Result<()> {
        self.require_reviewing()?;
        self.exclusions.toggle_freelancer(id);
        Ok(())
    }

    /// Recompute the batch summary for the current snapshot and exclusions.
    ///
    /// Pure derivation; safe to call on every render.
    pub fn summary(&self) -> BatchSummary {
        crate::summary::summarize(&self.items, &self.exclusions)
    }

    /// The idempotency key a confirm of the current state would carry.
    pub fn idempotency_key(&self) -> Option<String> {
        let range = self.range?;
        Some(BatchKeyBuilder::build(&range, &self.summary().included_ids()))
    }

    /// Submit the batch for payment.
    ///
    /// Legal only in `Reviewing` with a processable summary. The phase is
    /// `Confirming` for the duration of the round-trip, which shuts out
    /// toggles and further confirm triggers. On failure the session returns
    /// to `Reviewing` with exclusion state preserved so the user can retry
    /// without re-selecting everything; a staleness rejection additionally
    /// forces a reload before the next attempt.
    ///
    /// On success the server's result is cross-checked against the local
    /// summary; a mismatch is reported via [`ConfirmOutcome::discrepancy`]
    /// rather than an error, since the payment did commit.
    ///
    /// # Errors
    /// - `Error::NeedsReload` after an unresolved staleness rejection
    /// - `Error::InvalidPhase` outside `Reviewing`
    /// - `Error::NotProcessable` while blocking issues are present
    /// - the confirm operation's error on rejection or transport failure
    pub async fn confirm(&mut self) -> Result<ConfirmOutcome> {
        if self.needs_reload {
            return Err(Error::NeedsReload);
        }
        self.require_reviewing()?;
        let range = self.range.ok_or_else(|| self.phase_error("Reviewing"))?;

        let summary = self.summary();
        if !summary.can_process {
            let kinds: Vec<String> = summary
                .issues
                .iter()
                .filter(|i| i.kind.severity() == Severity::Blocking)
                .map(|i| i.kind.to_string())
                .collect();
            return Err(Error::NotProcessable(kinds.join(", ")));
        }

        let included_ids = summary.included_ids();
        let mut excluded_item_ids: Vec<LineItemId> =
            self.exclusions.excluded_items().iter().cloned().collect();
        excluded_item_ids.sort();
        let mut excluded_freelancer_ids: Vec<FreelancerId> = self
            .exclusions
            .excluded_freelancers()
            .iter()
            .cloned()
            .collect();
        excluded_freelancer_ids.sort();

        let request = ConfirmRequest {
            idempotency_key: BatchKeyBuilder::build(&range, &included_ids),
            range,
            included_ids,
            excluded_item_ids,
            excluded_freelancer_ids,
        };

        debug!(
            "» Confirming {} item(s) for {} (key {})",
            request.included_ids.len(),
            range,
            request.idempotency_key
        );
        self.phase = SessionPhase::Confirming;
        let timer = Instant::now();

        match self.confirmer.confirm(&request).await {
            Ok(result) => {
                let discrepancy = result.total_amount != summary.total_amount
                    || result.included_count != summary.included.len();
                if discrepancy {
                    self.metrics.record_discrepancy(
                        &summary.total_amount.to_string(),
                        &result.total_amount.to_string(),
                    );
                    warn!(
                        "⚠ Confirm result disagrees with summary: promised {} for {} item(s), server paid {} for {}",
                        summary.total_amount,
                        summary.included.len(),
                        result.total_amount,
                        result.included_count
                    );
                }

                self.phase = SessionPhase::Confirmed;
                self.exclusions.reset();
                self.metrics
                    .record_confirm(&result.batch_id, timer.elapsed());
                info!(
                    "✓ Confirmed {} as {} in {:?}",
                    range,
                    result.batch_id,
                    timer.elapsed()
                );
                Ok(ConfirmOutcome {
                    result,
                    discrepancy,
                })
            }
            Err(e) => {
                self.phase = SessionPhase::Reviewing;
                if e.is_stale() {
                    self.needs_reload = true;
                }
                self.metrics.record_error("confirm", &e.to_string());
                warn!("✗ Confirm for {} failed: {}", range, e);
                Err(e)
            }
        }
    }

    /// Return to `Reviewing` after an in-flight confirm was abandoned
    /// (its future dropped before a terminal response).
    ///
    /// Safe because a caller-driven confirm retry reuses the same
    /// idempotency key and cannot double-charge.
    pub fn abandon_confirm(&mut self) {
        if self.phase == SessionPhase::Confirming {
            warn!("Abandoning in-flight confirm; returning to Reviewing");
            self.phase = SessionPhase::Reviewing;
        }
    }

    /// Cancel the review: discard items and exclusions, back to `Selecting`.
    pub fn cancel(&mut self) {
        debug!("Cancelling review session");
        self.phase = SessionPhase::Selecting;
        self.range = None;
        self.items.clear();
        self.exclusions.reset();
        self.needs_reload = false;
    }

    fn require_reviewing(&self) -> Result<()> {
        if self.phase != SessionPhase::Reviewing {
            return Err(self.phase_error("Reviewing"));
        }
        Ok(())
    }

    fn phase_error(&self, expected: &'static str) -> Error {
        Error::InvalidPhase {
            expected,
            found: self.phase.to_string(),
        }
    }
}
