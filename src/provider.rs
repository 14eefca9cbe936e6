//! Collaborator traits for the external payment backend.
//!
//! The core never talks HTTP itself. Two traits describe what it needs from
//! the backend (an eligibility query and a confirm operation) and the
//! caller implements them with whatever client stack the application uses.
//! This keeps the aggregation core and its tests free of wire-format and
//! ambient-state concerns.
//!
//! Credentials are an explicit injected dependency ([`CredentialProvider`])
//! rather than an ambient lookup inside fetch functions, so provider
//! implementations and their tests never read process-global state.
//!
//! # Mocking for Tests
//!
//! [`InMemoryApi`] implements both traits over an in-process store. It is
//! what the crate's own integration tests run against:
//!
//! ```ignore
//! let api = InMemoryApi::new(StaticCredential::new("token"));
//! api.insert(item, date);
//! let items = api.fetch_eligible(&range).await?;
//! ```

use crate::entity::{DateRange, FreelancerId, LineItem, LineItemId};
use crate::error::{Error, Result};
use crate::money::Money;
use chrono::NaiveDate;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Supplies the credential used when calling the backend.
///
/// Injected into provider implementations instead of being read from
/// ambient key-value storage inside fetch functions.
pub trait CredentialProvider: Send + Sync {
    /// Return a usable credential.
    ///
    /// # Errors
    /// Returns `Err` if no credential is available (expired session, etc.)
    fn credential(&self) -> Result<String>;
}

/// Fixed-token credential provider.
#[derive(Clone)]
pub struct StaticCredential {
    token: String,
}

impl StaticCredential {
    /// Wrap a fixed token.
    pub fn new(token: impl Into<String>) -> Self {
        StaticCredential {
            token: token.into(),
        }
    }
}

impl CredentialProvider for StaticCredential {
    fn credential(&self) -> Result<String> {
        if self.token.is_empty() {
            return Err(Error::Credential("empty token".to_string()));
        }
        Ok(self.token.clone())
    }
}

/// Trait for eligibility query implementations.
///
/// Given a date range, return the line items that are unpaid, unbatched,
/// and fall inside the range, in a deterministic order. The returned order
/// is the display and grouping order for the whole review session.
#[allow(async_fn_in_trait)]
pub trait EligibilityProvider: Send + Sync {
    /// Fetch the eligible line items for a date range.
    ///
    /// # Errors
    /// Returns `Err` if the backend is unavailable or the query fails.
    async fn fetch_eligible(&self, range: &DateRange) -> Result<Vec<LineItem>>;
}

/// Trait for the authoritative confirm operation.
///
/// The backend commits the batch server-side and returns the result it
/// actually computed. The caller cross-checks that result against its own
/// summary: a mismatch means concurrent payment activity.
#[allow(async_fn_in_trait)]
pub trait ConfirmOperation: Send + Sync {
    /// Submit a batch for payment.
    ///
    /// Must deduplicate on `request.idempotency_key`: re-submitting the
    /// same key returns the original result instead of paying twice.
    ///
    /// # Errors
    /// - `Error::StaleBatch` if any included item was concurrently paid
    /// - `Error::ConfirmRejected` for server-side validation failures
    /// - `Error::Transport` for network failures
    async fn confirm(&self, request: &ConfirmRequest) -> Result<BatchResult>;
}

/// Everything the confirm operation needs to commit a batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmRequest {
    /// The reviewed date range.
    pub range: DateRange,
    /// Final inclusion list, in eligibility order.
    pub included_ids: Vec<LineItemId>,
    /// Individually excluded item ids, for audit.
    pub excluded_item_ids: Vec<LineItemId>,
    /// Excluded freelancer ids, for audit.
    pub excluded_freelancer_ids: Vec<FreelancerId>,
    /// Deterministic deduplication key (see [`crate::key::BatchKeyBuilder`]).
    pub idempotency_key: String,
}

/// The backend's authoritative answer to a confirm submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    /// Identifier of the committed batch.
    pub batch_id: String,
    /// Number of items the server included.
    pub included_count: usize,
    /// Total the server will actually pay, in minor units.
    pub total_amount: Money,
}

// ============================================================================
// In-Memory Mock API
// ============================================================================

struct StoredWorklog {
    item: LineItem,
    date: NaiveDate,
    paid: bool,
}

/// In-memory implementation of both provider traits, for tests and demos.
///
/// Worklogs live in a `DashMap` keyed by item id, so tests can mutate the
/// store from other tasks to simulate concurrent payment activity. Confirm
/// results are remembered per idempotency key and replayed on
/// re-submission, matching the contract a real backend must honor.
#[derive(Clone)]
pub struct InMemoryApi {
    worklogs: Arc<DashMap<LineItemId, StoredWorklog>>,
    batches: Arc<DashMap<String, BatchResult>>,
    next_batch: Arc<AtomicU64>,
    credentials: Arc<dyn CredentialProvider>,
    fail_next_fetch: Arc<Mutex<Option<Error>>>,
    fail_next_confirm: Arc<Mutex<Option<Error>>>,
}

impl InMemoryApi {
    /// Create an empty mock API with the given credential source.
    pub fn new(credentials: impl CredentialProvider + 'static) -> Self {
        InMemoryApi {
            worklogs: Arc::new(DashMap::new()),
            batches: Arc::new(DashMap::new()),
            next_batch: Arc::new(AtomicU64::new(1)),
            credentials: Arc::new(credentials),
            fail_next_fetch: Arc::new(Mutex::new(None)),
            fail_next_confirm: Arc::new(Mutex::new(None)),
        }
    }

    /// Store an unpaid worklog dated `date`.
    pub fn insert(&self, item: LineItem, date: NaiveDate) {
        self.worklogs.insert(
            item.id.clone(),
            StoredWorklog {
                item,
                date,
                paid: false,
            },
        );
    }

    /// Mark one item paid outside any batch, simulating another actor.
    pub fn mark_paid(&self, id: &LineItemId) {
        if let Some(mut entry) = self.worklogs.get_mut(id) {
            entry.paid = true;
        }
    }

    /// True if the item has been paid.
    pub fn is_paid(&self, id: &LineItemId) -> bool {
        self.worklogs.get(id).map(|w| w.paid).unwrap_or(false)
    }

    /// Number of stored worklogs.
    pub fn len(&self) -> usize {
        self.worklogs.len()
    }

    /// True if no worklogs are stored.
    pub fn is_empty(&self) -> bool {
        self.worklogs.is_empty()
    }

    /// Fail the next `fetch_eligible` call with `error`, then recover.
    pub fn fail_next_fetch(&self, error: Error) {
        *Self::lock_slot(&self.fail_next_fetch) = Some(error);
    }

    /// Fail the next `confirm` call with `error`, then recover.
    pub fn fail_next_confirm(&self, error: Error) {
        *Self::lock_slot(&self.fail_next_confirm) = Some(error);
    }

    fn take_injected(&self, slot: &Mutex<Option<Error>>) -> Option<Error> {
        Self::lock_slot(slot).take()
    }

    // A poisoned slot only means a panicking test; the Option inside is
    // still valid.
    fn lock_slot(slot: &Mutex<Option<Error>>) -> std::sync::MutexGuard<'_, Option<Error>> {
        slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl EligibilityProvider for InMemoryApi {
    async fn fetch_eligible(&self, range: &DateRange) -> Result<Vec<LineItem>> {
        self.credentials.credential()?;
        if let Some(err) = self.take_injected(&self.fail_next_fetch) {
            warn!("✗ InMemoryApi fetch failing by injection: {}", err);
            return Err(err);
        }

        let mut dated: Vec<(NaiveDate, LineItem)> = self
            .worklogs
            .iter()
            .filter(|entry| !entry.paid && range.contains(entry.date))
            .map(|entry| (entry.date, entry.item.clone()))
            .collect();
        // Deterministic response order: by date, then id.
        dated.sort_by(|a, b| (a.0, &a.1.id).cmp(&(b.0, &b.1.id)));

        let items: Vec<LineItem> = dated.into_iter().map(|(_, item)| item).collect();
        debug!("✓ InMemoryApi fetch {} -> {} item(s)", range, items.len());
        Ok(items)
    }
}

impl ConfirmOperation for InMemoryApi {
    async fn confirm(&self, request: &ConfirmRequest) -> Result<BatchResult> {
        self.credentials.credential()?;
        if let Some(err) = self.take_injected(&self.fail_next_confirm) {
            warn!("✗ InMemoryApi confirm failing by injection: {}", err);
            return Err(err);
        }

        // Idempotent replay: same key, same result, no second payment.
        if let Some(existing) = self.batches.get(&request.idempotency_key) {
            info!(
                "✓ InMemoryApi confirm replayed batch {} for key {}",
                existing.batch_id, request.idempotency_key
            );
            return Ok(existing.clone());
        }

        // Staleness check before committing anything.
        for id in &request.included_ids {
            match self.worklogs.get(id) {
                Some(entry) if !entry.paid => {}
                Some(_) => {
                    return Err(Error::StaleBatch(format!("item {} already paid", id)));
                }
                None => {
                    return Err(Error::StaleBatch(format!("item {} no longer exists", id)));
                }
            }
        }

        let mut amounts = Vec::with_capacity(request.included_ids.len());
        for id in &request.included_ids {
            let mut entry = self
                .worklogs
                .get_mut(id)
                .ok_or_else(|| Error::StaleBatch(format!("item {} no longer exists", id)))?;
            entry.paid = true;
            amounts.push(entry.item.amount);
        }

        let result = BatchResult {
            batch_id: format!("batch_{}", self.next_batch.fetch_add(1, Ordering::SeqCst)),
            included_count: request.included_ids.len(),
            total_amount: Money::sum(amounts)?,
        };
        self.batches
            .insert(request.idempotency_key.clone(), result.clone());
        info!(
            "✓ InMemoryApi confirmed {} as {} ({} items, total {})",
            request.range, result.batch_id, result.included_count, result.total_amount
        );
        Ok(result)
    }
}
