//! High-level batch service for web applications.
//!
//! Wraps the two backend collaborators in `Arc` so one configured pair can
//! be shared across threads and handed to as many review sessions as the
//! application opens.

use crate::observability::{NoOpMetrics, ReviewMetrics};
use crate::provider::{ConfirmOperation, EligibilityProvider};
use crate::session::ReviewSession;
use std::sync::Arc;

/// Shared entry point for opening review sessions.
///
/// `BatchService` is `Clone` (cheap Arc increments), so a web handler can
/// keep one instance in its application state and open a fresh
/// [`ReviewSession`] per user review.
///
/// # Example
///
/// ```ignore
/// use batch_kit::{BatchService, InMemoryApi, StaticCredential};
///
/// let api = InMemoryApi::new(StaticCredential::new("token"));
/// let service = BatchService::new(api.clone(), api);
///
/// // In a request handler:
/// let mut session = service.open_session();
/// session.load(range).await?;
/// ```
pub struct BatchService<P: EligibilityProvider, C: ConfirmOperation> {
    provider: Arc<P>,
    confirmer: Arc<C>,
    metrics: Arc<dyn ReviewMetrics>,
}

impl<P: EligibilityProvider, C: ConfirmOperation> Clone for BatchService<P, C> {
    fn clone(&self) -> Self {
        BatchService {
            provider: Arc::clone(&self.provider),
            confirmer: Arc::clone(&self.confirmer),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<P: EligibilityProvider, C: ConfirmOperation> BatchService<P, C> {
    /// Create a service over an eligibility provider and confirm operation.
    pub fn new(provider: P, confirmer: C) -> Self {
        BatchService {
            provider: Arc::new(provider),
            confirmer: Arc::new(confirmer),
            metrics: Arc::new(NoOpMetrics),
        }
    }

    /// Create a service with a shared metrics collector.
    pub fn with_metrics(
        provider: P,
        confirmer: C,
        metrics: Arc<dyn ReviewMetrics>,
    ) -> Self {
        BatchService {
            provider: Arc::new(provider),
            confirmer: Arc::new(confirmer),
            metrics,
        }
    }

    /// Open a fresh review session in the selecting phase.
    ///
    /// Every session gets its own exclusion state and phase; sessions share
    /// only the collaborators and the metrics collector.
    pub fn open_session(&self) -> ReviewSession<P, C> {
        ReviewSession::new(Arc::clone(&self.provider), Arc::clone(&self.confirmer))
            .with_metrics(Box::new(Arc::clone(&self.metrics)))
    }

    /// Get a reference to the eligibility provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Get a reference to the confirm operation.
    pub fn confirmer(&self) -> &C {
        &self.confirmer
    }
}
