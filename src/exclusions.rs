//! Exclusion state for a batch review session.
//!
//! Two independent identifier sets control what stays in the batch: ids of
//! individually excluded line items, and ids of freelancers whose entire
//! item set is removed. An item is excluded if it is in the first set OR
//! its freelancer is in the second.
//!
//! The sets are deliberately independent: excluding a freelancer does not
//! clear individual item exclusions, and re-including a freelancer does not
//! un-exclude items that were toggled off on their own. Several ad-hoc
//! implementations of this pattern disagree on exactly this point, which is
//! why the rule lives in one tested place.

use crate::entity::{FreelancerId, LineItem, LineItemId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Session-scoped exclusion sets, mutated by user toggles.
///
/// Created empty at the start of a review session, discarded on cancel,
/// cleared on successful confirm, and reset whenever the eligible item set
/// changes, so an id excluded against a previous query can never suppress a
/// same-valued id in a new one by coincidence.
///
/// All mutation is synchronous set insert/delete driven by a single logical
/// actor; no locking is needed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionState {
    excluded_items: HashSet<LineItemId>,
    excluded_freelancers: HashSet<FreelancerId>,
}

impl ExclusionState {
    /// Create an empty exclusion state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle one line item in or out of the batch.
    ///
    /// Toggling an id that is not in the eligible set is harmless: the
    /// aggregator simply never matches it. Call sites can race with a stale
    /// id after a refetch, so this is deliberately not an error.
    pub fn toggle_item(&mut self, id: LineItemId) {
        if !self.excluded_items.remove(&id) {
            debug!("Excluding item {}", id);
            self.excluded_items.insert(id);
        } else {
            debug!("Re-including item {}", id);
        }
    }

    /// Toggle a freelancer's entire item set in or out of the batch.
    pub fn toggle_freelancer(&mut self, id: FreelancerId) {
        if !self.excluded_freelancers.remove(&id) {
            debug!("Excluding freelancer {}", id);
            self.excluded_freelancers.insert(id);
        } else {
            debug!("Re-including freelancer {}", id);
        }
    }

    /// Clear both sets.
    ///
    /// Called when the eligible item set changes (a new date range is
    /// loaded), so stale exclusions cannot silently suppress unrelated
    /// items.
    pub fn reset(&mut self) {
        if !self.is_empty() {
            debug!(
                "Resetting exclusions ({} items, {} freelancers)",
                self.excluded_items.len(),
                self.excluded_freelancers.len()
            );
        }
        self.excluded_items.clear();
        self.excluded_freelancers.clear();
    }

    /// The exclusion predicate: item-level OR freelancer-level.
    pub fn is_excluded(&self, item: &LineItem) -> bool {
        self.excluded_items.contains(&item.id)
            || self.excluded_freelancers.contains(&item.freelancer_id)
    }

    /// True when no exclusions are active.
    pub fn is_empty(&self) -> bool {
        self.excluded_items.is_empty() && self.excluded_freelancers.is_empty()
    }

    /// Individually excluded item ids.
    pub fn excluded_items(&self) -> &HashSet<LineItemId> {
        &self.excluded_items
    }

    /// Excluded freelancer ids.
    pub fn excluded_freelancers(&self) -> &HashSet<FreelancerId> {
        &self.excluded_freelancers
    }
}
