//! Pure batch aggregation: eligible items + exclusion state → summary.
//!
//! [`summarize`] is a deterministic transform with no side effects. It is
//! cheap enough to recompute after every exclusion toggle, so callers never
//! need to cache its output; the numbers it produces are displayed as a
//! promise of what the backend will compute on confirm, and must match the
//! server's own computation exactly. That is why all monetary folding is
//! integer minor-unit arithmetic (see [`crate::money`]).

use crate::entity::{FreelancerId, LineItem, LineItemId};
use crate::exclusions::ExclusionState;
use crate::money::Money;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Severity of a validation finding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// Worth showing, does not prevent payment.
    Warning,
    /// Prevents confirmation until resolved.
    Blocking,
}

/// Kinds of validation findings flagged before confirmation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueKind {
    /// Every eligible item was excluded; there is nothing to pay.
    EmptyBatch,
    /// An included item has a positive amount but zero worked time.
    /// Signals a likely upstream data-entry error; payment still allowed.
    ZeroDuration,
    /// An included item carries a negative amount.
    InvalidAmount,
}

impl IssueKind {
    /// Whether this kind blocks confirmation.
    pub fn severity(self) -> Severity {
        match self {
            IssueKind::EmptyBatch => Severity::Blocking,
            IssueKind::ZeroDuration => Severity::Warning,
            IssueKind::InvalidAmount => Severity::Blocking,
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueKind::EmptyBatch => write!(f, "EMPTY_BATCH"),
            IssueKind::ZeroDuration => write!(f, "ZERO_DURATION"),
            IssueKind::InvalidAmount => write!(f, "INVALID_AMOUNT"),
        }
    }
}

/// One validation finding, optionally tied to a specific line item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// What was found.
    pub kind: IssueKind,
    /// The offending item, if the finding is item-specific.
    pub item: Option<LineItemId>,
    /// Human-readable detail for display.
    pub detail: String,
}

impl Issue {
    fn batch(kind: IssueKind, detail: impl Into<String>) -> Self {
        Issue {
            kind,
            item: None,
            detail: detail.into(),
        }
    }

    fn for_item(kind: IssueKind, id: &LineItemId, detail: impl Into<String>) -> Self {
        Issue {
            kind,
            item: Some(id.clone()),
            detail: detail.into(),
        }
    }
}

/// Derived view of a batch after exclusions, recomputed on every change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Items surviving the exclusion predicate, in eligibility-response
    /// order.
    pub included: Vec<LineItem>,

    /// Exact sum of included amounts, in minor units.
    pub total_amount: Money,

    /// Sum of included worked time, in minutes.
    pub total_duration_mins: u64,

    /// Count of distinct freelancers across included items.
    pub freelancer_count: usize,

    /// Validation findings for the included set.
    pub issues: Vec<Issue>,

    /// True iff the batch is non-empty and carries no blocking issue.
    pub can_process: bool,
}

impl BatchSummary {
    /// Ids of the included items, in order. This is the final inclusion
    /// list handed to the confirm operation.
    pub fn included_ids(&self) -> Vec<LineItemId> {
        self.included.iter().map(|i| i.id.clone()).collect()
    }

    /// Issues of blocking severity.
    pub fn blocking_issues(&self) -> impl Iterator<Item = &Issue> {
        self.issues
            .iter()
            .filter(|i| i.kind.severity() == Severity::Blocking)
    }

    /// Group included items by freelancer for display.
    ///
    /// Group order follows first appearance of each `freelancer_id` in the
    /// eligibility response; item order within a group is preserved.
    pub fn grouped(&self) -> Vec<FreelancerGroup> {
        let mut order: HashMap<&FreelancerId, usize> = HashMap::new();
        let mut groups: Vec<FreelancerGroup> = Vec::new();

        for item in &self.included {
            let idx = *order.entry(&item.freelancer_id).or_insert_with(|| {
                groups.push(FreelancerGroup {
                    freelancer_id: item.freelancer_id.clone(),
                    items: Vec::new(),
                    subtotal: Money::ZERO,
                    duration_mins: 0,
                });
                groups.len() - 1
            });
            let group = &mut groups[idx];
            if let Ok(sum) = group.subtotal.checked_add(item.amount) {
                group.subtotal = sum;
            }
            group.duration_mins += u64::from(item.duration_mins);
            group.items.push(item.clone());
        }

        groups
    }
}

/// Included items of one freelancer, with per-payee subtotals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreelancerGroup {
    /// The payee.
    pub freelancer_id: FreelancerId,
    /// This payee's included items, in eligibility order.
    pub items: Vec<LineItem>,
    /// Exact sum of this payee's included amounts.
    pub subtotal: Money,
    /// Sum of this payee's included worked minutes.
    pub duration_mins: u64,
}

/// Compute the batch summary for a set of eligible items under an exclusion
/// state.
///
/// Pure and deterministic: calling it twice with the same inputs yields an
/// identical summary. Totals are monotonically non-increasing as exclusions
/// are added and non-decreasing as they are removed, holding the eligible
/// set fixed.
///
/// # Example
///
/// ```
/// use batch_kit::{summarize, ExclusionState, LineItem, Money};
///
/// let items = vec![
///     LineItem::new("wl_1", "fl_a", Money::from_minor_units(1000), 60),
///     LineItem::new("wl_2", "fl_b", Money::from_minor_units(2000), 120),
/// ];
/// let summary = summarize(&items, &ExclusionState::new());
/// assert_eq!(summary.total_amount.minor_units(), 3000);
/// assert_eq!(summary.freelancer_count, 2);
/// assert!(summary.can_process);
/// ```
pub fn summarize(items: &[LineItem], state: &ExclusionState) -> BatchSummary {
    let included: Vec<LineItem> = items
        .iter()
        .filter(|item| !state.is_excluded(item))
        .cloned()
        .collect();

    let mut issues = Vec::new();
    let mut total_amount = Money::ZERO;
    let mut total_duration_mins: u64 = 0;
    let mut freelancers: HashSet<&FreelancerId> = HashSet::new();

    for item in &included {
        if let Err(e) = item.validate() {
            issues.push(Issue::for_item(IssueKind::InvalidAmount, &item.id, e.to_string()));
        } else if item.duration_mins == 0 && item.amount > Money::ZERO {
            issues.push(Issue::for_item(
                IssueKind::ZeroDuration,
                &item.id,
                format!("item {} has {} owed for zero worked time", item.id, item.amount),
            ));
        }

        match total_amount.checked_add(item.amount) {
            Ok(sum) => total_amount = sum,
            Err(_) => {
                // Never wrap silently; an overflowing total cannot be
                // promised to the user, so the batch is blocked.
                issues.push(Issue::for_item(
                    IssueKind::InvalidAmount,
                    &item.id,
                    format!("total overflows at item {}", item.id),
                ));
            }
        }
        total_duration_mins += u64::from(item.duration_mins);
        freelancers.insert(&item.freelancer_id);
    }

    if included.is_empty() {
        issues.push(Issue::batch(
            IssueKind::EmptyBatch,
            "all eligible items are excluded",
        ));
    }

    let can_process = !included.is_empty()
        && issues.iter().all(|i| i.kind.severity() != Severity::Blocking);

    debug!(
        "Summarized batch: {}/{} items included, total {} across {} freelancers, {} issue(s)",
        included.len(),
        items.len(),
        total_amount,
        freelancers.len(),
        issues.len()
    );

    BatchSummary {
        freelancer_count: freelancers.len(),
        included,
        total_amount,
        total_duration_mins,
        issues,
        can_process,
    }
}
