//! Core data types: line items, identifiers, and date ranges.

use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a payable line item, unique within one eligibility
/// response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineItemId(pub String);

/// Identifier of a payee. Many line items share a freelancer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FreelancerId(pub String);

impl fmt::Display for LineItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for FreelancerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for LineItemId {
    fn from(s: &str) -> Self {
        LineItemId(s.to_string())
    }
}

impl From<&str> for FreelancerId {
    fn from(s: &str) -> Self {
        FreelancerId(s.to_string())
    }
}

/// One unit of payable work.
///
/// Line items are produced by the eligibility provider for a date range and
/// are immutable for the duration of one review session; the aggregator
/// never mutates them.
///
/// # Example
///
/// ```
/// use batch_kit::{LineItem, Money};
///
/// let item = LineItem::new("wl_1", "fl_a", Money::from_minor_units(1000), 60)
///     .with_label("Landing page copy");
/// assert_eq!(item.amount.minor_units(), 1000);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Stable identifier within one eligibility response.
    pub id: LineItemId,

    /// The payee this item belongs to.
    pub freelancer_id: FreelancerId,

    /// Amount owed, in integer minor units. Exact by construction.
    pub amount: crate::money::Money,

    /// Worked time in minutes. Must use the same unit across one batch.
    pub duration_mins: u32,

    /// Human-readable task description. Display only.
    #[serde(default)]
    pub label: String,
}

impl LineItem {
    /// Construct a line item with an empty label.
    pub fn new(
        id: impl Into<LineItemId>,
        freelancer_id: impl Into<FreelancerId>,
        amount: crate::money::Money,
        duration_mins: u32,
    ) -> Self {
        LineItem {
            id: id.into(),
            freelancer_id: freelancer_id.into(),
            amount,
            duration_mins,
            label: String::new(),
        }
    }

    /// Attach a display label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Check the item for conditions that make it unpayable.
    ///
    /// # Errors
    /// Returns `Error::InvalidAmount` for a negative amount.
    pub fn validate(&self) -> Result<()> {
        if self.amount.is_negative() {
            return Err(Error::InvalidAmount(format!(
                "item {} has negative amount {}",
                self.id, self.amount
            )));
        }
        Ok(())
    }
}

impl From<String> for LineItemId {
    fn from(s: String) -> Self {
        LineItemId(s)
    }
}

impl From<String> for FreelancerId {
    fn from(s: String) -> Self {
        FreelancerId(s)
    }
}

/// An inclusive date range selecting eligible work.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    /// Inclusive start date.
    pub from: NaiveDate,
    /// Inclusive end date.
    pub to: NaiveDate,
}

impl DateRange {
    /// Construct a range, rejecting inverted bounds.
    ///
    /// # Errors
    /// Returns `Error::InvalidRange` if `from` is after `to`.
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        if from > to {
            return Err(Error::InvalidRange {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        Ok(DateRange { from, to })
    }

    /// True if `date` falls inside the range (inclusive on both ends).
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.from, self.to)
    }
}
