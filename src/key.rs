//! Deterministic idempotency keys for confirm submissions.
//!
//! A confirm retry after a timeout must not double-charge. The backend
//! deduplicates on an idempotency key, and that key has to be a pure
//! function of what is being submitted: the date range plus the final
//! included item ids. Two submissions of the same batch always carry the
//! same key; changing any exclusion changes it.

use crate::entity::{DateRange, LineItemId};

/// FNV-1a 64-bit offset basis.
const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
/// FNV-1a 64-bit prime.
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Builder for batch idempotency keys.
pub struct BatchKeyBuilder;

impl BatchKeyBuilder {
    /// Build the idempotency key for a batch.
    ///
    /// Format: `"batch:{from}:{to}:{digest}"` where the digest is a stable
    /// FNV-1a hash over the sorted included ids. Sorting makes the key
    /// independent of eligibility-response order, and hashing keeps it
    /// bounded no matter how many items the batch contains.
    ///
    /// # Example
    ///
    /// ```
    /// use batch_kit::{BatchKeyBuilder, DateRange, LineItemId};
    /// use chrono::NaiveDate;
    ///
    /// let range = DateRange::new(
    ///     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
    ///     NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
    /// ).unwrap();
    /// let ids = vec![LineItemId::from("wl_2"), LineItemId::from("wl_1")];
    ///
    /// let key = BatchKeyBuilder::build(&range, &ids);
    /// assert!(key.starts_with("batch:2024-01-01:2024-01-31:"));
    /// ```
    pub fn build(range: &DateRange, included_ids: &[LineItemId]) -> String {
        let mut sorted: Vec<&LineItemId> = included_ids.iter().collect();
        sorted.sort();

        let mut digest = FNV_OFFSET;
        for id in sorted {
            for byte in id.0.as_bytes() {
                digest ^= u64::from(*byte);
                digest = digest.wrapping_mul(FNV_PRIME);
            }
            // id separator, so ["ab","c"] and ["a","bc"] differ
            digest ^= 0x1f;
            digest = digest.wrapping_mul(FNV_PRIME);
        }

        format!("batch:{}:{}:{:016x}", range.from, range.to, digest)
    }
}
