//! Importance weighting for resume order.
//!
//! Two stored records are compared by three binary wins: the older
//! `created_at`, the newer `updated_at` and the higher `count`. Each win is
//! multiplied by its weight and the record with the larger total is resumed
//! first.

use crate::types::StoredSubscription;
use std::cmp::Ordering;

/// Weight constants for the three importance criteria.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Weights {
    /// Weight of having the older `created_at`.
    pub age: u32,
    /// Weight of having the newer `updated_at`.
    pub last_used: u32,
    /// Weight of having the higher `count`.
    pub count: u32,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            age: 1,
            last_used: 1,
            count: 2,
        }
    }
}

impl Weights {
    /// Score of `x` relative to `y`.
    ///
    /// Summed in `u64` so any combination of `u32` weights fits.
    pub fn score(&self, x: &StoredSubscription, y: &StoredSubscription) -> u64 {
        u64::from(self.age) * u64::from(x.created_at < y.created_at)
            + u64::from(self.last_used) * u64::from(x.updated_at > y.updated_at)
            + u64::from(self.count) * u64::from(x.count > y.count)
    }

    /// `Less` means `a` is resumed before `b`.
    pub fn compare(&self, a: &StoredSubscription, b: &StoredSubscription) -> Ordering {
        self.score(b, a).cmp(&self.score(a, b))
    }

    /// Stable sort by descending priority.
    ///
    /// The comparator is not transitive (three records can beat each other
    /// in a cycle), so this is a plain insertion sort instead of
    /// `slice::sort_by`, which may panic on inconsistent orderings. Ties keep
    /// their input order.
    pub fn sort_by_key_fn<T, F>(&self, items: &mut [T], key: F)
    where
        F: Fn(&T) -> &StoredSubscription,
    {
        for i in 1..items.len() {
            let mut j = i;
            while j > 0 && self.compare(key(&items[j]), key(&items[j - 1])) == Ordering::Less {
                items.swap(j, j - 1);
                j -= 1;
            }
        }
    }

    /// Sort stored records by descending priority.
    pub fn sort(&self, records: &mut [StoredSubscription]) {
        self.sort_by_key_fn(records, |r| r);
    }
}
