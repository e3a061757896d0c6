//! Sorted set data structure: dual-indexed by score and member.
//!
//! Each member has a unique name and an associated `f64` score. Members
//! are ordered by (score, member) — ties in score are broken
//! lexicographically, matching Redis semantics.
//!
//! Implementation uses a `BTreeMap<(OrderedFloat<f64>, Bytes), ()>` for
//! ordered iteration and an `AHashMap<Bytes, OrderedFloat<f64>>` for O(1)
//! member→score lookups. Invariant: a member is present in both indices
//! or in neither, and the scores agree; updates remove the old
//! (score, member) pair before inserting the new one.

use std::collections::BTreeMap;

use ahash::AHashMap;
use bytes::Bytes;
use ordered_float::OrderedFloat;

/// A sorted set of unique binary-safe members with floating-point scores.
///
/// Rank is determined by position in (score, member) order (0-based,
/// lowest score first).
#[derive(Debug, Clone, Default)]
pub struct SortedSet {
    /// Score→member index for ordered iteration.
    tree: BTreeMap<(OrderedFloat<f64>, Bytes), ()>,
    /// Member→score index for O(1) lookups.
    scores: AHashMap<Bytes, OrderedFloat<f64>>,
}

impl SortedSet {
    /// Creates an empty sorted set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or updates a member. Returns `true` if the member was newly
    /// inserted; a score update on an existing member returns `false`.
    pub fn insert(&mut self, member: Bytes, score: f64) -> bool {
        let new_score = OrderedFloat(score);

        if let Some(&old_score) = self.scores.get(&member) {
            if new_score != old_score {
                self.tree.remove(&(old_score, member.clone()));
                self.scores.insert(member.clone(), new_score);
                self.tree.insert((new_score, member), ());
            }
            false
        } else {
            self.scores.insert(member.clone(), new_score);
            self.tree.insert((new_score, member), ());
            true
        }
    }

    /// Removes a member. Returns `true` if it existed.
    pub fn remove(&mut self, member: &[u8]) -> bool {
        if let Some(score) = self.scores.remove(member) {
            self.tree
                .remove(&(score, Bytes::copy_from_slice(member)));
            true
        } else {
            false
        }
    }

    /// Returns the score for a member, or `None` if not present.
    pub fn score(&self, member: &[u8]) -> Option<f64> {
        self.scores.get(member).map(|s| s.0)
    }

    /// Returns members in the given rank range, inclusive on both ends.
    /// Supports negative indices: -1 = last, -2 = second to last, etc.
    pub fn range_by_rank(&self, start: i64, stop: i64) -> Vec<(Bytes, f64)> {
        let len = self.tree.len() as i64;
        let (s, e) = super::normalize_range(start, stop, len);
        if s > e {
            return Vec::new();
        }

        let s = s as usize;
        let e = e as usize;

        self.tree
            .keys()
            .skip(s)
            .take(e - s + 1)
            .map(|(score, member)| (member.clone(), score.0))
            .collect()
    }

    /// Returns the number of members.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Returns `true` if the sorted set has no members.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Returns an iterator over (member, score) pairs in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&Bytes, f64)> {
        self.tree.keys().map(|(score, member)| (member, score.0))
    }
}

impl PartialEq for SortedSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other.iter())
                .all(|((m1, s1), (m2, s2))| m1 == m2 && s1 == s2)
    }
}
