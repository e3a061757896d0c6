//! Data type representations for stored values.
//!
//! Each variant maps to a Redis-like data type. Wrong-type checks are
//! variant discrimination — there is no inheritance and no dynamic cast.

pub mod sorted_set;

use std::collections::VecDeque;

use ahash::{AHashMap, AHashSet};
use bytes::Bytes;

use sorted_set::SortedSet;

/// A stored value.
///
/// Binary-safe throughout: keys, list elements, hash fields and set members
/// are all `Bytes`. Absence of a value is expressed as `Option<&Value>` at
/// the store level rather than a dedicated variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Binary-safe string data.
    String(Bytes),

    /// Double-ended list. `VecDeque` gives O(1) push/pop at both ends.
    List(VecDeque<Bytes>),

    /// Field → value mapping. Insertion order is irrelevant.
    Hash(AHashMap<Bytes, Bytes>),

    /// Unordered set of unique members.
    Set(AHashSet<Bytes>),

    /// Sorted set of unique members, each with a float score, ordered by
    /// (score, member).
    SortedSet(SortedSet),
}

impl Value {
    /// Returns the type name, matching Redis TYPE command output.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Hash(_) => "hash",
            Value::Set(_) => "set",
            Value::SortedSet(_) => "zset",
        }
    }
}

/// Converts Redis-style indices (supporting negative values) to a
/// clamped `(start, stop)` pair.
///
/// Negative indices count back from `len` (e.g. -1 = last element).
/// Out-of-bounds stop is clamped to `len - 1`; a hugely-negative stop
/// clamps to -1 so the caller sees `start > stop` (empty range).
/// Returns `(0, -1)` for empty collections.
pub fn normalize_range(start: i64, stop: i64, len: i64) -> (i64, i64) {
    if len == 0 {
        return (0, -1);
    }

    let s = if start < 0 {
        (len + start).max(0)
    } else {
        start
    };

    let e = if stop < 0 {
        (len + stop).max(-1)
    } else {
        stop.min(len - 1)
    };

    (s, e)
}
