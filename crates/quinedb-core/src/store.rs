//! The per-worker shard store.
//!
//! A `Store` owns two maps: key→value and key→absolute-expiry (ms since
//! epoch). It is single-threaded by design — exactly one worker ever
//! touches a given store, so there is no interior locking anywhere.
//!
//! Expiry is lazy: every read first consults the expiry map and, when the
//! timestamp has passed, deletes the entry and reports the key as absent.
//! There are no timers. Setting a fresh value clears any prior expiry;
//! deletion clears it too.

use std::collections::VecDeque;

use ahash::{AHashMap, AHashSet};
use bytes::Bytes;

use crate::time;
use crate::types::sorted_set::SortedSet;
use crate::types::{normalize_range, Value};

/// Error returned when a command is used against a key holding the wrong type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrongType;

impl std::fmt::Display for WrongType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "WRONGTYPE Operation against a key holding the wrong kind of value"
        )
    }
}

impl std::error::Error for WrongType {}

/// Result of a TTL query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlState {
    /// Key exists and expires in this many milliseconds.
    Remaining(u64),
    /// Key exists and has no expiry.
    NoExpiry,
    /// Key is absent (or already expired).
    Missing,
}

/// One worker's exclusive slice of the keyspace.
#[derive(Debug, Default)]
pub struct Store {
    data: AHashMap<Bytes, Value>,
    expires: AHashMap<Bytes, u64>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries. Does not sweep — lazily-expired keys that
    /// were never read again still count until touched.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Drops the entry if its expiry has passed. Called at the top of
    /// every read path.
    fn evict_if_expired(&mut self, key: &[u8]) {
        if let Some(&at) = self.expires.get(key) {
            if time::is_expired(at) {
                self.data.remove(key);
                self.expires.remove(key);
            }
        }
    }

    /// Returns the live value for a key, applying lazy expiry first.
    pub fn get_value(&mut self, key: &[u8]) -> Option<&Value> {
        self.evict_if_expired(key);
        self.data.get(key)
    }

    // -- strings --

    /// Stores a string value, replacing any previous value of any type
    /// and clearing any prior expiry.
    pub fn set_string(&mut self, key: Bytes, value: Bytes) {
        self.expires.remove(&key);
        self.data.insert(key, Value::String(value));
    }

    /// Reads a string value. Absent keys are `Ok(None)`; keys of another
    /// type are `Err(WrongType)`.
    pub fn get_string(&mut self, key: &[u8]) -> Result<Option<Bytes>, WrongType> {
        match self.get_value(key) {
            Some(Value::String(data)) => Ok(Some(data.clone())),
            Some(_) => Err(WrongType),
            None => Ok(None),
        }
    }

    /// Deletes a key of any type. Returns `true` if a live entry was
    /// removed; expired entries count as absent.
    pub fn del(&mut self, key: &[u8]) -> bool {
        self.evict_if_expired(key);
        self.expires.remove(key);
        self.data.remove(key).is_some()
    }

    // -- lists --

    fn list_entry(&mut self, key: &Bytes) -> Result<&mut VecDeque<Bytes>, WrongType> {
        self.evict_if_expired(key);
        match self
            .data
            .entry(key.clone())
            .or_insert_with(|| Value::List(VecDeque::new()))
        {
            Value::List(list) => Ok(list),
            _ => Err(WrongType),
        }
    }

    /// Prepends values (leftmost argument ends up at the head). Returns
    /// the new list length.
    pub fn list_push_front(&mut self, key: &Bytes, values: &[Bytes]) -> Result<usize, WrongType> {
        let list = self.list_entry(key)?;
        for v in values {
            list.push_front(v.clone());
        }
        Ok(list.len())
    }

    /// Appends values. Returns the new list length.
    pub fn list_push_back(&mut self, key: &Bytes, values: &[Bytes]) -> Result<usize, WrongType> {
        let list = self.list_entry(key)?;
        for v in values {
            list.push_back(v.clone());
        }
        Ok(list.len())
    }

    /// Pops from the head. Empty lists are removed from the keyspace.
    pub fn list_pop_front(&mut self, key: &[u8]) -> Result<Option<Bytes>, WrongType> {
        self.list_pop(key, true)
    }

    /// Pops from the tail. Empty lists are removed from the keyspace.
    pub fn list_pop_back(&mut self, key: &[u8]) -> Result<Option<Bytes>, WrongType> {
        self.list_pop(key, false)
    }

    fn list_pop(&mut self, key: &[u8], front: bool) -> Result<Option<Bytes>, WrongType> {
        self.evict_if_expired(key);
        let list = match self.data.get_mut(key) {
            Some(Value::List(list)) => list,
            Some(_) => return Err(WrongType),
            None => return Ok(None),
        };
        let popped = if front {
            list.pop_front()
        } else {
            list.pop_back()
        };
        if list.is_empty() {
            self.remove_entry(key);
        }
        Ok(popped)
    }

    pub fn list_len(&mut self, key: &[u8]) -> Result<usize, WrongType> {
        match self.get_value(key) {
            Some(Value::List(list)) => Ok(list.len()),
            Some(_) => Err(WrongType),
            None => Ok(0),
        }
    }

    /// Inclusive slice with Redis index normalization; `start > stop`
    /// after normalization yields an empty vec.
    pub fn list_range(&mut self, key: &[u8], start: i64, stop: i64) -> Result<Vec<Bytes>, WrongType> {
        match self.get_value(key) {
            Some(Value::List(list)) => {
                let (s, e) = normalize_range(start, stop, list.len() as i64);
                if s > e {
                    return Ok(Vec::new());
                }
                Ok(list
                    .iter()
                    .skip(s as usize)
                    .take((e - s + 1) as usize)
                    .cloned()
                    .collect())
            }
            Some(_) => Err(WrongType),
            None => Ok(Vec::new()),
        }
    }

    // -- hashes --

    fn hash_entry(&mut self, key: &Bytes) -> Result<&mut AHashMap<Bytes, Bytes>, WrongType> {
        self.evict_if_expired(key);
        match self
            .data
            .entry(key.clone())
            .or_insert_with(|| Value::Hash(AHashMap::new()))
        {
            Value::Hash(map) => Ok(map),
            _ => Err(WrongType),
        }
    }

    /// Sets fields, returning how many were newly created (updates of an
    /// existing field count zero).
    pub fn hash_set(&mut self, key: &Bytes, pairs: &[(Bytes, Bytes)]) -> Result<usize, WrongType> {
        let map = self.hash_entry(key)?;
        let mut created = 0;
        for (field, value) in pairs {
            if map.insert(field.clone(), value.clone()).is_none() {
                created += 1;
            }
        }
        Ok(created)
    }

    pub fn hash_get(&mut self, key: &[u8], field: &[u8]) -> Result<Option<Bytes>, WrongType> {
        match self.get_value(key) {
            Some(Value::Hash(map)) => Ok(map.get(field).cloned()),
            Some(_) => Err(WrongType),
            None => Ok(None),
        }
    }

    pub fn hash_get_all(&mut self, key: &[u8]) -> Result<Vec<(Bytes, Bytes)>, WrongType> {
        match self.get_value(key) {
            Some(Value::Hash(map)) => {
                Ok(map.iter().map(|(f, v)| (f.clone(), v.clone())).collect())
            }
            Some(_) => Err(WrongType),
            None => Ok(Vec::new()),
        }
    }

    /// Removes fields, returning how many existed. An emptied hash is
    /// removed from the keyspace.
    pub fn hash_del(&mut self, key: &[u8], fields: &[Bytes]) -> Result<usize, WrongType> {
        self.evict_if_expired(key);
        let map = match self.data.get_mut(key) {
            Some(Value::Hash(map)) => map,
            Some(_) => return Err(WrongType),
            None => return Ok(0),
        };
        let mut removed = 0;
        for field in fields {
            if map.remove(field).is_some() {
                removed += 1;
            }
        }
        if map.is_empty() {
            self.remove_entry(key);
        }
        Ok(removed)
    }

    pub fn hash_len(&mut self, key: &[u8]) -> Result<usize, WrongType> {
        match self.get_value(key) {
            Some(Value::Hash(map)) => Ok(map.len()),
            Some(_) => Err(WrongType),
            None => Ok(0),
        }
    }

    // -- sets --

    fn set_entry(&mut self, key: &Bytes) -> Result<&mut AHashSet<Bytes>, WrongType> {
        self.evict_if_expired(key);
        match self
            .data
            .entry(key.clone())
            .or_insert_with(|| Value::Set(AHashSet::new()))
        {
            Value::Set(set) => Ok(set),
            _ => Err(WrongType),
        }
    }

    /// Adds members, returning how many were not already present.
    pub fn set_add(&mut self, key: &Bytes, members: &[Bytes]) -> Result<usize, WrongType> {
        let set = self.set_entry(key)?;
        let mut added = 0;
        for member in members {
            if set.insert(member.clone()) {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Removes members, returning how many existed. An emptied set is
    /// removed from the keyspace.
    pub fn set_remove(&mut self, key: &[u8], members: &[Bytes]) -> Result<usize, WrongType> {
        self.evict_if_expired(key);
        let set = match self.data.get_mut(key) {
            Some(Value::Set(set)) => set,
            Some(_) => return Err(WrongType),
            None => return Ok(0),
        };
        let mut removed = 0;
        for member in members {
            if set.remove(member) {
                removed += 1;
            }
        }
        if set.is_empty() {
            self.remove_entry(key);
        }
        Ok(removed)
    }

    pub fn set_members(&mut self, key: &[u8]) -> Result<Vec<Bytes>, WrongType> {
        match self.get_value(key) {
            Some(Value::Set(set)) => Ok(set.iter().cloned().collect()),
            Some(_) => Err(WrongType),
            None => Ok(Vec::new()),
        }
    }

    pub fn set_card(&mut self, key: &[u8]) -> Result<usize, WrongType> {
        match self.get_value(key) {
            Some(Value::Set(set)) => Ok(set.len()),
            Some(_) => Err(WrongType),
            None => Ok(0),
        }
    }

    // -- sorted sets --

    fn zset_entry(&mut self, key: &Bytes) -> Result<&mut SortedSet, WrongType> {
        self.evict_if_expired(key);
        match self
            .data
            .entry(key.clone())
            .or_insert_with(|| Value::SortedSet(SortedSet::new()))
        {
            Value::SortedSet(zset) => Ok(zset),
            _ => Err(WrongType),
        }
    }

    /// Adds (score, member) pairs, returning how many members were newly
    /// inserted (score updates count zero).
    pub fn zset_add(&mut self, key: &Bytes, pairs: &[(f64, Bytes)]) -> Result<usize, WrongType> {
        let zset = self.zset_entry(key)?;
        let mut added = 0;
        for (score, member) in pairs {
            if zset.insert(member.clone(), *score) {
                added += 1;
            }
        }
        Ok(added)
    }

    pub fn zset_range(
        &mut self,
        key: &[u8],
        start: i64,
        stop: i64,
    ) -> Result<Vec<(Bytes, f64)>, WrongType> {
        match self.get_value(key) {
            Some(Value::SortedSet(zset)) => Ok(zset.range_by_rank(start, stop)),
            Some(_) => Err(WrongType),
            None => Ok(Vec::new()),
        }
    }

    /// Removes members, returning how many existed. An emptied sorted set
    /// is removed from the keyspace.
    pub fn zset_remove(&mut self, key: &[u8], members: &[Bytes]) -> Result<usize, WrongType> {
        self.evict_if_expired(key);
        let zset = match self.data.get_mut(key) {
            Some(Value::SortedSet(zset)) => zset,
            Some(_) => return Err(WrongType),
            None => return Ok(0),
        };
        let mut removed = 0;
        for member in members {
            if zset.remove(member) {
                removed += 1;
            }
        }
        if zset.is_empty() {
            self.remove_entry(key);
        }
        Ok(removed)
    }

    pub fn zset_card(&mut self, key: &[u8]) -> Result<usize, WrongType> {
        match self.get_value(key) {
            Some(Value::SortedSet(zset)) => Ok(zset.len()),
            Some(_) => Err(WrongType),
            None => Ok(0),
        }
    }

    pub fn zset_score(&mut self, key: &[u8], member: &[u8]) -> Result<Option<f64>, WrongType> {
        match self.get_value(key) {
            Some(Value::SortedSet(zset)) => Ok(zset.score(member)),
            Some(_) => Err(WrongType),
            None => Ok(None),
        }
    }

    // -- expiry --

    /// Sets an absolute expiry on an existing key. Returns `false` when
    /// the key is absent (or already expired).
    pub fn expire_at(&mut self, key: &[u8], at_ms: u64) -> bool {
        self.evict_if_expired(key);
        if let Some((k, _)) = self.data.get_key_value(key) {
            let k = k.clone();
            self.expires.insert(k, at_ms);
            true
        } else {
            false
        }
    }

    /// Reports the key's TTL state, applying lazy expiry first.
    pub fn ttl(&mut self, key: &[u8]) -> TtlState {
        self.evict_if_expired(key);
        if !self.data.contains_key(key) {
            return TtlState::Missing;
        }
        match self.expires.get(key) {
            Some(&at) => TtlState::Remaining(at.saturating_sub(time::now_ms())),
            None => TtlState::NoExpiry,
        }
    }

    fn remove_entry(&mut self, key: &[u8]) {
        self.data.remove(key);
        self.expires.remove(key);
    }

    // -- snapshot support --

    /// Inserts an entry verbatim, preserving its expiry. Used when
    /// rebuilding a store from a dump; past timestamps are kept and left
    /// to lazy expiry.
    pub fn restore(&mut self, key: Bytes, value: Value, expires_at_ms: Option<u64>) {
        if let Some(at) = expires_at_ms {
            self.expires.insert(key.clone(), at);
        } else {
            self.expires.remove(&key);
        }
        self.data.insert(key, value);
    }

    /// Iterates live entries as (key, value, expiry). Entries whose
    /// expiry has already passed are skipped — they are logically absent
    /// even if lazy GC has not collected them yet.
    pub fn iter_entries(&self) -> impl Iterator<Item = (&Bytes, &Value, Option<u64>)> {
        self.data.iter().filter_map(move |(key, value)| {
            match self.expires.get(key) {
                Some(&at) if time::is_expired(at) => None,
                Some(&at) => Some((key, value, Some(at))),
                None => Some((key, value, None)),
            }
        })
    }
}
