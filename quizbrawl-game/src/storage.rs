//! Persistent store and remote session boundaries.
//!
//! Platform crates provide the concrete implementations (browser storage,
//! files, a backup service); the engines only see these traits.
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::rc::Rc;
use thiserror::Error;

use crate::player::Player;

/// Record collections the engines read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Collection {
    Player,
    Runs,
    Monsters,
}

impl Collection {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::Runs => "runs",
            Self::Monsters => "monsters",
        }
    }
}

/// Keyed record storage with bulk reads of historical collections.
pub trait RecordStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetch a single record.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>, Self::Error>;

    /// Insert or replace a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be durably written.
    fn put(&self, collection: Collection, key: &str, record: &Value) -> Result<(), Self::Error>;

    /// Fetch every record of a collection, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get_all(&self, collection: Collection) -> Result<Vec<Value>, Self::Error>;
}

impl<T: RecordStore + ?Sized> RecordStore for &T {
    type Error = T::Error;

    fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>, Self::Error> {
        (**self).get(collection, key)
    }

    fn put(&self, collection: Collection, key: &str, record: &Value) -> Result<(), Self::Error> {
        (**self).put(collection, key, record)
    }

    fn get_all(&self, collection: Collection) -> Result<Vec<Value>, Self::Error> {
        (**self).get_all(collection)
    }
}

/// Remote backup session. Pushes are best effort.
pub trait RemoteSession {
    type Error: std::error::Error + Send + Sync + 'static;

    fn is_logged_in(&self) -> bool;

    /// Push the player record to the backup service.
    ///
    /// # Errors
    ///
    /// Returns an error if the push fails; callers log and drop it.
    fn put_player(&self, player: &Player) -> Result<(), Self::Error>;
}

/// A remote session that is never logged in.
#[derive(Debug, Clone, Copy, Default)]
pub struct Offline;

impl RemoteSession for Offline {
    type Error = Infallible;

    fn is_logged_in(&self) -> bool {
        false
    }

    fn put_player(&self, _player: &Player) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Failure surfaced by the engines. Only local durability and record
/// decoding are fatal; remote failures never reach this type.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("local store failure: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("record codec failure: {0}")]
    Codec(#[from] serde_json::Error),
}

impl EngineError {
    pub fn store<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Store(Box::new(err))
    }
}

/// Serialize and write one record.
///
/// # Errors
///
/// Returns an error if serialization or the store write fails.
pub fn put_record<S, T>(
    store: &S,
    collection: Collection,
    key: &str,
    record: &T,
) -> Result<(), EngineError>
where
    S: RecordStore,
    T: Serialize,
{
    let value = serde_json::to_value(record)?;
    store
        .put(collection, key, &value)
        .map_err(EngineError::store)
}

/// Read and decode a whole collection, skipping records that do not decode.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub fn load_all<S, T>(store: &S, collection: Collection) -> Result<Vec<T>, EngineError>
where
    S: RecordStore,
    T: DeserializeOwned,
{
    let raw = store.get_all(collection).map_err(EngineError::store)?;
    let mut records = Vec::with_capacity(raw.len());
    for value in raw {
        match serde_json::from_value(value) {
            Ok(record) => records.push(record),
            Err(err) => log::warn!("skipping malformed {} record: {err}", collection.as_str()),
        }
    }
    Ok(records)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemoryStoreError {
    #[error("write to `{0}` rejected")]
    WriteRejected(&'static str),
}

/// In-memory store, cloneable so tests can inspect what the engines wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Rc<RefCell<BTreeMap<Collection, BTreeMap<String, Value>>>>,
    reject_writes: Rc<Cell<bool>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail, simulating a full or locked disk.
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.set(reject);
    }

    /// Number of records held in a collection.
    #[must_use]
    pub fn len(&self, collection: Collection) -> usize {
        self.records
            .borrow()
            .get(&collection)
            .map_or(0, BTreeMap::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.borrow().values().all(BTreeMap::is_empty)
    }
}

impl RecordStore for MemoryStore {
    type Error = MemoryStoreError;

    fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>, Self::Error> {
        Ok(self
            .records
            .borrow()
            .get(&collection)
            .and_then(|records| records.get(key))
            .cloned())
    }

    fn put(&self, collection: Collection, key: &str, record: &Value) -> Result<(), Self::Error> {
        if self.reject_writes.get() {
            return Err(MemoryStoreError::WriteRejected(collection.as_str()));
        }
        self.records
            .borrow_mut()
            .entry(collection)
            .or_default()
            .insert(key.to_string(), record.clone());
        Ok(())
    }

    fn get_all(&self, collection: Collection) -> Result<Vec<Value>, Self::Error> {
        Ok(self
            .records
            .borrow()
            .get(&collection)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        n: u32,
    }

    #[test]
    fn memory_store_roundtrips_and_shares_state() {
        let store = MemoryStore::new();
        let view = store.clone();
        store
            .put(Collection::Runs, "a", &json!({ "n": 1 }))
            .unwrap();
        assert_eq!(view.len(Collection::Runs), 1);
        assert_eq!(
            view.get(Collection::Runs, "a").unwrap(),
            Some(json!({ "n": 1 }))
        );
        assert!(view.get(Collection::Player, "main").unwrap().is_none());
    }

    #[test]
    fn rejected_writes_surface_as_errors() {
        let store = MemoryStore::new();
        store.reject_writes(true);
        let err = put_record(&store, Collection::Player, "main", &json!({})).unwrap_err();
        assert!(matches!(err, EngineError::Store(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn load_all_skips_malformed_records() {
        let store = MemoryStore::new();
        store.put(Collection::Monsters, "1", &json!({ "n": 3 })).unwrap();
        store
            .put(Collection::Monsters, "2", &json!({ "n": "three" }))
            .unwrap();
        let loaded: Vec<Sample> = load_all(&store, Collection::Monsters).unwrap();
        assert_eq!(loaded, vec![Sample { n: 3 }]);
    }

    #[test]
    fn offline_session_never_pushes() {
        assert!(!Offline.is_logged_in());
    }
}
