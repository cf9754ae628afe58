use quizbrawl_game::{Collection, MemoryStore, MemoryStoreError, RecordStore};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

type Records = BTreeMap<String, BTreeMap<String, Value>>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("store file {} is corrupt: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Memory(#[from] MemoryStoreError),
}

/// JSON-file store. Every write rewrites the whole file before returning.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    records: RefCell<Records>,
}

impl FileStore {
    /// Open a store file, starting empty if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).map_err(|source| StoreError::Corrupt {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => Records::new(),
            Err(source) => return Err(StoreError::Read { path, source }),
        };
        Ok(Self {
            path,
            records: RefCell::new(records),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let text = serde_json::to_string_pretty(&*self.records.borrow()).map_err(|source| {
            StoreError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;
        fs::write(&self.path, text).map_err(write_err)
    }
}

impl RecordStore for FileStore {
    type Error = StoreError;

    fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>, Self::Error> {
        Ok(self
            .records
            .borrow()
            .get(collection.as_str())
            .and_then(|records| records.get(key))
            .cloned())
    }

    fn put(&self, collection: Collection, key: &str, record: &Value) -> Result<(), Self::Error> {
        self.records
            .borrow_mut()
            .entry(collection.as_str().to_string())
            .or_default()
            .insert(key.to_string(), record.clone());
        self.flush()
    }

    fn get_all(&self, collection: Collection) -> Result<Vec<Value>, Self::Error> {
        Ok(self
            .records
            .borrow()
            .get(collection.as_str())
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default())
    }
}

/// Store selected on the command line.
#[derive(Debug)]
pub enum ScenarioStore {
    Memory(MemoryStore),
    File(FileStore),
}

impl ScenarioStore {
    /// A file store under `dir` when given, otherwise an in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store file cannot be opened.
    pub fn for_run(dir: Option<&Path>, label: &str) -> Result<Self, StoreError> {
        match dir {
            Some(dir) => {
                let path = dir.join(format!("{label}.json"));
                if path.exists() {
                    fs::remove_file(&path).map_err(|source| StoreError::Write {
                        path: path.clone(),
                        source,
                    })?;
                }
                Ok(Self::File(FileStore::open(path)?))
            }
            None => Ok(Self::Memory(MemoryStore::new())),
        }
    }
}

impl RecordStore for ScenarioStore {
    type Error = StoreError;

    fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>, Self::Error> {
        match self {
            Self::Memory(store) => Ok(store.get(collection, key)?),
            Self::File(store) => store.get(collection, key),
        }
    }

    fn put(&self, collection: Collection, key: &str, record: &Value) -> Result<(), Self::Error> {
        match self {
            Self::Memory(store) => Ok(store.put(collection, key, record)?),
            Self::File(store) => store.put(collection, key, record),
        }
    }

    fn get_all(&self, collection: Collection) -> Result<Vec<Value>, Self::Error> {
        match self {
            Self::Memory(store) => Ok(store.get_all(collection)?),
            Self::File(store) => store.get_all(collection),
        }
    }
}
