//! Persistent key/value storage. The watch gives us a flat store keyed by
//! small integers, with typed reads and writes. There's no schema and no
//! transactions: every settings field lives under its own key and a missing
//! key just means "use the default".

use crate::state::Code;
use anyhow::Context;
use indexmap::IndexMap;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

/// A single stored value
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredValue {
    Bool(bool),
    Int(i32),
    Text(String),
}

/// Host persistent store
pub trait Store {
    fn get(&self, key: u32) -> Option<&StoredValue>;

    fn put(&mut self, key: u32, value: StoredValue) -> anyhow::Result<()>;

    fn exists(&self, key: u32) -> bool {
        self.get(key).is_some()
    }

    /// Read a bool. Ints are coerced the way C would (non-zero is true)
    fn read_bool(&self, key: u32) -> Option<bool> {
        match self.get(key)? {
            StoredValue::Bool(value) => Some(*value),
            StoredValue::Int(value) => Some(*value != 0),
            StoredValue::Text(_) => {
                warn!("Stored key {key} is text, expected bool");
                None
            }
        }
    }

    fn read_int(&self, key: u32) -> Option<i32> {
        match self.get(key)? {
            StoredValue::Int(value) => Some(*value),
            StoredValue::Bool(value) => Some(*value as i32),
            StoredValue::Text(_) => {
                warn!("Stored key {key} is text, expected int");
                None
            }
        }
    }

    fn read_string(&self, key: u32) -> Option<String> {
        match self.get(key)? {
            StoredValue::Text(value) => Some(value.clone()),
            other => {
                warn!("Stored key {key} is {other:?}, expected text");
                None
            }
        }
    }

    fn write_bool(&mut self, key: u32, value: bool) -> anyhow::Result<()> {
        self.put(key, StoredValue::Bool(value))
    }

    fn write_int(&mut self, key: u32, value: i32) -> anyhow::Result<()> {
        self.put(key, StoredValue::Int(value))
    }

    fn write_string(&mut self, key: u32, value: &str) -> anyhow::Result<()> {
        self.put(key, StoredValue::Text(value.to_owned()))
    }

    fn read_bool_or_default(&self, key: impl Into<u32>, default: bool) -> bool
    where
        Self: Sized,
    {
        self.read_bool(key.into()).unwrap_or(default)
    }

    fn read_int_or_default(&self, key: impl Into<u32>, default: i32) -> i32
    where
        Self: Sized,
    {
        self.read_int(key.into()).unwrap_or(default)
    }

    fn read_string_or_default(
        &self,
        key: impl Into<u32>,
        default: &str,
    ) -> String
    where
        Self: Sized,
    {
        self.read_string(key.into())
            .unwrap_or_else(|| default.to_owned())
    }

    /// Read anything that's stored as an integer code (enums, colors, plain
    /// ints)
    fn read_code_or_default<T: Code>(
        &self,
        key: impl Into<u32>,
        default: T,
    ) -> T
    where
        Self: Sized,
    {
        self.read_int(key.into())
            .map(T::from_code)
            .unwrap_or(default)
    }

    fn write_code<T: Code>(
        &mut self,
        key: impl Into<u32>,
        value: T,
    ) -> anyhow::Result<()>
    where
        Self: Sized,
    {
        self.write_int(key.into(), value.code())
    }
}

/// Store that lives entirely in memory. Counts writes, which makes it handy
/// for checking that nothing gets persisted redundantly.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    values: IndexMap<u32, StoredValue>,
    writes: usize,
}

impl MemoryStore {
    /// Total number of writes since creation
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl Store for MemoryStore {
    fn get(&self, key: u32) -> Option<&StoredValue> {
        self.values.get(&key)
    }

    fn put(&mut self, key: u32, value: StoredValue) -> anyhow::Result<()> {
        self.writes += 1;
        self.values.insert(key, value);
        Ok(())
    }
}

/// Store backed by a JSON file. Every write rewrites the whole file, which is
/// fine for twenty-odd keys.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: IndexMap<u32, StoredValue>,
}

impl FileStore {
    /// Load the store from disk. A missing or unreadable file gives an empty
    /// store, since every key has a default anyway.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        // Shitty try block
        let helper = || {
            let contents = fs::read(&path)?;
            Ok::<_, anyhow::Error>(serde_json::from_slice(&contents)?)
        };
        let values = match helper() {
            Ok(values) => {
                info!("Loaded persistent store from {}", path.display());
                values
            }
            Err(err) => {
                error!(
                    "Error loading persistent store from {}: {}",
                    path.display(),
                    err
                );
                IndexMap::new()
            }
        };
        Self { path, values }
    }

    fn save(&self) -> anyhow::Result<()> {
        let serialized = serde_json::to_string_pretty(&self.values)?;
        fs::write(&self.path, serialized).with_context(|| {
            format!("Error saving persistent store to {}", self.path.display())
        })
    }
}

impl Store for FileStore {
    fn get(&self, key: u32) -> Option<&StoredValue> {
        self.values.get(&key)
    }

    fn put(&mut self, key: u32, value: StoredValue) -> anyhow::Result<()> {
        self.values.insert(key, value);
        self.save()
    }
}
