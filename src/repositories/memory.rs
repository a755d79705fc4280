//! In-memory registry tree for tests and dry runs.
//!
//! Key paths and value names are matched case-insensitively and values keep
//! their insertion order, as the host registry does. Clones share the same
//! tree.

use super::{normalize_path, KeyAccess, RegistryKey, RegistryStore};
use crate::domain::RegistryValue;
use crate::error::{ParameterError, Result};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct KeyData {
    values: Vec<(String, RegistryValue)>,
}

type Tree = BTreeMap<String, KeyData>;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tree: Arc<Mutex<Tree>>,
}

fn lock(tree: &Mutex<Tree>) -> MutexGuard<'_, Tree> {
    tree.lock().unwrap_or_else(PoisonError::into_inner)
}

fn tree_key(path: &str) -> String {
    normalize_path(path).to_lowercase()
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains_key(&self, path: &str) -> bool {
        lock(&self.tree).contains_key(&tree_key(path))
    }

    /// Read a value without going through a key handle.
    #[must_use]
    pub fn value(&self, path: &str, name: &str) -> Option<RegistryValue> {
        lock(&self.tree)
            .get(&tree_key(path))?
            .values
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }
}

impl RegistryStore for MemoryStore {
    type Key = MemoryKey;

    fn open_key(&self, path: &str, access: KeyAccess) -> Result<Option<MemoryKey>> {
        let key = tree_key(path);
        if !lock(&self.tree).contains_key(&key) {
            log::debug!("memory store: key not found: {}", path);
            return Ok(None);
        }
        Ok(Some(MemoryKey {
            tree: Arc::clone(&self.tree),
            key,
            writable: access == KeyAccess::Write,
        }))
    }

    fn create_key(&self, path: &str) -> Result<MemoryKey> {
        let key = tree_key(path);
        if key.is_empty() {
            return Err(ParameterError::invalid("cannot create the hive root"));
        }

        let mut tree = lock(&self.tree);
        let mut prefix = String::new();
        for part in key.split('\\') {
            if !prefix.is_empty() {
                prefix.push('\\');
            }
            prefix.push_str(part);
            tree.entry(prefix.clone()).or_default();
        }

        Ok(MemoryKey {
            tree: Arc::clone(&self.tree),
            key,
            writable: true,
        })
    }
}

#[derive(Debug)]
pub struct MemoryKey {
    tree: Arc<Mutex<Tree>>,
    key: String,
    writable: bool,
}

impl RegistryKey for MemoryKey {
    fn get_value(&self, name: &str) -> Result<Option<RegistryValue>> {
        let tree = lock(&self.tree);
        Ok(tree.get(&self.key).and_then(|data| {
            data.values
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.clone())
        }))
    }

    fn set_value(&self, name: &str, value: &RegistryValue) -> Result {
        if !self.writable {
            return Err(ParameterError::Registry(format!(
                "access denied: {} opened read-only",
                self.key
            )));
        }

        let mut tree = lock(&self.tree);
        let data = tree
            .get_mut(&self.key)
            .ok_or_else(|| ParameterError::NotFound(self.key.clone()))?;

        match data
            .values
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some((_, existing)) => *existing = value.clone(),
            None => data.values.push((name.to_string(), value.clone())),
        }
        Ok(())
    }

    fn value_names(&self) -> Result<Vec<String>> {
        let tree = lock(&self.tree);
        Ok(tree
            .get(&self.key)
            .map(|data| data.values.iter().map(|(n, _)| n.clone()).collect())
            .unwrap_or_default())
    }
}
