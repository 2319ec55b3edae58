use std::{cell::RefCell, rc::Rc};

use anyhow::bail;
use rustc_hash::FxHashMap;

use crate::store::StorageBackend;

/// Process-local backing facility; clones share the same entries.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    inner: Rc<RefCell<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    items: FxHashMap<String, String>,
    quota: Option<usize>,
}

// Implementations

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes once keys and values together would exceed `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        let storage = Self::default();
        storage.inner.borrow_mut().quota = Some(bytes);
        storage
    }

    /// Stored string under `key`, exactly as written.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.inner.borrow().items.get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner.borrow().items.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().items.is_empty()
    }

    pub fn clear(&self) {
        self.inner.borrow_mut().items.clear();
    }
}

impl Inner {
    fn usage_without(&self, key: &str) -> usize {
        self.items
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl StorageBackend for MemoryStorage {
    fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.raw(key))
    }

    fn set_item(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut inner = self.inner.borrow_mut();

        if let Some(quota) = inner.quota {
            let needed = inner.usage_without(key) + key.len() + value.len();
            if needed > quota {
                bail!("quota of {quota} bytes exceeded ({needed} bytes needed)");
            }
        }

        inner.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> anyhow::Result<()> {
        self.inner.borrow_mut().items.remove(key);
        Ok(())
    }
}
