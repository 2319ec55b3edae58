//! Synchronous persistent store adapters.
//!
//! A [`StoreAdapter`] is what the orchestrator talks to: JSON values in, JSON
//! values out. [`Durable`] implements it on top of any string-keyed
//! [`StorageBackend`]; [`Inert`] stands in where no backing facility exists.

use std::rc::Rc;

use serde_json::Value as Json;

use crate::{
    base::trace,
    errors::{Error, Result},
};

pub mod storages;

#[cfg(target_arch = "wasm32")]
use storages::local_storage::LocalStorage;

/// String-keyed backing facility, e.g. `window.localStorage` or a directory.
pub trait StorageBackend {
    fn get_item(&self, key: &str) -> anyhow::Result<Option<String>>;

    fn set_item(&self, key: &str, value: &str) -> anyhow::Result<()>;

    fn remove_item(&self, key: &str) -> anyhow::Result<()>;
}

/// Get/set of structured values under a namespaced key.
pub trait StoreAdapter {
    /// `None` when nothing is stored under `key`.
    fn get(&self, key: &str) -> Result<Option<Json>>;

    fn set(&self, key: &str, value: &Json) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}

/// JSON-coded adapter over a [`StorageBackend`].
///
/// Every value, strings included, is JSON-encoded on `set`, so anything
/// written here decodes on `get`. A raw string placed under the same key by
/// another writer fails with [`Error::Decode`].
#[derive(Debug, Clone)]
pub struct Durable<B> {
    backend: B,
}

/// Adapter that stores nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct Inert;

// Implementations

impl<B: StorageBackend> Durable<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: StorageBackend> StoreAdapter for Durable<B> {
    fn get(&self, key: &str) -> Result<Option<Json>> {
        let Some(raw) = self
            .backend
            .get_item(key)
            .map_err(|e| Error::storage_read(key, e))?
        else {
            return Ok(None);
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| Error::Decode {
                key: key.to_string(),
                source,
            })
    }

    fn set(&self, key: &str, value: &Json) -> Result<()> {
        let encoded = serde_json::to_string(value).map_err(|source| Error::Encode {
            key: key.to_string(),
            source,
        })?;

        trace!("writing {} bytes under {key:?}", encoded.len());

        self.backend
            .set_item(key, &encoded)
            .map_err(|e| Error::storage_write(key, e))
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.backend
            .remove_item(key)
            .map_err(|e| Error::storage_write(key, e))
    }
}

impl StoreAdapter for Inert {
    fn get(&self, _key: &str) -> Result<Option<Json>> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &Json) -> Result<()> {
        Ok(())
    }

    fn remove(&self, _key: &str) -> Result<()> {
        Ok(())
    }
}

impl<T: StoreAdapter + ?Sized> StoreAdapter for Rc<T> {
    fn get(&self, key: &str) -> Result<Option<Json>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &Json) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

/// Whether an interactive, storage-capable environment is available.
#[cfg(target_arch = "wasm32")]
pub fn storage_available() -> bool {
    LocalStorage::from_window().is_some()
}

/// Whether an interactive, storage-capable environment is available.
#[cfg(not(target_arch = "wasm32"))]
pub fn storage_available() -> bool {
    false
}

/// `localStorage`-backed [`Durable`] when the environment has one, [`Inert`] otherwise.
pub fn default_store() -> Rc<dyn StoreAdapter> {
    match environment_store() {
        Some(store) => store,
        None => {
            trace!("no storage facility available, using inert store");
            Rc::new(Inert)
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn environment_store() -> Option<Rc<dyn StoreAdapter>> {
    LocalStorage::from_window()
        .map(|storage| Rc::new(Durable::new(storage)) as Rc<dyn StoreAdapter>)
}

#[cfg(not(target_arch = "wasm32"))]
fn environment_store() -> Option<Rc<dyn StoreAdapter>> {
    None
}
