//! Restore-then-persist orchestration.
//!
//! [`orchestrate`] overlays whatever was stored under a namespace key onto a
//! freshly constructed object, hands the object to a [`Reactive`] substrate,
//! and registers a listener that writes a new snapshot after every batch of
//! mutations. [`Stow`] binds the substrate and option defaults once.

use std::{fmt, rc::Rc};

use serde_json::{Map, Value as Json};

use crate::{
    base::{DEFAULT_PREFIX, debug, namespace_key, trace, warn},
    config::StowConfig,
    errors::{Error, Result},
    merge,
    object::ObjectRef,
    reactive::{Reactive, Tracked, Tracker},
    snapshot,
    store::{Inert, StoreAdapter, default_store},
};

/// Per-call options. Fields left unset fall back to the [`Stow`] defaults.
#[derive(Clone)]
pub struct CacheOptions {
    key: String,
    prefix: Option<String>,
    skip_cache: Option<bool>,
    store: Option<Rc<dyn StoreAdapter>>,
}

/// Orchestrator with a pre-bound substrate and option defaults.
#[derive(Clone)]
pub struct Stow<R = Tracker> {
    reactive: R,
    prefix: Option<String>,
    skip_cache: Option<bool>,
    store: Option<Rc<dyn StoreAdapter>>,
}

/// Options after applying per-call overrides on top of factory defaults.
/// `store` is `None` when caching is skipped.
struct Resolved {
    key: String,
    store: Option<Rc<dyn StoreAdapter>>,
}

/// Restore `initial` from `store` under `namespace_key`, wrap it, and persist
/// every later mutation.
///
/// With `skip` set the object is wrapped as is; the store is never touched
/// and no listener is registered. An absent or `null` entry restores nothing.
pub fn orchestrate<R: Reactive>(
    namespace_key: &str,
    initial: ObjectRef,
    store: Rc<dyn StoreAdapter>,
    skip: bool,
    reactive: &R,
) -> Result<R::Live> {
    if skip {
        trace!("caching skipped for {namespace_key:?}");
        return Ok(reactive.wrap(initial));
    }

    let stored = store.get(namespace_key)?;

    bind(namespace_key, initial, store, stored, reactive)
}

/// Convenience over a default [`Stow`]: default substrate, environment store.
pub fn cache(options: impl Into<CacheOptions>, initial: impl Into<ObjectRef>) -> Result<Tracked> {
    Stow::new().cache(options, initial)
}

fn bind<R: Reactive>(
    namespace_key: &str,
    initial: ObjectRef,
    store: Rc<dyn StoreAdapter>,
    stored: Option<Json>,
    reactive: &R,
) -> Result<R::Live> {
    match &stored {
        Some(Json::Null) | None => debug!("no stored state for {namespace_key:?}"),
        Some(_) => debug!("restoring stored state for {namespace_key:?}"),
    }

    let stored = stored.unwrap_or_else(|| Json::Object(Map::new()));
    merge::merge_into(&initial, &stored)?;

    let live = reactive.wrap(initial.clone());

    let key = namespace_key.to_string();
    let _subscription = reactive.observe(
        &live,
        Box::new(move || {
            let snapshot = snapshot::snapshot_object(&initial)?;

            trace!("persisting state for {key:?}");

            store.set(&key, &snapshot)
        }),
    );

    Ok(live)
}

// Implementations

impl CacheOptions {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            prefix: None,
            skip_cache: None,
            store: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Empty means the key is used verbatim.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn skip_cache(mut self, skip: bool) -> Self {
        self.skip_cache = Some(skip);
        self
    }

    pub fn store(mut self, store: Rc<dyn StoreAdapter>) -> Self {
        self.store = Some(store);
        self
    }
}

impl From<&str> for CacheOptions {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for CacheOptions {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

impl fmt::Debug for CacheOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheOptions")
            .field("key", &self.key)
            .field("prefix", &self.prefix)
            .field("skip_cache", &self.skip_cache)
            .field("store", &self.store.as_ref().map(|_| ".."))
            .finish()
    }
}

impl Stow<Tracker> {
    pub fn new() -> Self {
        Self::with_reactive(Tracker)
    }

    pub fn from_config(config: &StowConfig) -> Self {
        Self::new()
            .prefix(config.prefix.clone())
            .skip_cache(config.skip_cache)
    }
}

impl Default for Stow<Tracker> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Reactive> Stow<R> {
    pub fn with_reactive(reactive: R) -> Self {
        Self {
            reactive,
            prefix: None,
            skip_cache: None,
            store: None,
        }
    }

    pub fn reactive(&self) -> &R {
        &self.reactive
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn skip_cache(mut self, skip: bool) -> Self {
        self.skip_cache = Some(skip);
        self
    }

    pub fn store(mut self, store: Rc<dyn StoreAdapter>) -> Self {
        self.store = Some(store);
        self
    }

    /// Effective slot name for `options`: resolved prefix followed by the key.
    pub fn namespace_key(&self, options: &CacheOptions) -> String {
        let prefix = options
            .prefix
            .as_deref()
            .or(self.prefix.as_deref())
            .unwrap_or(DEFAULT_PREFIX);

        namespace_key(prefix, &options.key)
    }

    pub fn cache(
        &self,
        options: impl Into<CacheOptions>,
        initial: impl Into<ObjectRef>,
    ) -> Result<R::Live> {
        self.cache_with(&self.reactive, options, initial)
    }

    /// Like [`Stow::cache`], on a substrate other than the bound one.
    pub fn cache_with<S: Reactive>(
        &self,
        reactive: &S,
        options: impl Into<CacheOptions>,
        initial: impl Into<ObjectRef>,
    ) -> Result<S::Live> {
        let resolved = self.resolve(&options.into());

        match resolved.store {
            Some(store) => orchestrate(&resolved.key, initial.into(), store, false, reactive),
            None => orchestrate(&resolved.key, initial.into(), Rc::new(Inert), true, reactive),
        }
    }

    /// Like [`Stow::cache`], but an entry that fails to decode is treated as
    /// absent and overwritten by the next write.
    pub fn cache_or_fresh(
        &self,
        options: impl Into<CacheOptions>,
        initial: impl Into<ObjectRef>,
    ) -> Result<R::Live> {
        let resolved = self.resolve(&options.into());
        let initial = initial.into();

        let Some(store) = resolved.store else {
            return Ok(self.reactive.wrap(initial));
        };

        let stored = match store.get(&resolved.key) {
            Ok(stored) => stored,
            Err(_e @ Error::Decode { .. }) => {
                warn!(
                    "Failed to restore state for {:?}: {_e}. Starting from the initial state.",
                    resolved.key
                );
                None
            }
            Err(e) => return Err(e),
        };

        bind(&resolved.key, initial, store, stored, &self.reactive)
    }

    /// Remove the persisted entry for `options`; a no-op when caching is skipped.
    pub fn forget(&self, options: impl Into<CacheOptions>) -> Result<()> {
        let resolved = self.resolve(&options.into());

        let Some(store) = resolved.store else {
            return Ok(());
        };

        debug!("forgetting stored state for {:?}", resolved.key);

        store.remove(&resolved.key)
    }

    fn resolve(&self, options: &CacheOptions) -> Resolved {
        let skip = options
            .skip_cache
            .or(self.skip_cache)
            .unwrap_or(false);

        let store = (!skip).then(|| {
            options
                .store
                .clone()
                .or_else(|| self.store.clone())
                .unwrap_or_else(default_store)
        });

        Resolved {
            key: self.namespace_key(options),
            store,
        }
    }
}

impl<R: fmt::Debug> fmt::Debug for Stow<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stow")
            .field("reactive", &self.reactive)
            .field("prefix", &self.prefix)
            .field("skip_cache", &self.skip_cache)
            .field("store", &self.store.as_ref().map(|_| ".."))
            .finish()
    }
}
