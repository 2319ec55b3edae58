//! Persist an in-memory state object across sessions.
//!
//! [`cache`] restores whatever was stored under a namespaced key onto a
//! freshly constructed object, then writes a plain snapshot back on every
//! observed mutation:
//!
//! ```
//! use std::rc::Rc;
//!
//! use stow::prelude::*;
//! use stow::store::{Durable, storages::MemoryStorage};
//!
//! let storage = MemoryStorage::new();
//! let stow = Stow::new().store(Rc::new(Durable::new(storage.clone())));
//!
//! let settings = stow.cache("settings", object!({ "theme": "light" })).unwrap();
//! settings.set("theme", "dark").unwrap();
//!
//! let restored = stow.cache("settings", object!({ "theme": "light" })).unwrap();
//! assert_eq!(restored.get("theme").unwrap(), Some(Value::from("dark")));
//! ```

pub mod base;
pub mod cache;
pub mod config;
pub mod errors;
pub mod merge;
pub mod object;
pub mod reactive;
pub mod snapshot;
pub mod store;
pub mod value;

mod macros;

// Re-exports

pub use base::{DEFAULT_PREFIX, namespace_key};
pub use cache::{CacheOptions, Stow, cache, orchestrate};
pub use config::StowConfig;
pub use errors::{Error, Result};
pub use object::{Behavior, Member, MemberKind, Object, ObjectRef};
pub use value::{Callable, Value};

pub mod prelude {
    pub use crate::cache::{CacheOptions, Stow, cache};
    pub use crate::errors::{Error, Result};
    pub use crate::object::{Behavior, MemberKind, Object, ObjectRef};
    pub use crate::reactive::{Reactive, Subscription, Tracked, Tracker};
    pub use crate::store::{StorageBackend, StoreAdapter};
    pub use crate::value::{Callable, Value};

    pub use crate::object;
}

#[doc(hidden)]
pub mod __private {
    pub use serde_json::{Value as Json, json};
}
