use std::{
    cell::{Cell, RefCell},
    rc::Rc,
    sync::Once,
};

use serde::Deserialize;
use serde_json::{Value as Json, json};
use stow::{
    prelude::*,
    store::{Durable, Inert, storages::MemoryStorage},
};
use tracing_subscriber::{EnvFilter, fmt::time::ChronoLocal};

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_timer(ChronoLocal::new("%H:%M:%S%.3f".into()))
            .with_test_writer()
            .try_init();
    });
}

/// Adapter that records every call it receives.
struct Recording {
    inner: Durable<MemoryStorage>,
    gets: Cell<u32>,
    sets: RefCell<Vec<(String, Json)>>,
}

impl Recording {
    fn new(storage: MemoryStorage) -> Rc<Self> {
        Rc::new(Self {
            inner: Durable::new(storage),
            gets: Cell::new(0),
            sets: RefCell::new(Vec::new()),
        })
    }
}

impl StoreAdapter for Recording {
    fn get(&self, key: &str) -> stow::Result<Option<Json>> {
        self.gets.set(self.gets.get() + 1);
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &Json) -> stow::Result<()> {
        self.sets.borrow_mut().push((key.to_string(), value.clone()));
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> stow::Result<()> {
        self.inner.remove(key)
    }
}

fn stow_over(storage: &MemoryStorage) -> Stow {
    Stow::new().store(Rc::new(Durable::new(storage.clone())))
}

#[test]
fn test_empty_store_writes_only_after_mutation() {
    init_tracing();

    let storage = MemoryStorage::new();
    let recording = Recording::new(storage.clone());
    let stow = Stow::new().store(recording.clone());

    let live = stow.cache("k", object!({ "count": 0 })).unwrap();

    assert_eq!(live.get("count").unwrap(), Some(Value::from(0)));
    assert_eq!(recording.gets.get(), 1);
    assert!(recording.sets.borrow().is_empty());
    assert!(storage.is_empty());

    live.set("count", 5).unwrap();

    assert_eq!(
        *recording.sets.borrow(),
        vec![("stow:v1:k".to_string(), json!({ "count": 5 }))]
    );
    assert_eq!(storage.raw("stow:v1:k").as_deref(), Some(r#"{"count":5}"#));
}

#[test]
fn test_stored_state_is_overlaid_on_initial() {
    init_tracing();

    let storage = MemoryStorage::new();
    storage
        .set_item("stow:v1:k", r#"{"count":10,"extra":"x"}"#)
        .unwrap();

    let live = stow_over(&storage)
        .cache("k", object!({ "count": 0, "name": "n" }))
        .unwrap();

    assert_eq!(live.get("count").unwrap(), Some(Value::from(10)));
    assert_eq!(live.get("name").unwrap(), Some(Value::from("n")));
    assert_eq!(live.get("extra").unwrap(), Some(Value::from("x")));
}

#[test]
fn test_skip_cache_never_touches_store() {
    init_tracing();

    let storage = MemoryStorage::new();
    storage.set_item("stow:v1:k", r#"{"count":10}"#).unwrap();
    let recording = Recording::new(storage.clone());

    let live = Stow::new()
        .store(recording.clone())
        .cache(CacheOptions::new("k").skip_cache(true), object!({ "count": 0 }))
        .unwrap();
    live.set("count", 1).unwrap();
    live.set("count", 2).unwrap();

    assert_eq!(live.get("count").unwrap(), Some(Value::from(2)));
    assert_eq!(live.observer_count(), 0);
    assert_eq!(recording.gets.get(), 0);
    assert!(recording.sets.borrow().is_empty());
    assert_eq!(storage.raw("stow:v1:k").as_deref(), Some(r#"{"count":10}"#));
}

#[test]
fn test_factory_skip_is_overridden_per_call() {
    init_tracing();

    let storage = MemoryStorage::new();
    let stow = stow_over(&storage).skip_cache(true).prefix("app:");

    let skipped = stow.cache("a", object!({ "v": 0 })).unwrap();
    skipped.set("v", 1).unwrap();

    let cached = stow
        .cache(CacheOptions::new("b").skip_cache(false).prefix(""), object!({ "v": 0 }))
        .unwrap();
    cached.set("v", 2).unwrap();

    assert_eq!(storage.keys(), vec!["b".to_string()]);
    assert_eq!(storage.raw("b").as_deref(), Some(r#"{"v":2}"#));
}

#[test]
fn test_per_call_store_overrides_factory_store() {
    init_tracing();

    let factory_storage = MemoryStorage::new();
    let call_storage = MemoryStorage::new();
    let stow = stow_over(&factory_storage);

    let live = stow
        .cache(
            CacheOptions::new("k").store(Rc::new(Durable::new(call_storage.clone()))),
            object!({ "n": 0 }),
        )
        .unwrap();
    live.set("n", 1).unwrap();

    assert!(factory_storage.is_empty());
    assert_eq!(call_storage.raw("stow:v1:k").as_deref(), Some(r#"{"n":1}"#));
}

#[test]
fn test_decode_failure_propagates() {
    init_tracing();

    let storage = MemoryStorage::new();
    storage.set_item("stow:v1:k", "not json").unwrap();

    let err = stow_over(&storage)
        .cache("k", object!({ "count": 0 }))
        .unwrap_err();

    assert!(matches!(err, Error::Decode { key, .. } if key == "stow:v1:k"));
}

#[test]
fn test_cache_or_fresh_recovers_from_corrupt_entry() {
    init_tracing();

    let storage = MemoryStorage::new();
    storage.set_item("stow:v1:k", "not json").unwrap();
    let stow = stow_over(&storage);

    let live = stow.cache_or_fresh("k", object!({ "count": 0 })).unwrap();
    assert_eq!(live.get("count").unwrap(), Some(Value::from(0)));
    assert_eq!(storage.raw("stow:v1:k").as_deref(), Some("not json"));

    live.set("count", 3).unwrap();
    assert_eq!(storage.raw("stow:v1:k").as_deref(), Some(r#"{"count":3}"#));
}

#[test]
fn test_cache_or_fresh_still_fails_on_merge_error() {
    init_tracing();

    let storage = MemoryStorage::new();
    storage
        .set_item("stow:v1:k", r#"{"theme":{"name":"dark"}}"#)
        .unwrap();

    let err = stow_over(&storage)
        .cache_or_fresh("k", object!({ "theme": "light" }))
        .unwrap_err();

    assert!(matches!(err, Error::MergeType { path, .. } if path == "theme"));
}

#[test]
fn test_storage_write_failure_surfaces_from_mutation() {
    init_tracing();

    let storage = MemoryStorage::with_quota(24);
    let live = stow_over(&storage).cache("k", object!({ "s": "" })).unwrap();

    live.set("s", "short").unwrap();
    let err = live.set("s", "a value far too long for the quota").unwrap_err();

    assert!(matches!(err, Error::StorageWrite { key, .. } if key == "stow:v1:k"));
    // The in-memory state keeps the mutation; the store keeps the last good write
    assert_eq!(
        live.get("s").unwrap(),
        Some(Value::from("a value far too long for the quota"))
    );
    assert_eq!(storage.raw("stow:v1:k").as_deref(), Some(r#"{"s":"short"}"#));
}

#[test]
fn test_partially_failed_batch_is_persisted() {
    init_tracing();

    let storage = MemoryStorage::new();
    let live = stow_over(&storage)
        .cache("k", {
            let mut obj = Object::new();
            obj.insert("count", 0);
            obj.define_getter("fixed", |_| Value::from(1));
            obj
        })
        .unwrap();

    let err = live
        .update(|obj| {
            obj.set("count", 7)?;
            obj.set("fixed", 2)
        })
        .unwrap_err();

    assert!(matches!(err, Error::ReadOnly { key } if key == "fixed"));
    assert_eq!(live.get("count").unwrap(), Some(Value::from(7)));
    assert_eq!(storage.raw("stow:v1:k").as_deref(), Some(r#"{"count":7}"#));
}

#[test]
fn test_stored_object_over_new_array_field_restores() {
    init_tracing();

    let storage = MemoryStorage::new();
    storage
        .set_item("stow:v1:k", r#"{"items":{"a":1},"count":2}"#)
        .unwrap();

    let live = stow_over(&storage)
        .cache("k", object!({ "items": [], "count": 0 }))
        .unwrap();

    assert_eq!(live.snapshot().unwrap(), json!({ "items": [], "count": 2 }));
}

#[test]
fn test_shared_key_is_last_write_wins() {
    init_tracing();

    let storage = MemoryStorage::new();
    let stow = stow_over(&storage);

    let first = stow.cache("shared", object!({ "a": 0 })).unwrap();
    let second = stow.cache("shared", object!({ "b": 0 })).unwrap();

    first.set("a", 1).unwrap();
    second.set("b", 2).unwrap();

    assert_eq!(storage.raw("stow:v1:shared").as_deref(), Some(r#"{"b":2}"#));
}

#[test]
fn test_restore_round_trip_keeps_behavior() {
    init_tracing();

    fn counter() -> Object {
        let mut obj = Object::new();
        obj.insert("count", 0);
        obj.insert("history", Value::Array(Vec::new()));
        obj.define_getter("double", |o| {
            Value::from(o.get("count").and_then(|c| c.as_i64()).unwrap_or_default() * 2)
        });
        obj.define_method("increment", |o, _| {
            let next = o.get("count").and_then(|c| c.as_i64()).unwrap_or_default() + 1;
            o.set("count", next)?;
            Ok(Value::from(next))
        });
        obj
    }

    let storage = MemoryStorage::new();
    let stow = stow_over(&storage);

    let live = stow.cache("counter", counter()).unwrap();
    live.call("increment", &[]).unwrap();
    live.call("increment", &[]).unwrap();
    live.set("history", vec![1, 2]).unwrap();

    assert_eq!(
        storage.raw("stow:v1:counter").as_deref(),
        Some(r#"{"count":2,"history":[1,2]}"#)
    );

    let restored = stow.cache("counter", counter()).unwrap();

    assert_eq!(restored.get("double").unwrap(), Some(Value::from(4)));
    assert_eq!(restored.call("increment", &[]).unwrap(), Value::from(3));
}

#[test]
fn test_nested_identity_survives_restore() {
    init_tracing();

    let storage = MemoryStorage::new();
    storage
        .set_item("stow:v1:prefs", r#"{"ui":{"theme":"dark"}}"#)
        .unwrap();

    let initial = object!({ "ui": { "theme": "light", "scale": 1 } });
    let ui = initial.read().unwrap().get("ui").unwrap();

    let live = stow_over(&storage).cache("prefs", initial.clone()).unwrap();

    assert!(live.target().ptr_eq(&initial));
    assert_eq!(live.get("ui").unwrap(), Some(ui));
    assert_eq!(
        live.snapshot().unwrap(),
        json!({ "ui": { "theme": "dark", "scale": 1 } })
    );

    live.child("ui").unwrap().unwrap().set("scale", 2).unwrap();
    assert_eq!(
        storage.raw("stow:v1:prefs").as_deref(),
        Some(r#"{"ui":{"theme":"dark","scale":2}}"#)
    );
}

#[test]
fn test_forget_removes_entry() {
    init_tracing();

    let storage = MemoryStorage::new();
    let stow = stow_over(&storage);

    let live = stow.cache("k", object!({ "n": 0 })).unwrap();
    live.set("n", 1).unwrap();
    assert!(storage.raw("stow:v1:k").is_some());

    stow.forget("k").unwrap();
    assert!(storage.raw("stow:v1:k").is_none());

    stow.forget(CacheOptions::new("k").skip_cache(true)).unwrap();
    let fresh = stow.cache("k", object!({ "n": 0 })).unwrap();
    assert_eq!(fresh.get("n").unwrap(), Some(Value::from(0)));
}

#[test]
fn test_typed_snapshot_of_live_state() {
    init_tracing();

    #[derive(Debug, Deserialize, PartialEq)]
    struct Settings {
        theme: String,
        volume: u8,
    }

    let storage = MemoryStorage::new();
    let live = stow_over(&storage)
        .cache("settings", object!({ "theme": "light", "volume": 3 }))
        .unwrap();
    live.set("volume", 7).unwrap();

    assert_eq!(
        live.snapshot_as::<Settings>().unwrap(),
        Settings {
            theme: "light".into(),
            volume: 7,
        }
    );
}

#[test]
fn test_custom_substrate() {
    init_tracing();

    /// Substrate that counts notifications instead of tracking mutations.
    struct Manual {
        listeners: RefCell<Vec<stow::reactive::Listener>>,
    }

    impl Reactive for Manual {
        type Live = ObjectRef;
        type Subscription = ();

        fn wrap(&self, target: ObjectRef) -> ObjectRef {
            target
        }

        fn observe(&self, _live: &ObjectRef, listener: stow::reactive::Listener) {
            self.listeners.borrow_mut().push(listener);
        }
    }

    let manual = Manual {
        listeners: RefCell::new(Vec::new()),
    };
    let storage = MemoryStorage::new();
    let stow = stow_over(&storage);

    let obj = stow.cache_with(&manual, "k", object!({ "n": 0 })).unwrap();
    obj.write().unwrap().set("n", 9).unwrap();
    assert!(storage.is_empty());

    for listener in manual.listeners.borrow_mut().iter_mut() {
        listener().unwrap();
    }
    assert_eq!(storage.raw("stow:v1:k").as_deref(), Some(r#"{"n":9}"#));
}

#[test]
fn test_inert_store_keeps_state_in_memory_only() {
    init_tracing();

    let stow = Stow::new().store(Rc::new(Inert));

    let live = stow.cache("k", object!({ "n": 0 })).unwrap();
    live.set("n", 1).unwrap();

    let again = stow.cache("k", object!({ "n": 0 })).unwrap();
    assert_eq!(again.get("n").unwrap(), Some(Value::from(0)));
}

#[cfg(not(target_arch = "wasm32"))]
#[test]
fn test_free_cache_function_uses_environment_store() {
    init_tracing();

    let live = stow::cache("k", object!({ "n": 0 })).unwrap();
    live.set("n", 1).unwrap();

    assert_eq!(live.get("n").unwrap(), Some(Value::from(1)));
    assert_eq!(live.observer_count(), 1);
}
