use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::{Rc, Weak},
};

use serde::de::DeserializeOwned;
use serde_json::Value as Json;

use crate::{
    base::trace,
    errors::Result,
    object::{Member, Object, ObjectRef},
    reactive::{Listener, Reactive},
    snapshot,
    value::Value,
};

/// Default substrate: wraps objects into [`Tracked`] handles.
#[derive(Debug, Default, Clone, Copy)]
pub struct Tracker;

/// Observed view of an object.
///
/// Reads never notify. Each mutating call (`set`, `update`, `call`,
/// `remove`) is one batch: once it returns, every listener runs once, in
/// registration order. Views obtained through [`Tracked::child`] share the
/// root's listeners. Mutations made through the raw [`ObjectRef`] are not
/// observed.
#[derive(Clone)]
pub struct Tracked {
    target: ObjectRef,
    monitor: Rc<Monitor>,
}

/// Handle of a registered listener. Dropping it keeps the listener alive.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    monitor: Weak<Monitor>,
}

#[derive(Default)]
struct Monitor {
    observers: RefCell<Vec<Observer>>,
    next_id: Cell<u64>,
}

struct Observer {
    id: u64,
    listener: Rc<RefCell<Listener>>,
}

// Implementations

impl Reactive for Tracker {
    type Live = Tracked;
    type Subscription = Subscription;

    fn wrap(&self, target: ObjectRef) -> Tracked {
        Tracked {
            target,
            monitor: Rc::default(),
        }
    }

    fn observe(&self, live: &Tracked, listener: Listener) -> Subscription {
        live.monitor.add_observer(listener)
    }
}

impl Tracked {
    /// Underlying object; mutations through it bypass the listeners.
    pub fn target(&self) -> &ObjectRef {
        &self.target
    }

    pub fn ptr_eq(&self, other: &Tracked) -> bool {
        self.target.ptr_eq(&other.target)
    }

    pub fn subscribe(&self, listener: impl FnMut() -> Result<()> + 'static) -> Subscription {
        self.monitor.add_observer(Box::new(listener))
    }

    pub fn observer_count(&self) -> usize {
        self.monitor.observers.borrow().len()
    }

    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.target.read()?.get(key))
    }

    pub fn read<R>(&self, f: impl FnOnce(&Object) -> R) -> Result<R> {
        let obj = self.target.read()?;
        Ok(f(&obj))
    }

    /// Observed view of the nested object under `key`, if it holds one.
    pub fn child(&self, key: &str) -> Result<Option<Tracked>> {
        Ok(match self.get(key)? {
            Some(Value::Object(target)) => Some(Tracked {
                target,
                monitor: self.monitor.clone(),
            }),
            _ => None,
        })
    }

    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        self.update(|obj| obj.set(key, value))
    }

    pub fn call(&self, key: &str, args: &[Value]) -> Result<Value> {
        self.update(|obj| obj.call(key, args))
    }

    pub fn remove(&self, key: &str) -> Result<Option<Member>> {
        self.update(|obj| Ok(obj.remove(key)))
    }

    /// Run `f` as one batch, then notify listeners.
    ///
    /// Listeners run even when `f` fails, since it may have changed members
    /// before failing. The error of `f` takes precedence over a listener's.
    pub fn update<R>(&self, f: impl FnOnce(&mut Object) -> Result<R>) -> Result<R> {
        let out = {
            let mut obj = self.target.write()?;
            f(&mut obj)
        };

        let notified = self.monitor.notify();
        let out = out?;
        notified?;

        Ok(out)
    }

    pub fn snapshot(&self) -> Result<Json> {
        snapshot::snapshot_object(&self.target)
    }

    pub fn snapshot_as<T: DeserializeOwned>(&self) -> Result<T> {
        snapshot::snapshot_as(&self.target)
    }
}

impl fmt::Debug for Tracked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracked")
            .field("target", &self.target)
            .field("observers", &self.observer_count())
            .finish()
    }
}

impl Subscription {
    /// Remove the listener; `false` if it was already gone.
    pub fn unsubscribe(self) -> bool {
        match self.monitor.upgrade() {
            Some(monitor) => monitor.remove_observer(self.id),
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        let Some(monitor) = self.monitor.upgrade() else {
            return false;
        };

        monitor.observers.borrow().iter().any(|o| o.id == self.id)
    }
}

impl Monitor {
    fn add_observer(self: &Rc<Self>, listener: Listener) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        self.observers.borrow_mut().push(Observer {
            id,
            listener: Rc::new(RefCell::new(listener)),
        });

        trace!("observer {id} subscribed");

        Subscription {
            id,
            monitor: Rc::downgrade(self),
        }
    }

    fn remove_observer(&self, id: u64) -> bool {
        let mut observers = self.observers.borrow_mut();
        let before = observers.len();
        observers.retain(|o| o.id != id);

        trace!("observer {id} unsubscribed");

        observers.len() != before
    }

    fn notify(&self) -> Result<()> {
        let listeners: Vec<_> = self
            .observers
            .borrow()
            .iter()
            .map(|o| o.listener.clone())
            .collect();

        for listener in listeners {
            // Busy means this listener's own reaction caused the mutation
            let Ok(mut listener) = listener.try_borrow_mut() else {
                continue;
            };

            (&mut **listener)()?;
        }

        Ok(())
    }
}
