//! Reactive observation substrate.
//!
//! The orchestrator needs exactly two capabilities: wrap an object so its
//! mutations are detectable, and subscribe a listener to those mutations.
//! [`Tracker`] is the in-process implementation; any other substrate plugs in
//! by implementing [`Reactive`].

use crate::{errors::Result, object::ObjectRef};

pub mod tracked;

// Re-exports
pub use tracked::{Subscription, Tracked, Tracker};

/// Change callback; runs once after every batch of mutations.
pub type Listener = Box<dyn FnMut() -> Result<()>>;

pub trait Reactive {
    /// Handle through which application code reads and mutates the state.
    type Live;

    /// Returned by [`Reactive::observe`]. Dropping it must not cancel the
    /// subscription.
    type Subscription;

    fn wrap(&self, target: ObjectRef) -> Self::Live;

    fn observe(&self, live: &Self::Live, listener: Listener) -> Self::Subscription;
}

impl<R: Reactive + ?Sized> Reactive for &R {
    type Live = R::Live;
    type Subscription = R::Subscription;

    fn wrap(&self, target: ObjectRef) -> Self::Live {
        (**self).wrap(target)
    }

    fn observe(&self, live: &Self::Live, listener: Listener) -> Self::Subscription {
        (**self).observe(live, listener)
    }
}
