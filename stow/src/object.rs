//! Object graph with explicit member descriptors.
//!
//! An [`Object`] owns an insertion-ordered table of members. Each member is
//! either a data field or an accessor (getter and/or setter); a field whose
//! value is a [`Callable`] is a method. Behavior shared by many objects lives
//! in a separate [`Behavior`] layer that is consulted after the own members
//! and is never enumerated, merged or cloned into a snapshot.

use std::{
    cell::{Ref, RefCell, RefMut},
    fmt,
    rc::Rc,
};

use indexmap::IndexMap;
use serde_json::{Map, Value as Json};

use crate::{
    errors::{Error, Result},
    value::{Callable, Value},
};

pub type Getter = Rc<dyn Fn(&Object) -> Value>;
pub type Setter = Rc<dyn Fn(&mut Object, Value) -> Result<()>>;

/// Descriptor of a single member.
#[derive(Clone)]
pub enum Member {
    Field {
        value: Value,
        enumerable: bool,
    },
    Accessor {
        get: Option<Getter>,
        set: Option<Setter>,
        enumerable: bool,
    },
}

/// Classification of a member as seen by the snapshot filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    PlainField,
    Accessor,
    Callable,
}

/// Shared accessors and methods, resolved after an object's own members.
#[derive(Default, Clone)]
pub struct Behavior {
    members: IndexMap<String, Member>,
}

#[derive(Default, Clone)]
pub struct Object {
    members: IndexMap<String, Member>,
    behavior: Option<Rc<Behavior>>,
}

/// Shared, interior-mutable handle to an [`Object`].
///
/// Cloning the handle never clones the object; identity is the allocation.
#[derive(Default, Clone)]
pub struct ObjectRef(Rc<RefCell<Object>>);

enum Assignment {
    Overwrite,
    Setter(Setter),
    ReadOnly,
    Append,
}

// Implementations

impl Member {
    pub fn field(value: impl Into<Value>) -> Self {
        Member::Field {
            value: value.into(),
            enumerable: true,
        }
    }

    pub fn hidden(value: impl Into<Value>) -> Self {
        Member::Field {
            value: value.into(),
            enumerable: false,
        }
    }

    pub fn method(f: impl Fn(&mut Object, &[Value]) -> Result<Value> + 'static) -> Self {
        Member::field(Callable::new(f))
    }

    pub fn getter(get: impl Fn(&Object) -> Value + 'static) -> Self {
        Member::Accessor {
            get: Some(Rc::new(get)),
            set: None,
            enumerable: true,
        }
    }

    pub fn accessor(
        get: impl Fn(&Object) -> Value + 'static,
        set: impl Fn(&mut Object, Value) -> Result<()> + 'static,
    ) -> Self {
        Member::Accessor {
            get: Some(Rc::new(get)),
            set: Some(Rc::new(set)),
            enumerable: true,
        }
    }

    pub fn is_enumerable(&self) -> bool {
        match self {
            Member::Field { enumerable, .. } | Member::Accessor { enumerable, .. } => *enumerable,
        }
    }

    pub fn is_accessor(&self) -> bool {
        matches!(self, Member::Accessor { .. })
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Member::Field { value, enumerable } => f
                .debug_struct("Field")
                .field("value", value)
                .field("enumerable", enumerable)
                .finish(),
            Member::Accessor {
                get,
                set,
                enumerable,
            } => f
                .debug_struct("Accessor")
                .field("get", &get.is_some())
                .field("set", &set.is_some())
                .field("enumerable", enumerable)
                .finish(),
        }
    }
}

impl Behavior {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&mut Object, &[Value]) -> Result<Value> + 'static,
    ) -> Self {
        self.members.insert(name.into(), Member::method(f));
        self
    }

    pub fn getter(
        mut self,
        name: impl Into<String>,
        get: impl Fn(&Object) -> Value + 'static,
    ) -> Self {
        self.members.insert(name.into(), Member::getter(get));
        self
    }

    pub fn accessor(
        mut self,
        name: impl Into<String>,
        get: impl Fn(&Object) -> Value + 'static,
        set: impl Fn(&mut Object, Value) -> Result<()> + 'static,
    ) -> Self {
        self.members.insert(name.into(), Member::accessor(get, set));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Member> {
        self.members.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    pub fn into_shared(self) -> Rc<Self> {
        Rc::new(self)
    }
}

impl fmt::Debug for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.members.keys()).finish()
    }
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behavior(behavior: Rc<Behavior>) -> Self {
        Self {
            members: IndexMap::new(),
            behavior: Some(behavior),
        }
    }

    pub fn behavior(&self) -> Option<&Rc<Behavior>> {
        self.behavior.as_ref()
    }

    /// Define an enumerable data field, replacing any member under `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Member> {
        self.define(key, Member::field(value))
    }

    /// Define `member` under `key`, replacing any existing descriptor in place.
    pub fn define(&mut self, key: impl Into<String>, member: Member) -> Option<Member> {
        self.members.insert(key.into(), member)
    }

    pub fn define_hidden(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Option<Member> {
        self.define(key, Member::hidden(value))
    }

    pub fn define_method(
        &mut self,
        key: impl Into<String>,
        f: impl Fn(&mut Object, &[Value]) -> Result<Value> + 'static,
    ) -> Option<Member> {
        self.define(key, Member::method(f))
    }

    pub fn define_getter(
        &mut self,
        key: impl Into<String>,
        get: impl Fn(&Object) -> Value + 'static,
    ) -> Option<Member> {
        self.define(key, Member::getter(get))
    }

    pub fn define_accessor(
        &mut self,
        key: impl Into<String>,
        get: impl Fn(&Object) -> Value + 'static,
        set: impl Fn(&mut Object, Value) -> Result<()> + 'static,
    ) -> Option<Member> {
        self.define(key, Member::accessor(get, set))
    }

    /// Own descriptor only; the behavior layer is not consulted.
    pub fn descriptor(&self, key: &str) -> Option<&Member> {
        self.members.get(key)
    }

    /// Own descriptor, falling back to the behavior layer.
    pub fn lookup(&self, key: &str) -> Option<&Member> {
        self.members
            .get(key)
            .or_else(|| self.behavior.as_deref().and_then(|b| b.get(key)))
    }

    /// Resolve `key` to a value, invoking a getter if the member is an accessor.
    ///
    /// `None` means the member is absent or is an accessor without a getter.
    pub fn get(&self, key: &str) -> Option<Value> {
        match self.lookup(key)? {
            Member::Field { value, .. } => Some(value.clone()),
            Member::Accessor { get, .. } => get.as_ref().map(|get| get(self)),
        }
    }

    /// Assign `value` to `key`.
    ///
    /// Fields keep their enumerability, accessors route through their setter
    /// and absent members are appended as enumerable fields.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();

        let assignment = match self.lookup(key) {
            Some(Member::Field { .. }) if self.members.contains_key(key) => Assignment::Overwrite,
            Some(Member::Field { .. }) | None => Assignment::Append,
            Some(Member::Accessor { set: Some(set), .. }) => Assignment::Setter(set.clone()),
            Some(Member::Accessor { set: None, .. }) => Assignment::ReadOnly,
        };

        match assignment {
            Assignment::Overwrite => {
                if let Some(Member::Field { value: slot, .. }) = self.members.get_mut(key) {
                    *slot = value;
                }
                Ok(())
            }
            Assignment::Append => {
                self.members.insert(key.to_string(), Member::field(value));
                Ok(())
            }
            Assignment::Setter(set) => set(self, value),
            Assignment::ReadOnly => Err(Error::ReadOnly {
                key: key.to_string(),
            }),
        }
    }

    /// Invoke the callable `key` resolves to with `self` as receiver.
    pub fn call(&mut self, key: &str, args: &[Value]) -> Result<Value> {
        match self.get(key) {
            Some(Value::Function(f)) => f.call(self, args),
            _ => Err(Error::NotCallable {
                key: key.to_string(),
            }),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Member> {
        self.members.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.members.contains_key(key)
    }

    /// Own enumerable keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.members
            .iter()
            .filter(|(_, member)| member.is_enumerable())
            .map(|(key, _)| key.as_str())
    }

    /// Own enumerable members in insertion order.
    pub fn members(&self) -> impl Iterator<Item = (&str, &Member)> {
        self.members
            .iter()
            .filter(|(_, member)| member.is_enumerable())
            .map(|(key, member)| (key.as_str(), member))
    }

    /// Number of own members, enumerable or not.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Classify `key` for snapshotting.
    ///
    /// A member that resolves to a callable is `Callable`; an own accessor is
    /// `Accessor`; everything else, including an absent member, is a
    /// `PlainField`.
    pub fn classify(&self, key: &str) -> MemberKind {
        if matches!(self.get(key), Some(Value::Function(_))) {
            return MemberKind::Callable;
        }

        match self.members.get(key) {
            Some(Member::Accessor { .. }) => MemberKind::Accessor,
            _ => MemberKind::PlainField,
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.members.iter()).finish()
    }
}

impl ObjectRef {
    pub fn new(object: Object) -> Self {
        Self(Rc::new(RefCell::new(object)))
    }

    pub fn read(&self) -> Result<Ref<'_, Object>> {
        self.0.try_borrow().map_err(|_| Error::Borrowed)
    }

    pub fn write(&self) -> Result<RefMut<'_, Object>> {
        self.0.try_borrow_mut().map_err(|_| Error::Borrowed)
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({:#x})", self.addr())
    }
}

impl From<Object> for ObjectRef {
    fn from(object: Object) -> Self {
        ObjectRef::new(object)
    }
}

impl From<Map<String, Json>> for ObjectRef {
    fn from(map: Map<String, Json>) -> Self {
        let mut object = Object::new();
        for (key, value) in map {
            object.insert(key, Value::from(value));
        }
        ObjectRef::new(object)
    }
}
