//! Filtered deep clone of a live object graph into plain JSON data.
//!
//! Only own enumerable members classified as [`MemberKind::PlainField`] are
//! copied. Accessors and callables are dropped, the behavior layer is never
//! visited, and nested objects are filtered recursively, including objects
//! held inside arrays.

use rustc_hash::FxHashSet;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as Json};

use crate::{
    errors::{Error, Result},
    object::{MemberKind, ObjectRef},
    value::Value,
};

/// Plain snapshot of `value`.
///
/// `Null` is returned unchanged rather than turned into an empty object.
pub fn snapshot(value: &Value) -> Result<Json> {
    Filter::default().value(value)
}

/// Plain snapshot of the object behind `obj`; always a JSON object.
pub fn snapshot_object(obj: &ObjectRef) -> Result<Json> {
    Filter::default().object(obj).map(Json::Object)
}

/// Snapshot `obj` and deserialize the plain data into `T`.
pub fn snapshot_as<T: DeserializeOwned>(obj: &ObjectRef) -> Result<T> {
    serde_json::from_value(snapshot_object(obj)?).map_err(Error::Shape)
}

/// Tracks the objects on the current descent path; a revisit is a cycle.
#[derive(Default)]
struct Filter {
    visiting: FxHashSet<usize>,
    path: Vec<String>,
}

// Implementations

impl Filter {
    fn object(&mut self, obj: &ObjectRef) -> Result<Map<String, Json>> {
        if !self.visiting.insert(obj.addr()) {
            return Err(Error::Cycle {
                path: self.path.join("."),
            });
        }

        let object = obj.read()?;
        let mut plain = Map::new();

        for key in object.keys() {
            if object.classify(key) != MemberKind::PlainField {
                continue;
            }

            let Some(value) = object.get(key) else {
                continue;
            };

            self.path.push(key.to_string());
            let cloned = self.value(&value)?;
            self.path.pop();

            plain.insert(key.to_string(), cloned);
        }

        drop(object);
        self.visiting.remove(&obj.addr());

        Ok(plain)
    }

    fn value(&mut self, value: &Value) -> Result<Json> {
        match value {
            Value::Object(obj) => self.object(obj).map(Json::Object),
            Value::Array(items) => {
                let mut cloned = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    self.path.push(i.to_string());
                    cloned.push(self.value(item)?);
                    self.path.pop();
                }
                Ok(Json::Array(cloned))
            }
            Value::Null => Ok(Json::Null),
            Value::Bool(b) => Ok(Json::Bool(*b)),
            Value::Number(n) => Ok(Json::Number(n.clone())),
            Value::String(s) => Ok(Json::String(s.clone())),
            // Only reachable inside arrays; JSON has no function form
            Value::Function(_) => Ok(Json::Null),
        }
    }
}
