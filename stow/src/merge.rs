//! In-place overlay of a persisted snapshot onto a freshly constructed object.
//!
//! For every key of the source, in source order:
//!
//! 1. If the source value is an array, is not object-like (`null`, object and
//!    array are object-like), or the target member is falsy, the source value
//!    replaces the target member wholesale.
//! 2. Otherwise the target member is merged into recursively, so an existing
//!    nested object keeps its identity.
//!
//! A `null` source over a truthy target therefore leaves the target alone.
//! A source object over a truthy array overlays its index keys (`"0"`, `"1"`,
//! ...) onto the elements; other keys have no slot in an array and are
//! dropped. Over a method it changes nothing. Over a truthy primitive it is an
//! [`Error::MergeType`]; keys processed before the failure stay applied.

use serde_json::{Map, Value as Json};

use crate::{
    errors::{Error, Result},
    object::{Object, ObjectRef},
    value::Value,
};

pub fn merge(target: &mut Object, source: &Map<String, Json>) -> Result<()> {
    merge_at(target, source, &mut Vec::new())
}

/// Merge a snapshot whose root may be `null` (no-op) or an object.
pub fn merge_value(target: &mut Object, source: &Json) -> Result<()> {
    match source {
        Json::Null => Ok(()),
        Json::Object(map) => merge(target, map),
        other => Err(Error::NotAnObject {
            found: json_type_name(other),
        }),
    }
}

pub fn merge_into(target: &ObjectRef, source: &Json) -> Result<()> {
    merge_value(&mut *target.write()?, source)
}

fn merge_at(
    target: &mut Object,
    source: &Map<String, Json>,
    path: &mut Vec<String>,
) -> Result<()> {
    for (key, incoming) in source {
        path.push(key.clone());

        if let Some(value) = merge_slot(target.get(key), incoming, path)? {
            target.set(key, value)?;
        }

        path.pop();
    }

    Ok(())
}

fn merge_array(
    items: &mut Vec<Value>,
    source: &Map<String, Json>,
    path: &mut Vec<String>,
) -> Result<()> {
    for (key, incoming) in source {
        // Past the end, only the next index extends the array
        let Some(index) = array_index(key).filter(|i| *i <= items.len()) else {
            continue;
        };

        if index == items.len() {
            items.push(Value::Null);
        }

        path.push(key.clone());

        if let Some(value) = merge_slot(Some(items[index].clone()), incoming, path)? {
            items[index] = value;
        }

        path.pop();
    }

    Ok(())
}

/// Replacement for a slot holding `current`, or `None` when the slot was
/// merged in place or is left alone.
fn merge_slot(
    current: Option<Value>,
    incoming: &Json,
    path: &mut Vec<String>,
) -> Result<Option<Value>> {
    let replace = incoming.is_array()
        || !is_object_like(incoming)
        || !current.as_ref().is_some_and(Value::is_truthy);

    if replace {
        return Ok(Some(Value::from(incoming.clone())));
    }

    // `null` has no members to overlay
    let Json::Object(nested) = incoming else {
        return Ok(None);
    };

    match current {
        Some(Value::Object(child)) => {
            let mut child = child.write()?;
            merge_at(&mut child, nested, path)?;
            Ok(None)
        }
        Some(Value::Array(mut items)) => {
            merge_array(&mut items, nested, path)?;
            Ok(Some(Value::Array(items)))
        }
        Some(Value::Function(_)) => Ok(None),
        other => Err(Error::MergeType {
            path: path.join("."),
            found: other.as_ref().map_or("undefined", Value::type_name),
        }),
    }
}

/// Canonical array index: decimal digits without leading zeros.
fn array_index(key: &str) -> Option<usize> {
    key.parse::<usize>()
        .ok()
        .filter(|index| index.to_string() == key)
}

fn is_object_like(value: &Json) -> bool {
    matches!(value, Json::Null | Json::Object(_) | Json::Array(_))
}

fn json_type_name(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}
