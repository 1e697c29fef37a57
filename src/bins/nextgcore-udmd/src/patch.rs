//! JSON Patch (RFC 6902) over serde_json values
//!
//! PatchItem lists come in on EE subscription modification and are produced
//! internally from AMF registration modifications.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::{PatchItem, PatchOperation};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PatchError {
    #[error("Invalid JSON pointer: {0}")]
    InvalidPointer(String),

    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Missing '{field}' for {op:?} at {path}")]
    MissingField {
        op: PatchOperation,
        path: String,
        field: &'static str,
    },

    #[error("Test failed at {0}")]
    TestFailed(String),

    #[error("Patched document no longer matches its schema: {0}")]
    Schema(String),
}

/// Apply every item in order. On error the target is left unchanged.
pub fn apply_patch(target: &mut Value, items: &[PatchItem]) -> Result<(), PatchError> {
    let mut working = target.clone();
    for item in items {
        apply_item(&mut working, item)?;
    }
    *target = working;
    Ok(())
}

/// Patch a typed record through its JSON representation
pub fn patch_record<T>(record: &T, items: &[PatchItem]) -> Result<T, PatchError>
where
    T: Serialize + DeserializeOwned,
{
    let mut value = serde_json::to_value(record).map_err(|e| PatchError::Schema(e.to_string()))?;
    apply_patch(&mut value, items)?;
    serde_json::from_value(value).map_err(|e| PatchError::Schema(e.to_string()))
}

fn apply_item(doc: &mut Value, item: &PatchItem) -> Result<(), PatchError> {
    match item.op {
        PatchOperation::Add => add(doc, &item.path, required_value(item)?),
        PatchOperation::Remove => remove(doc, &item.path).map(|_| ()),
        PatchOperation::Replace => {
            let slot = pointer_mut(doc, &item.path)?;
            *slot = required_value(item)?;
            Ok(())
        }
        PatchOperation::Test => {
            let current = pointer_mut(doc, &item.path)?;
            if *current == required_value(item)? {
                Ok(())
            } else {
                Err(PatchError::TestFailed(item.path.clone()))
            }
        }
        PatchOperation::Copy => {
            let from = required_from(item)?;
            let value = pointer_mut(doc, from)?.clone();
            add(doc, &item.path, value)
        }
        PatchOperation::Move => {
            let from = required_from(item)?;
            if item.path.starts_with(&format!("{from}/")) {
                return Err(PatchError::InvalidPointer(item.path.clone()));
            }
            let value = remove(doc, from)?;
            add(doc, &item.path, value)
        }
    }
}

fn required_value(item: &PatchItem) -> Result<Value, PatchError> {
    item.value.clone().ok_or_else(|| PatchError::MissingField {
        op: item.op,
        path: item.path.clone(),
        field: "value",
    })
}

fn required_from(item: &PatchItem) -> Result<&str, PatchError> {
    item.from.as_deref().ok_or_else(|| PatchError::MissingField {
        op: item.op,
        path: item.path.clone(),
        field: "from",
    })
}

/// Split a JSON pointer into unescaped reference tokens
fn tokens(path: &str) -> Result<Vec<String>, PatchError> {
    if path.is_empty() {
        return Ok(Vec::new());
    }
    let rest = path
        .strip_prefix('/')
        .ok_or_else(|| PatchError::InvalidPointer(path.to_string()))?;
    Ok(rest
        .split('/')
        .map(|t| t.replace("~1", "/").replace("~0", "~"))
        .collect())
}

fn pointer_mut<'a>(doc: &'a mut Value, path: &str) -> Result<&'a mut Value, PatchError> {
    let mut current = doc;
    for token in tokens(path)? {
        current = match current {
            Value::Object(map) => map.get_mut(&token),
            Value::Array(list) => match token.parse::<usize>() {
                Ok(index) => list.get_mut(index),
                Err(_) => None,
            },
            _ => None,
        }
        .ok_or_else(|| PatchError::PathNotFound(path.to_string()))?;
    }
    Ok(current)
}

/// Resolve the parent container and the last token of `path`
fn parent_mut<'a>(doc: &'a mut Value, path: &str) -> Result<(&'a mut Value, String), PatchError> {
    let (parent, last) = path
        .rsplit_once('/')
        .ok_or_else(|| PatchError::InvalidPointer(path.to_string()))?;
    let last = last.replace("~1", "/").replace("~0", "~");
    Ok((pointer_mut(doc, parent)?, last))
}

fn add(doc: &mut Value, path: &str, value: Value) -> Result<(), PatchError> {
    if path.is_empty() {
        *doc = value;
        return Ok(());
    }

    let (parent, last) = parent_mut(doc, path)?;
    match parent {
        Value::Object(map) => {
            map.insert(last, value);
            Ok(())
        }
        Value::Array(list) => {
            let index = if last == "-" {
                list.len()
            } else {
                last.parse::<usize>()
                    .ok()
                    .filter(|i| *i <= list.len())
                    .ok_or_else(|| PatchError::PathNotFound(path.to_string()))?
            };
            list.insert(index, value);
            Ok(())
        }
        _ => Err(PatchError::PathNotFound(path.to_string())),
    }
}

fn remove(doc: &mut Value, path: &str) -> Result<Value, PatchError> {
    let (parent, last) = parent_mut(doc, path)?;
    let removed = match parent {
        Value::Object(map) => map.remove(&last),
        Value::Array(list) => last
            .parse::<usize>()
            .ok()
            .filter(|i| *i < list.len())
            .map(|i| list.remove(i)),
        _ => None,
    };
    removed.ok_or_else(|| PatchError::PathNotFound(path.to_string()))
}
