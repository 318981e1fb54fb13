//! Value lookup and mutation by path
//!
//! Map segments are keys, list segments are element indices. A leading `$`
//! (or `$.`) denotes the root and is ignored.

use std::mem;

use super::{parse_index, split_segments, PathError, PathResult};
use crate::value::Value;

fn segments(path: &str) -> Vec<&str> {
    let path = match path.strip_prefix('$') {
        Some(rest) => rest.strip_prefix('.').unwrap_or(rest),
        None => path,
    };
    split_segments(path)
}

fn child<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Map(map) => map.get(segment),
        Value::List(items) => items.get(parse_index(segment)?),
        _ => None,
    }
}

pub fn get<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    segments(path)
        .into_iter()
        .try_fold(root, |current, segment| child(current, segment))
}

pub fn get_mut<'a>(root: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    walk_mut(root, &segments(path), path).ok()
}

fn walk_mut<'a>(root: &'a mut Value, segments: &[&str], path: &str) -> PathResult<&'a mut Value> {
    let mut current = root;
    for &segment in segments {
        let found = current.type_name();
        current = match current {
            Value::Map(map) => map.get_mut(segment),
            Value::List(items) => match parse_index(segment) {
                Some(index) => items.get_mut(index),
                None => None,
            },
            _ => return Err(not_container(path, segment, found)),
        }
        .ok_or_else(|| not_found(path, segment))?;
    }
    Ok(current)
}

/// Stores `value` at `path`, returning the value it replaced. Intermediate
/// containers must exist; a list index equal to the length appends.
pub fn set(root: &mut Value, path: &str, value: Value) -> PathResult<Option<Value>> {
    let segments = segments(path);
    let Some((last, parents)) = segments.split_last() else {
        return Ok(Some(mem::replace(root, value)));
    };
    let parent = walk_mut(root, parents, path)?;
    let found = parent.type_name();
    match parent {
        Value::Map(map) => Ok(map.insert(last.to_string(), value)),
        Value::List(items) => {
            let index = parse_index(last).ok_or_else(|| not_found(path, last))?;
            if index < items.len() {
                Ok(Some(mem::replace(&mut items[index], value)))
            } else if index == items.len() {
                items.push(value);
                Ok(None)
            } else {
                Err(not_found(path, last))
            }
        }
        _ => Err(not_container(path, last, found)),
    }
}

/// Removes and returns the value at `path`; list elements shift down
pub fn remove(root: &mut Value, path: &str) -> Option<Value> {
    let segments = segments(path);
    let (last, parents) = segments.split_last()?;
    match walk_mut(root, parents, path).ok()? {
        Value::Map(map) => map.remove(*last),
        Value::List(items) => {
            let index = parse_index(last).filter(|&i| i < items.len())?;
            Some(items.remove(index))
        }
        _ => None,
    }
}

fn not_found(path: &str, segment: &str) -> PathError {
    PathError::NotFound {
        path: path.to_string(),
        segment: segment.to_string(),
    }
}

fn not_container(path: &str, segment: &str, found: &'static str) -> PathError {
    PathError::NotContainer {
        path: path.to_string(),
        segment: segment.to_string(),
        found,
    }
}
