use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static INDEXED_SEGMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*?)\[([0-9]+)\]$").unwrap());

/// One dotted component, e.g. `items[2]` is `{ name: "items", index: Some(2) }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub name: &'a str,
    pub index: Option<usize>,
}

impl<'a> Segment<'a> {
    pub fn parse(raw: &'a str) -> Self {
        if let Some(caps) = INDEXED_SEGMENT_RE.captures(raw) {
            if let (Some(name), Some(index)) = (caps.get(1), caps.get(2)) {
                if let Ok(index) = index.as_str().parse::<usize>() {
                    return Segment {
                        name: name.as_str(),
                        index: Some(index),
                    };
                }
            }
        }
        Segment {
            name: raw,
            index: None,
        }
    }
}

pub fn split_path(path: &str) -> Vec<&str> {
    path.split('.').collect()
}

/// Returns the object holding the final segment's key. Intermediate
/// segments must name objects, or arrays when they carry an index.
pub fn find_parent<'a>(
    path: &[&str],
    root: &'a Map<String, Value>,
) -> Option<&'a Map<String, Value>> {
    let Some((last, init)) = path.split_last() else {
        return Some(root);
    };
    let mut current = root;
    for raw in init {
        let seg = Segment::parse(raw);
        current = match (current.get(seg.name)?, seg.index) {
            (Value::Array(items), Some(i)) => items.get(i)?.as_object()?,
            (Value::Object(obj), None) => obj,
            _ => return None,
        };
    }
    if current.contains_key(Segment::parse(last).name) {
        Some(current)
    } else {
        None
    }
}

pub fn find_parent_mut<'a>(
    path: &[&str],
    root: &'a mut Map<String, Value>,
) -> Option<&'a mut Map<String, Value>> {
    let Some((last, init)) = path.split_last() else {
        return Some(root);
    };
    let mut current = root;
    for raw in init {
        let seg = Segment::parse(raw);
        current = match (current.get_mut(seg.name)?, seg.index) {
            (Value::Array(items), Some(i)) => items.get_mut(i)?.as_object_mut()?,
            (Value::Object(obj), None) => obj,
            _ => return None,
        };
    }
    if current.contains_key(Segment::parse(last).name) {
        Some(current)
    } else {
        None
    }
}

pub fn get_value<'a>(path: &[&str], root: &'a Map<String, Value>) -> Option<&'a Value> {
    let parent = find_parent(path, root)?;
    let seg = Segment::parse(path.last()?);
    let value = parent.get(seg.name)?;
    match seg.index {
        Some(i) => value.as_array()?.get(i),
        None => Some(value),
    }
}

/// Mutable counterpart of [`get_value`], used to rewrite request fields.
pub fn get_value_mut<'a>(
    path: &[&str],
    root: &'a mut Map<String, Value>,
) -> Option<&'a mut Value> {
    let seg = Segment::parse(path.last()?);
    let parent = find_parent_mut(path, root)?;
    let value = parent.get_mut(seg.name)?;
    match seg.index {
        Some(i) => value.as_array_mut()?.get_mut(i),
        None => Some(value),
    }
}
