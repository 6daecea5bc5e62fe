use crate::{
    error::ChainError,
    path::{get_value, get_value_mut, split_path},
    types::{value_to_string, PendingMapping, ResponseMapping},
};
use log::debug;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Pending substitutions from the previous response. Drained newest first.
#[derive(Debug, Default)]
pub struct MappingStack {
    items: Vec<PendingMapping>,
}

impl MappingStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, mapping: PendingMapping) {
        self.items.push(mapping);
    }

    pub fn pop(&mut self) -> Option<PendingMapping> {
        self.items.pop()
    }

    #[cfg(test)]
    pub fn peek(&self) -> Option<&PendingMapping> {
        self.items.last()
    }

    pub fn has_more(&self) -> bool {
        !self.items.is_empty()
    }

    /// Applies every pending mapping to `request`, leaving the stack empty.
    pub fn drain_into(&mut self, request: &mut Map<String, Value>) {
        while let Some(mapping) = self.pop() {
            apply_mapping(&mapping, request);
        }
    }
}

/// Replaces `<key_to_replace>` inside the string at `target_path`.
/// Blank tokens, unresolved paths and non-string targets are left alone.
pub fn apply_mapping(mapping: &PendingMapping, request: &mut Map<String, Value>) {
    if mapping.key_to_replace.trim().is_empty() {
        return;
    }
    let path = split_path(&mapping.target_path);
    let Some(Value::String(existing)) = get_value_mut(&path, request) else {
        debug!("mapping target {} not found in request", mapping.target_path);
        return;
    };
    let pattern = format!("<{}>", mapping.key_to_replace);
    *existing = existing.replace(&pattern, &mapping.value);
    debug!("mapped {} into {}", pattern, mapping.target_path);
}

/// Evaluates one declared mapping against `response`, recording the value in
/// `preserved` when asked to. `index` is zero-based.
pub fn resolve_mapping(
    index: usize,
    mapping: &ResponseMapping,
    response: &Map<String, Value>,
    preserved: &mut BTreeMap<String, String>,
    response_key: &str,
) -> Result<PendingMapping, ChainError> {
    let from_response = mapping.use_response_key.trim();
    let from_preserved = mapping.use_preserved_value.trim();
    if !from_response.is_empty() && !from_preserved.is_empty() {
        return Err(ChainError::config_at(
            index,
            format!(
                "target location incorrectly defined in one of request {}'s mappings. \
                 defining 'useResponseKey' and 'usePreservedValue' in same mapping is not allowed.",
                index + 1
            ),
        ));
    }

    let (mut token, value) = if !from_preserved.is_empty() {
        let value = preserved.get(from_preserved).cloned().unwrap_or_default();
        (from_preserved.to_string(), value)
    } else {
        let value = get_value(&split_path(response_key), response)
            .map(value_to_string)
            .unwrap_or_default();
        let first = split_path(&mapping.use_response_key)[0].to_string();
        (first, value)
    };

    if !mapping.preserve_value_as.trim().is_empty() {
        preserved.insert(mapping.preserve_value_as.clone(), value.clone());
        token = mapping.preserve_value_as.clone();
    }

    Ok(PendingMapping {
        key_to_replace: token,
        target_path: mapping.map_to.clone(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    fn pending(token: &str, path: &str, value: &str) -> PendingMapping {
        PendingMapping {
            key_to_replace: token.to_string(),
            target_path: path.to_string(),
            value: value.to_string(),
        }
    }

    fn mapping(v: Value) -> ResponseMapping {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn stack_is_last_in_first_out() {
        let mut stack = MappingStack::new();
        stack.push(pending("a", "x", "1"));
        stack.push(pending("b", "x", "2"));
        assert_eq!(stack.peek().map(|m| m.key_to_replace.as_str()), Some("b"));
        assert_eq!(stack.pop().unwrap().key_to_replace, "b");
        assert_eq!(stack.pop().unwrap().key_to_replace, "a");
        assert!(!stack.has_more());
    }

    #[test]
    fn drain_replaces_placeholder_text() {
        let mut req = obj(json!({"headers": {"Authorization": "Bearer <authToken>"}}));
        let mut stack = MappingStack::new();
        stack.push(pending("authToken", "headers.Authorization", "abc123"));
        stack.drain_into(&mut req);
        assert!(!stack.has_more());
        assert_eq!(req["headers"]["Authorization"], json!("Bearer abc123"));
    }

    #[test]
    fn drain_handles_multiple_tokens_in_one_field() {
        let mut req = obj(json!({"body": {"url": "/users/<id>/orders/<order>"}}));
        let mut stack = MappingStack::new();
        stack.push(pending("id", "body.url", "7"));
        stack.push(pending("order", "body.url", "99"));
        stack.drain_into(&mut req);
        assert_eq!(req["body"]["url"], json!("/users/7/orders/99"));
    }

    #[test]
    fn newest_mapping_applies_first() {
        // The newer mapping rewrites the field into text the older one then matches.
        let mut req = obj(json!({"body": {"v": "<a>"}}));
        let mut stack = MappingStack::new();
        stack.push(pending("b", "body.v", "second"));
        stack.push(pending("a", "body.v", "<b>"));
        stack.drain_into(&mut req);
        assert_eq!(req["body"]["v"], json!("second"));
    }

    #[test]
    fn blank_token_and_non_strings_are_untouched() {
        let mut req = obj(json!({"body": {"n": 5, "s": "<x>"}}));
        apply_mapping(&pending("", "body.s", "y"), &mut req);
        apply_mapping(&pending("x", "body.n", "y"), &mut req);
        apply_mapping(&pending("x", "body.missing", "y"), &mut req);
        assert_eq!(req, obj(json!({"body": {"n": 5, "s": "<x>"}})));
    }

    #[test]
    fn resolve_from_response_and_preserve() {
        let response = obj(json!({"token": "abc123"}));
        let mut preserved = BTreeMap::new();
        let m = mapping(json!({
            "useResponseKey": "token",
            "preserveValueAs": "authToken",
            "mapTo": "headers.Authorization"
        }));
        let p = resolve_mapping(0, &m, &response, &mut preserved, "token").unwrap();
        assert_eq!(p, pending("authToken", "headers.Authorization", "abc123"));
        assert_eq!(preserved["authToken"], "abc123");
    }

    #[test]
    fn token_defaults_to_first_response_segment() {
        let response = obj(json!({"user": {"id": 42}}));
        let mut preserved = BTreeMap::new();
        let m = mapping(json!({"useResponseKey": "user.id", "mapTo": "params.uid"}));
        let p = resolve_mapping(0, &m, &response, &mut preserved, "user.id").unwrap();
        assert_eq!(p, pending("user", "params.uid", "42"));
        assert!(preserved.is_empty());
    }

    #[test]
    fn missing_values_degrade_to_empty() {
        let response = obj(json!({}));
        let mut preserved = BTreeMap::new();
        let m = mapping(json!({"useResponseKey": "nope", "mapTo": "a"}));
        assert_eq!(resolve_mapping(0, &m, &response, &mut preserved, "nope").unwrap().value, "");
        let m = mapping(json!({"usePreservedValue": "unknown", "mapTo": "a"}));
        assert_eq!(resolve_mapping(0, &m, &response, &mut preserved, "").unwrap().value, "");
    }

    #[test]
    fn preserved_value_is_reused_verbatim() {
        let response = obj(json!({}));
        let mut preserved = BTreeMap::new();
        preserved.insert("authToken".to_string(), "a b=c%".to_string());
        let m = mapping(json!({"usePreservedValue": "authToken", "mapTo": "headers.x"}));
        let p = resolve_mapping(1, &m, &response, &mut preserved, "").unwrap();
        assert_eq!(p, pending("authToken", "headers.x", "a b=c%"));
    }

    #[test]
    fn both_sources_is_a_config_error() {
        let mut preserved = BTreeMap::new();
        let m = mapping(json!({"useResponseKey": "a", "usePreservedValue": "b"}));
        let err = resolve_mapping(2, &m, &Map::new(), &mut preserved, "a").unwrap_err();
        assert!(err.to_string().contains("request 3's mappings"));
    }
}
