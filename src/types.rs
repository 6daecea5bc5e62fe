use crate::error::ChainError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{collections::BTreeMap, fmt, str::FromStr};

/// Key under which a bare json array response is nested.
pub const RESPONSE_ROOT_ARRAY_KEY: &str = "__responseRootWrapperKeyForArray__";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    #[serde(rename = "GET")]
    Get,
    #[serde(rename = "HEAD")]
    Head,
    #[serde(rename = "DELETE")]
    Delete,
    #[serde(rename = "POST")]
    Post,
    #[serde(rename = "PUT")]
    Put,
    #[serde(rename = "PATCH")]
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
        }
    }

    /// POST, PUT and PATCH send the request body.
    pub fn carries_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl FromStr for HttpMethod {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(HttpMethod::Get),
            "HEAD" => Ok(HttpMethod::Head),
            "DELETE" => Ok(HttpMethod::Delete),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            other => Err(ChainError::InvalidMethod(other.to_string())),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Endpoint {
    #[serde(default = "default_scheme")]
    pub scheme: String,
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub path: String,
    /// Kept as text so an unknown method surfaces as `InvalidMethod`
    /// rather than a deserialization failure.
    #[serde(rename = "type", default = "default_method")]
    pub method: String,
}

fn default_scheme() -> String {
    "http".to_string()
}

fn default_method() -> String {
    "GET".to_string()
}

impl Endpoint {
    pub fn http_method(&self) -> Result<HttpMethod, ChainError> {
        self.method.parse()
    }

    pub fn url(&self) -> String {
        match self.port {
            Some(port) => format!("{}://{}:{}{}", self.scheme, self.host, port, self.path),
            None => format!("{}://{}{}", self.scheme, self.host, self.path),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ResponseMapping {
    pub use_response_key: String,
    pub use_preserved_value: String,
    /// Accepted for compatibility with existing chain files; unused.
    #[allow(dead_code)]
    pub current_response_value: String,
    pub map_to: String,
    pub preserve_value_as: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResponseAssertion {
    pub check_response_key: String,
    #[serde(default)]
    pub expected_value: Value,
}

/// One element of the request list, read after env interpolation and
/// mapping substitution have been applied to its raw json.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ChainRequest {
    pub endpoint: Option<Endpoint>,
    pub body: Option<Value>,
    pub headers: Map<String, Value>,
    pub params: Map<String, Value>,
    pub chain_mappings: Vec<ResponseMapping>,
    pub response_assertions: Vec<ResponseAssertion>,
}

impl ChainRequest {
    pub fn from_value(index: usize, raw: &Value) -> Result<Self, ChainError> {
        if !raw.is_object() {
            return Err(ChainError::config_at(index, "request is not a json object"));
        }
        serde_json::from_value(raw.clone())
            .map_err(|e| ChainError::config_at(index, format!("malformed request: {}", e)))
    }

    pub fn prepare(&self, index: usize) -> Result<PreparedRequest, ChainError> {
        let endpoint = self
            .endpoint
            .clone()
            .ok_or_else(|| ChainError::config_at(index, "missing 'endpoint'"))?;
        let method = endpoint.http_method()?;
        Ok(PreparedRequest {
            method,
            body: self.body.as_ref().map(|b| b.to_string()),
            headers: string_pairs(&self.headers),
            params: string_pairs(&self.params),
            endpoint,
        })
    }
}

/// What actually goes over the wire for one step.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub endpoint: Endpoint,
    pub method: HttpMethod,
    pub body: Option<String>,
    pub headers: Vec<(String, String)>,
    pub params: Vec<(String, String)>,
}

fn string_pairs(map: &Map<String, Value>) -> Vec<(String, String)> {
    map.iter()
        .map(|(k, v)| (k.clone(), value_to_string(v)))
        .collect()
}

/// A mapping resolved against a concrete response, waiting for the next
/// request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMapping {
    pub key_to_replace: String,
    pub target_path: String,
    pub value: String,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChainResult {
    pub preserved_items: BTreeMap<String, String>,
    pub assertion_failures: BTreeMap<String, String>,
}

/// Strings render bare, everything else as compact json.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn type_name(value: Option<&Value>) -> &'static str {
    match value {
        None => "missing",
        Some(Value::Null) => "Null",
        Some(Value::Bool(_)) => "Boolean",
        Some(Value::Number(_)) => "Number",
        Some(Value::String(_)) => "String",
        Some(Value::Array(_)) => "Array",
        Some(Value::Object(_)) => "Object",
    }
}
