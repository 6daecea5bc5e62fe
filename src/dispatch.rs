use crate::{
    error::ChainError,
    types::{PreparedRequest, RESPONSE_ROOT_ARRAY_KEY},
};
use log::debug;
use serde_json::{Map, Value};
use std::time::Duration;

/// Sends (or pretends to send) the request at `index` and returns the
/// normalized response object.
pub trait Dispatcher {
    fn dispatch(
        &mut self,
        index: usize,
        request: Option<&PreparedRequest>,
    ) -> Result<Map<String, Value>, ChainError>;

    /// Mock dispatchers never look at the request, so it need not be built.
    fn needs_request(&self) -> bool {
        true
    }
}

/// Objects pass through; arrays are nested under the reserved root key.
pub fn normalize_response(index: usize, value: Value) -> Result<Map<String, Value>, ChainError> {
    match value {
        Value::Object(obj) => Ok(obj),
        Value::Array(arr) => {
            let mut wrapper = Map::new();
            wrapper.insert(RESPONSE_ROOT_ARRAY_KEY.to_string(), Value::Array(arr));
            Ok(wrapper)
        }
        other => Err(ChainError::InvalidResponse {
            request: index + 1,
            message: other.to_string(),
        }),
    }
}

pub struct HttpDispatcher {
    agent: ureq::Agent,
}

impl Default for HttpDispatcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl HttpDispatcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

impl Dispatcher for HttpDispatcher {
    fn dispatch(
        &mut self,
        index: usize,
        request: Option<&PreparedRequest>,
    ) -> Result<Map<String, Value>, ChainError> {
        let request = request.ok_or_else(|| ChainError::config_at(index, "missing 'endpoint'"))?;
        let endpoint = &request.endpoint;
        let url = endpoint.url();
        debug!("request {}: {} {}", index + 1, request.method, url);

        let mut call = self.agent.request(request.method.as_str(), &url);
        for (k, v) in &request.params {
            call = call.query(k, v);
        }
        for (k, v) in &request.headers {
            call = call.set(k, v);
        }
        let sent = if request.method.carries_body() {
            call.set("Content-Type", "application/json")
                .send_string(request.body.as_deref().unwrap_or("{}"))
        } else {
            call.call()
        };

        let response = match sent {
            Ok(response) if (200..300).contains(&response.status()) => response,
            Ok(response) | Err(ureq::Error::Status(_, response)) => {
                return Err(ChainError::Dispatch {
                    method: request.method.to_string(),
                    host: endpoint.host.clone(),
                    port: endpoint.port,
                    path: endpoint.path.clone(),
                    status: response.status(),
                    message: response.status_text().to_string(),
                })
            }
            Err(e) => {
                return Err(ChainError::Transport {
                    method: request.method.to_string(),
                    url,
                    message: e.to_string(),
                })
            }
        };

        let text = response.into_string().map_err(|e| ChainError::Transport {
            method: request.method.to_string(),
            url: url.clone(),
            message: e.to_string(),
        })?;
        if text.trim().is_empty() {
            return Ok(Map::new());
        }
        let parsed: Value =
            serde_json::from_str(&text).map_err(|e| ChainError::InvalidResponse {
                request: index + 1,
                message: e.to_string(),
            })?;
        normalize_response(index, parsed)
    }
}

/// Serves the Nth element of a pre-loaded response list for request N.
pub struct MockDispatcher {
    responses: Vec<Value>,
}

impl MockDispatcher {
    pub fn new(responses: Vec<Value>) -> Self {
        Self { responses }
    }
}

impl Dispatcher for MockDispatcher {
    fn dispatch(
        &mut self,
        index: usize,
        _request: Option<&PreparedRequest>,
    ) -> Result<Map<String, Value>, ChainError> {
        debug!("request {}: using mocked response", index + 1);
        let response = self
            .responses
            .get(index)
            .cloned()
            .ok_or(ChainError::MockMissing(index + 1))?;
        normalize_response(index, response)
    }

    fn needs_request(&self) -> bool {
        false
    }
}
