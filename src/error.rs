use thiserror::Error;

/// Fatal conditions of a chain run. Request numbers in messages are 1-based.
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("configuration error in request {request}: {message}")]
    ConfigAt { request: usize, message: String },

    #[error("invalid request type specified: {0}")]
    InvalidMethod(String),

    #[error(
        "{method} request to {host}{}{path} failed with response code {status} and message: {message}",
        port_suffix(.port)
    )]
    Dispatch {
        method: String,
        host: String,
        port: Option<u16>,
        path: String,
        status: u16,
        message: String,
    },

    #[error("{method} request to {url} failed: {message}")]
    Transport {
        method: String,
        url: String,
        message: String,
    },

    #[error("response to request {request} is not a json object or array: {message}")]
    InvalidResponse { request: usize, message: String },

    #[error("no mocked response found for request {0}")]
    MockMissing(usize),

    #[error(
        "ASSERTION FAILURE on request {request} at {path} -> expected: {expected} ({expected_type}), \
         actual from response: {actual} ({actual_type})"
    )]
    AssertionFailed {
        request: usize,
        path: String,
        expected: String,
        expected_type: &'static str,
        actual: String,
        actual_type: &'static str,
    },
}

fn port_suffix(port: &Option<u16>) -> String {
    port.map(|p| format!(":{}", p)).unwrap_or_default()
}

impl ChainError {
    /// `index` is the zero-based position in the request list.
    pub fn config_at(index: usize, message: impl Into<String>) -> Self {
        ChainError::ConfigAt {
            request: index + 1,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatch_error(port: Option<u16>) -> ChainError {
        ChainError::Dispatch {
            method: "GET".to_string(),
            host: "api.test".to_string(),
            port,
            path: "/users".to_string(),
            status: 500,
            message: "Internal Server Error".to_string(),
        }
    }

    #[test]
    fn dispatch_message_with_port() {
        assert_eq!(
            dispatch_error(Some(8080)).to_string(),
            "GET request to api.test:8080/users failed with response code 500 \
             and message: Internal Server Error"
        );
    }

    #[test]
    fn dispatch_message_without_port() {
        assert_eq!(
            dispatch_error(None).to_string(),
            "GET request to api.test/users failed with response code 500 \
             and message: Internal Server Error"
        );
    }

    #[test]
    fn config_at_is_one_based() {
        assert_eq!(
            ChainError::config_at(0, "missing 'endpoint'").to_string(),
            "configuration error in request 1: missing 'endpoint'"
        );
    }
}
