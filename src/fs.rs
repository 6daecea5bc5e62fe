use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::{collections::HashMap, fs, path::Path};

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub requests_uri: Option<String>,
    #[serde(default)]
    pub mock_responses_uri: String,
    #[serde(default)]
    pub use_mocks: bool,
    #[serde(default)]
    pub use_env: bool,
    #[serde(default)]
    pub template_string: String,
    #[serde(default = "default_halt")]
    pub halt_on_assertion_failure: bool,
    /// Values for `<env.NAME>` when NAME is not set in the process env.
    #[serde(default)]
    pub env_fallback: HashMap<String, String>,
}

fn default_halt() -> bool {
    true
}

impl AppConfig {
    pub fn requests_path(&self) -> Result<&str> {
        match self.requests_uri.as_deref() {
            Some(uri) => reject_url(uri),
            None => bail!("required config key 'requestsUri' not found in config file"),
        }
    }

    pub fn mock_responses_path(&self) -> Result<&str> {
        if self.mock_responses_uri.trim().is_empty() {
            bail!("'useMocks' is set but 'mockResponsesUri' is not defined in config file");
        }
        reject_url(&self.mock_responses_uri)
    }
}

fn reject_url(uri: &str) -> Result<&str> {
    if uri.starts_with("http") {
        bail!("URLs not yet supported: {}", uri)
    }
    Ok(uri)
}

pub fn open_config<P: AsRef<Path>>(path: P) -> Result<AppConfig>
where
    P: std::fmt::Debug,
{
    let file = fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to open config file: {:?}", path))?;
    serde_json::from_str(&file).with_context(|| format!("Failed to parse config file: {:?}", path))
}

/// Reads a file holding a json array; used for both requests and mocks.
pub fn open_json_array<P: AsRef<Path>>(path: P) -> Result<Vec<Value>>
where
    P: std::fmt::Debug,
{
    let file = fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to open file: {:?}", path))?;
    let parsed: Value =
        serde_json::from_str(&file).with_context(|| format!("Failed to parse json: {:?}", path))?;
    match parsed {
        Value::Array(items) => Ok(items),
        _ => bail!("Expected a json array in {:?}", path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_tmp(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn config_defaults() {
        let f = write_tmp(r#"{"requestsUri": "reqs.json"}"#);
        let config = open_config(f.path()).unwrap();
        assert_eq!(config.requests_path().unwrap(), "reqs.json");
        assert!(!config.use_mocks);
        assert!(!config.use_env);
        assert!(config.halt_on_assertion_failure);
        assert!(config.template_string.is_empty());
        assert!(config.env_fallback.is_empty());
    }

    #[test]
    fn config_full() {
        let f = write_tmp(
            r#"{
                "requestsUri": "reqs.json",
                "mockResponsesUri": "mocks.json",
                "useMocks": true,
                "useEnv": true,
                "templateString": "Bearer ${authToken}",
                "haltOnAssertionFailure": false,
                "envFallback": {"reqchain_host": "my.idp.com"}
            }"#,
        );
        let config = open_config(f.path()).unwrap();
        assert_eq!(config.mock_responses_path().unwrap(), "mocks.json");
        assert!(config.use_mocks && config.use_env);
        assert!(!config.halt_on_assertion_failure);
        assert_eq!(config.env_fallback["reqchain_host"], "my.idp.com");
    }

    #[test]
    fn missing_requests_uri() {
        let f = write_tmp(r#"{"useMocks": true}"#);
        let err = open_config(f.path()).unwrap().requests_path().unwrap_err();
        assert_eq!(
            err.to_string(),
            "required config key 'requestsUri' not found in config file"
        );
    }

    #[test]
    fn urls_are_rejected() {
        let f = write_tmp(r#"{"requestsUri": "https://example.com/reqs.json"}"#);
        assert!(open_config(f.path()).unwrap().requests_path().is_err());
    }

    #[test]
    fn json_array_required() {
        let f = write_tmp(r#"[{"a": 1}, [1, 2]]"#);
        assert_eq!(open_json_array(f.path()).unwrap().len(), 2);
        let f = write_tmp(r#"{"a": 1}"#);
        assert!(open_json_array(f.path()).is_err());
    }
}
