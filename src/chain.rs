use crate::{
    dispatch::Dispatcher,
    error::ChainError,
    interpolate::EnvResolver,
    mapping::{resolve_mapping, MappingStack},
    path::{get_value, split_path},
    types::{
        type_name, value_to_string, ChainRequest, ChainResult, ResponseAssertion,
        RESPONSE_ROOT_ARRAY_KEY,
    },
};
use log::{debug, info, warn};
use serde_json::{Map, Value};

#[derive(Debug, Clone)]
pub struct ChainOptions {
    pub halt_on_assertion_failure: bool,
    pub use_env: bool,
    pub env: EnvResolver,
}

impl Default for ChainOptions {
    fn default() -> Self {
        Self {
            halt_on_assertion_failure: true,
            use_env: true,
            env: EnvResolver::default(),
        }
    }
}

/// Rewrites a path declared against an array response so it resolves
/// inside the root wrapper. `[N].x` indexes the array, a bare `x` reads
/// from its first element.
pub fn root_array_path(path: &str) -> String {
    if path.starts_with('[') {
        format!("{}{}", RESPONSE_ROOT_ARRAY_KEY, path)
    } else {
        format!("{}[0].{}", RESPONSE_ROOT_ARRAY_KEY, path)
    }
}

/// One run over a request list. The accumulated result stays readable
/// after a fatal error.
pub struct ChainRun {
    requests: Vec<Value>,
    options: ChainOptions,
    mappings: MappingStack,
    result: ChainResult,
}

impl ChainRun {
    pub fn new(requests: Vec<Value>, options: ChainOptions) -> Self {
        Self {
            requests,
            options,
            mappings: MappingStack::new(),
            result: ChainResult::default(),
        }
    }

    #[cfg(test)]
    pub fn result(&self) -> &ChainResult {
        &self.result
    }

    pub fn into_result(self) -> ChainResult {
        self.result
    }

    pub fn execute(&mut self, dispatcher: &mut dyn Dispatcher) -> Result<(), ChainError> {
        for index in 0..self.requests.len() {
            self.step(index, dispatcher)?;
        }
        info!(
            "chain finished: {} requests, {} preserved items, {} assertion failures",
            self.requests.len(),
            self.result.preserved_items.len(),
            self.result.assertion_failures.len()
        );
        Ok(())
    }

    fn step(&mut self, index: usize, dispatcher: &mut dyn Dispatcher) -> Result<(), ChainError> {
        let mut raw = self.requests[index].clone();
        if self.options.use_env {
            self.options.env.replace_in_value(&mut raw);
        }
        let Some(raw_obj) = raw.as_object_mut() else {
            return Err(ChainError::config_at(index, "request is not a json object"));
        };
        if self.mappings.has_more() {
            debug!("request {}: applying mappings from request {}", index + 1, index);
        }
        self.mappings.drain_into(raw_obj);

        let request = ChainRequest::from_value(index, &raw)?;
        let prepared = if dispatcher.needs_request() {
            Some(request.prepare(index)?)
        } else {
            None
        };
        let response = dispatcher.dispatch(index, prepared.as_ref())?;
        let root_is_array = response.contains_key(RESPONSE_ROOT_ARRAY_KEY);
        let resolve_key = |key: &str| {
            if root_is_array {
                root_array_path(key)
            } else {
                key.to_string()
            }
        };

        for assertion in &request.response_assertions {
            let key = resolve_key(&assertion.check_response_key);
            self.check_assertion(index, assertion, &key, &response)?;
        }

        for mapping in &request.chain_mappings {
            let pending = resolve_mapping(
                index,
                mapping,
                &response,
                &mut self.result.preserved_items,
                &resolve_key(&mapping.use_response_key),
            )?;
            debug!(
                "request {}: pending <{}> -> {}",
                index + 1,
                pending.key_to_replace,
                pending.target_path
            );
            self.mappings.push(pending);
        }
        Ok(())
    }

    fn check_assertion(
        &mut self,
        index: usize,
        assertion: &ResponseAssertion,
        resolved_key: &str,
        response: &Map<String, Value>,
    ) -> Result<(), ChainError> {
        let actual = get_value(&split_path(resolved_key), response);
        let expected = &assertion.expected_value;
        if actual == Some(expected) {
            return Ok(());
        }

        let expected_text = value_to_string(expected);
        let actual_text = actual.map(value_to_string).unwrap_or_else(|| "null".to_string());
        self.result
            .assertion_failures
            .insert(expected_text.clone(), actual_text.clone());

        let err = ChainError::AssertionFailed {
            request: index + 1,
            path: assertion.check_response_key.clone(),
            expected: expected_text,
            expected_type: type_name(Some(expected)),
            actual: actual_text,
            actual_type: type_name(actual),
        };
        if self.options.halt_on_assertion_failure {
            return Err(err);
        }
        warn!("{}", err);
        Ok(())
    }
}

pub fn execute_chain(
    requests: Vec<Value>,
    dispatcher: &mut dyn Dispatcher,
    options: ChainOptions,
) -> Result<ChainResult, ChainError> {
    let mut run = ChainRun::new(requests, options);
    run.execute(dispatcher)?;
    Ok(run.into_result())
}
