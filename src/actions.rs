use crate::{
    chain::{execute_chain, ChainOptions},
    dispatch::{Dispatcher, HttpDispatcher, MockDispatcher},
    fs::{open_config, open_json_array, AppConfig},
    interpolate::{render_output, EnvResolver},
};
use anyhow::{bail, Result};
use log::info;
use std::process;

pub fn action_run(c: &seahorse::Context) {
    match run(Invocation::from_context(c)) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// What the command line asked for, after seahorse has parsed its flags.
#[derive(Debug, Default, Clone, PartialEq)]
struct Invocation {
    config: Option<String>,
    args: Vec<String>,
    mock: bool,
    no_halt: bool,
}

impl Invocation {
    fn from_context(c: &seahorse::Context) -> Self {
        Self {
            config: c
                .string_flag("config")
                .or_else(|_| c.string_flag("configFilePath"))
                .ok(),
            args: c.args.clone(),
            mock: c.bool_flag("mock"),
            no_halt: c.bool_flag("no-halt"),
        }
    }

    fn config_path(&self) -> Result<String> {
        match self.config.as_deref() {
            Some("") => bail!("configFilePath value not found"),
            Some(path) => Ok(path.to_string()),
            None => config_path_from_args(&self.args),
        }
    }
}

fn run(invocation: Invocation) -> Result<String> {
    let path = invocation.config_path()?;
    if path.starts_with("http") {
        bail!("config files as URLs not yet supported")
    }
    let mut config = open_config(&path)?;
    if invocation.mock {
        config.use_mocks = true;
    }
    if invocation.no_halt {
        config.halt_on_assertion_failure = false;
    }
    run_config(&config)
}

/// Accepts `configFilePath=<path>`, `--configFilePath=<path>` (whole or
/// already split in two) or a bare path.
fn config_path_from_args(args: &[String]) -> Result<String> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--configFilePath" {
            return match iter.next() {
                Some(path) if !path.is_empty() => Ok(path.clone()),
                _ => bail!("configFilePath value not found"),
            };
        }
        let named = arg
            .strip_prefix("--configFilePath=")
            .or_else(|| arg.strip_prefix("configFilePath="));
        match named {
            Some("") => bail!("configFilePath value not found"),
            Some(path) => return Ok(path.to_string()),
            None => {}
        }
    }
    match args.first() {
        Some(path) if !path.is_empty() && !path.contains('=') && !path.starts_with('-') => {
            Ok(path.clone())
        }
        _ => bail!("configFilePath argument required"),
    }
}

fn run_config(config: &AppConfig) -> Result<String> {
    let requests = open_json_array(config.requests_path()?)?;
    let mut dispatcher: Box<dyn Dispatcher> = if config.use_mocks {
        info!("using mocked responses");
        Box::new(MockDispatcher::new(open_json_array(config.mock_responses_path()?)?))
    } else {
        Box::new(HttpDispatcher::default())
    };
    let options = ChainOptions {
        halt_on_assertion_failure: config.halt_on_assertion_failure,
        use_env: config.use_env,
        env: EnvResolver::new(config.env_fallback.clone()),
    };
    let result = execute_chain(requests, dispatcher.as_mut(), options)?;
    Ok(render_output(&config.template_string, &result.preserved_items))
}
