mod actions;
mod chain;
mod dispatch;
mod error;
mod fs;
mod interpolate;
mod mapping;
mod path;
mod types;
use actions::action_run;
use anyhow::Result;
use seahorse::{App, Context, Flag, FlagType};
use std::env;

fn main() -> Result<()> {
    env_logger::init();
    let args: Vec<String> = env::args().collect();
    build_app(action_run).run(args);
    Ok(())
}

fn build_app(action: fn(&Context)) -> App {
    App::new(env!("CARGO_PKG_NAME"))
        .description(env!("CARGO_PKG_DESCRIPTION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .version(env!("CARGO_PKG_VERSION"))
        .usage("reqchain [--config <path> | configFilePath=<path>] [--mock] [--no-halt]")
        .flag(
            Flag::new("config", FlagType::String)
                .description("Path to the json config file")
                .alias("c"),
        )
        .flag(
            Flag::new("configFilePath", FlagType::String)
                .description("Same as --config"),
        )
        .flag(
            Flag::new("mock", FlagType::Bool)
                .description("Serve responses from mockResponsesUri"),
        )
        .flag(
            Flag::new("no-halt", FlagType::Bool)
                .description("Record assertion failures and keep going"),
        )
        .action(action)
}
