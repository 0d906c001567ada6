//! Compactor - an incremental asset build engine.

mod actor;
mod cli;
mod config;
mod core;
mod engine;
mod logger;
mod plugin;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::Cli;
use config::Options;
use engine::Engine;
use plugin::PluginRegistry;

fn main() -> Result<()> {
    // Ctrl+C handler first, before any blocking work
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {}
    }
    logger::set_verbose(cli.verbose);

    let options = Options::load(&cli)?;
    let plugins = PluginRegistry::with_defaults(&options);
    let mut engine = Engine::new(options, plugins);

    let stats = engine.index()?;
    log!(
        "index";
        "{} in {}",
        utils::plural::plural_count(engine.registry().len(), "file"),
        engine.options().display_path(&engine.options().source)
    );
    debug!("index"; "{:?}", stats);

    if cli.watch {
        cli::watch::run(engine)
    } else {
        cli::build::run(&engine)
    }
}
