//! bookpress - build a book with an external renderer and publish it to a
//! hosting branch.

mod build;
mod cli;
mod config;
mod logger;
mod open;
mod publish;
mod redirect;
mod utils;
mod watch;

use anyhow::Result;
use build::build_book;
use clap::Parser;
use cli::{Cli, Commands};
use config::BookConfig;
use open::open_book;
use publish::publish_book;
use std::path::Path;
use watch::watch_book;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init_trace_from_env();

    let config = BookConfig::load(Path::new("."))?;

    match cli.selected() {
        Commands::Build => build_book(&config),
        Commands::Open => open_book(&config),
        Commands::Publish => publish_book(&config),
        Commands::Watch => watch_book(&config),
    }
}
