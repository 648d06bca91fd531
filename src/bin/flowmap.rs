// src/bin/flowmap.rs

use clap::Parser;
use colored::Colorize;
use flowmap::cli::{Cli, dispatcher};

/// Sets up logging, parses arguments, dispatches, and handles every error in one place.
fn main() {
    env_logger::init();

    if let Err(e) = dispatcher::dispatch(Cli::parse()) {
        // Clap errors (including `--help` on an action) print themselves.
        if let Some(clap_err) = e.downcast_ref::<clap::Error>() {
            clap_err.exit();
        }
        eprintln!("\n{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}
