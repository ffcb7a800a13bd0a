//! API doc generator - command-line tool documenting `#[api_doc]` annotated Rust handlers.
//!
//! # Usage
//!
//! ```bash
//! apidoc-from-source [OPTIONS] <PROJECT_PATH>
//! ```
//!
//! # Examples
//!
//! Entries grouped by resource, as JSON:
//! ```bash
//! apidoc-from-source ./my-api-project -r config/routes.yaml -o api.json
//! ```
//!
//! Markdown for one API version:
//! ```bash
//! apidoc-from-source ./my-api-project -f markdown --api-version 2.0 -o API.md
//! ```
//!
//! Swagger 1.2 declaration of the `/users` resource:
//! ```bash
//! apidoc-from-source ./my-api-project -f swagger --resource /users
//! ```

use anyhow::Result;
use apidoc_from_source::cli;
use clap::Parser;
use log::info;

fn main() -> Result<()> {
    // Parse first so the verbose flag can pick the log level
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("API doc generator starting...");

    let args = cli::parse_args_from_parsed(args)?;
    cli::run(args)?;

    info!("API documentation generation completed successfully");

    Ok(())
}
