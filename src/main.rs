//! Simple Cache - fetch URLs through a disk-backed cache
//!
//! Prints cached or freshly fetched content, lists entries, or clears the
//! cache directory.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use log::debug;

use simple_cache::cli::{render_entries, Action, Cli, RunConfig};
use simple_cache::{Cacher, CacherOptions};

/// Writes content to `output`, or to stdout when no file is given
fn write_content(content: &[u8], output: Option<&Path>) -> io::Result<()> {
    match output {
        Some(path) => fs::write(path, content),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(content)?;
            stdout.flush()
        }
    }
}

fn run(config: RunConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut cacher = Cacher::new(&config.cache_dir, CacherOptions::default())?;
    debug!("Running {:?} in {}", config.action, cacher.cache_dir().display());

    match config.action {
        Action::Get {
            url,
            key,
            options,
            output,
        } => {
            let content = match key {
                Some(key) => cacher.retrieve(Some(&url), &key, options)?,
                None => cacher.retrieve_by_url(&url, options)?,
            };
            write_content(&content, output.as_deref())?;
        }
        Action::Key {
            key,
            options,
            output,
        } => {
            let content = cacher.retrieve_by_key(&key, options)?;
            write_content(&content, output.as_deref())?;
        }
        Action::List { json } => {
            let entries = cacher.entries()?;
            let rendered = render_entries(&entries, json)?;
            if !rendered.is_empty() {
                println!("{}", rendered);
            }
        }
        Action::Clear => cacher.clear()?,
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let result = RunConfig::from_cli(&cli)
        .map_err(Box::<dyn std::error::Error>::from)
        .and_then(run);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
