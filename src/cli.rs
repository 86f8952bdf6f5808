//! Command-line interface parsing for Simple Cache
//!
//! This module handles parsing of CLI arguments using clap and turns them into
//! a [`RunConfig`] that the binary executes against a [`Cacher`](crate::Cacher).

use std::path::PathBuf;
use std::time::Duration;

use chrono::Local;
use clap::{Parser, Subcommand};
use directories::ProjectDirs;
use thiserror::Error;

use crate::cache::{CacheEntryInfo, RetrieveOptions};

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// The expiration is not a positive number of seconds
    #[error("Invalid expiration: '{0}'. Expected a positive number of seconds")]
    InvalidExpiration(String),

    /// No --cache-dir was given and no platform cache directory is available
    #[error("Cannot determine a cache directory; pass --cache-dir")]
    NoCacheDir,
}

/// Simple Cache - fetch URLs through a disk-backed cache
#[derive(Parser, Debug)]
#[command(name = "simple-cache")]
#[command(about = "Disk-backed HTTP response cache")]
#[command(version)]
pub struct Cli {
    /// Directory holding cache files (defaults to the platform cache directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch a URL, serving it from the cache when possible
    Get {
        /// URL to fetch
        url: String,

        /// Cache key to store the content under (defaults to the MD5 of the URL)
        #[arg(long)]
        key: Option<String>,

        /// Maximum age of a cached entry in seconds
        #[arg(long, value_name = "SECS", value_parser = parse_expiration)]
        expiration: Option<Duration>,

        /// Show download progress on stderr
        #[arg(long)]
        progress: bool,

        /// Write the content to FILE instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Print the cached content for a key
    Key {
        /// Cache key
        key: String,

        /// Maximum age of a cached entry in seconds
        #[arg(long, value_name = "SECS", value_parser = parse_expiration)]
        expiration: Option<Duration>,

        /// Write the content to FILE instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// List cached entries
    List {
        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove every cached entry
    Clear,
}

/// What the binary should do, with defaults resolved
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Get {
        url: String,
        key: Option<String>,
        options: RetrieveOptions,
        output: Option<PathBuf>,
    },
    Key {
        key: String,
        options: RetrieveOptions,
        output: Option<PathBuf>,
    },
    List {
        json: bool,
    },
    Clear,
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Directory the cacher operates on
    pub cache_dir: PathBuf,
    pub action: Action,
}

/// Parses an expiration argument given in whole seconds
///
/// # Returns
/// * `Ok(Duration)` for a positive integer
/// * `Err(CliError::InvalidExpiration)` for zero or anything non-numeric
pub fn parse_expiration(s: &str) -> Result<Duration, CliError> {
    match s.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(CliError::InvalidExpiration(s.to_string())),
    }
}

/// Platform cache directory, e.g. `~/.cache/simple-cache` on Linux
pub fn default_cache_dir() -> Option<PathBuf> {
    let project_dirs = ProjectDirs::from("", "", "simple-cache")?;
    Some(project_dirs.cache_dir().to_path_buf())
}

impl RunConfig {
    /// Creates a RunConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(RunConfig)` with defaults applied
    /// * `Err(CliError::NoCacheDir)` if no cache directory can be determined
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let cache_dir = match &cli.cache_dir {
            Some(dir) => dir.clone(),
            None => default_cache_dir().ok_or(CliError::NoCacheDir)?,
        };

        let action = match &cli.command {
            Command::Get {
                url,
                key,
                expiration,
                progress,
                output,
            } => Action::Get {
                url: url.clone(),
                key: key.clone(),
                options: retrieve_options(*expiration, *progress),
                output: output.clone(),
            },
            Command::Key {
                key,
                expiration,
                output,
            } => Action::Key {
                key: key.clone(),
                options: retrieve_options(*expiration, false),
                output: output.clone(),
            },
            Command::List { json } => Action::List { json: *json },
            Command::Clear => Action::Clear,
        };

        Ok(RunConfig { cache_dir, action })
    }
}

fn retrieve_options(expiration: Option<Duration>, show_progress: bool) -> RetrieveOptions {
    RetrieveOptions {
        show_progress,
        expiration,
    }
}

/// Renders cache entries as a table, or as pretty JSON when `json` is set
pub fn render_entries(entries: &[CacheEntryInfo], json: bool) -> Result<String, serde_json::Error> {
    if json {
        return serde_json::to_string_pretty(entries);
    }

    let lines: Vec<String> = entries
        .iter()
        .map(|entry| {
            format!(
                "{}  {:>10}  {}",
                entry.modified.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
                entry.size,
                entry.key
            )
        })
        .collect();
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entry(key: &str, size: u64) -> CacheEntryInfo {
        CacheEntryInfo {
            key: key.to_string(),
            size,
            modified: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_parse_expiration_accepts_positive_seconds() {
        assert_eq!(parse_expiration("100").unwrap(), Duration::from_secs(100));
        assert_eq!(parse_expiration(" 5 ").unwrap(), Duration::from_secs(5));
    }

    #[test]
    fn test_parse_expiration_rejects_zero_and_garbage() {
        for input in ["0", "-1", "soon", ""] {
            let err = parse_expiration(input).unwrap_err();
            assert!(err.to_string().contains("Invalid expiration"), "{}", input);
        }
    }

    #[test]
    fn test_cli_parse_get_defaults() {
        let cli = Cli::parse_from(["simple-cache", "--cache-dir", "/tmp/c", "get", "http://a/"]);
        let config = RunConfig::from_cli(&cli).unwrap();

        assert_eq!(config.cache_dir, PathBuf::from("/tmp/c"));
        assert_eq!(
            config.action,
            Action::Get {
                url: "http://a/".to_string(),
                key: None,
                options: RetrieveOptions::default(),
                output: None,
            }
        );
    }

    #[test]
    fn test_cli_parse_get_with_all_flags() {
        let cli = Cli::parse_from([
            "simple-cache",
            "get",
            "http://a/",
            "--key",
            "a",
            "--expiration",
            "60",
            "--progress",
            "-o",
            "out.bin",
            "--cache-dir",
            "/tmp/c",
        ]);
        let config = RunConfig::from_cli(&cli).unwrap();

        assert_eq!(
            config.action,
            Action::Get {
                url: "http://a/".to_string(),
                key: Some("a".to_string()),
                options: RetrieveOptions::default()
                    .show_progress(true)
                    .expiration_secs(60),
                output: Some(PathBuf::from("out.bin")),
            }
        );
    }

    #[test]
    fn test_cli_parse_rejects_zero_expiration() {
        let result = Cli::try_parse_from(["simple-cache", "key", "a", "--expiration", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_list_and_clear() {
        let cli = Cli::parse_from(["simple-cache", "--cache-dir", "/tmp/c", "list", "--json"]);
        assert_eq!(
            RunConfig::from_cli(&cli).unwrap().action,
            Action::List { json: true }
        );

        let cli = Cli::parse_from(["simple-cache", "--cache-dir", "/tmp/c", "clear"]);
        assert_eq!(RunConfig::from_cli(&cli).unwrap().action, Action::Clear);
    }

    #[test]
    fn test_default_cache_dir_mentions_project() {
        if let Some(dir) = default_cache_dir() {
            assert!(dir.to_string_lossy().contains("simple-cache"));
        }
        // Passes if there is no home directory (e.g. in CI)
    }

    #[test]
    fn test_render_entries_table() {
        let rendered = render_entries(&[entry("a", 7), entry("b", 1024)], false).unwrap();

        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("  a"));
        assert!(lines[1].contains("1024"));
    }

    #[test]
    fn test_render_entries_json() {
        let rendered = render_entries(&[entry("a", 7)], true).unwrap();

        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value[0]["key"], "a");
        assert_eq!(value[0]["size"], 7);
        assert!(value[0]["modified"].as_str().unwrap().starts_with("2024-05-01"));
    }
}
