use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;

/// Office document automation server speaking MCP over stdio
#[derive(Parser, Debug, Clone)]
#[command(name = "office_suite_mcp", version, about)]
pub struct Config {
    /// Directory every document name is resolved against
    #[arg(long, env = "OFFICE_MCP_DOCUMENTS_DIR", default_value = "Documents")]
    pub documents_dir: PathBuf,

    /// Log level: error, warn, info, debug or trace
    #[arg(long, env = "OFFICE_MCP_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Also append log lines to this file
    #[arg(long, env = "OFFICE_MCP_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Configured level; anything unparsable means `info`
    pub fn level_filter(&self) -> LevelFilter {
        self.log_level.trim().parse().unwrap_or(LevelFilter::Info)
    }
}

/// Route `log` output to stderr (stdout carries the protocol) and the optional log file
pub fn init_logging(config: &Config) -> Result<()> {
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(config.level_filter())
        .chain(std::io::stderr());

    if let Some(path) = &config.log_file {
        let file = fern::log_file(path).with_context(|| format!("Failed to open log file {}", path.display()))?;
        dispatch = dispatch.chain(file);
    }

    dispatch.apply().context("Logger already initialised")?;
    Ok(())
}
