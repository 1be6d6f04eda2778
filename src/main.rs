use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::runtime::Runtime;

use office_suite_mcp::config::{init_logging, Config};
use office_suite_mcp::mcp_handler;

fn main() -> Result<()> {
    let config = Config::parse();
    init_logging(&config)?;

    fs::create_dir_all(&config.documents_dir)
        .with_context(|| format!("Failed to create documents directory {}", config.documents_dir.display()))?;

    let rt = Runtime::new()?;
    rt.block_on(mcp_handler::start_server(config.documents_dir))?;

    Ok(())
}
