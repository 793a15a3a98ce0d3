//! `courier config`: show where configuration comes from and what it resolved to.

use std::path::Path;

use anyhow::Result;
use console::style;

use courier_types::BusConfig;

pub fn show_config(config_dir: &Path, config: &BusConfig, json: bool) -> Result<()> {
    let config_file = config_dir.join("config.toml");
    let file_exists = config_file.is_file();

    if json {
        let report = serde_json::json!({
            "config_file": config_file.display().to_string(),
            "file_exists": file_exists,
            "config": config,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Courier v{}",
        style("⚡").bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!();
    println!("  {}", style("── Config ──").dim());
    let source = if file_exists {
        style("loaded").green()
    } else {
        style("defaults").yellow()
    };
    println!("  File:            {} ({source})", style(config_file.display()).dim());
    println!(
        "  Default timeout: {}",
        style(format!("{}ms", config.default_timeout_ms)).bold()
    );
    println!();
    Ok(())
}
