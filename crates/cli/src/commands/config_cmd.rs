//! `scrivener config` — Configuration management commands.

use scrivener_config::AppConfig;
use std::path::Path;

const REDACTED: &str = "[REDACTED]";

pub async fn show(explicit: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(explicit).map_err(|e| format!("Failed to load config: {e}"))?;

    println!("# {}", super::config_file(explicit).display());
    println!("{}", render_redacted(&config)?);

    match config.pipeline_settings() {
        Ok(settings) => println!("# ✅ Valid: {} stage(s)", settings.stages.len()),
        Err(e) => println!("# ⚠️  {e}"),
    }
    Ok(())
}

pub async fn init(explicit: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let path = super::config_file(explicit);

    if path.exists() {
        println!("  Config already exists: {}", path.display());
        return Ok(());
    }

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(&path, AppConfig::default_toml())?;
    println!("✅ Created {}", path.display());
    println!("   Set SCRIVENER_API_KEY (or provider.api_key) before running `scrivener refine`.");
    Ok(())
}

/// TOML for the config with secrets masked.
fn render_redacted(config: &AppConfig) -> Result<String, toml::ser::Error> {
    let mut shown = config.clone();
    if shown.provider.api_key.is_some() {
        shown.provider.api_key = Some(REDACTED.into());
    }
    if shown.memory.database_url.is_some() {
        shown.memory.database_url = Some(REDACTED.into());
    }
    toml::to_string_pretty(&shown)
}
