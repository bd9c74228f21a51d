//! `scrivener memory` — Memory record commands.

use scrivener_config::MemoryMode;
use std::path::Path;

pub async fn show(explicit: Option<&Path>, key: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(explicit).map_err(|e| format!("Failed to load config: {e}"))?;
    warn_if_transient(config.memory_mode);
    let store = scrivener_memory::open_store(config.memory_mode, &config.memory).await?;

    match store.get(key).await? {
        Some(memory) => {
            println!("🧠 Memory '{key}' ({} store)", store.name());
            println!("{}", serde_json::to_string_pretty(&memory)?);
        }
        None => println!("  No memory stored for '{key}'."),
    }
    Ok(())
}

pub async fn reset(explicit: Option<&Path>, key: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(explicit).map_err(|e| format!("Failed to load config: {e}"))?;
    warn_if_transient(config.memory_mode);
    let store = scrivener_memory::open_store(config.memory_mode, &config.memory).await?;

    if store.delete(key).await? {
        println!("🗑️  Deleted memory '{key}'.");
    } else {
        println!("  No memory stored for '{key}'.");
    }
    Ok(())
}

fn warn_if_transient(mode: MemoryMode) {
    if mode == MemoryMode::Transient {
        eprintln!("⚠️  memory_mode is transient: records only live for a single `refine` run.");
    }
}
