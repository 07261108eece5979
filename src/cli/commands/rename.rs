//! Rename command handler

use std::path::Path;

use crate::config::Config;
use crate::library;

pub async fn cmd_rename(config: &Config, old_path: &str, new_name: &str) -> anyhow::Result<()> {
    let root = Path::new(&config.library.media_root);
    let new_path = library::rename_entry(root, old_path, new_name).await?;

    println!("✓ Renamed {} -> {}", library::normalize_relative(old_path), new_path);
    Ok(())
}
