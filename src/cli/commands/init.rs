use std::path::Path;

use crate::config::Config;

pub fn cmd_init_config(path: &Path) -> anyhow::Result<()> {
    if Config::create_default_if_missing(path)? {
        println!("✓ Config file created at {}.", path.display());
        println!("  Set library.media_root and the qBittorrent section, then run again.");
    } else {
        println!("Config file {} already exists, leaving it untouched.", path.display());
    }
    Ok(())
}
