//! List directory command handler

use std::path::Path;

use crate::config::Config;
use crate::domain::FileItem;
use crate::library;

pub async fn cmd_list(config: &Config, path: &str) -> anyhow::Result<()> {
    let root = Path::new(&config.library.media_root);
    let items = library::list_directory(root, path).await?;

    let shown = library::normalize_relative(path);
    let title = if shown.is_empty() { "/" } else { shown.as_str() };

    if items.is_empty() {
        println!("{title} is empty.");
        return Ok(());
    }

    println!("{} ({} entries)", title, items.len());
    println!("{:-<70}", "");

    for item in &items {
        println!("{}", format_row(item));
    }

    Ok(())
}

fn format_row(item: &FileItem) -> String {
    let marker = if item.is_directory() {
        "📁"
    } else if item.is_image {
        "🖼"
    } else if item.is_video {
        "🎬"
    } else {
        "•"
    };

    let size = if item.is_directory() {
        "-".to_string()
    } else {
        human_size(item.size)
    };

    format!(
        "{} {:<40} {:>10}  {}",
        marker,
        item.name,
        size,
        item.modified_at.format("%Y-%m-%d %H:%M")
    )
}

#[allow(clippy::cast_precision_loss)]
fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
