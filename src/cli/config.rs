use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use console::style;

use crate::config::AppConfig;

use super::{load_config, CHECK};

fn target_path(path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path.to_path_buf()),
        None => AppConfig::default_path().context("Could not determine config location"),
    }
}

pub fn handle_show_command(path: Option<&Path>) -> Result<()> {
    let config = load_config(path)?;
    let location = target_path(path)?;

    let source = if location.exists() {
        location.display().to_string()
    } else {
        "defaults (no file)".to_string()
    };
    println!("{} {}", style("# Source:").dim(), style(source).dim());
    println!("{}", config.to_display_toml()?);
    Ok(())
}

pub fn handle_init_command(path: Option<&Path>, force: bool) -> Result<()> {
    let location = target_path(path)?;
    if location.exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite it",
            location.display()
        );
    }

    AppConfig::default().save(&location)?;
    println!("{}Wrote {}", CHECK, style(location.display()).bold());
    println!(
        "{}",
        style("API keys are read from OPENAI_API_KEY / XAI_API_KEY and never stored.").dim()
    );
    Ok(())
}
