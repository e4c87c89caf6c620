use colored::*;
use std::path::Path;

use crate::config::{ConversionConfig, create_default_config, load_config};
use crate::{Result, Vsi2wmError};

/// Write a commented default configuration file
pub fn execute_config_create(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(Vsi2wmError::ValidationError(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    create_default_config(path)?;
    println!("{} Created config file: {}", "✓".green(), path.display());
    Ok(())
}

/// Print the effective configuration of a file, or the defaults when it does not exist
pub fn execute_config_show(path: &Path) -> Result<()> {
    let config = if path.exists() {
        println!("{}", format!("Configuration from {}", path.display()).bright_blue());
        load_config(path)?
    } else {
        println!(
            "{}",
            format!("{} not found; showing defaults", path.display()).bright_blue()
        );
        ConversionConfig::default()
    };

    println!();
    print!("{}", config.to_yaml()?);
    Ok(())
}
