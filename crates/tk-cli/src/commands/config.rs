//! Config command
//!
//! Manage threadkeeper configuration.

use super::context::AppContext;
use anyhow::{Context, Result};
use clap::Subcommand;
use std::fs;
use tk_core::config::Config;

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show as JSON
        #[arg(long)]
        json: bool,
    },

    /// Reset to default configuration
    Reset {
        /// Force reset without confirmation
        #[arg(long)]
        force: bool,
    },

    /// Validate configuration
    Validate,
}

/// Execute the config command
pub fn execute(ctx: &AppContext, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => show_config(ctx, json),
        ConfigCommand::Reset { force } => reset_config(ctx, force),
        ConfigCommand::Validate => validate_config(ctx),
    }
}

/// Default configuration file contents
pub fn default_config_text() -> Result<String> {
    let body = Config::default().to_toml_string()?;
    Ok(format!("# threadkeeper configuration\n\n{}", body))
}

fn show_config(ctx: &AppContext, as_json: bool) -> Result<()> {
    use colored::Colorize;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&ctx.config)?);
        return Ok(());
    }

    println!("{}", "Configuration:".bold().underline());
    if ctx.config_path.exists() {
        println!("{}", ctx.config_path.display().to_string().dimmed());
    } else {
        println!(
            "{}",
            format!("{} (not found, using defaults)", ctx.config_path.display()).dimmed()
        );
    }
    println!("{}", format!("data directory: {}", ctx.data_dir.display()).dimmed());
    println!();
    println!("{}", ctx.config.to_toml_string()?);

    Ok(())
}

fn reset_config(ctx: &AppContext, force: bool) -> Result<()> {
    use colored::Colorize;

    let config_path = &ctx.config_path;

    if !force {
        use dialoguer::Confirm;

        let confirmed = Confirm::new()
            .with_prompt("Reset configuration to defaults?")
            .default(false)
            .interact()?;

        if !confirmed {
            println!("Reset cancelled.");
            return Ok(());
        }
    }

    // Backup existing
    if config_path.exists() {
        let backup_path = format!(
            "{}.backup-{}",
            config_path.display(),
            chrono::Local::now().format("%Y%m%d-%H%M%S")
        );
        fs::copy(config_path, &backup_path)?;
        println!("{} Backed up to {}", "✓".green(), backup_path);
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(config_path, default_config_text()?).context("Failed to write configuration")?;

    println!("{} Configuration reset to defaults.", "✓".green());

    Ok(())
}

fn validate_config(ctx: &AppContext) -> Result<()> {
    use colored::Colorize;

    let config_path = &ctx.config_path;

    if !config_path.exists() {
        println!(
            "{} No configuration at {}, defaults apply",
            "⚠".yellow(),
            config_path.display()
        );
        return Ok(());
    }

    // Loading already rejected invalid values; re-read to report unknown keys
    let content = fs::read_to_string(config_path)?;
    let raw: toml::Value = toml::from_str(&content)?;
    println!("{} Configuration is valid", "✓".green());

    let known = ["storage", "comments", "listing", "logging"];
    if let Some(table) = raw.as_table() {
        for key in table.keys().filter(|k| !known.contains(&k.as_str())) {
            println!("{} Unknown section [{}] is ignored", "⚠".yellow(), key);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_text_round_trips() {
        let text = default_config_text().unwrap();
        assert!(text.starts_with("# threadkeeper configuration"));

        let config = Config::from_toml_str(&text).unwrap();
        assert_eq!(config.listing.max_limit, Config::default().listing.max_limit);
    }
}
