//! Init command
//!
//! Create the data directory, default configuration and empty tables.

use super::config::default_config_text;
use super::context::AppContext;
use anyhow::{Context, Result};
use clap::Args;
use std::fs;

/// Arguments for the init command
#[derive(Debug, Args)]
pub struct InitArgs {
    /// Overwrite an existing configuration file
    #[arg(long)]
    pub force: bool,
}

/// Execute the init command
pub fn execute(ctx: &AppContext, args: InitArgs) -> Result<()> {
    use colored::Colorize;

    println!("Initializing threadkeeper in {}...", ctx.data_dir.display());

    let engine = ctx.open_engine()?;
    if engine.is_initialized() {
        println!("{} Comment tables already present", "✓".green());
    } else {
        engine.flush().context("Failed to write comment tables")?;
        println!("{} Created {}", "✓".green(), engine.tables_path().display());
    }

    if ctx.config_path.exists() && !args.force {
        eprintln!(
            "{} Configuration already exists at {}. Use --force to overwrite.",
            "⚠".yellow(),
            ctx.config_path.display()
        );
    } else {
        if let Some(parent) = ctx.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&ctx.config_path, default_config_text()?)
            .context("Failed to write config.toml")?;
        println!(
            "{} Wrote default configuration to {}",
            "✓".green(),
            ctx.config_path.display()
        );
    }

    println!("\n{}", "Next steps:".bold());
    println!("  1. Register a post:     {}", "threadkeeper post register <post-id>".cyan());
    println!("  2. Add an author:       {}", "threadkeeper user add <user-id>".cyan());
    println!(
        "  3. Start a thread:      {}",
        "threadkeeper comment add --post <post-id> --user <user-id> \"Hello\"".cyan()
    );

    Ok(())
}
