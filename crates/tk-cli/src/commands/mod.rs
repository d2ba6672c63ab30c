//! CLI commands module
//!
//! This module contains all CLI command implementations.

pub mod comment;
pub mod config;
pub mod context;
pub mod init;
pub mod post;
pub mod user;

use clap::{Parser, Subcommand};
use context::AppContext;
use std::path::PathBuf;

/// threadkeeper - threaded comment trees for posts
#[derive(Debug, Parser)]
#[command(name = "threadkeeper")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "THREADKEEPER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Data directory (overrides the configuration)
    #[arg(long, global = true, env = "THREADKEEPER_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create the data directory and default configuration
    Init(init::InitArgs),

    /// Manage posts
    #[command(subcommand)]
    Post(post::PostCommand),

    /// Manage comment authors
    #[command(subcommand)]
    User(user::UserCommand),

    /// Add, list, delete and count comments
    #[command(subcommand)]
    Comment(comment::CommentCommand),

    /// Manage configuration
    #[command(subcommand)]
    Config(config::ConfigCommand),
}

/// Run the CLI application
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let ctx = AppContext::resolve(cli.config, cli.data_dir)?;

    // Set up logging based on verbosity
    setup_logging(cli.verbose, &ctx.config.logging.level);

    // Handle color output
    if cli.no_color {
        colored::control::set_override(false);
    }

    // Dispatch to command handler
    match cli.command {
        Commands::Init(args) => init::execute(&ctx, args),
        Commands::Post(cmd) => post::execute(&ctx, cmd),
        Commands::User(cmd) => user::execute(&ctx, cmd),
        Commands::Comment(cmd) => comment::execute(&ctx, cmd),
        Commands::Config(cmd) => config::execute(&ctx, cmd),
    }
}

fn setup_logging(verbosity: u8, configured: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = match verbosity {
        0 => EnvFilter::try_new(configured).unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    // Logs go to stderr so --json output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_help_text() {
        let cmd = Cli::command();
        assert!(cmd.get_about().is_some());
    }

    #[test]
    fn test_parse_comment_list() {
        let cli = Cli::try_parse_from([
            "threadkeeper",
            "--data-dir",
            "/tmp/tk",
            "comment",
            "list",
            "welcome",
            "--page",
            "2",
            "--limit",
            "5",
            "--json",
        ])
        .unwrap();

        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/tk")));
        match cli.command {
            Commands::Comment(comment::CommentCommand::List {
                post,
                page,
                limit,
                json,
                parent,
            }) => {
                assert_eq!(post, "welcome");
                assert_eq!(page, Some(2));
                assert_eq!(limit, Some(5));
                assert!(json);
                assert!(parent.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_verbosity_counts() {
        let cli = Cli::try_parse_from(["threadkeeper", "-vv", "config", "show"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
