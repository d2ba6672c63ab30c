//! Post command
//!
//! Posts are only identifiers; comments can be added once a post is registered.

use super::context::AppContext;
use anyhow::Result;
use clap::Subcommand;
use tk_core::PostId;

/// Post subcommands
#[derive(Debug, Subcommand)]
pub enum PostCommand {
    /// Register a post so it can receive comments
    Register {
        /// Post ID
        id: String,
    },
}

/// Execute the post command
pub fn execute(ctx: &AppContext, cmd: PostCommand) -> Result<()> {
    use colored::Colorize;

    match cmd {
        PostCommand::Register { id } => {
            let post_id = PostId::from_string(&id)?;
            let service = ctx.open_service()?;

            if service.register_post(&post_id)? {
                println!("{} Registered post {}", "✓".green(), post_id.to_string().cyan());
            } else {
                println!("Post {} is already registered.", post_id.to_string().cyan());
            }
            Ok(())
        }
    }
}
