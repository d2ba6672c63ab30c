//! User command
//!
//! Manage the directory that comment authors are resolved from.

use super::context::AppContext;
use anyhow::Result;
use clap::Subcommand;
use tk_core::comment::UserInfo;
use tk_core::UserId;

/// User subcommands
#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// Add a user, or update an existing one
    Add {
        /// User ID
        id: String,

        /// Login name (defaults to the ID)
        #[arg(long)]
        username: Option<String>,

        /// Name shown next to comments
        #[arg(long)]
        display_name: Option<String>,

        /// Avatar image URL
        #[arg(long)]
        avatar_url: Option<String>,
    },

    /// List known users
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Execute the user command
pub fn execute(ctx: &AppContext, cmd: UserCommand) -> Result<()> {
    match cmd {
        UserCommand::Add {
            id,
            username,
            display_name,
            avatar_url,
        } => add_user(ctx, id, username, display_name, avatar_url),
        UserCommand::List { json } => list_users(ctx, json),
    }
}

fn add_user(
    ctx: &AppContext,
    id: String,
    username: Option<String>,
    display_name: Option<String>,
    avatar_url: Option<String>,
) -> Result<()> {
    use colored::Colorize;

    let id = UserId::from_string(id)?;
    let user = UserInfo {
        username: username.unwrap_or_else(|| id.to_string()),
        id,
        display_name,
        avatar_url,
    };

    let directory = ctx.open_users()?;
    let verb = if directory.upsert(user.clone())? {
        "Added"
    } else {
        "Updated"
    };
    println!("{} {} user {}", "✓".green(), verb, user.label().cyan());
    Ok(())
}

fn list_users(ctx: &AppContext, as_json: bool) -> Result<()> {
    use colored::Colorize;

    let users = ctx.open_users()?.list()?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&users)?);
        return Ok(());
    }

    if users.is_empty() {
        println!("No users found.");
        return Ok(());
    }

    println!("{}", "Users:".bold().underline());
    println!();
    for user in &users {
        match &user.display_name {
            Some(display) => println!("  {}  {} ({})", user.id.to_string().green(), display, user.username.dimmed()),
            None => println!("  {}  {}", user.id.to_string().green(), user.username),
        }
    }
    Ok(())
}
