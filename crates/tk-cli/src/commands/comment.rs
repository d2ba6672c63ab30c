//! Comment command
//!
//! Add, list, delete and count comments on a post.

use super::context::AppContext;
use anyhow::Result;
use clap::Subcommand;
use tk_core::comment::{walk, CommentBuilder, ListCommentsRequest, NodeKind, ThreadNode};
use tk_core::{CommentId, PostId, UserId};

/// Comment subcommands
#[derive(Debug, Subcommand)]
pub enum CommentCommand {
    /// Add a comment or a reply
    Add {
        /// Post to comment on
        #[arg(long)]
        post: String,

        /// Author ID
        #[arg(long)]
        user: String,

        /// Comment to reply to
        #[arg(long)]
        parent: Option<CommentId>,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Comment text
        content: String,
    },

    /// Show the comment tree of a post
    List {
        /// Post ID
        post: String,

        /// Page of top-level threads, starting at 1
        #[arg(long)]
        page: Option<usize>,

        /// Top-level threads per page
        #[arg(long)]
        limit: Option<usize>,

        /// Only show the replies below this comment
        #[arg(long)]
        parent: Option<CommentId>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a comment
    Delete {
        /// Comment ID
        id: CommentId,

        /// Also delete every reply below the comment
        #[arg(long)]
        cascade: bool,

        /// Skip confirmation
        #[arg(long, short)]
        yes: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Count the comments on a post
    Count {
        /// Post ID
        post: String,
    },
}

/// Execute the comment command
pub fn execute(ctx: &AppContext, cmd: CommentCommand) -> Result<()> {
    match cmd {
        CommentCommand::Add {
            post,
            user,
            parent,
            json,
            content,
        } => add_comment(ctx, post, user, parent, content, json),
        CommentCommand::List {
            post,
            page,
            limit,
            parent,
            json,
        } => list_comments(ctx, post, page, limit, parent, json),
        CommentCommand::Delete {
            id,
            cascade,
            yes,
            json,
        } => delete_comment(ctx, id, cascade, yes, json),
        CommentCommand::Count { post } => count_comments(ctx, post),
    }
}

fn add_comment(
    ctx: &AppContext,
    post: String,
    user: String,
    parent: Option<CommentId>,
    content: String,
    as_json: bool,
) -> Result<()> {
    use colored::Colorize;

    let new = CommentBuilder::new(PostId::from_string(post)?, UserId::from_string(user)?)
        .content(content)
        .parent(parent)
        .build()?;

    let view = ctx.open_service()?.create_comment(new)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    match view.comment.parent_id {
        Some(parent) => println!(
            "{} Added reply {} to {} by {}",
            "✓".green(),
            format!("#{}", view.comment.id).cyan(),
            format!("#{}", parent).cyan(),
            view.author.label()
        ),
        None => println!(
            "{} Added comment {} by {}",
            "✓".green(),
            format!("#{}", view.comment.id).cyan(),
            view.author.label()
        ),
    }
    Ok(())
}

fn list_comments(
    ctx: &AppContext,
    post: String,
    page: Option<usize>,
    limit: Option<usize>,
    parent: Option<CommentId>,
    as_json: bool,
) -> Result<()> {
    use colored::Colorize;

    let request = ListCommentsRequest {
        post_id: PostId::from_string(post)?,
        page,
        limit,
        parent_id: parent,
    };
    let response = ctx.open_service()?.list_comments(request)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    if response.comments.is_empty() {
        println!("No comments found.");
        return Ok(());
    }

    for (level, node) in walk(&response.comments) {
        println!("{}{}", "  ".repeat(level), render_header(node));
        for line in node.comment.content.lines() {
            println!("{}  {}", "  ".repeat(level), line);
        }
    }

    println!();
    println!(
        "{}",
        format!("{} comment(s) on this post", response.total).dimmed()
    );
    Ok(())
}

fn render_header(node: &ThreadNode) -> String {
    use colored::Colorize;

    let author = node
        .author
        .as_ref()
        .map(|a| a.label().to_string())
        .unwrap_or_else(|| node.comment.user_id.to_string());

    let mut header = format!(
        "{} {} {}",
        format!("#{}", node.id()).cyan(),
        author.bold(),
        node.comment
            .created_at
            .format("%Y-%m-%d %H:%M")
            .to_string()
            .dimmed()
    );
    if node.kind == NodeKind::Orphan {
        header.push_str(&format!(" {}", "[orphan]".yellow()));
    }
    header
}

fn delete_comment(
    ctx: &AppContext,
    id: CommentId,
    cascade: bool,
    yes: bool,
    as_json: bool,
) -> Result<()> {
    use colored::Colorize;

    if !yes {
        use dialoguer::Confirm;

        let prompt = if cascade {
            format!("Delete comment #{} and all replies below it?", id)
        } else {
            format!("Delete comment #{}? Its replies move to the top level.", id)
        };
        let confirmed = Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()?;

        if !confirmed {
            println!("Deletion cancelled.");
            return Ok(());
        }
    }

    let response = ctx.open_service()?.delete_comment(id, cascade)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!(
            "{} Deleted {} comment(s)",
            "✓".green(),
            response.count.to_string().cyan()
        );
    }
    Ok(())
}

fn count_comments(ctx: &AppContext, post: String) -> Result<()> {
    let post_id = PostId::from_string(post)?;
    println!("{}", ctx.open_service()?.count_comments(&post_id)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tk_core::comment::{Comment, UserInfo};

    fn node(kind: NodeKind, author: Option<&str>) -> ThreadNode {
        ThreadNode {
            comment: Comment::placed_under(
                CommentId(3),
                PostId::from("post"),
                UserId::from("u1"),
                "hi".to_string(),
                None,
                Utc::now(),
            ),
            author: author.map(|name| UserInfo {
                id: UserId::from("u1"),
                username: "u1".to_string(),
                display_name: Some(name.to_string()),
                avatar_url: None,
            }),
            kind,
            replies: Vec::new(),
        }
    }

    #[test]
    fn test_header_uses_author_label() {
        colored::control::set_override(false);
        let header = render_header(&node(NodeKind::Root, Some("Alice")));
        assert!(header.starts_with("#3 Alice "));
        assert!(!header.contains("[orphan]"));
    }

    #[test]
    fn test_header_marks_orphans() {
        colored::control::set_override(false);
        let header = render_header(&node(NodeKind::Orphan, None));
        assert!(header.contains("u1"));
        assert!(header.ends_with("[orphan]"));
    }
}
