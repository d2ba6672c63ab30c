//! threadkeeper - threaded comments from the command line
//!
//! Stores comment trees for posts in a local data directory.
//!
//! ## Quick Start
//!
//! ```bash
//! # Create the data directory and default configuration
//! threadkeeper init
//!
//! # Register a post and an author
//! threadkeeper post register welcome
//! threadkeeper user add alice --display-name "Alice"
//!
//! # Comment and reply
//! threadkeeper comment add --post welcome --user alice "First!"
//! threadkeeper comment add --post welcome --user alice --parent 1 "Replying to myself"
//!
//! # Show the thread
//! threadkeeper comment list welcome
//! ```

mod commands;

fn main() {
    if let Err(err) = commands::run() {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
