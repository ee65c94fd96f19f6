// ABOUTME: Command-line interface definition for the shopchat binary
// ABOUTME: Without a subcommand the terminal chat widget opens

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "shopchat")]
#[command(version, about = "Conversational shopping assistant widget for the terminal", long_about = None)]
pub struct Cli {
    /// Keep the conversation in memory instead of the data directory
    #[arg(long, global = true)]
    pub ephemeral: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open the chat widget in the terminal (default)
    Tui,
    /// Send one message and print the reply
    Send {
        /// Message text; multiple words are joined with spaces
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
        /// Attach an image file
        #[arg(long)]
        image: Option<PathBuf>,
        /// Do not wait for follow-up question suggestions
        #[arg(long)]
        no_suggestions: bool,
    },
    /// Print the stored conversation
    History {
        /// Print the raw stored snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Reset the conversation to the welcome message
    Clear,
    /// Set the name the assistant greets you with
    Name { name: String },
    /// Check that the chat API is reachable
    Health,
}

impl Cli {
    /// The subcommand to run, defaulting to the terminal UI
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Tui)
    }
}
