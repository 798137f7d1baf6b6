pub mod commands;
pub mod middleware;
pub mod registry;

use std::path::PathBuf;

use clap::Parser;

pub use registry::{Arity, AuthenticatedHandler, CommandRegistry, Handler, Registration};

#[derive(Parser, Debug)]
#[command(name = "gator")]
#[command(about = "A command-line RSS feed aggregator", long_about = None)]
#[command(after_help = "Commands: login, register, reset, users, agg, feeds, addfeed, follow, following, unfollow")]
pub struct Cli {
    /// Path to the JSON config file (default: ~/.gatorconfig.json)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Command to run
    pub command: Option<String>,

    /// Arguments passed to the command
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl Cli {
    /// Split into the command to dispatch, `None` when no command was given.
    pub fn into_command(self) -> Option<Command> {
        let name = self.command?;
        Some(Command {
            name,
            args: self.args,
        })
    }
}

/// A command name with its positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
}

impl Command {
    pub fn new(name: &str, args: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}
