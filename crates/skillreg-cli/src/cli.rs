//! Command-line arguments

use clap::{Parser, Subcommand};
use skillreg_skills::DisclosureLevel;
use std::path::PathBuf;

/// Skill registry CLI
#[derive(Parser, Debug)]
#[command(name = "skillreg", version, about = "Match, order and load skills")]
pub struct Cli {
    /// Config file to use instead of ~/.skillreg/skillreg.toml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List discovered skills with their dependencies
    List,
    /// Rank skills for a query
    Match(MatchArgs),
    /// Load a skill to a disclosure level and print its content
    Load(LoadArgs),
    /// Print the load order for executing a skill
    Order {
        /// Skill id
        id: String,
    },
    /// Check skills for structural errors
    Validate,
}

/// Arguments for `skillreg match`
#[derive(Parser, Debug)]
pub struct MatchArgs {
    /// Free-text query
    pub query: String,

    /// File currently being worked on
    #[arg(short, long)]
    pub file: Option<String>,

    /// Task-type label
    #[arg(short, long)]
    pub task: Option<String>,

    /// Rank only; do not load core content for strong matches
    #[arg(long)]
    pub no_activate: bool,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `skillreg load`
#[derive(Parser, Debug)]
pub struct LoadArgs {
    /// Skill id
    pub id: String,

    /// Level to load: metadata, core or full
    #[arg(short, long, default_value = "core")]
    pub level: DisclosureLevel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_match() {
        let cli = Cli::parse_from([
            "skillreg",
            "match",
            "configure migrations",
            "--file",
            "db/001.sql",
            "--no-activate",
        ]);
        match cli.command {
            Command::Match(args) => {
                assert_eq!(args.query, "configure migrations");
                assert_eq!(args.file.as_deref(), Some("db/001.sql"));
                assert!(args.no_activate);
                assert!(!args.json);
            }
            other => panic!("expected match, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_load_level() {
        let cli = Cli::parse_from(["skillreg", "load", "go-migration", "--level", "full"]);
        match cli.command {
            Command::Load(args) => assert_eq!(args.level, DisclosureLevel::Full),
            other => panic!("expected load, got {other:?}"),
        }
        assert!(Cli::try_parse_from(["skillreg", "load", "x", "--level", "all"]).is_err());
    }
}
