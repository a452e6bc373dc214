use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::PROJECTS_DIR_ENV;
use crate::schema::Direction;

#[derive(Parser, Debug)]
#[command(name = "nocode-designer")]
#[command(version, about = "Design tables and fields of a no-code application")]
pub struct Cli {
    /// Directory holding .ncp project files
    #[arg(long, global = true, env = PROJECTS_DIR_ENV)]
    pub projects_dir: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new project file
    New {
        /// Project name
        name: String,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(short, long)]
        author: Option<String>,
    },

    /// List projects in the projects directory
    List,

    /// Print a project's tables and fields
    Show {
        /// Project name or path to a .ncp file
        project: String,

        /// Print the raw JSON document instead
        #[arg(long)]
        json: bool,
    },

    /// List available field types
    Types,

    /// Print the machine identifier derived from a name
    Translit {
        text: String,
    },

    /// Add a table to a project
    AddTable {
        project: String,
        name: String,
    },

    /// Rename a table (its id is kept)
    RenameTable {
        project: String,
        /// Table id, machine name or display name
        table: String,
        new_name: String,
    },

    /// Delete a table; reference fields pointing at it are reported, not removed
    DeleteTable {
        project: String,
        table: String,
    },

    /// Add a field to a table
    AddField {
        project: String,
        table: String,
        /// Type id or display name (see `types`)
        field_type: String,

        /// Display name of the new field
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Update field properties from a JSON object
    SetField {
        project: String,
        table: String,
        field: String,
        /// e.g. '{"name_ru": "Цена", "required": true, "format": {"currency": 1}}'
        properties: String,

        /// Reset all properties to defaults, then apply, as one change
        #[arg(long)]
        reset: bool,
    },

    /// Move a field one position up or down
    MoveField {
        project: String,
        table: String,
        field: String,
        #[arg(value_enum)]
        direction: MoveDirection,
    },

    /// Delete a field (no-op if it does not exist)
    DeleteField {
        project: String,
        table: String,
        field: String,
    },

    /// Build the formula of a computed field from palette tokens
    Formula {
        project: String,
        table: String,
        field: String,

        /// Tokens as kind:literal, e.g. field:Цена op:* function:ROUND condition:ЕСЛИ
        tokens: Vec<String>,

        /// Start from an empty formula instead of appending
        #[arg(long)]
        clear: bool,
    },

    /// Report naming problems and broken references
    Check {
        project: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MoveDirection {
    Up,
    Down,
}

impl From<MoveDirection> for Direction {
    fn from(direction: MoveDirection) -> Self {
        match direction {
            MoveDirection::Up => Direction::Up,
            MoveDirection::Down => Direction::Down,
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_move_field() {
        let cli = Cli::try_parse_from([
            "nocode-designer",
            "-vv",
            "move-field",
            "demo",
            "klienty",
            "field_0_tekst",
            "down",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::MoveField { direction, .. } => assert_eq!(direction, MoveDirection::Down),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
