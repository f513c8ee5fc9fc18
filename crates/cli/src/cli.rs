use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands::{apply_command, init_command, inspect_command};

#[derive(Parser, Debug)]
#[command(name = "widget-injector")]
#[command(version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    RUST_LOG=debug    Enable debug logging")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inject the widget extension into the project
    #[command(visible_alias = "a")]
    Apply {
        /// Project root holding the native project directory (defaults to current directory)
        #[arg(short, long)]
        project_root: Option<String>,

        /// Config file to use instead of the nearest .widget-injector.json
        #[arg(short, long)]
        config: Option<String>,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the targets of the project and their configurations
    #[command(visible_alias = "i")]
    Inspect {
        /// Project root holding the native project directory (defaults to current directory)
        #[arg(short, long)]
        project_root: Option<String>,
    },
    /// Write a default .widget-injector.json
    Init {
        /// Specify the current working directory
        #[arg(long)]
        cwd: Option<String>,

        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

impl Commands {
    /// Execute the command
    pub fn execute(self) -> Result<()> {
        match self {
            Commands::Apply {
                project_root,
                config,
                json,
            } => apply_command(project_root.as_deref(), config.as_deref(), json),
            Commands::Inspect { project_root } => inspect_command(project_root.as_deref()),
            Commands::Init { cwd, force } => init_command(cwd.as_deref(), force),
        }
    }
}
