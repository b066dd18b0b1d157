//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Interview-driven prompt builder: walk a question graph, collect weighted selections, assemble image prompts
#[derive(Parser, Debug)]
#[command(name = "sceneprompt")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Question graph, .json or .toml (default: from config)
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub graph: Option<PathBuf>,

    /// Directory holding the local .sceneprompt.toml (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect and validate the question graph
    Graph {
        #[command(subcommand)]
        command: GraphCommands,
    },

    /// Replay a session script and print the prompt pair
    Run {
        /// TOML file of [[step]] tables
        #[arg(value_hint = ValueHint::FilePath)]
        script: PathBuf,
        /// Print the prompt pair as JSON
        #[arg(long)]
        json: bool,
    },

    /// Walk the graph interactively (fzf-style)
    Interview {
        /// Print the prompt pair as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum GraphCommands {
    /// Report every integrity defect
    Validate,

    /// Show one node with its answers, refinements and weights
    Show {
        /// Node id
        node: String,
    },

    /// Show reachable nodes as a tree
    Tree {
        /// Start node (default: configured root)
        #[arg(short, long)]
        from: Option<String>,
        /// Maximum depth
        #[arg(short, long)]
        depth: Option<usize>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Create config template
    Init {
        /// Create global config
        #[arg(short, long)]
        global: bool,
    },

    /// Show config paths
    Path,
}
