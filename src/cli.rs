// src/cli.rs

use clap::{ArgAction, Args, Parser, Subcommand};
use log::LevelFilter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "omsd", version)]
#[command(about = "Open metal site detection for crystal structure collections", long_about = None)]
pub struct Cli {
    /// More output (debug messages)
    #[arg(short, long, global = true, action = ArgAction::SetTrue, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only warnings and errors
    #[arg(short, long, global = true, action = ArgAction::SetTrue)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else if self.quiet {
            LevelFilter::Warn
        } else {
            LevelFilter::Info
        }
    }

    /// Global flags to hand down to worker processes
    pub fn forwarded_flags(&self) -> Vec<String> {
        let mut flags = Vec::new();
        if self.verbose {
            flags.push("--verbose".to_string());
        }
        if self.quiet {
            flags.push("--quiet".to_string());
        }
        flags
    }
}

#[derive(Args, Debug)]
pub struct CollectionArgs {
    /// Folder holding the structure files
    #[arg(short, long, value_name = "DIR")]
    pub collection: PathBuf,

    /// Folder receiving one result folder per structure
    #[arg(short, long, value_name = "DIR")]
    pub output: PathBuf,

    /// Only analyse the files named in this list, one per line
    #[arg(long, value_name = "FILE")]
    pub structure_list: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyse a collection in load-balanced batches
    Run {
        #[command(flatten)]
        collection: CollectionArgs,

        /// Number of worker processes
        #[arg(short, long, default_value_t = 1)]
        batches: usize,

        /// Only analyse the N lightest structures
        #[arg(long, value_name = "N")]
        max_size: Option<usize>,

        /// Recompute structures with complete results
        #[arg(long, action = ArgAction::SetTrue)]
        overwrite: bool,

        /// Recompute the load balancing info from scratch
        #[arg(long, action = ArgAction::SetTrue)]
        redo_balance: bool,

        /// Settings file (JSON)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
    /// Analyse a single structure file
    Analyze {
        /// CIF or XYZ file
        file: PathBuf,

        /// Folder receiving the result folder
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        output: PathBuf,

        #[arg(long, action = ArgAction::SetTrue)]
        overwrite: bool,

        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
    /// Report which structures of a collection have complete results
    Status {
        #[command(flatten)]
        collection: CollectionArgs,
    },
    /// Print the effective settings
    Config {
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Write them to the per-user settings file
        #[arg(long, action = ArgAction::SetTrue)]
        save: bool,
    },
    /// Worker process entry point, reads its job from stdin
    #[command(hide = true)]
    Worker,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_arguments() {
        let cli = Cli::parse_from([
            "omsd", "-v", "run", "--collection", "cifs", "--output", "out", "--batches", "4", "--max-size", "10",
        ]);
        assert_eq!(cli.log_level(), LevelFilter::Debug);
        assert_eq!(cli.forwarded_flags(), vec!["--verbose".to_string()]);
        match cli.command {
            Commands::Run {
                collection,
                batches,
                max_size,
                overwrite,
                ..
            } => {
                assert_eq!(collection.collection, PathBuf::from("cifs"));
                assert_eq!(batches, 4);
                assert_eq!(max_size, Some(10));
                assert!(!overwrite);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_conflicting_verbosity() {
        assert!(Cli::try_parse_from(["omsd", "-v", "-q", "worker"]).is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
