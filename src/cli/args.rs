//! Defines the command-line arguments and subcommands for the testgen CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "testgen",
    version,
    about = "Generates Python unittest modules from test cases written in docstrings."
)]
pub struct TestgenArgs {
    /// Log pipeline progress to stderr (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a unittest module from a Python source file.
    Generate {
        /// The Python source file to read.
        #[arg(required = true)]
        file: PathBuf,
        /// Only generate tests for this class.
        #[arg(short, long)]
        class: Option<String>,
        /// Write the module here instead of printing it.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Run all cases of a method on one shared instance, as subtests.
        #[arg(long)]
        shared: bool,
        /// YAML configuration file; flags take precedence over it.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Compare against the existing output file instead of writing it.
        #[arg(long, requires = "output")]
        check: bool,
    },
    /// List the test cases found in a Python source file.
    Inspect {
        /// The Python source file to read.
        #[arg(required = true)]
        file: PathBuf,
        /// Only show this class.
        #[arg(short, long)]
        class: Option<String>,
        /// Print the parsed classes as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Count documented test cases in every Python file under a directory.
    Scan {
        /// The directory to walk.
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}
