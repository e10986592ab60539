//! CLI command implementations
//!
//! This module contains implementations of various commands
//! supported by the CLI application using the Command pattern.

pub mod command_traits;
pub mod analyze_command;
pub mod cutout_command;

pub use command_traits::{Command, CommandFactory};
pub use analyze_command::AnalyzeCommand;
pub use cutout_command::CutoutCommand;

use clap::ArgMatches;
use crate::fits::errors::CutoutResult;
use crate::utils::logger::Logger;

/// Factory for creating command instances based on CLI arguments
///
/// This factory examines the command-line arguments and creates
/// the appropriate command instance for execution.
pub struct CubecutCommandFactory;

impl CubecutCommandFactory {
    /// Create a new factory instance
    pub fn new() -> Self {
        CubecutCommandFactory
    }
}

impl<'a> CommandFactory<'a> for CubecutCommandFactory {
    fn create_command(&self, args: &ArgMatches, logger: &'a Logger) -> CutoutResult<Box<dyn Command + 'a>> {
        // Determine which command to run based on args
        if args.contains_id("cutout") {
            Ok(Box::new(CutoutCommand::new(args, logger)?))
        } else {
            // Default to analyze command
            Ok(Box::new(AnalyzeCommand::new(args, logger)?))
        }
    }
}
