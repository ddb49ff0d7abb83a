//! Validation subcommand

use clap::Parser;
use std::path::{Path, PathBuf};

use super::{Cli, CliError};
use crate::descriptor::RootDescriptor;

/// Validate command for offline checks
#[derive(Parser, Debug)]
pub struct ValidateCommand {
    /// What to validate
    #[command(subcommand)]
    pub target: ValidateTarget,
}

/// Target type for validation
#[derive(clap::Subcommand, Debug)]
pub enum ValidateTarget {
    /// Check that a root descriptor file is complete
    Descriptor {
        /// Descriptor JSON file
        path: PathBuf,
    },
    /// Check the effective traversal configuration
    Config,
}

impl ValidateCommand {
    /// Execute the validation command
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        match &self.target {
            ValidateTarget::Descriptor { path } => self.validate_descriptor(path),
            ValidateTarget::Config => self.validate_config(cli),
        }
    }

    fn validate_descriptor(&self, path: &Path) -> Result<(), CliError> {
        match RootDescriptor::load(path) {
            Ok(root) => {
                println!("Valid descriptor: {}", path.display());
                println!("  Name: {}", root.display_name);
                println!("  fs_id: {}", root.external_id);
                println!("  msg_id: {}", root.parent_collection_id);
                println!("  uk: {}", root.owner_id);
                println!("  gid: {}", root.conversation_id);
                Ok(())
            }
            Err(e) => {
                eprintln!("Invalid descriptor: {e}");
                Err(e.into())
            }
        }
    }

    fn validate_config(&self, cli: &Cli) -> Result<(), CliError> {
        let config = cli.traversal_config();
        config.validate()?;

        println!("Valid configuration");
        println!("  Max concurrent requests: {}", config.max_concurrent);
        println!("  Min request interval: {} ms", config.min_interval.as_millis());
        println!("  Attempts per page: {}", config.max_retries);
        println!("  Page size: {}", config.page_size);
        println!(
            "  Page settle delay: {} ms",
            config.page_settle_delay.as_millis()
        );
        println!("  Base URL: {}", cli.base_url);
        println!(
            "  Session cookie: {}",
            if cli.cookie.is_some() { "set" } else { "not set" }
        );
        Ok(())
    }
}
