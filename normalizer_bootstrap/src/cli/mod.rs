// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface Module
//!
//! Bootstrap-layer CLI handling with security-first design.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  1. parser::parse_cli()             │  Parse CLI with clap
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  2. validator::validate_cli()       │  Security validation
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  3. ValidatedCli                    │  Safe, validated config
//! └─────────────────────────────────────┘
//! ```

pub mod parser;
pub mod validator;

pub use parser::{parse_cli, Cli, Commands};
pub use validator::{ParseError, SecureArgParser};

use std::path::PathBuf;

/// Validated CLI configuration. All paths are canonicalized and all
/// numeric values are range-checked before reaching `main`.
#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub command: ValidatedCommand,
    pub verbose: bool,
    pub config: Option<PathBuf>,
    pub cpu_threads: Option<usize>,
    pub io_threads: Option<usize>,
    pub storage_type: Option<String>,
    pub channel_depth: usize,
}

#[derive(Debug, Clone)]
pub enum ValidatedCommand {
    Serve {
        bind: Option<String>,
    },
    Migrate,
    ValidateConfig {
        config: PathBuf,
    },
    Reclassify {
        catalog_id: String,
        force: bool,
    },
    LoadBenchmarks {
        file: PathBuf,
    },
    ShowRecord {
        record_id: String,
    },
}

pub fn parse_and_validate() -> Result<ValidatedCli, ParseError> {
    let cli = parse_cli();
    validate_cli(cli)
}

fn validate_cli(cli: Cli) -> Result<ValidatedCli, ParseError> {
    let config = if let Some(ref path) = cli.config {
        Some(SecureArgParser::validate_path(&path.to_string_lossy())?)
    } else {
        None
    };

    if cli.channel_depth == 0 {
        return Err(ParseError::InvalidValue { arg: "channel-depth".to_string(), reason: "must be greater than 0".to_string() });
    }

    if let Some(threads) = cli.cpu_threads {
        if threads == 0 || threads > 128 {
            return Err(ParseError::InvalidValue { arg: "cpu-threads".to_string(), reason: "must be between 1 and 128".to_string() });
        }
    }

    if let Some(threads) = cli.io_threads {
        if threads == 0 || threads > 256 {
            return Err(ParseError::InvalidValue { arg: "io-threads".to_string(), reason: "must be between 1 and 256".to_string() });
        }
    }

    let command = match cli.command {
        Commands::Serve { bind } => {
            if let Some(ref addr) = bind {
                SecureArgParser::validate_argument(addr)?;
            }
            ValidatedCommand::Serve { bind }
        }
        Commands::Migrate => ValidatedCommand::Migrate,
        Commands::ValidateConfig { config } => {
            let validated = SecureArgParser::validate_path(&config.to_string_lossy())?;
            ValidatedCommand::ValidateConfig { config: validated }
        }
        Commands::Reclassify { catalog_id, force } => {
            SecureArgParser::validate_argument(&catalog_id)?;
            ValidatedCommand::Reclassify { catalog_id, force }
        }
        Commands::LoadBenchmarks { file } => {
            let validated = SecureArgParser::validate_path(&file.to_string_lossy())?;
            ValidatedCommand::LoadBenchmarks { file: validated }
        }
        Commands::ShowRecord { record_id } => {
            SecureArgParser::validate_argument(&record_id)?;
            ValidatedCommand::ShowRecord { record_id }
        }
    };

    Ok(ValidatedCli {
        command,
        verbose: cli.verbose,
        config,
        cpu_threads: cli.cpu_threads,
        io_threads: cli.io_threads,
        storage_type: cli.storage_type,
        channel_depth: cli.channel_depth,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reclassify_rejects_unsafe_catalog_id() {
        let cli = Cli {
            command: Commands::Reclassify { catalog_id: "abc; rm -rf /".to_string(), force: false },
            verbose: false,
            config: None,
            cpu_threads: None,
            io_threads: None,
            storage_type: None,
            channel_depth: 256,
        };
        assert!(validate_cli(cli).is_err());
    }

    #[test]
    fn zero_channel_depth_is_rejected() {
        let cli = Cli {
            command: Commands::Migrate,
            verbose: false,
            config: None,
            cpu_threads: None,
            io_threads: None,
            storage_type: None,
            channel_depth: 0,
        };
        assert!(validate_cli(cli).is_err());
    }

    #[test]
    fn migrate_with_defaults_validates() {
        let cli = Cli {
            command: Commands::Migrate,
            verbose: false,
            config: None,
            cpu_threads: None,
            io_threads: None,
            storage_type: None,
            channel_depth: 256,
        };
        assert!(validate_cli(cli).is_ok());
    }
}
