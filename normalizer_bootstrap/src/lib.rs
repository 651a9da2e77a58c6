// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bootstrap Layer
//!
//! The composition root: CLI parsing, configuration loading, signal
//! handling, platform abstraction, and graceful shutdown. Sits outside
//! the DDD layers in `normalizer_domain`/`normalizer` on purpose —
//! nothing here is a domain concept, it is the scaffolding that wires
//! the domain and infrastructure crates together into a running
//! process.
//!
//! ```text
//! ┌───────────────────────────────────────────┐
//! │              normalizer_bootstrap          │
//! │   cli · config · signals · shutdown        │
//! │   logger · platform · exit_code             │
//! └───────────────────┬───────────────────────┘
//!                     │ composes
//!                     ▼
//! ┌───────────────────────────────────────────┐
//! │                  normalizer                 │
//! │   application · infrastructure · presentation │
//! └───────────────────┬───────────────────────┘
//!                     │ depends on
//!                     ▼
//! ┌───────────────────────────────────────────┐
//! │              normalizer_domain              │
//! └───────────────────────────────────────────┘
//! ```

pub mod cli;
pub mod config;
pub mod exit_code;
pub mod logger;
pub mod platform;
pub mod shutdown;
pub mod signals;

pub use cli::{parse_and_validate, ValidatedCli, ValidatedCommand};
pub use config::{load as load_config, AppConfig, ConfigError};
pub use exit_code::{map_error_to_exit_code, result_to_exit_code, ExitCode};
pub use logger::{BootstrapLogger, ConsoleLogger, NoOpLogger};
pub use platform::{create_platform, Platform, PlatformError};
pub use shutdown::{CancellationToken, ShutdownCoordinator, DEFAULT_GRACE_PERIOD_SECS};

/// Parses and validates CLI arguments. The `main` binary in `normalizer`
/// calls this first, before loading configuration, so a malformed flag
/// fails fast without touching the filesystem or the database.
pub fn bootstrap_cli() -> Result<ValidatedCli, cli::ParseError> {
    cli::parse_and_validate()
}
