// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # CLI Structure
//!
//! `clap`-derived argument definitions. Kept separate from validation
//! (`validator`) so the raw, unchecked shape can be parsed without
//! dragging security logic into the derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "normalizer", version, about = "Catalog normalization and hierarchical classification engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true)]
    pub cpu_threads: Option<usize>,

    #[arg(long, global = true)]
    pub io_threads: Option<usize>,

    #[arg(long, global = true)]
    pub storage_type: Option<String>,

    #[arg(long, global = true, default_value_t = 256)]
    pub channel_depth: usize,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server (ingestion, SSE export, admin endpoints).
    Serve {
        #[arg(long)]
        bind: Option<String>,
    },
    /// Apply pending storage migrations and exit.
    Migrate,
    /// Load config, print the effective settings, and exit without serving.
    ValidateConfig { config: PathBuf },
    /// Re-run hierarchical classification for one catalog.
    Reclassify {
        catalog_id: String,
        #[arg(long)]
        force: bool,
    },
    /// Seed the benchmark store from a file of pre-validated canonical forms.
    LoadBenchmarks { file: PathBuf },
    /// Print per-stage progress for a normalized record.
    ShowRecord { record_id: String },
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}
