// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Platform Abstraction
//!
//! OS-specific operations behind one trait, selected at compile time:
//! `UnixPlatform` (Linux/macOS) or `WindowsPlatform`. The bootstrap
//! layer sits outside the DDD layers specifically so it can reach for
//! these platform APIs directly.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[cfg(unix)]
mod unix;

#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use unix::UnixPlatform;

#[cfg(windows)]
pub use windows::WindowsPlatform;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not supported on this platform: {0}")]
    NotSupported(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("platform error: {0}")]
    Other(String),
}

/// Used by the bootstrap layer to size worker pools (CPU-bound stages,
/// `spec.md` §5) and locate a writable temp directory for classifier
/// scratch files.
#[async_trait]
pub trait Platform: Send + Sync {
    fn page_size(&self) -> usize;

    fn cpu_count(&self) -> usize;

    fn total_memory(&self) -> Result<u64, PlatformError>;

    fn available_memory(&self) -> Result<u64, PlatformError>;

    fn line_separator(&self) -> &'static str;

    fn path_separator(&self) -> char;

    fn platform_name(&self) -> &'static str;

    fn temp_dir(&self) -> PathBuf;

    fn is_elevated(&self) -> bool;

    fn set_permissions(&self, path: &Path, mode: u32) -> Result<(), PlatformError>;

    fn is_executable(&self, path: &Path) -> bool;

    async fn sync_file(&self, file: &tokio::fs::File) -> Result<(), PlatformError>;
}

#[cfg(unix)]
type PlatformImpl = UnixPlatform;

#[cfg(windows)]
type PlatformImpl = WindowsPlatform;

pub fn create_platform() -> Box<dyn Platform> {
    Box::new(PlatformImpl::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_platform_reports_sane_values() {
        let platform = create_platform();
        assert!(platform.cpu_count() >= 1);
        assert!(platform.page_size() >= 512);
        assert!(!platform.platform_name().is_empty());
    }
}
