// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! POSIX platform implementation (Linux/macOS) via `libc`.

use super::{Platform, PlatformError};
use async_trait::async_trait;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

pub struct UnixPlatform;

impl UnixPlatform {
    pub fn new() -> Self {
        Self
    }

    fn sysconf_page_size() -> usize {
        let result = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if result > 0 {
            result as usize
        } else {
            4096
        }
    }

    fn sysconf_cpu_count() -> usize {
        let result = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) };
        if result > 0 {
            result as usize
        } else {
            1
        }
    }
}

impl Default for UnixPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Platform for UnixPlatform {
    fn page_size(&self) -> usize {
        Self::sysconf_page_size()
    }

    fn cpu_count(&self) -> usize {
        Self::sysconf_cpu_count()
    }

    fn total_memory(&self) -> Result<u64, PlatformError> {
        let pages = unsafe { libc::sysconf(libc::_SC_PHYS_PAGES) };
        if pages < 0 {
            return Err(PlatformError::Other("sysconf(_SC_PHYS_PAGES) failed".to_string()));
        }
        Ok(pages as u64 * self.page_size() as u64)
    }

    fn available_memory(&self) -> Result<u64, PlatformError> {
        let pages = unsafe { libc::sysconf(libc::_SC_AVPHYS_PAGES) };
        if pages < 0 {
            return Err(PlatformError::Other("sysconf(_SC_AVPHYS_PAGES) failed".to_string()));
        }
        Ok(pages as u64 * self.page_size() as u64)
    }

    fn line_separator(&self) -> &'static str {
        "\n"
    }

    fn path_separator(&self) -> char {
        ':'
    }

    fn platform_name(&self) -> &'static str {
        if cfg!(target_os = "macos") {
            "macos"
        } else {
            "linux"
        }
    }

    fn temp_dir(&self) -> PathBuf {
        std::env::temp_dir()
    }

    fn is_elevated(&self) -> bool {
        unsafe { libc::geteuid() == 0 }
    }

    fn set_permissions(&self, path: &Path, mode: u32) -> Result<(), PlatformError> {
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).map_err(PlatformError::from)
    }

    fn is_executable(&self, path: &Path) -> bool {
        std::fs::metadata(path).map(|meta| meta.permissions().mode() & 0o111 != 0).unwrap_or(false)
    }

    async fn sync_file(&self, file: &tokio::fs::File) -> Result<(), PlatformError> {
        file.sync_all().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_platform_reports_sane_values() {
        let platform = UnixPlatform::new();
        assert!(platform.cpu_count() >= 1);
        assert_eq!(platform.line_separator(), "\n");
        assert_eq!(platform.path_separator(), ':');
    }
}
