// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Security Validation Layer
//!
//! Rejects shell metacharacters and path traversal in CLI arguments
//! before they reach config loading or the pipeline. Arguments are
//! operator-supplied (config paths, catalog/upload identifiers), not
//! end-user input over the wire, but a malformed flag should fail
//! loudly rather than get passed through to a shell or file open.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid argument '{arg}': {reason}")]
    InvalidValue { arg: String, reason: String },

    #[error("path does not exist: {0}")]
    PathNotFound(String),

    #[error("path contains disallowed characters: {0}")]
    UnsafePath(String),

    #[error("argument contains disallowed characters: {0}")]
    UnsafeArgument(String),
}

const DANGEROUS_CHARS: &[char] = &[';', '|', '&', '$', '`', '\n', '\r', '\0'];

pub struct SecureArgParser;

impl SecureArgParser {
    /// Rejects shell metacharacters and embedded control characters.
    /// Does not require the value to be a path or to exist.
    pub fn validate_argument(value: &str) -> Result<(), ParseError> {
        if value.is_empty() {
            return Err(ParseError::UnsafeArgument("argument must not be empty".to_string()));
        }
        if let Some(ch) = value.chars().find(|c| DANGEROUS_CHARS.contains(c)) {
            return Err(ParseError::UnsafeArgument(format!("disallowed character '{ch}' in '{value}'")));
        }
        Ok(())
    }

    /// Validates an existing filesystem path: rejects dangerous
    /// characters, rejects `..` traversal segments, and canonicalizes.
    pub fn validate_path(value: &str) -> Result<PathBuf, ParseError> {
        Self::validate_argument(value)?;

        let path = Path::new(value);
        if path.components().any(|c| c.as_os_str() == "..") {
            return Err(ParseError::UnsafePath(format!("path traversal segment in '{value}'")));
        }

        path.canonicalize().map_err(|_| ParseError::PathNotFound(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_shell_metacharacters() {
        assert!(SecureArgParser::validate_argument("catalog-123; rm -rf /").is_err());
    }

    #[test]
    fn accepts_plain_identifier() {
        assert!(SecureArgParser::validate_argument("catalog-123").is_ok());
    }

    #[test]
    fn rejects_path_traversal() {
        assert!(SecureArgParser::validate_path("../../etc/passwd").is_err());
    }

    #[test]
    fn rejects_nonexistent_path() {
        assert!(SecureArgParser::validate_path("/no/such/path/hopefully").is_err());
    }

    #[test]
    fn rejects_empty_argument() {
        assert!(SecureArgParser::validate_argument("").is_err());
    }
}
