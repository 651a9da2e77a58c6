// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Process Exit Codes
//!
//! Maps domain and bootstrap failures to stable process exit codes, so
//! supervisors (systemd, container orchestrators) can distinguish
//! configuration mistakes from transient infrastructure failures
//! without parsing log text.

use normalizer_domain::NormalizationError;
use std::process::ExitCode as StdExitCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    GenericError,
    ConfigurationError,
    ValidationError,
    NotFound,
    StateError,
    DatabaseError,
    ClassifierUnavailable,
    RateLimited,
    Timeout,
    Cancelled,
    InternalError,
}

impl ExitCode {
    pub fn code(self) -> u8 {
        match self {
            ExitCode::Success => 0,
            ExitCode::GenericError => 1,
            ExitCode::ConfigurationError => 2,
            ExitCode::ValidationError => 3,
            ExitCode::NotFound => 4,
            ExitCode::StateError => 5,
            ExitCode::DatabaseError => 6,
            ExitCode::ClassifierUnavailable => 7,
            ExitCode::RateLimited => 8,
            ExitCode::Timeout => 9,
            ExitCode::Cancelled => 130,
            ExitCode::InternalError => 70,
        }
    }
}

impl From<ExitCode> for StdExitCode {
    fn from(code: ExitCode) -> Self {
        StdExitCode::from(code.code())
    }
}

/// Classifies a domain error by `category()` (see `NormalizationError`)
/// rather than matching every variant, so new error variants fall back
/// to a sane default instead of failing to compile.
pub fn map_error_to_exit_code(error: &NormalizationError) -> ExitCode {
    match error.category() {
        "configuration" => ExitCode::ConfigurationError,
        "validation" => ExitCode::ValidationError,
        "not_found" => ExitCode::NotFound,
        "state" => ExitCode::StateError,
        "database" => ExitCode::DatabaseError,
        "classifier" | "lm_client" => ExitCode::ClassifierUnavailable,
        "cancellation" => ExitCode::Cancelled,
        _ => ExitCode::InternalError,
    }
}

pub fn result_to_exit_code<T>(result: &Result<T, NormalizationError>) -> ExitCode {
    match result {
        Ok(_) => ExitCode::Success,
        Err(e) => map_error_to_exit_code(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_map_to_configuration_exit_code() {
        let err = NormalizationError::invalid_config("missing project_id");
        assert_eq!(map_error_to_exit_code(&err), ExitCode::ConfigurationError);
    }

    #[test]
    fn ok_result_maps_to_success() {
        let result: Result<(), NormalizationError> = Ok(());
        assert_eq!(result_to_exit_code(&result), ExitCode::Success);
    }

    #[test]
    fn rate_limited_is_distinct_from_timeout() {
        let rate_limited = NormalizationError::RateLimited("lm provider".into());
        let timeout = NormalizationError::Timeout("lm provider".into());
        assert_ne!(map_error_to_exit_code(&rate_limited), map_error_to_exit_code(&timeout));
    }
}
