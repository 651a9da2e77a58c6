// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Bounded `[0, 1]` confidence score value object, shared by every
//! similarity/classification result in the system.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::NormalizationError;

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Confidence(f64);

impl Confidence {
    pub const ZERO: Confidence = Confidence(0.0);
    pub const ONE: Confidence = Confidence(1.0);

    pub fn new(value: f64) -> Result<Self, NormalizationError> {
        if !(0.0..=1.0).contains(&value) || value.is_nan() {
            return Err(NormalizationError::ValidationError(format!(
                "confidence must be in [0, 1], got {value}"
            )));
        }
        Ok(Self(value))
    }

    /// Clamps instead of rejecting; used when deriving a confidence from
    /// an LM response that may report e.g. `1.02` due to rounding.
    pub fn clamped(value: f64) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn meets(&self, threshold: f64) -> bool {
        self.0 >= threshold
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Self::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range() {
        assert!(Confidence::new(1.5).is_err());
        assert!(Confidence::new(-0.1).is_err());
        assert!(Confidence::new(f64::NAN).is_err());
    }

    #[test]
    fn clamped_never_escapes_range() {
        assert_eq!(Confidence::clamped(5.0).value(), 1.0);
        assert_eq!(Confidence::clamped(-5.0).value(), 0.0);
    }

    #[test]
    fn meets_threshold() {
        let c = Confidence::new(0.7).unwrap();
        assert!(c.meets(0.7));
        assert!(!c.meets(0.71));
    }
}
