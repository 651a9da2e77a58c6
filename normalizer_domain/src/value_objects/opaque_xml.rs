// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Opaque XML fragment
//!
//! `attributes`, `table_parts`, and `constant.value` are carried verbatim
//! from ingestion through to retrieval (`spec.md` §9: "avoid round-tripping
//! through a strong type; treat as string with inner-XML semantics"). This
//! newtype exists only to stop the bytes from being accidentally escaped,
//! reformatted, or parsed anywhere outside the attribute-extraction stage.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpaqueXml(String);

impl OpaqueXml {
    /// Wraps a fragment exactly as received. No escaping, no trimming,
    /// no re-serialization — whatever bytes came in go back out.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for OpaqueXml {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OpaqueXml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OpaqueXml {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_bytes_exactly() {
        let raw = "<attr name=\"колір\">&amp;синій</attr>";
        let xml = OpaqueXml::from_raw(raw);
        assert_eq!(xml.as_str(), raw);
        assert_eq!(xml.into_string(), raw);
    }
}
