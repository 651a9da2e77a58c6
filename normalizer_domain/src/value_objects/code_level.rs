// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The four-level (plus leaf `Subgroup`) activity-code tree walked by the
//! hierarchical classifier (`spec.md` §4.6).

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub enum CodeLevel {
    Section,
    Class,
    Subclass,
    Group,
    Subgroup,
}

impl CodeLevel {
    /// The four levels the LM descent actually walks; `Subgroup` is a
    /// tree leaf the descent never targets directly (group-level
    /// confidence is the deepest the classifier commits to per
    /// `spec.md` §4.6's four-level descent).
    pub const DESCENT_ORDER: [CodeLevel; 4] =
        [CodeLevel::Section, CodeLevel::Class, CodeLevel::Subclass, CodeLevel::Group];

    pub fn next(&self) -> Option<CodeLevel> {
        match self {
            CodeLevel::Section => Some(CodeLevel::Class),
            CodeLevel::Class => Some(CodeLevel::Subclass),
            CodeLevel::Subclass => Some(CodeLevel::Group),
            CodeLevel::Group => Some(CodeLevel::Subgroup),
            CodeLevel::Subgroup => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CodeLevel::Section => "section",
            CodeLevel::Class => "class",
            CodeLevel::Subclass => "subclass",
            CodeLevel::Group => "group",
            CodeLevel::Subgroup => "subgroup",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "section" => Some(CodeLevel::Section),
            "class" => Some(CodeLevel::Class),
            "subclass" => Some(CodeLevel::Subclass),
            "group" => Some(CodeLevel::Group),
            "subgroup" => Some(CodeLevel::Subgroup),
            _ => None,
        }
    }
}

impl fmt::Display for CodeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descent_order_is_four_levels() {
        assert_eq!(CodeLevel::DESCENT_ORDER.len(), 4);
        assert_eq!(CodeLevel::DESCENT_ORDER[3], CodeLevel::Group);
    }
}
