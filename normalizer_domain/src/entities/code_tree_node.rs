// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! One node of the hierarchical activity-code tree (`spec.md` §3, §4.6).
//! Persisted as an ordered-by-code sequence; the in-memory tree is
//! assembled once from these rows by the classifier's tree builder.

use serde::{Deserialize, Serialize};

use crate::{CodeLevel, CodeNodeId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeTreeNode {
    id: CodeNodeId,
    code: String,
    name: String,
    parent_code: Option<String>,
    level: CodeLevel,
}

impl CodeTreeNode {
    pub fn new(code: impl Into<String>, name: impl Into<String>, parent_code: Option<String>, level: CodeLevel) -> Self {
        Self { id: CodeNodeId::new(), code: code.into(), name: name.into(), parent_code, level }
    }

    /// Rebuilds a node from already-persisted state, preserving its
    /// original id.
    pub fn reconstitute(id: CodeNodeId, code: String, name: String, parent_code: Option<String>, level: CodeLevel) -> Self {
        Self { id, code, name, parent_code, level }
    }

    pub fn id(&self) -> &CodeNodeId {
        &self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent_code(&self) -> Option<&str> {
        self.parent_code.as_deref()
    }

    pub fn level(&self) -> CodeLevel {
        self.level
    }

    pub fn is_root(&self) -> bool {
        self.parent_code.is_none()
    }
}
