// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Persistence contract for the hierarchical code tree (`spec.md`
//! §3, §4.6). The in-memory tree is built once from `list_all`'s
//! ordered-by-code sequence.

use async_trait::async_trait;

use crate::entities::code_tree_node::CodeTreeNode;
use crate::NormalizationError;

#[async_trait]
pub trait CodeTreeRepository: Send + Sync {
    async fn list_all(&self) -> Result<Vec<CodeTreeNode>, NormalizationError>;

    async fn find_by_code(&self, code: &str) -> Result<Option<CodeTreeNode>, NormalizationError>;

    async fn save(&self, node: &CodeTreeNode) -> Result<(), NormalizationError>;
}
