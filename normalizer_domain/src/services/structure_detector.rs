// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Schema-detection contract for ingested databases of arbitrary
//! structure (`spec.md` §4.9).

use std::collections::HashMap;

use crate::Confidence;

#[derive(Debug, Clone)]
pub struct ColumnMapping {
    pub database_id: String,
    pub table_name: String,
    pub entity_type: String,
    pub columns: HashMap<String, String>,
    pub confidence: Confidence,
}

pub trait StructureDetector: Send + Sync {
    /// Scores candidate table/column name matches via a fixed weighted
    /// rubric. Returns `None` below the `0.7` minimum confidence
    /// (`spec.md` §4.9: reported as "unidentified").
    fn detect(&self, table_name: &str, column_names: &[String]) -> Option<ColumnMapping>;
}
