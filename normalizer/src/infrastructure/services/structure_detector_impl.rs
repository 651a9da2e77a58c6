// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Heuristic schema detector (`spec.md` §4.9): scores a candidate
//! table against each recognized entity type using a fixed weighted
//! rubric over table-name and column-name similarity, reporting the
//! best match only when it clears the `0.7` floor.

use std::collections::HashMap;

use normalizer_domain::services::structure_detector::{ColumnMapping, StructureDetector};
use normalizer_domain::Confidence;

const MIN_CONFIDENCE: f64 = 0.7;

struct EntitySignature {
    entity_type: &'static str,
    table_name_hints: &'static [&'static str],
    required_columns: &'static [(&'static str, &'static [&'static str])],
}

const SIGNATURES: &[EntitySignature] = &[
    EntitySignature {
        entity_type: "catalog_item",
        table_name_hints: &["item", "product", "good", "товар", "позиция"],
        required_columns: &[
            ("reference", &["reference", "sku", "article", "код_товара"]),
            ("name", &["name", "title", "наименование", "название"]),
            ("code", &["code", "kpved", "code_okpd", "код"]),
        ],
    },
    EntitySignature {
        entity_type: "constant",
        table_name_hints: &["constant", "param", "const", "константа"],
        required_columns: &[("name", &["name", "key", "ключ"]), ("value", &["value", "значение"])],
    },
    EntitySignature {
        entity_type: "catalog",
        table_name_hints: &["catalog", "category", "каталог", "категория"],
        required_columns: &[("name", &["name", "title", "наименование"])],
    },
];

pub struct HeuristicStructureDetector;

impl HeuristicStructureDetector {
    pub fn new() -> Self {
        Self
    }

    fn name_similarity(candidate: &str, hints: &[&str]) -> f64 {
        let lowered = candidate.to_lowercase();
        hints
            .iter()
            .map(|hint| if lowered.contains(hint) { 1.0 } else { 0.0 })
            .fold(0.0_f64, f64::max)
    }

    fn best_column_for(logical: &[&str], column_names: &[String]) -> Option<(String, f64)> {
        column_names
            .iter()
            .map(|column| {
                let lowered = column.to_lowercase();
                let score = logical.iter().map(|hint| if lowered.contains(hint) { 1.0 } else { 0.0 }).fold(0.0_f64, f64::max);
                (column.clone(), score)
            })
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .filter(|(_, score)| *score > 0.0)
    }
}

impl Default for HeuristicStructureDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl StructureDetector for HeuristicStructureDetector {
    fn detect(&self, table_name: &str, column_names: &[String]) -> Option<ColumnMapping> {
        let mut best: Option<(f64, ColumnMapping)> = None;

        for signature in SIGNATURES {
            let table_score = Self::name_similarity(table_name, signature.table_name_hints);

            let mut columns = HashMap::new();
            let mut column_scores = Vec::new();
            for (logical_name, hints) in signature.required_columns {
                if let Some((matched_column, score)) = Self::best_column_for(hints, column_names) {
                    columns.insert(logical_name.to_string(), matched_column);
                    column_scores.push(score);
                } else {
                    column_scores.push(0.0);
                }
            }

            // Weighted rubric: table-name match counts for 40%, the
            // average column match quality for 60% (`spec.md` §4.9).
            let column_average = if column_scores.is_empty() {
                0.0
            } else {
                column_scores.iter().sum::<f64>() / column_scores.len() as f64
            };
            let confidence = 0.4 * table_score + 0.6 * column_average;

            if best.as_ref().map(|(best_score, _)| confidence > *best_score).unwrap_or(true) {
                best = Some((
                    confidence,
                    ColumnMapping {
                        database_id: String::new(),
                        table_name: table_name.to_string(),
                        entity_type: signature.entity_type.to_string(),
                        columns,
                        confidence: Confidence::new(confidence).unwrap_or(Confidence::ZERO),
                    },
                ));
            }
        }

        best.filter(|(score, _)| *score >= MIN_CONFIDENCE).map(|(_, mapping)| mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_catalog_item_table() {
        let detector = HeuristicStructureDetector::new();
        let columns = vec!["sku".to_string(), "name".to_string(), "code".to_string()];
        let mapping = detector.detect("products", &columns).expect("should detect catalog_item");
        assert_eq!(mapping.entity_type, "catalog_item");
        assert!(mapping.confidence.value() >= MIN_CONFIDENCE);
    }

    #[test]
    fn unrecognizable_table_returns_none() {
        let detector = HeuristicStructureDetector::new();
        let columns = vec!["x".to_string(), "y".to_string()];
        assert!(detector.detect("zzz_unknown", &columns).is_none());
    }
}
