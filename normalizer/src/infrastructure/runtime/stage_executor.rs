// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stage Executor
//!
//! Runs the per-record, deterministic and LM-backed stages of
//! `normalizer_domain::Stage` (`spec.md` §4.3). Grouping (3) and
//! cluster refinement (3.5) are cross-record and live in
//! [`super::normalization_pipeline`] instead, since they need the
//! whole batch rather than a single record's state.
//!
//! Every method writes through [`NormalizedRecord::complete_stage`] or
//! [`NormalizedRecord::record_stage_failure`], never mutating stage
//! columns directly, so invariant 1 (monotonic stages) is enforced at
//! the same boundary for every stage.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use regex::Regex;
use serde_json::json;
use std::sync::LazyLock;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use normalizer_domain::services::completion::Completion;
use normalizer_domain::services::hierarchical_classifier::{HierarchicalClassifier, KeywordClassifier};
use normalizer_domain::services::name_normalizer::NameNormalizer;
use normalizer_domain::{CatalogItem, Confidence, NormalizationError, NormalizedRecord, ProcessingMethod, Stage, StageOutcome};

use crate::infrastructure::adapters::xml_attribute_extractor::XmlAttributeExtractor;
use crate::infrastructure::runtime::worker_pool::LmWorkerPool;
use crate::infrastructure::services::benchmark_store_impl::CachedBenchmarkStore;

const HIERARCHICAL_MIN_CONFIDENCE: f64 = 0.7;
const GOLDEN_CONFIDENCE_THRESHOLD: f64 = 0.9;

static ARTICLE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\b[a-z]{1,4}-?\d{2,8}\b").expect("valid regex"));
static DIMENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b\d+(?:[.,]\d+)?\s?[xх]\s?\d+(?:[.,]\d+)?(?:\s?[xх]\s?\d+(?:[.,]\d+)?)?\b").expect("valid regex"));
static SERVICE_KEYWORDS: &[&str] =
    &["услуга", "работа", "монтаж", "ремонт", "обслуживание", "доставка", "аренда", "service", "repair", "installation"];

/// Runs every single-record stage, wiring the domain service contracts
/// to [`NormalizedRecord`]'s stage-completion API.
pub struct StageExecutor {
    name_normalizer: Arc<dyn NameNormalizer>,
    xml_extractor: XmlAttributeExtractor,
    keyword_classifier: Arc<dyn KeywordClassifier>,
    hierarchical_classifier: Arc<dyn HierarchicalClassifier>,
    completion: Arc<dyn Completion>,
    benchmark_store: Arc<CachedBenchmarkStore>,
    lm_pool: Arc<LmWorkerPool>,
}

impl StageExecutor {
    pub fn new(
        name_normalizer: Arc<dyn NameNormalizer>,
        keyword_classifier: Arc<dyn KeywordClassifier>,
        hierarchical_classifier: Arc<dyn HierarchicalClassifier>,
        completion: Arc<dyn Completion>,
        benchmark_store: Arc<CachedBenchmarkStore>,
        lm_pool: Arc<LmWorkerPool>,
    ) -> Self {
        Self {
            name_normalizer,
            xml_extractor: XmlAttributeExtractor::new(),
            keyword_classifier,
            hierarchical_classifier,
            completion,
            benchmark_store,
            lm_pool,
        }
    }

    /// Stage 0.5: rejects empty/whitespace-only names. Downstream
    /// stages never run for a record marked invalid here.
    #[instrument(skip_all, fields(record_id = %record.id()))]
    pub fn pre_cleanup(&self, record: &mut NormalizedRecord, item: &CatalogItem) -> Result<(), NormalizationError> {
        let raw = item.name().trim();
        if raw.is_empty() {
            record.mark_invalid("empty name");
            return Ok(());
        }
        let outcome = StageOutcome::complete(raw, Confidence::ONE, Utc::now()).with_input(raw);
        record.complete_stage(Stage::PreCleanup, outcome)
    }

    /// Stage 1: the fixed-order text pipeline, required to be
    /// idempotent (`spec.md` §8 invariant 4).
    pub fn name_normalization(&self, record: &mut NormalizedRecord, item: &CatalogItem) -> Result<(), NormalizationError> {
        let normalized = self.name_normalizer.normalize(item.name());
        let outcome = StageOutcome::complete(normalized, Confidence::ONE, Utc::now()).with_input(item.name());
        record.complete_stage(Stage::NameNormalization, outcome)
    }

    /// Stage 2: pattern match against a domain keyword list; this is a
    /// pattern-kind stage (`spec.md` §4.3 table), not a learned model.
    pub fn goods_vs_service(&self, record: &mut NormalizedRecord) -> Result<(), NormalizationError> {
        let normalized = record.stage(Stage::NameNormalization).output.clone().unwrap_or_default();
        let lowered = normalized.to_lowercase();
        let is_service = SERVICE_KEYWORDS.iter().any(|kw| lowered.contains(kw));
        let label = if is_service { "service" } else { "goods" };
        let confidence = if is_service { Confidence::new(0.85)? } else { Confidence::new(0.6)? };
        let outcome = StageOutcome::complete(label, confidence, Utc::now()).with_input(&normalized);
        record.complete_stage(Stage::GoodsVsService, outcome)
    }

    /// Stage 2.5: best-effort, non-fatal attribute-map extraction from
    /// the opaque XML blob (`spec.md` §4.3 "Attribute extraction").
    pub fn attribute_extraction(&self, record: &mut NormalizedRecord, item: &CatalogItem) -> Result<(), NormalizationError> {
        match self.xml_extractor.extract(item.attributes()) {
            Ok(attributes) => {
                let map: serde_json::Map<String, serde_json::Value> =
                    attributes.into_iter().map(|a| (a.name, json!(a.value))).collect();
                let output = serde_json::Value::Object(map).to_string();
                let outcome = StageOutcome::complete(output, Confidence::ONE, Utc::now());
                record.complete_stage(Stage::AttributeExtraction, outcome)
            }
            Err(err) => {
                warn!(record_id = %record.id(), error = %err, "attribute extraction failed; proceeding with empty map");
                let outcome = StageOutcome::complete("{}", Confidence::ZERO, Utc::now()).with_diagnostic(err.to_string());
                record.complete_stage(Stage::AttributeExtraction, outcome)
            }
        }
    }

    /// Stage 4: regex-based article/technical code extraction from the
    /// normalized name.
    pub fn article_code_extraction(&self, record: &mut NormalizedRecord) -> Result<(), NormalizationError> {
        let normalized = record.stage(Stage::NameNormalization).output.clone().unwrap_or_default();
        let found = ARTICLE_CODE.find(&normalized).map(|m| m.as_str().to_string());
        let confidence = if found.is_some() { Confidence::new(0.8)? } else { Confidence::ZERO };
        let outcome = StageOutcome::complete(found.unwrap_or_default(), confidence, Utc::now());
        record.complete_stage(Stage::ArticleCodeExtraction, outcome)
    }

    /// Stage 5: regex-based dimension extraction (`NxM` / `N x M`
    /// forms), mirroring the patterns name normalization already
    /// strips.
    pub fn dimension_extraction(&self, record: &mut NormalizedRecord, item: &CatalogItem) -> Result<(), NormalizationError> {
        let found = DIMENSION.find(item.name()).map(|m| m.as_str().to_string());
        let confidence = if found.is_some() { Confidence::new(0.8)? } else { Confidence::ZERO };
        let outcome = StageOutcome::complete(found.unwrap_or_default(), confidence, Utc::now());
        record.complete_stage(Stage::DimensionExtraction, outcome)
    }

    /// Stage 6: the keyword classifier's dictionary fast path
    /// (`spec.md` §4.6 "Fast path"). A miss here is not a failure — it
    /// simply hands off to the hierarchical/LM stages.
    pub fn keyword_classification(&self, record: &mut NormalizedRecord, root_word: &str) -> Result<(), NormalizationError> {
        match self.keyword_classifier.lookup(root_word) {
            Some(step) => {
                let outcome = StageOutcome::complete(step.code.clone(), step.confidence, Utc::now())
                    .with_input(root_word)
                    .with_diagnostic(step.reasoning);
                record.complete_stage(Stage::KeywordClassification, outcome)
            }
            None => {
                let outcome = StageOutcome::complete(String::new(), Confidence::ZERO, Utc::now()).with_input(root_word);
                record.complete_stage(Stage::KeywordClassification, outcome)
            }
        }
    }

    /// Stage 6.5: hierarchical LM descent/refinement over the stage-6
    /// guess. Writes golden fields immediately when the result clears
    /// `GOLDEN_CONFIDENCE_THRESHOLD` (`spec.md` §4.3, §4.6).
    pub async fn hierarchical_refinement(
        &self,
        record: &mut NormalizedRecord,
        normalized_name: &str,
        category: &str,
        cancel: CancellationToken,
    ) -> Result<(), NormalizationError> {
        let _permit = self.lm_pool.acquire().await?;
        let started = Instant::now();

        match self.hierarchical_classifier.classify(normalized_name, category, cancel).await {
            Ok(result) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                let diagnostic = format!(
                    "steps={} cache_hits={} ai_calls={} duration_ms={elapsed_ms}",
                    result.steps.len(),
                    result.cache_hits,
                    result.ai_calls_count
                );
                let outcome =
                    StageOutcome::complete(result.final_code.clone(), result.final_confidence, Utc::now()).with_diagnostic(diagnostic);
                record.complete_stage(Stage::HierarchicalRefinement, outcome)?;

                if result.final_confidence.meets(GOLDEN_CONFIDENCE_THRESHOLD) {
                    record.finalize_golden(
                        result.final_code,
                        result.final_name,
                        result.final_confidence,
                        ProcessingMethod::HierarchicalClassifier,
                        Utc::now(),
                    );
                }
                Ok(())
            }
            Err(err) => {
                record.record_stage_failure(Stage::HierarchicalRefinement, err.to_string());
                Ok(())
            }
        }
    }

    /// Stage 7: single-shot LM fallback when stage 6.5 did not settle
    /// on an acceptable code. Golden fields are written on success
    /// (`spec.md` §4.3: "stage 7 on LM success").
    pub async fn lm_classification(
        &self,
        record: &mut NormalizedRecord,
        normalized_name: &str,
        category: &str,
        cancel: CancellationToken,
    ) -> Result<(), NormalizationError> {
        if record.stage(Stage::HierarchicalRefinement).confidence.map(|c| c.meets(GOLDEN_CONFIDENCE_THRESHOLD)).unwrap_or(false) {
            let outcome = StageOutcome::complete("skipped", Confidence::ONE, Utc::now())
                .with_diagnostic("stage 6.5 already reached golden confidence");
            return record.complete_stage(Stage::LmClassification, outcome);
        }

        let _permit = self.lm_pool.acquire().await?;
        let system_prompt = "You classify a normalized catalog item name into an activity code. \
             Respond with JSON: {\"selected_code\": string, \"confidence\": number in [0,1], \"reasoning\": string}.";
        let user_prompt = format!("name: {normalized_name}\ncategory: {category}");

        match self.completion.complete(system_prompt, &user_prompt, cancel).await {
            Ok(raw) => {
                record.set_ai_response_raw(raw.clone());
                match parse_lm_choice(&raw) {
                    Ok((code, confidence, reasoning)) => {
                        let outcome = StageOutcome::complete(code.clone(), confidence, Utc::now()).with_diagnostic(reasoning);
                        record.complete_stage(Stage::LmClassification, outcome)?;
                        if confidence.meets(HIERARCHICAL_MIN_CONFIDENCE) {
                            record.finalize_golden(code, normalized_name, confidence, ProcessingMethod::LmClassifier, Utc::now());
                        }
                        Ok(())
                    }
                    Err(err) => {
                        record.record_stage_failure(Stage::LmClassification, err.to_string());
                        Ok(())
                    }
                }
            }
            Err(err) => {
                record.record_stage_failure(Stage::LmClassification, err.to_string());
                Ok(())
            }
        }
    }

    /// Stage 8: selects manual review when neither 6.5 nor 7 produced
    /// an acceptable output (`spec.md` §4.3, §7 "LM transient ... the
    /// record is flagged manual_review_required=true").
    pub fn fallback_review(&self, record: &mut NormalizedRecord) -> Result<(), NormalizationError> {
        if record.golden().is_some() {
            let outcome = StageOutcome::complete("not needed", Confidence::ONE, Utc::now());
            return record.complete_stage(Stage::FallbackReview, outcome);
        }

        record.mark_manual_review();
        let reason = "no stage produced an acceptable classification";
        record.finalize_golden(String::new(), String::new(), Confidence::ZERO, ProcessingMethod::ManualReview, Utc::now());
        let outcome = StageOutcome::complete("manual_review", Confidence::ZERO, Utc::now()).with_diagnostic(reason);
        record.complete_stage(Stage::FallbackReview, outcome)
    }

    /// Stage 9: records the decision reason; does not change the
    /// golden fields, only documents why they were accepted.
    pub fn final_validation(&self, record: &mut NormalizedRecord) -> Result<(), NormalizationError> {
        let reason = match record.golden() {
            Some(golden) if matches!(golden.final_processing_method, ProcessingMethod::ManualReview) => "manual review required",
            Some(golden) => match golden.final_processing_method {
                ProcessingMethod::Benchmark => "benchmark match",
                ProcessingMethod::KeywordClassifier => "keyword dictionary hit",
                ProcessingMethod::HierarchicalClassifier => "hierarchical classifier agreement",
                ProcessingMethod::LmClassifier => "lm classification success",
                ProcessingMethod::ManualReview => "manual review required",
            },
            None => "no decision recorded",
        };
        let confidence = record.golden().map(|g| g.final_confidence).unwrap_or(Confidence::ZERO);
        let outcome = StageOutcome::complete(reason, confidence, Utc::now());
        record.complete_stage(Stage::FinalValidation, outcome)
    }

    /// Stage 10 (terminal): flags the record ready for export once a
    /// decision — including manual review — exists.
    pub fn export_flag(&self, record: &mut NormalizedRecord) -> Result<(), NormalizationError> {
        let ready = record.golden().is_some();
        let label = if ready { "ready" } else { "blocked" };
        let confidence = if ready { Confidence::ONE } else { Confidence::ZERO };
        let outcome = StageOutcome::complete(label, confidence, Utc::now());
        record.complete_stage(Stage::ExportFlag, outcome)
    }

    /// Consults the benchmark store ahead of stage 6/6.5/7, short-
    /// circuiting straight to golden fields on a hit (`spec.md` §4.8:
    /// "a shortcut (skip LM)").
    pub async fn try_benchmark_shortcut(&self, record: &mut NormalizedRecord, name: &str) -> Option<()> {
        let benchmark = self.benchmark_store.find_best_match("catalog_item", name).await.ok().flatten()?;
        record.finalize_golden(
            benchmark.data_blob().to_string(),
            benchmark.canonical_name().to_string(),
            Confidence::ONE,
            ProcessingMethod::Benchmark,
            Utc::now(),
        );
        Some(())
    }
}

/// Parses the LM's classification JSON, tolerating the defects `spec.md`
/// §4.6 step 3 calls out: fenced-code wrappers, bare `.95` instead of
/// `0.95`, and percentage confidences.
fn parse_lm_choice(raw: &str) -> Result<(String, Confidence, String), NormalizationError> {
    let cleaned = raw.trim().trim_start_matches("```json").trim_start_matches("```").trim_end_matches("```").trim();

    let value: serde_json::Value = serde_json::from_str(cleaned)
        .map_err(|e| NormalizationError::LmMalformedOutput(format!("invalid JSON: {e}")))?;

    let code = value
        .get("selected_code")
        .and_then(|v| v.as_str())
        .ok_or_else(|| NormalizationError::LmMalformedOutput("missing selected_code".to_string()))?
        .to_string();

    let raw_confidence = value.get("confidence").ok_or_else(|| NormalizationError::LmMalformedOutput("missing confidence".to_string()))?;
    let confidence_value = match raw_confidence {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => {
            let trimmed = s.trim().trim_end_matches('%');
            let parsed: f64 = trimmed.parse().map_err(|_| NormalizationError::LmMalformedOutput(format!("bad confidence `{s}`")))?;
            if s.trim().ends_with('%') { parsed / 100.0 } else { parsed }
        }
        _ => return Err(NormalizationError::LmMalformedOutput("confidence not numeric".to_string())),
    };

    let reasoning = value.get("reasoning").and_then(|v| v.as_str()).unwrap_or("").to_string();

    Ok((code, Confidence::clamped(confidence_value), reasoning))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_json_with_percentage_confidence() {
        let raw = "```json\n{\"selected_code\": \"01.02\", \"confidence\": \"92%\", \"reasoning\": \"close match\"}\n```";
        let (code, confidence, reasoning) = parse_lm_choice(raw).unwrap();
        assert_eq!(code, "01.02");
        assert!((confidence.value() - 0.92).abs() < 1e-9);
        assert_eq!(reasoning, "close match");
    }

    #[test]
    fn parses_bare_decimal_confidence() {
        let raw = "{\"selected_code\": \"03\", \"confidence\": 0.95, \"reasoning\": \"ok\"}";
        let (_, confidence, _) = parse_lm_choice(raw).unwrap();
        assert!((confidence.value() - 0.95).abs() < 1e-9);
    }

    #[test]
    fn rejects_missing_selected_code() {
        let raw = "{\"confidence\": 0.5}";
        assert!(parse_lm_choice(raw).is_err());
    }
}
