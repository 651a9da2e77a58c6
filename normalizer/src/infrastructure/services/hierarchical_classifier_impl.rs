// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Hierarchical LM classifier (`spec.md` §4.6): a three-tier cache —
//! exact `(name, category)` result, learned `(rootWord, category)`
//! result, and per-level `(name, category, level, parentCode)` step —
//! sits in front of the root-word keyword dictionary, which in turn
//! sits in front of the LM descent over [`CodeLevel::DESCENT_ORDER`].
//! Each tier is checked before falling through to the next, and only a
//! miss on every tier and the dictionary reaches the language model.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use normalizer_domain::repositories::CodeTreeRepository;
use normalizer_domain::services::completion::Completion;
use normalizer_domain::services::hierarchical_classifier::{
    ClassificationStep, HierarchicalClassifier, HierarchicalResult, KeywordClassifier,
};
use normalizer_domain::{CodeLevel, CodeTreeNode, Confidence, NormalizationError};

/// Minimum confidence a descent step must clear to continue to the
/// next level; falling below it halts the descent early (`spec.md`
/// §4.6).
const MIN_CONFIDENCE: f64 = 0.7;

/// Descents completing above this confidence are fed back into the
/// keyword dictionary as a fast path for future lookups (`spec.md`
/// §4.6 "online learning").
const LEARNING_THRESHOLD: f64 = 0.9;

struct TreeIndex {
    by_code: HashMap<String, CodeTreeNode>,
    children_of: HashMap<Option<String>, Vec<String>>,
}

impl TreeIndex {
    fn build(nodes: Vec<CodeTreeNode>) -> Self {
        let mut by_code = HashMap::new();
        let mut children_of: HashMap<Option<String>, Vec<String>> = HashMap::new();
        for node in nodes {
            children_of.entry(node.parent_code().map(str::to_string)).or_default().push(node.code().to_string());
            by_code.insert(node.code().to_string(), node);
        }
        Self { by_code, children_of }
    }

    fn children(&self, parent_code: Option<&str>) -> Vec<&CodeTreeNode> {
        self.children_of
            .get(&parent_code.map(str::to_string))
            .into_iter()
            .flatten()
            .filter_map(|code| self.by_code.get(code))
            .collect()
    }
}

/// Three tiers, checked in order ahead of the keyword dictionary and
/// the LM descent itself (`spec.md` §4.6):
/// 1. `exact` — full result keyed `name|category`.
/// 2. `root_word` — full result keyed `rootWord|category`, populated
///    only when a descent's `final_confidence` clears
///    [`LEARNING_THRESHOLD`].
/// 3. `per_level` — a single descent step keyed
///    `name|category|level|parentCode`, so a partial descent can
///    resume from the last cached level instead of re-querying the LM.
struct ResultCache {
    exact: DashMap<String, HierarchicalResult>,
    root_word: DashMap<String, HierarchicalResult>,
    per_level: DashMap<String, ClassificationStep>,
}

impl ResultCache {
    fn new() -> Self {
        Self { exact: DashMap::new(), root_word: DashMap::new(), per_level: DashMap::new() }
    }

    fn key(name: &str, category: &str) -> String {
        format!("{name}|{category}")
    }

    fn level_key(name: &str, category: &str, level: CodeLevel, parent_code: Option<&str>) -> String {
        format!("{name}|{category}|{level}|{}", parent_code.unwrap_or(""))
    }

    fn get(&self, name: &str, category: &str) -> Option<HierarchicalResult> {
        self.exact.get(&Self::key(name, category)).map(|entry| entry.value().clone())
    }

    fn put(&self, name: &str, category: &str, result: HierarchicalResult) {
        self.exact.insert(Self::key(name, category), result);
    }

    fn get_root_word(&self, root_word: &str, category: &str) -> Option<HierarchicalResult> {
        self.root_word.get(&Self::key(root_word, category)).map(|entry| entry.value().clone())
    }

    fn put_root_word(&self, root_word: &str, category: &str, result: HierarchicalResult) {
        self.root_word.insert(Self::key(root_word, category), result);
    }

    fn get_level(&self, name: &str, category: &str, level: CodeLevel, parent_code: Option<&str>) -> Option<ClassificationStep> {
        self.per_level.get(&Self::level_key(name, category, level, parent_code)).map(|entry| entry.value().clone())
    }

    fn put_level(&self, name: &str, category: &str, level: CodeLevel, parent_code: Option<&str>, step: ClassificationStep) {
        self.per_level.insert(Self::level_key(name, category, level, parent_code), step);
    }

    fn clear(&self) {
        self.exact.clear();
        self.root_word.clear();
        self.per_level.clear();
    }
}

/// Root-word -> classification dictionary, gated under a single
/// read-write lock so learners see a consistent snapshot (`spec.md`
/// §9 "Cyclic-graph avoidance").
pub struct LearningKeywordClassifier {
    dictionary: RwLock<HashMap<String, ClassificationStep>>,
}

impl LearningKeywordClassifier {
    pub fn new() -> Self {
        Self { dictionary: RwLock::new(HashMap::new()) }
    }
}

impl Default for LearningKeywordClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl KeywordClassifier for LearningKeywordClassifier {
    fn lookup(&self, root_word: &str) -> Option<ClassificationStep> {
        self.dictionary.read().get(root_word).cloned()
    }

    fn learn(&self, root_word: &str, step: ClassificationStep) {
        self.dictionary.write().insert(root_word.to_string(), step);
    }
}

pub struct LmHierarchicalClassifier {
    tree_repository: Arc<dyn CodeTreeRepository>,
    completion: Arc<dyn Completion>,
    keyword_classifier: Arc<dyn KeywordClassifier>,
    cache: ResultCache,
    tree: RwLock<Option<Arc<TreeIndex>>>,
}

impl LmHierarchicalClassifier {
    pub fn new(
        tree_repository: Arc<dyn CodeTreeRepository>,
        completion: Arc<dyn Completion>,
        keyword_classifier: Arc<dyn KeywordClassifier>,
    ) -> Self {
        Self { tree_repository, completion, keyword_classifier, cache: ResultCache::new(), tree: RwLock::new(None) }
    }

    async fn tree_index(&self) -> Result<Arc<TreeIndex>, NormalizationError> {
        if let Some(existing) = self.tree.read().clone() {
            return Ok(existing);
        }
        let nodes = self.tree_repository.list_all().await?;
        let built = Arc::new(TreeIndex::build(nodes));
        *self.tree.write() = Some(built.clone());
        Ok(built)
    }

    fn root_word(normalized_name: &str) -> &str {
        normalized_name.split_whitespace().next().unwrap_or(normalized_name)
    }

    /// Asks the LM to pick the best child of `parent_code` at `level`
    /// for `normalized_name`, given `category` as disambiguating
    /// context (`spec.md` §4.6 step 2-3).
    async fn descend_one_level(
        &self,
        normalized_name: &str,
        category: &str,
        level: CodeLevel,
        parent_code: Option<&str>,
        tree: &TreeIndex,
        cancel: CancellationToken,
    ) -> Result<Option<ClassificationStep>, NormalizationError> {
        let candidates = tree.children(parent_code);
        if candidates.is_empty() {
            return Ok(None);
        }

        let options: String =
            candidates.iter().map(|node| format!("{}: {}", node.code(), node.name())).collect::<Vec<_>>().join("\n");
        let system_prompt = format!(
            "You classify catalog items into a hierarchical activity-code tree. \
             Respond with the single best matching code from the candidates, \
             a confidence between 0 and 1, and one sentence of reasoning, as JSON: \
             {{\"code\": \"...\", \"confidence\": 0.0, \"reasoning\": \"...\"}}."
        );
        let user_prompt =
            format!("Item: \"{normalized_name}\" (category: {category})\nLevel: {level}\nCandidates:\n{options}");

        let raw = self.completion.complete(&system_prompt, &user_prompt, cancel).await?;
        let repaired = repair_json_response(&raw);
        let parsed: serde_json::Value = serde_json::from_str(&repaired)
            .map_err(|e| NormalizationError::LmMalformedOutput(format!("hierarchical descent: {e}")))?;

        let code = parsed.get("code").and_then(|v| v.as_str()).unwrap_or_default().to_string();
        let confidence_value = parsed.get("confidence").and_then(|v| v.as_f64()).unwrap_or(0.0);
        let reasoning = parsed.get("reasoning").and_then(|v| v.as_str()).unwrap_or_default().to_string();

        let Some(node) = tree.by_code.get(&code) else { return Ok(None) };
        let confidence = Confidence::new(confidence_value).unwrap_or(Confidence::ZERO);

        Ok(Some(ClassificationStep { level, code: node.code().to_string(), name: node.name().to_string(), confidence, reasoning }))
    }
}

/// Strips Markdown code fences and trims stray leading/trailing text so
/// a fenced ```json block still parses (`spec.md` §4.6 step 3, §4.7).
fn repair_json_response(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_fence = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed)
        .trim_end_matches("```")
        .trim();

    match (without_fence.find('{'), without_fence.rfind('}')) {
        (Some(start), Some(end)) if end >= start => without_fence[start..=end].to_string(),
        _ => without_fence.to_string(),
    }
}

#[async_trait]
impl HierarchicalClassifier for LmHierarchicalClassifier {
    async fn classify(
        &self,
        normalized_name: &str,
        category: &str,
        cancel: CancellationToken,
    ) -> Result<HierarchicalResult, NormalizationError> {
        let started = Instant::now();

        if let Some(cached) = self.cache.get(normalized_name, category) {
            return Ok(HierarchicalResult { cache_hits: cached.cache_hits + 1, ..cached });
        }

        let root_word = Self::root_word(normalized_name);
        if let Some(cached) = self.cache.get_root_word(root_word, category) {
            let result = HierarchicalResult { cache_hits: cached.cache_hits + 1, ..cached };
            self.cache.put(normalized_name, category, result.clone());
            return Ok(result);
        }

        if let Some(step) = self.keyword_classifier.lookup(root_word) {
            let result = HierarchicalResult {
                final_code: step.code.clone(),
                final_name: step.name.clone(),
                final_confidence: step.confidence,
                steps: vec![step],
                total_duration_ms: started.elapsed().as_millis() as u64,
                cache_hits: 0,
                ai_calls_count: 0,
            };
            self.cache.put(normalized_name, category, result.clone());
            return Ok(result);
        }

        let tree = self.tree_index().await?;
        let mut steps = Vec::new();
        let mut parent_code: Option<String> = None;
        let mut ai_calls_count = 0u32;

        for level in CodeLevel::DESCENT_ORDER {
            let step = if let Some(cached_step) = self.cache.get_level(normalized_name, category, level, parent_code.as_deref()) {
                Some(cached_step)
            } else {
                let step = self
                    .descend_one_level(normalized_name, category, level, parent_code.as_deref(), &tree, cancel.clone())
                    .await?;
                ai_calls_count += 1;
                if let Some(step) = &step {
                    self.cache.put_level(normalized_name, category, level, parent_code.as_deref(), step.clone());
                }
                step
            };

            match step {
                Some(step) if step.confidence.value() >= MIN_CONFIDENCE => {
                    parent_code = Some(step.code.clone());
                    steps.push(step);
                }
                Some(step) => {
                    steps.push(step);
                    break;
                }
                None => break,
            }
        }

        let final_step = steps.last().cloned();
        let result = HierarchicalResult {
            final_code: final_step.as_ref().map(|s| s.code.clone()).unwrap_or_default(),
            final_name: final_step.as_ref().map(|s| s.name.clone()).unwrap_or_default(),
            final_confidence: final_step.as_ref().map(|s| s.confidence).unwrap_or(Confidence::ZERO),
            steps,
            total_duration_ms: started.elapsed().as_millis() as u64,
            cache_hits: 0,
            ai_calls_count,
        };

        if result.final_confidence.value() > LEARNING_THRESHOLD {
            if let Some(step) = result.steps.last() {
                self.keyword_classifier.learn(root_word, step.clone());
            }
            self.cache.put_root_word(root_word, category, result.clone());
        }

        self.cache.put(normalized_name, category, result.clone());
        Ok(result)
    }

    fn invalidate_caches(&self) {
        self.cache.clear();
        *self.tree.write() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repair_json_response_strips_fences() {
        let fenced = "```json\n{\"code\": \"01\", \"confidence\": 0.9, \"reasoning\": \"ok\"}\n```";
        let repaired = repair_json_response(fenced);
        let parsed: serde_json::Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(parsed["code"], "01");
    }

    #[test]
    fn repair_json_response_trims_surrounding_prose() {
        let noisy = "Sure, here is the answer: {\"code\": \"02\", \"confidence\": 0.5, \"reasoning\": \"x\"} Thanks!";
        let repaired = repair_json_response(noisy);
        let parsed: serde_json::Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(parsed["code"], "02");
    }

    #[test]
    fn learning_keyword_classifier_round_trips() {
        let classifier = LearningKeywordClassifier::new();
        assert!(classifier.lookup("кабель").is_none());
        classifier.learn(
            "кабель",
            ClassificationStep {
                level: CodeLevel::Group,
                code: "27.32".to_string(),
                name: "cables".to_string(),
                confidence: Confidence::new(0.95).unwrap(),
                reasoning: "learned".to_string(),
            },
        );
        assert_eq!(classifier.lookup("кабель").unwrap().code, "27.32");
    }

    #[test]
    fn tree_index_groups_children_by_parent() {
        let nodes = vec![
            CodeTreeNode::new("01", "Section A", None, CodeLevel::Section),
            CodeTreeNode::new("01.1", "Class A1", Some("01".to_string()), CodeLevel::Class),
            CodeTreeNode::new("01.2", "Class A2", Some("01".to_string()), CodeLevel::Class),
        ];
        let index = TreeIndex::build(nodes);
        assert_eq!(index.children(Some("01")).len(), 2);
        assert_eq!(index.children(None).len(), 1);
    }

    struct StubTree {
        nodes: Vec<CodeTreeNode>,
    }

    #[async_trait]
    impl CodeTreeRepository for StubTree {
        async fn list_all(&self) -> Result<Vec<CodeTreeNode>, NormalizationError> {
            Ok(self.nodes.clone())
        }
        async fn find_by_code(&self, code: &str) -> Result<Option<CodeTreeNode>, NormalizationError> {
            Ok(self.nodes.iter().find(|n| n.code() == code).cloned())
        }
        async fn save(&self, _node: &CodeTreeNode) -> Result<(), NormalizationError> {
            Ok(())
        }
    }

    /// Succeeds on its 1st and 3rd calls, fails transiently on its 2nd
    /// — modeling a descent that breaks midway so a later retry should
    /// resume from the per-level cache instead of re-querying a level
    /// it already resolved.
    struct FlakyCompletion {
        calls: std::sync::atomic::AtomicU32,
    }

    #[async_trait]
    impl Completion for FlakyCompletion {
        async fn complete(&self, _system_prompt: &str, _user_prompt: &str, _cancel: CancellationToken) -> Result<String, NormalizationError> {
            match self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1 {
                1 => Ok(r#"{"code": "01", "confidence": 0.95, "reasoning": "section"}"#.to_string()),
                2 => Err(NormalizationError::Timeout("simulated".to_string())),
                _ => Ok(r#"{"code": "01.1", "confidence": 0.95, "reasoning": "class"}"#.to_string()),
            }
        }
    }

    #[tokio::test]
    async fn per_level_cache_resumes_a_descent_without_re_querying_a_resolved_level() {
        let tree = Arc::new(StubTree {
            nodes: vec![
                CodeTreeNode::new("01", "Section A", None, CodeLevel::Section),
                CodeTreeNode::new("01.1", "Class A1", Some("01".to_string()), CodeLevel::Class),
            ],
        });
        let completion = Arc::new(FlakyCompletion { calls: std::sync::atomic::AtomicU32::new(0) });
        let keyword_classifier = Arc::new(LearningKeywordClassifier::new());
        let classifier = LmHierarchicalClassifier::new(tree, completion.clone(), keyword_classifier);

        assert!(classifier.classify("widget", "goods", CancellationToken::new()).await.is_err());
        assert_eq!(completion.calls.load(std::sync::atomic::Ordering::SeqCst), 2);

        let result = classifier.classify("widget", "goods", CancellationToken::new()).await.unwrap();
        assert_eq!(result.final_code, "01.1");
        // Section was already cached per-level, so the retry only
        // issues one further LM call (class), not two.
        assert_eq!(completion.calls.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn root_word_cache_is_populated_only_above_the_learning_threshold() {
        let tree = Arc::new(StubTree { nodes: vec![CodeTreeNode::new("01", "Section A", None, CodeLevel::Section)] });
        let completion = Arc::new(FlakyCompletion { calls: std::sync::atomic::AtomicU32::new(0) });
        let keyword_classifier = Arc::new(LearningKeywordClassifier::new());
        let classifier = LmHierarchicalClassifier::new(tree, completion.clone(), keyword_classifier.clone());

        classifier.classify("widget large", "goods", CancellationToken::new()).await.unwrap();
        assert!(keyword_classifier.lookup("widget").is_some());
        assert!(classifier.cache.get_root_word("widget", "goods").is_some());
    }
}
