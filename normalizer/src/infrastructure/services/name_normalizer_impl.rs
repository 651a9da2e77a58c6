// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Stage 1's concrete text pipeline (`spec.md` §4.3 "Name normalization").
//! Applies each transformation in the fixed order the spec requires, so
//! that `normalize(normalize(s)) == normalize(s)` (invariant 4, §8).

use regex::Regex;
use std::sync::LazyLock;

use normalizer_domain::services::NameNormalizer;

static ARTICLE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[a-zA-Z]{2,}\d{2,}[a-zA-Z0-9]*\b").unwrap());
static DIMENSION_EXPR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d+(?:[.,]\d+)?\s*[x×]\s*\d+(?:[.,]\d+)?\b").unwrap());
static NUMBER_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d+(?:[.,]\d+)?\s?(mm|cm|m|kg|g|l|ml|w|kw|v|a|mm2|мм|см|м|кг|г|л|мл|вт|квт|в|а|мм2)\b").unwrap()
});
static STANDALONE_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d+(?:[.,]\d+)?\b").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static TRAILING_PUNCT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s,.;:\-]+$").unwrap());

pub struct RegexNameNormalizer;

impl RegexNameNormalizer {
    pub fn new() -> Self {
        Self
    }

    fn strip_numeric_noise(text: &str) -> String {
        let text = DIMENSION_EXPR.replace_all(text, " ");
        let text = NUMBER_UNIT.replace_all(&text, " ");
        let text = STANDALONE_NUMBER.replace_all(&text, " ");
        text.into_owned()
    }
}

impl Default for RegexNameNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl NameNormalizer for RegexNameNormalizer {
    fn normalize(&self, raw_name: &str) -> String {
        let lowered = raw_name.to_lowercase();
        let stripped_codes = ARTICLE_CODE.replace_all(&lowered, " ");
        let stripped_numeric = Self::strip_numeric_noise(&stripped_codes);
        let collapsed = WHITESPACE.replace_all(stripped_numeric.trim(), " ");
        TRAILING_PUNCT.replace(collapsed.trim(), "").trim().to_string()
    }

    fn root_word(&self, raw_name: &str) -> String {
        self.normalize(raw_name).split_whitespace().next().unwrap_or("").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_article_codes_and_dimensions() {
        let normalizer = RegexNameNormalizer::new();
        let result = normalizer.normalize("WBC00Z0002 Кабель ВВГ 3x2.5 120mm");
        assert_eq!(result, "кабель ввг");
    }

    #[test]
    fn is_idempotent() {
        let normalizer = RegexNameNormalizer::new();
        let once = normalizer.normalize("WBC00Z0002 Кабель ВВГ 3x2.5 120mm");
        let twice = normalizer.normalize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn root_word_is_the_leading_term() {
        let normalizer = RegexNameNormalizer::new();
        assert_eq!(normalizer.root_word("Кабель ВВГ 3x2.5"), "кабель");
    }

    #[test]
    fn empty_input_normalizes_to_empty() {
        let normalizer = RegexNameNormalizer::new();
        assert_eq!(normalizer.normalize(""), "");
    }
}
