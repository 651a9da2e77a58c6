// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Concrete implementations of the algorithmic text toolkit
//! (`spec.md` §4.4): Unicode tokenizer with a stop-word list, a cached
//! stemmer over `rust-stemmers`, Soundex/Metaphone-family phonetic
//! codes, and the hybrid similarity scorer combining `strsim`'s
//! Jaro-Winkler with LCS/phonetic/n-gram/Jaccard terms.

use dashmap::DashMap;
use rust_stemmers::{Algorithm, Stemmer as RustStemmer};
use std::collections::HashSet;
use unicode_segmentation::UnicodeSegmentation;

use normalizer_domain::services::text_toolkit::{
    EditDistances, HybridScorer, HybridWeights, NGramSet, PhoneticCodes, PhoneticEncoder, Stemmer, Tokenizer,
};

const STOP_WORDS: &[&str] = &[
    "и", "в", "на", "с", "для", "по", "от", "до", "из", "не", "the", "a", "an", "of", "to", "for", "and", "or",
];

pub struct UnicodeTokenizer;

impl UnicodeTokenizer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for UnicodeTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer for UnicodeTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.unicode_words()
            .map(|w| w.to_lowercase())
            .filter(|w| !STOP_WORDS.contains(&w.as_str()))
            .collect()
    }
}

/// Wraps `rust_stemmers`'s Snowball stemmer with a [`DashMap`] cache,
/// since `spec.md` §4.4 requires stemming be "cached by input word."
pub struct SnowballStemmer {
    inner: RustStemmer,
    cache: DashMap<String, String>,
}

impl SnowballStemmer {
    pub fn new(algorithm: Algorithm) -> Self {
        Self { inner: RustStemmer::create(algorithm), cache: DashMap::new() }
    }

    pub fn russian() -> Self {
        Self::new(Algorithm::Russian)
    }
}

impl Stemmer for SnowballStemmer {
    fn stem(&self, word: &str) -> String {
        if let Some(cached) = self.cache.get(word) {
            return cached.clone();
        }
        let stemmed = self.inner.stem(word).to_string();
        self.cache.insert(word.to_string(), stemmed.clone());
        stemmed
    }
}

/// Soundex (Latin/Cyrillic-tuned) and a Metaphone-family approximation.
/// Both reduce to consonant-class skeletons so perceptually similar
/// words collide (`spec.md` §4.4).
pub struct StandardPhoneticEncoder;

impl StandardPhoneticEncoder {
    pub fn new() -> Self {
        Self
    }

    fn consonant_class(c: char) -> Option<char> {
        match c.to_ascii_lowercase() {
            'b' | 'f' | 'p' | 'v' | 'б' | 'ф' | 'п' | 'в' => Some('1'),
            'c' | 'g' | 'j' | 'k' | 'q' | 's' | 'x' | 'z' | 'с' | 'з' | 'к' | 'г' | 'ц' => Some('2'),
            'd' | 't' | 'д' | 'т' => Some('3'),
            'l' | 'л' => Some('4'),
            'm' | 'n' | 'м' | 'н' => Some('5'),
            'r' | 'р' => Some('6'),
            _ => None,
        }
    }

    fn soundex(word: &str) -> String {
        let chars: Vec<char> = word.chars().collect();
        if chars.is_empty() {
            return String::new();
        }
        let mut code = String::new();
        code.push(chars[0].to_ascii_uppercase());
        let mut last_class = Self::consonant_class(chars[0]);
        for &c in &chars[1..] {
            let class = Self::consonant_class(c);
            if let Some(digit) = class {
                if class != last_class {
                    code.push(digit);
                }
            }
            last_class = class;
            if code.len() >= 4 {
                break;
            }
        }
        while code.len() < 4 {
            code.push('0');
        }
        code
    }

    /// Metaphone-family approximation: strips vowels after the first
    /// letter and folds voiced/unvoiced consonant pairs together.
    fn metaphone(word: &str) -> String {
        let lowered = word.to_lowercase();
        let mut out = String::new();
        for (i, c) in lowered.chars().enumerate() {
            let is_vowel = matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'а' | 'е' | 'и' | 'о' | 'у' | 'ы' | 'э' | 'ю' | 'я');
            if i == 0 || !is_vowel {
                let folded = match c {
                    'b' | 'p' | 'б' | 'п' => 'p',
                    'd' | 't' | 'д' | 'т' => 't',
                    'g' | 'k' | 'г' | 'к' => 'k',
                    'v' | 'f' | 'в' | 'ф' => 'f',
                    'z' | 's' | 'з' | 'с' => 's',
                    other => other,
                };
                out.push(folded);
            }
        }
        out
    }
}

impl Default for StandardPhoneticEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PhoneticEncoder for StandardPhoneticEncoder {
    fn encode(&self, word: &str) -> PhoneticCodes {
        PhoneticCodes { soundex: Self::soundex(word), metaphone: Self::metaphone(word) }
    }
}

/// `strsim`-backed edit distances plus a hand-rolled weighted variant
/// (`strsim` has no per-operation-cost API) and Damerau-Levenshtein
/// (transpositions) via a dynamic-programming table.
pub struct StrsimEditDistances;

impl StrsimEditDistances {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StrsimEditDistances {
    fn default() -> Self {
        Self::new()
    }
}

impl EditDistances for StrsimEditDistances {
    fn levenshtein(&self, a: &str, b: &str) -> usize {
        strsim::levenshtein(a, b)
    }

    fn damerau_levenshtein(&self, a: &str, b: &str) -> usize {
        strsim::damerau_levenshtein(a, b)
    }

    fn weighted(&self, a: &str, b: &str, insert_cost: f64, delete_cost: f64, substitute_cost: f64) -> f64 {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        let mut row: Vec<f64> = (0..=b.len()).map(|j| j as f64 * insert_cost).collect();

        for i in 1..=a.len() {
            let mut prev_diag = row[0];
            row[0] = i as f64 * delete_cost;
            for j in 1..=b.len() {
                let above = row[j];
                let cost = if a[i - 1] == b[j - 1] { 0.0 } else { substitute_cost };
                let candidate = (prev_diag + cost).min(above + delete_cost).min(row[j - 1] + insert_cost);
                prev_diag = above;
                row[j] = candidate;
            }
        }
        row[b.len()]
    }

    fn jaro_winkler(&self, a: &str, b: &str) -> f64 {
        strsim::jaro_winkler(a, b)
    }

    fn lcs_ratio(&self, a: &str, b: &str) -> f64 {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        if a.is_empty() && b.is_empty() {
            return 1.0;
        }
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }

        let mut table = vec![vec![0usize; b.len() + 1]; a.len() + 1];
        for i in 1..=a.len() {
            for j in 1..=b.len() {
                table[i][j] =
                    if a[i - 1] == b[j - 1] { table[i - 1][j - 1] + 1 } else { table[i - 1][j].max(table[i][j - 1]) };
            }
        }
        let lcs_len = table[a.len()][b.len()] as f64;
        (2.0 * lcs_len) / (a.len() + b.len()) as f64
    }
}

/// Hybrid scorer combining Jaro-Winkler, LCS ratio, phonetic agreement,
/// trigram Jaccard, and (separately) TF-IDF cosine (`spec.md` §4.4).
pub struct WeightedHybridScorer {
    distances: StrsimEditDistances,
    phonetics: StandardPhoneticEncoder,
}

impl WeightedHybridScorer {
    pub fn new() -> Self {
        Self { distances: StrsimEditDistances::new(), phonetics: StandardPhoneticEncoder::new() }
    }

    fn phonetic_score(&self, a: &str, b: &str) -> f64 {
        let codes_a = self.phonetics.encode(a);
        let codes_b = self.phonetics.encode(b);
        let soundex_match = (codes_a.soundex == codes_b.soundex) as u8 as f64;
        let metaphone_match = (codes_a.metaphone == codes_b.metaphone) as u8 as f64;
        (soundex_match + metaphone_match) / 2.0
    }

    fn ngram_score(&self, a: &str, b: &str) -> f64 {
        NGramSet::jaccard(&NGramSet::trigrams(a), &NGramSet::trigrams(b))
    }
}

impl Default for WeightedHybridScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl HybridScorer for WeightedHybridScorer {
    fn score(&self, a: &str, b: &str, weights: HybridWeights) -> f64 {
        let jaro_winkler = self.distances.jaro_winkler(a, b);
        let lcs = self.distances.lcs_ratio(a, b);
        let phonetic = self.phonetic_score(a, b);
        let ngram = self.ngram_score(a, b);
        let a_tokens: HashSet<String> = a.split_whitespace().map(str::to_lowercase).collect();
        let b_tokens: HashSet<String> = b.split_whitespace().map(str::to_lowercase).collect();
        let jaccard = NGramSet::jaccard(&a_tokens, &b_tokens);

        weights.jaro_winkler * jaro_winkler
            + weights.lcs * lcs
            + weights.phonetic * phonetic
            + weights.ngram * ngram
            + weights.jaccard * jaccard
    }

    fn cosine_tfidf(&self, a: &str, b: &str, corpus: &[String]) -> f64 {
        let tokenizer = UnicodeTokenizer::new();
        let a_tokens = tokenizer.tokenize(a);
        let b_tokens = tokenizer.tokenize(b);

        let doc_count = corpus.len().max(1) as f64;
        let idf = |term: &str| -> f64 {
            let containing = corpus.iter().filter(|doc| doc.to_lowercase().contains(term)).count() as f64;
            ((doc_count + 1.0) / (containing + 1.0)).ln() + 1.0
        };

        let vectorize = |tokens: &[String]| -> std::collections::HashMap<String, f64> {
            let mut tf: std::collections::HashMap<String, f64> = std::collections::HashMap::new();
            for token in tokens {
                *tf.entry(token.clone()).or_insert(0.0) += 1.0;
            }
            let total = tokens.len().max(1) as f64;
            tf.into_iter().map(|(term, count)| (term.clone(), (count / total) * idf(&term))).collect()
        };

        let vec_a = vectorize(&a_tokens);
        let vec_b = vectorize(&b_tokens);

        let dot: f64 = vec_a.iter().map(|(term, weight)| weight * vec_b.get(term).copied().unwrap_or(0.0)).sum();
        let norm_a = vec_a.values().map(|w| w * w).sum::<f64>().sqrt();
        let norm_b = vec_b.values().map(|w| w * w).sum::<f64>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            0.0
        } else {
            (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizer_strips_stop_words() {
        let tokenizer = UnicodeTokenizer::new();
        assert_eq!(tokenizer.tokenize("the cable and wire"), vec!["cable", "wire"]);
    }

    #[test]
    fn stemmer_caches_repeated_words() {
        let stemmer = SnowballStemmer::russian();
        let first = stemmer.stem("кабелей");
        let second = stemmer.stem("кабелей");
        assert_eq!(first, second);
    }

    #[test]
    fn soundex_groups_similar_words() {
        let encoder = StandardPhoneticEncoder::new();
        assert_eq!(encoder.encode("smith").soundex, encoder.encode("smyth").soundex);
    }

    #[test]
    fn levenshtein_identity_is_zero() {
        let distances = StrsimEditDistances::new();
        assert_eq!(distances.levenshtein("кабель", "кабель"), 0);
    }

    #[test]
    fn lcs_ratio_is_symmetric_and_bounded() {
        let distances = StrsimEditDistances::new();
        let ab = distances.lcs_ratio("кабель", "кабели");
        let ba = distances.lcs_ratio("кабели", "кабель");
        assert_eq!(ab, ba);
        assert!((0.0..=1.0).contains(&ab));
    }

    #[test]
    fn hybrid_score_of_identical_strings_is_one() {
        let scorer = WeightedHybridScorer::new();
        let score = scorer.score("кабель ввг", "кабель ввг", HybridWeights::default());
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_tfidf_identity_is_one() {
        let scorer = WeightedHybridScorer::new();
        let corpus = vec!["кабель ввг".to_string(), "провод шввп".to_string()];
        let score = scorer.cosine_tfidf("кабель ввг", "кабель ввг", &corpus);
        assert!((score - 1.0).abs() < 1e-9);
    }
}
