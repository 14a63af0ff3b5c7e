//! Response quality scoring
//!
//! A lexical-diversity and structure heuristic, not a calibrated NLP metric:
//! the composite 0-100 score rewards concise responses, varied vocabulary,
//! and sentence structure. The constants (the 300-character efficiency knee,
//! the /1000 slope, the floor of 20, and the sub-score caps) are a fixed
//! contract for stored scores and are not re-derived.

use std::collections::HashSet;

use common::models::QualityMetrics;
use common::utils::round1;

/// Punctuation stripped from word edges before uniqueness counting
const EDGE_PUNCTUATION: &[char] = &[
    '.', ',', '!', '?', ';', ':', '(', ')', '[', ']', '{', '}', '"', '\'', '-',
];

/// Character count under which the efficiency sub-score stays at its cap
const EFFICIENCY_CAP_CHARS: usize = 300;

/// Scores response text
///
/// Empty or whitespace-only text yields all-zero metrics.
pub fn score(text: &str) -> QualityMetrics {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return QualityMetrics::zero();
    }

    let words: Vec<&str> = trimmed.split_whitespace().collect();
    let word_count = words.len();
    let char_count = trimmed.chars().count();

    let unique_words = words
        .iter()
        .map(|word| word.to_lowercase().trim_matches(EDGE_PUNCTUATION).to_string())
        .collect::<HashSet<_>>()
        .len();
    let unique_word_ratio = unique_words as f64 / word_count as f64;

    let avg_word_length =
        words.iter().map(|word| word.chars().count()).sum::<usize>() as f64 / word_count as f64;

    let sentence_count = trimmed
        .chars()
        .filter(|c| matches!(c, '.' | '!' | '?'))
        .count()
        .max(1);

    // Efficiency (cap 40): verbosity penalty with a floor of 20
    let efficiency = if char_count <= EFFICIENCY_CAP_CHARS {
        40.0
    } else {
        (40.0 - (char_count - EFFICIENCY_CAP_CHARS) as f64 / 1000.0 * 40.0).max(20.0)
    };

    // Diversity (cap 30): unique-word ratio
    let diversity = (unique_word_ratio * 60.0).min(30.0);

    // Structure (cap 30): sentence count
    let structure = (sentence_count as f64 / 3.0 * 30.0).min(30.0);

    QualityMetrics {
        char_count,
        word_count,
        unique_words,
        unique_word_ratio,
        avg_word_length,
        sentence_count,
        quality_score: round1(efficiency + diversity + structure),
    }
}
