use serde::Deserialize;
use unicode_normalization::UnicodeNormalization;

// Strings shorter than this are too ambiguous for a purely relative cutoff.
const SHORT_TEXT_LEN: usize = 5;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SimilarityOptions {
    pub similarity_threshold: f32,
    pub short_distance_cap: usize,
}

impl Default for SimilarityOptions {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.2,
            short_distance_cap: 2,
        }
    }
}

pub fn normalize_for_compare(text: &str) -> String {
    text.nfkc()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

pub fn edit_distance(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}

pub fn normalized_distance(a: &str, b: &str) -> f32 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 0.0;
    }
    edit_distance(a, b) as f32 / max_len as f32
}

pub fn is_duplicate(a: &str, b: &str, opts: &SimilarityOptions) -> bool {
    let a = normalize_for_compare(a);
    let b = normalize_for_compare(b);
    if a == b {
        return true;
    }
    let short = a.chars().count() < SHORT_TEXT_LEN || b.chars().count() < SHORT_TEXT_LEN;
    if short && edit_distance(&a, &b) > opts.short_distance_cap {
        return false;
    }
    normalized_distance(&a, &b) <= opts.similarity_threshold
}
