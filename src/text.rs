//! Food label normalization shared by track label matching and table retrieval.

use std::collections::BTreeSet;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "of", "the", "with", "in", "on", "or", "to", "for", "raw", "fresh",
];

/// Lowercase, strip punctuation and collapse whitespace.
///
/// `"Chicken, Breast (grilled)"` becomes `"chicken breast grilled"`.
pub fn normalize_label(label: &str) -> String {
    label
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalized, order-independent token set used for similarity scoring.
pub fn tokens(label: &str) -> BTreeSet<String> {
    normalize_label(label)
        .split(' ')
        .filter(|t| !t.is_empty() && !STOPWORDS.contains(t))
        .map(fold_plural)
        .collect()
}

fn fold_plural(token: &str) -> String {
    if token.len() > 4 && token.ends_with("ies") {
        return format!("{}y", &token[..token.len() - 3]);
    }
    if token.len() > 4 && (token.ends_with("oes") || token.ends_with("ches")) {
        return token[..token.len() - 2].to_string();
    }
    if token.len() > 3 && token.ends_with('s') && !token.ends_with("ss") {
        return token[..token.len() - 1].to_string();
    }
    token.to_string()
}

/// Jaccard similarity of two token sets, in [0, 1].
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let inter = a.intersection(b).count();
    let union = a.len() + b.len() - inter;
    inter as f32 / union as f32
}

/// Similarity of two free-form labels, in [0, 1].
pub fn label_similarity(a: &str, b: &str) -> f32 {
    jaccard(&tokens(a), &tokens(b))
}
