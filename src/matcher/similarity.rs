//! String-similarity primitives used by the cache matcher and the fuzzy
//! anchor search. Both run on every keystroke, so they stay allocation-light.

use std::collections::HashSet;

/// Classic Levenshtein edit distance (insertion, deletion, substitution all
/// cost 1), computed over chars with a single rolling row.
pub fn levenshtein(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut row: Vec<usize> = (0..=b_chars.len()).collect();
    for (i, &ca) in a_chars.iter().enumerate() {
        let mut prev_diagonal = row[0];
        row[0] = i + 1;
        for (j, &cb) in b_chars.iter().enumerate() {
            let substitution = if ca == cb {
                prev_diagonal
            } else {
                prev_diagonal + 1
            };
            prev_diagonal = row[j + 1];
            row[j + 1] = substitution.min(row[j] + 1).min(row[j + 1] + 1);
        }
    }
    row[b_chars.len()]
}

/// Normalized similarity in [0, 1]: `1 - distance / max_len`.
pub fn levenshtein_similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / longest as f64
}

/// Trigram Jaccard similarity: pad each string with two leading and trailing
/// spaces, slide 3-char windows, and compute `|A ∩ B| / |A ∪ B|`.
pub fn trigram_similarity(a: &str, b: &str) -> f64 {
    let a_grams = trigrams(a);
    let b_grams = trigrams(b);
    let union = a_grams.union(&b_grams).count();
    if union == 0 {
        return 1.0;
    }
    let intersection = a_grams.intersection(&b_grams).count();
    intersection as f64 / union as f64
}

fn trigrams(s: &str) -> HashSet<[char; 3]> {
    let mut padded: Vec<char> = Vec::with_capacity(s.chars().count() + 4);
    padded.extend([' ', ' ']);
    padded.extend(s.chars());
    padded.extend([' ', ' ']);

    padded
        .windows(3)
        .map(|w| [w[0], w[1], w[2]])
        .collect()
}
