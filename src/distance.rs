//! Levenshtein edit distance
//!
//! Unit costs for insertion, deletion and substitution. Works over any
//! sequence of comparable units so the same table serves character and
//! word level metrics.

/// Minimum number of single-unit edits turning `a` into `b`
///
/// Fills the complete (len(a)+1) x (len(b)+1) table, stored row-major in a
/// single allocation.
pub fn edit_distance<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let cols = b.len() + 1;
    let mut dp = vec![0usize; (a.len() + 1) * cols];

    for i in 0..=a.len() {
        dp[i * cols] = i;
    }
    for j in 0..=b.len() {
        dp[j] = j;
    }

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let substitution_cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };

            let deletion = dp[(i - 1) * cols + j] + 1;
            let insertion = dp[i * cols + j - 1] + 1;
            let substitution = dp[(i - 1) * cols + j - 1] + substitution_cost;

            dp[i * cols + j] = deletion.min(insertion).min(substitution);
        }
    }

    dp[a.len() * cols + b.len()]
}

/// Edit distance over Unicode scalar values
pub fn char_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    edit_distance(&a, &b)
}

/// Edit distance over whitespace-separated tokens
pub fn word_distance(a: &str, b: &str) -> usize {
    let a: Vec<&str> = a.split_whitespace().collect();
    let b: Vec<&str> = b.split_whitespace().collect();
    edit_distance(&a, &b)
}
