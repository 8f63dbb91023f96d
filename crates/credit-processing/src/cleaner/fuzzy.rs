//! Token-based fuzzy string similarity.
//!
//! Scores are integers in `[0, 100]`. [`weighted_ratio`] blends a plain
//! similarity ratio with partial (best-window) and token-order-insensitive
//! variants, so `"engenheiro civil"` still lands on `"Engenheiro"` and
//! `"dados cientista"` on `"Cientista de Dados"`.
//!
//! All functions are pure; matching is deterministic and the first best
//! candidate wins.

use std::collections::BTreeSet;

const UNBASE_SCALE: f64 = 0.95;
const PARTIAL_SCALE: f64 = 0.90;
const LONG_PARTIAL_SCALE: f64 = 0.60;

/// Lowercase, turn every non-alphanumeric character into a space, trim.
pub fn preprocess(s: &str) -> String {
    let replaced: String = s
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    replaced.to_lowercase().trim().to_string()
}

/// Length of the longest common subsequence of two char slices.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

fn ratio_chars(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    200.0 * lcs_len(a, b) as f64 / total as f64
}

/// Normalized indel similarity: `2 * LCS / (|a| + |b|)`, scaled to 100.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio_chars(&a, &b)
}

/// Best [`ratio`] of the shorter string against every equally long window
/// of the longer one.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return 0.0;
    }

    let mut best = 0.0f64;
    for window in long.windows(short.len()) {
        let score = ratio_chars(&short, window);
        if score > best {
            best = score;
            if best >= 100.0 {
                break;
            }
        }
    }
    best
}

fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Ratio after sorting whitespace-separated tokens.
pub fn token_sort_ratio(a: &str, b: &str, partial: bool) -> f64 {
    let (sa, sb) = (sorted_tokens(a), sorted_tokens(b));
    if partial {
        partial_ratio(&sa, &sb)
    } else {
        ratio(&sa, &sb)
    }
}

/// Ratio over the token intersection plus each side's remainder.
pub fn token_set_ratio(a: &str, b: &str, partial: bool) -> f64 {
    let ta: BTreeSet<&str> = a.split_whitespace().collect();
    let tb: BTreeSet<&str> = b.split_whitespace().collect();

    let intersection = ta.intersection(&tb).copied().collect::<Vec<_>>().join(" ");
    let diff_ab = ta.difference(&tb).copied().collect::<Vec<_>>().join(" ");
    let diff_ba = tb.difference(&ta).copied().collect::<Vec<_>>().join(" ");

    let combined_ab = format!("{} {}", intersection, diff_ab).trim().to_string();
    let combined_ba = format!("{} {}", intersection, diff_ba).trim().to_string();

    let scorer = |x: &str, y: &str| {
        if partial {
            partial_ratio(x, y)
        } else {
            ratio(x, y)
        }
    };

    [
        scorer(&intersection, &combined_ab),
        scorer(&intersection, &combined_ba),
        scorer(&combined_ab, &combined_ba),
    ]
    .into_iter()
    .fold(0.0, f64::max)
}

/// Weighted blend of the ratios above, on preprocessed input.
///
/// Partial scorers only kick in when one string is at least 1.5x longer
/// than the other, and are discounted further beyond 8x.
pub fn weighted_ratio(a: &str, b: &str) -> u8 {
    let pa = preprocess(a);
    let pb = preprocess(b);
    if pa.is_empty() || pb.is_empty() {
        return 0;
    }

    let base = ratio(&pa, &pb);
    let (la, lb) = (pa.chars().count() as f64, pb.chars().count() as f64);
    let len_ratio = la.max(lb) / la.min(lb);

    let best = if len_ratio < 1.5 {
        let tsor = token_sort_ratio(&pa, &pb, false) * UNBASE_SCALE;
        let tser = token_set_ratio(&pa, &pb, false) * UNBASE_SCALE;
        base.max(tsor).max(tser)
    } else {
        let partial_scale = if len_ratio > 8.0 {
            LONG_PARTIAL_SCALE
        } else {
            PARTIAL_SCALE
        };
        let partial = partial_ratio(&pa, &pb) * partial_scale;
        let ptsor = token_sort_ratio(&pa, &pb, true) * UNBASE_SCALE * partial_scale;
        let ptser = token_set_ratio(&pa, &pb, true) * UNBASE_SCALE * partial_scale;
        base.max(partial).max(ptsor).max(ptser)
    };

    best.round().clamp(0.0, 100.0) as u8
}

/// Highest-scoring candidate for `query`; ties go to the earliest candidate.
///
/// Returns `None` only for an empty candidate list.
pub fn best_match<'a, S: AsRef<str>>(query: &str, candidates: &'a [S]) -> Option<(&'a str, u8)> {
    let mut best: Option<(&'a str, u8)> = None;
    for candidate in candidates {
        let candidate = candidate.as_ref();
        let score = weighted_ratio(query, candidate);
        if best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((candidate, score));
        }
    }
    best
}
