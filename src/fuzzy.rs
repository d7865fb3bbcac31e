// src/fuzzy.rs
//! Fuzzy filename scoring on a 0-100 scale.
//!
//! The score is the Ratcliff/Obershelp ratio `2*M / (|a| + |b|)` where `M`
//! counts characters in matching blocks, found by repeatedly taking the
//! longest common substring and recursing on both sides of it.

/// Scores `a` against `b`, ignoring ASCII case. Equal strings score 100.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 100;
    }
    let matched = matching_chars(&a, &b);
    (200.0 * matched as f64 / total as f64).round() as u8
}

/// Best-scoring candidate for `name`, ties going to the earliest candidate.
#[must_use]
pub fn best_match<'a, I>(name: &str, candidates: I) -> Option<(&'a str, u8)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(&'a str, u8)> = None;
    for candidate in candidates {
        let score = ratio(name, candidate);
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((candidate, score));
        }
    }
    best
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut total = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, k) = longest_match(a, b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        total += k;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            queue.push((i + k, ahi, j + k, bhi));
        }
    }
    total
}

/// Longest common block within the given windows; earliest in `a` wins,
/// then earliest in `b`.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0);
    // lengths[j] = length of the match ending at a[i-1], b[j-1]
    let mut prev = vec![0usize; bhi - blo + 1];
    for i in alo..ahi {
        let mut cur = vec![0usize; bhi - blo + 1];
        for j in blo..bhi {
            if a[i] == b[j] {
                let k = prev[j - blo] + 1;
                cur[j - blo + 1] = k;
                if k > best_k {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_k = k;
                }
            }
        }
        prev = cur;
    }
    (best_i, best_j, best_k)
}
