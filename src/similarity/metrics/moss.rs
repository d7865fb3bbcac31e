// src/similarity/metrics/moss.rs
//! Winnowing fingerprints over hashed keyword k-grams.
//!
//! Every run of `k` consecutive keywords is hashed; in every window of `w`
//! consecutive hashes the minimum (rightmost on ties) is selected. The
//! selected hashes form the fingerprint, and two fingerprints are compared
//! by Jaccard similarity.

use super::{Metric, Streams};
use crate::parse::SourceFile;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

pub const DEFAULT_K: usize = 3;
pub const DEFAULT_WINDOW: usize = 4;

#[derive(Debug, Clone, Copy)]
pub struct Moss {
    pub k: usize,
    pub window: usize,
}

impl Default for Moss {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            window: DEFAULT_WINDOW,
        }
    }
}

impl Metric for Moss {
    fn name(&self) -> &str {
        "moss"
    }

    fn distance(
        &self,
        a: &SourceFile,
        b: &SourceFile,
        template: Option<&SourceFile>,
        routine_a: Option<&str>,
        routine_b: Option<&str>,
    ) -> anyhow::Result<f64> {
        let s = Streams::of(a, b, template, routine_a, routine_b)?;
        let mut fa = self.fingerprint(s.a);
        let mut fb = self.fingerprint(s.b);
        if let Some(t) = s.template {
            let ft = self.fingerprint(t);
            fa.retain(|h| !ft.contains(h));
            fb.retain(|h| !ft.contains(h));
        }
        Ok(jaccard_distance(&fa, &fb))
    }
}

impl Moss {
    #[must_use]
    pub fn fingerprint(&self, stream: &[String]) -> BTreeSet<u64> {
        let hashes = kgram_hashes(stream, self.k.max(1));
        winnow(&hashes, self.window.max(1))
    }
}

/// Hash of each k-gram; a stream shorter than `k` is one gram.
fn kgram_hashes(stream: &[String], k: usize) -> Vec<u64> {
    if stream.is_empty() {
        return Vec::new();
    }
    if stream.len() < k {
        return vec![hash_gram(stream)];
    }
    stream.windows(k).map(hash_gram).collect()
}

fn hash_gram(gram: &[String]) -> u64 {
    let mut hasher = Sha256::new();
    for token in gram {
        hasher.update(token.as_bytes());
        hasher.update([0x1f]);
    }
    let digest = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head)
}

fn winnow(hashes: &[u64], window: usize) -> BTreeSet<u64> {
    if hashes.len() <= window {
        return hashes.iter().min().copied().into_iter().collect();
    }
    hashes
        .windows(window)
        .filter_map(|w| {
            w.iter()
                .enumerate()
                .min_by(|(i, x), (j, y)| x.cmp(y).then(j.cmp(i)))
                .map(|(_, h)| *h)
        })
        .collect()
}

/// `1 - |a ∩ b| / |a ∪ b|`; two empty sets are 1.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn jaccard_distance(a: &BTreeSet<u64>, b: &BTreeSet<u64>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 1.0;
    }
    let common = a.intersection(b).count();
    1.0 - common as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::super::tests::toks;
    use super::*;

    #[test]
    fn disjoint_vocabularies_share_nothing() {
        let m = Moss::default();
        let a = m.fingerprint(&toks("for if for if while for"));
        let b = m.fingerprint(&toks("and or not and or not"));
        assert!((jaccard_distance(&a, &b) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn identical_streams_match() {
        let m = Moss::default();
        let s = toks("for if foo bar while else break");
        assert!(jaccard_distance(&m.fingerprint(&s), &m.fingerprint(&s)).abs() < f64::EPSILON);
    }

    #[test]
    fn short_streams_still_fingerprint() {
        let m = Moss::default();
        assert_eq!(m.fingerprint(&toks("for")).len(), 1);
        assert!(m.fingerprint(&[]).is_empty());
    }

    #[test]
    fn winnow_takes_rightmost_minimum() {
        let picked = winnow(&[5, 1, 1, 7, 9, 3], 3);
        assert_eq!(picked.into_iter().collect::<Vec<_>>(), vec![1, 3]);
    }
}
