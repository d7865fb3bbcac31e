// src/similarity/metrics/jaro.rs
//! Jaro similarity over keyword sequences.

use super::{subtract_ordered, Metric, Streams};
use crate::parse::SourceFile;

pub struct Jaro;

impl Metric for Jaro {
    fn name(&self) -> &str {
        "jaro"
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
        Ok(match s.template {
            Some(t) => distance(&subtract_ordered(s.a, t), &subtract_ordered(s.b, t)),
            None => distance(s.a, s.b),
        })
    }
}

/// `1 - jaro(a, b)`; two empty sequences are 1.
#[must_use]
pub fn distance(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    1.0 - similarity(a, b)
}

/// Keyword sequence viewed as something `strsim` can iterate by reference.
struct Tokens<'a>(&'a [String]);

impl<'a> IntoIterator for &Tokens<'a> {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[must_use]
pub fn similarity(a: &[String], b: &[String]) -> f64 {
    strsim::generic_jaro(&Tokens(a), &Tokens(b))
}

#[cfg(test)]
mod tests {
    use super::super::tests::toks;
    use super::*;

    #[test]
    fn self_distance_is_zero() {
        let s = toks("for if foo for bar while");
        assert!(distance(&s, &s).abs() < f64::EPSILON);
    }

    #[test]
    fn classic_martha_example() {
        let a: Vec<String> = "MARTHA".chars().map(String::from).collect();
        let b: Vec<String> = "MARHTA".chars().map(String::from).collect();
        assert!((similarity(&a, &b) - 0.944_444).abs() < 1e-5);
    }

    #[test]
    fn rotation_counts_transpositions() {
        let s = similarity(&toks("x y z w"), &toks("y z w x"));
        assert!((s - 0.833_333).abs() < 1e-5);
    }

    #[test]
    fn disjoint_is_one() {
        assert!((distance(&toks("for if"), &toks("while else")) - 1.0).abs() < f64::EPSILON);
        assert!((distance(&toks("for"), &[]) - 1.0).abs() < f64::EPSILON);
    }
}
