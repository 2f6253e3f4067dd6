//! Scorer traits and the built-in scorers the registry can construct.
//!
//! Four seams, one per scorer kind:
//!   1. `MentionEntityMeasure` — compares a mention's surroundings to an entity
//!   2. `EntitiesContext`      — precomputed per-entity term vectors a measure reads
//!   3. `EntityEntitySimilarity` — coherence between two candidates
//!   4. `EntityImportance`     — prior-independent salience of one candidate
//!
//! All scorers are pure over the candidate collection they were built with.

pub mod contexts;
pub mod entity_entity;
pub mod importance;
pub mod measures;

use std::collections::{BTreeSet, HashMap};

use crate::context::ContextSettings;
use crate::entities::{Entity, MentionContext};

pub use entity_entity::EntityEntityKind;

/// Term → weight.
pub type TermVector = HashMap<String, f64>;

/// Construction-time options of a mention-entity measure, taken from the tuple flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeasureOptions {
    /// Weight context tokens by their distance to the mention.
    pub use_distance_discount: bool,
}

pub trait MentionEntityMeasure: Send + Sync {
    fn name(&self) -> &str;

    fn uses_distance_discount(&self) -> bool;

    /// Similarity of `mention` and `entity` in [0, 1], using the entity terms
    /// precomputed by `context`.
    fn similarity(
        &self,
        mention: &MentionContext,
        entity: &Entity,
        context: &dyn EntitiesContext,
    ) -> f64;
}

pub trait EntitiesContext: Send + Sync {
    fn name(&self) -> &str;

    fn settings(&self) -> &ContextSettings;

    /// Precomputed terms of a candidate; `None` for entities outside the collection.
    fn entity_terms(&self, entity: &str) -> Option<&TermVector>;

    /// Terms of the mention surroundings comparable with `entity_terms`, each
    /// with its token distance to the mention.
    fn mention_terms(&self, mention: &MentionContext) -> Vec<(String, usize)>;
}

pub trait EntityEntitySimilarity: Send + Sync {
    fn kind(&self) -> EntityEntityKind;

    /// Relatedness of two candidates in [0, 1]. Unknown names score 0.
    fn similarity(&self, a: &str, b: &str) -> f64;
}

pub trait EntityImportance: Send + Sync {
    fn name(&self) -> &str;

    /// Salience of a candidate in [0, 1]. Unknown names score 0.
    fn importance(&self, entity: &str) -> f64;
}

// ---------------------------------------------------------------------------
// Shared vector arithmetic
// ---------------------------------------------------------------------------

pub fn cosine(a: &TermVector, b: &TermVector) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let dot: f64 = small
        .iter()
        .filter_map(|(term, wa)| large.get(term).map(|wb| wa * wb))
        .sum();
    let norm_a = a.values().map(|w| w * w).sum::<f64>().sqrt();
    let norm_b = b.values().map(|w| w * w).sum::<f64>().sqrt();
    if norm_a <= f64::EPSILON || norm_b <= f64::EPSILON {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}

/// Sum of minimum weights over sum of maximum weights.
pub fn weighted_jaccard(a: &TermVector, b: &TermVector) -> f64 {
    let mut min_sum = 0.0;
    let mut max_sum = 0.0;
    for (term, &wa) in a {
        let wb = b.get(term).copied().unwrap_or(0.0);
        min_sum += wa.min(wb);
        max_sum += wa.max(wb);
    }
    for (term, &wb) in b {
        if !a.contains_key(term) {
            max_sum += wb;
        }
    }
    if max_sum <= f64::EPSILON {
        return 0.0;
    }
    (min_sum / max_sum).clamp(0.0, 1.0)
}

pub fn jaccard<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Relatedness from the normalized Google distance of two overlapping sets,
/// given the set sizes, their overlap and the collection size (all as masses).
///
/// Returns 0.0 when there is no overlap, or when the collection is no larger
/// than the smaller set (the distance is undefined there).
pub fn ngd_relatedness(size_a: f64, size_b: f64, overlap: f64, collection: f64) -> f64 {
    if overlap <= 0.0 || size_a <= 0.0 || size_b <= 0.0 {
        return 0.0;
    }
    let max = size_a.max(size_b).ln();
    let min = size_a.min(size_b).ln();
    let denominator = collection.ln() - min;
    if denominator <= f64::EPSILON {
        return 0.0;
    }
    (1.0 - (max - overlap.ln()) / denominator).clamp(0.0, 1.0)
}

/// Divide every weight by the largest one.
pub fn normalize_by_max(vector: &mut TermVector) {
    let max = vector.values().cloned().fold(0.0_f64, f64::max);
    if max > f64::EPSILON {
        for w in vector.values_mut() {
            *w /= max;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(pairs: &[(&str, f64)]) -> TermVector {
        pairs.iter().map(|(t, w)| (t.to_string(), *w)).collect()
    }

    #[test]
    fn test_cosine_identical_and_disjoint() {
        let a = vector(&[("led", 1.0), ("zeppelin", 2.0)]);
        let b = vector(&[("jazz", 1.0)]);
        assert!((cosine(&a, &a) - 1.0).abs() < 1e-10);
        assert_eq!(cosine(&a, &b), 0.0);
        assert_eq!(cosine(&a, &TermVector::new()), 0.0);
    }

    #[test]
    fn test_weighted_jaccard() {
        let a = vector(&[("x", 1.0), ("y", 1.0)]);
        let b = vector(&[("y", 0.5), ("z", 1.0)]);
        // min: y=0.5 ; max: x=1 + y=1 + z=1
        assert!((weighted_jaccard(&a, &b) - 0.5 / 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_jaccard_sets() {
        let a: BTreeSet<u32> = [1, 2, 3].into_iter().collect();
        let b: BTreeSet<u32> = [2, 3, 4].into_iter().collect();
        assert!((jaccard(&a, &b) - 0.5).abs() < 1e-10);
        assert_eq!(jaccard(&BTreeSet::<u32>::new(), &BTreeSet::new()), 0.0);
    }

    #[test]
    fn test_ngd_relatedness_bounds() {
        assert_eq!(ngd_relatedness(10.0, 10.0, 0.0, 1000.0), 0.0);
        assert!((ngd_relatedness(10.0, 10.0, 10.0, 1000.0) - 1.0).abs() < 1e-10);
        let partial = ngd_relatedness(10.0, 20.0, 5.0, 1000.0);
        assert!(partial > 0.0 && partial < 1.0, "partial was {}", partial);
    }

    #[test]
    fn test_ngd_relatedness_collection_not_larger_than_sets() {
        assert_eq!(ngd_relatedness(100.0, 101.0, 1.0, 100.0), 0.0);
        assert_eq!(ngd_relatedness(100.0, 100.0, 100.0, 50.0), 0.0);
    }

    #[test]
    fn test_normalize_by_max() {
        let mut v = vector(&[("a", 2.0), ("b", 4.0)]);
        normalize_by_max(&mut v);
        assert_eq!(v["a"], 0.5);
        assert_eq!(v["b"], 1.0);
    }
}
