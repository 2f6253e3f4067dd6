/// Entity-entity similarities: a closed set of kinds, each built directly from
/// the candidate collection (no registry lookup).
///
/// Link-based kinds read the inlink sets; keyphrase-based kinds read the
/// keyphrases selected by the entity-entity `ContextSettings` (source weights,
/// cutoffs, optional normalization by the per-entity maximum).

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::context::ContextSettings;
use crate::entities::Entities;
use crate::tracer::{TraceEvent, Tracer};
use super::{
    cosine, jaccard, ngd_relatedness, normalize_by_max, weighted_jaccard, EntityEntitySimilarity,
    TermVector,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityEntityKind {
    MilneWitten,
    InlinkOverlap,
    KeyphraseBasedNgd,
    WeightedKeyphraseBasedNgd,
    JaccardKeyword,
    WeightedJaccardKeyphrase,
    KeyphraseBased,
    Kore,
    TopKeyphraseBased,
}

impl EntityEntityKind {
    pub const ALL: [EntityEntityKind; 9] = [
        EntityEntityKind::MilneWitten,
        EntityEntityKind::InlinkOverlap,
        EntityEntityKind::KeyphraseBasedNgd,
        EntityEntityKind::WeightedKeyphraseBasedNgd,
        EntityEntityKind::JaccardKeyword,
        EntityEntityKind::WeightedJaccardKeyphrase,
        EntityEntityKind::KeyphraseBased,
        EntityEntityKind::Kore,
        EntityEntityKind::TopKeyphraseBased,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityEntityKind::MilneWitten => "MilneWittenEntityEntitySimilarity",
            EntityEntityKind::InlinkOverlap => "InlinkOverlapEntityEntitySimilarity",
            EntityEntityKind::KeyphraseBasedNgd => "KeyphraseBasedNGDEntityEntitySimilarity",
            EntityEntityKind::WeightedKeyphraseBasedNgd => "WeightedKeyphraseBasedNGDEntityEntitySimilarity",
            EntityEntityKind::JaccardKeyword => "JaccardKeywordEntityEntitySimilarity",
            EntityEntityKind::WeightedJaccardKeyphrase => "WeightedJaccardKeyphraseEntityEntitySimilarity",
            EntityEntityKind::KeyphraseBased => "KeyphraseBasedEntityEntitySimilarity",
            EntityEntityKind::Kore => "KOREEntityEntitySimilarity",
            EntityEntityKind::TopKeyphraseBased => "TopKeyphraseBasedEntityEntitySimilarity",
        }
    }

    /// Whether the kind reads keyphrases (and therefore the context settings).
    pub fn is_keyphrase_based(&self) -> bool {
        !matches!(self, EntityEntityKind::MilneWitten | EntityEntityKind::InlinkOverlap)
    }

    /// Construct the similarity for one document's candidates.
    ///
    /// `top_keyphrases` only matters for `TopKeyphraseBased`.
    pub fn build(
        self,
        entities: Arc<Entities>,
        settings: &ContextSettings,
        top_keyphrases: usize,
        tracer: Arc<dyn Tracer>,
    ) -> Box<dyn EntityEntitySimilarity> {
        tracer.record(TraceEvent::new(
            self.as_str(),
            format!("constructed over {} candidates", entities.len()),
        ));
        if self.is_keyphrase_based() {
            let limit = match self {
                EntityEntityKind::TopKeyphraseBased => Some(top_keyphrases),
                _ => None,
            };
            Box::new(KeyphraseRelatedness::build(self, &entities, settings, limit))
        } else {
            Box::new(InlinkRelatedness {
                kind: self,
                collection: entities.collection_size() as f64,
                entities,
            })
        }
    }
}

impl fmt::Display for EntityEntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityEntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityEntityKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown entity-entity similarity: {}", s))
    }
}

// ---------------------------------------------------------------------------
// Link-based
// ---------------------------------------------------------------------------

pub struct InlinkRelatedness {
    kind: EntityEntityKind,
    entities: Arc<Entities>,
    collection: f64,
}

impl EntityEntitySimilarity for InlinkRelatedness {
    fn kind(&self) -> EntityEntityKind {
        self.kind
    }

    fn similarity(&self, a: &str, b: &str) -> f64 {
        let (Some(ea), Some(eb)) = (self.entities.get(a), self.entities.get(b)) else {
            return 0.0;
        };
        match self.kind {
            EntityEntityKind::InlinkOverlap => jaccard(&ea.inlinks, &eb.inlinks),
            _ => {
                let overlap = ea.inlinks.intersection(&eb.inlinks).count() as f64;
                ngd_relatedness(
                    ea.inlinks.len() as f64,
                    eb.inlinks.len() as f64,
                    overlap,
                    self.collection,
                )
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Keyphrase-based
// ---------------------------------------------------------------------------

pub struct KeyphraseRelatedness {
    kind: EntityEntityKind,
    vectors: HashMap<String, TermVector>,
    /// Collection size for phrase-count NGD: the knowledge-base size, but never
    /// less than the number of distinct keyphrases among the candidates.
    phrase_collection: f64,
    /// Summed keyphrase weight over all candidates.
    total_mass: f64,
}

impl KeyphraseRelatedness {
    fn build(
        kind: EntityEntityKind,
        entities: &Entities,
        settings: &ContextSettings,
        limit: Option<usize>,
    ) -> Self {
        let mut vectors = HashMap::with_capacity(entities.len());
        let mut distinct = BTreeSet::new();
        let mut total_mass = 0.0;

        for entity in entities.iter() {
            let mut selected = settings.select_keyphrases(entity);
            if let Some(k) = limit {
                selected.truncate(k);
            }
            let mut vector = TermVector::new();
            for (keyphrase, weight) in selected {
                let text = keyphrase.words().collect::<Vec<_>>().join(" ");
                if text.is_empty() {
                    continue;
                }
                let entry = vector.entry(text).or_insert(0.0);
                *entry = entry.max(weight);
            }
            if settings.normalize_weights() {
                normalize_by_max(&mut vector);
            }
            total_mass += vector.values().sum::<f64>();
            distinct.extend(vector.keys().cloned());
            vectors.insert(entity.name.clone(), vector);
        }

        KeyphraseRelatedness {
            kind,
            vectors,
            phrase_collection: (entities.collection_size() as f64).max(distinct.len() as f64),
            total_mass,
        }
    }
}

impl EntityEntitySimilarity for KeyphraseRelatedness {
    fn kind(&self) -> EntityEntityKind {
        self.kind
    }

    fn similarity(&self, a: &str, b: &str) -> f64 {
        let (Some(va), Some(vb)) = (self.vectors.get(a), self.vectors.get(b)) else {
            return 0.0;
        };
        match self.kind {
            EntityEntityKind::JaccardKeyword => jaccard(&keywords(va), &keywords(vb)),
            EntityEntityKind::WeightedJaccardKeyphrase => weighted_jaccard(va, vb),
            EntityEntityKind::KeyphraseBasedNgd => {
                let overlap = va.keys().filter(|k| vb.contains_key(*k)).count() as f64;
                ngd_relatedness(va.len() as f64, vb.len() as f64, overlap, self.phrase_collection)
            }
            EntityEntityKind::WeightedKeyphraseBasedNgd => {
                let overlap: f64 = va
                    .iter()
                    .filter_map(|(k, wa)| vb.get(k).map(|wb| wa.min(*wb)))
                    .sum();
                ngd_relatedness(
                    va.values().sum(),
                    vb.values().sum(),
                    overlap,
                    self.total_mass,
                )
            }
            EntityEntityKind::Kore => (phrase_overlap(va, vb) + phrase_overlap(vb, va)) / 2.0,
            _ => cosine(va, vb),
        }
    }
}

fn keywords(vector: &TermVector) -> BTreeSet<&str> {
    vector.keys().flat_map(|k| k.split_whitespace()).collect()
}

/// For every phrase of `from`, the best squared word overlap with a phrase of
/// `to`, scaled by the lighter of the two weights; normalised by `from`'s mass.
fn phrase_overlap(from: &TermVector, to: &TermVector) -> f64 {
    let mass: f64 = from.values().sum();
    if mass <= f64::EPSILON {
        return 0.0;
    }
    let to_words: Vec<(BTreeSet<&str>, f64)> = to
        .iter()
        .map(|(phrase, w)| (phrase.split_whitespace().collect(), *w))
        .collect();

    let mut sum = 0.0;
    for (phrase, &wp) in from {
        let words: BTreeSet<&str> = phrase.split_whitespace().collect();
        let best = to_words
            .iter()
            .map(|(other, wq)| {
                let po = jaccard(&words, other);
                po * po * wp.min(*wq)
            })
            .fold(0.0_f64, f64::max);
        sum += best;
    }
    (sum / mass).clamp(0.0, 1.0)
}
