/// Context settings handed to every similarity that needs shared statistics.
///
/// Built fresh from `EnsembleSettings` for each construction call. Mention-entity
/// contexts carry the mention-entity keyphrase source weights; entity-entity
/// contexts carry the entity-entity source weights and the normalization flag,
/// which only makes sense when aggregating entity-entity signals.

use std::collections::HashMap;

use serde::Serialize;

use crate::entities::{Entity, Keyphrase};
use crate::settings::{EnsembleSettings, KeyphraseSourceWeight, LshParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ContextKind {
    MentionEntity,
    EntityEntity,
}

/// The discriminator-specific part of `ContextSettings`.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextScope {
    MentionEntity {
        source_weights: HashMap<String, f64>,
    },
    EntityEntity {
        normalize_weights: bool,
        source_weights: HashMap<String, f64>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContextSettings {
    pub keyphrase_alpha: f64,
    pub keyword_alpha: f64,
    pub use_confusable_mi_weights: bool,
    pub average_weights: bool,
    pub n_gram_length: usize,
    pub lsh: LshParams,
    pub minimum_keyphrase_weight: f64,
    /// 0 means unbounded.
    pub max_keyphrase_count: usize,
    pub scope: ContextScope,
}

impl ContextSettings {
    pub fn for_kind(settings: &EnsembleSettings, kind: ContextKind) -> Self {
        let scope = match kind {
            ContextKind::MentionEntity => ContextScope::MentionEntity {
                source_weights: source_weight_map(settings.mention_entity_source_weights()),
            },
            ContextKind::EntityEntity => ContextScope::EntityEntity {
                normalize_weights: settings.normalize_coherence_weights(),
                source_weights: source_weight_map(settings.entity_entity_source_weights()),
            },
        };

        ContextSettings {
            keyphrase_alpha: settings.keyphrase_alpha(),
            keyword_alpha: settings.keyword_alpha(),
            use_confusable_mi_weights: settings.use_confusable_mi_weights(),
            average_weights: settings.average_coherence_weights(),
            n_gram_length: settings.n_gram_length(),
            lsh: settings.lsh().clone(),
            minimum_keyphrase_weight: settings.minimum_entity_keyphrase_weight(),
            max_keyphrase_count: settings.max_entity_keyphrase_count(),
            scope,
        }
    }

    pub fn mention_entity(settings: &EnsembleSettings) -> Self {
        Self::for_kind(settings, ContextKind::MentionEntity)
    }

    pub fn entity_entity(settings: &EnsembleSettings) -> Self {
        Self::for_kind(settings, ContextKind::EntityEntity)
    }

    pub fn kind(&self) -> ContextKind {
        match self.scope {
            ContextScope::MentionEntity { .. } => ContextKind::MentionEntity,
            ContextScope::EntityEntity { .. } => ContextKind::EntityEntity,
        }
    }

    /// Always false for mention-entity contexts.
    pub fn normalize_weights(&self) -> bool {
        match self.scope {
            ContextScope::EntityEntity { normalize_weights, .. } => normalize_weights,
            ContextScope::MentionEntity { .. } => false,
        }
    }

    pub fn source_weights(&self) -> &HashMap<String, f64> {
        match &self.scope {
            ContextScope::MentionEntity { source_weights }
            | ContextScope::EntityEntity { source_weights, .. } => source_weights,
        }
    }

    /// Configured weight of a keyphrase source; sources not listed weigh 1.0.
    pub fn source_weight(&self, source: &str) -> f64 {
        self.source_weights().get(source).copied().unwrap_or(1.0)
    }

    pub fn keyphrase_weight(&self, keyphrase: &Keyphrase) -> f64 {
        keyphrase.weight * self.source_weight(&keyphrase.source)
    }

    /// Keyphrases of `entity` that survive the weight cutoffs, heaviest first,
    /// paired with their source-adjusted weight.
    pub fn select_keyphrases<'a>(&self, entity: &'a Entity) -> Vec<(&'a Keyphrase, f64)> {
        let mut selected: Vec<(&Keyphrase, f64)> = entity
            .keyphrases
            .iter()
            .map(|kp| (kp, self.keyphrase_weight(kp)))
            .filter(|(_, w)| *w >= self.minimum_keyphrase_weight)
            .collect();
        selected.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        if self.max_keyphrase_count > 0 {
            selected.truncate(self.max_keyphrase_count);
        }
        selected
    }
}

/// Turn a source-weight list into a map. A repeated source keeps its last weight.
pub fn source_weight_map(weights: &[KeyphraseSourceWeight]) -> HashMap<String, f64> {
    let mut map = HashMap::with_capacity(weights.len());
    for sw in weights {
        if let Some(previous) = map.insert(sw.source_name.clone(), sw.weight) {
            tracing::warn!(
                source = %sw.source_name,
                previous,
                weight = sw.weight,
                "Duplicate keyphrase source weight, keeping the last one"
            );
        }
    }
    map
}
