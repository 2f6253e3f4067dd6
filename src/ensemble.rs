/// Ensemble assembly: settings tuples → constructed scorers with weights.
///
/// One `EnsembleAssembler` call resolves against one document's candidates.
/// Within a mention-entity resolution, measures are built once per measure name
/// and contexts once per context name; tuples naming the same one share the
/// instance. The caches live only for the call.
///
/// Prior threshold: when `prior_threshold >= 0`, the graph builder conventionally
/// scores candidates whose best prior is below the threshold with the first half
/// of the mention-entity list, and the rest with the second half plus the prior.
/// The assembler never splits the list itself; it hands over the full ordered
/// list and the threshold.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::context::ContextSettings;
use crate::entities::{Entities, Entity, MentionContext};
use crate::errors::NedsimError;
use crate::registry::MeasureRegistry;
use crate::settings::{keys, EnsembleSettings};
use crate::similarity::{
    EntitiesContext, EntityEntityKind, EntityEntitySimilarity, EntityImportance, MeasureOptions,
    MentionEntityMeasure,
};
use crate::tracer::Tracer;

/// Tolerance for the "weights add up to 1.0" check.
const WEIGHT_BUDGET_EPSILON: f64 = 1e-6;

// ---------------------------------------------------------------------------
// Resolved scorers
// ---------------------------------------------------------------------------

/// A mention-entity measure paired with its context and weight.
#[derive(Clone)]
pub struct MentionEntityScorer {
    pub measure: Arc<dyn MentionEntityMeasure>,
    pub context: Arc<dyn EntitiesContext>,
    pub weight: f64,
}

impl MentionEntityScorer {
    /// Weighted similarity of one mention-entity edge.
    pub fn score(&self, mention: &MentionContext, entity: &Entity) -> f64 {
        self.weight * self.measure.similarity(mention, entity, self.context.as_ref())
    }
}

impl fmt::Debug for MentionEntityScorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MentionEntityScorer")
            .field("measure", &self.measure.name())
            .field("context", &self.context.name())
            .field("weight", &self.weight)
            .finish()
    }
}

pub struct WeightedEntityEntity {
    pub similarity: Box<dyn EntityEntitySimilarity>,
    pub weight: f64,
}

impl fmt::Debug for WeightedEntityEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeightedEntityEntity")
            .field("kind", &self.similarity.kind())
            .field("weight", &self.weight)
            .finish()
    }
}

pub struct WeightedImportance {
    pub importance: Box<dyn EntityImportance>,
    pub weight: f64,
}

impl fmt::Debug for WeightedImportance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeightedImportance")
            .field("importance", &self.importance.name())
            .field("weight", &self.weight)
            .finish()
    }
}

/// Every scorer of one document's disambiguation run, in settings order.
#[derive(Debug)]
pub struct ResolvedEnsemble {
    pub mention_entity: Vec<MentionEntityScorer>,
    pub entity_entity: Vec<WeightedEntityEntity>,
    pub importance: Vec<WeightedImportance>,
    prior_weight: f64,
    prior_threshold: f64,
}

impl ResolvedEnsemble {
    pub fn prior_weight(&self) -> f64 {
        self.prior_weight
    }

    /// -1.0 when unset.
    pub fn prior_threshold(&self) -> f64 {
        self.prior_threshold
    }

    /// Weighted sum over all mention-entity scorers.
    pub fn mention_entity_score(&self, mention: &MentionContext, entity: &Entity) -> f64 {
        self.mention_entity.iter().map(|s| s.score(mention, entity)).sum()
    }

    /// Weighted sum over all entity-entity scorers.
    pub fn entity_entity_score(&self, a: &str, b: &str) -> f64 {
        self.entity_entity
            .iter()
            .map(|s| s.weight * s.similarity.similarity(a, b))
            .sum()
    }

    /// Weighted sum over all importance scorers.
    pub fn importance_score(&self, entity: &str) -> f64 {
        self.importance
            .iter()
            .map(|s| s.weight * s.importance.importance(entity))
            .sum()
    }

    /// The mention-entity list split at `len / 2`: the conventional
    /// below-threshold and at-or-above-threshold subsets. Never applied here.
    pub fn conventional_halves(&self) -> (&[MentionEntityScorer], &[MentionEntityScorer]) {
        self.mention_entity.split_at(self.mention_entity.len() / 2)
    }
}

// ---------------------------------------------------------------------------
// Weight budget
// ---------------------------------------------------------------------------

/// Mention-entity weights plus prior weight, expected to total 1.0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightBudget {
    pub mention_entity_total: f64,
    pub prior_weight: f64,
    pub total: f64,
    /// `option#position` of tuples whose weight lies outside [0, 1].
    pub out_of_range: Vec<String>,
}

impl WeightBudget {
    pub fn of(settings: &EnsembleSettings) -> Self {
        let mention_entity_total: f64 = settings
            .mention_entity_similarities()
            .iter()
            .map(|t| t.weight)
            .sum();
        let out_of_range = settings
            .mention_entity_similarities()
            .iter()
            .enumerate()
            .filter(|(_, t)| !(0.0..=1.0).contains(&t.weight))
            .map(|(i, _)| format!("{}#{}", keys::MENTION_ENTITY_SIMILARITIES, i + 1))
            .collect();
        WeightBudget {
            mention_entity_total,
            prior_weight: settings.prior_weight(),
            total: mention_entity_total + settings.prior_weight(),
            out_of_range,
        }
    }

    pub fn is_balanced(&self) -> bool {
        (self.total - 1.0).abs() < WEIGHT_BUDGET_EPSILON && self.out_of_range.is_empty()
    }
}

// ---------------------------------------------------------------------------
// EnsembleAssembler
// ---------------------------------------------------------------------------

pub struct EnsembleAssembler<'a> {
    settings: &'a EnsembleSettings,
    registry: &'a MeasureRegistry,
}

impl<'a> EnsembleAssembler<'a> {
    pub fn new(settings: &'a EnsembleSettings, registry: &'a MeasureRegistry) -> Self {
        EnsembleAssembler { settings, registry }
    }

    /// Resolve every scorer kind and check the weight budget.
    pub fn resolve(
        &self,
        entities: Arc<Entities>,
        tracer: Arc<dyn Tracer>,
    ) -> Result<ResolvedEnsemble, NedsimError> {
        self.check_weight_budget();
        let mention_entity = self.resolve_mention_entity_scorers(entities.clone(), tracer.clone())?;
        let importance = self.resolve_importance_scorers(entities.clone())?;
        let entity_entity = self.resolve_entity_entity_scorers(entities, tracer);
        Ok(ResolvedEnsemble {
            mention_entity,
            entity_entity,
            importance,
            prior_weight: self.settings.prior_weight(),
            prior_threshold: self.settings.prior_threshold(),
        })
    }

    /// Build mention-entity scorers in settings order.
    ///
    /// Unknown measure or context names are fatal.
    pub fn resolve_mention_entity_scorers(
        &self,
        entities: Arc<Entities>,
        tracer: Arc<dyn Tracer>,
    ) -> Result<Vec<MentionEntityScorer>, NedsimError> {
        let tuples = self.settings.mention_entity_similarities();
        let mut measures: HashMap<&str, Arc<dyn MentionEntityMeasure>> = HashMap::new();
        let mut contexts: HashMap<&str, Arc<dyn EntitiesContext>> = HashMap::new();
        let mut scorers = Vec::with_capacity(tuples.len());

        for (i, tuple) in tuples.iter().enumerate() {
            let position = i + 1;

            let measure = match measures.get(tuple.measure_name.as_str()) {
                Some(existing) => {
                    if existing.uses_distance_discount() != tuple.uses_distance_discount() {
                        tracing::warn!(
                            identifier = self.identifier(),
                            tuple = %tuple,
                            position,
                            "Measure already built with different flags, reusing the first instance"
                        );
                    }
                    existing.clone()
                }
                None => {
                    let factory = self.registry.measure(&tuple.measure_name).ok_or_else(|| {
                        tracing::error!(
                            identifier = self.identifier(),
                            tuple = %tuple,
                            position,
                            "Unknown mention-entity measure"
                        );
                        NedsimError::UnknownMeasure {
                            kind: "mention-entity measure",
                            name: tuple.measure_name.clone(),
                            option: keys::MENTION_ENTITY_SIMILARITIES,
                            position,
                        }
                    })?;
                    let options = MeasureOptions {
                        use_distance_discount: tuple.uses_distance_discount(),
                    };
                    let built: Arc<dyn MentionEntityMeasure> = Arc::from(factory(options, tracer.clone()));
                    measures.insert(tuple.measure_name.as_str(), built.clone());
                    built
                }
            };

            let context = match contexts.get(tuple.context_name.as_str()) {
                Some(existing) => existing.clone(),
                None => {
                    let factory = self.registry.context(&tuple.context_name).ok_or_else(|| {
                        tracing::error!(
                            identifier = self.identifier(),
                            tuple = %tuple,
                            position,
                            "Unknown entities context"
                        );
                        NedsimError::UnknownContext {
                            name: tuple.context_name.clone(),
                            position,
                        }
                    })?;
                    let settings = ContextSettings::mention_entity(self.settings);
                    let built: Arc<dyn EntitiesContext> = Arc::from(factory(entities.clone(), settings));
                    contexts.insert(tuple.context_name.as_str(), built.clone());
                    built
                }
            };

            scorers.push(MentionEntityScorer {
                measure,
                context,
                weight: tuple.weight,
            });
        }

        tracing::debug!(
            identifier = self.identifier(),
            scorers = scorers.len(),
            measures = measures.len(),
            contexts = contexts.len(),
            "Resolved mention-entity scorers"
        );
        Ok(scorers)
    }

    /// Build entity-entity scorers in settings order.
    ///
    /// An unknown similarity name is logged and its tuple skipped; the rest of
    /// the ensemble still resolves.
    pub fn resolve_entity_entity_scorers(
        &self,
        entities: Arc<Entities>,
        tracer: Arc<dyn Tracer>,
    ) -> Vec<WeightedEntityEntity> {
        let tuples = self.settings.entity_entity_similarities();
        let mut scorers = Vec::with_capacity(tuples.len());
        if tuples.is_empty() {
            return scorers;
        }
        let settings = ContextSettings::entity_entity(self.settings);

        for (i, tuple) in tuples.iter().enumerate() {
            let kind = match tuple.similarity_name.parse::<EntityEntityKind>() {
                Ok(kind) => kind,
                Err(e) => {
                    tracing::error!(
                        identifier = self.identifier(),
                        tuple = %tuple,
                        position = i + 1,
                        error = %e,
                        "Entity-entity similarity undefined, skipping"
                    );
                    continue;
                }
            };
            let similarity = kind.build(
                entities.clone(),
                &settings,
                self.settings.number_of_entity_keyphrase(),
                tracer.clone(),
            );
            scorers.push(WeightedEntityEntity {
                similarity,
                weight: tuple.weight,
            });
        }
        scorers
    }

    /// Build importance scorers in settings order. Unknown names are fatal.
    pub fn resolve_importance_scorers(
        &self,
        entities: Arc<Entities>,
    ) -> Result<Vec<WeightedImportance>, NedsimError> {
        self.settings
            .entity_importances()
            .iter()
            .enumerate()
            .map(|(i, tuple)| {
                let factory = self.registry.importance(&tuple.importance_name).ok_or_else(|| {
                    tracing::error!(
                        identifier = self.identifier(),
                        tuple = %tuple,
                        position = i + 1,
                        "Unknown entity importance"
                    );
                    NedsimError::UnknownMeasure {
                        kind: "entity importance",
                        name: tuple.importance_name.clone(),
                        option: keys::ENTITY_IMPORTANCE_WEIGHTS,
                        position: i + 1,
                    }
                })?;
                Ok(WeightedImportance {
                    importance: factory(entities.clone()),
                    weight: tuple.weight,
                })
            })
            .collect()
    }

    /// Compute the weight budget and warn when it is off.
    pub fn check_weight_budget(&self) -> WeightBudget {
        let budget = WeightBudget::of(self.settings);
        if !budget.is_balanced() && !self.settings.mention_entity_similarities().is_empty() {
            tracing::warn!(
                identifier = self.identifier(),
                mention_entity_total = budget.mention_entity_total,
                prior_weight = budget.prior_weight,
                total = budget.total,
                out_of_range = ?budget.out_of_range,
                "Mention-entity weights and prior weight do not add up to 1.0"
            );
        }
        budget
    }

    fn identifier(&self) -> &str {
        self.settings.identifier().unwrap_or("<programmatic>")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
