/// Built-in mention-entity measures.
///
/// Both compare the terms around a mention with the entity terms of the context
/// they are paired with. With the distance discount enabled a context token
/// counts 1/d, where d is its token distance to the mention.
///
/// Only construction goes to the `Tracer`; per-edge scores are `trace!` events.

use std::sync::Arc;

use crate::entities::{Entity, MentionContext};
use crate::tracer::{TraceEvent, Tracer};
use super::{cosine, EntitiesContext, MeasureOptions, MentionEntityMeasure, TermVector};

pub const CONTEXT_SIMILARITY: &str = "ContextSimilarity";
pub const COSINE_SIMILARITY: &str = "CosineSimilarity";

/// Weighted share of the entity's term mass found around the mention.
pub struct ContextSimilarity {
    options: MeasureOptions,
}

/// Cosine between the mention term vector and the entity term vector.
pub struct CosineSimilarity {
    options: MeasureOptions,
}

impl MentionEntityMeasure for ContextSimilarity {
    fn name(&self) -> &str {
        CONTEXT_SIMILARITY
    }

    fn uses_distance_discount(&self) -> bool {
        self.options.use_distance_discount
    }

    fn similarity(&self, mention: &MentionContext, entity: &Entity, context: &dyn EntitiesContext) -> f64 {
        let Some(entity_terms) = context.entity_terms(&entity.name) else {
            return 0.0;
        };
        let total: f64 = entity_terms.values().sum();
        if total <= f64::EPSILON {
            return 0.0;
        }
        let mention_terms = mention_vector(context, mention, self.options.use_distance_discount);
        let matched: f64 = mention_terms
            .iter()
            .filter_map(|(term, mw)| entity_terms.get(term).map(|ew| ew * mw))
            .sum();
        let score = (matched / total).clamp(0.0, 1.0);
        tracing::trace!(entity = %entity.name, context = context.name(), score, "ContextSimilarity");
        score
    }
}

impl MentionEntityMeasure for CosineSimilarity {
    fn name(&self) -> &str {
        COSINE_SIMILARITY
    }

    fn uses_distance_discount(&self) -> bool {
        self.options.use_distance_discount
    }

    fn similarity(&self, mention: &MentionContext, entity: &Entity, context: &dyn EntitiesContext) -> f64 {
        let Some(entity_terms) = context.entity_terms(&entity.name) else {
            return 0.0;
        };
        let mention_terms = mention_vector(context, mention, self.options.use_distance_discount);
        let score = cosine(&mention_terms, entity_terms);
        tracing::trace!(entity = %entity.name, context = context.name(), score, "CosineSimilarity");
        score
    }
}

pub fn context_similarity(options: MeasureOptions, tracer: Arc<dyn Tracer>) -> Box<dyn MentionEntityMeasure> {
    tracer.record(TraceEvent::new(
        CONTEXT_SIMILARITY,
        format!("constructed (distance discount: {})", options.use_distance_discount),
    ));
    Box::new(ContextSimilarity { options })
}

pub fn cosine_similarity(options: MeasureOptions, tracer: Arc<dyn Tracer>) -> Box<dyn MentionEntityMeasure> {
    tracer.record(TraceEvent::new(
        COSINE_SIMILARITY,
        format!("constructed (distance discount: {})", options.use_distance_discount),
    ));
    Box::new(CosineSimilarity { options })
}

/// Mention term → weight; a term seen several times keeps its closest occurrence.
fn mention_vector(context: &dyn EntitiesContext, mention: &MentionContext, discount: bool) -> TermVector {
    let mut vector = TermVector::new();
    for (term, distance) in context.mention_terms(mention) {
        let weight = if discount {
            1.0 / distance.max(1) as f64
        } else {
            1.0
        };
        let entry = vector.entry(term).or_insert(0.0);
        *entry = entry.max(weight);
    }
    vector
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextSettings;
    use crate::entities::Entities;
    use crate::settings::EnsembleSettings;
    use crate::similarity::contexts::{Granularity, TermContext, KEYWORDS_CONTEXT};
    use crate::tracer::{null_tracer, RecordingTracer};

    fn setup() -> (Entities, TermContext) {
        let entities: Entities = [
            Entity::new("Jimmy_Page")
                .with_keyphrase("guitarist", "wiki", 1.0)
                .with_keyphrase("zeppelin", "wiki", 1.0),
            Entity::new("Larry_Page").with_keyphrase("google", "wiki", 1.0),
        ]
        .into_iter()
        .collect();
        let ctx = TermContext::build(
            KEYWORDS_CONTEXT,
            Granularity::Keyword,
            &entities,
            ContextSettings::mention_entity(&EnsembleSettings::default()),
        );
        (entities, ctx)
    }

    #[test]
    fn test_context_similarity_prefers_matching_entity() {
        let (entities, ctx) = setup();
        let measure = context_similarity(MeasureOptions::default(), null_tracer());
        let mention = MentionContext::from_text("the zeppelin guitarist page played", 3, 4);
        let jimmy = measure.similarity(&mention, entities.get("Jimmy_Page").unwrap(), &ctx);
        let larry = measure.similarity(&mention, entities.get("Larry_Page").unwrap(), &ctx);
        assert!((jimmy - 1.0).abs() < 1e-10, "jimmy was {}", jimmy);
        assert_eq!(larry, 0.0);
    }

    #[test]
    fn test_distance_discount_lowers_far_matches() {
        let (entities, ctx) = setup();
        let plain = context_similarity(MeasureOptions::default(), null_tracer());
        let discounted = context_similarity(MeasureOptions { use_distance_discount: true }, null_tracer());
        assert!(discounted.uses_distance_discount());
        let mention = MentionContext::from_text("zeppelin x x x page", 4, 5);
        let jimmy = entities.get("Jimmy_Page").unwrap();
        let a = plain.similarity(&mention, jimmy, &ctx);
        let b = discounted.similarity(&mention, jimmy, &ctx);
        assert!((a - 0.5).abs() < 1e-10);
        assert!((b - 0.125).abs() < 1e-10, "b was {}", b);
    }

    #[test]
    fn test_cosine_similarity_unknown_entity_scores_zero() {
        let (_, ctx) = setup();
        let measure = cosine_similarity(MeasureOptions::default(), null_tracer());
        let mention = MentionContext::from_text("zeppelin page", 1, 2);
        assert_eq!(measure.similarity(&mention, &Entity::new("Nobody"), &ctx), 0.0);
    }

    #[test]
    fn test_construction_is_traced() {
        let tracer = Arc::new(RecordingTracer::new());
        let _measure = cosine_similarity(MeasureOptions::default(), tracer.clone());
        let events = tracer.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].source, COSINE_SIMILARITY);
    }

    #[test]
    fn test_scoring_does_not_grow_trace() {
        let (entities, ctx) = setup();
        let tracer = Arc::new(RecordingTracer::new());
        let context = context_similarity(MeasureOptions::default(), tracer.clone());
        let cosine = cosine_similarity(MeasureOptions::default(), tracer.clone());
        let mention = MentionContext::from_text("the zeppelin guitarist page played", 3, 4);
        for _ in 0..10 {
            for entity in entities.iter() {
                context.similarity(&mention, entity, &ctx);
                cosine.similarity(&mention, entity, &ctx);
            }
        }
        assert_eq!(tracer.events().len(), 2);
    }
}
