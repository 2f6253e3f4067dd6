/// Measure registry: symbolic names from settings files → typed constructors.
///
/// Three tables, one per open scorer kind (mention-entity measures, mention-entity
/// contexts, entity importances). Entity-entity similarities are not registered
/// here; they form the closed `EntityEntityKind` enumeration.
///
/// A name missing from a table is a deployment mismatch, reported as
/// `UnknownMeasure` / `UnknownContext` by the assembler.

use std::collections::HashMap;
use std::sync::Arc;

use crate::context::ContextSettings;
use crate::entities::Entities;
use crate::similarity::{
    contexts, importance, measures, EntitiesContext, EntityImportance, MeasureOptions,
    MentionEntityMeasure,
};
use crate::tracer::Tracer;

pub type MeasureFactory = fn(MeasureOptions, Arc<dyn Tracer>) -> Box<dyn MentionEntityMeasure>;
pub type ContextFactory = fn(Arc<Entities>, ContextSettings) -> Box<dyn EntitiesContext>;
pub type ImportanceFactory = fn(Arc<Entities>) -> Box<dyn EntityImportance>;

#[derive(Clone, Default)]
pub struct MeasureRegistry {
    measures: HashMap<String, MeasureFactory>,
    contexts: HashMap<String, ContextFactory>,
    importances: HashMap<String, ImportanceFactory>,
}

impl MeasureRegistry {
    /// A registry with no entries.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry with every built-in scorer.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry
            .register_measure(measures::CONTEXT_SIMILARITY, measures::context_similarity)
            .register_measure(measures::COSINE_SIMILARITY, measures::cosine_similarity)
            .register_context(contexts::KEYPHRASES_CONTEXT, contexts::keyphrases_context)
            .register_context(contexts::KEYWORDS_CONTEXT, contexts::keywords_context)
            .register_context(contexts::NGRAMS_CONTEXT, contexts::ngrams_context)
            .register_importance(importance::INLINK_IMPORTANCE, importance::inlink_importance)
            .register_importance(
                importance::KEYPHRASE_COUNT_IMPORTANCE,
                importance::keyphrase_count_importance,
            );
        registry
    }

    /// Register (or replace) a mention-entity measure.
    pub fn register_measure(&mut self, name: &str, factory: MeasureFactory) -> &mut Self {
        self.measures.insert(name.to_string(), factory);
        self
    }

    /// Register (or replace) a mention-entity context.
    pub fn register_context(&mut self, name: &str, factory: ContextFactory) -> &mut Self {
        self.contexts.insert(name.to_string(), factory);
        self
    }

    /// Register (or replace) an entity importance.
    pub fn register_importance(&mut self, name: &str, factory: ImportanceFactory) -> &mut Self {
        self.importances.insert(name.to_string(), factory);
        self
    }

    pub fn measure(&self, name: &str) -> Option<MeasureFactory> {
        self.measures.get(name).copied()
    }

    pub fn context(&self, name: &str) -> Option<ContextFactory> {
        self.contexts.get(name).copied()
    }

    pub fn importance(&self, name: &str) -> Option<ImportanceFactory> {
        self.importances.get(name).copied()
    }

    pub fn measure_names(&self) -> Vec<&str> {
        sorted_keys(&self.measures)
    }

    pub fn context_names(&self) -> Vec<&str> {
        sorted_keys(&self.contexts)
    }

    pub fn importance_names(&self) -> Vec<&str> {
        sorted_keys(&self.importances)
    }
}

impl std::fmt::Debug for MeasureRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeasureRegistry")
            .field("measures", &self.measure_names())
            .field("contexts", &self.context_names())
            .field("importances", &self.importance_names())
            .finish()
    }
}

fn sorted_keys<V>(map: &HashMap<String, V>) -> Vec<&str> {
    let mut names: Vec<&str> = map.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
}
