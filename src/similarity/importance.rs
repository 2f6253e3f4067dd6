/// Built-in entity importances.
///
/// Raw counts are log-scaled (ln(1+count), diminishing returns) and divided by
/// the largest value among the candidates, so the most linked / most described
/// candidate scores 1.0.

use std::collections::HashMap;
use std::sync::Arc;

use crate::entities::{Entities, Entity};
use super::EntityImportance;

pub const INLINK_IMPORTANCE: &str = "InlinkImportance";
pub const KEYPHRASE_COUNT_IMPORTANCE: &str = "KeyphraseCountImportance";

pub struct CountImportance {
    name: &'static str,
    scores: HashMap<String, f64>,
}

impl CountImportance {
    pub fn build(name: &'static str, entities: &Entities, count: impl Fn(&Entity) -> usize) -> Self {
        let raw: Vec<(String, f64)> = entities
            .iter()
            .map(|e| (e.name.clone(), log_count(count(e))))
            .collect();
        let max = raw.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max);
        let scores = raw
            .into_iter()
            .map(|(name, v)| {
                let score = if max > f64::EPSILON { v / max } else { 0.0 };
                (name, score)
            })
            .collect();
        CountImportance { name, scores }
    }
}

impl EntityImportance for CountImportance {
    fn name(&self) -> &str {
        self.name
    }

    fn importance(&self, entity: &str) -> f64 {
        self.scores.get(entity).copied().unwrap_or(0.0)
    }
}

fn log_count(count: usize) -> f64 {
    (1.0 + count as f64).ln()
}

pub fn inlink_importance(entities: Arc<Entities>) -> Box<dyn EntityImportance> {
    Box::new(CountImportance::build(INLINK_IMPORTANCE, &entities, |e| e.inlinks.len()))
}

pub fn keyphrase_count_importance(entities: Arc<Entities>) -> Box<dyn EntityImportance> {
    Box::new(CountImportance::build(KEYPHRASE_COUNT_IMPORTANCE, &entities, |e| e.keyphrases.len()))
}
