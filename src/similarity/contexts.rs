/// Built-in entities contexts.
///
/// Each one turns the selected keyphrases of every candidate into a term vector
/// once, at construction, so measures sharing the context never recompute it.
/// They differ only in what a "term" is: a whole keyphrase, a single word, or a
/// word n-gram of `n_gram_length`.

use std::collections::HashMap;
use std::sync::Arc;

use crate::context::ContextSettings;
use crate::entities::{Entities, Entity, MentionContext};
use super::{EntitiesContext, TermVector};

pub const KEYPHRASES_CONTEXT: &str = "KeyphrasesContext";
pub const KEYWORDS_CONTEXT: &str = "KeywordsContext";
pub const NGRAMS_CONTEXT: &str = "NGramsContext";

/// Longest mention-side phrase tried against keyphrase terms.
const MAX_PHRASE_TOKENS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Keyphrase,
    Keyword,
    NGram,
}

pub struct TermContext {
    name: &'static str,
    granularity: Granularity,
    settings: ContextSettings,
    terms: HashMap<String, TermVector>,
}

impl TermContext {
    pub fn build(
        name: &'static str,
        granularity: Granularity,
        entities: &Entities,
        settings: ContextSettings,
    ) -> Self {
        let terms = entities
            .iter()
            .map(|e| (e.name.clone(), entity_vector(granularity, &settings, e)))
            .collect::<HashMap<_, _>>();
        tracing::debug!(
            context = name,
            entities = terms.len(),
            "Built entities context"
        );
        TermContext {
            name,
            granularity,
            settings,
            terms,
        }
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    fn n(&self) -> usize {
        self.settings.n_gram_length.max(1)
    }
}

impl EntitiesContext for TermContext {
    fn name(&self) -> &str {
        self.name
    }

    fn settings(&self) -> &ContextSettings {
        &self.settings
    }

    fn entity_terms(&self, entity: &str) -> Option<&TermVector> {
        self.terms.get(entity)
    }

    fn mention_terms(&self, mention: &MentionContext) -> Vec<(String, usize)> {
        let mut out = Vec::new();
        for side in mention.sides() {
            match self.granularity {
                Granularity::Keyword => out.extend(ngrams(&side, 1)),
                Granularity::NGram => out.extend(ngrams(&side, self.n())),
                Granularity::Keyphrase => {
                    for n in 1..=MAX_PHRASE_TOKENS {
                        out.extend(ngrams(&side, n));
                    }
                }
            }
        }
        out
    }
}

pub fn keyphrases_context(entities: Arc<Entities>, settings: ContextSettings) -> Box<dyn EntitiesContext> {
    Box::new(TermContext::build(KEYPHRASES_CONTEXT, Granularity::Keyphrase, &entities, settings))
}

pub fn keywords_context(entities: Arc<Entities>, settings: ContextSettings) -> Box<dyn EntitiesContext> {
    Box::new(TermContext::build(KEYWORDS_CONTEXT, Granularity::Keyword, &entities, settings))
}

pub fn ngrams_context(entities: Arc<Entities>, settings: ContextSettings) -> Box<dyn EntitiesContext> {
    Box::new(TermContext::build(NGRAMS_CONTEXT, Granularity::NGram, &entities, settings))
}

fn entity_vector(granularity: Granularity, settings: &ContextSettings, entity: &Entity) -> TermVector {
    let mut vector = TermVector::new();
    let n = settings.n_gram_length.max(1);
    for (keyphrase, weight) in settings.select_keyphrases(entity) {
        let words: Vec<String> = keyphrase.words().collect();
        if words.is_empty() {
            continue;
        }
        match granularity {
            Granularity::Keyphrase => {
                let entry = vector.entry(words.join(" ")).or_insert(0.0);
                *entry = entry.max(weight);
            }
            Granularity::Keyword => {
                for word in words {
                    *vector.entry(word).or_insert(0.0) += weight;
                }
            }
            Granularity::NGram => {
                if words.len() < n {
                    *vector.entry(words.join(" ")).or_insert(0.0) += weight;
                } else {
                    for gram in words.windows(n) {
                        *vector.entry(gram.join(" ")).or_insert(0.0) += weight;
                    }
                }
            }
        }
    }
    vector
}

/// Contiguous n-grams of one side; the distance of a gram is its closest token.
fn ngrams(side: &[(String, usize)], n: usize) -> Vec<(String, usize)> {
    if n == 0 || side.len() < n {
        return Vec::new();
    }
    side.windows(n)
        .map(|window| {
            let text = window
                .iter()
                .map(|(t, _)| t.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            let distance = window.iter().map(|(_, d)| *d).min().unwrap_or(1);
            (text, distance)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::EnsembleSettings;

    fn candidates() -> Entities {
        [
            Entity::new("Kashmir_(song)")
                .with_keyphrase("Led Zeppelin", "wiki", 0.8)
                .with_keyphrase("Physical Graffiti album", "wiki", 0.4),
            Entity::new("Kashmir_(region)")
                .with_keyphrase("Himalayan region", "wiki", 0.9),
        ]
        .into_iter()
        .collect()
    }

    fn settings() -> ContextSettings {
        ContextSettings::mention_entity(&EnsembleSettings::default())
    }

    #[test]
    fn test_keyphrase_terms_are_whole_phrases() {
        let ctx = TermContext::build(KEYPHRASES_CONTEXT, Granularity::Keyphrase, &candidates(), settings());
        let terms = ctx.entity_terms("Kashmir_(song)").unwrap();
        assert_eq!(terms.get("led zeppelin"), Some(&0.8));
        assert_eq!(terms.len(), 2);
        assert!(ctx.entity_terms("Jimmy_Page").is_none());
    }

    #[test]
    fn test_keyword_terms_accumulate() {
        let entities: Entities = [Entity::new("E")
            .with_keyphrase("rock band", "wiki", 0.5)
            .with_keyphrase("rock song", "wiki", 0.25)]
        .into_iter()
        .collect();
        let ctx = TermContext::build(KEYWORDS_CONTEXT, Granularity::Keyword, &entities, settings());
        let terms = ctx.entity_terms("E").unwrap();
        assert!((terms["rock"] - 0.75).abs() < 1e-10);
        assert_eq!(terms["band"], 0.5);
    }

    #[test]
    fn test_ngram_terms_use_configured_length() {
        let ctx = TermContext::build(NGRAMS_CONTEXT, Granularity::NGram, &candidates(), settings());
        let terms = ctx.entity_terms("Kashmir_(song)").unwrap();
        assert!(terms.contains_key("physical graffiti"));
        assert!(terms.contains_key("graffiti album"));
        assert!(terms.contains_key("led zeppelin"));
    }

    #[test]
    fn test_mention_terms_do_not_cross_the_mention() {
        let ctx = TermContext::build(NGRAMS_CONTEXT, Granularity::NGram, &candidates(), settings());
        let mention = MentionContext::from_text("Led Zeppelin played Kashmir at Knebworth", 3, 4);
        let terms: Vec<String> = ctx.mention_terms(&mention).into_iter().map(|(t, _)| t).collect();
        assert_eq!(terms, vec!["led zeppelin", "zeppelin played", "at knebworth"]);
    }

    #[test]
    fn test_mention_term_distance_is_closest_token() {
        let ctx = TermContext::build(KEYWORDS_CONTEXT, Granularity::Keyword, &candidates(), settings());
        let mention = MentionContext::from_text("a b MENTION c", 2, 3);
        let terms = ctx.mention_terms(&mention);
        assert_eq!(
            terms,
            vec![("a".to_string(), 2), ("b".to_string(), 1), ("c".to_string(), 1)]
        );
    }

    #[test]
    fn test_mention_terms_with_span_past_the_tokens() {
        let ctx = TermContext::build(KEYPHRASES_CONTEXT, Granularity::Keyphrase, &candidates(), settings());
        let mention = MentionContext::new(vec!["a".to_string()], 3, 3);
        assert_eq!(ctx.mention_terms(&mention), vec![("a".to_string(), 1)]);
    }
}
