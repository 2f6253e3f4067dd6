/// Candidate entities for one document, and the mention side of an edge.
///
/// The knowledge base fills these in; the scorers here only read them.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// A keyphrase attached to an entity, with the knowledge-base source it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyphrase {
    pub text: String,
    /// Source identifier, matched against the keyphrase source-weight maps.
    pub source: String,
    /// Raw weight as stored in the knowledge base (e.g. MI or IDF).
    pub weight: f64,
}

impl Keyphrase {
    pub fn new(text: &str, source: &str, weight: f64) -> Self {
        Keyphrase {
            text: text.to_string(),
            source: source.to_string(),
            weight,
        }
    }

    /// Lowercased words of the phrase.
    pub fn words(&self) -> impl Iterator<Item = String> + '_ {
        self.text.split_whitespace().map(str::to_lowercase)
    }
}

/// A knowledge-base entity that is a candidate for at least one mention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    #[serde(default)]
    pub keyphrases: Vec<Keyphrase>,
    /// Ids of the entities linking to this one.
    #[serde(default)]
    pub inlinks: BTreeSet<u32>,
}

impl Entity {
    pub fn new(name: &str) -> Self {
        Entity {
            name: name.to_string(),
            keyphrases: Vec::new(),
            inlinks: BTreeSet::new(),
        }
    }

    pub fn with_keyphrase(mut self, text: &str, source: &str, weight: f64) -> Self {
        self.keyphrases.push(Keyphrase::new(text, source, weight));
        self
    }

    pub fn with_inlinks(mut self, inlinks: impl IntoIterator<Item = u32>) -> Self {
        self.inlinks.extend(inlinks);
        self
    }
}

/// The candidate-entity collection of one document.
///
/// Insertion order is preserved so iteration (and therefore tracing output)
/// is deterministic.
#[derive(Debug, Clone, Default)]
pub struct Entities {
    entities: Vec<Entity>,
    index: HashMap<String, usize>,
    /// Total number of entities in the knowledge base, used by link-based
    /// relatedness. Defaults to the candidate count when unknown.
    collection_size: Option<u64>,
}

impl Entities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection_size(mut self, size: u64) -> Self {
        self.collection_size = Some(size);
        self
    }

    /// Add an entity. A second entity with the same name replaces the first.
    pub fn insert(&mut self, entity: Entity) {
        match self.index.get(&entity.name) {
            Some(&pos) => self.entities[pos] = entity,
            None => {
                self.index.insert(entity.name.clone(), self.entities.len());
                self.entities.push(entity);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Entity> {
        self.index.get(name).map(|&pos| &self.entities[pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// The explicit collection size, or else the larger of the candidate count
    /// and the number of distinct inlinks across all candidates.
    pub fn collection_size(&self) -> u64 {
        self.collection_size
            .unwrap_or_else(|| {
                let linked: BTreeSet<u32> = self
                    .entities
                    .iter()
                    .flat_map(|e| e.inlinks.iter().copied())
                    .collect();
                (self.entities.len() as u64).max(linked.len() as u64)
            })
            .max(1)
    }
}

impl FromIterator<Entity> for Entities {
    fn from_iter<I: IntoIterator<Item = Entity>>(iter: I) -> Self {
        let mut entities = Entities::new();
        for entity in iter {
            entities.insert(entity);
        }
        entities
    }
}

/// The mention side of a mention-entity edge: the document tokens and the
/// token span `[start, end)` covered by the mention.
///
/// The span always lies within the tokens; `new` clamps it.
#[derive(Debug, Clone, PartialEq)]
pub struct MentionContext {
    tokens: Vec<String>,
    start: usize,
    end: usize,
}

impl MentionContext {
    pub fn new(tokens: Vec<String>, start: usize, end: usize) -> Self {
        let end = end.min(tokens.len());
        MentionContext {
            tokens,
            start: start.min(end),
            end,
        }
    }

    /// Build from whitespace-separated text and a token span.
    pub fn from_text(text: &str, start: usize, end: usize) -> Self {
        let tokens = text.split_whitespace().map(str::to_lowercase).collect();
        Self::new(tokens, start, end)
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// Tokens left and right of the mention, lowercased, each with its token
    /// distance to the span. Both sides keep document order.
    pub fn sides(&self) -> [Vec<(String, usize)>; 2] {
        let left = self.tokens[..self.start]
            .iter()
            .enumerate()
            .map(|(i, t)| (t.to_lowercase(), self.start - i))
            .collect();
        let right = self.tokens[self.end..]
            .iter()
            .enumerate()
            .map(|(i, t)| (t.to_lowercase(), i + 1))
            .collect();
        [left, right]
    }
}
