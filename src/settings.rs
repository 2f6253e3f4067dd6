/// Similarity settings: which measures make up the disambiguation ensemble and
/// how much each one weighs.
///
/// Settings are read from a properties file or built from explicit tuples.
/// File format (one option per line, all optional):
///
/// - `mentionEntitySimilarities`: space-separated `measure[,flags]:context:weight`
///   triples. Together with `priorWeight` the weights should add up to 1.0. When
///   `priorThreshold` is set, callers conventionally use the first half of the list
///   for candidates whose best prior is below the threshold and the second half
///   (plus the prior) otherwise. The whole list still sums to 1.0 with the prior.
/// - `priorWeight`: weight of the prior probability.
/// - `priorThreshold`: enables the split described above. -1.0 means unset.
/// - `entityEntitySimilarity`: space-separated `similarity:weight` pairs.
/// - `entityImportanceWeights`: space-separated `importance:weight` pairs.
/// - `mentionEntityKeyphraseSourceWeights` / `entityEntityKeyphraseSourceWeights`:
///   space-separated `source:weight` pairs.
/// - scalar coherence and LSH options, see `keys`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::NedsimError;
use crate::properties::Properties;

pub const DEFAULT_KEYPHRASE_ALPHA: f64 = 0.9713705330990623;
pub const DEFAULT_KEYWORD_ALPHA: f64 = 0.0;
pub const DEFAULT_LSH_TABLE: &str = "entity_lsh_signatures_2000";
pub const DEFAULT_N_GRAM_LENGTH: usize = 2;
pub const DEFAULT_LSH_BAND_SIZE: u32 = 2;
pub const DEFAULT_LSH_BAND_COUNT: u32 = 100;

/// Sentinel for "no prior threshold": always use the non-prior branch.
pub const UNSET_PRIOR_THRESHOLD: f64 = -1.0;

/// Default for `numberOfEntityKeyphrase` (the file format's max-int).
pub const UNBOUNDED_ENTITY_KEYPHRASES: usize = i32::MAX as usize;

/// Mention-entity flag enabling the distance discount of context tokens.
pub const DISTANCE_DISCOUNT_FLAG: &str = "i";

/// Option names, as they appear in settings files and in `to_map`.
pub mod keys {
    pub const PRIOR_WEIGHT: &str = "priorWeight";
    pub const PRIOR_THRESHOLD: &str = "priorThreshold";
    pub const NUMBER_OF_ENTITY_KEYPHRASE: &str = "numberOfEntityKeyphrase";
    pub const KEYPHRASE_ALPHA: &str = "entityCoherenceKeyphraseAlpha";
    pub const KEYWORD_ALPHA: &str = "entityCoherenceKeywordAlpha";
    pub const NORMALIZE_COHERENCE_WEIGHTS: &str = "normalizeCoherenceWeights";
    pub const AVERAGE_COHERENCE_WEIGHTS: &str = "shouldAverageCoherenceWeights";
    pub const USE_CONFUSABLE_MI_WEIGHTS: &str = "useConfusableMIWeights";
    pub const N_GRAM_LENGTH: &str = "nGramLength";
    pub const MINIMUM_ENTITY_KEYPHRASE_WEIGHT: &str = "minimumEntityKeyphraseWeight";
    pub const MAX_ENTITY_KEYPHRASE_COUNT: &str = "maxEntityKeyphraseCount";
    pub const LSH_BAND_SIZE: &str = "lshBandSize";
    pub const LSH_BAND_COUNT: &str = "lshBandCount";
    pub const LSH_DATABASE_TABLE: &str = "lshDatabaseTable";
    pub const MENTION_ENTITY_SIMILARITIES: &str = "mentionEntitySimilarities";
    pub const ENTITY_IMPORTANCE_WEIGHTS: &str = "entityImportanceWeights";
    pub const ENTITY_ENTITY_SIMILARITY: &str = "entityEntitySimilarity";
    pub const MENTION_ENTITY_SOURCE_WEIGHTS: &str = "mentionEntityKeyphraseSourceWeights";
    pub const ENTITY_ENTITY_SOURCE_WEIGHTS: &str = "entityEntityKeyphraseSourceWeights";
    pub const IDENTIFIER: &str = "identifier";
}

// ---------------------------------------------------------------------------
// Tuples
// ---------------------------------------------------------------------------

/// One `measure[,flags]:context:weight` entry of `mentionEntitySimilarities`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityTuple {
    pub measure_name: String,
    /// Single-character flags after the measure name. Unknown flags are kept
    /// for export but have no effect.
    pub flags: BTreeSet<String>,
    pub context_name: String,
    pub weight: f64,
}

impl SimilarityTuple {
    pub fn new(measure_name: &str, context_name: &str, weight: f64) -> Self {
        SimilarityTuple {
            measure_name: measure_name.to_string(),
            flags: BTreeSet::new(),
            context_name: context_name.to_string(),
            weight,
        }
    }

    pub fn with_flag(mut self, flag: &str) -> Self {
        self.flags.insert(flag.to_string());
        self
    }

    pub fn uses_distance_discount(&self) -> bool {
        self.flags.contains(DISTANCE_DISCOUNT_FLAG)
    }

    /// Parse one tuple. `position` is 1-based and only used for error context.
    pub fn parse(raw: &str, position: usize) -> Result<Self, NedsimError> {
        let option = keys::MENTION_ENTITY_SIMILARITIES;
        let parts: Vec<&str> = raw.split(':').collect();
        if parts.len() != 3 {
            return Err(NedsimError::malformed(
                option,
                position,
                raw,
                &format!("expected measure:context:weight, got {} field(s)", parts.len()),
            ));
        }

        let mut segments = parts[0].split(',');
        let measure_name = segments.next().unwrap_or_default().trim();
        if measure_name.is_empty() {
            return Err(NedsimError::malformed(option, position, raw, "empty measure name"));
        }
        let flags: BTreeSet<String> = segments
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect();
        for flag in &flags {
            if flag != DISTANCE_DISCOUNT_FLAG {
                tracing::debug!(flag = %flag, tuple = raw, "Ignoring unknown mention-entity flag");
            }
        }

        let context_name = parts[1].trim();
        if context_name.is_empty() {
            return Err(NedsimError::malformed(option, position, raw, "empty context name"));
        }

        let weight = parse_weight(option, position, raw, parts[2])?;
        if !(0.0..=1.0).contains(&weight) {
            return Err(NedsimError::malformed(option, position, raw, "weight outside [0, 1]"));
        }

        Ok(SimilarityTuple {
            measure_name: measure_name.to_string(),
            flags,
            context_name: context_name.to_string(),
            weight,
        })
    }
}

impl fmt::Display for SimilarityTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.measure_name)?;
        for flag in &self.flags {
            write!(f, ",{}", flag)?;
        }
        write!(f, ":{}:{}", self.context_name, self.weight)
    }
}

/// One `similarity:weight` entry of `entityEntitySimilarity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityEntityTuple {
    pub similarity_name: String,
    pub weight: f64,
}

impl EntityEntityTuple {
    pub fn new(similarity_name: &str, weight: f64) -> Self {
        EntityEntityTuple {
            similarity_name: similarity_name.to_string(),
            weight,
        }
    }

    pub fn parse(raw: &str, position: usize) -> Result<Self, NedsimError> {
        let (name, weight) = parse_pair(keys::ENTITY_ENTITY_SIMILARITY, raw, position)?;
        Ok(EntityEntityTuple::new(name, weight))
    }
}

impl fmt::Display for EntityEntityTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.similarity_name, self.weight)
    }
}

/// One `importance:weight` entry of `entityImportanceWeights`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportanceTuple {
    pub importance_name: String,
    pub weight: f64,
}

impl ImportanceTuple {
    pub fn new(importance_name: &str, weight: f64) -> Self {
        ImportanceTuple {
            importance_name: importance_name.to_string(),
            weight,
        }
    }

    pub fn parse(raw: &str, position: usize) -> Result<Self, NedsimError> {
        let (name, weight) = parse_pair(keys::ENTITY_IMPORTANCE_WEIGHTS, raw, position)?;
        Ok(ImportanceTuple::new(name, weight))
    }
}

impl fmt::Display for ImportanceTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.importance_name, self.weight)
    }
}

/// One `source:weight` entry of a keyphrase source-weight list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyphraseSourceWeight {
    pub source_name: String,
    pub weight: f64,
}

impl KeyphraseSourceWeight {
    pub fn new(source_name: &str, weight: f64) -> Self {
        KeyphraseSourceWeight {
            source_name: source_name.to_string(),
            weight,
        }
    }

    fn parse(option: &'static str, raw: &str, position: usize) -> Result<Self, NedsimError> {
        let (name, weight) = parse_pair(option, raw, position)?;
        Ok(KeyphraseSourceWeight::new(name, weight))
    }
}

impl fmt::Display for KeyphraseSourceWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source_name, self.weight)
    }
}

fn parse_pair<'a>(
    option: &'static str,
    raw: &'a str,
    position: usize,
) -> Result<(&'a str, f64), NedsimError> {
    let parts: Vec<&str> = raw.split(':').collect();
    if parts.len() != 2 {
        return Err(NedsimError::malformed(
            option,
            position,
            raw,
            &format!("expected name:weight, got {} field(s)", parts.len()),
        ));
    }
    let name = parts[0].trim();
    if name.is_empty() {
        return Err(NedsimError::malformed(option, position, raw, "empty name"));
    }
    let weight = parse_weight(option, position, raw, parts[1])?;
    Ok((name, weight))
}

fn parse_weight(
    option: &'static str,
    position: usize,
    raw: &str,
    field: &str,
) -> Result<f64, NedsimError> {
    match field.trim().parse::<f64>() {
        Ok(w) if w.is_finite() => Ok(w),
        _ => Err(NedsimError::malformed(
            option,
            position,
            raw,
            &format!("weight '{}' is not a finite number", field),
        )),
    }
}

fn parse_list<T>(
    raw: &str,
    parse_one: impl Fn(&str, usize) -> Result<T, NedsimError>,
) -> Result<Vec<T>, NedsimError> {
    raw.split_whitespace()
        .enumerate()
        .map(|(i, entry)| parse_one(entry, i + 1))
        .collect()
}

pub fn parse_similarity_tuples(raw: &str) -> Result<Vec<SimilarityTuple>, NedsimError> {
    parse_list(raw, SimilarityTuple::parse)
}

pub fn parse_entity_entity_tuples(raw: &str) -> Result<Vec<EntityEntityTuple>, NedsimError> {
    parse_list(raw, EntityEntityTuple::parse)
}

pub fn parse_importance_tuples(raw: &str) -> Result<Vec<ImportanceTuple>, NedsimError> {
    parse_list(raw, ImportanceTuple::parse)
}

/// Parse a keyphrase source-weight list. `option` names the list in errors.
pub fn parse_source_weights(
    option: &'static str,
    raw: &str,
) -> Result<Vec<KeyphraseSourceWeight>, NedsimError> {
    parse_list(raw, |entry, position| KeyphraseSourceWeight::parse(option, entry, position))
}

fn join_list<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// EnsembleSettings
// ---------------------------------------------------------------------------

/// LSH parameters for near-duplicate keyphrase signature lookups. Opaque here:
/// they are handed to the signature store unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LshParams {
    pub band_size: u32,
    pub band_count: u32,
    pub table: String,
}

impl Default for LshParams {
    fn default() -> Self {
        LshParams {
            band_size: DEFAULT_LSH_BAND_SIZE,
            band_count: DEFAULT_LSH_BAND_COUNT,
            table: DEFAULT_LSH_TABLE.to_string(),
        }
    }
}

/// The full similarity configuration of one disambiguation setup.
///
/// Immutable once built. Tuning tools derive modified copies through the
/// consuming `with_*` methods.
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleSettings {
    identifier: Option<String>,
    source_path: Option<PathBuf>,
    prior_weight: f64,
    prior_threshold: f64,
    number_of_entity_keyphrase: usize,
    keyphrase_alpha: f64,
    keyword_alpha: f64,
    normalize_coherence_weights: bool,
    average_coherence_weights: bool,
    use_confusable_mi_weights: bool,
    n_gram_length: usize,
    minimum_entity_keyphrase_weight: f64,
    max_entity_keyphrase_count: usize,
    lsh: LshParams,
    mention_entity_similarities: Vec<SimilarityTuple>,
    entity_entity_similarities: Vec<EntityEntityTuple>,
    entity_importances: Vec<ImportanceTuple>,
    mention_entity_source_weights: Vec<KeyphraseSourceWeight>,
    entity_entity_source_weights: Vec<KeyphraseSourceWeight>,
}

impl Default for EnsembleSettings {
    fn default() -> Self {
        EnsembleSettings {
            identifier: None,
            source_path: None,
            prior_weight: 0.0,
            prior_threshold: UNSET_PRIOR_THRESHOLD,
            number_of_entity_keyphrase: UNBOUNDED_ENTITY_KEYPHRASES,
            keyphrase_alpha: DEFAULT_KEYPHRASE_ALPHA,
            keyword_alpha: DEFAULT_KEYWORD_ALPHA,
            normalize_coherence_weights: false,
            average_coherence_weights: false,
            use_confusable_mi_weights: false,
            n_gram_length: DEFAULT_N_GRAM_LENGTH,
            minimum_entity_keyphrase_weight: 0.0,
            max_entity_keyphrase_count: 0,
            lsh: LshParams::default(),
            mention_entity_similarities: Vec::new(),
            entity_entity_similarities: Vec::new(),
            entity_importances: Vec::new(),
            mention_entity_source_weights: Vec::new(),
            entity_entity_source_weights: Vec::new(),
        }
    }
}

impl EnsembleSettings {
    /// Load settings from a properties file.
    ///
    /// The identifier is the file name without its extension; it is the key
    /// used for calibration lookups.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, NedsimError> {
        let path = path.as_ref();
        if !path.is_file() {
            tracing::error!(path = %path.display(), "Settings file specified but could not be loaded");
            return Err(NedsimError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let props = Properties::load(path)?;
        let identifier = identifier_from_path(path);
        let source_path = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());

        let settings = Self::from_properties(identifier, Some(source_path), &props)?;
        tracing::debug!(
            identifier = settings.identifier().unwrap_or_default(),
            mention_entity = settings.mention_entity_similarities.len(),
            entity_entity = settings.entity_entity_similarities.len(),
            importances = settings.entity_importances.len(),
            "Loaded similarity settings"
        );
        Ok(settings)
    }

    /// Build settings from already-parsed properties.
    pub fn from_properties(
        identifier: Option<String>,
        source_path: Option<PathBuf>,
        props: &Properties,
    ) -> Result<Self, NedsimError> {
        let mention_entity_similarities = match props.get(keys::MENTION_ENTITY_SIMILARITIES) {
            Some(raw) => parse_similarity_tuples(raw)?,
            None => {
                tracing::warn!(
                    identifier = identifier.as_deref().unwrap_or_default(),
                    "No mention-entity similarity setting given - this is almost always needed"
                );
                Vec::new()
            }
        };

        let entity_importances = match props.get(keys::ENTITY_IMPORTANCE_WEIGHTS) {
            Some(raw) => parse_importance_tuples(raw)?,
            None => Vec::new(),
        };
        let entity_entity_similarities = match props.get(keys::ENTITY_ENTITY_SIMILARITY) {
            Some(raw) => parse_entity_entity_tuples(raw)?,
            None => Vec::new(),
        };
        let mention_entity_source_weights = match props.get(keys::MENTION_ENTITY_SOURCE_WEIGHTS) {
            Some(raw) => parse_source_weights(keys::MENTION_ENTITY_SOURCE_WEIGHTS, raw)?,
            None => Vec::new(),
        };
        let entity_entity_source_weights = match props.get(keys::ENTITY_ENTITY_SOURCE_WEIGHTS) {
            Some(raw) => parse_source_weights(keys::ENTITY_ENTITY_SOURCE_WEIGHTS, raw)?,
            None => Vec::new(),
        };

        Ok(EnsembleSettings {
            identifier,
            source_path,
            prior_weight: scalar(props, keys::PRIOR_WEIGHT, 0.0)?,
            prior_threshold: scalar(props, keys::PRIOR_THRESHOLD, UNSET_PRIOR_THRESHOLD)?,
            number_of_entity_keyphrase: scalar(
                props,
                keys::NUMBER_OF_ENTITY_KEYPHRASE,
                UNBOUNDED_ENTITY_KEYPHRASES,
            )?,
            keyphrase_alpha: scalar(props, keys::KEYPHRASE_ALPHA, DEFAULT_KEYPHRASE_ALPHA)?,
            keyword_alpha: scalar(props, keys::KEYWORD_ALPHA, DEFAULT_KEYWORD_ALPHA)?,
            normalize_coherence_weights: flag(props, keys::NORMALIZE_COHERENCE_WEIGHTS),
            average_coherence_weights: flag(props, keys::AVERAGE_COHERENCE_WEIGHTS),
            use_confusable_mi_weights: flag(props, keys::USE_CONFUSABLE_MI_WEIGHTS),
            n_gram_length: scalar(props, keys::N_GRAM_LENGTH, DEFAULT_N_GRAM_LENGTH)?,
            minimum_entity_keyphrase_weight: scalar(props, keys::MINIMUM_ENTITY_KEYPHRASE_WEIGHT, 0.0)?,
            max_entity_keyphrase_count: scalar(props, keys::MAX_ENTITY_KEYPHRASE_COUNT, 0)?,
            lsh: LshParams {
                band_size: scalar(props, keys::LSH_BAND_SIZE, DEFAULT_LSH_BAND_SIZE)?,
                band_count: scalar(props, keys::LSH_BAND_COUNT, DEFAULT_LSH_BAND_COUNT)?,
                table: props
                    .get(keys::LSH_DATABASE_TABLE)
                    .map(str::to_string)
                    .unwrap_or_else(|| DEFAULT_LSH_TABLE.to_string()),
            },
            mention_entity_similarities,
            entity_entity_similarities,
            entity_importances,
            mention_entity_source_weights,
            entity_entity_source_weights,
        })
    }

    /// Programmatic construction, bypassing file I/O. All scalar options not
    /// given here take their file-format defaults.
    pub fn from_tuples(
        mention_entity_similarities: Vec<SimilarityTuple>,
        entity_entity_similarities: Vec<EntityEntityTuple>,
        entity_importances: Vec<ImportanceTuple>,
        prior_weight: f64,
    ) -> Self {
        EnsembleSettings {
            mention_entity_similarities,
            entity_entity_similarities,
            entity_importances,
            prior_weight,
            ..EnsembleSettings::default()
        }
    }

    /// Flat option-name → value export, keyed like the settings file.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        let mut put = |key: &str, value: String| {
            map.insert(key.to_string(), value);
        };

        put(keys::MENTION_ENTITY_SIMILARITIES, join_list(&self.mention_entity_similarities));
        put(keys::ENTITY_IMPORTANCE_WEIGHTS, join_list(&self.entity_importances));
        put(keys::ENTITY_ENTITY_SIMILARITY, join_list(&self.entity_entity_similarities));
        put(keys::MENTION_ENTITY_SOURCE_WEIGHTS, join_list(&self.mention_entity_source_weights));
        put(keys::ENTITY_ENTITY_SOURCE_WEIGHTS, join_list(&self.entity_entity_source_weights));
        put(keys::PRIOR_WEIGHT, self.prior_weight.to_string());
        put(keys::PRIOR_THRESHOLD, self.prior_threshold.to_string());
        put(keys::NUMBER_OF_ENTITY_KEYPHRASE, self.number_of_entity_keyphrase.to_string());
        put(keys::KEYPHRASE_ALPHA, self.keyphrase_alpha.to_string());
        put(keys::KEYWORD_ALPHA, self.keyword_alpha.to_string());
        put(keys::NORMALIZE_COHERENCE_WEIGHTS, self.normalize_coherence_weights.to_string());
        put(keys::AVERAGE_COHERENCE_WEIGHTS, self.average_coherence_weights.to_string());
        put(keys::USE_CONFUSABLE_MI_WEIGHTS, self.use_confusable_mi_weights.to_string());
        put(keys::N_GRAM_LENGTH, self.n_gram_length.to_string());
        put(keys::MINIMUM_ENTITY_KEYPHRASE_WEIGHT, self.minimum_entity_keyphrase_weight.to_string());
        put(keys::MAX_ENTITY_KEYPHRASE_COUNT, self.max_entity_keyphrase_count.to_string());
        put(keys::LSH_BAND_SIZE, self.lsh.band_size.to_string());
        put(keys::LSH_BAND_COUNT, self.lsh.band_count.to_string());
        put(keys::LSH_DATABASE_TABLE, self.lsh.table.clone());
        if let Some(identifier) = &self.identifier {
            put(keys::IDENTIFIER, identifier.clone());
        }
        map
    }

    // -- accessors ----------------------------------------------------------

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    /// Absolute path of the settings file, `None` for programmatic settings.
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn prior_weight(&self) -> f64 {
        self.prior_weight
    }

    pub fn prior_threshold(&self) -> f64 {
        self.prior_threshold
    }

    /// True when `priorThreshold` switches between the two halves of the
    /// mention-entity list.
    pub fn has_prior_threshold(&self) -> bool {
        self.prior_threshold >= 0.0
    }

    pub fn number_of_entity_keyphrase(&self) -> usize {
        self.number_of_entity_keyphrase
    }

    pub fn keyphrase_alpha(&self) -> f64 {
        self.keyphrase_alpha
    }

    pub fn keyword_alpha(&self) -> f64 {
        self.keyword_alpha
    }

    pub fn normalize_coherence_weights(&self) -> bool {
        self.normalize_coherence_weights
    }

    pub fn average_coherence_weights(&self) -> bool {
        self.average_coherence_weights
    }

    pub fn use_confusable_mi_weights(&self) -> bool {
        self.use_confusable_mi_weights
    }

    pub fn n_gram_length(&self) -> usize {
        self.n_gram_length
    }

    pub fn minimum_entity_keyphrase_weight(&self) -> f64 {
        self.minimum_entity_keyphrase_weight
    }

    /// 0 means unbounded.
    pub fn max_entity_keyphrase_count(&self) -> usize {
        self.max_entity_keyphrase_count
    }

    pub fn lsh(&self) -> &LshParams {
        &self.lsh
    }

    pub fn mention_entity_similarities(&self) -> &[SimilarityTuple] {
        &self.mention_entity_similarities
    }

    pub fn entity_entity_similarities(&self) -> &[EntityEntityTuple] {
        &self.entity_entity_similarities
    }

    pub fn entity_importances(&self) -> &[ImportanceTuple] {
        &self.entity_importances
    }

    pub fn mention_entity_source_weights(&self) -> &[KeyphraseSourceWeight] {
        &self.mention_entity_source_weights
    }

    pub fn entity_entity_source_weights(&self) -> &[KeyphraseSourceWeight] {
        &self.entity_entity_source_weights
    }

    // -- tuning -------------------------------------------------------------

    pub fn with_identifier(mut self, identifier: &str) -> Self {
        self.identifier = Some(identifier.to_string());
        self
    }

    pub fn with_prior_weight(mut self, prior_weight: f64) -> Self {
        self.prior_weight = prior_weight;
        self
    }

    pub fn with_prior_threshold(mut self, prior_threshold: f64) -> Self {
        self.prior_threshold = prior_threshold;
        self
    }

    pub fn with_keyphrase_alpha(mut self, alpha: f64) -> Self {
        self.keyphrase_alpha = alpha;
        self
    }

    pub fn with_keyword_alpha(mut self, alpha: f64) -> Self {
        self.keyword_alpha = alpha;
        self
    }

    pub fn with_normalize_coherence_weights(mut self, flag: bool) -> Self {
        self.normalize_coherence_weights = flag;
        self
    }

    pub fn with_average_coherence_weights(mut self, flag: bool) -> Self {
        self.average_coherence_weights = flag;
        self
    }

    pub fn with_use_confusable_mi_weights(mut self, flag: bool) -> Self {
        self.use_confusable_mi_weights = flag;
        self
    }

    pub fn with_lsh(mut self, lsh: LshParams) -> Self {
        self.lsh = lsh;
        self
    }

    pub fn with_minimum_entity_keyphrase_weight(mut self, weight: f64) -> Self {
        self.minimum_entity_keyphrase_weight = weight;
        self
    }

    pub fn with_max_entity_keyphrase_count(mut self, count: usize) -> Self {
        self.max_entity_keyphrase_count = count;
        self
    }

    pub fn with_mention_entity_similarities(mut self, tuples: Vec<SimilarityTuple>) -> Self {
        self.mention_entity_similarities = tuples;
        self
    }

    pub fn with_entity_importances(mut self, tuples: Vec<ImportanceTuple>) -> Self {
        self.entity_importances = tuples;
        self
    }

    pub fn with_mention_entity_source_weights(mut self, weights: Vec<KeyphraseSourceWeight>) -> Self {
        self.mention_entity_source_weights = weights;
        self
    }

    pub fn with_entity_entity_source_weights(mut self, weights: Vec<KeyphraseSourceWeight>) -> Self {
        self.entity_entity_source_weights = weights;
        self
    }
}

fn identifier_from_path(path: &Path) -> Option<String> {
    path.file_stem().map(|stem| stem.to_string_lossy().into_owned())
}

fn scalar<T: std::str::FromStr>(props: &Properties, key: &str, default: T) -> Result<T, NedsimError> {
    match props.get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|_| NedsimError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}

/// Booleans are lenient: "true" in any case is true, everything else false.
fn flag(props: &Properties, key: &str) -> bool {
    props
        .get(key)
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn from_text(text: &str) -> EnsembleSettings {
        EnsembleSettings::from_properties(Some("test".into()), None, &Properties::parse(text))
            .expect("settings should parse")
    }

    #[test]
    fn test_defaults_when_keys_absent() {
        let settings = from_text("");
        assert_eq!(settings.prior_weight(), 0.0);
        assert_eq!(settings.prior_threshold(), -1.0);
        assert!(!settings.has_prior_threshold());
        assert_eq!(settings.number_of_entity_keyphrase(), 2_147_483_647);
        assert_eq!(settings.keyphrase_alpha(), DEFAULT_KEYPHRASE_ALPHA);
        assert_eq!(settings.keyword_alpha(), DEFAULT_KEYWORD_ALPHA);
        assert!(!settings.normalize_coherence_weights());
        assert!(!settings.average_coherence_weights());
        assert!(!settings.use_confusable_mi_weights());
        assert_eq!(settings.n_gram_length(), 2);
        assert_eq!(settings.minimum_entity_keyphrase_weight(), 0.0);
        assert_eq!(settings.max_entity_keyphrase_count(), 0);
        assert_eq!(settings.lsh(), &LshParams::default());
        assert!(settings.mention_entity_similarities().is_empty());
        assert!(settings.entity_entity_similarities().is_empty());
        assert!(settings.entity_importances().is_empty());
    }

    #[test]
    fn test_scalars_parsed() {
        let settings = from_text(
            "priorWeight=0.3\npriorThreshold=0.9\nnumberOfEntityKeyphrase=50\n\
             entityCoherenceKeyphraseAlpha=0.5\nentityCoherenceKeywordAlpha=0.25\n\
             normalizeCoherenceWeights=TRUE\nshouldAverageCoherenceWeights=true\n\
             useConfusableMIWeights=yes\nnGramLength=3\nminimumEntityKeyphraseWeight=0.01\n\
             maxEntityKeyphraseCount=100\nlshBandSize=4\nlshBandCount=50\nlshDatabaseTable=sigs\n",
        );
        assert_eq!(settings.prior_weight(), 0.3);
        assert_eq!(settings.prior_threshold(), 0.9);
        assert!(settings.has_prior_threshold());
        assert_eq!(settings.number_of_entity_keyphrase(), 50);
        assert_eq!(settings.keyphrase_alpha(), 0.5);
        assert_eq!(settings.keyword_alpha(), 0.25);
        assert!(settings.normalize_coherence_weights());
        assert!(settings.average_coherence_weights());
        // Only "true" counts as true
        assert!(!settings.use_confusable_mi_weights());
        assert_eq!(settings.n_gram_length(), 3);
        assert_eq!(settings.minimum_entity_keyphrase_weight(), 0.01);
        assert_eq!(settings.max_entity_keyphrase_count(), 100);
        assert_eq!(
            settings.lsh(),
            &LshParams { band_size: 4, band_count: 50, table: "sigs".into() }
        );
    }

    #[test]
    fn test_invalid_scalar_rejected() {
        let err = EnsembleSettings::from_properties(None, None, &Properties::parse("nGramLength=two"))
            .unwrap_err();
        assert!(matches!(err, NedsimError::InvalidValue { ref key, .. } if key == "nGramLength"));
    }

    #[test]
    fn test_mention_entity_tuple_with_flags() {
        let tuple = SimilarityTuple::parse("UnnormalizedKeyphrasesBasedMISimilarity,i,x:KeyphrasesContext:0.25", 1)
            .unwrap();
        assert_eq!(tuple.measure_name, "UnnormalizedKeyphrasesBasedMISimilarity");
        assert_eq!(tuple.context_name, "KeyphrasesContext");
        assert_eq!(tuple.weight, 0.25);
        assert!(tuple.uses_distance_discount());
        assert!(tuple.flags.contains("x"));
    }

    #[test]
    fn test_mention_entity_tuple_wrong_arity() {
        let err = parse_similarity_tuples("A:B:0.5 C:0.5").unwrap_err();
        match err {
            NedsimError::MalformedTuple { option, position, tuple, .. } => {
                assert_eq!(option, keys::MENTION_ENTITY_SIMILARITIES);
                assert_eq!(position, 2);
                assert_eq!(tuple, "C:0.5");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_mention_entity_weight_must_be_in_unit_range() {
        assert!(SimilarityTuple::parse("A:B:1.5", 1).is_err());
        assert!(SimilarityTuple::parse("A:B:-0.1", 1).is_err());
        assert!(SimilarityTuple::parse("A:B:NaN", 1).is_err());
        assert!(SimilarityTuple::parse("A:B:0", 1).is_ok());
        assert!(SimilarityTuple::parse("A:B:1", 1).is_ok());
    }

    #[test]
    fn test_pair_tuples() {
        let ee = parse_entity_entity_tuples("MilneWittenEntityEntitySimilarity:1.0").unwrap();
        assert_eq!(ee, vec![EntityEntityTuple::new("MilneWittenEntityEntitySimilarity", 1.0)]);

        let imp = parse_importance_tuples("InlinkImportance:0.1 KeyphraseCountImportance:0.05").unwrap();
        assert_eq!(imp.len(), 2);
        assert_eq!(imp[1].importance_name, "KeyphraseCountImportance");

        assert!(parse_entity_entity_tuples("MilneWitten").is_err());
        assert!(parse_importance_tuples("Imp:abc").is_err());
        assert!(parse_source_weights(keys::MENTION_ENTITY_SOURCE_WEIGHTS, ":0.5").is_err());
    }

    #[test]
    fn test_lists_tolerate_extra_whitespace() {
        let tuples = parse_similarity_tuples("  A:B:0.5\t\tC:D:0.5  ").unwrap();
        assert_eq!(tuples.len(), 2);
        assert!(parse_similarity_tuples("").unwrap().is_empty());
    }

    #[test]
    fn test_missing_mention_entity_list_is_not_an_error() {
        let settings = from_text("entityEntitySimilarity=MilneWittenEntityEntitySimilarity:1.0");
        assert!(settings.mention_entity_similarities().is_empty());
        assert_eq!(settings.entity_entity_similarities().len(), 1);
    }

    #[test]
    fn test_programmatic_settings_use_file_defaults() {
        let settings = EnsembleSettings::from_tuples(
            vec![SimilarityTuple::new("ContextSimilarity", "KeywordsContext", 0.6)],
            vec![EntityEntityTuple::new("InlinkOverlapEntityEntitySimilarity", 1.0)],
            Vec::new(),
            0.4,
        );
        assert_eq!(settings.identifier(), None);
        assert_eq!(settings.source_path(), None);
        assert_eq!(settings.prior_weight(), 0.4);
        assert_eq!(settings.prior_threshold(), UNSET_PRIOR_THRESHOLD);
        assert_eq!(settings.n_gram_length(), DEFAULT_N_GRAM_LENGTH);
    }

    #[test]
    fn test_export_uses_file_option_names() {
        let settings = from_text(
            "priorWeight=0.3\nmentionEntitySimilarities=ContextSimilarity,i:KeywordsContext:0.7\n\
             mentionEntityKeyphraseSourceWeights=wiki:1.0 inlink:0.5",
        );
        let map = settings.to_map();
        assert_eq!(map["priorWeight"], "0.3");
        assert_eq!(map["priorThreshold"], "-1");
        assert_eq!(map["mentionEntitySimilarities"], "ContextSimilarity,i:KeywordsContext:0.7");
        assert_eq!(map["mentionEntityKeyphraseSourceWeights"], "wiki:1 inlink:0.5");
        assert_eq!(map["entityEntitySimilarity"], "");
        assert_eq!(map["identifier"], "test");
    }

    #[test]
    fn test_export_reparses_to_equal_settings() {
        let original = from_text(
            "priorWeight=0.25\npriorThreshold=0.8\nnGramLength=3\nlshDatabaseTable=sigs\n\
             mentionEntitySimilarities=A,i:B:0.375 C:B:0.375\n\
             entityEntitySimilarity=KOREEntityEntitySimilarity:1.0\n\
             entityImportanceWeights=InlinkImportance:0.1\n\
             entityEntityKeyphraseSourceWeights=wiki:2",
        );
        let props: Properties = original.to_map().into_iter().collect();
        let reparsed = EnsembleSettings::from_properties(Some("test".into()), None, &props).unwrap();
        assert_eq!(reparsed, original);
    }

    #[test]
    fn test_tuning_copies_leave_original_untouched() {
        let base = from_text("priorWeight=0.3");
        let tuned = base.clone().with_prior_threshold(0.5).with_prior_weight(0.2);
        assert_eq!(base.prior_threshold(), -1.0);
        assert_eq!(tuned.prior_threshold(), 0.5);
        assert_eq!(tuned.prior_weight(), 0.2);
    }
}
