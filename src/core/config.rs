use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

use crate::core::model::FusionMethod;
use crate::core::similarity::SimilarityOptions;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub normalize: NormalizeOptions,
    pub similarity: SimilarityOptions,
    pub lines: LineGroupOptions,
    pub fusion: FusionOptions,
}

impl PipelineConfig {
    pub fn from_toml_path(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        let mut config: Self = toml::from_str(&data)
            .with_context(|| format!("failed to parse config: {}", path.display()))?;
        config.validate();
        Ok(config)
    }

    // Out-of-range thresholds are repaired at load time so the stages
    // never have to re-check them.
    pub fn validate(&mut self) {
        clamp_ratio("normalize.min_confidence", &mut self.normalize.min_confidence);
        clamp_ratio("similarity.similarity_threshold", &mut self.similarity.similarity_threshold);
        clamp_ratio("lines.line_overlap_threshold", &mut self.lines.line_overlap_threshold);
        if self.normalize.max_length < self.normalize.min_length {
            warn!(
                min = self.normalize.min_length,
                max = self.normalize.max_length,
                "max_length below min_length, swapping"
            );
            std::mem::swap(&mut self.normalize.min_length, &mut self.normalize.max_length);
        }
        if FusionMethod::from_name(&self.fusion.method).is_none() {
            warn!(method = %self.fusion.method, "unknown fusion method in config, voting will be used");
        }
    }
}

fn clamp_ratio(name: &str, value: &mut f32) {
    if !(0.0..=1.0).contains(value) || value.is_nan() {
        let clamped = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        warn!(option = name, from = *value, to = clamped, "clamping option into [0, 1]");
        *value = clamped;
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NormalizeOptions {
    pub min_confidence: f32,
    pub min_length: usize,
    pub max_length: usize,
    pub allowed_characters: CharacterSet,
    pub enable_correction: bool,
    pub correction_table: CorrectionTable,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            min_confidence: 0.6,
            min_length: 3,
            max_length: 20,
            allowed_characters: CharacterSet::default(),
            enable_correction: true,
            correction_table: CorrectionTable::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(from = "String")]
pub struct CharacterSet {
    chars: HashSet<char>,
}

impl CharacterSet {
    pub fn new(chars: &str) -> Self {
        Self {
            chars: chars.chars().collect(),
        }
    }

    pub fn contains(&self, c: char) -> bool {
        self.chars.contains(&c)
    }
}

impl Default for CharacterSet {
    fn default() -> Self {
        let mut chars: HashSet<char> = ('A'..='Z').chain('a'..='z').chain('0'..='9').collect();
        chars.extend(['-', '.', '/']);
        Self { chars }
    }
}

impl From<String> for CharacterSet {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(from = "HashMap<String, String>")]
pub struct CorrectionTable {
    map: HashMap<char, char>,
}

impl CorrectionTable {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (char, char)>) -> Self {
        Self {
            map: pairs.into_iter().collect(),
        }
    }

    pub fn substitute(&self, c: char) -> Option<char> {
        self.map.get(&c).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Default for CorrectionTable {
    fn default() -> Self {
        // Shapes the engine confuses with digits on stamped metal.
        Self::from_pairs([
            ('O', '0'),
            ('Q', '0'),
            ('D', '0'),
            ('I', '1'),
            ('l', '1'),
            ('Z', '2'),
            ('A', '4'),
            ('L', '4'),
            ('S', '5'),
            ('G', '6'),
            ('T', '7'),
            ('B', '8'),
            ('g', '9'),
            ('q', '9'),
        ])
    }
}

impl From<HashMap<String, String>> for CorrectionTable {
    fn from(value: HashMap<String, String>) -> Self {
        let mut map = HashMap::with_capacity(value.len());
        for (from, to) in value {
            match (single_char(&from), single_char(&to)) {
                (Some(from), Some(to)) => {
                    map.insert(from, to);
                }
                _ => warn!(%from, %to, "ignoring correction pair that is not single-character"),
            }
        }
        Self { map }
    }
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct LineGroupOptions {
    pub line_overlap_threshold: f32,
}

impl Default for LineGroupOptions {
    fn default() -> Self {
        Self {
            line_overlap_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FusionOptions {
    pub method: String,
    pub max_alternatives: Option<usize>,
}

impl FusionOptions {
    pub fn resolve_method(&self) -> FusionMethod {
        FusionMethod::resolve(&self.method)
    }
}

impl Default for FusionOptions {
    fn default() -> Self {
        Self {
            method: FusionMethod::Voting.name().to_string(),
            max_alternatives: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_usable() {
        let config = PipelineConfig::default();
        assert_eq!(config.normalize.min_confidence, 0.6);
        assert_eq!(config.similarity.similarity_threshold, 0.2);
        assert_eq!(config.lines.line_overlap_threshold, 0.5);
        assert_eq!(config.fusion.resolve_method(), FusionMethod::Voting);
    }

    #[test]
    fn parses_partial_toml() {
        let config: PipelineConfig = toml::from_str(
            r#"
            [normalize]
            min_confidence = 0.4
            allowed_characters = "AT0123456789"
            correction_table = { "7" = "2", "3" = "2" }

            [fusion]
            method = "smart"
            max_alternatives = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.normalize.min_confidence, 0.4);
        assert!(config.normalize.allowed_characters.contains('T'));
        assert!(!config.normalize.allowed_characters.contains('x'));
        assert_eq!(config.normalize.correction_table.substitute('7'), Some('2'));
        assert_eq!(config.fusion.resolve_method(), FusionMethod::Smart);
        assert_eq!(config.fusion.max_alternatives, Some(3));
        // untouched sections keep their defaults
        assert_eq!(config.normalize.min_length, 3);
        assert_eq!(config.similarity.short_distance_cap, 2);
    }

    #[test]
    fn validate_repairs_out_of_range_values() {
        let mut config = PipelineConfig::default();
        config.normalize.min_confidence = 1.7;
        config.similarity.similarity_threshold = -0.3;
        config.normalize.min_length = 10;
        config.normalize.max_length = 4;
        config.validate();
        assert_eq!(config.normalize.min_confidence, 1.0);
        assert_eq!(config.similarity.similarity_threshold, 0.0);
        assert_eq!(config.normalize.min_length, 4);
        assert_eq!(config.normalize.max_length, 10);
    }

    #[test]
    fn default_table_maps_letters_to_digits() {
        let table = CorrectionTable::default();
        assert_eq!(table.substitute('O'), Some('0'));
        assert_eq!(table.substitute('B'), Some('8'));
        assert_eq!(table.substitute('7'), None);
    }
}
