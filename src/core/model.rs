use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::geometry::{BBox, Quad};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Detection {
    pub text: String,
    pub confidence: f32,
    pub bbox: Quad,
    pub image_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Line {
    pub text: String,
    pub confidence: f32,
    pub item_count: usize,
    pub bbox: BBox,
    pub detections: Vec<Detection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageLines {
    pub image_id: String,
    pub lines: Vec<Line>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FusionMethod {
    #[default]
    Voting,
    Weighted,
    Smart,
    Merge,
}

impl FusionMethod {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "voting" => Some(Self::Voting),
            "weighted" => Some(Self::Weighted),
            "smart" => Some(Self::Smart),
            "merge" => Some(Self::Merge),
            _ => None,
        }
    }

    // Unknown names fall back to voting instead of failing the run.
    pub fn resolve(name: &str) -> Self {
        match Self::from_name(name) {
            Some(method) => method,
            None => {
                warn!(method = %name, "unknown fusion method, falling back to voting");
                Self::Voting
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Voting => "voting",
            Self::Weighted => "weighted",
            Self::Smart => "smart",
            Self::Merge => "merge",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionCandidate {
    pub text: String,
    pub confidence: f32,
    pub occurrence_count: usize,
    pub source_lines: Vec<Line>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FusedLine {
    pub text: String,
    pub confidence: f32,
    pub occurrence_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionResult {
    pub merged_text: String,
    pub lines: Vec<FusedLine>,
    pub method: FusionMethod,
    pub alternatives: Vec<FusionCandidate>,
    pub source_count: usize,
}

impl FusionResult {
    pub fn empty(method: FusionMethod) -> Self {
        Self {
            merged_text: String::new(),
            lines: Vec::new(),
            method,
            alternatives: Vec::new(),
            source_count: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_method_names() {
        assert_eq!(FusionMethod::from_name("Weighted"), Some(FusionMethod::Weighted));
        assert_eq!(FusionMethod::resolve("merge"), FusionMethod::Merge);
    }

    #[test]
    fn unknown_method_falls_back_to_voting() {
        assert_eq!(FusionMethod::from_name("majority"), None);
        assert_eq!(FusionMethod::resolve("majority"), FusionMethod::Voting);
    }

    #[test]
    fn method_serializes_lowercase() {
        let json = serde_json::to_string(&FusionMethod::Smart).unwrap();
        assert_eq!(json, "\"smart\"");
    }
}
