mod candidates;

use std::cmp::Ordering;

use tracing::{debug, warn};

use crate::core::model::{FusedLine, FusionMethod, FusionResult, ImageLines};
use crate::core::similarity::{is_duplicate, SimilarityOptions};
use crate::fusion::candidates::{group_across_images, passthrough, CandidateGroup};

// Tuning for the voting length reward; longer codes carry more signal.
const LENGTH_FACTOR_DIVISOR: f32 = 3.0;
const LENGTH_FACTOR_CAP: f32 = 1.5;

pub struct FusionEngine {
    method: FusionMethod,
    similarity: SimilarityOptions,
    max_alternatives: Option<usize>,
}

struct Scored {
    score: f32,
    confidence: f32,
    group: CandidateGroup,
}

impl FusionEngine {
    pub fn new(
        method: FusionMethod,
        similarity: SimilarityOptions,
        max_alternatives: Option<usize>,
    ) -> Self {
        Self {
            method,
            similarity,
            max_alternatives,
        }
    }

    pub fn fuse(&self, images: &[ImageLines]) -> FusionResult {
        if images.is_empty() {
            warn!("fusion invoked without any image results");
            return FusionResult::empty(self.method);
        }

        let single_image = images.len() == 1;
        let groups = if single_image {
            passthrough(&images[0])
        } else {
            group_across_images(images, &self.similarity)
        };
        if groups.is_empty() {
            let mut result = FusionResult::empty(self.method);
            result.source_count = images.len();
            return result;
        }

        let mut scored: Vec<Scored> = groups.into_iter().map(|g| self.score(g)).collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

        let merged_text = scored[0].group.text.clone();
        debug!(
            method = self.method.name(),
            winner = %merged_text,
            score = scored[0].score,
            candidates = scored.len(),
            "fusion"
        );

        let lines = if single_image {
            // pass-through keeps the image's own line order
            images[0]
                .lines
                .iter()
                .filter(|line| !line.text.trim().is_empty())
                .map(|line| FusedLine {
                    text: line.text.clone(),
                    confidence: line.confidence,
                    occurrence_count: 1,
                })
                .collect()
        } else {
            scored
                .iter()
                .map(|s| FusedLine {
                    text: s.group.text.clone(),
                    confidence: s.confidence,
                    occurrence_count: s.group.occurrence_count(),
                })
                .collect()
        };

        let mut rest = scored.split_off(1);
        if self.method == FusionMethod::Smart {
            rest.retain(|s| is_duplicate(&s.group.text, &merged_text, &self.similarity));
        }
        if let Some(cap) = self.max_alternatives {
            rest.truncate(cap);
        }
        let alternatives = rest
            .into_iter()
            .map(|s| s.group.into_candidate(s.confidence))
            .collect();

        FusionResult {
            merged_text,
            lines,
            method: self.method,
            alternatives,
            source_count: images.len(),
        }
    }

    fn score(&self, group: CandidateGroup) -> Scored {
        let mean = group.mean_confidence();
        let (score, confidence) = match self.method {
            FusionMethod::Voting => (
                group.occurrence_count() as f32 * mean * length_factor(&group.text),
                mean,
            ),
            FusionMethod::Weighted => (group.total_confidence(), mean),
            FusionMethod::Smart => (group.max_confidence, group.max_confidence),
            FusionMethod::Merge => (group.max_confidence, group.max_confidence),
        };
        Scored {
            score,
            confidence,
            group,
        }
    }
}

fn length_factor(text: &str) -> f32 {
    (text.chars().count() as f32 / LENGTH_FACTOR_DIVISOR).min(LENGTH_FACTOR_CAP)
}
