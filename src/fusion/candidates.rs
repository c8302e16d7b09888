use std::collections::HashSet;

use crate::core::model::{FusionCandidate, ImageLines, Line};
use crate::core::similarity::{is_duplicate, SimilarityOptions};

pub struct CandidateGroup {
    pub text: String,
    pub max_confidence: f32,
    pub members: Vec<GroupMember>,
}

pub struct GroupMember {
    pub image_index: usize,
    pub line: Line,
}

impl CandidateGroup {
    fn new(image_index: usize, line: Line) -> Self {
        Self {
            text: line.text.clone(),
            max_confidence: line.confidence,
            members: vec![GroupMember { image_index, line }],
        }
    }

    fn absorb(&mut self, image_index: usize, line: Line) {
        // the best-read member speaks for the whole group
        if line.confidence > self.max_confidence {
            self.text = line.text.clone();
            self.max_confidence = line.confidence;
        }
        self.members.push(GroupMember { image_index, line });
    }

    pub fn occurrence_count(&self) -> usize {
        self.members
            .iter()
            .map(|m| m.image_index)
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn mean_confidence(&self) -> f32 {
        let confidences: Vec<f32> = self.members.iter().map(|m| m.line.confidence).collect();
        crate::core::confidence::mean(&confidences)
    }

    pub fn total_confidence(&self) -> f32 {
        self.members.iter().map(|m| m.line.confidence).sum()
    }

    pub fn into_candidate(self, confidence: f32) -> FusionCandidate {
        let occurrence_count = self.occurrence_count();
        FusionCandidate {
            text: self.text,
            confidence,
            occurrence_count,
            source_lines: self.members.into_iter().map(|m| m.line).collect(),
        }
    }
}

pub fn group_across_images(images: &[ImageLines], opts: &SimilarityOptions) -> Vec<CandidateGroup> {
    let mut groups: Vec<CandidateGroup> = Vec::new();
    for (image_index, image) in images.iter().enumerate() {
        for line in &image.lines {
            if line.text.trim().is_empty() {
                continue;
            }
            match groups
                .iter_mut()
                .find(|g| is_duplicate(&line.text, &g.text, opts))
            {
                Some(group) => group.absorb(image_index, line.clone()),
                None => groups.push(CandidateGroup::new(image_index, line.clone())),
            }
        }
    }
    groups
}

// A single image needs no cross-image grouping; every line stands alone.
pub fn passthrough(image: &ImageLines) -> Vec<CandidateGroup> {
    image
        .lines
        .iter()
        .filter(|line| !line.text.trim().is_empty())
        .map(|line| CandidateGroup::new(0, line.clone()))
        .collect()
}
