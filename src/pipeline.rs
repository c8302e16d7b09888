use rayon::prelude::*;
use tracing::debug;

use crate::core::config::PipelineConfig;
use crate::core::model::{Detection, FusionMethod, FusionResult, ImageLines, Line};
use crate::fusion::FusionEngine;
use crate::postprocess::{dedupe, group_lines, normalize};

#[derive(Debug, Clone)]
pub struct ImageDetections {
    pub image_id: String,
    pub detections: Vec<Detection>,
}

pub struct Pipeline {
    config: PipelineConfig,
    method: FusionMethod,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let method = config.fusion.resolve_method();
        Self { config, method }
    }

    pub fn with_method(config: PipelineConfig, method: FusionMethod) -> Self {
        Self { config, method }
    }

    pub fn method(&self) -> FusionMethod {
        self.method
    }

    pub fn process_image(&self, detections: &[Detection]) -> Vec<Line> {
        let normalized = normalize(detections, &self.config.normalize);
        let deduped = dedupe(&normalized, &self.config.similarity);
        let lines = group_lines(&deduped, &self.config.lines);
        debug!(
            raw = detections.len(),
            kept = deduped.len(),
            lines = lines.len(),
            "image pipeline"
        );
        lines
    }

    // Per-image stages share no state, so images run in parallel; fusion
    // is the join point and only sees the complete set.
    pub fn run(&self, images: &[ImageDetections]) -> FusionResult {
        let mut per_image: Vec<(usize, ImageLines)> = images
            .par_iter()
            .enumerate()
            .map(|(index, image)| {
                let lines = self.process_image(&image.detections);
                (
                    index,
                    ImageLines {
                        image_id: image.image_id.clone(),
                        lines,
                    },
                )
            })
            .collect();
        per_image.sort_by_key(|(index, _)| *index);
        let line_sets: Vec<ImageLines> = per_image.into_iter().map(|(_, lines)| lines).collect();

        let engine = FusionEngine::new(
            self.method,
            self.config.similarity,
            self.config.fusion.max_alternatives,
        );
        engine.fuse(&line_sets)
    }
}
