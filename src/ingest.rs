use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

use crate::core::geometry::Quad;
use crate::core::model::Detection;
use crate::pipeline::ImageDetections;

// One engine detection as dumped by the recognition side: a text, an
// optional score, and a four-point polygon.
#[derive(Debug, Deserialize)]
struct RawDetection {
    text: String,
    #[serde(default)]
    confidence: Option<f32>,
    bbox: Vec<[f32; 2]>,
}

pub fn load_detections(path: &Path) -> Result<ImageDetections> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read detections: {}", path.display()))?;
    let image_id = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    parse_detections(&data, &image_id)
        .with_context(|| format!("failed to parse detections: {}", path.display()))
}

pub fn parse_detections(data: &str, image_id: &str) -> Result<ImageDetections> {
    let raw: Vec<RawDetection> = serde_json::from_str(data)?;
    let mut detections = Vec::with_capacity(raw.len());
    for entry in raw {
        let Some(confidence) = entry.confidence else {
            warn!(image = image_id, text = %entry.text, "skipping detection without confidence");
            continue;
        };
        let Some(bbox) = quad_from_points(&entry.bbox) else {
            warn!(
                image = image_id,
                text = %entry.text,
                points = entry.bbox.len(),
                "skipping detection with malformed bbox"
            );
            continue;
        };
        detections.push(Detection {
            text: entry.text,
            confidence,
            bbox,
            image_id: image_id.to_string(),
        });
    }
    Ok(ImageDetections {
        image_id: image_id.to_string(),
        detections,
    })
}

fn quad_from_points(points: &[[f32; 2]]) -> Option<Quad> {
    let points: [[f32; 2]; 4] = points.try_into().ok()?;
    Some(Quad::new(points.map(|[x, y]| (x, y))))
}
