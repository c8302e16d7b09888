use std::cmp::Ordering;

use tracing::debug;

use crate::core::confidence::cluster_boost;
use crate::core::model::Detection;
use crate::core::similarity::{is_duplicate, SimilarityOptions};

struct Cluster {
    representative: Detection,
    size: usize,
}

pub fn dedupe(detections: &[Detection], opts: &SimilarityOptions) -> Vec<Detection> {
    if detections.is_empty() {
        return Vec::new();
    }

    // Stable sort: equal confidences keep their input order, which makes
    // the clustering reproducible.
    let mut ordered: Vec<&Detection> = detections.iter().collect();
    ordered.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut clusters: Vec<Cluster> = Vec::new();
    for detection in ordered {
        match clusters
            .iter_mut()
            .find(|c| is_duplicate(&detection.text, &c.representative.text, opts))
        {
            Some(cluster) => cluster.size += 1,
            None => clusters.push(Cluster {
                representative: detection.clone(),
                size: 1,
            }),
        }
    }
    debug!(before = detections.len(), after = clusters.len(), "deduplication");

    let mut survivors: Vec<Detection> = clusters
        .into_iter()
        .map(|cluster| {
            let mut detection = cluster.representative;
            detection.confidence = cluster_boost(detection.confidence, cluster.size);
            detection
        })
        .collect();
    survivors.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });
    survivors
}
