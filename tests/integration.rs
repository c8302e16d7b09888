use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;

use wheelcode::core::config::{CorrectionTable, NormalizeOptions, PipelineConfig};
use wheelcode::core::geometry::Quad;
use wheelcode::core::model::{Detection, FusionMethod};
use wheelcode::export::{Exporter, JsonExporter, TextExporter};
use wheelcode::ingest::load_detections;
use wheelcode::pipeline::{ImageDetections, Pipeline};
use wheelcode::postprocess::normalize;

fn temp_output_dir(prefix: &str) -> PathBuf {
    let mut out = std::env::temp_dir();
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis();
    let pid = std::process::id();
    out.push(format!("{prefix}-{pid}-{now}"));
    out
}

fn detection(text: &str, confidence: f32, x: f32, y: f32) -> Detection {
    Detection {
        text: text.to_string(),
        confidence,
        bbox: Quad::new([(x, y), (x + 80.0, y), (x + 80.0, y + 20.0), (x, y + 20.0)]),
        image_id: "test".to_string(),
    }
}

fn image(id: &str, detections: Vec<Detection>) -> ImageDetections {
    ImageDetections {
        image_id: id.to_string(),
        detections,
    }
}

/// Three angles of the same wheel: two agree, one is a misread.
#[test]
fn voting_fusion_prefers_the_corroborated_reading() {
    let pipeline = Pipeline::new(PipelineConfig::default());
    let images = vec![
        image("angle-1", vec![detection("AT64202", 0.9, 10.0, 20.0)]),
        image("angle-2", vec![detection("AT64202", 0.85, 14.0, 22.0)]),
        image("angle-3", vec![detection("AT46202", 0.6, 11.0, 18.0)]),
    ];

    let result = pipeline.run(&images);

    assert_eq!(result.merged_text, "AT64202");
    assert_eq!(result.source_count, 3);
    assert_eq!(result.method, FusionMethod::Voting);
    assert_eq!(result.lines.len(), 2);
    assert_eq!(result.lines[0].occurrence_count, 2);
    assert_eq!(result.alternatives.len(), 1);
    assert_eq!(result.alternatives[0].text, "AT46202");
    assert_eq!(result.alternatives[0].occurrence_count, 1);
}

/// A single angle degenerates to pass-through for every fusion method.
#[test]
fn single_image_fusion_passes_lines_through() {
    for method in [
        FusionMethod::Voting,
        FusionMethod::Weighted,
        FusionMethod::Smart,
        FusionMethod::Merge,
    ] {
        let pipeline = Pipeline::with_method(PipelineConfig::default(), method);
        let images = vec![image(
            "angle-1",
            vec![
                detection("AT64202", 0.92, 10.0, 20.0),
                detection("0909", 0.9, 10.0, 60.0),
                detection("W1D", 0.86, 100.0, 62.0),
            ],
        )];

        let result = pipeline.run(&images);

        assert_eq!(result.source_count, 1);
        let texts: Vec<_> = result.lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["AT64202", "0909 W1D"]);
        assert!(result.lines.iter().all(|l| l.occurrence_count == 1));
    }
}

#[test]
fn fusing_nothing_returns_an_empty_result() {
    let pipeline = Pipeline::new(PipelineConfig::default());
    let result = pipeline.run(&[]);
    assert!(result.lines.is_empty());
    assert!(result.alternatives.is_empty());
    assert_eq!(result.merged_text, "");
    assert_eq!(result.source_count, 0);
}

/// The documented correction example: configured digit pairs rewrite a
/// misread code without touching its confidence.
#[test]
fn configured_correction_pairs_fix_the_documented_misread() {
    let opts = NormalizeOptions {
        correction_table: CorrectionTable::from_pairs([('7', '2'), ('3', '2')]),
        ..NormalizeOptions::default()
    };
    let output = normalize(&[detection("AT64703", 0.88, 0.0, 0.0)], &opts);
    assert_eq!(output.len(), 1);
    assert_eq!(output[0].text, "AT64202");
    assert_eq!(output[0].confidence, 0.88);
}

/// Full round trip: engine dumps on disk in, exported report out.
#[test]
fn fuse_from_detection_dumps_and_export() -> Result<()> {
    let out = temp_output_dir("wheelcode-integration");
    fs::create_dir_all(&out)?;

    let dumps = [
        (
            "angle-1.json",
            r#"[
                {"text": "AT642O2", "confidence": 0.9, "bbox": [[10, 20], [110, 20], [110, 40], [10, 40]]},
                {"text": "0909", "confidence": 0.88, "bbox": [[10, 60], [60, 60], [60, 80], [10, 80]]},
                {"text": "W1D", "confidence": 0.84, "bbox": [[70, 61], [110, 61], [110, 81], [70, 81]]},
                {"text": "smudge", "confidence": 0.2, "bbox": [[200, 200], [220, 200], [220, 210], [200, 210]]}
            ]"#,
        ),
        (
            "angle-2.json",
            r#"[
                {"text": "AT64202", "confidence": 0.86, "bbox": [[12, 18], [112, 18], [112, 38], [12, 38]]},
                {"text": "bad entry", "bbox": [[0, 0], [1, 0], [1, 1], [0, 1]]}
            ]"#,
        ),
    ];

    let mut images = Vec::new();
    for (name, data) in dumps {
        let path = out.join(name);
        fs::write(&path, data)?;
        images.push(load_detections(&path)?);
    }
    assert_eq!(images[1].detections.len(), 1);

    let pipeline = Pipeline::new(PipelineConfig::default());
    let result = pipeline.run(&images);

    assert_eq!(result.merged_text, "AT64202");
    assert_eq!(result.source_count, 2);
    assert_eq!(result.lines[0].occurrence_count, 2);

    JsonExporter::new(out.clone()).export(&result)?;
    TextExporter::new(out.clone()).export(&result)?;

    let report = fs::read_to_string(out.join("result.json"))?;
    assert!(report.contains("\"success\": true"));
    assert!(report.contains("\"merged_text\": \"AT64202\""));
    assert!(report.contains("\"fusion_method\": \"voting\""));
    assert!(report.contains("\"source_count\": 2"));

    let text = fs::read_to_string(out.join("result.txt"))?;
    assert!(text.contains("AT64202"));

    let _ = fs::remove_dir_all(&out);

    Ok(())
}

/// Per-image results do not depend on what the other images contain.
#[test]
fn adding_an_image_does_not_change_other_images_lines() {
    let pipeline = Pipeline::new(PipelineConfig::default());
    let base = vec![detection("AT64202", 0.9, 10.0, 20.0)];

    let alone = pipeline.process_image(&base);
    let with_more = {
        let images = vec![
            image("angle-1", base.clone()),
            image("angle-2", vec![detection("XK99881", 0.95, 10.0, 20.0)]),
        ];
        let _ = pipeline.run(&images);
        pipeline.process_image(&base)
    };
    assert_eq!(alone, with_more);
}
