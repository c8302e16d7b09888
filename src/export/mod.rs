pub mod json_export;
pub mod text_export;

use anyhow::Result;
use serde::Serialize;

use crate::core::model::{FusionMethod, FusionResult};

pub use json_export::JsonExporter;
pub use text_export::TextExporter;

pub trait Exporter {
    fn export(&self, result: &FusionResult) -> Result<()>;
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub success: bool,
    pub merged_text: String,
    pub fusion_method: FusionMethod,
    pub source_count: usize,
    pub total_lines: usize,
    pub lines: Vec<ReportLine>,
    pub alternatives: Vec<ReportLine>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportLine {
    pub text: String,
    pub confidence: f32,
    pub occurrence_count: usize,
}

impl Report {
    pub fn from_result(result: &FusionResult) -> Self {
        Self {
            success: result.source_count > 0 && !result.is_empty(),
            merged_text: result.merged_text.clone(),
            fusion_method: result.method,
            source_count: result.source_count,
            total_lines: result.lines.len(),
            lines: result
                .lines
                .iter()
                .map(|line| ReportLine {
                    text: line.text.clone(),
                    confidence: line.confidence,
                    occurrence_count: line.occurrence_count,
                })
                .collect(),
            alternatives: result
                .alternatives
                .iter()
                .map(|candidate| ReportLine {
                    text: candidate.text.clone(),
                    confidence: candidate.confidence,
                    occurrence_count: candidate.occurrence_count,
                })
                .collect(),
        }
    }
}
