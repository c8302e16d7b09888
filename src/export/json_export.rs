use std::fs;
use std::path::PathBuf;

use anyhow::Result;

use crate::core::model::FusionResult;
use crate::export::{Exporter, Report};

#[derive(Debug, Clone)]
pub struct JsonExporter {
    out_dir: PathBuf,
}

impl JsonExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }
}

impl Exporter for JsonExporter {
    fn export(&self, result: &FusionResult) -> Result<()> {
        fs::create_dir_all(&self.out_dir)?;
        let path = self.out_dir.join("result.json");
        let report = Report::from_result(result);
        let data = serde_json::to_string_pretty(&report)?;
        fs::write(path, data)?;
        Ok(())
    }
}
