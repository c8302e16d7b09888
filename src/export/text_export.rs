use std::fs;
use std::path::PathBuf;

use anyhow::Result;

use crate::core::model::FusionResult;
use crate::export::Exporter;

#[derive(Debug, Clone)]
pub struct TextExporter {
    out_dir: PathBuf,
}

impl TextExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }
}

impl Exporter for TextExporter {
    fn export(&self, result: &FusionResult) -> Result<()> {
        fs::create_dir_all(&self.out_dir)?;

        let mut text = String::new();
        for line in &result.lines {
            text.push_str(&line.text);
            text.push('\n');
        }

        let path = self.out_dir.join("result.txt");
        fs::write(path, text)?;
        Ok(())
    }
}
