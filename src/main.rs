use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use wheelcode::core::config::PipelineConfig;
use wheelcode::core::model::FusionMethod;
use wheelcode::export::{Exporter, JsonExporter, TextExporter};
use wheelcode::ingest::load_detections;
use wheelcode::pipeline::{ImageDetections, Pipeline};

#[derive(Parser, Debug)]
#[command(name = "wheelcode")]
#[command(version, about = "Wheel-code OCR post-processing and multi-angle fusion", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fuse detection dumps from one or more angles into a single reading
    Fuse {
        /// Detection dump files, one JSON file per photographed angle
        inputs: Vec<PathBuf>,

        /// Output directory (default: ./wheelcode_output)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Fusion method override
        #[arg(short, long, value_enum)]
        method: Option<MethodArg>,

        /// Pipeline configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Disable progress output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show the grouped text lines for a single image's detections
    Lines {
        /// Detection dump file
        input: PathBuf,

        /// Pipeline configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum MethodArg {
    Voting,
    Weighted,
    Smart,
    Merge,
}

impl From<MethodArg> for FusionMethod {
    fn from(value: MethodArg) -> Self {
        match value {
            MethodArg::Voting => FusionMethod::Voting,
            MethodArg::Weighted => FusionMethod::Weighted,
            MethodArg::Smart => FusionMethod::Smart,
            MethodArg::Merge => FusionMethod::Merge,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fuse {
            inputs,
            output,
            method,
            config,
            quiet,
        } => fuse(inputs, output, method, config, quiet),
        Commands::Lines { input, config } => show_lines(input, config),
    }
}

fn load_config(path: Option<PathBuf>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_toml_path(&path),
        None => Ok(PipelineConfig::default()),
    }
}

fn build_pipeline(config: PipelineConfig, method: Option<MethodArg>) -> Pipeline {
    match method {
        Some(method) => Pipeline::with_method(config, method.into()),
        None => Pipeline::new(config),
    }
}

fn fuse(
    inputs: Vec<PathBuf>,
    output: Option<PathBuf>,
    method: Option<MethodArg>,
    config: Option<PathBuf>,
    quiet: bool,
) -> Result<()> {
    if inputs.is_empty() {
        anyhow::bail!("No input files specified");
    }

    let output_dir = output.unwrap_or_else(|| PathBuf::from("wheelcode_output"));
    let pipeline = build_pipeline(load_config(config)?, method);

    if !quiet {
        println!("[*] Fusing {} angle(s)", inputs.len());
        println!("[*] Method: {}", pipeline.method().name());
        println!("[*] Output: {}", output_dir.display());
    }

    // A dump that cannot be read is excluded; fusion runs on the rest.
    let mut images: Vec<ImageDetections> = Vec::with_capacity(inputs.len());
    for input in &inputs {
        match load_detections(input) {
            Ok(image) => images.push(image),
            Err(e) => eprintln!("  [!] Skipped {}: {}", input.display(), e),
        }
    }

    let result = pipeline.run(&images);

    if !quiet {
        if result.is_empty() {
            println!("\n[!] No text survived post-processing");
        } else {
            println!("\n[+] Merged text: {}", result.merged_text);
            for line in &result.lines {
                println!(
                    "    {} (confidence {:.2}, seen in {} image(s))",
                    line.text, line.confidence, line.occurrence_count
                );
            }
        }
    }

    let json_exporter = JsonExporter::new(output_dir.clone());
    json_exporter
        .export(&result)
        .with_context(|| format!("Failed to export to: {}", output_dir.display()))?;

    let text_exporter = TextExporter::new(output_dir.clone());
    text_exporter
        .export(&result)
        .with_context(|| format!("Failed to export to: {}", output_dir.display()))?;

    if !quiet {
        println!("\n[✓] Done! Results saved to: {}", output_dir.display());
    }

    Ok(())
}

fn show_lines(input: PathBuf, config: Option<PathBuf>) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {}", input.display());
    }

    let pipeline = build_pipeline(load_config(config)?, None);
    let image = load_detections(&input)?;
    let lines = pipeline.process_image(&image.detections);

    println!("Image: {}", image.image_id);
    println!("Lines: {}", lines.len());
    for (i, line) in lines.iter().enumerate() {
        println!(
            "{}. {} (confidence {:.2}, {} block(s))",
            i + 1,
            line.text,
            line.confidence,
            line.item_count
        );
    }

    Ok(())
}
