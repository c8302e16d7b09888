pub mod core;
pub mod export;
pub mod fusion;
pub mod ingest;
pub mod pipeline;
pub mod postprocess;

pub use crate::core::model::{
    Detection, FusedLine, FusionCandidate, FusionMethod, FusionResult, ImageLines, Line,
};
pub use crate::pipeline::{ImageDetections, Pipeline};
