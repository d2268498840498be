use std::path::Path;

use super::inference::ModelRegistry;
use super::insights::Insights;

/// Shared handles for one analysis run.
#[derive(Clone, Copy)]
pub struct AnalysisContext<'a> {
    pub registry: &'a ModelRegistry,
    pub insights: &'a Insights,
    /// Where annotated images are written.
    pub output_dir: &'a Path,
    /// Unix seconds, used in output file names.
    pub timestamp: i64,
}
