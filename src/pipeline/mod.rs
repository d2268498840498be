pub mod classify;
pub mod context;
pub mod disease;
pub mod imaging;
pub mod inference;
pub mod insights;
pub mod latex;
pub mod leaf;
pub mod processor; // Mode dispatch, JSON document assembly
pub mod summary; // Optional aiInsights digest
pub mod trunk;

use thiserror::Error;

use imaging::ImagingError;

/// Failures that abort a run. Anything else degrades inside its stage.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("Image unavailable: {0}")]
    Image(#[from] ImagingError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AnalyzerError {
    /// Message placed in the `{"error": ...}` document.
    pub fn public_message(&self) -> String {
        match self {
            Self::Image(_) => "Failed to load image".to_string(),
            Self::Json(e) => e.to_string(),
        }
    }
}
