use serde::Deserialize;
use serde_json::{Map, Value};

use super::InsightError;

/// Chat-completion backend that answers with a JSON object.
pub trait LlmClient {
    fn complete_json(&self, prompt: &str) -> Result<Map<String, Value>, InsightError>;
}

/// Inputs for a leaf or trunk insight request.
///
/// Doubles as the payload of `ai_suggestions` mode, where missing
/// fields take their defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LeafInsightRequest {
    pub disease_name: String,
    /// Percent, 0-100.
    pub confidence: f64,
    pub spot_count: u64,
    pub color_name: String,
}

impl Default for LeafInsightRequest {
    fn default() -> Self {
        Self {
            disease_name: "Unknown".into(),
            confidence: 0.0,
            spot_count: 0,
            color_name: "Green".into(),
        }
    }
}

/// Inputs for a latex insight request.
#[derive(Debug, Clone)]
pub struct LatexInsightRequest {
    pub latex_type: String,
    /// Percent, 0-100.
    pub confidence: f64,
    pub contamination_level: String,
    pub drc: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_defaults_fill_gaps() {
        let req: LeafInsightRequest = serde_json::from_str(r#"{"disease_name": "Blight"}"#).unwrap();
        assert_eq!(req.disease_name, "Blight");
        assert_eq!(req.color_name, "Green");
        assert_eq!(req.spot_count, 0);
    }

    #[test]
    fn integer_confidence_is_accepted() {
        let req: LeafInsightRequest =
            serde_json::from_str(r#"{"confidence": 87, "spot_count": 4}"#).unwrap();
        assert_eq!(req.confidence, 87.0);
        assert_eq!(req.disease_name, "Unknown");
    }
}
