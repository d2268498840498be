//! Output records for `latex` mode.
//!
//! The model-backed path and the pixel-heuristic path emit different
//! shapes; [`LatexReport`] serializes whichever one was produced.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::enums::{ContaminationLevel, Grade};

/// 8-bit RGB triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// `#rrggbb`, lowercase.
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LatexReport {
    Model(Box<LatexModelReport>),
    Heuristic(LatexHeuristicReport),
}

// ═══════════════════════════════════════════════════════════
// Model-backed report
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatexModelReport {
    pub color_analysis: ColorAnalysis,
    pub quality_classification: QualityClassification,
    pub product_yield_estimation: ProductYieldEstimation,
    pub quantity_estimation: QuantityEstimation,
    pub contamination_detection: ContaminationDetection,
    pub product_recommendation: ProductRecommendation,
    pub market_analysis: Option<Value>,
    pub ai_insights: LatexInsightDigest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorAnalysis {
    pub primary_color: String,
    pub rgb: Rgb,
    pub hex: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityClassification {
    pub grade: Grade,
    pub description: String,
    /// Percent; absent on the heuristic path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductYieldEstimation {
    pub dry_rubber_content: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantityEstimation {
    pub volume: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContaminationDetection {
    pub has_contamination: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contamination_level: Option<ContaminationLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contaminant_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecommendation {
    pub recommended_product: String,
    pub reason: String,
    pub preservation: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatexInsightDigest {
    pub prompt_recommendations: Vec<String>,
    pub suggestions: Vec<String>,
}

// ═══════════════════════════════════════════════════════════
// Heuristic report
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatexHeuristicReport {
    pub latex_color_analysis: LatexColorAnalysis,
    pub latex_quality_prediction: LatexQualityPrediction,
    pub quality_classification: QualityClassification,
    pub product_yield_estimation: ProductYieldEstimation,
    pub quantity_estimation: QuantityEstimation,
    pub contamination_detection: ContaminationDetection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatexColorAnalysis {
    pub primary_color: String,
    pub hex: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatexQualityPrediction {
    pub quality: String,
    pub dry_rubber_content: f64,
    pub estimated_price: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_is_lowercase_and_padded() {
        let rgb = Rgb { r: 250, g: 8, b: 171 };
        assert_eq!(rgb.hex(), "#fa08ab");
    }

    #[test]
    fn heuristic_report_serializes_flat() {
        let report = LatexReport::Heuristic(LatexHeuristicReport {
            latex_color_analysis: LatexColorAnalysis {
                primary_color: "white".into(),
                hex: "#f0f0f0".into(),
            },
            latex_quality_prediction: LatexQualityPrediction {
                quality: "excellent".into(),
                dry_rubber_content: 40.0,
                estimated_price: 0.0,
            },
            quality_classification: QualityClassification {
                grade: Grade::A,
                description: "Excellent quality.".into(),
                confidence: None,
            },
            product_yield_estimation: ProductYieldEstimation {
                dry_rubber_content: 40.0,
                product_type: None,
            },
            quantity_estimation: QuantityEstimation {
                volume: 2.5,
                weight: Some(2.5),
            },
            contamination_detection: ContaminationDetection {
                has_contamination: false,
                contamination_level: None,
                contaminant_types: None,
                details: None,
            },
        });
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["qualityClassification"]["grade"], "A");
        assert!(json["qualityClassification"].get("confidence").is_none());
        assert_eq!(json["quantityEstimation"]["weight"], 2.5);
        assert_eq!(json["contaminationDetection"]["hasContamination"], false);
        assert!(json["contaminationDetection"].get("contaminationLevel").is_none());
        assert_eq!(json["latexColorAnalysis"]["primaryColor"], "white");
    }
}
