//! Output records for `tree` mode (leaf and trunk scans).
//!
//! Field names follow the JSON contract of the consuming application:
//! camelCase for most keys, with the historical snake_case keys
//! (`ai_diagnosis`, `detailed_analysis`, `processed_image_path`,
//! `is_immature`) preserved.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::enums::{HealthStatus, PlantPart, ProductivityStatus, Severity};

/// Complete result of a tree scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeReport {
    pub tree_identification: TreeIdentification,
    pub disease_detection: Vec<DiseaseDetection>,
    pub leaf_analysis: Option<LeafAnalysis>,
    pub trunk_analysis: Option<TrunkAnalysis>,
    pub tappability_assessment: TappabilityAssessment,
    pub productivity_recommendation: ProductivityRecommendation,
    #[serde(rename = "processed_image_path")]
    pub processed_image_path: Option<String>,
    /// Text of the on-image label (severity + confidence + spot count).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation_label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeIdentification {
    pub is_rubber_tree: bool,
    /// Percent, 0-100.
    pub confidence: f64,
    pub detected_part: PlantPart,
    pub maturity: String,
}

impl TreeIdentification {
    pub fn new(is_rubber_tree: bool, confidence: f64, detected_part: PlantPart) -> Self {
        Self {
            is_rubber_tree,
            confidence,
            detected_part,
            maturity: "mature".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiseaseDetection {
    pub name: String,
    /// Percent, 0-100.
    pub confidence: f64,
    pub severity: Severity,
    pub recommendation: String,
    pub ai_diagnosis: Option<String>,
}

impl DiseaseDetection {
    /// Placeholder entry used when no real detection could be produced.
    pub fn placeholder(name: &str, recommendation: &str) -> Self {
        Self {
            name: name.into(),
            confidence: 0.0,
            severity: Severity::Unknown,
            recommendation: recommendation.into(),
            ai_diagnosis: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeafAnalysis {
    pub health_status: HealthStatus,
    pub spot_count: usize,
    pub color: String,
    /// Full LLM insight object, when one was obtained.
    #[serde(rename = "detailed_analysis")]
    pub detailed_analysis: Option<Map<String, Value>>,
}

impl LeafAnalysis {
    pub fn unknown() -> Self {
        Self {
            health_status: HealthStatus::Unknown,
            spot_count: 0,
            color: "Unknown".into(),
            detailed_analysis: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrunkAnalysis {
    /// Estimated circumference in cm.
    pub girth: f64,
    /// Estimated diameter in cm.
    pub diameter: f64,
    pub texture: String,
    pub color: String,
    pub health_status: HealthStatus,
    pub damages: Vec<String>,
    /// Only reported by the physical-heuristic path.
    #[serde(rename = "is_immature", default, skip_serializing_if = "Option::is_none")]
    pub is_immature: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TappabilityAssessment {
    pub is_tappable: bool,
    pub score: u32,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductivityRecommendation {
    pub status: ProductivityStatus,
    pub suggestions: Vec<String>,
}

impl ProductivityRecommendation {
    pub fn unknown() -> Self {
        Self {
            status: ProductivityStatus::Unknown,
            suggestions: Vec::new(),
        }
    }
}
