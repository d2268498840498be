//! Trunk analysis: detector label mapped to a disease, plus physical
//! estimates (girth, texture, color) measured from pixels.

use image::RgbImage;
use tracing::{info, warn};

use crate::models::{
    DiseaseDetection, HealthStatus, PlantPart, ProductivityRecommendation, ProductivityStatus,
    Severity, TappabilityAssessment, TreeIdentification, TreeReport, TrunkAnalysis,
};
use crate::pipeline::context::AnalysisContext;
use crate::pipeline::disease::map_trunk_disease;
use crate::pipeline::imaging::{
    canny_row_span, center_crop, dominant_color_name, laplacian_variance, rgb_to_gray,
};
use crate::pipeline::inference::{ModelKind, Prediction};
use crate::pipeline::insights::{flatten_value, LeafInsightRequest};
use crate::pipeline::leaf::diagnosis_text;

/// Assumed field of view: the frame spans one metre.
const FRAME_WIDTH_CM: f64 = 100.0;

/// Share of the frame taken as trunk width when no edges are found.
const FALLBACK_WIDTH_RATIO: f64 = 0.4;

const PI_APPROX: f64 = 3.14159;
const MIN_GIRTH_CM: f64 = 10.0;
const MAX_GIRTH_CM: f64 = 150.0;

/// Girth below which a tree is too young to tap.
const IMMATURE_GIRTH_CM: f64 = 40.0;

/// Girth a healthy tree needs before tapping.
const TAPPABLE_GIRTH_CM: f64 = 45.0;

/// Laplacian variance thresholds for bark texture.
const ROUGH_VARIANCE: f64 = 500.0;
const DAMAGED_VARIANCE: f64 = 1500.0;

/// Pixel-derived trunk properties.
#[derive(Debug, Clone, PartialEq)]
pub struct TrunkPhysical {
    pub girth: f64,
    pub diameter: f64,
    pub texture: String,
    pub color: String,
    pub is_immature: bool,
}

/// Estimate girth, texture and color of the trunk in `img`.
///
/// `box_width` is the detected trunk width in pixels; without it the width
/// comes from Canny edges on the middle row, then from a fixed share of
/// the frame.
pub fn trunk_physical(img: &RgbImage, box_width: Option<f32>) -> TrunkPhysical {
    let width = img.width().max(1) as f64;
    let gray = rgb_to_gray(img);

    let pixel_width = box_width
        .map(f64::from)
        .filter(|&w| w > 0.0)
        .or_else(|| canny_row_span(&gray, img.height() / 2).map(f64::from))
        .unwrap_or(width * FALLBACK_WIDTH_RATIO);

    let cm_per_pixel = FRAME_WIDTH_CM / width;
    let girth = (pixel_width * cm_per_pixel * PI_APPROX).clamp(MIN_GIRTH_CM, MAX_GIRTH_CM);
    let diameter = girth / PI_APPROX;

    let variance = laplacian_variance(&center_crop(&gray));
    let texture = if variance > DAMAGED_VARIANCE {
        "very rough/damaged"
    } else if variance > ROUGH_VARIANCE {
        "rough"
    } else {
        "smooth"
    };

    TrunkPhysical {
        girth: round1(girth),
        diameter: round1(diameter),
        texture: texture.into(),
        color: trunk_color_name(&dominant_color_name(&center_crop(img), None)),
        is_immature: girth < IMMATURE_GIRTH_CM,
    }
}

/// Reword a generic color bucket for bark.
fn trunk_color_name(name: &str) -> String {
    let mut color = name.to_string();
    if color.contains("Green") {
        color = "Mossy/Greenish".into();
    }
    if color.contains("Yellow") {
        color = "Pale/Yellowish".into();
    }
    color
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Full trunk report. Falls back to [`trunk_heuristic_report`] without a
/// usable trunk model.
///
/// `base_confidence` (percent) comes from part classification and is used
/// when the model gives no confidence of its own.
pub fn analyze_trunk(img: &RgbImage, base_confidence: f64, ctx: &AnalysisContext<'_>) -> TreeReport {
    let Some(model) = ctx.registry.get(ModelKind::Trunk) else {
        return trunk_heuristic_report(img);
    };
    let prediction = match model.predict(img) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "Trunk model inference failed");
            return trunk_heuristic_report(img);
        }
    };

    let (raw_name, mut confidence, box_width) = match &prediction {
        Prediction::Detection(_) => match prediction.best_box() {
            Some(b) => (b.label.clone(), b.confidence as f64 * 100.0, Some(b.pixel_width())),
            None => ("Healthy".to_string(), base_confidence, None),
        },
        Prediction::Classification(_) => match prediction.top1() {
            Some(c) => (c.label.clone(), c.score as f64 * 100.0, None),
            None => ("Healthy".to_string(), base_confidence, None),
        },
    };
    if confidence == 0.0 && base_confidence > 0.0 {
        confidence = base_confidence;
    }

    let mapping = map_trunk_disease(&raw_name);
    let healthy = mapping.severity.is_none();
    info!(disease = %mapping.name, confidence, "Trunk model prediction");

    let physical = trunk_physical(img, box_width);

    let insights = ctx.insights.leaf(&LeafInsightRequest {
        disease_name: mapping.name.clone(),
        confidence,
        spot_count: 0,
        color_name: physical.color.clone(),
    });
    let recommendation = insights
        .as_ref()
        .and_then(|m| m.get("treatment"))
        .map(flatten_value)
        .unwrap_or_else(|| mapping.recommendation.clone());

    let tappability = TappabilityAssessment {
        is_tappable: healthy && physical.girth > TAPPABLE_GIRTH_CM,
        score: if healthy { 85 } else { 30 },
        reason: if healthy {
            "Tree is healthy.".into()
        } else {
            format!("Untappable due to {}.", mapping.name)
        },
    };

    TreeReport {
        tree_identification: TreeIdentification::new(true, confidence, PlantPart::Trunk),
        disease_detection: vec![DiseaseDetection {
            name: mapping.name.clone(),
            confidence,
            severity: mapping.severity,
            recommendation: recommendation.clone(),
            ai_diagnosis: insights.as_ref().map(diagnosis_text),
        }],
        leaf_analysis: None,
        trunk_analysis: Some(TrunkAnalysis {
            girth: physical.girth,
            diameter: physical.diameter,
            texture: physical.texture,
            color: physical.color,
            health_status: if healthy {
                HealthStatus::Healthy
            } else {
                HealthStatus::Diseased
            },
            damages: if healthy { Vec::new() } else { vec![mapping.name] },
            is_immature: None,
        }),
        tappability_assessment: tappability,
        productivity_recommendation: ProductivityRecommendation {
            status: if healthy {
                ProductivityStatus::Optimal
            } else {
                ProductivityStatus::Critical
            },
            suggestions: vec![recommendation],
        },
        processed_image_path: None,
        annotation_label: None,
    }
}

/// Trunk report from physical measurements alone.
pub fn trunk_heuristic_report(img: &RgbImage) -> TreeReport {
    let physical = trunk_physical(img, None);
    let suitable = physical.girth > TAPPABLE_GIRTH_CM;

    TreeReport {
        tree_identification: TreeIdentification::new(true, 100.0, PlantPart::Trunk),
        disease_detection: vec![DiseaseDetection {
            name: "No disease detected (Heuristic)".into(),
            confidence: 0.0,
            severity: Severity::None,
            recommendation: "Trunk analysis limited to physical properties.".into(),
            ai_diagnosis: None,
        }],
        leaf_analysis: None,
        trunk_analysis: Some(TrunkAnalysis {
            girth: physical.girth,
            diameter: physical.diameter,
            texture: physical.texture,
            color: physical.color,
            health_status: HealthStatus::Unknown,
            damages: Vec::new(),
            is_immature: Some(physical.is_immature),
        }),
        tappability_assessment: TappabilityAssessment {
            is_tappable: suitable,
            score: if suitable { 85 } else { 40 },
            reason: if suitable {
                "Suitable girth.".into()
            } else {
                "Girth too small.".into()
            },
        },
        productivity_recommendation: ProductivityRecommendation {
            status: ProductivityStatus::Optimal,
            suggestions: vec!["Monitor growth.".into()],
        },
        processed_image_path: None,
        annotation_label: None,
    }
}
