//! Latex quality grading.
//!
//! The latex model names the sample type. Pixels inside the latex region
//! then give its color and debris share, which refine grade and DRC.

use image::{GrayImage, RgbImage};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::models::{
    ColorAnalysis, ContaminationDetection, ContaminationLevel, Grade, LatexColorAnalysis,
    LatexHeuristicReport, LatexInsightDigest, LatexModelReport, LatexQualityPrediction,
    LatexReport, ProductRecommendation, ProductYieldEstimation, QualityClassification,
    QuantityEstimation, Rgb,
};
use crate::pipeline::context::AnalysisContext;
use crate::pipeline::imaging::{
    center_third_mask, count_nonzero, dark_ratio, masked_dark_ratio, mask_union, mean_hsv,
    mean_rgb, open_close, rect_mask, rgb_to_gray, HsvImage,
};
use crate::pipeline::inference::ModelKind;
use crate::pipeline::insights::{flatten_value, LatexInsightRequest};

/// HSV bands for fresh (white/cream) and oxidised (yellow) latex.
const WHITE_LO: [u8; 3] = [0, 0, 100];
const WHITE_HI: [u8; 3] = [180, 60, 255];
const YELLOW_LO: [u8; 3] = [15, 60, 100];
const YELLOW_HI: [u8; 3] = [40, 200, 255];

/// Segmentation covering less than this share of the frame is discarded.
const MIN_MASK_COVERAGE: f64 = 0.05;

/// Luma at or below which a latex pixel counts as debris.
const DEBRIS_MAX_LUMA: u8 = 90;

/// Luma at or below which a pixel counts as contamination (heuristic path).
const HEURISTIC_DARK_LUMA: u8 = 100;

/// Debris share that lowers the grade.
const DEBRIS_DOWNGRADE_RATIO: f64 = 0.05;
/// Debris share reported as a "Debris" contaminant.
const DEBRIS_REPORT_RATIO: f64 = 0.02;
/// Debris share that counts as contaminated at all.
const CONTAMINATION_RATIO: f64 = 0.01;

const MIN_DRC: f64 = 5.0;

const DEFAULT_PROCESSING_ADVICE: &str = "Filter and centrifuge.";
const DEFAULT_PRODUCT_TYPE: &str = "USS";
const DEFAULT_CONTAMINATION_DETAILS: &str = "Filter required";
const DEFAULT_PRESERVATION: &str = "Use Ammonia";
const DEFAULT_PRESERVATION_SUGGESTION: &str = "Check for pre-coagulation";

// ═══════════════════════════════════════════════════════════
// Class rules
// ═══════════════════════════════════════════════════════════

/// Grade, DRC and contamination implied by a latex class name.
#[derive(Debug, Clone, PartialEq)]
pub struct LatexAssessment {
    pub grade: Grade,
    pub drc: f64,
    pub level: ContaminationLevel,
    pub description: String,
    pub primary_color: String,
}

/// Grade a latex class, then adjust for the measured debris share.
pub fn assess_latex(latex_type: &str, debris_ratio: f64) -> LatexAssessment {
    let lower = latex_type.to_lowercase();
    let base = |grade, drc, level, description: &str, color: &str| LatexAssessment {
        grade,
        drc,
        level,
        description: description.to_string(),
        primary_color: color.to_string(),
    };

    let mut a = if lower.contains("white") {
        base(Grade::A, 40.0, ContaminationLevel::Low, "High quality fresh white latex.", "White Latex")
    } else if lower.contains("yellow") {
        base(Grade::C, 32.0, ContaminationLevel::Medium, "Yellowish/Oxidized latex detected.", "Yellow/Oxidized")
    } else if lower.contains("water") {
        base(Grade::D, 15.0, ContaminationLevel::High, "Diluted or contaminated with water.", "Water/Diluted")
    } else if lower.contains("lump") || lower.contains("cup") {
        base(Grade::B, 55.0, ContaminationLevel::Low, "Cup lump detected.", "Cup Lump")
    } else {
        LatexAssessment {
            grade: Grade::B,
            drc: 35.0,
            level: ContaminationLevel::Low,
            description: format!("Detected: {latex_type}"),
            primary_color: title_case(latex_type),
        }
    };

    if lower.contains("water") {
        a.level = ContaminationLevel::High;
    } else if debris_ratio > DEBRIS_DOWNGRADE_RATIO {
        a.grade = a.grade.downgrade();
        a.drc -= 2.0;
        if a.level != ContaminationLevel::High {
            a.level = ContaminationLevel::Medium;
        }
        a.description.push_str(" Debris detected.");
    }
    a.drc = a.drc.max(MIN_DRC);
    a
}

/// Capitalise each whitespace-separated word.
fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ═══════════════════════════════════════════════════════════
// Region selection
// ═══════════════════════════════════════════════════════════

/// Latex-colored pixels, cleaned with open+close. Falls back to the
/// central third when too little of the frame matches.
pub fn latex_color_mask(img: &RgbImage) -> GrayImage {
    let hsv = HsvImage::from_rgb(img);
    let mask = open_close(&mask_union(
        &hsv.in_range(WHITE_LO, WHITE_HI),
        &hsv.in_range(YELLOW_LO, YELLOW_HI),
    ));

    let total = img.width() as f64 * img.height() as f64;
    if (count_nonzero(&mask) as f64) < total * MIN_MASK_COVERAGE {
        warn!("Latex segmentation failed, falling back to center crop");
        return center_third_mask(img.width(), img.height());
    }
    mask
}

fn rgb_of(mean: [f64; 3]) -> Rgb {
    Rgb {
        r: mean[0] as u8,
        g: mean[1] as u8,
        b: mean[2] as u8,
    }
}

// ═══════════════════════════════════════════════════════════
// Analysis
// ═══════════════════════════════════════════════════════════

/// Model-backed latex report, or the heuristic one without a usable model.
pub fn analyze_latex(img: &RgbImage, ctx: &AnalysisContext<'_>) -> LatexReport {
    let Some(model) = ctx.registry.get(ModelKind::Latex) else {
        return LatexReport::Heuristic(analyze_latex_heuristic(img));
    };
    let prediction = match model.predict(img) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "Latex model inference failed");
            return LatexReport::Heuristic(analyze_latex_heuristic(img));
        }
    };

    let (latex_type, confidence) = prediction
        .best_label()
        .map(|(label, score)| (label.to_string(), score as f64 * 100.0))
        .unwrap_or_else(|| ("Unknown".to_string(), 0.0));
    info!(latex_type = %latex_type, confidence, "Latex model prediction");

    let (width, height) = img.dimensions();
    let mask = match prediction.best_box() {
        Some(b) => {
            let (x1, y1, x2, y2) = b.envelope(width, height);
            rect_mask(width, height, x1, y1, x2, y2)
        }
        None => latex_color_mask(img),
    };

    let rgb = rgb_of(mean_rgb(img, Some(&mask)));
    let debris = masked_dark_ratio(&rgb_to_gray(img), &mask, DEBRIS_MAX_LUMA);
    let assessment = assess_latex(&latex_type, debris);

    let insights = ctx.insights.latex(&LatexInsightRequest {
        latex_type: latex_type.clone(),
        confidence,
        contamination_level: assessment.level.to_string(),
        drc: assessment.drc,
    });

    LatexReport::Model(Box::new(model_report(
        &latex_type,
        confidence,
        rgb,
        debris,
        assessment,
        insights.as_ref(),
    )))
}

fn model_report(
    latex_type: &str,
    confidence: f64,
    rgb: Rgb,
    debris: f64,
    assessment: LatexAssessment,
    insights: Option<&Map<String, Value>>,
) -> LatexModelReport {
    let text = |key: &str, default: &str| {
        insights
            .and_then(|m| m.get(key))
            .map(flatten_value)
            .unwrap_or_else(|| default.to_string())
    };

    let processing_advice = text("processing_advice", DEFAULT_PROCESSING_ADVICE);
    let contaminant_types = if assessment.level == ContaminationLevel::High {
        vec!["Water".to_string()]
    } else if debris > DEBRIS_REPORT_RATIO {
        vec!["Debris".to_string()]
    } else {
        Vec::new()
    };
    let suggestions = if insights.is_some() {
        vec![
            processing_advice.clone(),
            text("preservation_tips", DEFAULT_PRESERVATION_SUGGESTION),
        ]
    } else {
        vec![processing_advice.clone()]
    };

    debug!(debris, grade = %assessment.grade, "Latex graded");

    LatexModelReport {
        color_analysis: ColorAnalysis {
            primary_color: assessment.primary_color,
            hex: rgb.hex(),
            rgb,
        },
        quality_classification: QualityClassification {
            grade: assessment.grade,
            description: text("quality_assessment", &assessment.description),
            confidence: Some(confidence),
        },
        product_yield_estimation: ProductYieldEstimation {
            dry_rubber_content: assessment.drc,
            product_type: Some(text("market_value_insight", DEFAULT_PRODUCT_TYPE)),
        },
        quantity_estimation: QuantityEstimation {
            volume: 0.0,
            weight: None,
        },
        contamination_detection: ContaminationDetection {
            has_contamination: debris > CONTAMINATION_RATIO,
            contamination_level: Some(assessment.level),
            contaminant_types: Some(contaminant_types),
            details: Some(text("contamination_handling", DEFAULT_CONTAMINATION_DETAILS)),
        },
        product_recommendation: ProductRecommendation {
            recommended_product: if assessment.grade.is_sheet_grade() {
                "RSS (Ribbed Smoked Sheet)".into()
            } else {
                "Cup Lump".into()
            },
            reason: processing_advice,
            preservation: text("preservation_tips", DEFAULT_PRESERVATION),
        },
        market_analysis: insights.and_then(|m| m.get("market_analysis")).cloned(),
        ai_insights: LatexInsightDigest {
            prompt_recommendations: vec![
                format!("How to improve {latex_type} quality?"),
                "Best preservation methods for latex".into(),
                "Current rubber market prices".into(),
            ],
            suggestions,
        },
    }
}

/// Whole-frame color and darkness rules, used without a latex model.
pub fn analyze_latex_heuristic(img: &RgbImage) -> LatexHeuristicReport {
    let [_, saturation, value] = mean_hsv(&HsvImage::from_rgb(img), None);
    let rgb = rgb_of(mean_rgb(img, None));
    let contamination = dark_ratio(&rgb_to_gray(img), HEURISTIC_DARK_LUMA);

    let (grade, drc, description) = if contamination > DEBRIS_DOWNGRADE_RATIO {
        (Grade::D, 30.0, "High contamination.")
    } else if saturation > 50.0 {
        (Grade::C, 35.0, "Discolored.")
    } else if value < 150.0 {
        (Grade::B, 38.0, "Dark impurities.")
    } else {
        (Grade::A, 40.0, "Excellent quality.")
    };

    info!(grade = %grade, contamination, "Latex graded heuristically");

    LatexHeuristicReport {
        latex_color_analysis: LatexColorAnalysis {
            primary_color: "white".into(),
            hex: rgb.hex(),
        },
        latex_quality_prediction: LatexQualityPrediction {
            quality: if grade == Grade::A { "excellent" } else { "good" }.into(),
            dry_rubber_content: drc,
            estimated_price: 0.0,
        },
        quality_classification: QualityClassification {
            grade,
            description: description.into(),
            confidence: None,
        },
        product_yield_estimation: ProductYieldEstimation {
            dry_rubber_content: drc,
            product_type: None,
        },
        quantity_estimation: QuantityEstimation {
            volume: 2.5,
            weight: Some(2.5),
        },
        contamination_detection: ContaminationDetection {
            has_contamination: contamination > CONTAMINATION_RATIO,
            contamination_level: None,
            contaminant_types: None,
            details: None,
        },
    }
}
