//! Leaf disease analysis: classifier label, spot count, color, annotated
//! image and care suggestions.

use image::{Rgb, RgbImage};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::models::{
    DiseaseDetection, HealthStatus, LeafAnalysis, PlantPart, ProductivityRecommendation,
    ProductivityStatus, Severity, TappabilityAssessment, TreeIdentification, TreeReport,
};
use crate::pipeline::classify::PartClassification;
use crate::pipeline::context::AnalysisContext;
use crate::pipeline::disease::HEALTHY_RECOMMENDATION;
use crate::pipeline::imaging::{annotate_spots, count_spots, dominant_color_name, rgb_to_gray, save_annotated};
use crate::pipeline::inference::ModelKind;
use crate::pipeline::insights::{flatten_lines, flatten_value, LeafInsightRequest};

/// Spot counts above these mark a diseased leaf critical / high.
const CRITICAL_SPOTS: usize = 50;
const HIGH_SPOTS: usize = 20;

/// Displayed confidence never reaches 100%.
const MAX_DISPLAY_CONFIDENCE: f64 = 99.9;

const DEFAULT_RECOMMENDATION: &str = "Maintain regular monitoring.";
const DEFAULT_PREVENTION: &str = "Monitor regularly.";
const DEFAULT_TAPPABILITY_ADVICE: &str = "Check health before tapping.";
const NO_DIAGNOSIS: &str = "No detailed diagnosis available.";

/// Banner colors by severity.
const BANNER_HEALTHY: Rgb<u8> = Rgb([0, 255, 0]);
const BANNER_CRITICAL: Rgb<u8> = Rgb([255, 0, 0]);
const BANNER_HIGH: Rgb<u8> = Rgb([255, 165, 0]);
const BANNER_MODERATE: Rgb<u8> = Rgb([255, 255, 0]);

/// Leaf-specific part of a tree report.
#[derive(Debug, Clone)]
pub struct LeafOutcome {
    pub disease: DiseaseDetection,
    pub leaf: LeafAnalysis,
    pub processed_image_path: Option<String>,
    pub productivity: ProductivityRecommendation,
    pub annotation_label: Option<String>,
}

impl LeafOutcome {
    fn degraded(name: &str, recommendation: &str) -> Self {
        Self {
            disease: DiseaseDetection::placeholder(name, recommendation),
            leaf: LeafAnalysis::unknown(),
            processed_image_path: None,
            productivity: ProductivityRecommendation::unknown(),
            annotation_label: None,
        }
    }
}

/// Run the leaf model over `img` and measure its spots.
///
/// `source` is the original path or URL, used to name the annotated copy.
pub fn analyze_leaf(img: &RgbImage, source: &str, ctx: &AnalysisContext<'_>) -> LeafOutcome {
    let Some(model) = ctx.registry.get(ModelKind::Leaf) else {
        return LeafOutcome::degraded("System Error", "Model unavailable.");
    };

    let prediction = match model.predict(img) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "Leaf model inference failed");
            return LeafOutcome::degraded("Error", "Analysis failed.");
        }
    };
    let Some((label, score)) = prediction.best_label() else {
        warn!("Leaf model returned no classes");
        return LeafOutcome::degraded("Error", "Analysis failed.");
    };

    let disease_name = label.to_string();
    let confidence = score as f64 * 100.0;
    let is_healthy = disease_name.to_lowercase() == "healthy";

    let spots = count_spots(&rgb_to_gray(img));
    let color_name = dominant_color_name(img, None);

    let severity = if is_healthy {
        Severity::None
    } else {
        spot_severity(spots.count)
    };
    let mut label_text = format!("{} ({confidence:.1}%)", disease_name.to_uppercase());
    if !is_healthy {
        label_text.push_str(&format!(" | Spots: {}", spots.count));
    }

    let insights = ctx.insights.leaf(&LeafInsightRequest {
        disease_name: disease_name.clone(),
        confidence,
        spot_count: spots.count as u64,
        color_name: color_name.clone(),
    });

    let base_recommendation = if is_healthy {
        HEALTHY_RECOMMENDATION
    } else {
        DEFAULT_RECOMMENDATION
    };
    let recommendation = insights
        .as_ref()
        .and_then(|m| m.get("treatment"))
        .map(flatten_value)
        .unwrap_or_else(|| base_recommendation.to_string());

    let annotated = annotate_spots(img, &spots.contours, banner_color(severity));
    let processed_image_path = match save_annotated(&annotated, ctx.output_dir, source, ctx.timestamp) {
        Ok(path) => Some(path.display().to_string()),
        Err(e) => {
            warn!(error = %e, "Could not save annotated leaf image");
            None
        }
    };

    let health = if is_healthy {
        HealthStatus::Healthy
    } else {
        HealthStatus::Diseased
    };

    let suggestions = match &insights {
        Some(map) => insight_suggestions(map),
        None => productivity_recommendation(health, &disease_name, severity).suggestions,
    };
    let status = if severity.is_none() {
        ProductivityStatus::Optimal
    } else {
        ProductivityStatus::AtRisk
    };

    info!(
        disease = %disease_name,
        confidence,
        spots = spots.count,
        severity = %severity,
        "Leaf analysed"
    );

    LeafOutcome {
        disease: DiseaseDetection {
            name: disease_name,
            confidence: confidence.min(MAX_DISPLAY_CONFIDENCE),
            severity,
            recommendation,
            ai_diagnosis: insights.as_ref().map(diagnosis_text),
        },
        leaf: LeafAnalysis {
            health_status: health,
            spot_count: spots.count,
            color: color_name,
            detailed_analysis: insights,
        },
        processed_image_path,
        productivity: ProductivityRecommendation { status, suggestions },
        annotation_label: Some(label_text),
    }
}

/// Severity of a diseased leaf from its spot count.
pub fn spot_severity(spots: usize) -> Severity {
    if spots > CRITICAL_SPOTS {
        Severity::Critical
    } else if spots > HIGH_SPOTS {
        Severity::High
    } else {
        Severity::Moderate
    }
}

fn banner_color(severity: Severity) -> Rgb<u8> {
    match severity {
        Severity::None => BANNER_HEALTHY,
        Severity::Critical => BANNER_CRITICAL,
        Severity::High => BANNER_HIGH,
        _ => BANNER_MODERATE,
    }
}

/// `diagnosis` as display text, with a stock line when absent.
pub fn diagnosis_text(insights: &Map<String, Value>) -> String {
    insights
        .get("diagnosis")
        .map(flatten_value)
        .unwrap_or_else(|| NO_DIAGNOSIS.to_string())
}

/// Prevention lines followed by the tappability advice.
fn insight_suggestions(insights: &Map<String, Value>) -> Vec<String> {
    let mut lines = match insights.get("prevention") {
        Some(v) => flatten_lines(v),
        None => vec![DEFAULT_PREVENTION.to_string()],
    };
    lines.push(
        insights
            .get("tappability_advice")
            .map(flatten_value)
            .unwrap_or_else(|| DEFAULT_TAPPABILITY_ADVICE.to_string()),
    );
    lines
}

/// Stock care plan for a tree in the given state.
pub fn productivity_recommendation(
    health: HealthStatus,
    disease_name: &str,
    severity: Severity,
) -> ProductivityRecommendation {
    if health == HealthStatus::Healthy {
        return ProductivityRecommendation {
            status: ProductivityStatus::Optimal,
            suggestions: [
                "Routine maintenance: Ensure regular weeding around the base.",
                "Fertilizer: Apply standard NPK fertilizer schedule.",
                "Tapping: Safe to tap if girth permits (>45cm).",
                "Monitor: Check weekly for any signs of new spots.",
            ]
            .map(String::from)
            .to_vec(),
        };
    }

    let status = match severity {
        Severity::Low | Severity::Moderate => ProductivityStatus::AtRisk,
        _ => ProductivityStatus::Critical,
    };

    let name = disease_name.to_lowercase();
    let mut suggestions: Vec<String> = if name.contains("mildew") {
        vec![
            "Apply sulfur-based fungicide immediately.".into(),
            "Prune heavily infected branches to increase airflow.".into(),
        ]
    } else if name.contains("spot") {
        vec![
            "Apply copper-based fungicide.".into(),
            "Remove and burn fallen infected leaves.".into(),
        ]
    } else if name.contains("blight") {
        vec![
            "Isolate the tree to prevent spread.".into(),
            "Avoid tapping until fully recovered.".into(),
        ]
    } else {
        vec![format!(
            "Consult local agricultural extension for {disease_name} treatment."
        )]
    };

    if severity == Severity::Critical {
        suggestions.push("STOP TAPPING immediately to reduce stress.".into());
        suggestions.push("Consider quarantine measures.".into());
    }
    suggestions.push("Improve soil drainage if waterlogging is suspected.".into());

    ProductivityRecommendation { status, suggestions }
}

/// Wrap a leaf outcome in the full tree envelope.
pub fn leaf_report(classification: &PartClassification, outcome: LeafOutcome) -> TreeReport {
    let is_healthy = outcome.leaf.health_status == HealthStatus::Healthy;
    let tappability = if is_healthy {
        TappabilityAssessment {
            is_tappable: true,
            score: 75,
            reason: "Tree is healthy, proceed to check trunk.".into(),
        }
    } else {
        TappabilityAssessment {
            is_tappable: false,
            score: 40,
            reason: "Treat disease before tapping.".into(),
        }
    };

    TreeReport {
        tree_identification: TreeIdentification::new(
            classification.is_tree,
            classification.confidence * 100.0,
            PlantPart::Leaf,
        ),
        disease_detection: vec![outcome.disease],
        leaf_analysis: Some(outcome.leaf),
        trunk_analysis: None,
        tappability_assessment: tappability,
        productivity_recommendation: outcome.productivity,
        processed_image_path: outcome.processed_image_path,
        annotation_label: outcome.annotation_label,
    }
}
