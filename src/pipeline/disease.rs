//! Trunk detector label → severity and treatment advice.

use crate::models::Severity;

/// Named diseases with a fixed severity and recommendation, checked in order.
const DISEASE_RULES: &[(&str, Severity, &str)] = &[
    (
        "bark rot",
        Severity::High,
        "Bark Rot detected. Apply copper fungicide to affected bark immediately.",
    ),
    (
        "black line",
        Severity::High,
        "Black Line Disease detected. Scrape affected bark and apply fungicide.",
    ),
    (
        "brown root",
        Severity::Critical,
        "Brown Root Disease detected. Isolate tree, treat roots with fungicide, or remove tree if severe.",
    ),
    (
        "white root",
        Severity::Critical,
        "White Root Disease detected. Requires immediate root treatment and soil sterilization.",
    ),
    (
        "dry crust",
        Severity::Moderate,
        "Dry Crust Disease detected. Remove crust and apply protective coating.",
    ),
    (
        "fishbone",
        Severity::High,
        "Fishbone Disease detected. Stop tapping on affected panel and treat with fungicide.",
    ),
    (
        "pink mold",
        Severity::High,
        "Pink Mold Disease detected. Apply fungicidal paste to the tapping panel.",
    ),
    (
        "powdery mildew",
        Severity::Moderate,
        "Powdery Mildew detected. Apply sulfur dust or wettable sulfur.",
    ),
    (
        "leaf pustule",
        Severity::Moderate,
        "Leaf Pustule detected. Monitor canopy health.",
    ),
];

pub const HEALTHY_RECOMMENDATION: &str = "Tree is healthy. Continue routine care.";

/// Result of mapping a detector label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiseaseMapping {
    /// Display name; healthy classes are renamed.
    pub name: String,
    pub severity: Severity,
    pub recommendation: String,
}

/// Map a detector label to a display name, severity and recommendation.
///
/// Matching is case-insensitive on substrings. Healthy classes come first,
/// then named diseases, then generic root/rot fallbacks. Anything else is
/// treated as a high-severity unknown.
pub fn map_trunk_disease(disease_name: &str) -> DiseaseMapping {
    let lower = disease_name.to_lowercase();
    let mapped = |name: &str, severity, recommendation: &str| DiseaseMapping {
        name: name.to_string(),
        severity,
        recommendation: recommendation.to_string(),
    };

    if lower.contains("nayang-normal") || lower.contains("rubber tree") {
        let name = if lower.contains("nayang") {
            "Healthy (Nayang-Normal)"
        } else {
            "Healthy"
        };
        return mapped(name, Severity::None, HEALTHY_RECOMMENDATION);
    }
    if lower.contains("rubber leaves") {
        return mapped(
            "Healthy (Leaf Detected)",
            Severity::None,
            "Healthy tree with visible leaves. Focus on trunk for better analysis.",
        );
    }
    if lower.contains("rubber root") && !lower.contains("disease") {
        return mapped(
            "Healthy (Root Detected)",
            Severity::None,
            "Root appears healthy. Ensure soil drainage is good.",
        );
    }

    if let Some((_, severity, rec)) = DISEASE_RULES.iter().find(|(key, _, _)| lower.contains(key)) {
        return mapped(disease_name, *severity, rec);
    }

    if lower.contains("root") {
        return mapped(
            disease_name,
            Severity::Critical,
            "Root disease detected. Isolate tree and apply fungicide drench.",
        );
    }
    if ["rot", "canker", "mold"].iter().any(|k| lower.contains(k)) {
        return mapped(
            disease_name,
            Severity::High,
            "Apply copper-based fungicide to affected bark area.",
        );
    }

    DiseaseMapping {
        name: disease_name.to_string(),
        severity: Severity::High,
        recommendation: format!("Treatment required for {disease_name}. Consult specialist."),
    }
}
