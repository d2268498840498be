//! Follow-up prompts and suggestion digest for a finished report.
//!
//! Works on the serialized document so it sees exactly what the caller
//! will receive.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::pipeline::insights::flatten_lines;

const MAX_PROMPTS: usize = 5;
const FALLBACK_PROMPT: &str = "Rubber farming tips";
const FALLBACK_SUGGESTION: &str = "Regularly check for pests and diseases.";
const DIGEST_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultDigest {
    pub prompt_recommendations: Vec<String>,
    pub suggestions: Vec<String>,
    pub overall_report: String,
    pub diagnosis: String,
    pub treatment_plan: Vec<String>,
    pub prevention_plan: Vec<String>,
    pub tappability_advice: String,
    pub analysis_timestamp: DateTime<Utc>,
    pub version: u32,
}

#[derive(Default)]
struct DigestBuilder {
    prompts: Vec<String>,
    suggestions: Vec<String>,
    overall_report: String,
    diagnosis: String,
    treatment_plan: Vec<String>,
    prevention_plan: Vec<String>,
    tappability_advice: String,
}

impl DigestBuilder {
    fn finish(self, now: DateTime<Utc>) -> ResultDigest {
        let mut prompts = dedup(self.prompts);
        let mut suggestions = dedup(self.suggestions);
        if prompts.is_empty() {
            prompts.push(FALLBACK_PROMPT.into());
        }
        if suggestions.is_empty() {
            suggestions.push(FALLBACK_SUGGESTION.into());
        }
        prompts.truncate(MAX_PROMPTS);

        ResultDigest {
            prompt_recommendations: prompts,
            suggestions,
            overall_report: self.overall_report,
            diagnosis: self.diagnosis,
            treatment_plan: self.treatment_plan,
            prevention_plan: self.prevention_plan,
            tappability_advice: self.tappability_advice,
            analysis_timestamp: now,
            version: DIGEST_VERSION,
        }
    }
}

/// Keep the first occurrence of each entry, in order.
fn dedup(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

/// Non-empty trimmed lines of an insight value; empty for null.
fn insight_lines(value: Option<&Value>) -> Vec<String> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(v) => flatten_lines(v)
            .into_iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect(),
    }
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// Digest for a `tree` report.
pub fn tree_digest(doc: &Value, now: DateTime<Utc>) -> ResultDigest {
    let mut b = DigestBuilder::default();

    if let Some(disease) = doc
        .get("diseaseDetection")
        .and_then(Value::as_array)
        .and_then(|d| d.first())
    {
        let name = str_field(disease, "name").unwrap_or("Unknown").trim().to_string();

        // The structured insight map lives on the leaf section when present.
        let structured = doc
            .pointer("/leafAnalysis/detailed_analysis")
            .filter(|v| v.is_object());
        if let Some(map) = structured {
            b.diagnosis = map
                .get("diagnosis")
                .map(|v| insight_lines(Some(v)).join(" "))
                .unwrap_or_default();
            b.treatment_plan = insight_lines(map.get("treatment"));
            b.prevention_plan = insight_lines(map.get("prevention"));
            b.tappability_advice = insight_lines(map.get("tappability_advice")).join(" ");
        } else if let Some(text) = str_field(disease, "ai_diagnosis") {
            b.diagnosis = text.trim().to_string();
        }

        let lower = name.to_lowercase();
        let healthy = str_field(disease, "severity") == Some("none")
            || lower.contains("healthy")
            || lower.contains("no disease detected");
        b.overall_report = match (healthy, b.diagnosis.is_empty()) {
            (true, true) => "Tree appears healthy with no major disease signals.".into(),
            (true, false) => format!("Tree appears healthy. {}", b.diagnosis),
            (false, true) => format!(
                "Detected condition: {name}. Immediate treatment and monitoring are advised."
            ),
            (false, false) => format!("Detected condition: {name}. {}", b.diagnosis),
        };

        if !name.is_empty() && name != "No disease detected" {
            b.prompts.push(format!("How do I treat {name}?"));
            b.prompts.push(format!("Prevent {name} spreading"));
            b.suggestions
                .push(format!("Isolate this tree to prevent spread of {name}."));
        } else {
            b.prompts.push("General rubber tree care".into());
            b.prompts.push("Fertilizer recommendations".into());
            b.suggestions
                .push("Tree appears healthy. Maintain regular monitoring.".into());
        }

        if !b.treatment_plan.is_empty() {
            b.suggestions
                .push(format!("Treatment: {}", b.treatment_plan.join("; ")));
        }
        if !b.prevention_plan.is_empty() {
            b.suggestions
                .push(format!("Prevention: {}", b.prevention_plan.join("; ")));
        }
        if !b.tappability_advice.is_empty() {
            b.suggestions
                .push(format!("Tappability: {}", b.tappability_advice));
        }
    }

    if let Some(tappable) = doc
        .pointer("/tappabilityAssessment/isTappable")
        .and_then(Value::as_bool)
    {
        b.prompts.push(if tappable {
            "Best time to tap rubber tree".into()
        } else {
            "When will my tree be ready for tapping?".into()
        });
    }

    b.finish(now)
}

/// Digest for a `latex` report, merging any insights it already carries.
pub fn latex_digest(doc: &Value, now: DateTime<Utc>) -> ResultDigest {
    let mut b = DigestBuilder::default();
    let strings = |ptr: &str| -> Vec<String> {
        doc.pointer(ptr)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    };

    b.prompts.extend(strings("/aiInsights/promptRecommendations"));
    b.suggestions.extend(strings("/aiInsights/suggestions"));

    if let Some(quality) = doc
        .pointer("/latexQualityPrediction/quality")
        .and_then(Value::as_str)
    {
        b.prompts.push(format!("Improve latex quality from {quality}"));
        b.prompts.push("Current rubber market prices".into());
    }
    if doc
        .pointer("/contaminationDetection/hasContamination")
        .and_then(Value::as_bool)
        .unwrap_or(false)
    {
        b.prompts.push("How to remove contamination from latex".into());
        b.suggestions
            .push("Filter latex before processing to remove contaminants.".into());
    }

    b.finish(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn healthy_tree_without_insights() {
        let doc = json!({
            "diseaseDetection": [{"name": "Healthy", "severity": "none", "ai_diagnosis": null}],
            "tappabilityAssessment": {"isTappable": true}
        });
        let d = tree_digest(&doc, now());
        assert_eq!(d.overall_report, "Tree appears healthy with no major disease signals.");
        assert_eq!(
            d.prompt_recommendations,
            vec!["How do I treat Healthy?", "Prevent Healthy spreading", "Best time to tap rubber tree"]
        );
        assert!(d.diagnosis.is_empty());
    }

    #[test]
    fn diseased_leaf_with_structured_insights() {
        let doc = json!({
            "diseaseDetection": [{"name": "Leaf Spot", "severity": "moderate", "ai_diagnosis": "Fungal."}],
            "leafAnalysis": {"detailed_analysis": {
                "diagnosis": "Fungal leaf spot.",
                "treatment": ["Mancozeb", " "],
                "prevention": {"cultural": "Prune"},
                "tappability_advice": "Pause tapping."
            }},
            "tappabilityAssessment": {"isTappable": false}
        });
        let d = tree_digest(&doc, now());
        assert_eq!(d.overall_report, "Detected condition: Leaf Spot. Fungal leaf spot.");
        assert_eq!(d.treatment_plan, vec!["Mancozeb"]);
        assert_eq!(d.prevention_plan, vec!["Cultural: Prune"]);
        assert_eq!(
            d.suggestions,
            vec![
                "Isolate this tree to prevent spread of Leaf Spot.",
                "Treatment: Mancozeb",
                "Prevention: Cultural: Prune",
                "Tappability: Pause tapping.",
            ]
        );
        assert_eq!(d.prompt_recommendations[2], "When will my tree be ready for tapping?");
    }

    #[test]
    fn plain_diagnosis_text_is_used() {
        let doc = json!({"diseaseDetection": [{"name": "Bark Rot", "severity": "high", "ai_diagnosis": "Phytophthora."}]});
        let d = tree_digest(&doc, now());
        assert_eq!(d.overall_report, "Detected condition: Bark Rot. Phytophthora.");
    }

    #[test]
    fn empty_document_gets_fallbacks() {
        let d = tree_digest(&json!({}), now());
        assert_eq!(d.prompt_recommendations, vec![FALLBACK_PROMPT]);
        assert_eq!(d.suggestions, vec![FALLBACK_SUGGESTION]);
        assert_eq!(d.version, 1);
    }

    #[test]
    fn latex_merges_and_dedups() {
        let doc = json!({
            "aiInsights": {
                "promptRecommendations": ["How to improve white quality?", "Current rubber market prices"],
                "suggestions": ["Filter and centrifuge."]
            },
            "latexQualityPrediction": {"quality": "good"},
            "contaminationDetection": {"hasContamination": true}
        });
        let d = latex_digest(&doc, now());
        assert_eq!(
            d.prompt_recommendations,
            vec![
                "How to improve white quality?",
                "Current rubber market prices",
                "Improve latex quality from good",
                "How to remove contamination from latex",
            ]
        );
        assert_eq!(
            d.suggestions,
            vec!["Filter and centrifuge.", "Filter latex before processing to remove contaminants."]
        );
    }

    #[test]
    fn prompts_are_capped() {
        let doc = json!({
            "aiInsights": {"promptRecommendations": ["a", "b", "c", "d", "e", "f"]}
        });
        assert_eq!(latex_digest(&doc, now()).prompt_recommendations.len(), MAX_PROMPTS);
    }

    #[test]
    fn timestamp_serializes_as_rfc3339() {
        let json = serde_json::to_value(latex_digest(&json!({}), now())).unwrap();
        assert_eq!(json["analysisTimestamp"], "2023-11-14T22:13:20Z");
        assert_eq!(json["version"], 1);
    }
}
