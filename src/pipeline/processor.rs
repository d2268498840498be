//! Analysis orchestrator.
//!
//! Sequence per invocation:
//! 1. Load the image (file or URL)
//! 2. Tree: classify part, apply the sub-mode hint, run leaf or trunk analysis
//! 3. Latex: grade the sample
//! 4. Optionally attach the `aiInsights` digest
//!
//! Every failure becomes a JSON object; `run` always returns a document.

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::config::{AnalyzerConfig, USER_AGENT};
use crate::models::{LatexReport, PlantPart, TreeReport};
use crate::pipeline::classify::classify_content;
use crate::pipeline::context::AnalysisContext;
use crate::pipeline::imaging::load_image;
use crate::pipeline::inference::ModelRegistry;
use crate::pipeline::insights::{fallback_leaf_insights, Insights, LeafInsightRequest};
use crate::pipeline::latex::analyze_latex;
use crate::pipeline::leaf::{analyze_leaf, leaf_report};
use crate::pipeline::summary::{latex_digest, tree_digest};
use crate::pipeline::trunk::analyze_trunk;
use crate::pipeline::AnalyzerError;

/// What the caller wants analysed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum AnalysisMode {
    /// Leaf or trunk image
    Tree,
    /// Latex sample image
    Latex,
    /// LLM insights for an earlier detection (input is JSON)
    #[value(name = "ai_suggestions", alias = "ai-suggestions")]
    AiSuggestions,
}

impl AnalysisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tree => "tree",
            Self::Latex => "latex",
            Self::AiSuggestions => "ai_suggestions",
        }
    }
}

impl std::fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct Analyzer {
    config: AnalyzerConfig,
    registry: ModelRegistry,
    insights: Insights,
}

impl Analyzer {
    /// Analyzer with ONNX models from `config.models_dir` and Groq insights.
    pub fn new(config: AnalyzerConfig) -> Self {
        let registry = ModelRegistry::for_models_dir(&config.models_dir);
        let insights = Insights::from_config(config.llm.as_ref());
        Self::with_parts(config, registry, insights)
    }

    /// Analyzer with caller-supplied model and LLM backends.
    pub fn with_parts(config: AnalyzerConfig, registry: ModelRegistry, insights: Insights) -> Self {
        Self {
            config,
            registry,
            insights,
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Run one analysis and return the JSON document to print.
    pub fn run(&self, mode: AnalysisMode, input: &str, sub_mode: Option<&str>) -> Value {
        info!(%mode, sub_mode = sub_mode.unwrap_or(""), "Starting analysis");
        match self.try_run(mode, input, sub_mode) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(error = %e, "Analysis aborted");
                json!({ "error": e.public_message() })
            }
        }
    }

    fn try_run(
        &self,
        mode: AnalysisMode,
        input: &str,
        sub_mode: Option<&str>,
    ) -> Result<Value, AnalyzerError> {
        if mode == AnalysisMode::AiSuggestions {
            return self.ai_suggestions(input);
        }

        let img = load_image(input, USER_AGENT)?;
        let now = Utc::now();
        let ctx = AnalysisContext {
            registry: &self.registry,
            insights: &self.insights,
            output_dir: &self.config.output_dir,
            timestamp: now.timestamp(),
        };

        let mut doc = match mode {
            AnalysisMode::Tree => serde_json::to_value(self.tree(&img, input, sub_mode, &ctx))?,
            _ => serde_json::to_value(self.latex(&img, &ctx))?,
        };

        if self.config.summary {
            let digest = match mode {
                AnalysisMode::Tree => tree_digest(&doc, now),
                _ => latex_digest(&doc, now),
            };
            let digest = serde_json::to_value(digest)?;
            if let Some(obj) = doc.as_object_mut() {
                obj.insert("aiInsights".into(), digest);
            }
        }
        Ok(doc)
    }

    fn tree(
        &self,
        img: &image::RgbImage,
        source: &str,
        sub_mode: Option<&str>,
        ctx: &AnalysisContext<'_>,
    ) -> TreeReport {
        let classification = classify_content(img, &self.registry).with_sub_mode(sub_mode);
        info!(
            part = %classification.primary_part,
            is_tree = classification.is_tree,
            confidence = classification.confidence,
            "Content classified"
        );

        if classification.primary_part == PlantPart::Leaf {
            return leaf_report(&classification, analyze_leaf(img, source, ctx));
        }

        let mut report = analyze_trunk(img, classification.confidence * 100.0, ctx);
        report.tree_identification.detected_part = PlantPart::Trunk;
        report
    }

    fn latex(&self, img: &image::RgbImage, ctx: &AnalysisContext<'_>) -> LatexReport {
        analyze_latex(img, ctx)
    }

    /// Insights for a detection the caller already has, no image involved.
    fn ai_suggestions(&self, input: &str) -> Result<Value, AnalyzerError> {
        let request: LeafInsightRequest = serde_json::from_str(input)?;
        info!(disease = %request.disease_name, "Generating suggestions");
        let insights = self
            .insights
            .leaf(&request)
            .unwrap_or_else(|| fallback_leaf_insights(&request.disease_name));
        Ok(Value::Object(insights))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::inference::{MockLoader, MockModel, ModelKind, UnavailableLoader};
    use crate::pipeline::insights::MockLlmClient;
    use image::{Rgb, RgbImage};
    use std::path::Path;

    fn config(dir: &Path) -> AnalyzerConfig {
        AnalyzerConfig {
            models_dir: dir.join("models"),
            output_dir: dir.join("out"),
            llm: None,
            summary: false,
        }
    }

    fn write_image(dir: &Path, name: &str, img: &RgbImage) -> String {
        let path = dir.join(name);
        img.save(&path).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn missing_image_is_a_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let analyzer = Analyzer::with_parts(
            config(dir.path()),
            ModelRegistry::new(UnavailableLoader),
            Insights::disabled(),
        );
        let doc = analyzer.run(AnalysisMode::Tree, "/no/such/leaf.png", None);
        assert_eq!(doc, json!({"error": "Failed to load image"}));
    }

    #[test]
    fn trunk_sub_mode_without_models_gives_heuristic_trunk() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_image(dir.path(), "bark.png", &RgbImage::from_pixel(64, 64, Rgb([90, 70, 50])));
        let analyzer = Analyzer::with_parts(
            config(dir.path()),
            ModelRegistry::new(UnavailableLoader),
            Insights::disabled(),
        );
        let doc = analyzer.run(AnalysisMode::Tree, &input, Some("trunk"));
        assert_eq!(doc["treeIdentification"]["detectedPart"], "trunk");
        assert!(doc["trunkAnalysis"].is_object());
        assert!(doc["leafAnalysis"].is_null());
        assert!(doc.get("aiInsights").is_none());
    }

    #[test]
    fn leaf_classification_routes_to_leaf_analysis() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_image(dir.path(), "leaf.png", &RgbImage::from_pixel(64, 64, Rgb([40, 150, 40])));
        let registry = ModelRegistry::new(
            MockLoader::new().with(ModelKind::Leaf, MockModel::classifier(&["Healthy"], &[0.9])),
        );
        let analyzer = Analyzer::with_parts(config(dir.path()), registry, Insights::disabled());
        let doc = analyzer.run(AnalysisMode::Tree, &input, None);
        assert_eq!(doc["treeIdentification"]["detectedPart"], "leaf");
        assert!(doc["leafAnalysis"].is_object());
        assert!(doc["trunkAnalysis"].is_null());
    }

    #[test]
    fn summary_is_attached_on_request() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_image(dir.path(), "latex.png", &RgbImage::from_pixel(32, 32, Rgb([245, 245, 240])));
        let mut cfg = config(dir.path());
        cfg.summary = true;
        let analyzer =
            Analyzer::with_parts(cfg, ModelRegistry::new(UnavailableLoader), Insights::disabled());
        let doc = analyzer.run(AnalysisMode::Latex, &input, None);
        assert_eq!(doc["qualityClassification"]["grade"], "A");
        assert_eq!(doc["aiInsights"]["version"], 1);
        assert_eq!(
            doc["aiInsights"]["promptRecommendations"][0],
            "Improve latex quality from excellent"
        );
    }

    #[test]
    fn ai_suggestions_falls_back_without_llm() {
        let dir = tempfile::tempdir().unwrap();
        let analyzer = Analyzer::with_parts(
            config(dir.path()),
            ModelRegistry::new(UnavailableLoader),
            Insights::disabled(),
        );
        let doc = analyzer.run(
            AnalysisMode::AiSuggestions,
            r#"{"disease_name": "Leaf Blight", "confidence": 88}"#,
            None,
        );
        assert_eq!(doc["diagnosis"], "Detected Leaf Blight. Detailed AI diagnosis unavailable.");
        assert_eq!(doc["tappability_advice"], "Proceed with caution.");
    }

    #[test]
    fn ai_suggestions_returns_llm_reply() {
        let dir = tempfile::tempdir().unwrap();
        let client = MockLlmClient::new(r#"{"diagnosis": "Early blight.", "treatment": ["Copper"]}"#);
        let recorder = client.clone();
        let analyzer = Analyzer::with_parts(
            config(dir.path()),
            ModelRegistry::new(UnavailableLoader),
            Insights::new(Box::new(client)),
        );
        let doc = analyzer.run(AnalysisMode::AiSuggestions, r#"{"disease_name": "Leaf Blight"}"#, None);
        assert_eq!(doc["diagnosis"], "Early blight.");
        assert!(recorder.prompts()[0].contains("Leaf Blight"));
    }

    #[test]
    fn ai_suggestions_rejects_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let analyzer = Analyzer::with_parts(
            config(dir.path()),
            ModelRegistry::new(UnavailableLoader),
            Insights::disabled(),
        );
        let doc = analyzer.run(AnalysisMode::AiSuggestions, "not json", None);
        assert!(doc["error"].as_str().unwrap().contains("expected"));
    }

    #[test]
    fn mode_names_match_cli_keywords() {
        assert_eq!(AnalysisMode::AiSuggestions.to_string(), "ai_suggestions");
        assert_eq!(AnalysisMode::Tree.as_str(), "tree");
    }
}
