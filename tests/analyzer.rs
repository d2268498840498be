//! End-to-end runs through the public `Analyzer` API with mocked model and
//! LLM backends.

use std::path::Path;

use image::{Rgb, RgbImage};
use rubbersense_lib::config::AnalyzerConfig;
use rubbersense_lib::pipeline::inference::{DetectedBox, MockLoader, MockModel, ModelKind, ModelRegistry};
use rubbersense_lib::pipeline::insights::{Insights, MockLlmClient};
use rubbersense_lib::pipeline::processor::{AnalysisMode, Analyzer};

fn config(dir: &Path, summary: bool) -> AnalyzerConfig {
    AnalyzerConfig {
        models_dir: dir.join("weights"),
        output_dir: dir.join("temp_output"),
        llm: None,
        summary,
    }
}

/// Green leaf with three dark lesions.
fn spotted_leaf(dir: &Path) -> String {
    let mut img = RgbImage::from_pixel(120, 120, Rgb([40, 150, 40]));
    for (ox, oy) in [(20, 20), (60, 30), (40, 80)] {
        for y in oy..oy + 8 {
            for x in ox..ox + 8 {
                img.put_pixel(x, y, Rgb([15, 10, 5]));
            }
        }
    }
    let path = dir.join("leaf_07.png");
    img.save(&path).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn leaf_scan_with_insights_and_summary() {
    let dir = tempfile::tempdir().unwrap();
    let input = spotted_leaf(dir.path());

    let registry = ModelRegistry::new(MockLoader::new().with(
        ModelKind::Leaf,
        MockModel::classifier(&["Leaf Spot", "Healthy"], &[0.9, 0.1]),
    ));
    let llm = MockLlmClient::new(
        r#"{
            "diagnosis": "Corynespora leaf spot.",
            "treatment": ["Spray mancozeb", "Remove fallen leaves"],
            "prevention": "Improve airflow.",
            "severity_reasoning": "Few lesions.",
            "tappability_advice": "Reduce tapping frequency."
        }"#,
    );
    let recorder = llm.clone();
    let analyzer = Analyzer::with_parts(
        config(dir.path(), true),
        registry,
        Insights::new(Box::new(llm)),
    );

    let doc = analyzer.run(AnalysisMode::Tree, &input, None);

    assert_eq!(doc["treeIdentification"]["detectedPart"], "leaf");
    let disease = &doc["diseaseDetection"][0];
    assert_eq!(disease["name"], "Leaf Spot");
    assert_eq!(disease["severity"], "moderate");
    assert!((disease["confidence"].as_f64().unwrap() - 90.0).abs() < 1e-3);
    assert_eq!(disease["recommendation"], "Spray mancozeb; Remove fallen leaves");
    assert_eq!(doc["leafAnalysis"]["spotCount"], 3);
    assert_eq!(doc["leafAnalysis"]["healthStatus"], "diseased");
    assert_eq!(doc["tappabilityAssessment"]["isTappable"], false);

    let processed = doc["processed_image_path"].as_str().unwrap();
    assert!(Path::new(processed).is_file());
    assert!(processed.ends_with("_leaf_07.png"));

    let prompts = recorder.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Leaf Spot"));

    let digest = &doc["aiInsights"];
    assert_eq!(
        digest["overallReport"],
        "Detected condition: Leaf Spot. Corynespora leaf spot."
    );
    assert_eq!(digest["promptRecommendations"][0], "How do I treat Leaf Spot?");
    assert_eq!(digest["tappabilityAdvice"], "Reduce tapping frequency.");
    assert_eq!(digest["version"], 1);
}

#[test]
fn diseased_trunk_blocks_tapping() {
    let dir = tempfile::tempdir().unwrap();
    let bark = RgbImage::from_pixel(200, 200, Rgb([95, 75, 55]));
    let input = dir.path().join("trunk.jpg");
    bark.save(&input).unwrap();

    let registry = ModelRegistry::new(MockLoader::new().with(
        ModelKind::Trunk,
        MockModel::detector(vec![DetectedBox {
            class_id: 1,
            label: "Bark Rot".into(),
            confidence: 0.8,
            x1: 40.0,
            y1: 10.0,
            x2: 160.0,
            y2: 190.0,
            angle: None,
        }]),
    ));
    let analyzer = Analyzer::with_parts(config(dir.path(), false), registry, Insights::disabled());

    let doc = analyzer.run(AnalysisMode::Tree, &input.to_string_lossy(), Some("trunk"));

    assert_eq!(doc["treeIdentification"]["detectedPart"], "trunk");
    let disease = &doc["diseaseDetection"][0];
    assert_eq!(disease["name"], "Bark Rot");
    assert_eq!(disease["severity"], "high");
    assert_eq!(
        disease["recommendation"],
        "Bark Rot detected. Apply copper fungicide to affected bark immediately."
    );
    assert_eq!(doc["tappabilityAssessment"]["isTappable"], false);
    assert_eq!(doc["tappabilityAssessment"]["reason"], "Untappable due to Bark Rot.");
    assert_eq!(doc["productivityRecommendation"]["status"], "critical");
    assert_eq!(doc["trunkAnalysis"]["damages"][0], "Bark Rot");
}

#[test]
fn latex_model_path_grades_sample() {
    let dir = tempfile::tempdir().unwrap();
    let sample = RgbImage::from_pixel(80, 80, Rgb([240, 238, 230]));
    let input = dir.path().join("latex.png");
    sample.save(&input).unwrap();

    let registry = ModelRegistry::new(MockLoader::new().with(
        ModelKind::Latex,
        MockModel::classifier(&["white latex", "yellow latex"], &[0.7, 0.3]),
    ));
    let analyzer = Analyzer::with_parts(config(dir.path(), true), registry, Insights::disabled());

    let doc = analyzer.run(AnalysisMode::Latex, &input.to_string_lossy(), None);

    assert_eq!(doc["qualityClassification"]["grade"], "A");
    assert_eq!(doc["colorAnalysis"]["hex"], "#f0eee6");
    assert_eq!(doc["productYieldEstimation"]["dryRubberContent"], 40.0);
    assert_eq!(doc["contaminationDetection"]["hasContamination"], false);
    assert_eq!(doc["productRecommendation"]["recommendedProduct"], "RSS (Ribbed Smoked Sheet)");
    // The digest replaces the model-side aiInsights, keeping its prompts first.
    assert_eq!(
        doc["aiInsights"]["promptRecommendations"][0],
        "How to improve white latex quality?"
    );
    assert_eq!(doc["aiInsights"]["suggestions"][0], "Filter and centrifuge.");
}

#[test]
fn unreadable_image_gives_error_document() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("broken.jpg");
    std::fs::write(&input, b"not an image").unwrap();

    let analyzer = Analyzer::with_parts(
        config(dir.path(), false),
        ModelRegistry::new(MockLoader::new()),
        Insights::disabled(),
    );
    let doc = analyzer.run(AnalysisMode::Latex, &input.to_string_lossy(), None);
    assert_eq!(doc, serde_json::json!({"error": "Failed to load image"}));
}
