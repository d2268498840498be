//! Plant-part arbitration.
//!
//! The leaf disease model gets first say. When it is unsure, the generic
//! ImageNet classifier's top-5 labels vote by keyword, and a green-pixel
//! check breaks ties in favour of leaf.

use image::RgbImage;
use tracing::{debug, info, warn};

use crate::models::PlantPart;
use crate::pipeline::imaging::green_ratio;
use crate::pipeline::inference::{ModelKind, ModelRegistry};

/// Leaf model top-1 score above which the image is taken as a leaf.
const LEAF_MODEL_THRESHOLD: f32 = 0.25;

/// Generic confidence below which the green check may override.
const LOW_CONFIDENCE: f64 = 0.2;

/// Green-pixel share that marks an image as foliage.
const GREEN_RATIO_THRESHOLD: f64 = 0.3;

/// Confidence floor given to a green-check leaf.
const GREEN_LEAF_CONFIDENCE: f64 = 0.6;

/// Minimum confidence for the image to count as a tree at all.
const TREE_THRESHOLD: f64 = 0.1;

const TRUNK_KEYWORDS: &[&str] = &["bark", "trunk", "wood", "log"];
const LEAF_KEYWORDS: &[&str] = &["leaf", "foliage", "plant", "flower", "green"];
const TREE_KEYWORDS: &[&str] = &["tree", "ficus", "rubber", "forest"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartClassification {
    pub is_tree: bool,
    pub primary_part: PlantPart,
    /// 0-1
    pub confidence: f64,
}

impl PartClassification {
    fn whole_tree() -> Self {
        Self {
            is_tree: true,
            primary_part: PlantPart::WholeTree,
            confidence: 1.0,
        }
    }

    /// Force the part when the caller supplied a `leaf`/`trunk` hint.
    pub fn with_sub_mode(self, sub_mode: Option<&str>) -> Self {
        let forced = match sub_mode.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("leaf") => PlantPart::Leaf,
            Some("trunk") => PlantPart::Trunk,
            _ => return self,
        };
        debug!(part = %forced, "Part forced by sub-mode");
        Self {
            is_tree: true,
            primary_part: forced,
            ..self
        }
    }
}

/// Decide which part of the tree `img` shows.
pub fn classify_content(img: &RgbImage, registry: &ModelRegistry) -> PartClassification {
    if let Some(leaf_model) = registry.get(ModelKind::Leaf) {
        match leaf_model.predict(img) {
            Ok(pred) => {
                if let Some(top) = pred.top1().filter(|t| t.score > LEAF_MODEL_THRESHOLD) {
                    info!(confidence = top.score, "Leaf model identified content");
                    return PartClassification {
                        is_tree: true,
                        primary_part: PlantPart::Leaf,
                        confidence: top.score as f64,
                    };
                }
            }
            Err(e) => warn!(error = %e, "Leaf model classification check failed"),
        }
    }

    let Some(generic) = registry.get(ModelKind::Generic) else {
        return PartClassification::whole_tree();
    };

    let pred = match generic.predict(img) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "Tree validation failed");
            return PartClassification::whole_tree();
        }
    };

    let top5: Vec<(String, f64)> = pred
        .topk(5)
        .iter()
        .map(|c| (c.label.clone(), c.score as f64))
        .collect();
    let (mut part, mut confidence) = vote(&top5);

    if part == PlantPart::Unknown || confidence < LOW_CONFIDENCE {
        let ratio = green_ratio(img);
        if ratio > GREEN_RATIO_THRESHOLD {
            debug!(green_ratio = ratio, "Green dominance, treating as leaf");
            part = PlantPart::Leaf;
            confidence = confidence.max(GREEN_LEAF_CONFIDENCE);
        }
    }

    if confidence > TREE_THRESHOLD {
        PartClassification {
            is_tree: true,
            primary_part: part,
            confidence,
        }
    } else {
        PartClassification {
            is_tree: false,
            primary_part: PlantPart::Unknown,
            confidence,
        }
    }
}

/// Keyword vote over `(label, score)` pairs: `(part, max score)`.
fn vote(classes: &[(String, f64)]) -> (PlantPart, f64) {
    let (mut trunk, mut leaf, mut tree) = (0.0, 0.0, 0.0);
    let mut confidence: f64 = 0.0;

    for (label, score) in classes {
        let name = label.to_lowercase();
        let has = |keys: &[&str]| keys.iter().any(|k| name.contains(k));
        if has(TRUNK_KEYWORDS) {
            trunk += score;
        } else if has(LEAF_KEYWORDS) {
            leaf += score;
        } else if has(TREE_KEYWORDS) {
            tree += score;
        }
        confidence = confidence.max(*score);
    }

    let part = if trunk > leaf && trunk > tree {
        PlantPart::Trunk
    } else if leaf > trunk && leaf > tree {
        PlantPart::Leaf
    } else if tree > 0.0 {
        PlantPart::WholeTree
    } else {
        PlantPart::Unknown
    };
    (part, confidence)
}
