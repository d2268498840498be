use image::RgbImage;

use super::InferenceError;

// ═══════════════════════════════════════════════════════════
// Model identity
// ═══════════════════════════════════════════════════════════

/// The four pretrained models the analyzer knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    /// Leaf disease classifier (healthy / disease classes).
    Leaf,
    /// Trunk disease detector (axis-aligned or oriented boxes).
    Trunk,
    /// Latex quality classifier or detector.
    Latex,
    /// Generic ImageNet classifier used for part arbitration.
    Generic,
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [Self::Leaf, Self::Trunk, Self::Latex, Self::Generic];

    /// Weight file stems, in lookup order.
    pub fn file_stems(&self) -> &'static [&'static str] {
        match self {
            Self::Leaf => &["Leaf", "best"],
            Self::Trunk => &["Trunks"],
            Self::Latex => &["Latex"],
            Self::Generic => &["yolo11n-cls"],
        }
    }

    /// Square input resolution the exported graph expects.
    pub fn input_size(&self) -> u32 {
        match self {
            Self::Leaf | Self::Generic => 224,
            Self::Trunk | Self::Latex => 640,
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Self::Leaf => 0,
            Self::Trunk => 1,
            Self::Latex => 2,
            Self::Generic => 3,
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Leaf => write!(f, "leaf"),
            Self::Trunk => write!(f, "trunk"),
            Self::Latex => write!(f, "latex"),
            Self::Generic => write!(f, "generic"),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Predictions
// ═══════════════════════════════════════════════════════════

/// One class and its probability (0-1).
#[derive(Debug, Clone, PartialEq)]
pub struct ClassScore {
    pub class_id: usize,
    pub label: String,
    pub score: f32,
}

/// One detected object in original image coordinates.
///
/// `x1..x2`/`y1..y2` are the extents of the unrotated box. When `angle`
/// (radians) is set, the box is rotated about its centre.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedBox {
    pub class_id: usize,
    pub label: String,
    pub confidence: f32,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub angle: Option<f32>,
}

impl DetectedBox {
    pub fn is_oriented(&self) -> bool {
        self.angle.is_some()
    }

    /// Corner points, rotated when the box is oriented.
    pub fn corners(&self) -> [(f32, f32); 4] {
        let (cx, cy) = ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0);
        let (hw, hh) = ((self.x2 - self.x1) / 2.0, (self.y2 - self.y1) / 2.0);
        let (sin, cos) = self.angle.unwrap_or(0.0).sin_cos();
        [(-hw, -hh), (hw, -hh), (hw, hh), (-hw, hh)]
            .map(|(dx, dy)| (cx + dx * cos - dy * sin, cy + dx * sin + dy * cos))
    }

    /// Horizontal extent in pixels: corner spread for oriented boxes,
    /// `x2 - x1` otherwise.
    pub fn pixel_width(&self) -> f32 {
        if self.is_oriented() {
            let xs = self.corners().map(|(x, _)| x);
            let max = xs.iter().copied().fold(f32::MIN, f32::max);
            let min = xs.iter().copied().fold(f32::MAX, f32::min);
            max - min
        } else {
            self.x2 - self.x1
        }
    }

    /// Axis-aligned integer envelope `(x1, y1, x2, y2)` clamped to `width x height`.
    pub fn envelope(&self, width: u32, height: u32) -> (u32, u32, u32, u32) {
        let corners = self.corners();
        let clamp_x = |v: f32| v.max(0.0).min(width as f32) as u32;
        let clamp_y = |v: f32| v.max(0.0).min(height as f32) as u32;
        let min_x = corners.iter().map(|c| c.0).fold(f32::MAX, f32::min);
        let max_x = corners.iter().map(|c| c.0).fold(f32::MIN, f32::max);
        let min_y = corners.iter().map(|c| c.1).fold(f32::MAX, f32::min);
        let max_y = corners.iter().map(|c| c.1).fold(f32::MIN, f32::max);
        (clamp_x(min_x), clamp_y(min_y), clamp_x(max_x), clamp_y(max_y))
    }
}

/// Decoded output of one model run.
#[derive(Debug, Clone, PartialEq)]
pub enum Prediction {
    /// Class probabilities, sorted by descending score.
    Classification(Vec<ClassScore>),
    /// Detected objects, sorted by descending confidence. May be empty.
    Detection(Vec<DetectedBox>),
}

impl Prediction {
    /// Build a classification from parallel label/score slices.
    /// Missing labels are named `class_<id>`.
    pub fn classification(labels: &[String], scores: &[f32]) -> Self {
        let mut classes: Vec<ClassScore> = scores
            .iter()
            .enumerate()
            .map(|(class_id, &score)| ClassScore {
                class_id,
                label: labels
                    .get(class_id)
                    .cloned()
                    .unwrap_or_else(|| format!("class_{class_id}")),
                score,
            })
            .collect();
        classes.sort_by(|a, b| b.score.total_cmp(&a.score));
        Self::Classification(classes)
    }

    /// Build a detection result, sorting boxes by confidence.
    pub fn detection(mut boxes: Vec<DetectedBox>) -> Self {
        boxes.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        Self::Detection(boxes)
    }

    /// Highest-scoring class, if this is a non-empty classification.
    pub fn top1(&self) -> Option<&ClassScore> {
        match self {
            Self::Classification(classes) => classes.first(),
            Self::Detection(_) => None,
        }
    }

    /// Up to `k` highest-scoring classes.
    pub fn topk(&self, k: usize) -> &[ClassScore] {
        match self {
            Self::Classification(classes) => &classes[..k.min(classes.len())],
            Self::Detection(_) => &[],
        }
    }

    /// Highest-confidence box, if this is a non-empty detection.
    pub fn best_box(&self) -> Option<&DetectedBox> {
        match self {
            Self::Detection(boxes) => boxes.first(),
            Self::Classification(_) => None,
        }
    }

    /// Label and confidence (0-1) of the strongest signal: best box for
    /// detections, top-1 for classifications.
    pub fn best_label(&self) -> Option<(&str, f32)> {
        match self {
            Self::Detection(boxes) => boxes.first().map(|b| (b.label.as_str(), b.confidence)),
            Self::Classification(classes) => classes.first().map(|c| (c.label.as_str(), c.score)),
        }
    }
}

/// A loaded model that turns an image into a prediction.
pub trait ImageModel: Send + Sync {
    fn predict(&self, image: &RgbImage) -> Result<Prediction, InferenceError>;

    /// Class names, indexed by class id.
    fn labels(&self) -> &[String];
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aabb(x1: f32, x2: f32) -> DetectedBox {
        DetectedBox {
            class_id: 0,
            label: "bark rot".into(),
            confidence: 0.8,
            x1,
            y1: 10.0,
            x2,
            y2: 110.0,
            angle: None,
        }
    }

    #[test]
    fn classification_sorts_and_names_classes() {
        let labels = vec!["healthy".to_string(), "diseased".to_string()];
        let pred = Prediction::classification(&labels, &[0.2, 0.7, 0.1]);
        let top = pred.top1().unwrap();
        assert_eq!(top.label, "diseased");
        assert_eq!(pred.topk(5).len(), 3);
        assert_eq!(pred.topk(5)[2].label, "class_2");
        assert!(pred.best_box().is_none());
    }

    #[test]
    fn detection_best_box_is_highest_confidence() {
        let mut low = aabb(0.0, 10.0);
        low.confidence = 0.3;
        let high = aabb(5.0, 50.0);
        let pred = Prediction::detection(vec![low, high]);
        assert_eq!(pred.best_box().unwrap().confidence, 0.8);
        assert_eq!(pred.best_label().unwrap().0, "bark rot");
        assert!(pred.top1().is_none());
    }

    #[test]
    fn empty_detection_has_no_label() {
        assert!(Prediction::detection(vec![]).best_label().is_none());
    }

    #[test]
    fn axis_aligned_width() {
        assert_eq!(aabb(20.0, 80.0).pixel_width(), 60.0);
    }

    #[test]
    fn oriented_width_uses_rotated_corners() {
        let mut b = aabb(0.0, 100.0);
        b.y1 = 0.0;
        b.y2 = 20.0;
        b.angle = Some(std::f32::consts::FRAC_PI_2);
        // A 100x20 box turned 90 degrees spans 20 px horizontally.
        assert!((b.pixel_width() - 20.0).abs() < 1e-3);
    }

    #[test]
    fn envelope_is_clamped() {
        let b = aabb(-15.0, 300.0);
        assert_eq!(b.envelope(200, 100), (0, 10, 200, 100));
    }

    #[test]
    fn leaf_falls_back_to_best_weights() {
        assert_eq!(ModelKind::Leaf.file_stems(), &["Leaf", "best"]);
        assert_eq!(ModelKind::Trunk.file_stems(), &["Trunks"]);
    }

    #[test]
    fn kinds_have_distinct_indices() {
        let mut seen: Vec<usize> = ModelKind::ALL.iter().map(|k| k.index()).collect();
        seen.dedup();
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }
}
