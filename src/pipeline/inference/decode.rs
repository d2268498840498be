//! Turn raw output tensors into [`Prediction`]s.
//!
//! Works on `(shape, data)` pairs so it is independent of the runtime.

use super::types::{DetectedBox, Prediction};
use super::InferenceError;

/// Anchors whose best class score is below this are dropped.
pub const DETECTION_CONF_THRESHOLD: f32 = 0.25;

/// Tolerance when deciding whether scores are already probabilities.
const PROBABILITY_SUM_TOLERANCE: f32 = 1e-2;

/// Numerically stable softmax.
pub fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum <= 0.0 || !sum.is_finite() {
        return vec![0.0; scores.len()];
    }
    exps.into_iter().map(|e| e / sum).collect()
}

/// Scores as probabilities: returned unchanged when they already sum to
/// about 1 with every entry in `[0, 1]`, softmaxed otherwise.
pub fn as_probabilities(scores: &[f32]) -> Vec<f32> {
    let sum: f32 = scores.iter().sum();
    let in_unit = scores.iter().all(|s| (0.0..=1.0).contains(s));
    if in_unit && (sum - 1.0).abs() <= PROBABILITY_SUM_TOLERANCE {
        scores.to_vec()
    } else {
        softmax(scores)
    }
}

/// Decode one output tensor.
///
/// - rank 2 `[1, N]`: classification
/// - rank 3 `[1, C, A]`: YOLO-style detection, `C = 4 + nc` or `4 + nc + 1`
///   with a trailing rotation channel
///
/// `scale` maps model-input pixels back to the original image (`sx`, `sy`).
pub fn decode_output(
    shape: &[usize],
    data: &[f32],
    labels: &[String],
    scale: (f32, f32),
) -> Result<Prediction, InferenceError> {
    match shape {
        [1, n] => {
            let scores = data
                .get(..*n)
                .ok_or_else(|| short_buffer(shape, data.len()))?;
            Ok(Prediction::classification(labels, &as_probabilities(scores)))
        }
        [1, channels, anchors] => decode_detection(*channels, *anchors, data, labels, scale),
        _ => Err(InferenceError::UnexpectedOutput(format!(
            "unsupported output shape {shape:?}"
        ))),
    }
}

fn short_buffer(shape: &[usize], len: usize) -> InferenceError {
    InferenceError::UnexpectedOutput(format!("shape {shape:?} but only {len} values"))
}

fn decode_detection(
    channels: usize,
    anchors: usize,
    data: &[f32],
    labels: &[String],
    (sx, sy): (f32, f32),
) -> Result<Prediction, InferenceError> {
    if channels < 5 {
        return Err(InferenceError::UnexpectedOutput(format!(
            "detection output needs at least 5 channels, got {channels}"
        )));
    }
    if data.len() < channels * anchors {
        return Err(short_buffer(&[1, channels, anchors], data.len()));
    }

    let oriented = !labels.is_empty() && channels == 4 + labels.len() + 1;
    let class_count = if oriented { labels.len() } else { channels - 4 };
    let at = |c: usize, a: usize| data[c * anchors + a];

    let mut boxes = Vec::new();
    for a in 0..anchors {
        let (class_id, confidence) = (0..class_count)
            .map(|k| (k, at(4 + k, a)))
            .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

        if confidence < DETECTION_CONF_THRESHOLD {
            continue;
        }

        let (cx, cy, w, h) = (at(0, a), at(1, a), at(2, a), at(3, a));
        boxes.push(DetectedBox {
            class_id,
            label: labels
                .get(class_id)
                .cloned()
                .unwrap_or_else(|| format!("class_{class_id}")),
            confidence,
            x1: (cx - w / 2.0) * sx,
            y1: (cy - h / 2.0) * sy,
            x2: (cx + w / 2.0) * sx,
            y2: (cy + h / 2.0) * sy,
            angle: oriented.then(|| at(4 + class_count, a)),
        });
    }

    Ok(Prediction::detection(boxes))
}
