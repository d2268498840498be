use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use image::RgbImage;

use super::registry::ModelLoader;
use super::types::{DetectedBox, ImageModel, ModelKind, Prediction};
use super::InferenceError;

/// Model returning a canned prediction, or failing on every call.
#[derive(Debug, Clone)]
pub struct MockModel {
    labels: Vec<String>,
    prediction: Option<Prediction>,
}

impl MockModel {
    pub fn new(labels: Vec<String>, prediction: Prediction) -> Self {
        Self {
            labels,
            prediction: Some(prediction),
        }
    }

    /// Classifier with the given labels and probabilities.
    pub fn classifier(labels: &[&str], scores: &[f32]) -> Self {
        let labels: Vec<String> = labels.iter().map(|s| s.to_string()).collect();
        let prediction = Prediction::classification(&labels, scores);
        Self::new(labels, prediction)
    }

    /// Detector with the given boxes.
    pub fn detector(boxes: Vec<DetectedBox>) -> Self {
        let labels = boxes.iter().map(|b| b.label.clone()).collect();
        Self::new(labels, Prediction::detection(boxes))
    }

    /// Model whose `predict` always errors.
    pub fn failing() -> Self {
        Self {
            labels: Vec::new(),
            prediction: None,
        }
    }
}

impl ImageModel for MockModel {
    fn predict(&self, _image: &RgbImage) -> Result<Prediction, InferenceError> {
        self.prediction
            .clone()
            .ok_or_else(|| InferenceError::Inference("mock model failure".into()))
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// Loader serving [`MockModel`]s by kind. Kinds without a model fail to load.
#[derive(Debug, Default)]
pub struct MockLoader {
    models: HashMap<ModelKind, MockModel>,
    loads: Arc<AtomicUsize>,
}

impl MockLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: ModelKind, model: MockModel) -> Self {
        self.models.insert(kind, model);
        self
    }

    /// Shared counter of `load` calls.
    pub fn load_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.loads)
    }
}

impl ModelLoader for MockLoader {
    fn load(&self, kind: ModelKind) -> Result<Box<dyn ImageModel>, InferenceError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.models
            .get(&kind)
            .cloned()
            .map(|m| Box::new(m) as Box<dyn ImageModel>)
            .ok_or_else(|| InferenceError::ModelNotFound(format!("{kind}.onnx").into()))
    }
}
