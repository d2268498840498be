use std::path::{Path, PathBuf};
use std::sync::Mutex;

use image::imageops::FilterType;
use image::RgbImage;
use ort::session::Session;

use super::decode::decode_output;
use super::registry::{labels_path, read_labels, resolve_model_file, ModelLoader};
use super::types::{ImageModel, ModelKind, Prediction};
use super::InferenceError;

/// Exported YOLO graph run through ONNX Runtime.
///
/// `Session::run` needs `&mut self`, so the session sits behind a Mutex
/// to keep `ImageModel::predict` on `&self`.
pub struct OnnxModel {
    session: Mutex<Session>,
    labels: Vec<String>,
    input_size: u32,
}

impl OnnxModel {
    /// Load weights from `path` and class names from `labels_path`.
    pub fn load(path: &Path, labels_path: &Path, input_size: u32) -> Result<Self, InferenceError> {
        if !path.exists() {
            return Err(InferenceError::ModelNotFound(path.to_path_buf()));
        }

        let session = Session::builder()
            .map_err(|e: ort::Error| InferenceError::ModelInit(e.to_string()))?
            .with_intra_threads(2)
            .map_err(|e: ort::Error| InferenceError::ModelInit(e.to_string()))?
            .commit_from_file(path)
            .map_err(|e: ort::Error| InferenceError::ModelInit(format!("ONNX load failed: {e}")))?;

        let labels = read_labels(labels_path)?;

        tracing::info!(
            path = %path.display(),
            classes = labels.len(),
            input_size,
            "ONNX model loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            labels,
            input_size,
        })
    }

    /// Resize to `input_size`², RGB, CHW, scaled to 0-1.
    fn preprocess(&self, image: &RgbImage) -> ndarray::Array4<f32> {
        let size = self.input_size;
        let resized = image::imageops::resize(image, size, size, FilterType::Triangle);

        let mut input = ndarray::Array4::<f32>::zeros((1, 3, size as usize, size as usize));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                input[[0, c, y as usize, x as usize]] = pixel.0[c] as f32 / 255.0;
            }
        }
        input
    }
}

impl ImageModel for OnnxModel {
    fn predict(&self, image: &RgbImage) -> Result<Prediction, InferenceError> {
        use ort::value::TensorRef;

        if image.width() == 0 || image.height() == 0 {
            return Err(InferenceError::Inference("empty image".into()));
        }

        let input = self.preprocess(image);
        let tensor = TensorRef::from_array_view(&input)
            .map_err(|e| InferenceError::Inference(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| InferenceError::Inference("Session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| InferenceError::Inference(format!("ONNX inference failed: {e}")))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError::Inference(format!("Output extraction: {e}")))?;

        let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
        let scale = (
            image.width() as f32 / self.input_size as f32,
            image.height() as f32 / self.input_size as f32,
        );

        decode_output(&dims, data, &self.labels, scale)
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// Loads `<models_dir>/<stem>.onnx` plus its `.labels.txt` sidecar.
pub struct OnnxLoader {
    models_dir: PathBuf,
}

impl OnnxLoader {
    pub fn new(models_dir: &Path) -> Self {
        Self {
            models_dir: models_dir.to_path_buf(),
        }
    }
}

impl ModelLoader for OnnxLoader {
    fn load(&self, kind: ModelKind) -> Result<Box<dyn ImageModel>, InferenceError> {
        let path = resolve_model_file(&self.models_dir, kind)?;
        let model = OnnxModel::load(&path, &labels_path(&path), kind.input_size())?;
        Ok(Box::new(model))
    }
}
