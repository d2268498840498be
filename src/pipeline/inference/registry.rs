use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing::{info, warn};

use super::types::{ImageModel, ModelKind};
use super::InferenceError;

/// Builds a model for a kind. ONNX in production, mocks in tests.
pub trait ModelLoader: Send + Sync {
    fn load(&self, kind: ModelKind) -> Result<Box<dyn ImageModel>, InferenceError>;
}

/// Loader used when the crate is built without a model runtime.
pub struct UnavailableLoader;

impl ModelLoader for UnavailableLoader {
    fn load(&self, _kind: ModelKind) -> Result<Box<dyn ImageModel>, InferenceError> {
        Err(InferenceError::RuntimeUnavailable)
    }
}

/// Load-once model cache.
///
/// Each kind is loaded on first use. A load failure is remembered, so
/// the warning is logged once and later lookups return `None` directly.
pub struct ModelRegistry {
    loader: Box<dyn ModelLoader>,
    slots: [OnceLock<Option<Box<dyn ImageModel>>>; 4],
}

impl ModelRegistry {
    pub fn new(loader: impl ModelLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            slots: std::array::from_fn(|_| OnceLock::new()),
        }
    }

    /// Registry backed by the ONNX weights in `models_dir`.
    #[cfg(feature = "onnx")]
    pub fn for_models_dir(models_dir: &Path) -> Self {
        Self::new(super::onnx::OnnxLoader::new(models_dir))
    }

    /// Registry with no runtime: every model is unavailable.
    #[cfg(not(feature = "onnx"))]
    pub fn for_models_dir(models_dir: &Path) -> Self {
        tracing::debug!(dir = %models_dir.display(), "Built without `onnx`, models disabled");
        Self::new(UnavailableLoader)
    }

    /// The model for `kind`, loading it on first call.
    pub fn get(&self, kind: ModelKind) -> Option<&dyn ImageModel> {
        self.slots[kind.index()]
            .get_or_init(|| match self.loader.load(kind) {
                Ok(model) => {
                    info!(model = %kind, classes = model.labels().len(), "Model loaded");
                    Some(model)
                }
                Err(e) => {
                    warn!(model = %kind, error = %e, "Model unavailable");
                    None
                }
            })
            .as_deref()
    }

    pub fn is_available(&self, kind: ModelKind) -> bool {
        self.get(kind).is_some()
    }
}

// ═══════════════════════════════════════════════════════════
// Weight file lookup
// ═══════════════════════════════════════════════════════════

/// First existing `<stem>.onnx` for `kind` under `models_dir`.
pub fn resolve_model_file(models_dir: &Path, kind: ModelKind) -> Result<PathBuf, InferenceError> {
    let candidates: Vec<PathBuf> = kind
        .file_stems()
        .iter()
        .map(|stem| models_dir.join(format!("{stem}.onnx")))
        .collect();

    candidates
        .iter()
        .find(|p| p.is_file())
        .cloned()
        .ok_or_else(|| {
            InferenceError::ModelNotFound(
                candidates
                    .into_iter()
                    .next()
                    .unwrap_or_else(|| models_dir.to_path_buf()),
            )
        })
}

/// Sidecar label file: `Leaf.onnx` -> `Leaf.labels.txt`.
pub fn labels_path(model_file: &Path) -> PathBuf {
    model_file.with_extension("labels.txt")
}

/// Class names, one per non-blank line. A missing file yields no labels.
pub fn read_labels(path: &Path) -> Result<Vec<String>, InferenceError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let text = std::fs::read_to_string(path)?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect())
}
