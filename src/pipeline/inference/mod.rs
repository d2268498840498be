//! Pretrained model access: prediction types, output decoding and the
//! load-once model registry.
//!
//! Model execution is behind the `onnx` feature. Without it every model
//! reports unavailable and callers take their heuristic paths.

pub mod decode;
pub mod mock;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod registry;
pub mod types;

pub use decode::*;
pub use mock::*;
#[cfg(feature = "onnx")]
pub use onnx::*;
pub use registry::*;
pub use types::*;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Model file not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("Model initialization failed: {0}")]
    ModelInit(String),

    #[error("Model runtime not available (built without the `onnx` feature)")]
    RuntimeUnavailable,

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Unexpected model output: {0}")]
    UnexpectedOutput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
