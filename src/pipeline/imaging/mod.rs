//! Pixel-level measurements over decoded images.
//!
//! Every function here is a pure transform over an `RgbImage`/`GrayImage`
//! except `load_image` (file or HTTP read) and `save_annotated` (file write).
//! Color conventions follow OpenCV so thresholds tuned there carry over:
//! gray is BT.601 luma, HSV uses H in 0-179 and S/V in 0-255.

pub mod annotate;
pub mod color;
pub mod measure;
pub mod source;

pub use annotate::*;
pub use color::*;
pub use measure::*;
pub use source::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image download failed: {0}")]
    Download(String),

    #[error("Image decoding failed: {0}")]
    Decode(String),

    #[error("Image encoding failed: {0}")]
    Encode(String),

    #[error("Image source is neither a readable file nor an http(s) URL: {0}")]
    InvalidSource(String),
}
