use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

use image::{DynamicImage, RgbImage};
use tracing::debug;

use super::ImagingError;

/// Larger inputs are rejected before decoding.
const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024; // 50 MB

/// Smaller inputs cannot hold a PNG or JPEG.
const MIN_IMAGE_BYTES: usize = 67;

/// Upper bound on a remote image fetch.
const DOWNLOAD_TIMEOUT_SECS: u64 = 30;

/// Load an image from a local path or an http(s) URL.
///
/// A source that exists on disk always wins, so paths containing "http"
/// are still read locally.
pub fn load_image(source: &str, user_agent: &str) -> Result<RgbImage, ImagingError> {
    let bytes = if Path::new(source).exists() {
        std::fs::read(source)?
    } else if is_remote(source) {
        download(source, user_agent)?
    } else {
        return Err(ImagingError::InvalidSource(source.to_string()));
    };

    decode_image(&bytes)
}

fn is_remote(source: &str) -> bool {
    let lower = source.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn download(url: &str, user_agent: &str) -> Result<Vec<u8>, ImagingError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
        .build()
        .map_err(|e| ImagingError::Download(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(|e| ImagingError::Download(e.to_string()))?;

    let bytes = response
        .bytes()
        .map_err(|e| ImagingError::Download(e.to_string()))?;

    debug!(url, size = bytes.len(), "Image downloaded");
    Ok(bytes.to_vec())
}

/// Decode image bytes into RGB, applying EXIF orientation.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, ImagingError> {
    validate_image_bytes(bytes)?;

    let img = image::load_from_memory(bytes)
        .map_err(|e| ImagingError::Decode(e.to_string()))?;
    let img = apply_orientation(img, read_exif_orientation(bytes));

    Ok(img.to_rgb8())
}

/// Size gate applied to raw bytes before decoding.
pub fn validate_image_bytes(bytes: &[u8]) -> Result<(), ImagingError> {
    if bytes.len() < MIN_IMAGE_BYTES {
        return Err(ImagingError::Decode("Image data too small to be valid".into()));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ImagingError::Decode(format!(
            "Image is larger than {} MB",
            MAX_IMAGE_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}

/// EXIF orientation (1-8) of an encoded image.
/// Images without the tag report 1.
pub fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let reader = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(r) => r,
        Err(_) => return 1,
    };

    reader
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(1)
}

/// Apply EXIF orientation transform (values 1-8) to a `DynamicImage`.
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}
