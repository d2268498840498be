use image::{GenericImageView, GrayImage, Luma, Pixel};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::distance_transform::Norm;

use super::color::count_nonzero;

/// Luma below which a leaf pixel counts as part of a dark spot
/// (inverted gray > 200).
const SPOT_MAX_LUMA: u8 = 55;

/// Contours at or below this polygon area are treated as noise.
const MIN_SPOT_AREA: f64 = 10.0;

/// Canny hysteresis thresholds for trunk edge detection.
const CANNY_LOW: f32 = 50.0;
const CANNY_HIGH: f32 = 150.0;

// ═══════════════════════════════════════════════════════════
// Spot counting
// ═══════════════════════════════════════════════════════════

/// Dark spots found on a leaf.
#[derive(Debug, Clone)]
pub struct SpotCount {
    pub count: usize,
    /// Outer boundary of each retained spot.
    pub contours: Vec<Contour<u32>>,
}

/// Count dark lesions on a leaf image.
///
/// Threshold the inverted luma, keep only outermost contours (holes and
/// nested blobs are ignored) and drop those with area <= 10 px.
pub fn count_spots(gray: &GrayImage) -> SpotCount {
    let binary = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        Luma([if gray.get_pixel(x, y).0[0] < SPOT_MAX_LUMA { 255 } else { 0 }])
    });

    let contours: Vec<Contour<u32>> = find_contours::<u32>(&binary)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter(|c| contour_area(c) > MIN_SPOT_AREA)
        .collect();

    SpotCount {
        count: contours.len(),
        contours,
    }
}

/// Enclosed area of a contour's boundary polygon.
pub fn contour_area(contour: &Contour<u32>) -> f64 {
    imageproc::geometry::contour_area(&contour.points).abs()
}

// ═══════════════════════════════════════════════════════════
// Texture and edges
// ═══════════════════════════════════════════════════════════

/// Variance of the 3x3 Laplacian response, the usual sharpness/roughness metric.
///
/// Kernel `[0,1,0; 1,-4,1; 0,1,0]` over every pixel, edges replicated.
/// Smooth bark < 500, rough > 500, damaged > 1500.
pub fn laplacian_variance(img: &GrayImage) -> f64 {
    let total = img.width() as u64 * img.height() as u64;
    if total == 0 {
        return 0.0;
    }

    let response = imageproc::filter::laplacian_filter(img);
    let (sum, sum_sq) = response.pixels().fold((0.0f64, 0.0f64), |(s, sq), p| {
        let v = p.0[0] as f64;
        (s + v, sq + v * v)
    });

    let mean = sum / total as f64;
    ((sum_sq / total as f64) - mean * mean).max(0.0)
}

/// Horizontal distance between the first and last Canny edge on `row`.
///
/// `None` when the row is out of bounds or has fewer than two edge pixels.
pub fn canny_row_span(gray: &GrayImage, row: u32) -> Option<u32> {
    if row >= gray.height() {
        return None;
    }
    let edges = imageproc::edges::canny(gray, CANNY_LOW, CANNY_HIGH);
    let mut columns = (0..edges.width()).filter(|&x| edges.get_pixel(x, row).0[0] > 0);
    let first = columns.next()?;
    let last = columns.last()?;
    Some(last - first)
}

// ═══════════════════════════════════════════════════════════
// Regions and masks
// ═══════════════════════════════════════════════════════════

/// Square of side `2 * min(w, h) / 4` centred on the image, as `(x, y, side)`.
/// `None` when the image is too small to yield a non-empty square.
pub fn center_square(width: u32, height: u32) -> Option<(u32, u32, u32)> {
    let half = width.min(height) / 4;
    if half == 0 {
        return None;
    }
    Some((width / 2 - half, height / 2 - half, half * 2))
}

/// Crop to `center_square`, falling back to the whole image.
pub fn center_crop<I>(img: &I) -> image::ImageBuffer<I::Pixel, Vec<<I::Pixel as Pixel>::Subpixel>>
where
    I: GenericImageView + 'static,
{
    match center_square(img.width(), img.height()) {
        Some((x, y, side)) => image::imageops::crop_imm(img, x, y, side, side).to_image(),
        None => image::imageops::crop_imm(img, 0, 0, img.width(), img.height()).to_image(),
    }
}

/// Mask selecting an axis-aligned rectangle, clamped to the image.
pub fn rect_mask(width: u32, height: u32, x1: u32, y1: u32, x2: u32, y2: u32) -> GrayImage {
    let (x2, y2) = (x2.min(width), y2.min(height));
    GrayImage::from_fn(width, height, |x, y| {
        Luma([if x >= x1 && x < x2 && y >= y1 && y < y2 { 255 } else { 0 }])
    })
}

/// Rectangle covering the central third of each dimension.
pub fn center_third_mask(width: u32, height: u32) -> GrayImage {
    let (cx, cy) = (width / 2, height / 2);
    let (half_w, half_h) = (width / 3 / 2, height / 3 / 2);
    rect_mask(width, height, cx - half_w, cy - half_h, cx + half_w, cy + half_h)
}

/// Pixel-wise OR of two masks of equal size.
pub fn mask_union(a: &GrayImage, b: &GrayImage) -> GrayImage {
    GrayImage::from_fn(a.width(), a.height(), |x, y| {
        Luma([a.get_pixel(x, y).0[0] | b.get_pixel(x, y).0[0]])
    })
}

/// Morphological opening then closing with a 5x5 square kernel.
pub fn open_close(mask: &GrayImage) -> GrayImage {
    let opened = imageproc::morphology::open(mask, Norm::LInf, 2);
    imageproc::morphology::close(&opened, Norm::LInf, 2)
}

/// Share of pixels with luma <= `threshold` (an inverse binary threshold).
pub fn dark_ratio(gray: &GrayImage, threshold: u8) -> f64 {
    let total = gray.width() as u64 * gray.height() as u64;
    if total == 0 {
        return 0.0;
    }
    let dark = gray.as_raw().iter().filter(|&&v| v <= threshold).count();
    dark as f64 / total as f64
}

/// Share of masked pixels whose luma lies in `[1, max_luma]`.
///
/// Pure black is excluded so it matches the masked-out background value.
pub fn masked_dark_ratio(gray: &GrayImage, mask: &GrayImage, max_luma: u8) -> f64 {
    let inside = count_nonzero(mask);
    if inside == 0 {
        return 0.0;
    }
    let dark = gray
        .as_raw()
        .iter()
        .zip(mask.as_raw())
        .filter(|(&g, &m)| m != 0 && (1..=max_luma).contains(&g))
        .count();
    dark as f64 / inside as f64
}
