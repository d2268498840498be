use image::{GrayImage, Luma, RgbImage};

// ═══════════════════════════════════════════════════════════
// Color space conversion
// ═══════════════════════════════════════════════════════════

/// Per-pixel HSV in OpenCV 8-bit convention: H 0-179, S 0-255, V 0-255.
#[derive(Debug, Clone)]
pub struct HsvImage {
    width: u32,
    height: u32,
    pixels: Vec<[u8; 3]>,
}

impl HsvImage {
    pub fn from_rgb(rgb: &RgbImage) -> Self {
        Self {
            width: rgb.width(),
            height: rgb.height(),
            pixels: rgb.pixels().map(|p| rgb_to_hsv(p.0)).collect(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> [u8; 3] {
        self.pixels[(y * self.width + x) as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8; 3]> {
        self.pixels.iter()
    }

    /// Binary mask (255 inside) of pixels with every channel in `[lo, hi]`.
    pub fn in_range(&self, lo: [u8; 3], hi: [u8; 3]) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            let px = self.get(x, y);
            let inside = (0..3).all(|c| px[c] >= lo[c] && px[c] <= hi[c]);
            Luma([if inside { 255 } else { 0 }])
        })
    }
}

/// Convert one RGB pixel to OpenCV-style HSV.
pub fn rgb_to_hsv([r, g, b]: [u8; 3]) -> [u8; 3] {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let v = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = v - min;

    let s = if v > 0.0 { 255.0 * delta / v } else { 0.0 };

    let mut h = if delta == 0.0 {
        0.0
    } else if v == rf {
        60.0 * (gf - bf) / delta
    } else if v == gf {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    if h < 0.0 {
        h += 360.0;
    }

    let h8 = (h / 2.0).round() as u32 % 180;
    [h8 as u8, s.round().min(255.0) as u8, v as u8]
}

/// Convert RGB image to grayscale using ITU-R BT.601 luminance.
pub fn rgb_to_gray(rgb: &RgbImage) -> GrayImage {
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let p = rgb.get_pixel(x, y);
        let luma = 0.299 * p.0[0] as f32 + 0.587 * p.0[1] as f32 + 0.114 * p.0[2] as f32;
        Luma([luma.round().min(255.0) as u8])
    })
}

// ═══════════════════════════════════════════════════════════
// Channel statistics
// ═══════════════════════════════════════════════════════════

/// Mean of each channel over pixels where `mask` is non-zero (all pixels if `None`).
///
/// Returns zeros for an empty selection.
pub fn masked_channel_means<'a, I>(pixels: I, mask: Option<&GrayImage>) -> [f64; 3]
where
    I: Iterator<Item = &'a [u8; 3]>,
{
    let mut sums = [0.0f64; 3];
    let mut count = 0u64;

    let mask_values = mask.map(|m| m.as_raw().as_slice());
    for (i, px) in pixels.enumerate() {
        if let Some(values) = mask_values {
            if values.get(i).copied().unwrap_or(0) == 0 {
                continue;
            }
        }
        for c in 0..3 {
            sums[c] += px[c] as f64;
        }
        count += 1;
    }

    if count == 0 {
        return [0.0; 3];
    }
    sums.map(|s| s / count as f64)
}

/// Mean RGB over the mask.
pub fn mean_rgb(img: &RgbImage, mask: Option<&GrayImage>) -> [f64; 3] {
    masked_channel_means(img.pixels().map(|p| &p.0), mask)
}

/// Mean HSV over the mask.
pub fn mean_hsv(hsv: &HsvImage, mask: Option<&GrayImage>) -> [f64; 3] {
    masked_channel_means(hsv.iter(), mask)
}

// ═══════════════════════════════════════════════════════════
// Named classifications
// ═══════════════════════════════════════════════════════════

/// Bucket the mean HSV of an image (or masked region) into a color name.
pub fn dominant_color_name(img: &RgbImage, mask: Option<&GrayImage>) -> String {
    if img.width() == 0 || img.height() == 0 {
        return "Unknown".into();
    }
    let [h, s, v] = mean_hsv(&HsvImage::from_rgb(img), mask);
    color_name_for_hsv(h, s, v).into()
}

/// Color bucket for a mean HSV triple (OpenCV ranges).
pub fn color_name_for_hsv(h: f64, s: f64, v: f64) -> &'static str {
    if s < 20.0 && v > 200.0 {
        return "White/Pale";
    }
    if v < 30.0 {
        return "Black/Dark";
    }
    if s < 30.0 {
        return "Grayish";
    }

    if !(10.0..=170.0).contains(&h) {
        "Red/Brown"
    } else if h < 25.0 {
        "Orange"
    } else if h < 35.0 {
        "Yellow"
    } else if h < 85.0 {
        "Green"
    } else if h < 130.0 {
        "Blue/Dark Green"
    } else if h < 170.0 {
        "Purple/Brown"
    } else {
        "Discolored"
    }
}

/// Fraction of pixels in the foliage-green HSV band.
pub fn green_ratio(img: &RgbImage) -> f64 {
    let total = img.width() as u64 * img.height() as u64;
    if total == 0 {
        return 0.0;
    }
    let mask = HsvImage::from_rgb(img).in_range([35, 40, 40], [85, 255, 255]);
    count_nonzero(&mask) as f64 / total as f64
}

/// Number of non-zero pixels.
pub fn count_nonzero(img: &GrayImage) -> u64 {
    img.as_raw().iter().filter(|&&v| v != 0).count() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid(color: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(8, 8, Rgb(color))
    }

    #[test]
    fn hsv_matches_opencv_primaries() {
        assert_eq!(rgb_to_hsv([255, 0, 0]), [0, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 255, 0]), [60, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 255]), [120, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 0]), [0, 0, 0]);
        assert_eq!(rgb_to_hsv([128, 128, 128]), [0, 0, 128]);
    }

    #[test]
    fn hue_never_reaches_180() {
        // Near-red with a touch of blue rounds to 360 degrees.
        let [h, _, _] = rgb_to_hsv([255, 0, 1]);
        assert!(h < 180);
    }

    #[test]
    fn gray_uses_bt601_weights() {
        let gray = rgb_to_gray(&solid([255, 0, 0]));
        assert_eq!(gray.get_pixel(0, 0).0[0], 76);
        let gray = rgb_to_gray(&solid([255, 255, 255]));
        assert_eq!(gray.get_pixel(0, 0).0[0], 255);
    }

    #[test]
    fn dominant_color_buckets() {
        assert_eq!(dominant_color_name(&solid([250, 250, 250]), None), "White/Pale");
        assert_eq!(dominant_color_name(&solid([10, 10, 10]), None), "Black/Dark");
        assert_eq!(dominant_color_name(&solid([120, 120, 120]), None), "Grayish");
        assert_eq!(dominant_color_name(&solid([40, 160, 40]), None), "Green");
        assert_eq!(dominant_color_name(&solid([140, 60, 30]), None), "Red/Brown");
        assert_eq!(dominant_color_name(&solid([220, 200, 40]), None), "Yellow");
        assert_eq!(dominant_color_name(&solid([40, 60, 200]), None), "Blue/Dark Green");
    }

    #[test]
    fn dominant_color_honours_mask() {
        let mut img = solid([40, 160, 40]);
        for x in 0..4 {
            for y in 0..8 {
                img.put_pixel(x, y, Rgb([250, 250, 250]));
            }
        }
        let mask = GrayImage::from_fn(8, 8, |x, _| Luma([if x < 4 { 255 } else { 0 }]));
        assert_eq!(dominant_color_name(&img, Some(&mask)), "White/Pale");
    }

    #[test]
    fn empty_image_color_is_unknown() {
        assert_eq!(dominant_color_name(&RgbImage::new(0, 0), None), "Unknown");
    }

    #[test]
    fn green_ratio_counts_foliage_pixels() {
        let mut img = solid([40, 160, 40]);
        for y in 0..8 {
            for x in 0..2 {
                img.put_pixel(x, y, Rgb([200, 200, 200]));
            }
        }
        let ratio = green_ratio(&img);
        assert!((ratio - 0.75).abs() < 1e-9, "got {ratio}");
    }

    #[test]
    fn mean_rgb_of_empty_mask_is_zero() {
        let mask = GrayImage::new(8, 8);
        assert_eq!(mean_rgb(&solid([9, 9, 9]), Some(&mask)), [0.0; 3]);
    }

    #[test]
    fn in_range_is_inclusive() {
        let hsv = HsvImage::from_rgb(&solid([0, 255, 0]));
        let mask = hsv.in_range([60, 255, 255], [60, 255, 255]);
        assert_eq!(count_nonzero(&mask), 64);
    }
}
