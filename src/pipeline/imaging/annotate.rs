use std::path::{Path, PathBuf};

use image::{ImageFormat, Rgb, RgbImage};
use imageproc::contours::Contour;
use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut};
use imageproc::point::Point;
use imageproc::rect::Rect;
use tracing::debug;

use super::ImagingError;

/// Contour stroke color (red).
const CONTOUR_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Contour stroke width in pixels.
const CONTOUR_THICKNESS: u32 = 2;

/// Banner geometry, anchored at the top-left corner.
const BANNER_ORIGIN: (i32, i32) = (10, 10);
const BANNER_HEIGHT: u32 = 20;

/// Copy of `img` with spot outlines and a colored severity banner.
pub fn annotate_spots(img: &RgbImage, contours: &[Contour<u32>], banner: Rgb<u8>) -> RgbImage {
    let mut out = img.clone();

    for contour in contours {
        draw_closed_outline(&mut out, &contour.points);
    }

    let banner_width = (out.width() / 3).max(1);
    let banner_rect = Rect::at(BANNER_ORIGIN.0, BANNER_ORIGIN.1).of_size(banner_width, BANNER_HEIGHT);
    draw_filled_rect_mut(&mut out, banner_rect, banner);

    out
}

/// Closed polyline through `points`, widened by diagonal offsets.
fn draw_closed_outline(out: &mut RgbImage, points: &[Point<u32>]) {
    for offset in 0..CONTOUR_THICKNESS {
        let d = offset as f32;
        for (a, b) in points.iter().zip(points.iter().cycle().skip(1)) {
            draw_line_segment_mut(
                out,
                (a.x as f32 + d, a.y as f32 + d),
                (b.x as f32 + d, b.y as f32 + d),
                CONTOUR_COLOR,
            );
        }
    }
}

/// File name for an annotated copy of `source`.
///
/// `processed_<ts>_<basename>`, or `processed_<ts>.jpg` when the basename
/// still looks like a URL or has no encodable extension.
pub fn processed_file_name(source: &str, timestamp: i64) -> String {
    let without_query = source.split(['?', '#']).next().unwrap_or(source);
    let basename = without_query
        .rsplit(['/', '\\'])
        .find(|s| !s.is_empty())
        .unwrap_or("");

    let candidate = format!("processed_{timestamp}_{basename}");
    let encodable = ImageFormat::from_path(Path::new(&candidate))
        .map(|f| f.can_write())
        .unwrap_or(false);

    if candidate.contains("http") || basename.is_empty() || !encodable {
        format!("processed_{timestamp}.jpg")
    } else {
        candidate
    }
}

/// Write an annotated image under `output_dir`, creating it if needed.
pub fn save_annotated(
    img: &RgbImage,
    output_dir: &Path,
    source: &str,
    timestamp: i64,
) -> Result<PathBuf, ImagingError> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(processed_file_name(source, timestamp));

    img.save(&path)
        .map_err(|e| ImagingError::Encode(format!("{}: {e}", path.display())))?;

    debug!(path = %path.display(), "Annotated image saved");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::contours::BorderType;

    #[test]
    fn file_name_keeps_local_basename() {
        assert_eq!(
            processed_file_name("/data/scans/leaf_01.png", 1700000000),
            "processed_1700000000_leaf_01.png"
        );
    }

    #[test]
    fn file_name_strips_url_query() {
        assert_eq!(
            processed_file_name("https://cdn.example.com/u/leaf.jpg?sig=abc", 5),
            "processed_5_leaf.jpg"
        );
    }

    #[test]
    fn file_name_sanitizes_bare_urls() {
        assert_eq!(processed_file_name("https://cdn.example.com/", 5), "processed_5.jpg");
        assert_eq!(processed_file_name("http_upload.png", 5), "processed_5.jpg");
    }

    #[test]
    fn file_name_without_extension_becomes_jpg() {
        assert_eq!(processed_file_name("/tmp/blob", 9), "processed_9.jpg");
    }

    fn outline(points: &[(u32, u32)]) -> Contour<u32> {
        Contour {
            points: points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
            border_type: BorderType::Outer,
            parent: None,
        }
    }

    #[test]
    fn annotation_draws_contour_and_banner() {
        let img = RgbImage::from_pixel(90, 60, Rgb([0, 128, 0]));
        let out = annotate_spots(&img, &[outline(&[(50, 35)])], Rgb([255, 255, 0]));
        assert_eq!(out.get_pixel(50, 35).0, [255, 0, 0]);
        assert_eq!(out.get_pixel(12, 12).0, [255, 255, 0]);
        assert_eq!(out.get_pixel(80, 55).0, [0, 128, 0]);
        assert_eq!(img.get_pixel(50, 35).0, [0, 128, 0], "input untouched");
    }

    #[test]
    fn outline_is_closed_and_hollow() {
        let img = RgbImage::from_pixel(90, 60, Rgb([0, 128, 0]));
        let square = outline(&[(50, 35), (60, 35), (60, 48), (50, 48)]);
        let out = annotate_spots(&img, &[square], Rgb([255, 255, 0]));
        // Top edge between corners.
        assert_eq!(out.get_pixel(55, 35).0, [255, 0, 0]);
        // Closing segment from the last point back to the first.
        assert_eq!(out.get_pixel(50, 42).0, [255, 0, 0]);
        // Second stroke pass.
        assert_eq!(out.get_pixel(51, 42).0, [255, 0, 0]);
        assert_eq!(out.get_pixel(55, 42).0, [0, 128, 0], "interior stays unfilled");
        assert_eq!(out.get_pixel(85, 55).0, [0, 128, 0]);
    }

    #[test]
    fn save_creates_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("nested/out");
        let img = RgbImage::from_pixel(8, 8, Rgb([1, 2, 3]));
        let path = save_annotated(&img, &out_dir, "leaf.png", 42).unwrap();
        assert!(path.exists());
        assert!(path.ends_with("processed_42_leaf.png"));
    }
}
