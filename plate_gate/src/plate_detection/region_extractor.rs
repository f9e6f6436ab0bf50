use opencv::core::find_non_zero;
use opencv::core::Point;
use opencv::core::Scalar;
use opencv::core::Vector;
use opencv::core::CV_8UC1;
use opencv::imgproc::bounding_rect;
use opencv::imgproc::fill_poly;
use opencv::imgproc::LINE_8;
use opencv::prelude::Mat;
use opencv::prelude::MatTraitConst;

use super::PlateRegion;
use crate::error::{PlateError, Result};

/// Crops the axis aligned bounding box of the plate polygon out of a gray
/// image. Skewed plates are cropped but not rectified.
pub fn extract_region(gray: &Mat, region: &PlateRegion) -> Result<Mat> {
    let mut mask =
        Mat::new_rows_cols_with_default(gray.rows(), gray.cols(), CV_8UC1, Scalar::all(0.0))?;
    let mut polygons = Vector::<Vector<Point>>::new();
    polygons.push(region.to_vector());
    fill_poly(
        &mut mask,
        &polygons,
        Scalar::all(255.0),
        LINE_8,
        0,
        Point::new(0, 0),
    )?;

    let mut inside = Vector::<Point>::new();
    find_non_zero(&mask, &mut inside)?;
    if inside.is_empty() {
        // Polygon entirely outside the image.
        return Err(PlateError::PlateNotFound);
    }
    let bounds = bounding_rect(&inside)?;

    // Copy so the crop is contiguous for the OCR engine.
    let mut cropped = Mat::default();
    gray.apply_1(bounds)?.copy_to(&mut cropped)?;
    Ok(cropped)
}
