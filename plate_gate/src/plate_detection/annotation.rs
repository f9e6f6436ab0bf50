use opencv::core::Point;
use opencv::core::Scalar;
use opencv::core::Vector;
use opencv::imgproc::cvt_color;
use opencv::imgproc::polylines;
use opencv::imgproc::put_text;
use opencv::imgproc::COLOR_GRAY2BGR;
use opencv::imgproc::FONT_HERSHEY_SIMPLEX;
use opencv::imgproc::LINE_8;
use opencv::imgproc::LINE_AA;
use opencv::prelude::Mat;
use opencv::prelude::MatTraitConst;

use super::PlateRegion;
use crate::error::Result;

/// Returns a copy of `image` with the plate outlined and its text written
/// along the bottom edge. Gray input is promoted to BGR so the overlay keeps
/// its color.
pub fn annotate(image: &Mat, region: &PlateRegion, plate_text: &str) -> Result<Mat> {
    let mut annotated = Mat::default();
    if image.channels() == 1 {
        cvt_color(image, &mut annotated, COLOR_GRAY2BGR, 0)?;
    } else {
        image.copy_to(&mut annotated)?;
    }

    let green = Scalar::from((0.0, 255.0, 0.0));
    let thickness_px = 2;

    let mut outline = Vector::<Vector<Point>>::new();
    outline.push(region.to_vector());
    polylines(&mut annotated, &outline, true, green, thickness_px, LINE_8, 0)?;

    put_text(
        &mut annotated,
        &format!("Plate: {}", plate_text),
        Point::new(10, annotated.rows() - 10),
        FONT_HERSHEY_SIMPLEX,
        1.0,
        green,
        thickness_px,
        LINE_AA,
        false,
    )?;

    Ok(annotated)
}
