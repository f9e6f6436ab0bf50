use log::debug;
use opencv::core::Point;
use opencv::core::Vector;
use opencv::core::BORDER_DEFAULT;
use opencv::imgproc::approx_poly_dp;
use opencv::imgproc::bilateral_filter;
use opencv::imgproc::canny;
use opencv::imgproc::contour_area;
use opencv::imgproc::cvt_color;
use opencv::imgproc::find_contours;
use opencv::imgproc::CHAIN_APPROX_SIMPLE;
use opencv::imgproc::COLOR_BGR2GRAY;
use opencv::imgproc::COLOR_BGRA2GRAY;
use opencv::imgproc::RETR_TREE;
use opencv::prelude::Mat;
use opencv::prelude::MatTraitConst;

use super::PlateRegion;
use crate::config::LocatorConfig;
use crate::error::Result;

/// Converts any 1, 3 or 4 channel image to a single gray plane.
pub fn to_gray(image: &Mat) -> Result<Mat> {
    let mut gray = Mat::default();
    match image.channels() {
        1 => image.copy_to(&mut gray)?,
        4 => cvt_color(image, &mut gray, COLOR_BGRA2GRAY, 0)?,
        _ => cvt_color(image, &mut gray, COLOR_BGR2GRAY, 0)?,
    }
    Ok(gray)
}

/// Finds the largest four sided contour in an image.
pub struct RegionLocator {
    config: LocatorConfig,
}

impl RegionLocator {
    pub fn new(config: LocatorConfig) -> Self {
        Self { config }
    }

    /// Returns `None` when none of the largest contours approximates to
    /// exactly four vertices.
    pub fn locate(&self, image: &Mat) -> Result<Option<PlateRegion>> {
        let gray = to_gray(image)?;
        self.locate_in_gray(&gray)
    }

    pub fn locate_in_gray(&self, gray: &Mat) -> Result<Option<PlateRegion>> {
        let mut smoothed = Mat::default();
        bilateral_filter(
            gray,
            &mut smoothed,
            self.config.bilateral_diameter,
            self.config.bilateral_sigma_color,
            self.config.bilateral_sigma_space,
            BORDER_DEFAULT,
        )?;

        let mut edges = Mat::default();
        canny(
            &smoothed,
            &mut edges,
            self.config.canny_low,
            self.config.canny_high,
            3,
            false,
        )?;

        let mut contours = Vector::<Vector<Point>>::new();
        find_contours(
            &edges,
            &mut contours,
            RETR_TREE,
            CHAIN_APPROX_SIMPLE,
            Point::new(0, 0),
        )?;

        let candidates = self.largest_contours(contours)?;
        debug!("Evaluating {} contour candidates", candidates.len());

        for contour in candidates {
            let mut approx = Vector::<Point>::new();
            approx_poly_dp(&contour, &mut approx, self.config.approx_epsilon, true)?;
            if approx.len() == 4 {
                let region = PlateRegion::new([
                    approx.get(0)?,
                    approx.get(1)?,
                    approx.get(2)?,
                    approx.get(3)?,
                ]);
                debug!("Plate region found at {:?}", region.corners());
                return Ok(Some(region));
            }
        }

        Ok(None)
    }

    /// Contours sorted by enclosed area, largest first, truncated to the
    /// configured candidate count. Equal areas keep discovery order.
    fn largest_contours(&self, contours: Vector<Vector<Point>>) -> Result<Vec<Vector<Point>>> {
        let mut by_area = Vec::with_capacity(contours.len());
        for contour in contours {
            let area = contour_area(&contour, false)?;
            by_area.push((area, contour));
        }
        by_area.sort_by(|a, b| b.0.total_cmp(&a.0));
        by_area.truncate(self.config.max_candidates);

        Ok(by_area.into_iter().map(|(_, contour)| contour).collect())
    }
}
