use log::debug;
use opencv::prelude::Mat;

use crate::config::LocatorConfig;
use crate::error::{PlateError, Result};
use crate::plate_detection::annotation::annotate;
use crate::plate_detection::plate_matcher::match_plate;
use crate::plate_detection::region_extractor::extract_region;
use crate::plate_detection::region_locator::{to_gray, RegionLocator};
use crate::plate_detection::text_recognizer::{OcrEngine, TextRecognizer};
use crate::plate_detection::{PlateRegion, Verdict};

/// Result of reading one plate from one image.
pub struct PlateReading {
    pub text: String,
    pub confidence: f32,
    pub verdict: Verdict,
    pub region: PlateRegion,
    /// Input image with the region outlined and the text written on it.
    pub annotated: Mat,
}

/// Locate, extract, recognize and match, in that order. Each stage failure
/// stops the run.
pub struct Pipeline<E> {
    locator: RegionLocator,
    recognizer: TextRecognizer<E>,
}

impl<E: OcrEngine> Pipeline<E> {
    pub fn new(locator: LocatorConfig, engine: E) -> Self {
        Self {
            locator: RegionLocator::new(locator),
            recognizer: TextRecognizer::new(engine),
        }
    }

    pub fn read_plate(&mut self, image: &Mat, references: &[String]) -> Result<PlateReading> {
        let gray = to_gray(image)?;
        let region = self
            .locator
            .locate_in_gray(&gray)?
            .ok_or(PlateError::PlateNotFound)?;

        let cropped = extract_region(&gray, &region)?;
        let recognized = self.recognizer.recognize(&cropped)?;
        let verdict = match_plate(&recognized.text, references);
        debug!("Plate {} -> {:?}", recognized.text, verdict);

        let annotated = annotate(image, &region, &recognized.text)?;
        Ok(PlateReading {
            text: recognized.text,
            confidence: recognized.confidence,
            verdict,
            region,
            annotated,
        })
    }
}
