pub mod annotation;
pub mod image_source;
pub mod plate_matcher;
pub mod preview;
pub mod region_extractor;
pub mod region_locator;
pub mod text_recognizer;

use opencv::core::Point;
use opencv::core::Vector;

/// Quadrilateral around the plate, corners in the order the polygon
/// approximation produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlateRegion {
    corners: [Point; 4],
}

impl PlateRegion {
    pub fn new(corners: [Point; 4]) -> Self {
        return Self { corners };
    }

    pub fn corners(&self) -> &[Point; 4] {
        &self.corners
    }

    pub fn to_vector(&self) -> Vector<Point> {
        Vector::from_iter(self.corners.iter().copied())
    }
}

/// Best-first hypothesis returned by an OCR engine.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrHypothesis {
    pub text: String,
    pub confidence: f32,
}

impl OcrHypothesis {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedText {
    pub text: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Match,
    NoMatch,
}

impl Verdict {
    pub fn is_match(self) -> bool {
        self == Verdict::Match
    }
}
