use super::OcrHypothesis;
use super::RecognizedText;

use leptess::tesseract;
use leptess::tesseract::TessApi;
use log::debug;
use log::info;
use opencv::core::CV_8UC1;
use opencv::prelude::Mat;
use opencv::prelude::MatTraitConst;
use opencv::prelude::MatTraitConstManual;
use std::ffi::CString;

use crate::config::OcrConfig;
use crate::error::{PlateError, Result};

/// Text recognition capability. Hypotheses are returned best first; an empty
/// vector means nothing was read.
pub trait OcrEngine {
    fn read_text(&mut self, gray: &Mat) -> Result<Vec<OcrHypothesis>>;
}

impl<E: OcrEngine + ?Sized> OcrEngine for Box<E> {
    fn read_text(&mut self, gray: &Mat) -> Result<Vec<OcrHypothesis>> {
        (**self).read_text(gray)
    }
}

/// Tesseract backed engine. Tesseract only runs on the CPU.
pub struct TesseractEngine {
    ocr: TessApi,
}

fn c_string(value: &str) -> Result<CString> {
    CString::new(value).map_err(|e| PlateError::Ocr(e.to_string()))
}

impl TesseractEngine {
    pub fn new(config: &OcrConfig) -> Result<Self> {
        let mut api = tesseract::TessApi::new(config.data_path.as_deref(), &config.language)
            .map_err(|e| PlateError::Ocr(format!("cannot initialise Tesseract: {:?}", e)))?;

        let mut variables = vec![("tessedit_pageseg_mode", config.page_seg_mode.as_str())];
        if let Some(whitelist) = config.char_whitelist.as_deref() {
            variables.push(("tessedit_char_whitelist", whitelist));
        }
        for (name, value) in variables {
            api.raw
                .set_variable(&c_string(name)?, &c_string(value)?)
                .map_err(|e| PlateError::Ocr(format!("cannot set {}: {:?}", name, e)))?;
        }

        info!("Tesseract initialised with language '{}'", config.language);
        Ok(Self { ocr: api })
    }
}

impl OcrEngine for TesseractEngine {
    fn read_text(&mut self, gray: &Mat) -> Result<Vec<OcrHypothesis>> {
        if gray.typ() != CV_8UC1 {
            return Err(PlateError::Ocr("expected an 8 bit single channel image".to_string()));
        }
        let cols = gray.cols();
        let rows = gray.rows();
        self.ocr
            .raw
            .set_image(gray.data_bytes()?, cols, rows, 1, cols)
            .map_err(|e| PlateError::Ocr(format!("{:?}", e)))?;

        let text = self
            .ocr
            .get_utf8_text()
            .map_err(|e| PlateError::Ocr(format!("{:?}", e)))?;
        if text.trim().is_empty() {
            return Ok(vec![]);
        }

        let confidence = self.ocr.mean_text_conf() as f32 / 100.0;
        Ok(vec![OcrHypothesis::new(text, confidence)])
    }
}

/// Removes every whitespace character; plates are compared without spaces.
pub fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

pub struct TextRecognizer<E> {
    engine: E,
}

impl<E: OcrEngine> TextRecognizer<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    /// Reads the plate crop and keeps the top hypothesis without whitespace.
    pub fn recognize(&mut self, cropped: &Mat) -> Result<RecognizedText> {
        let hypotheses = self.engine.read_text(cropped)?;
        let best = hypotheses.into_iter().next().ok_or(PlateError::NoTextFound)?;

        let text = strip_whitespace(&best.text);
        if text.is_empty() {
            return Err(PlateError::NoTextFound);
        }
        debug!("OCR {:?} -> {} ({:.2})", best.text, text, best.confidence);

        Ok(RecognizedText {
            text,
            confidence: best.confidence,
        })
    }
}
