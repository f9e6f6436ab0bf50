use std::path::Path;
use std::time::{Duration, Instant};

use log::{error, info, warn};
use opencv::prelude::Mat;

use crate::actuator::{Actuator, SerialActuator};
use crate::config::AppConfig;
use crate::error::{PlateError, Result};
use crate::metrics::{Outcome, PipelineMetrics};
use crate::pipeline::{Pipeline, PlateReading};
use crate::plate_detection::image_source::{CameraSource, FileSource, ImageSource};
use crate::plate_detection::preview::{FrameSink, PreviewHandle};
use crate::plate_detection::text_recognizer::{OcrEngine, TesseractEngine};
use crate::plate_detection::{OcrHypothesis, PlateRegion, Verdict};
use crate::storage::history_ledger::{HistoryEntry, HistoryLedger};
use crate::storage::reference_store::{AddOutcome, ReferenceStore};

/// Outcome of a detection run handed to the presentation layer.
pub struct Detection {
    pub plate: String,
    pub confidence: f32,
    pub verdict: Verdict,
    pub region: PlateRegion,
    pub annotated: Mat,
    /// Whether the history gained an entry for this plate.
    pub newly_recorded: bool,
    /// Problems that did not stop the run.
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewState {
    Started,
    Stopped,
}

/// Everything a running application owns: both persisted lists, the
/// actuator, the OCR engine and a running preview, if any.
pub struct Session {
    config: AppConfig,
    references: ReferenceStore,
    history: HistoryLedger,
    actuator: Option<Box<dyn Actuator>>,
    pipeline: Pipeline<Box<dyn OcrEngine>>,
    metrics: PipelineMetrics,
    preview: Option<PreviewHandle>,
    startup_warnings: Vec<String>,
    // Set while a list stands in for a file that failed to parse. Such a
    // file is only overwritten once the list has been changed.
    references_unreadable: bool,
    history_unreadable: bool,
    closed: bool,
}

/// Stands in for an OCR engine that failed to initialize, so list
/// management keeps working without Tesseract.
struct UnavailableEngine {
    reason: String,
}

impl OcrEngine for UnavailableEngine {
    fn read_text(&mut self, _gray: &Mat) -> Result<Vec<OcrHypothesis>> {
        Err(PlateError::Ocr(self.reason.clone()))
    }
}

/// Returns the loaded value, or an empty one and `true` when loading failed.
fn load_or_empty<T>(
    loaded: Result<T>,
    empty: impl FnOnce() -> T,
    warnings: &mut Vec<String>,
) -> (T, bool) {
    match loaded {
        Ok(value) => (value, false),
        Err(e) => {
            warn!("{}, starting with an empty list", e);
            warnings.push(e.to_string());
            (empty(), true)
        }
    }
}

impl Session {
    /// Opens a session with Tesseract and the configured serial actuator.
    /// A Tesseract failure is a startup warning; detections then fail with
    /// `PlateError::Ocr` while the list commands keep working.
    pub fn open(config: AppConfig) -> Result<Self> {
        let mut warnings = Vec::new();

        let engine: Box<dyn OcrEngine> = match TesseractEngine::new(&config.ocr) {
            Ok(engine) => Box::new(engine),
            Err(e) => {
                error!("{}", e);
                warnings.push(format!("{}, detection is unavailable", e));
                Box::new(UnavailableEngine {
                    reason: e.to_string(),
                })
            }
        };

        let actuator: Option<Box<dyn Actuator>> = match config.actuator_port.as_deref() {
            Some(port) => {
                let settle = Duration::from_millis(config.actuator_settle_ms);
                match SerialActuator::open(port, settle) {
                    Ok(actuator) => Some(Box::new(actuator)),
                    Err(e) => {
                        warn!("{}", e);
                        warnings.push(e.to_string());
                        None
                    }
                }
            }
            None => {
                let message = "no actuator port configured, running recognition only";
                warn!("{}", message);
                warnings.push(message.to_string());
                None
            }
        };

        let mut session = Self::with_parts(config, engine, actuator)?;
        warnings.append(&mut session.startup_warnings);
        session.startup_warnings = warnings;
        Ok(session)
    }

    /// Opens a session around an already built OCR engine and actuator.
    pub fn with_parts(
        config: AppConfig,
        engine: Box<dyn OcrEngine>,
        actuator: Option<Box<dyn Actuator>>,
    ) -> Result<Self> {
        let mut warnings = Vec::new();
        let (references, references_unreadable) = load_or_empty(
            ReferenceStore::load(&config.reference_path),
            || ReferenceStore::empty(&config.reference_path),
            &mut warnings,
        );
        let (history, history_unreadable) = load_or_empty(
            HistoryLedger::load(&config.history_path),
            || HistoryLedger::empty(&config.history_path),
            &mut warnings,
        );

        let pipeline = Pipeline::new(config.locator.clone(), engine);
        info!("Session opened");
        Ok(Self {
            config,
            references,
            history,
            actuator,
            pipeline,
            metrics: PipelineMetrics::new()?,
            preview: None,
            startup_warnings: warnings,
            references_unreadable,
            history_unreadable,
            closed: false,
        })
    }

    /// Non-fatal problems met while opening the session.
    pub fn startup_warnings(&self) -> &[String] {
        &self.startup_warnings
    }

    pub fn has_actuator(&self) -> bool {
        self.actuator.is_some()
    }

    pub fn detect_from_file(&mut self, path: &Path) -> Result<Detection> {
        let image = FileSource::new(path).acquire()?;
        self.detect(&image)
    }

    pub fn detect_from_camera(&mut self) -> Result<Detection> {
        let image = CameraSource::new(self.config.camera_index).acquire()?;
        self.detect(&image)
    }

    /// Runs the pipeline on an image, signals the actuator and records the
    /// plate in the history.
    pub fn detect(&mut self, image: &Mat) -> Result<Detection> {
        let started = Instant::now();
        let result = self.pipeline.read_plate(image, self.references.plates());
        let outcome = match &result {
            Ok(reading) if reading.verdict.is_match() => Outcome::Match,
            Ok(_) => Outcome::NoMatch,
            Err(PlateError::PlateNotFound) => Outcome::NotFound,
            Err(PlateError::NoTextFound) => Outcome::NoText,
            Err(_) => Outcome::Failed,
        };
        self.metrics.observe(outcome, started.elapsed().as_secs_f64());

        let PlateReading {
            text,
            confidence,
            verdict,
            region,
            annotated,
        } = result?;
        info!("Plate {} recognized, {:?}", text, verdict);

        let mut warnings = Vec::new();
        if let Some(actuator) = self.actuator.as_mut() {
            if let Err(e) = actuator.signal(verdict) {
                warn!("Cannot signal actuator: {}", e);
                warnings.push(format!("cannot signal actuator: {}", e));
            }
        }

        let known = self.history.entries().len();
        if let Err(e) = self.history.record(&text, verdict.is_match()) {
            error!("Cannot save history: {}", e);
            warnings.push(e.to_string());
        }
        let newly_recorded = self.history.entries().len() > known;
        if newly_recorded {
            self.history_unreadable = false;
        }

        Ok(Detection {
            plate: text,
            confidence,
            verdict,
            region,
            annotated,
            newly_recorded,
            warnings,
        })
    }

    /// Starts the live preview, or stops it when one is running.
    pub fn toggle_preview(&mut self, sink: Box<dyn FrameSink>) -> Result<PreviewState> {
        // A preview that ended on its own is cleared and started again.
        if self.stop_preview() {
            return Ok(PreviewState::Stopped);
        }

        let interval = Duration::from_millis(self.config.preview_interval_ms);
        self.preview = Some(PreviewHandle::start(
            self.config.camera_index,
            interval,
            sink,
        )?);
        Ok(PreviewState::Started)
    }

    /// Stops the preview if one is running. Returns whether one was.
    pub fn stop_preview(&mut self) -> bool {
        match self.preview.take() {
            Some(preview) => {
                let running = preview.is_running();
                preview.stop();
                running
            }
            None => false,
        }
    }

    pub fn is_previewing(&self) -> bool {
        self.preview
            .as_ref()
            .map(PreviewHandle::is_running)
            .unwrap_or(false)
    }

    pub fn list_references(&self) -> &[String] {
        self.references.plates()
    }

    pub fn list_history(&self) -> &[HistoryEntry] {
        self.history.entries()
    }

    pub fn add_reference(&mut self, plate: &str) -> Result<AddOutcome> {
        let outcome = self.references.add(plate)?;
        if outcome == AddOutcome::Added {
            self.references_unreadable = false;
        }
        Ok(outcome)
    }

    /// Removes a reference by its 1-based position in `list_references`.
    pub fn remove_reference(&mut self, index: usize) -> Result<String> {
        let removed = self.references.remove_at(index)?;
        self.references_unreadable = false;
        Ok(removed)
    }

    pub fn clear_history(&mut self) -> Result<()> {
        self.history.clear()?;
        self.history_unreadable = false;
        Ok(())
    }

    pub fn metrics_text(&self) -> Result<String> {
        self.metrics.render()
    }

    /// Stops the preview, flushes both lists and closes the actuator.
    /// A list file that failed to parse at startup and was never changed is
    /// left as it is. Calling it again does nothing.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        self.stop_preview();
        self.actuator = None;

        let saved_references = if self.references_unreadable {
            warn!(
                "Leaving unreadable {} untouched",
                self.references.path().display()
            );
            Ok(())
        } else {
            self.references.save()
        };
        let saved_history = if self.history_unreadable {
            warn!(
                "Leaving unreadable {} untouched",
                self.history.path().display()
            );
            Ok(())
        } else {
            self.history.save()
        };
        info!("Session closed");
        saved_references.and(saved_history)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            error!("Cannot flush session state: {}", e);
        }
    }
}
