use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlateError {
    #[error("cannot read image '{0}'")]
    ImageUnavailable(PathBuf),

    #[error("cannot open camera {0}")]
    CameraUnavailable(i32),

    #[error("cannot grab a frame from camera {0}")]
    FrameGrab(i32),

    #[error("no licence plate found in the image")]
    PlateNotFound,

    #[error("OCR did not recognise any text")]
    NoTextFound,

    #[error("OCR engine failure: {0}")]
    Ocr(String),

    #[error("cannot access '{path}': {message}")]
    Persistence { path: PathBuf, message: String },

    #[error("invalid plate index {index}, expected a number between 1 and {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("invalid plate '{0}'")]
    InvalidPlate(String),

    #[error("invalid configuration '{path}': {message}")]
    Config { path: PathBuf, message: String },

    #[error("actuator on '{port}' is unavailable: {source}")]
    Actuator {
        port: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("camera preview failed: {0}")]
    Preview(String),

    #[error(transparent)]
    OpenCv(#[from] opencv::Error),

    #[error(transparent)]
    Metrics(#[from] prometheus::Error),
}

impl PlateError {
    pub(crate) fn persistence(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        PlateError::Persistence {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PlateError>;
