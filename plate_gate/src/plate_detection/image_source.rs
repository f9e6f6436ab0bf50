use std::path::PathBuf;

use log::debug;
use log::warn;
use opencv::imgcodecs::imread;
use opencv::imgcodecs::IMREAD_COLOR;
use opencv::prelude::Mat;
use opencv::prelude::MatTraitConst;
use opencv::prelude::VideoCaptureTrait;
use opencv::prelude::VideoCaptureTraitConst;
use opencv::videoio::VideoCapture;
use opencv::videoio::CAP_ANY;

use crate::error::{PlateError, Result};

/// Supplies one image on demand.
pub trait ImageSource {
    fn acquire(&mut self) -> Result<Mat>;
}

pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ImageSource for FileSource {
    fn acquire(&mut self) -> Result<Mat> {
        let unavailable = || PlateError::ImageUnavailable(self.path.clone());
        let path = self.path.to_str().ok_or_else(unavailable)?;
        // imread reports missing and undecodable files as an empty Mat.
        let image = imread(path, IMREAD_COLOR).map_err(|_| unavailable())?;
        if image.empty() {
            return Err(unavailable());
        }
        debug!("Loaded {} ({}x{})", path, image.cols(), image.rows());
        Ok(image)
    }
}

/// Opens the camera, grabs a single frame and releases the device.
pub struct CameraSource {
    index: i32,
}

impl CameraSource {
    pub fn new(index: i32) -> Self {
        Self { index }
    }
}

/// Camera handle that is released when dropped.
pub(crate) struct OpenCamera {
    index: i32,
    capture: VideoCapture,
}

impl OpenCamera {
    pub(crate) fn open(index: i32) -> Result<Self> {
        let capture =
            VideoCapture::new(index, CAP_ANY).map_err(|_| PlateError::CameraUnavailable(index))?;
        if !capture.is_opened().unwrap_or(false) {
            return Err(PlateError::CameraUnavailable(index));
        }
        debug!("Camera {} opened", index);
        Ok(Self { index, capture })
    }

    pub(crate) fn grab(&mut self) -> Result<Mat> {
        let mut image = Mat::default();
        let grabbed = self
            .capture
            .read(&mut image)
            .map_err(|_| PlateError::FrameGrab(self.index))?;
        if !grabbed || image.empty() {
            return Err(PlateError::FrameGrab(self.index));
        }
        Ok(image)
    }
}

impl Drop for OpenCamera {
    fn drop(&mut self) {
        if let Err(e) = self.capture.release() {
            warn!("Cannot release camera {}: {}", self.index, e);
        } else {
            debug!("Camera {} released", self.index);
        }
    }
}

impl ImageSource for CameraSource {
    fn acquire(&mut self) -> Result<Mat> {
        let mut camera = OpenCamera::open(self.index)?;
        camera.grab()
    }
}
