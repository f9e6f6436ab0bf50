pub mod actuator;
pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod plate_detection;
pub mod session;
pub mod storage;

pub use config::AppConfig;
pub use error::{PlateError, Result};
pub use session::{Detection, PreviewState, Session};
