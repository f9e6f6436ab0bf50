use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use log::info;

use crate::error::{PlateError, Result};
use crate::plate_detection::Verdict;

/// Byte written to the actuator for a verdict.
pub fn verdict_byte(verdict: Verdict) -> u8 {
    match verdict {
        Verdict::Match => b'1',
        Verdict::NoMatch => b'0',
    }
}

/// External device told whether the plate was accepted.
pub trait Actuator {
    fn signal(&mut self, verdict: Verdict) -> io::Result<()>;
}

/// Serial device node (e.g. `/dev/ttyACM0`) driven with single bytes.
///
/// The line discipline is not touched: baud rate and framing are whatever
/// the tty was last set to. USB CDC-ACM boards ignore the baud rate, but a
/// hardware UART has to be set up beforehand, e.g.
/// `stty -F /dev/ttyS0 9600 cs8 -cstopb -parenb raw`.
pub struct SerialActuator {
    port: PathBuf,
    device: File,
}

impl SerialActuator {
    /// Opens the port and waits `settle` for the board to come out of the
    /// reset triggered by opening it.
    pub fn open(port: &Path, settle: Duration) -> Result<Self> {
        let device = OpenOptions::new()
            .write(true)
            .open(port)
            .map_err(|source| PlateError::Actuator {
                port: port.to_path_buf(),
                source,
            })?;
        thread::sleep(settle);

        info!("Actuator connected on {}", port.display());
        Ok(Self {
            port: port.to_path_buf(),
            device,
        })
    }

    pub fn port(&self) -> &Path {
        &self.port
    }
}

impl Actuator for SerialActuator {
    fn signal(&mut self, verdict: Verdict) -> io::Result<()> {
        self.device.write_all(&[verdict_byte(verdict)])?;
        self.device.flush()
    }
}

impl Drop for SerialActuator {
    fn drop(&mut self) {
        info!("Closing actuator on {}", self.port.display());
    }
}
