use crossbeam::channel::bounded;
use crossbeam::channel::Receiver;
use crossbeam::channel::Sender;
use crossbeam::channel::TryRecvError;
use log::info;
use log::warn;
use opencv::prelude::Mat;

use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;
use std::time::Instant;

use super::image_source::OpenCamera;
use crate::error::{PlateError, Result};

/// Receives every frame grabbed by a running preview.
pub trait FrameSink: Send {
    fn show(&mut self, frame: &Mat);
}

impl<F: FnMut(&Mat) + Send> FrameSink for F {
    fn show(&mut self, frame: &Mat) {
        self(frame)
    }
}

/// Where preview frames come from. Dropping the source releases the device.
pub trait FrameSource {
    fn grab(&mut self) -> Result<Mat>;
}

impl FrameSource for OpenCamera {
    fn grab(&mut self) -> Result<Mat> {
        OpenCamera::grab(self)
    }
}

/// Paces the preview loop to a fixed interval.
pub struct IntervalLimiter {
    interval_control: Instant,
    interval: Duration,
}

impl IntervalLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval_control: Instant::now(),
            interval,
        }
    }

    pub fn wait(&mut self) {
        let elapsed = self.interval_control.elapsed();

        if self.interval > elapsed {
            spin_sleep::sleep(self.interval - elapsed);
        }

        self.interval_control = Instant::now();
    }
}

/// Running live preview. Dropping the handle stops it.
pub struct PreviewHandle {
    stop: Sender<()>,
    worker: Option<JoinHandle<()>>,
}

impl PreviewHandle {
    /// Opens the camera on a worker thread and starts forwarding frames.
    /// Fails if the camera cannot be opened.
    pub fn start(
        camera_index: i32,
        interval: Duration,
        sink: Box<dyn FrameSink>,
    ) -> Result<Self> {
        Self::start_with(move || OpenCamera::open(camera_index), interval, sink)
    }

    /// Runs the preview loop over the source built by `open` on the worker
    /// thread. The source is dropped when the loop ends.
    pub fn start_with<S, F>(open: F, interval: Duration, sink: Box<dyn FrameSink>) -> Result<Self>
    where
        S: FrameSource,
        F: FnOnce() -> Result<S> + Send + 'static,
    {
        let (stop_s, stop_r) = bounded::<()>(1);
        let (ready_s, ready_r) = bounded::<Result<()>>(1);

        let worker = thread::Builder::new()
            .name("camera-preview".to_string())
            .spawn(move || run_preview(open, interval, sink, stop_r, ready_s))
            .map_err(|e| PlateError::Preview(e.to_string()))?;

        let ready = ready_r
            .recv()
            .map_err(|_| PlateError::Preview("preview worker exited".to_string()))?;
        let mut handle = Self {
            stop: stop_s,
            worker: Some(worker),
        };
        if let Err(e) = ready {
            handle.join();
            return Err(e);
        }

        info!("Camera preview started");
        Ok(handle)
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .map(|worker| !worker.is_finished())
            .unwrap_or(false)
    }

    /// Requests cancellation and waits until the camera is released.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.stop.try_send(());
        self.join();
    }

    fn join(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Camera preview worker panicked");
            }
            info!("Camera preview stopped");
        }
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_preview<S, F>(
    open: F,
    interval: Duration,
    mut sink: Box<dyn FrameSink>,
    stop: Receiver<()>,
    ready: Sender<Result<()>>,
) where
    S: FrameSource,
    F: FnOnce() -> Result<S>,
{
    let mut source = match open() {
        Ok(source) => {
            let _ = ready.send(Ok(()));
            source
        }
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    let mut limiter = IntervalLimiter::new(interval);
    loop {
        match stop.try_recv() {
            Err(TryRecvError::Empty) => {}
            // Stop requested or handle gone.
            _ => break,
        }

        match source.grab() {
            Ok(frame) => sink.show(&frame),
            Err(e) => {
                warn!("Stopping preview: {}", e);
                break;
            }
        }

        limiter.wait();
    }
    // Camera is released when `source` goes out of scope.
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSource {
        grabs: Arc<AtomicUsize>,
        fail_after: Option<usize>,
        released: Arc<AtomicBool>,
    }

    impl FrameSource for CountingSource {
        fn grab(&mut self) -> Result<Mat> {
            let grabbed = self.grabs.fetch_add(1, Ordering::SeqCst);
            match self.fail_after {
                Some(limit) if grabbed >= limit => Err(PlateError::FrameGrab(0)),
                _ => Ok(Mat::default()),
            }
        }
    }

    impl Drop for CountingSource {
        fn drop(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    fn source(
        fail_after: Option<usize>,
    ) -> (CountingSource, Arc<AtomicUsize>, Arc<AtomicBool>) {
        let grabs = Arc::new(AtomicUsize::new(0));
        let released = Arc::new(AtomicBool::new(false));
        let source = CountingSource {
            grabs: grabs.clone(),
            fail_after,
            released: released.clone(),
        };
        (source, grabs, released)
    }

    #[test]
    fn stop_ends_loop_and_releases_source() {
        let (source, grabs, released) = source(None);
        let shown = Arc::new(AtomicUsize::new(0));
        let sink_shown = shown.clone();

        let handle = PreviewHandle::start_with(
            move || Ok(source),
            Duration::from_millis(5),
            Box::new(move |_: &Mat| {
                sink_shown.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();
        thread::sleep(Duration::from_millis(50));
        assert!(handle.is_running());
        assert!(!released.load(Ordering::SeqCst));

        let started = Instant::now();
        handle.stop();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(released.load(Ordering::SeqCst));

        let grabbed = grabs.load(Ordering::SeqCst);
        assert!(grabbed > 0);
        assert_eq!(shown.load(Ordering::SeqCst), grabbed);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(grabs.load(Ordering::SeqCst), grabbed);
    }

    #[test]
    fn dropping_handle_releases_source() {
        let (source, _, released) = source(None);
        let handle = PreviewHandle::start_with(
            move || Ok(source),
            Duration::from_millis(5),
            Box::new(|_: &Mat| {}),
        )
        .unwrap();
        drop(handle);
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn grab_failure_ends_loop() {
        let (source, grabs, released) = source(Some(3));
        let handle = PreviewHandle::start_with(
            move || Ok(source),
            Duration::from_millis(1),
            Box::new(|_: &Mat| {}),
        )
        .unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while handle.is_running() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!handle.is_running());
        assert!(released.load(Ordering::SeqCst));
        assert_eq!(grabs.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn open_failure_is_returned_by_start() {
        let result = PreviewHandle::start_with(
            || -> Result<CountingSource> { Err(PlateError::CameraUnavailable(7)) },
            Duration::from_millis(1),
            Box::new(|_: &Mat| {}),
        );
        assert!(matches!(result, Err(PlateError::CameraUnavailable(7))));
    }

    #[test]
    fn limiter_waits_for_interval() {
        let mut limiter = IntervalLimiter::new(Duration::from_millis(20));
        let start = Instant::now();
        limiter.wait();
        limiter.wait();
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn closures_are_frame_sinks() {
        let mut count = 0;
        {
            let mut sink = |_: &Mat| count += 1;
            sink.show(&Mat::default());
            sink.show(&Mat::default());
        }
        assert_eq!(count, 2);
    }
}
