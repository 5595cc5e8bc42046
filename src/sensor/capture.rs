use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::grid::DepthGrid;

use super::synthetic::SyntheticSensor;

#[derive(Debug)]
pub enum CaptureMessage {
    /// A new frame is ready. `None` when it could not be opened in time.
    FrameReady(Option<DepthGrid>),
}

pub type CaptureReceiver = Receiver<CaptureMessage>;

pub fn frame_interval(fps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / fps.max(1) as f64)
}

/// Runs the sensor on its own thread, emitting one notification per frame
/// interval. Stops when the receiver goes away.
pub fn spawn_capture_thread(mut sensor: SyntheticSensor, fps: u32) -> CaptureReceiver {
    let (tx, rx) = mpsc::channel();
    let interval = frame_interval(fps);
    let (width, height) = sensor.dimensions();
    info!(fps, width, height, "starting capture thread");

    std::thread::spawn(move || loop {
        let tick = Instant::now();
        let frame = sensor.next_frame();
        if tx.send(CaptureMessage::FrameReady(frame)).is_err() {
            debug!("capture receiver closed, stopping sensor");
            break;
        }
        let spent = tick.elapsed();
        if spent < interval {
            std::thread::sleep(interval - spent);
        }
    });
    rx
}
