use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{debug, warn};

use crate::error::FrameError;
use crate::grid::{DepthGrid, PointCloudGrid};
use crate::pipeline::{PipelineContext, RenderedFrame};
use crate::settings::PipelineSettings;

/// Maps a depth grid to sensor-space points using the sensor's calibration.
/// Unknown depth samples must project to an unknown point.
pub trait PointCloudProjector: Send + Sync {
    fn project(&self, depth: &DepthGrid) -> PointCloudGrid;
}

/// Receives finished frames. Runs on the pipeline worker thread.
pub trait FrameSink: Send + Sync {
    fn publish(&self, frame: RenderedFrame) -> Result<(), FrameError>;
}

/// Hands frames to the display loop over a channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<RenderedFrame>,
}

impl ChannelSink {
    pub fn new(tx: Sender<RenderedFrame>) -> Self {
        Self { tx }
    }
}

impl FrameSink for ChannelSink {
    fn publish(&self, frame: RenderedFrame) -> Result<(), FrameError> {
        self.tx
            .send(frame)
            .map_err(|_| FrameError::DisplayUnavailable)
    }
}

#[derive(Debug, Default)]
pub struct SchedulerStats {
    started: AtomicU64,
    completed: AtomicU64,
    dropped: AtomicU64,
    missing: AtomicU64,
    undelivered: AtomicU64,
}

impl SchedulerStats {
    pub fn started(&self) -> u64 {
        self.started.load(Ordering::Relaxed)
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Frames skipped because a pass was already in flight.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn missing(&self) -> u64 {
        self.missing.load(Ordering::Relaxed)
    }

    /// Frames processed but refused by the display.
    pub fn undelivered(&self) -> u64 {
        self.undelivered.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
pub struct WorkerHandle(JoinHandle<()>);

impl WorkerHandle {
    pub fn join(self) {
        if self.0.join().is_err() {
            warn!("pipeline worker panicked");
        }
    }
}

#[derive(Debug)]
pub enum FrameOutcome {
    Started(WorkerHandle),
    Dropped,
}

/// Clears the processing flag when the worker finishes, panicking or not.
struct IdleOnDrop(Arc<AtomicBool>);

impl Drop for IdleOnDrop {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Admits at most one pipeline pass at a time. A frame that arrives while a
/// pass is running is dropped, never queued.
///
/// `on_frame_ready` must be called from a single notification thread; the
/// only other writer of the processing flag is the worker clearing it.
pub struct FrameScheduler<P, S> {
    processing: Arc<AtomicBool>,
    projector: Arc<P>,
    sink: Arc<S>,
    stats: Arc<SchedulerStats>,
    next_sequence: u64,
}

impl<P, S> FrameScheduler<P, S>
where
    P: PointCloudProjector + 'static,
    S: FrameSink + 'static,
{
    pub fn new(projector: P, sink: S) -> Self {
        Self {
            processing: Arc::new(AtomicBool::new(false)),
            projector: Arc::new(projector),
            sink: Arc::new(sink),
            stats: Arc::new(SchedulerStats::default()),
            next_sequence: 0,
        }
    }

    pub fn stats(&self) -> Arc<SchedulerStats> {
        Arc::clone(&self.stats)
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    /// Handles one frame-ready notification.
    ///
    /// Depth smoothing and projection run on the calling thread; the rest of
    /// the chain runs on a fresh worker thread which publishes to the sink
    /// and then returns the scheduler to idle.
    pub fn on_frame_ready(
        &mut self,
        frame: Option<DepthGrid>,
        settings: PipelineSettings,
    ) -> Result<FrameOutcome, FrameError> {
        if self.processing.load(Ordering::Acquire) {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            debug!("pipeline busy, frame dropped");
            return Ok(FrameOutcome::Dropped);
        }

        let Some(depth) = frame else {
            self.stats.missing.fetch_add(1, Ordering::Relaxed);
            debug!("frame-ready notification carried no depth frame");
            return Err(FrameError::MissingFrame);
        };

        self.processing.store(true, Ordering::Release);
        let idle = IdleOnDrop(Arc::clone(&self.processing));

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let ctx = PipelineContext::new(sequence, settings);

        let dimensions = depth.dimensions();
        let (depth, depth_smooth) = ctx.prepare_depth(depth);
        let cloud = self.projector.project(&depth);
        cloud.ensure_dimensions(dimensions)?;

        let sink = Arc::clone(&self.sink);
        let stats = Arc::clone(&self.stats);
        let worker = std::thread::Builder::new()
            .name("depthshade-pipeline".into())
            .spawn(move || {
                let _idle = idle;
                let frame = ctx.render(cloud, depth_smooth);
                let timings = frame.timings;
                match sink.publish(frame) {
                    Ok(()) => debug!(
                        sequence,
                        total_ms = timings.total().as_secs_f32() * 1000.0,
                        normals_ms = timings.normals.as_secs_f32() * 1000.0,
                        shading_ms = timings.shading.as_secs_f32() * 1000.0,
                        "frame published"
                    ),
                    Err(err) => {
                        stats.undelivered.fetch_add(1, Ordering::Relaxed);
                        warn!(sequence, error = %err, "discarding finished frame");
                    }
                }
                stats.completed.fetch_add(1, Ordering::Relaxed);
            })?;

        self.stats.started.fetch_add(1, Ordering::Relaxed);
        Ok(FrameOutcome::Started(WorkerHandle(worker)))
    }
}
