use crossterm::{
    cursor, queue,
    style::{Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal,
};
use std::io::{self, Write};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Instant;

use tracing::debug;

use crate::input::thread::InputReceiver;
use crate::pipeline::RenderedFrame;
use crate::scheduler::{FrameScheduler, FrameSink, PointCloudProjector};
use crate::sensor::capture::{CaptureMessage, CaptureReceiver};

use super::hud::{draw_hud, is_hud_overlay_row};
use super::{make_color, AppResult, AppState, FRAME_TARGET, HALF_BLOCK};

pub fn render_frame(
    app_state: &mut AppState,
    terminal_size: (u16, u16),
    stdout: &mut impl Write,
) -> io::Result<()> {
    let cols = terminal_size.0.max(1);
    let rows = terminal_size.1.max(1);
    let term_cols = cols as usize;
    let term_rows = rows as usize;
    let px_height = term_rows * 2;

    match app_state.latest_frame.as_ref() {
        Some(frame) => super::halfblock::downsample_into(
            frame.visible_image(),
            term_cols,
            px_height,
            &mut app_state.pixel_buffer,
        ),
        None => {
            app_state.pixel_buffer.clear();
            app_state
                .pixel_buffer
                .resize(term_cols * px_height, [0, 0, 0]);
        }
    }
    super::halfblock::pair_rows_into(
        &app_state.pixel_buffer,
        term_cols,
        px_height,
        term_rows,
        &mut app_state.halfblock_cells,
    );

    let tc = app_state.use_truecolor;
    let mut last_bg: Option<[u8; 3]> = None;
    let mut last_fg: Option<[u8; 3]> = None;

    for term_row in 0..term_rows {
        if is_hud_overlay_row(app_state.show_hud, term_row, term_rows) {
            last_bg = None;
            last_fg = None;
            continue;
        }

        queue!(stdout, cursor::MoveTo(0, term_row as u16))?;
        for x in 0..term_cols {
            let (top, bottom) = app_state.halfblock_cells[term_row * term_cols + x];
            if last_bg != Some(top) {
                queue!(stdout, SetBackgroundColor(make_color(top, tc)))?;
                last_bg = Some(top);
            }
            if last_fg != Some(bottom) {
                queue!(stdout, SetForegroundColor(make_color(bottom, tc)))?;
                last_fg = Some(bottom);
            }
            queue!(stdout, Print(HALF_BLOCK))?;
        }
    }

    if app_state.show_hud {
        draw_hud(app_state, cols, rows, stdout)?;
    }

    queue!(stdout, ResetColor)?;
    stdout.flush()
}

/// Forwards every pending frame-ready notification to the scheduler.
/// Returns false once the capture thread has gone away.
pub fn dispatch_notifications<P, S>(
    app_state: &AppState,
    scheduler: &mut FrameScheduler<P, S>,
    capture_rx: &CaptureReceiver,
) -> AppResult<bool>
where
    P: PointCloudProjector + 'static,
    S: FrameSink + 'static,
{
    loop {
        match capture_rx.try_recv() {
            Ok(CaptureMessage::FrameReady(frame)) => {
                match scheduler.on_frame_ready(frame, app_state.settings) {
                    Ok(_) => {}
                    Err(err) if err.is_recoverable() => debug!(error = %err, "frame skipped"),
                    Err(err) => return Err(err.into()),
                }
            }
            Err(TryRecvError::Empty) => return Ok(true),
            Err(TryRecvError::Disconnected) => return Ok(false),
        }
    }
}

/// Keeps only the newest finished frame.
pub fn collect_finished_frames(app_state: &mut AppState, frame_rx: &Receiver<RenderedFrame>) {
    while let Ok(frame) = frame_rx.try_recv() {
        app_state.accept_frame(frame);
    }
}

pub fn run_app_loop<P, S>(
    app_state: &mut AppState,
    scheduler: &mut FrameScheduler<P, S>,
    capture_rx: &CaptureReceiver,
    frame_rx: &Receiver<RenderedFrame>,
    input_rx: &InputReceiver,
    stdout: &mut io::BufWriter<io::Stdout>,
) -> AppResult<()>
where
    P: PointCloudProjector + 'static,
    S: FrameSink + 'static,
{
    let mut last_size = terminal::size()?;
    loop {
        let loop_start = Instant::now();

        if crate::input::drain_input_events(app_state, input_rx)? {
            break;
        }

        if !dispatch_notifications(app_state, scheduler, capture_rx)? {
            return Err("capture thread stopped".into());
        }
        collect_finished_frames(app_state, frame_rx);

        let terminal_size = terminal::size()?;
        if terminal_size != last_size {
            last_size = terminal_size;
            app_state.needs_redraw = true;
        }
        if app_state.needs_redraw {
            render_frame(app_state, terminal_size, stdout)?;
            app_state.needs_redraw = false;
        }

        let spent = loop_start.elapsed();
        if spent < FRAME_TARGET {
            std::thread::sleep(FRAME_TARGET - spent);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::pipeline::StageTimings;
    use crate::scheduler::{ChannelSink, SchedulerStats};
    use crate::sensor::projection::PinholeProjector;
    use crate::settings::{PipelineSettings, ViewMode};
    use std::sync::mpsc;
    use std::sync::Arc;

    fn make_state() -> AppState {
        AppState::new(
            PipelineSettings::default(),
            Arc::new(SchedulerStats::default()),
            true,
        )
    }

    fn frame(sequence: u64, value: u8) -> RenderedFrame {
        RenderedFrame {
            sequence,
            view_mode: ViewMode::NormalMap,
            normal_map: Grid::filled(8, 6, [value, value, value]),
            shaded: None,
            timings: StageTimings::default(),
        }
    }

    #[test]
    fn newest_finished_frame_wins() {
        let (tx, rx) = mpsc::channel();
        tx.send(frame(1, 10)).expect("send first");
        tx.send(frame(2, 20)).expect("send second");

        let mut app = make_state();
        collect_finished_frames(&mut app, &rx);
        assert_eq!(app.latest_frame.as_ref().map(|f| f.sequence), Some(2));
        assert_eq!(app.frames_shown, 2);
    }

    #[test]
    fn notifications_reach_the_scheduler() {
        let (frame_tx, frame_rx) = mpsc::channel();
        let projector = PinholeProjector::nominal(8, 6);
        let mut scheduler = FrameScheduler::new(projector, ChannelSink::new(frame_tx));
        let mut app = make_state();
        app.stats = scheduler.stats();

        let (capture_tx, capture_rx) = mpsc::channel();
        capture_tx
            .send(CaptureMessage::FrameReady(None))
            .expect("send missing");
        capture_tx
            .send(CaptureMessage::FrameReady(Some(Grid::filled(8, 6, 1000u16))))
            .expect("send frame");

        let alive = dispatch_notifications(&app, &mut scheduler, &capture_rx).expect("dispatch");
        assert!(alive);
        assert_eq!(app.stats.missing(), 1);
        assert_eq!(app.stats.started(), 1);

        let finished = frame_rx
            .recv_timeout(std::time::Duration::from_secs(5))
            .expect("published frame");
        assert_eq!(finished.normal_map.dimensions(), (8, 6));

        drop(capture_tx);
        let alive = dispatch_notifications(&app, &mut scheduler, &capture_rx).expect("dispatch");
        assert!(!alive);
    }

    #[test]
    fn render_writes_half_blocks_and_hud() {
        let mut app = make_state();
        app.accept_frame(frame(0, 90));
        let mut out: Vec<u8> = Vec::new();
        render_frame(&mut app, (12, 5), &mut out).expect("render");
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains(HALF_BLOCK));
        assert!(text.contains("FPS:"));
        assert_eq!(app.halfblock_cells.len(), 12 * 5);
    }
}
