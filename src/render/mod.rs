pub mod frame;
pub mod halfblock;
pub mod hud;

use std::sync::Arc;
use std::time::Instant;

use crate::input::state::InputState;
use crate::pipeline::RenderedFrame;
use crate::scheduler::SchedulerStats;
use crate::settings::PipelineSettings;
use crossterm::style::Color;

pub fn rgb_to_ansi256(r: u8, g: u8, b: u8) -> u8 {
    if r == g && g == b {
        if r < 8 {
            return 16;
        }
        if r > 248 {
            return 231;
        }
        return 232 + ((r as f32 - 8.0) / 247.0 * 24.0) as u8;
    }
    let ri = (r as f32 / 255.0 * 5.0 + 0.5) as u8;
    let gi = (g as f32 / 255.0 * 5.0 + 0.5) as u8;
    let bi = (b as f32 / 255.0 * 5.0 + 0.5) as u8;
    16 + 36 * ri + 6 * gi + bi
}

pub fn make_color(rgb: [u8; 3], use_truecolor: bool) -> Color {
    if use_truecolor {
        Color::Rgb {
            r: rgb[0],
            g: rgb[1],
            b: rgb[2],
        }
    } else {
        Color::AnsiValue(rgb_to_ansi256(rgb[0], rgb[1], rgb[2]))
    }
}

pub type AppResult<T> = Result<T, Box<dyn std::error::Error>>;
pub type HalfblockCell = ([u8; 3], [u8; 3]);

pub const HALF_BLOCK: char = '\u{2584}';
pub const FRAME_TARGET: std::time::Duration = std::time::Duration::from_millis(8);

/// Display-side state. The settings live here and are copied into each
/// pipeline pass when a frame is admitted.
#[derive(Debug)]
pub struct AppState {
    pub settings: PipelineSettings,
    pub latest_frame: Option<RenderedFrame>,
    pub pixel_buffer: Vec<[u8; 3]>,
    pub halfblock_cells: Vec<HalfblockCell>,
    pub hud_string_buf: String,
    pub input_state: InputState,
    pub stats: Arc<SchedulerStats>,
    pub show_hud: bool,
    pub needs_redraw: bool,
    pub frames_shown: u64,
    pub last_frame_time: Instant,
    pub fps: f32,
    pub use_truecolor: bool,
}

impl AppState {
    pub fn new(settings: PipelineSettings, stats: Arc<SchedulerStats>, use_truecolor: bool) -> Self {
        Self {
            settings,
            latest_frame: None,
            pixel_buffer: Vec::new(),
            halfblock_cells: Vec::new(),
            hud_string_buf: String::with_capacity(512),
            input_state: InputState::default(),
            stats,
            show_hud: true,
            needs_redraw: true,
            frames_shown: 0,
            last_frame_time: Instant::now(),
            fps: 0.0,
            use_truecolor,
        }
    }

    /// Replaces the displayed frame and folds the arrival into the fps average.
    pub fn accept_frame(&mut self, frame: RenderedFrame) {
        let now = Instant::now();
        let delta = now
            .duration_since(self.last_frame_time)
            .as_secs_f32()
            .max(1e-6);
        self.last_frame_time = now;

        let instant_fps = 1.0 / delta;
        self.fps = if self.fps <= 0.01 {
            instant_fps
        } else {
            0.90 * self.fps + 0.10 * instant_fps
        };

        self.frames_shown += 1;
        self.latest_frame = Some(frame);
        self.needs_redraw = true;
    }
}
