use clap::{Parser, ValueEnum};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::sync::Mutex;

use tracing::{debug, info};

mod error;
mod grid;
mod input;
mod math;
mod pipeline;
mod render;
mod scheduler;
mod sensor;
mod settings;
mod terminal_setup;

use grid::{DEPTH_HEIGHT, DEPTH_WIDTH};
use math::Vec3;
use pipeline::RenderedFrame;
use render::frame::run_app_loop;
use render::{AppResult, AppState};
use scheduler::{ChannelSink, FrameOutcome, FrameScheduler, SchedulerStats};
use sensor::capture::{spawn_capture_thread, CaptureMessage};
use sensor::projection::PinholeProjector;
use sensor::synthetic::SyntheticSensor;
use settings::{NormalFormula, PipelineSettings, Rgb, ShaderSettings, SmoothSettings, ViewMode};
use terminal_setup::{cleanup_terminal, enter_terminal, install_panic_hook};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ViewArg {
    NormalMap,
    Shaded,
}

#[derive(Debug, Parser)]
#[command(
    name = "depthshade",
    version,
    about = "Depth-sensor normal maps and Phong shading in the terminal"
)]
struct Cli {
    #[arg(long, help = "Start with depth-map smoothing enabled")]
    smooth_depth: bool,
    #[arg(long, help = "Start with point-cloud smoothing enabled")]
    smooth_cloud: bool,
    #[arg(long, help = "Start with normal-map smoothing enabled")]
    smooth_normals: bool,
    #[arg(long, value_name = "N", default_value_t = 1, help = "Smoothing iterations per stage")]
    cycles: u32,
    #[arg(long, value_enum, default_value_t = ViewArg::Shaded)]
    view: ViewArg,
    #[arg(long, default_value_t = 0.0)]
    ambient: f32,
    #[arg(long, default_value_t = 1.0)]
    diffuse: f32,
    #[arg(long, default_value_t = 0.0)]
    specular: f32,
    #[arg(long, default_value_t = 1)]
    specular_power: i32,
    #[arg(long, value_name = "RRGGBB", value_parser = Rgb::from_hex, default_value = "FFFFFF")]
    base_color: Rgb,
    #[arg(long, help = "Shade with sampled per-pixel color instead of the base color")]
    real_color: bool,
    #[arg(
        long,
        value_name = "X,Y",
        value_parser = parse_light,
        default_value = "0,0",
        allow_hyphen_values = true,
        help = "Initial light position on the sensor plane (metres)"
    )]
    light: Vec3,
    #[arg(long, help = "Estimate normals with a true cross product")]
    cross_product: bool,
    #[arg(long, value_name = "N", default_value_t = 30, help = "Sensor frame rate")]
    fps: u32,
    #[arg(long, default_value_t = 7, help = "Seed for the synthetic sensor")]
    seed: u64,
    #[arg(
        long,
        value_name = "P",
        default_value_t = 0.0,
        help = "Probability that a frame expires before it can be opened"
    )]
    frame_loss: f32,
    #[arg(long, value_name = "N", help = "Process N frames without a terminal and exit")]
    headless: Option<u64>,
    #[arg(long, value_name = "PATH", help = "Write logs to PATH instead of stderr")]
    log_file: Option<PathBuf>,
}

fn parse_light(text: &str) -> Result<Vec3, String> {
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    if parts.len() != 2 {
        return Err(format!("expected X,Y, got '{text}'"));
    }
    let mut coords = [0.0f32; 2];
    for (coord, part) in coords.iter_mut().zip(&parts) {
        *coord = part
            .parse()
            .map_err(|err| format!("invalid coordinate '{part}': {err}"))?;
    }
    Ok(Vec3::new(coords[0], coords[1], 0.0))
}

fn build_settings(cli: &Cli) -> PipelineSettings {
    let mut smooth = SmoothSettings::with_cycles(cli.cycles);
    smooth.depth_map = cli.smooth_depth;
    smooth.point_cloud = cli.smooth_cloud;
    smooth.normal_map = cli.smooth_normals;

    let mut shader = ShaderSettings::new(cli.light, cli.base_color);
    shader.ambient = cli.ambient;
    shader.diffuse = cli.diffuse;
    shader.specular = cli.specular;
    shader.specular_power = cli.specular_power;
    shader.use_real_color = cli.real_color;

    PipelineSettings {
        smooth,
        shader,
        view_mode: match cli.view {
            ViewArg::NormalMap => ViewMode::NormalMap,
            ViewArg::Shaded => ViewMode::ShadedImage,
        },
        normal_formula: if cli.cross_product {
            NormalFormula::CrossProduct
        } else {
            NormalFormula::Reference
        },
    }
}

fn init_tracing(log_file: Option<&Path>) -> AppResult<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true);

    match log_file {
        Some(path) => builder
            .with_ansi(false)
            .with_writer(Mutex::new(File::create(path)?))
            .init(),
        None => builder.with_writer(io::stderr).init(),
    }
    Ok(())
}

fn detect_truecolor() -> bool {
    match std::env::var("COLORTERM") {
        Ok(val) => !val.is_empty() && (val == "truecolor" || val == "24bit"),
        Err(_) => match std::env::var("TERM_PROGRAM") {
            Ok(prog) => prog != "Apple_Terminal",
            Err(_) => match std::env::var("TERM") {
                Ok(term) => {
                    term.contains("ghostty") || term.contains("kitty") || term.contains("wezterm")
                }
                Err(_) => false,
            },
        },
    }
}

fn build_sensor(cli: &Cli) -> SyntheticSensor {
    let mut sensor = SyntheticSensor::new(DEPTH_WIDTH, DEPTH_HEIGHT, cli.seed);
    sensor.frame_loss = cli.frame_loss.clamp(0.0, 1.0);
    sensor
}

fn format_summary(stats: &SchedulerStats) -> String {
    format!(
        "frames started: {}  completed: {}  dropped (busy): {}  missing: {}  undelivered: {}",
        stats.started(),
        stats.completed(),
        stats.dropped(),
        stats.missing(),
        stats.undelivered()
    )
}

fn log_finished_frames(frame_rx: &Receiver<RenderedFrame>) -> u64 {
    let mut count = 0;
    while let Ok(frame) = frame_rx.try_recv() {
        let t = frame.timings;
        info!(
            sequence = frame.sequence,
            view = frame.view_mode.name(),
            mean_level = frame.visible_image().mean_level(),
            depth_ms = t.depth_smooth.as_secs_f32() * 1000.0,
            cloud_ms = t.cloud_smooth.as_secs_f32() * 1000.0,
            normals_ms = t.normals.as_secs_f32() * 1000.0,
            normal_smooth_ms = t.normal_smooth.as_secs_f32() * 1000.0,
            shading_ms = t.shading.as_secs_f32() * 1000.0,
            total_ms = t.total().as_secs_f32() * 1000.0,
            "frame finished"
        );
        count += 1;
    }
    count
}

fn run_headless(cli: &Cli, settings: PipelineSettings, frames: u64) -> AppResult<()> {
    let (frame_tx, frame_rx) = mpsc::channel();
    let projector = PinholeProjector::nominal(DEPTH_WIDTH, DEPTH_HEIGHT);
    let mut scheduler = FrameScheduler::new(projector, ChannelSink::new(frame_tx));
    let stats = scheduler.stats();
    let capture_rx = spawn_capture_thread(build_sensor(cli), cli.fps);

    let mut in_flight = None;
    let mut finished = 0;
    for _ in 0..frames {
        let CaptureMessage::FrameReady(frame) = capture_rx.recv()?;
        match scheduler.on_frame_ready(frame, settings) {
            Ok(FrameOutcome::Started(handle)) => {
                if let Some(previous) = in_flight.replace(handle) {
                    previous.join();
                }
            }
            Ok(FrameOutcome::Dropped) => {}
            Err(err) if err.is_recoverable() => debug!(error = %err, "frame skipped"),
            Err(err) => return Err(err.into()),
        }
        finished += log_finished_frames(&frame_rx);
    }

    if let Some(handle) = in_flight {
        handle.join();
    }
    finished += log_finished_frames(&frame_rx);

    let summary = format_summary(&stats);
    info!(finished, "{summary}");
    println!("{summary}");
    Ok(())
}

fn run_session(
    cli: &Cli,
    app_state: &mut AppState,
    scheduler: &mut FrameScheduler<PinholeProjector, ChannelSink>,
    frame_rx: &Receiver<RenderedFrame>,
    stdout: &mut BufWriter<io::Stdout>,
) -> AppResult<()> {
    let input_rx = input::thread::spawn_input_thread()?;
    let capture_rx = spawn_capture_thread(build_sensor(cli), cli.fps);
    run_app_loop(app_state, scheduler, &capture_rx, frame_rx, &input_rx, stdout)
}

fn run_interactive(cli: &Cli, settings: PipelineSettings) -> AppResult<()> {
    let (frame_tx, frame_rx) = mpsc::channel();
    let projector = PinholeProjector::nominal(DEPTH_WIDTH, DEPTH_HEIGHT);
    let mut scheduler = FrameScheduler::new(projector, ChannelSink::new(frame_tx));
    let mut app_state = AppState::new(settings, scheduler.stats(), detect_truecolor());

    install_panic_hook();
    let mut stdout = BufWriter::with_capacity(1024 * 1024, io::stdout());
    enter_terminal(&mut stdout)?;

    let run_result = run_session(cli, &mut app_state, &mut scheduler, &frame_rx, &mut stdout);

    let summary = format_summary(&app_state.stats);
    let cleanup_result = cleanup_terminal(&mut stdout, Some(&summary));

    run_result?;
    cleanup_result
}

fn main() -> AppResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref())?;

    let settings = build_settings(&cli);
    info!(
        ?settings,
        fps = cli.fps,
        seed = cli.seed,
        threads = rayon::current_num_threads(),
        "starting depthshade"
    );

    match cli.headless {
        Some(frames) => run_headless(&cli, settings, frames),
        None => run_interactive(&cli, settings),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_accepts_negative_coordinates() {
        let light = parse_light("-1.5, 0.25").expect("valid light");
        assert_eq!(light, Vec3::new(-1.5, 0.25, 0.0));
        assert!(parse_light("1,2,3").is_err());
        assert!(parse_light("a,b,c").is_err());
    }

    #[test]
    fn defaults_match_the_running_system() {
        let cli = Cli::try_parse_from(["depthshade"]).expect("defaults parse");
        let settings = build_settings(&cli);
        assert_eq!(settings, PipelineSettings::default());
    }

    #[test]
    fn flags_seed_the_settings() {
        let cli = Cli::try_parse_from([
            "depthshade",
            "--smooth-depth",
            "--smooth-normals",
            "--cycles",
            "3",
            "--view",
            "normal-map",
            "--specular",
            "0.5",
            "--specular-power",
            "8",
            "--base-color",
            "#ff8000",
            "--light",
            "-1,1",
            "--cross-product",
        ])
        .expect("flags parse");
        let settings = build_settings(&cli);

        assert!(settings.smooth.depth_map);
        assert!(!settings.smooth.point_cloud);
        assert!(settings.smooth.normal_map);
        assert_eq!(settings.smooth.point_cloud_cycles(), 3);
        assert_eq!(settings.view_mode, ViewMode::NormalMap);
        assert_eq!(settings.normal_formula, NormalFormula::CrossProduct);
        assert_eq!(settings.shader.specular_power, 8);
        assert_eq!(settings.shader.base_color, Rgb::new(255, 128, 0));
        let light = settings.shader.light();
        assert!((light - Vec3::new(-1.5, 0.5, 0.0)).length() < 1e-6);
    }

    #[test]
    fn zero_cycles_clamp_to_one() {
        let cli = Cli::try_parse_from(["depthshade", "--cycles", "0"]).expect("parse");
        assert_eq!(build_settings(&cli).smooth.depth_map_cycles(), 1);
    }
}
