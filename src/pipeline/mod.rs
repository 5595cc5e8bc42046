pub mod encoding;
pub mod normals;
pub mod shader;
pub mod smooth;
pub mod stencil;

use std::time::{Duration, Instant};

use crate::grid::{DepthGrid, Grid, NormalMapImage, PointCloudGrid, ShadedImage};
use crate::settings::{PipelineSettings, ViewMode};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StageTimings {
    pub depth_smooth: Duration,
    pub cloud_smooth: Duration,
    pub normals: Duration,
    pub normal_smooth: Duration,
    pub shading: Duration,
}

impl StageTimings {
    pub fn total(&self) -> Duration {
        self.depth_smooth + self.cloud_smooth + self.normals + self.normal_smooth + self.shading
    }
}

/// Finished images for one sensor frame. Owned buffers: handing this to the
/// display moves them, so nothing else can still be writing into them.
#[derive(Debug, Clone)]
pub struct RenderedFrame {
    pub sequence: u64,
    pub view_mode: ViewMode,
    pub normal_map: NormalMapImage,
    pub shaded: Option<ShadedImage>,
    pub timings: StageTimings,
}

impl RenderedFrame {
    /// The image the current view mode asks for.
    pub fn visible_image(&self) -> &Grid<[u8; 3]> {
        match (self.view_mode, self.shaded.as_ref()) {
            (ViewMode::ShadedImage, Some(shaded)) => shaded,
            _ => &self.normal_map,
        }
    }
}

/// Per-frame pipeline state: a frame number and a settings snapshot. Every
/// stage reads its configuration from here.
#[derive(Debug, Clone, Copy)]
pub struct PipelineContext {
    pub sequence: u64,
    pub settings: PipelineSettings,
}

impl PipelineContext {
    pub fn new(sequence: u64, settings: PipelineSettings) -> Self {
        Self { sequence, settings }
    }

    /// Depth smoothing, run before projection.
    pub fn prepare_depth(&self, depth: DepthGrid) -> (DepthGrid, Duration) {
        match self.settings.smooth.depth_passes() {
            Some(passes) => {
                let start = Instant::now();
                let smoothed = smooth::smooth_depth(depth, passes);
                (smoothed, start.elapsed())
            }
            None => (depth, Duration::ZERO),
        }
    }

    /// Point-cloud smoothing, normal estimation, normal-map smoothing and,
    /// in shaded view, shading.
    pub fn render(&self, cloud: PointCloudGrid, depth_smooth: Duration) -> RenderedFrame {
        let mut timings = StageTimings {
            depth_smooth,
            ..StageTimings::default()
        };
        let smooth = &self.settings.smooth;

        let start = Instant::now();
        let cloud = match smooth.point_cloud_passes() {
            Some(passes) => smooth::smooth_point_cloud(cloud, passes),
            None => cloud,
        };
        timings.cloud_smooth = start.elapsed();

        let start = Instant::now();
        let normal_map = normals::estimate_normal_map(&cloud, self.settings.normal_formula);
        timings.normals = start.elapsed();

        let start = Instant::now();
        let normal_map = match smooth.normal_map_passes() {
            Some(passes) => smooth::smooth_normal_map(normal_map, passes),
            None => normal_map,
        };
        timings.normal_smooth = start.elapsed();

        let shaded = if self.settings.view_mode == ViewMode::ShadedImage {
            let start = Instant::now();
            let image = shader::shade(&cloud, &normal_map, &self.settings.shader);
            timings.shading = start.elapsed();
            Some(image)
        } else {
            None
        };

        RenderedFrame {
            sequence: self.sequence,
            view_mode: self.settings.view_mode,
            normal_map,
            shaded,
            timings,
        }
    }
}
