use crate::math::Vec3;

/// Translation applied to the light per input event.
pub const LIGHT_TRANSLATION_STEP: f32 = 0.1;

/// Calibration bias added to the light position once, at construction.
pub const LIGHT_OFFSET_X: f32 = -0.5;
pub const LIGHT_OFFSET_Y: f32 = -0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Self = Self::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `RRGGBB`, with or without a leading `#`.
    pub fn from_hex(text: &str) -> Result<Self, String> {
        let hex = text.trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(format!("expected RRGGBB, got '{text}'"));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|err| format!("bad color '{text}': {err}"))
        };
        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmoothSettings {
    pub depth_map: bool,
    pub point_cloud: bool,
    pub normal_map: bool,
    depth_map_cycles: u32,
    point_cloud_cycles: u32,
    normal_map_cycles: u32,
}

impl Default for SmoothSettings {
    fn default() -> Self {
        Self::with_cycles(1)
    }
}

impl SmoothSettings {
    pub fn with_cycles(cycles: u32) -> Self {
        let cycles = cycles.max(1);
        Self {
            depth_map: false,
            point_cloud: false,
            normal_map: false,
            depth_map_cycles: cycles,
            point_cloud_cycles: cycles,
            normal_map_cycles: cycles,
        }
    }

    pub fn depth_map_cycles(&self) -> u32 {
        self.depth_map_cycles
    }

    pub fn point_cloud_cycles(&self) -> u32 {
        self.point_cloud_cycles
    }

    pub fn normal_map_cycles(&self) -> u32 {
        self.normal_map_cycles
    }

    /// Iteration count for the depth stage, or `None` when it is disabled.
    pub fn depth_passes(&self) -> Option<u32> {
        self.depth_map.then_some(self.depth_map_cycles)
    }

    pub fn point_cloud_passes(&self) -> Option<u32> {
        self.point_cloud.then_some(self.point_cloud_cycles)
    }

    pub fn normal_map_passes(&self) -> Option<u32> {
        self.normal_map.then_some(self.normal_map_cycles)
    }

    pub fn increase_cycles(&mut self) {
        self.depth_map_cycles += 1;
        self.point_cloud_cycles += 1;
        self.normal_map_cycles += 1;
    }

    /// All three counts move together and only while the depth count is above 1.
    pub fn decrease_cycles(&mut self) {
        if self.depth_map_cycles > 1 {
            self.depth_map_cycles -= 1;
            self.point_cloud_cycles = (self.point_cloud_cycles - 1).max(1);
            self.normal_map_cycles = (self.normal_map_cycles - 1).max(1);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    NormalMap,
    ShadedImage,
}

impl ViewMode {
    pub fn toggle(self) -> Self {
        match self {
            Self::NormalMap => Self::ShadedImage,
            Self::ShadedImage => Self::NormalMap,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::NormalMap => "NormalMap",
            Self::ShadedImage => "Shaded",
        }
    }
}

/// How the estimator turns its three neighbour points into a normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalFormula {
    /// Fused legacy formula. The first two components subtract where a cross
    /// product multiplies; recorded output images depend on it.
    Reference,
    CrossProduct,
}

impl NormalFormula {
    pub fn toggle(self) -> Self {
        match self {
            Self::Reference => Self::CrossProduct,
            Self::CrossProduct => Self::Reference,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Reference => "Reference",
            Self::CrossProduct => "Cross",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShaderSettings {
    pub ambient: f32,
    pub diffuse: f32,
    pub specular: f32,
    pub specular_power: i32,
    pub use_real_color: bool,
    pub base_color: Rgb,
    light: Vec3,
}

impl Default for ShaderSettings {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Rgb::WHITE)
    }
}

impl ShaderSettings {
    /// Constants default to ambient 0, diffuse 1, specular 0, power 1. The
    /// light starts on the sensor plane: only x and y of `light` are used.
    pub fn new(light: Vec3, base_color: Rgb) -> Self {
        Self {
            ambient: 0.0,
            diffuse: 1.0,
            specular: 0.0,
            specular_power: 1,
            use_real_color: false,
            base_color,
            light: Vec3::new(light.x + LIGHT_OFFSET_X, light.y + LIGHT_OFFSET_Y, 0.0),
        }
    }

    pub fn light(&self) -> Vec3 {
        self.light
    }

    /// Replaces the light position as-is, e.g. from a tracked hand joint.
    pub fn set_light(&mut self, position: Vec3) {
        self.light = position;
    }

    pub fn translate_light(&mut self, delta: Vec3) {
        self.light += delta;
    }

    /// Per-pixel color source for the real-color path. Not wired to a color
    /// stream, so every pixel samples white.
    pub fn sample_color(&self, _x: usize, _y: usize) -> Rgb {
        Rgb::WHITE
    }

    pub fn color_at(&self, x: usize, y: usize) -> Rgb {
        if self.use_real_color {
            self.sample_color(x, y)
        } else {
            self.base_color
        }
    }
}

/// Everything one processing pass reads. Copied per frame so the worker
/// never observes a half-applied key press.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSettings {
    pub smooth: SmoothSettings,
    pub shader: ShaderSettings,
    pub view_mode: ViewMode,
    pub normal_formula: NormalFormula,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            smooth: SmoothSettings::default(),
            shader: ShaderSettings::default(),
            view_mode: ViewMode::ShadedImage,
            normal_formula: NormalFormula::Reference,
        }
    }
}
