use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

use crate::grid::{DepthGrid, Grid, UNKNOWN_DEPTH};
use crate::math::Vec3;

use super::projection::PinholeProjector;

/// Readings beyond this range come back unknown.
pub const MAX_RANGE_MM: f32 = 4000.0;

const WALL_DEPTH_M: f32 = 2.5;
const FLOOR_HEIGHT_M: f32 = -0.8;
const SPHERE_RADIUS_M: f32 = 0.35;
const ORBIT_FRAMES: f32 = 240.0;

// --- Procedural depth scene ---

/// Animated stand-in for a depth camera: a back wall, a floor and a sphere
/// orbiting in front of the sensor, with per-sample noise and dropout.
#[derive(Debug, Clone)]
pub struct SyntheticSensor {
    width: usize,
    height: usize,
    optics: PinholeProjector,
    rng: StdRng,
    frame_index: u64,
    pub noise_mm: f32,
    pub dropout: f32,
    pub frame_loss: f32,
}

impl SyntheticSensor {
    pub fn new(width: usize, height: usize, seed: u64) -> Self {
        Self {
            width,
            height,
            optics: PinholeProjector::nominal(width, height),
            rng: StdRng::seed_from_u64(seed),
            frame_index: 0,
            noise_mm: 4.0,
            dropout: 0.002,
            frame_loss: 0.0,
        }
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn sphere_centre(&self) -> Vec3 {
        let phase = self.frame_index as f32 / ORBIT_FRAMES * TAU;
        Vec3::new(0.45 * phase.sin(), 0.12 * phase.cos(), 1.7 + 0.25 * phase.cos())
    }

    /// Noise-free distance along z for pixel (x, y), in metres.
    fn scene_depth(&self, x: usize, y: usize, sphere: Vec3) -> f32 {
        let dir = self.optics.ray(x, y);
        let mut depth = WALL_DEPTH_M;

        if dir.y < 0.0 {
            let floor = FLOOR_HEIGHT_M / dir.y;
            depth = depth.min(floor);
        }

        // |t*dir - c|^2 = r^2; dir.z == 1 so t is the z distance.
        let a = dir.length_squared();
        let b = -2.0 * dir.dot(sphere);
        let c = sphere.length_squared() - SPHERE_RADIUS_M * SPHERE_RADIUS_M;
        let disc = b * b - 4.0 * a * c;
        if disc >= 0.0 {
            let t = (-b - disc.sqrt()) / (2.0 * a);
            if t > 0.0 {
                depth = depth.min(t);
            }
        }

        depth
    }

    /// Renders the next depth frame and advances the animation.
    pub fn capture(&mut self) -> DepthGrid {
        let sphere = self.sphere_centre();
        let mut grid = Grid::filled(self.width, self.height, UNKNOWN_DEPTH);

        for y in 0..self.height {
            for x in 0..self.width {
                if self.dropout > 0.0 && self.rng.random::<f32>() < self.dropout {
                    continue;
                }
                let jitter = if self.noise_mm > 0.0 {
                    self.rng.random_range(-self.noise_mm..self.noise_mm)
                } else {
                    0.0
                };
                let mm = self.scene_depth(x, y, sphere) * 1000.0 + jitter;
                if mm > 0.0 && mm <= MAX_RANGE_MM {
                    grid.set(x, y, mm as u16);
                }
            }
        }

        self.frame_index += 1;
        grid
    }

    /// Like `capture`, but occasionally reports that the frame expired before
    /// it could be read.
    pub fn next_frame(&mut self) -> Option<DepthGrid> {
        if self.frame_loss > 0.0 && self.rng.random::<f32>() < self.frame_loss {
            self.frame_index += 1;
            return None;
        }
        Some(self.capture())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_sensor() -> SyntheticSensor {
        let mut sensor = SyntheticSensor::new(64, 48, 7);
        sensor.noise_mm = 0.0;
        sensor.dropout = 0.0;
        sensor
    }

    #[test]
    fn frames_have_requested_shape() {
        let mut sensor = SyntheticSensor::new(32, 24, 1);
        assert_eq!(sensor.capture().dimensions(), (32, 24));
    }

    #[test]
    fn top_rows_see_the_wall_and_centre_sees_the_sphere() {
        let mut sensor = quiet_sensor();
        let frame = sensor.capture();
        assert_eq!(frame.get(0, 0), 2500);
        let centre = frame.get(32, 24);
        assert!(centre > 0 && centre < 2500, "centre depth {centre}");
    }

    #[test]
    fn bottom_rows_hit_the_floor_before_the_wall() {
        let mut sensor = quiet_sensor();
        let frame = sensor.capture();
        assert!(frame.get(0, 47) < 2500);
    }

    #[test]
    fn same_seed_gives_same_frames() {
        let mut a = SyntheticSensor::new(16, 12, 42);
        let mut b = SyntheticSensor::new(16, 12, 42);
        assert_eq!(a.capture(), b.capture());
    }

    #[test]
    fn full_dropout_yields_unknown_samples() {
        let mut sensor = quiet_sensor();
        sensor.dropout = 1.0;
        let frame = sensor.capture();
        assert!(frame.as_slice().iter().all(|&d| d == UNKNOWN_DEPTH));
    }

    #[test]
    fn total_frame_loss_yields_no_frames() {
        let mut sensor = quiet_sensor();
        sensor.frame_loss = 1.0;
        assert!(sensor.next_frame().is_none());
        sensor.frame_loss = 0.0;
        assert!(sensor.next_frame().is_some());
    }
}
