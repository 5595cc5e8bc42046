use crate::grid::{DepthGrid, PointCloudGrid, DEPTH_WIDTH, UNKNOWN_DEPTH, UNKNOWN_POINT};
use crate::math::Vec3;
use crate::pipeline::stencil;
use crate::scheduler::PointCloudProjector;

/// Nominal depth-camera focal length at 640×480, in pixels.
pub const NOMINAL_FOCAL_LENGTH_PX: f32 = 571.401;

/// Pinhole model with the principal point at the image centre.
/// Sensor space: x right, y up, z forward, metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinholeProjector {
    pub focal_length: f32,
    pub cx: f32,
    pub cy: f32,
}

impl PinholeProjector {
    /// Nominal intrinsics scaled to the given resolution.
    pub fn nominal(width: usize, height: usize) -> Self {
        Self {
            focal_length: NOMINAL_FOCAL_LENGTH_PX * width as f32 / DEPTH_WIDTH as f32,
            cx: width as f32 * 0.5,
            cy: height as f32 * 0.5,
        }
    }

    /// Un-normalized view ray through pixel (x, y) with z = 1.
    pub fn ray(&self, x: usize, y: usize) -> Vec3 {
        Vec3::new(
            (x as f32 - self.cx) / self.focal_length,
            (self.cy - y as f32) / self.focal_length,
            1.0,
        )
    }

    pub fn project_sample(&self, x: usize, y: usize, depth_mm: u16) -> Vec3 {
        if depth_mm == UNKNOWN_DEPTH {
            return UNKNOWN_POINT;
        }
        self.ray(x, y) * (depth_mm as f32 / 1000.0)
    }
}

impl PointCloudProjector for PinholeProjector {
    fn project(&self, depth: &DepthGrid) -> PointCloudGrid {
        stencil::par_map(depth.width(), depth.height(), |x, y| {
            self.project_sample(x, y, depth.get(x, y))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{is_known_point, Grid, DEPTH_HEIGHT};

    #[test]
    fn centre_pixel_projects_onto_the_optical_axis() {
        let projector = PinholeProjector::nominal(DEPTH_WIDTH, DEPTH_HEIGHT);
        let p = projector.project_sample(320, 240, 1500);
        assert_eq!(p, Vec3::new(0.0, 0.0, 1.5));
    }

    #[test]
    fn image_axes_map_to_sensor_axes() {
        let projector = PinholeProjector::nominal(DEPTH_WIDTH, DEPTH_HEIGHT);
        let top_left = projector.project_sample(0, 0, 1000);
        assert!(top_left.x < 0.0 && top_left.y > 0.0);
        let expected_x = -320.0 / NOMINAL_FOCAL_LENGTH_PX;
        assert!((top_left.x - expected_x).abs() < 1e-6);
    }

    #[test]
    fn unknown_depth_projects_to_unknown_point() {
        let mut depth = Grid::filled(4, 4, 800u16);
        depth.set(2, 1, UNKNOWN_DEPTH);
        let cloud = PinholeProjector::nominal(4, 4).project(&depth);
        assert_eq!(cloud.dimensions(), (4, 4));
        assert!(!is_known_point(cloud.get(2, 1)));
        assert!(is_known_point(cloud.get(1, 1)));
    }
}
