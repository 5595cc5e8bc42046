use crate::grid::{DepthGrid, Grid, NormalMapImage, PointCloudGrid};
use crate::math::Vec3;

use super::stencil;

// --- Mean-of-9 box blurs ---

fn depth_cell(grid: &DepthGrid, x: usize, y: usize) -> u16 {
    let sum: u32 = grid.neighborhood(x, y).iter().map(|&d| d as u32).sum();
    (sum / 9) as u16
}

fn point_cloud_cell(grid: &PointCloudGrid, x: usize, y: usize) -> Vec3 {
    let centre = grid.get(x, y);
    let sum: f32 = grid.neighborhood(x, y).iter().map(|p| p.z).sum();
    Vec3::new(centre.x, centre.y, sum / 9.0)
}

fn normal_map_cell(grid: &NormalMapImage, x: usize, y: usize) -> [u8; 3] {
    let mut sums = [0u32; 3];
    for pixel in grid.neighborhood(x, y) {
        sums[0] += pixel[0] as u32;
        sums[1] += pixel[1] as u32;
        sums[2] += pixel[2] as u32;
    }
    [(sums[0] / 9) as u8, (sums[1] / 9) as u8, (sums[2] / 9) as u8]
}

/// Integer (truncating) mean of each interior cell and its 8 neighbours.
pub fn smooth_depth(depth: DepthGrid, passes: u32) -> DepthGrid {
    stencil::iterate(depth, passes, depth_cell)
}

/// Floating-point mean on the z axis only; x and y are carried through.
pub fn smooth_point_cloud(cloud: PointCloudGrid, passes: u32) -> PointCloudGrid {
    stencil::iterate(cloud, passes, point_cloud_cell)
}

/// Per-channel truncating mean over the encoded normal bytes.
pub fn smooth_normal_map(image: NormalMapImage, passes: u32) -> NormalMapImage {
    stencil::iterate(image, passes, normal_map_cell)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{DEPTH_HEIGHT, DEPTH_WIDTH, UNKNOWN_DEPTH};

    fn ramp_depth(width: usize, height: usize) -> DepthGrid {
        let cells = (0..width * height).map(|i| (i * 37 % 4000) as u16).collect();
        Grid::from_vec(width, height, cells).expect("ramp grid")
    }

    fn assert_border_equal<T: Copy + PartialEq + std::fmt::Debug>(a: &Grid<T>, b: &Grid<T>) {
        for y in 0..a.height() {
            for x in 0..a.width() {
                if a.is_border(x, y) {
                    assert_eq!(a.get(x, y), b.get(x, y), "border cell ({x},{y})");
                }
            }
        }
    }

    #[test]
    fn uniform_depth_is_a_fixed_point() {
        let grid = Grid::filled(16, 12, 1234u16);
        assert_eq!(smooth_depth(grid.clone(), 1), grid);
    }

    #[test]
    fn unknown_pixel_pulls_neighbours_down_by_truncation() {
        let mut grid = Grid::filled(DEPTH_WIDTH, DEPTH_HEIGHT, 1000u16);
        grid.set(100, 100, UNKNOWN_DEPTH);

        let out = smooth_depth(grid, 1);
        for (dx, dy) in [(-1, -1), (0, -1), (1, -1), (-1, 0), (1, 0), (-1, 1), (0, 1), (1, 1)] {
            let x = (100 + dx) as usize;
            let y = (100 + dy) as usize;
            assert_eq!(out.get(x, y), 888, "neighbour ({x},{y})");
        }
        // The centre averages its own 0 with eight 1000s.
        assert_eq!(out.get(100, 100), 888);
        assert_eq!(out.get(102, 100), 1000);
    }

    #[test]
    fn depth_border_survives_many_passes() {
        let grid = ramp_depth(9, 7);
        let out = smooth_depth(grid.clone(), 5);
        assert_border_equal(&grid, &out);
    }

    #[test]
    fn depth_passes_accumulate() {
        let mut grid = Grid::filled(7, 7, 900u16);
        grid.set(3, 3, 0);
        let once = smooth_depth(grid.clone(), 1);
        let twice = smooth_depth(grid, 2);
        assert_eq!(once.get(1, 1), 900);
        assert_ne!(twice.get(1, 1), 900);
    }

    #[test]
    fn point_cloud_smoothing_only_touches_z() {
        let cells = (0..5 * 5)
            .map(|i| Vec3::new(i as f32, -(i as f32), (i % 5) as f32))
            .collect();
        let cloud = Grid::from_vec(5, 5, cells).expect("cloud");
        let out = smooth_point_cloud(cloud.clone(), 3);

        for y in 0..5 {
            for x in 0..5 {
                assert_eq!(out.get(x, y).x, cloud.get(x, y).x);
                assert_eq!(out.get(x, y).y, cloud.get(x, y).y);
            }
        }
        assert_border_equal(&cloud, &out);
        // One pass over a column ramp leaves the interior mean unchanged.
        let once = smooth_point_cloud(cloud, 1);
        assert!((once.get(2, 2).z - 2.0).abs() < 1e-6);
    }

    #[test]
    fn point_cloud_smoothing_does_not_truncate() {
        let mut cloud = Grid::filled(3, 3, Vec3::new(0.0, 0.0, 1.0));
        cloud.set(1, 1, Vec3::new(0.0, 0.0, 2.0));
        let out = smooth_point_cloud(cloud, 1);
        assert!((out.get(1, 1).z - 10.0 / 9.0).abs() < 1e-6);
    }

    #[test]
    fn normal_map_channels_blur_independently() {
        let mut image = Grid::filled(3, 3, [90u8, 180, 10]);
        image.set(1, 1, [0, 255, 19]);
        let out = smooth_normal_map(image.clone(), 1);
        // (8*90 + 0)/9, (8*180 + 255)/9, (8*10 + 19)/9
        assert_eq!(out.get(1, 1), [80, 188, 11]);
        assert_border_equal(&image, &out);
    }

    #[test]
    fn uniform_cloud_is_a_fixed_point() {
        let cloud = Grid::filled(40, 30, Vec3::new(0.25, -0.5, 1.999));
        let out = smooth_point_cloud(cloud.clone(), 1);
        for y in 0..30 {
            for x in 0..40 {
                let (a, b) = (cloud.get(x, y), out.get(x, y));
                assert_eq!((a.x, a.y), (b.x, b.y));
                assert!((a.z - b.z).abs() < 1e-6, "({x},{y}) z {}", b.z);
            }
        }
    }

    #[test]
    fn uniform_normal_map_is_a_fixed_point() {
        let image = Grid::filled(8, 8, [128u8, 128, 255]);
        assert_eq!(smooth_normal_map(image.clone(), 4), image);
    }
}
