use crate::error::FrameError;
use crate::math::Vec3;

pub const DEPTH_WIDTH: usize = 640;
pub const DEPTH_HEIGHT: usize = 480;

/// Depth sample value for "no reading".
pub const UNKNOWN_DEPTH: u16 = 0;

/// Projected position of an unknown depth sample.
pub const UNKNOWN_POINT: Vec3 = Vec3::splat(f32::NEG_INFINITY);

/// Row-major W×H grid. Index `x + y * width`.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

pub type DepthGrid = Grid<u16>;
pub type PointCloudGrid = Grid<Vec3>;
pub type NormalMapImage = Grid<[u8; 3]>;
pub type ShadedImage = Grid<[u8; 3]>;

impl<T: Copy> Grid<T> {
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            cells: vec![value; width.saturating_mul(height)],
        }
    }

    pub fn from_vec(width: usize, height: usize, cells: Vec<T>) -> Result<Self, FrameError> {
        let expected = width.saturating_mul(height);
        if cells.len() != expected {
            return Err(FrameError::CellCount {
                expected,
                found: cells.len(),
            });
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn index(&self, x: usize, y: usize) -> usize {
        x + y * self.width
    }

    pub fn get(&self, x: usize, y: usize) -> T {
        self.cells[self.index(x, y)]
    }

    pub fn set(&mut self, x: usize, y: usize, value: T) {
        let idx = self.index(x, y);
        self.cells[idx] = value;
    }

    /// Outermost ring: column 0 / W-1 or row 0 / H-1.
    pub fn is_border(&self, x: usize, y: usize) -> bool {
        x == 0 || y == 0 || x + 1 >= self.width || y + 1 >= self.height
    }

    /// 3×3 neighbourhood of an interior cell in row-major order; centre at 4.
    pub fn neighborhood(&self, x: usize, y: usize) -> [T; 9] {
        let w = self.width;
        let c = self.index(x, y);
        [
            self.cells[c - w - 1],
            self.cells[c - w],
            self.cells[c - w + 1],
            self.cells[c - 1],
            self.cells[c],
            self.cells[c + 1],
            self.cells[c + w - 1],
            self.cells[c + w],
            self.cells[c + w + 1],
        ]
    }

    pub fn row(&self, y: usize) -> &[T] {
        let start = y * self.width;
        &self.cells[start..start + self.width]
    }

    pub fn as_slice(&self) -> &[T] {
        &self.cells
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.cells
    }

    pub fn ensure_dimensions(&self, expected: (usize, usize)) -> Result<(), FrameError> {
        if self.dimensions() != expected {
            return Err(FrameError::DimensionMismatch {
                expected,
                found: self.dimensions(),
            });
        }
        Ok(())
    }
}

impl Grid<[u8; 3]> {
    /// Packed 24-bit pixels, 3-byte stride, no row padding.
    pub fn as_bytes(&self) -> &[u8] {
        self.cells.as_flattened()
    }

    /// Average byte value over every channel of every pixel.
    pub fn mean_level(&self) -> f32 {
        let bytes = self.as_bytes();
        if bytes.is_empty() {
            return 0.0;
        }
        let sum: u64 = bytes.iter().map(|&b| b as u64).sum();
        sum as f32 / bytes.len() as f32
    }
}

pub fn is_known_point(point: Vec3) -> bool {
    !(point.x.is_infinite() || point.y.is_infinite() || point.z.is_infinite())
}
