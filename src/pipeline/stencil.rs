use rayon::prelude::*;

use crate::grid::Grid;

// --- Stencil passes ---

/// One 3×3 pass from `src` into `dst`. Border cells are copied verbatim and
/// `cell` is only called for interior cells, so it may index the full
/// neighbourhood. Rows are written in parallel; every read goes to `src`.
pub fn stencil_pass<T, F>(src: &Grid<T>, dst: &mut Grid<T>, cell: &F)
where
    T: Copy + Send + Sync,
    F: Fn(&Grid<T>, usize, usize) -> T + Sync,
{
    debug_assert_eq!(src.dimensions(), dst.dimensions());
    let width = src.width();
    if width == 0 || src.height() == 0 {
        return;
    }

    dst.as_mut_slice()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, out_row)| {
            let in_row = src.row(y);
            for (x, out) in out_row.iter_mut().enumerate() {
                *out = if src.is_border(x, y) {
                    in_row[x]
                } else {
                    cell(src, x, y)
                };
            }
        });
}

/// Runs `passes` stencil passes, ping-ponging between the input grid and one
/// scratch grid of the same shape. Each pass reads the previous pass's output.
pub fn iterate<T, F>(grid: Grid<T>, passes: u32, cell: F) -> Grid<T>
where
    T: Copy + Send + Sync,
    F: Fn(&Grid<T>, usize, usize) -> T + Sync,
{
    if passes == 0 {
        return grid;
    }

    let mut front = grid;
    let mut back = front.clone();
    for _ in 0..passes {
        stencil_pass(&front, &mut back, &cell);
        std::mem::swap(&mut front, &mut back);
    }
    front
}

/// Builds a new grid by evaluating `cell` at every coordinate, one row per task.
pub fn par_map<U, F>(width: usize, height: usize, cell: F) -> Grid<U>
where
    U: Copy + Default + Send,
    F: Fn(usize, usize) -> U + Sync,
{
    let mut out = Grid::filled(width, height, U::default());
    if width == 0 {
        return out;
    }

    out.as_mut_slice()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, out_row)| {
            for (x, out) in out_row.iter_mut().enumerate() {
                *out = cell(x, y);
            }
        });
    out
}
