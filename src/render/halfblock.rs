use rayon::prelude::*;

use crate::grid::Grid;

use super::HalfblockCell;

// --- Downsample ---

/// Largest rectangle with the image's aspect ratio that fits the target,
/// centred. Returns (offset_x, offset_y, width, height) in target pixels.
pub fn fit_viewport(
    src_width: usize,
    src_height: usize,
    dst_width: usize,
    dst_height: usize,
) -> (usize, usize, usize, usize) {
    if src_width == 0 || src_height == 0 || dst_width == 0 || dst_height == 0 {
        return (0, 0, 0, 0);
    }
    let scale = (dst_width as f32 / src_width as f32).min(dst_height as f32 / src_height as f32);
    let w = ((src_width as f32 * scale) as usize).clamp(1, dst_width);
    let h = ((src_height as f32 * scale) as usize).clamp(1, dst_height);
    ((dst_width - w) / 2, (dst_height - h) / 2, w, h)
}

fn average_box(image: &Grid<[u8; 3]>, x0: usize, x1: usize, y0: usize, y1: usize) -> [u8; 3] {
    let mut sum = [0u32; 3];
    let mut count = 0u32;
    for y in y0..y1 {
        for p in &image.row(y)[x0..x1] {
            sum[0] += p[0] as u32;
            sum[1] += p[1] as u32;
            sum[2] += p[2] as u32;
            count += 1;
        }
    }
    if count == 0 {
        return [0, 0, 0];
    }
    [
        (sum[0] / count) as u8,
        (sum[1] / count) as u8,
        (sum[2] / count) as u8,
    ]
}

/// Box-filters `image` into a `dst_width`×`dst_height` pixel buffer,
/// letterboxed in black.
pub fn downsample_into(
    image: &Grid<[u8; 3]>,
    dst_width: usize,
    dst_height: usize,
    out: &mut Vec<[u8; 3]>,
) {
    out.clear();
    out.resize(dst_width * dst_height, [0, 0, 0]);
    if dst_width == 0 {
        return;
    }

    let (src_w, src_h) = image.dimensions();
    let (off_x, off_y, vw, vh) = fit_viewport(src_w, src_h, dst_width, dst_height);
    if vw == 0 || vh == 0 {
        return;
    }

    out.par_chunks_mut(dst_width)
        .enumerate()
        .for_each(|(py, row)| {
            if py < off_y || py >= off_y + vh {
                return;
            }
            let vy = py - off_y;
            let y0 = vy * src_h / vh;
            let y1 = ((vy + 1) * src_h / vh).max(y0 + 1).min(src_h);
            for (vx, pixel) in row[off_x..off_x + vw].iter_mut().enumerate() {
                let x0 = vx * src_w / vw;
                let x1 = ((vx + 1) * src_w / vw).max(x0 + 1).min(src_w);
                *pixel = average_box(image, x0, x1, y0, y1);
            }
        });
}

/// Pairs pixel rows into half-block cells: top pixel as background, bottom
/// pixel as foreground.
pub fn pair_rows_into(
    fb: &[[u8; 3]],
    width: usize,
    height: usize,
    term_rows: usize,
    out: &mut Vec<HalfblockCell>,
) {
    out.clear();
    out.resize(width * term_rows, ([0u8; 3], [0u8; 3]));
    for term_row in 0..term_rows {
        let top_y = term_row * 2;
        let bot_y = top_y + 1;
        if top_y >= height {
            break;
        }
        for x in 0..width {
            let top = fb[top_y * width + x];
            let bot = if bot_y < height {
                fb[bot_y * width + x]
            } else {
                [0, 0, 0]
            };
            out[term_row * width + x] = (top, bot);
        }
    }
}
