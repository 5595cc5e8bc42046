use crate::grid::{is_known_point, NormalMapImage, PointCloudGrid};
use crate::math::Vec3;
use crate::settings::NormalFormula;

use super::encoding::encode_normal;
use super::stencil;

// --- Normal estimation ---
//
// Each interior cell looks at a triangle of neighbours:
//
//       up
//       O
//   ll     lr

/// Fused edge-vector formula. The x and y terms subtract inside the
/// parentheses where a cross product would multiply; recorded normal maps
/// depend on it bit-for-bit.
fn reference_normal(up: Vec3, ll: Vec3, lr: Vec3) -> Vec3 {
    Vec3::new(
        ((ll.y - up.y) * (lr.z - up.z)) - ((lr.y - up.y) - (ll.z - up.z)),
        ((ll.z - up.z) * (lr.x - up.x)) - ((lr.z - up.z) - (ll.x - up.x)),
        ((ll.x - up.x) * (lr.y - up.y)) - ((lr.x - up.x) * (ll.y - up.y)),
    )
}

fn cross_normal(up: Vec3, ll: Vec3, lr: Vec3) -> Vec3 {
    (ll - up).cross(lr - up)
}

/// Raw (not yet normalized) normal for one cell.
///
/// Border cells and unknown points give zero. When any triangle neighbour is
/// unknown the centre point's own position stands in for the normal.
pub fn raw_normal(cloud: &PointCloudGrid, x: usize, y: usize, formula: NormalFormula) -> Vec3 {
    let centre = cloud.get(x, y);
    if !is_known_point(centre) || cloud.is_border(x, y) {
        return Vec3::ZERO;
    }

    let up = cloud.get(x, y - 1);
    let ll = cloud.get(x - 1, y + 1);
    let lr = cloud.get(x + 1, y + 1);

    if !(is_known_point(up) && is_known_point(ll) && is_known_point(lr)) {
        return centre;
    }

    match formula {
        NormalFormula::Reference => reference_normal(up, ll, lr),
        NormalFormula::CrossProduct => cross_normal(up, ll, lr),
    }
}

pub fn estimate_normal(cloud: &PointCloudGrid, x: usize, y: usize, formula: NormalFormula) -> Vec3 {
    raw_normal(cloud, x, y, formula).normalize()
}

/// Estimates and encodes a normal for every cell of the cloud.
pub fn estimate_normal_map(cloud: &PointCloudGrid, formula: NormalFormula) -> NormalMapImage {
    stencil::par_map(cloud.width(), cloud.height(), |x, y| {
        encode_normal(estimate_normal(cloud, x, y, formula))
    })
}
