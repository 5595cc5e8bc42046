use crate::grid::{is_known_point, NormalMapImage, PointCloudGrid, ShadedImage};
use crate::math::{clamp_u8, Vec3};
use crate::settings::ShaderSettings;

use super::encoding::decode_normal;
use super::stencil;

/// Ambient + diffuse + specular reflectance for one surface point.
///
/// The specular term only applies when the reflection points away from the
/// viewer (`R·V < 0`), and takes the absolute value of `ks * (R·V)^n`.
pub fn reflectance(settings: &ShaderSettings, normal: Vec3, point: Vec3) -> f32 {
    let view = point.normalize();
    let ray = (point - settings.light()).normalize();

    let nl = normal.dot(ray);
    let reflection = (normal * (2.0 * nl) - ray).normalize();

    let ambient = settings.ambient;
    let diffuse = settings.diffuse * nl;

    let rv = reflection.dot(view);
    let specular = if rv < 0.0 {
        (settings.specular * rv.powi(settings.specular_power)).abs()
    } else {
        0.0
    };

    ambient + diffuse + specular
}

/// Shades every known point of `cloud` using the (possibly smoothed) encoded
/// normals. Unknown points come out black.
///
/// Output channel 0 is driven by the base color's blue, channel 2 by its red.
pub fn shade(
    cloud: &PointCloudGrid,
    normal_map: &NormalMapImage,
    settings: &ShaderSettings,
) -> ShadedImage {
    stencil::par_map(cloud.width(), cloud.height(), |x, y| {
        let point = cloud.get(x, y);
        if !is_known_point(point) {
            return [0, 0, 0];
        }

        let color = settings.color_at(x, y);
        let normal = decode_normal(normal_map.get(x, y));
        let intensity = reflectance(settings, normal, point);

        [
            clamp_u8(color.b as f32 * intensity),
            clamp_u8(color.g as f32 * intensity),
            clamp_u8(color.r as f32 * intensity),
        ]
    })
}
