use crate::math::{clamp_u8, Vec3};

/// Maps a component in [-1, 1] to a byte via `128 + 128 * c`, clamped.
pub fn encode_component(component: f32) -> u8 {
    clamp_u8(128.0 + component * 128.0)
}

pub fn decode_component(byte: u8) -> f32 {
    (byte as f32 - 128.0) / 128.0
}

pub fn encode_normal(normal: Vec3) -> [u8; 3] {
    [
        encode_component(normal.x),
        encode_component(normal.y),
        encode_component(normal.z),
    ]
}

pub fn decode_normal(pixel: [u8; 3]) -> Vec3 {
    Vec3::new(
        decode_component(pixel[0]),
        decode_component(pixel[1]),
        decode_component(pixel[2]),
    )
}
