use crossterm::event::KeyCode;

use crate::math::Vec3;
use crate::settings::LIGHT_TRANSLATION_STEP;

#[derive(Debug, Default)]
pub struct InputState {
    pub quit_requested: bool,
    pub keys_handled: u64,
}

/// Light translation bound to `code`, if any. Arrows move in z and x,
/// `8`/`2` move in y. Left/right are mirrored to match the image.
pub fn light_translation(code: KeyCode) -> Option<Vec3> {
    let step = LIGHT_TRANSLATION_STEP;
    let delta = match code {
        KeyCode::Up => Vec3::new(0.0, 0.0, step),
        KeyCode::Down => Vec3::new(0.0, 0.0, -step),
        KeyCode::Right => Vec3::new(-step, 0.0, 0.0),
        KeyCode::Left => Vec3::new(step, 0.0, 0.0),
        KeyCode::Char('8') => Vec3::new(0.0, step, 0.0),
        KeyCode::Char('2') => Vec3::new(0.0, -step, 0.0),
        _ => return None,
    };
    Some(delta)
}
