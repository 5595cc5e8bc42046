pub mod state;
pub mod thread;

use crate::render::{AppResult, AppState};
use crossterm::event::{Event, KeyCode, KeyEventKind};
use std::sync::mpsc::{Receiver, TryRecvError};
use tracing::debug;

pub fn drain_input_events(
    app_state: &mut AppState,
    input_rx: &Receiver<thread::InputMessage>,
) -> AppResult<bool> {
    loop {
        match input_rx.try_recv() {
            Ok(thread::InputMessage::Event(event)) => {
                handle_input_event(app_state, event)?;
                if app_state.input_state.quit_requested {
                    return Ok(true);
                }
            }
            Ok(thread::InputMessage::ReadError(err)) => {
                return Err(format!("Input thread read failed: {err}").into());
            }
            Err(TryRecvError::Empty) => break,
            Err(TryRecvError::Disconnected) => {
                return Err("Input channel disconnected".into());
            }
        }
    }

    Ok(app_state.input_state.quit_requested)
}

/// Applies one terminal event to the settings. Changes reach the pipeline
/// with the next admitted frame.
pub fn handle_input_event(app_state: &mut AppState, event: Event) -> AppResult<()> {
    let key_event = match event {
        Event::Key(key_event) => key_event,
        Event::Resize(_, _) => {
            app_state.needs_redraw = true;
            return Ok(());
        }
        _ => return Ok(()),
    };

    if !matches!(key_event.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
        return Ok(());
    }

    let settings = &mut app_state.settings;
    if let Some(delta) = state::light_translation(key_event.code) {
        settings.shader.translate_light(delta);
    } else {
        match key_event.code {
            KeyCode::Esc => app_state.input_state.quit_requested = true,
            KeyCode::Tab => app_state.show_hud = !app_state.show_hud,
            KeyCode::Char('+') | KeyCode::Char('=') => settings.smooth.increase_cycles(),
            KeyCode::Char('-') | KeyCode::Char('_') => settings.smooth.decrease_cycles(),
            KeyCode::Char(c) => match c.to_ascii_lowercase() {
                'q' => app_state.input_state.quit_requested = true,
                'd' => settings.smooth.depth_map = !settings.smooth.depth_map,
                'p' => settings.smooth.point_cloud = !settings.smooth.point_cloud,
                'n' => settings.smooth.normal_map = !settings.smooth.normal_map,
                's' => settings.view_mode = settings.view_mode.toggle(),
                'c' => settings.normal_formula = settings.normal_formula.toggle(),
                _ => return Ok(()),
            },
            _ => return Ok(()),
        }
    }

    app_state.input_state.keys_handled += 1;
    app_state.needs_redraw = true;
    debug!(key = ?key_event.code, settings = ?app_state.settings, "settings changed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;
    use crate::scheduler::SchedulerStats;
    use crate::settings::{NormalFormula, PipelineSettings, ViewMode};
    use crossterm::event::{KeyEvent, KeyEventState, KeyModifiers};
    use std::sync::mpsc;
    use std::sync::Arc;

    fn make_state() -> AppState {
        let mut app = AppState::new(
            PipelineSettings::default(),
            Arc::new(SchedulerStats::default()),
            false,
        );
        app.needs_redraw = false;
        app
    }

    fn press(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn stage_keys_toggle_smoothing() {
        let mut app = make_state();
        handle_input_event(&mut app, press(KeyCode::Char('d'))).expect("toggle depth");
        handle_input_event(&mut app, press(KeyCode::Char('P'))).expect("toggle cloud");
        assert!(app.settings.smooth.depth_map);
        assert!(app.settings.smooth.point_cloud);
        assert!(!app.settings.smooth.normal_map);
        assert!(app.needs_redraw);

        handle_input_event(&mut app, press(KeyCode::Char('d'))).expect("toggle depth back");
        assert!(!app.settings.smooth.depth_map);
    }

    #[test]
    fn view_and_formula_keys_toggle() {
        let mut app = make_state();
        handle_input_event(&mut app, press(KeyCode::Char('s'))).expect("view");
        handle_input_event(&mut app, press(KeyCode::Char('c'))).expect("formula");
        assert_eq!(app.settings.view_mode, ViewMode::NormalMap);
        assert_eq!(app.settings.normal_formula, NormalFormula::CrossProduct);
    }

    #[test]
    fn cycle_keys_never_drop_below_one() {
        let mut app = make_state();
        handle_input_event(&mut app, press(KeyCode::Char('-'))).expect("decrease at 1");
        assert_eq!(app.settings.smooth.depth_map_cycles(), 1);

        handle_input_event(&mut app, press(KeyCode::Char('='))).expect("increase");
        handle_input_event(&mut app, press(KeyCode::Char('+'))).expect("increase");
        assert_eq!(app.settings.smooth.depth_map_cycles(), 3);
        assert_eq!(app.settings.smooth.normal_map_cycles(), 3);

        handle_input_event(&mut app, press(KeyCode::Char('_'))).expect("decrease");
        assert_eq!(app.settings.smooth.point_cloud_cycles(), 2);
    }

    #[test]
    fn light_keys_move_the_light() {
        let mut app = make_state();
        let start = app.settings.shader.light();
        handle_input_event(&mut app, press(KeyCode::Up)).expect("up");
        handle_input_event(&mut app, press(KeyCode::Left)).expect("left");
        handle_input_event(&mut app, press(KeyCode::Char('8'))).expect("raise");
        let moved = app.settings.shader.light() - start;
        let expected = Vec3::new(0.1, 0.1, 0.1);
        assert!((moved - expected).length() < 1e-5);
    }

    #[test]
    fn releases_are_ignored() {
        let mut app = make_state();
        let release = KeyEvent {
            code: KeyCode::Char('d'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        handle_input_event(&mut app, Event::Key(release)).expect("release should succeed");
        assert!(!app.settings.smooth.depth_map);
        assert!(!app.needs_redraw);
        assert_eq!(app.input_state.keys_handled, 0);
    }

    #[test]
    fn drain_stops_at_quit() {
        let (tx, rx) = mpsc::channel();
        tx.send(thread::InputMessage::Event(press(KeyCode::Tab)))
            .expect("send tab");
        tx.send(thread::InputMessage::Event(press(KeyCode::Char('q'))))
            .expect("send q");
        tx.send(thread::InputMessage::Event(press(KeyCode::Char('d'))))
            .expect("send d");

        let mut app = make_state();
        let quit = drain_input_events(&mut app, &rx).expect("drain should succeed");
        assert!(quit);
        assert!(!app.show_hud);
        assert!(!app.settings.smooth.depth_map);
        assert!(matches!(rx.try_recv(), Ok(thread::InputMessage::Event(_))));
    }

    #[test]
    fn read_error_surfaces() {
        let (tx, rx) = mpsc::channel();
        tx.send(thread::InputMessage::ReadError("boom".into()))
            .expect("send error");
        let mut app = make_state();
        assert!(drain_input_events(&mut app, &rx).is_err());
    }
}
