use crossterm::{
    cursor, queue,
    style::{Print, SetBackgroundColor, SetForegroundColor},
};
use std::fmt::Write as _;
use std::io::{self, Write};

use super::{make_color, AppState};

pub const CONTROLS: &str =
    "D/P/N:Smooth  +/-:Cycles  S:View  C:Normals  Arrows/8/2:Light  Tab:HUD  Q/Esc:Quit";

fn truncate_and_pad_in_place(text: &mut String, width: usize) {
    if width == 0 {
        text.clear();
        return;
    }

    let mut seen_chars = 0usize;
    let mut truncate_byte = None;
    for (idx, _) in text.char_indices() {
        if seen_chars == width {
            truncate_byte = Some(idx);
            break;
        }
        seen_chars += 1;
    }

    if let Some(idx) = truncate_byte {
        text.truncate(idx);
    } else {
        for _ in seen_chars..width {
            text.push(' ');
        }
    }
}

fn stage_label(enabled: bool, cycles: u32) -> String {
    if enabled {
        format!("on({cycles})")
    } else {
        format!("off({cycles})")
    }
}

/// Fills `hud` with the status line for the current state.
pub fn format_status(app_state: &AppState, hud: &mut String) -> std::fmt::Result {
    let settings = &app_state.settings;
    let smooth = &settings.smooth;
    let light = settings.shader.light();
    let stats = &app_state.stats;

    hud.clear();
    write!(
        hud,
        "FPS:{:>5.1}  Frames:{} drop:{} miss:{}  View:{}  Normals:{}  Smooth D:{} P:{} N:{}  Light:({:>5.2},{:>5.2},{:>5.2})",
        app_state.fps,
        stats.completed(),
        stats.dropped(),
        stats.missing(),
        settings.view_mode.name(),
        settings.normal_formula.name(),
        stage_label(smooth.depth_map, smooth.depth_map_cycles()),
        stage_label(smooth.point_cloud, smooth.point_cloud_cycles()),
        stage_label(smooth.normal_map, smooth.normal_map_cycles()),
        light.x,
        light.y,
        light.z,
    )?;

    if let Some(frame) = app_state.latest_frame.as_ref() {
        write!(
            hud,
            "  Pass:{:.1}ms",
            frame.timings.total().as_secs_f32() * 1000.0
        )?;
    }
    write!(hud, "  Cores:{}", rayon::current_num_threads())
}

pub fn draw_hud(
    app_state: &mut AppState,
    cols: u16,
    rows: u16,
    stdout: &mut impl Write,
) -> io::Result<()> {
    let width = cols as usize;
    let mut hud = std::mem::take(&mut app_state.hud_string_buf);
    format_status(app_state, &mut hud).map_err(|_| io::Error::other("failed to format HUD"))?;
    truncate_and_pad_in_place(&mut hud, width);

    let tc = app_state.use_truecolor;
    queue!(
        stdout,
        cursor::MoveTo(0, 0),
        SetBackgroundColor(make_color([0, 0, 0], tc)),
        SetForegroundColor(make_color([245, 245, 245], tc)),
        Print(hud.as_str())
    )?;

    hud.clear();
    hud.push_str(CONTROLS);
    truncate_and_pad_in_place(&mut hud, width);

    queue!(
        stdout,
        cursor::MoveTo(0, rows - 1),
        SetBackgroundColor(make_color([0, 0, 0], tc)),
        SetForegroundColor(make_color([220, 220, 220], tc)),
        Print(hud.as_str())
    )?;

    app_state.hud_string_buf = hud;
    Ok(())
}

pub fn is_hud_overlay_row(show_hud: bool, row: usize, term_rows: usize) -> bool {
    show_hud && (row == 0 || row == term_rows.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::SchedulerStats;
    use crate::settings::PipelineSettings;
    use std::sync::Arc;

    #[test]
    fn pad_and_truncate_respect_char_width() {
        let mut text = String::from("abc");
        truncate_and_pad_in_place(&mut text, 5);
        assert_eq!(text, "abc  ");
        truncate_and_pad_in_place(&mut text, 2);
        assert_eq!(text, "ab");
        let mut wide = String::from("\u{2584}\u{2584}\u{2584}");
        truncate_and_pad_in_place(&mut wide, 1);
        assert_eq!(wide, "\u{2584}");
    }

    #[test]
    fn status_line_reports_settings() {
        let mut settings = PipelineSettings::default();
        settings.smooth.normal_map = true;
        let app = AppState::new(settings, Arc::new(SchedulerStats::default()), true);
        let mut hud = String::new();
        format_status(&app, &mut hud).expect("format");
        assert!(hud.contains("View:Shaded"));
        assert!(hud.contains("Normals:Reference"));
        assert!(hud.contains("D:off(1) P:off(1) N:on(1)"));
        assert!(hud.contains("Light:(-0.50,-0.50, 0.00)"));
    }

    #[test]
    fn overlay_rows_only_when_hud_shown() {
        assert!(is_hud_overlay_row(true, 0, 10));
        assert!(is_hud_overlay_row(true, 9, 10));
        assert!(!is_hud_overlay_row(true, 5, 10));
        assert!(!is_hud_overlay_row(false, 0, 10));
    }
}
