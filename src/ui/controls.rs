use iced::widget::{button, container, text, Column, Row};
use iced::{Alignment, Element};

#[derive(Debug, Clone)]
pub enum ControlMessage {
    OpenFile,
    PlayStop,
}

/// Format seconds as M:SS.
pub fn format_time(seconds: f64) -> String {
    let total_secs = seconds.max(0.0) as u64;
    let mins = total_secs / 60;
    let secs = total_secs % 60;
    format!("{mins}:{secs:02}")
}

/// Build the transport row above the player canvas.
pub fn view_controls<'a>(
    is_playing: bool,
    is_ready: bool,
    position: f64,
    duration: f64,
    status: &str,
) -> Element<'a, ControlMessage> {
    let play_label = if is_playing { "Stop" } else { "Play" };

    let mut play_btn = button(text(play_label));
    if is_ready {
        play_btn = play_btn.on_press(ControlMessage::PlayStop);
    }
    let open_btn = button(text("Open File")).on_press(ControlMessage::OpenFile);

    let time_display = text(format!(
        "{} / {}",
        format_time(position),
        format_time(duration)
    ))
    .size(16);

    let controls_row = Row::new()
        .spacing(10)
        .align_y(Alignment::Center)
        .push(open_btn)
        .push(play_btn)
        .push(time_display)
        .push(text(status.to_string()).size(14));

    container(Column::new().push(controls_row))
        .padding(10)
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(9.99), "0:09");
        assert_eq!(format_time(61.0), "1:01");
        assert_eq!(format_time(-3.0), "0:00");
    }
}
