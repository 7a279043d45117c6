use std::time::Duration;

/// Formats a duration as `HH:MM:SS.mmm`
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms / 60_000) % 60;
    let seconds = (total_ms / 1000) % 60;
    let millis = total_ms % 1000;

    format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}
