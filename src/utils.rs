//! Formatting helpers for the viewer UI

/// Format recording time in seconds as `MM:SS.SS`
pub fn format_duration(duration_secs: f64) -> String {
    let duration_secs = duration_secs.max(0.0);
    let minutes = (duration_secs / 60.0) as u32;
    let seconds = duration_secs % 60.0;
    format!("{:02}:{:05.2}", minutes, seconds)
}

/// Format a frequency in Hz, switching to kHz above 1 kHz
pub fn format_frequency(hz: f64) -> String {
    if hz.abs() >= 1000.0 {
        format!("{:.1} kHz", hz / 1000.0)
    } else {
        format!("{:.0} Hz", hz)
    }
}
