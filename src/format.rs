//! Display helpers for probe results.

/// `m:ss`, or `h:mm:ss` once the duration reaches an hour. Zero or negative
/// input yields an empty string.
pub fn format_duration(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return String::new();
    }
    let total = seconds.floor() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// `YYYYMMDD` to `YYYY/MM/DD`; anything else is returned unchanged.
pub fn format_upload_date(date: &str) -> String {
    if date.len() == 8 && date.bytes().all(|b| b.is_ascii_digit()) {
        format!("{}/{}/{}", &date[0..4], &date[4..6], &date[6..8])
    } else {
        date.to_string()
    }
}
