/// Mask a secret for logging, keeping only a short prefix
pub fn mask_key(key: &str) -> String {
    const VISIBLE: usize = 4;

    if key.chars().count() <= VISIBLE * 2 {
        return "****".to_string();
    }

    let prefix: String = key.chars().take(VISIBLE).collect();
    format!("{}****", prefix)
}

/// Format an offset in seconds as `MM:SS.mmm`, or `H:MM:SS.mmm` past the hour
pub fn format_timestamp(seconds: f64) -> String {
    let total_millis = (seconds.max(0.0) * 1000.0).round() as u64;
    let millis = total_millis % 1000;
    let total_seconds = total_millis / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
    } else {
        format!("{:02}:{:02}.{:03}", minutes, secs, millis)
    }
}
