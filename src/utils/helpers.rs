/// Formatting helpers shared by the panels and the CLI output

use std::time::Duration;

/// Format bytes to human-readable size
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Format a transfer rate given in KB/s
pub fn format_rate(kbps: f64) -> String {
    if !kbps.is_finite() || kbps <= 0.0 {
        "0.0 KB/s".to_string()
    } else if kbps >= 1024.0 * 1024.0 {
        format!("{:.2} GB/s", kbps / (1024.0 * 1024.0))
    } else if kbps >= 1024.0 {
        format!("{:.2} MB/s", kbps / 1024.0)
    } else {
        format!("{:.1} KB/s", kbps)
    }
}

/// Full uptime at second precision ("3days 4h 5m 6s")
pub fn format_uptime(uptime: Duration) -> String {
    humantime::format_duration(Duration::from_secs(uptime.as_secs())).to_string()
}

/// Truncate string with ellipsis, counting characters rather than bytes
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1048576), "1.00 MB");
        assert_eq!(format_bytes(1073741824), "1.00 GB");
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(0.0), "0.0 KB/s");
        assert_eq!(format_rate(f64::NAN), "0.0 KB/s");
        assert_eq!(format_rate(12.34), "12.3 KB/s");
        assert_eq!(format_rate(2048.0), "2.00 MB/s");
    }

    #[test]
    fn test_format_uptime_drops_subseconds() {
        assert_eq!(format_uptime(Duration::from_millis(3_661_500)), "1h 1m 1s");
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("kworker/u16:3-events", 10), "kworker...");
        assert_eq!(truncate_string("ünïcödé-name", 8), "ünïcö...");
        assert_eq!(truncate_string("abcdef", 2), "ab");
    }
}
