//! Human-readable sizes, speeds, and download progress.

/// Format a byte count as `0 Bytes`, `x.xx KB`, `x.xx MB`, ...
pub fn bytes_to_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let exp = ((bytes as f64).ln() / 1024f64.ln()).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exp as i32);
    format!("{value:.2} {}", UNITS[exp])
}

/// Format a transfer speed as `N KB/s` below 1 MB/s, `x.x MB/s` above.
pub fn speed(bytes_per_sec: u64) -> String {
    let kbps = (bytes_per_sec as f64 / 1024.0).round() as u64;
    if kbps < 1024 {
        format!("{kbps} KB/s")
    } else {
        format!("{:.1} MB/s", kbps as f64 / 1024.0)
    }
}

/// Download progress in megabytes with a one-decimal percentage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub completed_mb: String,
    pub total_mb: String,
    pub percent: String,
}

/// Compute progress from completed/total byte counts. A zero total yields
/// percent `"0"` rather than a division fault.
pub fn progress(completed: u64, total: u64) -> Progress {
    let percent = if total == 0 {
        "0".to_string()
    } else {
        format!("{:.1}", completed as f64 / total as f64 * 100.0)
    };
    Progress {
        completed_mb: format!("{:.2}", completed as f64 / 1024.0 / 1024.0),
        total_mb: format!("{:.2}", total as f64 / 1024.0 / 1024.0),
        percent,
    }
}

/// Abbreviate a pubkey or hash for logging: `abcdef...wxyz`.
pub fn short(s: &str) -> String {
    if s.len() > 10 {
        format!("{}...{}", &s[..6], &s[s.len() - 4..])
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_to_size() {
        assert_eq!(bytes_to_size(0), "0 Bytes");
        assert_eq!(bytes_to_size(512), "512.00 Bytes");
        assert_eq!(bytes_to_size(1024), "1.00 KB");
        assert_eq!(bytes_to_size(1536), "1.50 KB");
        assert_eq!(bytes_to_size(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(bytes_to_size(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn test_speed() {
        assert_eq!(speed(0), "0 KB/s");
        assert_eq!(speed(512 * 1024), "512 KB/s");
        assert_eq!(speed(2 * 1024 * 1024), "2.0 MB/s");
    }

    #[test]
    fn test_progress_percent() {
        let p = progress(50 * 1024 * 1024, 200 * 1024 * 1024);
        assert_eq!(p.completed_mb, "50.00");
        assert_eq!(p.total_mb, "200.00");
        assert_eq!(p.percent, "25.0");
    }

    #[test]
    fn test_progress_zero_total() {
        let p = progress(0, 0);
        assert_eq!(p.percent, "0");
        assert_eq!(p.total_mb, "0.00");
    }

    #[test]
    fn test_short() {
        assert_eq!(short("abcdef0123456789wxyz"), "abcdef...wxyz");
        assert_eq!(short("tiny"), "tiny");
    }
}
