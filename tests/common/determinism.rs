//! Deterministic test environment setup
//!
//! Provides utilities for reproducible tests by pinning the values that
//! end up in context headers: time zone, colors and timestamps.

use chrono::{DateTime, Local, TimeZone};

/// Environment for spawned `studyrun` binaries: fixed author, no user
/// config from the developer's home directory
pub fn binary_env(home: &std::path::Path) -> Vec<(&'static str, String)> {
    vec![
        ("HOME", home.display().to_string()),
        ("USERPROFILE", home.display().to_string()),
        ("TZ", "UTC".to_string()),
        ("NO_COLOR", "1".to_string()),
        ("RUST_LOG", "".to_string()),
    ]
}

/// Fixed timestamp for testing (2024-01-02 03:04:05 local time)
pub fn test_now() -> DateTime<Local> {
    Local
        .with_ymd_and_hms(2024, 1, 2, 3, 4, 5)
        .single()
        .expect("Invalid test timestamp")
}

/// `test_now()` as rendered in headers
pub const TEST_DATE: &str = "02.01.2024 03:04:05";

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_timestamp() {
        let ts = test_now();
        assert_eq!(ts.year(), 2024);
        assert_eq!(ts.month(), 1);
        assert_eq!(ts.day(), 2);
        assert_eq!(ts.format(studyrun::context::DATE_FORMAT).to_string(), TEST_DATE);
    }
}
