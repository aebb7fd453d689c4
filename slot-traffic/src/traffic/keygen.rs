//! Key/value generation
//!
//! Keys embed a microsecond timestamp so they sort by creation time, plus a
//! random suffix for keys generated within the same microsecond.

use chrono::{DateTime, Local};
use uuid::Uuid;

const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S-%6f";
const SUFFIX_LEN: usize = 8;

/// One generated entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrafficEntry {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct KeyGenerator {
    prefix: String,
}

impl KeyGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn next_entry(&self) -> TrafficEntry {
        self.entry_at(Local::now())
    }

    /// `{prefix}:{timestamp}:{suffix}` / `val:{timestamp}`
    pub fn entry_at(&self, now: DateTime<Local>) -> TrafficEntry {
        let timestamp = now.format(TIMESTAMP_FORMAT).to_string();
        let suffix = Uuid::new_v4().simple().to_string();
        TrafficEntry {
            key: format!("{}:{}:{}", self.prefix, timestamp, &suffix[..SUFFIX_LEN]),
            value: format!("val:{}", timestamp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    #[test]
    fn test_entry_format() {
        let generator = KeyGenerator::new("timekey");
        let now = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let entry = generator.entry_at(now);

        assert!(entry.key.starts_with("timekey:20240309-070501-000000:"));
        assert_eq!(entry.key.len(), "timekey:20240309-070501-000000:".len() + SUFFIX_LEN);
        assert_eq!(entry.value, "val:20240309-070501-000000");
    }

    #[test]
    fn test_keys_unique_within_same_instant() {
        let generator = KeyGenerator::new("t");
        let now = Local::now();
        let keys: HashSet<String> = (0..1000).map(|_| generator.entry_at(now).key).collect();
        assert_eq!(keys.len(), 1000);
    }

    #[test]
    fn test_keys_order_by_time() {
        let generator = KeyGenerator::new("t");
        let earlier = Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let later = Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 1).unwrap();
        assert!(generator.entry_at(earlier).key < generator.entry_at(later).key);
    }
}
