use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Wall-clock timestamp in milliseconds since the Unix epoch.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimestampMs(pub u64);

impl TimestampMs {
    pub fn now() -> Self {
        let ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self(ms)
    }

    pub fn as_millis(self) -> u64 {
        self.0
    }

    pub fn saturating_sub_ms(self, ms: u64) -> Self {
        Self(self.0.saturating_sub(ms))
    }
}

#[cfg(test)]
mod tests {
    use super::TimestampMs;

    #[test]
    fn subtraction_saturates_at_epoch() {
        assert_eq!(TimestampMs(10).saturating_sub_ms(25), TimestampMs(0));
        assert_eq!(TimestampMs(100).saturating_sub_ms(25), TimestampMs(75));
    }

    #[test]
    fn now_is_after_2020() {
        assert!(TimestampMs::now() > TimestampMs(1_577_836_800_000));
    }
}
