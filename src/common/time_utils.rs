// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use chrono::{DateTime, NaiveDate, Utc};
use std::time::{SystemTime, UNIX_EPOCH};

/// Return the current UNIX timestamp in seconds.
pub fn current_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// UTC calendar day containing `ts`.
pub fn utc_day(ts: u64) -> NaiveDate {
    DateTime::<Utc>::from_timestamp(ts as i64, 0)
        .unwrap_or_default()
        .date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utc_day_rolls_at_midnight() {
        // 2026-01-01T23:59:59Z and 2026-01-02T00:00:00Z
        let before = 1_767_311_999;
        let after = 1_767_312_000;
        assert_ne!(utc_day(before), utc_day(after));
        assert_eq!(utc_day(after), utc_day(after + 3_600));
    }
}
