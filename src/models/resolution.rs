// Aggregation granularities. Each resolution owns one bucket table and a
// truncation rule mapping a moment to its period key.

use chrono::{DateTime, Timelike, Utc};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    FiveMinute,
    Hour,
    Day,
    Month,
    Year,
}

impl Resolution {
    /// Finest to coarsest; the order buckets are written in.
    pub const ALL: [Resolution; 5] = [
        Resolution::FiveMinute,
        Resolution::Hour,
        Resolution::Day,
        Resolution::Month,
        Resolution::Year,
    ];

    /// Bucket table name.
    pub fn table(self) -> &'static str {
        match self {
            Resolution::FiveMinute => "fiveminute",
            Resolution::Hour => "hour",
            Resolution::Day => "day",
            Resolution::Month => "month",
            Resolution::Year => "year",
        }
    }

    /// Period key for `now`: the start of the bucket containing it.
    pub fn period_key(self, now: DateTime<Utc>) -> String {
        match self {
            Resolution::FiveMinute => {
                let minute = now.minute() - now.minute() % 5;
                format!("{} {:02}:{:02}:00", now.format("%Y-%m-%d"), now.hour(), minute)
            }
            Resolution::Hour => now.format("%Y-%m-%d %H:00:00").to_string(),
            Resolution::Day => now.format("%Y-%m-%d").to_string(),
            Resolution::Month => now.format("%Y-%m-01").to_string(),
            Resolution::Year => now.format("%Y-01-01").to_string(),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}
