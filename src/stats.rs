use std::fmt;

use clap::ValueEnum;

use crate::models::BucketStats;

/// Number of buckets a timeframe chart covers.
pub const BUCKETS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Timeframe {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Timeframe {
    pub fn bucket_days(self) -> i64 {
        match self {
            Timeframe::Daily => 1,
            Timeframe::Weekly => 7,
            Timeframe::Monthly => 30,
            Timeframe::Yearly => 365,
        }
    }

    pub fn bucket_seconds(self) -> i64 {
        self.bucket_days() * 24 * 60 * 60
    }

    pub fn unit(self) -> &'static str {
        match self {
            Timeframe::Daily => "day",
            Timeframe::Weekly => "week",
            Timeframe::Monthly => "month",
            Timeframe::Yearly => "year",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Timeframe::Daily => "daily",
            Timeframe::Weekly => "weekly",
            Timeframe::Monthly => "monthly",
            Timeframe::Yearly => "yearly",
        };
        f.write_str(label)
    }
}

/// Expand sparse grouped rows into exactly [`BUCKETS`] entries, oldest first.
///
/// Buckets with no row are zero-filled; rows outside the window are dropped.
pub fn fill_buckets(rows: &[BucketStats]) -> Vec<BucketStats> {
    (0..BUCKETS as i64)
        .rev()
        .map(|times_ago| {
            rows.iter()
                .find(|row| row.times_ago == times_ago)
                .copied()
                .unwrap_or(BucketStats {
                    times_ago,
                    ..BucketStats::default()
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_widths() {
        assert_eq!(Timeframe::Daily.bucket_seconds(), 86_400);
        assert_eq!(Timeframe::Weekly.bucket_days(), 7);
        assert_eq!(Timeframe::Monthly.bucket_days(), 30);
        assert_eq!(Timeframe::Yearly.bucket_days(), 365);
    }

    #[test]
    fn fill_buckets_zero_fills_and_orders_oldest_first() {
        let rows = vec![
            BucketStats {
                times_ago: 0,
                minutes: 30,
                sessions: 2,
            },
            BucketStats {
                times_ago: 3,
                minutes: 15,
                sessions: 1,
            },
            BucketStats {
                times_ago: 40,
                minutes: 99,
                sessions: 9,
            },
        ];

        let filled = fill_buckets(&rows);

        assert_eq!(filled.len(), BUCKETS);
        assert_eq!(filled.first().map(|b| b.times_ago), Some(11));
        assert_eq!(filled.last().copied(), Some(rows[0]));
        assert_eq!(filled[BUCKETS - 4], rows[1]);
        assert_eq!(filled.iter().map(|b| b.minutes).sum::<i64>(), 45);
    }
}
