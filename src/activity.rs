//! Read side of the activity log as seen by the streak and tier logic.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::error::Result;
use crate::models::{GroupId, UserId};

#[async_trait]
pub trait ActivityLog: Send + Sync {
    /// Total logged minutes for the member; 0 when nothing is logged.
    async fn sum_duration(&self, user: UserId, group: GroupId) -> Result<i64>;

    /// Distinct UTC calendar days with at least one record, as whole days
    /// before `now`, ascending. Records dated after `now`'s day are excluded.
    async fn distinct_activity_days_ago(
        &self,
        user: UserId,
        group: GroupId,
        now: DateTime<Utc>,
    ) -> Result<Vec<i64>>;
}

/// `now` moved onto a member's local clock, `utc_offset_minutes` east of UTC.
///
/// Records stamped with this value land on the member's local day, and a
/// streak read with the same value treats that day as today.
pub fn local_now(now: DateTime<Utc>, utc_offset_minutes: i64) -> DateTime<Utc> {
    now + Duration::minutes(utc_offset_minutes)
}

/// Whole UTC calendar days between `occurred_at` and `now`.
pub fn days_ago(now: DateTime<Utc>, occurred_at: DateTime<Utc>) -> i64 {
    (now.date_naive() - occurred_at.date_naive()).num_days()
}
