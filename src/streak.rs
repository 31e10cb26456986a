//! Consecutive-day streak calculation.
//!
//! A streak counts distinct UTC calendar days with at least one logged
//! session, walking backward from today. It survives a quiet today as long as
//! yesterday has activity; any earlier gap resets it to zero. Session length
//! is irrelevant here, so a zero-minute backdated record mends a streak.

use chrono::{DateTime, Utc};

use crate::activity::ActivityLog;
use crate::error::Result;
use crate::models::{GroupId, UserId};

/// Current streak for a member as of `now`.
pub async fn current_streak<L>(
    log: &L,
    user: UserId,
    group: GroupId,
    now: DateTime<Utc>,
) -> Result<u64>
where
    L: ActivityLog + ?Sized,
{
    let days = log.distinct_activity_days_ago(user, group, now).await?;
    let streak = streak_from_days_ago(&days);
    tracing::debug!(%user, %group, active_days = days.len(), streak, "Computed streak");
    Ok(streak)
}

/// Streak length from "days ago" values.
///
/// Input need not be sorted or distinct; negative (future) values are ignored.
pub fn streak_from_days_ago(days_ago: &[i64]) -> u64 {
    let mut days: Vec<i64> = days_ago.iter().copied().filter(|d| *d >= 0).collect();
    days.sort_unstable();
    days.dedup();

    let Some(&first) = days.first() else {
        return 0;
    };
    if first > 1 {
        return 0;
    }

    let mut expected = first;
    let mut streak = 0;
    for day in days {
        if day != expected {
            break;
        }
        streak += 1;
        expected += 1;
    }

    streak
}
