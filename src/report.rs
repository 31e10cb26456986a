use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::models::{BucketStats, GroupId, Totals, UserId};
use crate::stats::Timeframe;
use crate::tiers::TierConfig;

/// Everything a member report shows; gathered by the caller.
pub struct MemberSnapshot<'a> {
    pub group: GroupId,
    pub user: UserId,
    pub generated_at: DateTime<Utc>,
    pub totals: Totals,
    pub streak: u64,
    pub timeframe: Timeframe,
    /// Oldest bucket first, as returned by `stats::fill_buckets`.
    pub buckets: &'a [BucketStats],
}

pub fn build_report(tiers: &TierConfig, snapshot: &MemberSnapshot<'_>) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Practice Report");
    let _ = writeln!(
        output,
        "Member {} in group {} (generated {})",
        snapshot.user,
        snapshot.group,
        snapshot.generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Totals");
    let _ = writeln!(
        output,
        "- {} minutes across {} sessions",
        snapshot.totals.minutes, snapshot.totals.sessions
    );
    let _ = writeln!(output, "- Current streak: {} days", snapshot.streak);

    let minutes = u64::try_from(snapshot.totals.minutes).unwrap_or(0);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Tiers");
    match tiers.time().select(minutes) {
        Some(entry) => {
            let _ = writeln!(output, "- Time tier: {} (from {} minutes)", entry.tier, entry.min);
        }
        None => {
            let _ = writeln!(output, "- Time tier: none yet");
        }
    }
    if let Some(next) = tiers.time().entries().iter().find(|e| e.min > minutes) {
        let _ = writeln!(
            output,
            "- Next time tier: {} in {} minutes",
            next.tier,
            next.min - minutes
        );
    }
    match tiers.streak().select(snapshot.streak) {
        Some(entry) => {
            let _ = writeln!(output, "- Streak tier: {} (from {} days)", entry.tier, entry.min);
        }
        None => {
            let _ = writeln!(output, "- Streak tier: none yet");
        }
    }
    if let Some(next) = tiers.streak().entries().iter().find(|e| e.min > snapshot.streak) {
        let _ = writeln!(
            output,
            "- Next streak tier: {} in {} days",
            next.tier,
            next.min - snapshot.streak
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## History ({})", snapshot.timeframe);
    if snapshot.buckets.iter().all(|b| b.sessions == 0) {
        let _ = writeln!(output, "No sessions recorded for this window.");
    } else {
        let _ = writeln!(output, "| {}s ago | minutes | sessions |", snapshot.timeframe.unit());
        let _ = writeln!(output, "|---|---|---|");
        for bucket in snapshot.buckets {
            let _ = writeln!(
                output,
                "| {} | {} | {} |",
                bucket.times_ago, bucket.minutes, bucket.sessions
            );
        }
    }

    output
}
