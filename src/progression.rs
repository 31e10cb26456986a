//! Role progression: reconcile earned tier roles with the roles a member holds.
//!
//! A sync reads the member's lifetime minutes and streak, picks one tier per
//! table, diffs against a fresh role snapshot and applies the difference in at
//! most one add call and one remove call.
//!
//! There is no per-member lock. Two syncs racing for the same member may both
//! read the same snapshot and issue overlapping calls; the membership
//! collaborator treats repeated adds and removes as no-ops.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::activity::ActivityLog;
use crate::error::Result;
use crate::membership::{GroupMembership, MembershipError};
use crate::models::{GroupId, RoleId, UserId};
use crate::streak::current_streak;
use crate::tiers::{RolePlan, StreakTier, TierConfig, TierEntry, TimeTier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Roles already matched the earned tiers.
    Unchanged,
    Applied,
    /// The bot may not manage roles here; nothing is reported as earned.
    SkippedMissingPermissions,
}

/// Result of one sync, for the caller's celebratory messaging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSync {
    pub lifetime_minutes: i64,
    pub streak: u64,
    pub status: SyncStatus,
    pub added: BTreeSet<RoleId>,
    pub removed: BTreeSet<RoleId>,
    /// Time tier crossed by this sync, if its role was just granted.
    pub new_time_tier: Option<TierEntry<TimeTier>>,
    /// Streak tier crossed by this sync, if its role was just granted.
    pub new_streak_tier: Option<TierEntry<StreakTier>>,
}

pub struct RoleProgression<L, M> {
    log: L,
    members: M,
    tiers: Arc<TierConfig>,
}

impl<L, M> RoleProgression<L, M>
where
    L: ActivityLog,
    M: GroupMembership,
{
    pub fn new(log: L, members: M, tiers: Arc<TierConfig>) -> Self {
        Self {
            log,
            members,
            tiers,
        }
    }

    /// Streak for a member as of `now`, using this engine's activity log.
    pub async fn streak(&self, user: UserId, group: GroupId, now: DateTime<Utc>) -> Result<u64> {
        current_streak(&self.log, user, group, now).await
    }

    /// Bring a member's tier roles in line with their activity as of `now`.
    ///
    /// Read failures propagate. A missing-permissions failure while mutating
    /// roles is logged and reported as [`SyncStatus::SkippedMissingPermissions`];
    /// any other mutation failure propagates. Roles added before a refused
    /// remove stay in place and are not reported.
    pub async fn sync(
        &self,
        group: GroupId,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<RoleSync> {
        let lifetime_minutes = self.log.sum_duration(user, group).await?;
        let streak = current_streak(&self.log, user, group, now).await?;
        let held = self.members.current_roles(group, user).await?;

        let plan = self.tiers.plan(lifetime_minutes, streak, &held);
        tracing::debug!(
            %group,
            %user,
            lifetime_minutes,
            streak,
            time_tier = ?plan.time_tier.map(|e| e.tier),
            streak_tier = ?plan.streak_tier.map(|e| e.tier),
            to_add = ?plan.to_add,
            to_remove = ?plan.to_remove,
            "Planned role sync"
        );

        let mut outcome = RoleSync {
            lifetime_minutes,
            streak,
            status: SyncStatus::Unchanged,
            added: BTreeSet::new(),
            removed: BTreeSet::new(),
            new_time_tier: None,
            new_streak_tier: None,
        };

        if plan.is_empty() {
            return Ok(outcome);
        }

        match self.apply(group, user, &plan).await {
            Ok(()) => {}
            Err(err) if err.is_missing_permissions() => {
                tracing::warn!(%group, %user, error = %err, "Missing permissions to manage roles");
                outcome.status = SyncStatus::SkippedMissingPermissions;
                return Ok(outcome);
            }
            Err(err) => return Err(err.into()),
        }

        outcome.status = SyncStatus::Applied;
        outcome.new_time_tier = plan.time_tier.filter(|e| plan.to_add.contains(&e.role));
        outcome.new_streak_tier = plan.streak_tier.filter(|e| plan.to_add.contains(&e.role));
        outcome.added = plan.to_add;
        outcome.removed = plan.to_remove;

        tracing::info!(
            %group,
            %user,
            added = ?outcome.added,
            removed = ?outcome.removed,
            "Tier roles updated"
        );

        Ok(outcome)
    }

    async fn apply(
        &self,
        group: GroupId,
        user: UserId,
        plan: &RolePlan,
    ) -> std::result::Result<(), MembershipError> {
        if !plan.to_add.is_empty() {
            self.members.add_roles(group, user, &plan.to_add).await?;
        }
        if !plan.to_remove.is_empty() {
            self.members.remove_roles(group, user, &plan.to_remove).await?;
        }
        Ok(())
    }
}
