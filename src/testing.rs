//! In-memory collaborators for unit tests.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::activity::{days_ago, ActivityLog};
use crate::error::{Error, Result};
use crate::membership::{GroupMembership, MembershipError};
use crate::models::{ActivityRecord, GroupId, RoleId, UserId};

pub fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
}

#[derive(Default)]
pub struct MemoryActivityLog {
    records: Mutex<Vec<ActivityRecord>>,
    pub fail_reads: bool,
}

impl MemoryActivityLog {
    pub async fn record(
        &self,
        user: UserId,
        group: GroupId,
        minutes: i32,
        occurred_at: DateTime<Utc>,
    ) {
        self.records.lock().await.push(ActivityRecord {
            record_id: Uuid::new_v4(),
            user_id: user,
            group_id: group,
            duration_minutes: minutes,
            occurred_at,
        });
    }

    pub fn failing() -> Self {
        Self {
            fail_reads: true,
            ..Self::default()
        }
    }

    fn check(&self) -> Result<()> {
        if self.fail_reads {
            return Err(Error::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl ActivityLog for MemoryActivityLog {
    async fn sum_duration(&self, user: UserId, group: GroupId) -> Result<i64> {
        self.check()?;
        Ok(self
            .records
            .lock()
            .await
            .iter()
            .filter(|r| r.user_id == user && r.group_id == group)
            .map(|r| i64::from(r.duration_minutes))
            .sum())
    }

    async fn distinct_activity_days_ago(
        &self,
        user: UserId,
        group: GroupId,
        now: DateTime<Utc>,
    ) -> Result<Vec<i64>> {
        self.check()?;
        let days: BTreeSet<i64> = self
            .records
            .lock()
            .await
            .iter()
            .filter(|r| r.user_id == user && r.group_id == group)
            .map(|r| days_ago(now, r.occurred_at))
            .filter(|d| *d >= 0)
            .collect();
        Ok(days.into_iter().collect())
    }
}

#[derive(Default)]
struct MembershipState {
    roles: BTreeSet<RoleId>,
    added: Vec<BTreeSet<RoleId>>,
    removed: Vec<BTreeSet<RoleId>>,
}

/// Role store for one member; clones share state so tests can inspect calls.
#[derive(Clone, Default)]
pub struct FakeMembership {
    state: Arc<Mutex<MembershipState>>,
    pub deny_mutations: bool,
    pub deny_removes: bool,
    pub fail_reads: bool,
    pub reads: Arc<AtomicU64>,
}

impl FakeMembership {
    pub fn holding(roles: &[u64]) -> Self {
        Self {
            state: Arc::new(Mutex::new(MembershipState {
                roles: roles.iter().copied().map(RoleId).collect(),
                ..MembershipState::default()
            })),
            ..Self::default()
        }
    }

    pub fn denying_mutations(mut self) -> Self {
        self.deny_mutations = true;
        self
    }

    pub fn denying_removes(mut self) -> Self {
        self.deny_removes = true;
        self
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub async fn roles(&self) -> BTreeSet<RoleId> {
        self.state.lock().await.roles.clone()
    }

    pub async fn add_calls(&self) -> Vec<BTreeSet<RoleId>> {
        self.state.lock().await.added.clone()
    }

    pub async fn remove_calls(&self) -> Vec<BTreeSet<RoleId>> {
        self.state.lock().await.removed.clone()
    }
}

#[async_trait]
impl GroupMembership for FakeMembership {
    async fn current_roles(
        &self,
        _group: GroupId,
        _user: UserId,
    ) -> std::result::Result<BTreeSet<RoleId>, MembershipError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        if self.fail_reads {
            return Err(MembershipError::Request("gateway unavailable".to_string()));
        }
        Ok(self.state.lock().await.roles.clone())
    }

    async fn add_roles(
        &self,
        _group: GroupId,
        _user: UserId,
        roles: &BTreeSet<RoleId>,
    ) -> std::result::Result<(), MembershipError> {
        if self.deny_mutations {
            return Err(MembershipError::MissingPermissions(
                "Missing Permissions".to_string(),
            ));
        }
        let mut state = self.state.lock().await;
        state.added.push(roles.clone());
        state.roles.extend(roles.iter().copied());
        Ok(())
    }

    async fn remove_roles(
        &self,
        _group: GroupId,
        _user: UserId,
        roles: &BTreeSet<RoleId>,
    ) -> std::result::Result<(), MembershipError> {
        if self.deny_mutations || self.deny_removes {
            return Err(MembershipError::MissingPermissions(
                "Missing Permissions".to_string(),
            ));
        }
        let mut state = self.state.lock().await;
        state.removed.push(roles.clone());
        state.roles.retain(|r| !roles.contains(r));
        Ok(())
    }
}
