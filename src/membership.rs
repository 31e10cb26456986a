//! Role membership collaborator.
//!
//! The progression engine never caches what it reads here: every sync fetches
//! a fresh snapshot of the member's roles before diffing.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::models::{GroupId, RoleId, UserId};

#[derive(Debug, thiserror::Error)]
pub enum MembershipError {
    /// The bot may not manage these roles (Discord code 50013).
    #[error("Missing permissions: {0}")]
    MissingPermissions(String),

    #[error("Member not found: {0}")]
    NotFound(String),

    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    #[error("Request failed: {0}")]
    Request(String),
}

impl MembershipError {
    pub fn is_missing_permissions(&self) -> bool {
        matches!(self, MembershipError::MissingPermissions(_))
    }
}

/// Read and mutate the roles a user holds within a group.
///
/// Adding a role the user already holds, or removing one they lack, must be a
/// no-op at this level; concurrent syncs for the same user rely on it.
#[async_trait]
pub trait GroupMembership: Send + Sync {
    async fn current_roles(
        &self,
        group: GroupId,
        user: UserId,
    ) -> Result<BTreeSet<RoleId>, MembershipError>;

    async fn add_roles(
        &self,
        group: GroupId,
        user: UserId,
        roles: &BTreeSet<RoleId>,
    ) -> Result<(), MembershipError>;

    async fn remove_roles(
        &self,
        group: GroupId,
        user: UserId,
        roles: &BTreeSet<RoleId>,
    ) -> Result<(), MembershipError>;
}
