//! Discord-backed role membership using the serenity HTTP client.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use serenity::http::Http;
use serenity::model::id::{GuildId, RoleId as DiscordRoleId, UserId as DiscordUserId};

use crate::membership::{GroupMembership, MembershipError};
use crate::models::{GroupId, RoleId, UserId};

const AUDIT_REASON: &str = "Practice tier update";

#[derive(Clone)]
pub struct DiscordMembership {
    http: Arc<Http>,
}

impl DiscordMembership {
    pub fn new(token: &str) -> Self {
        Self {
            http: Arc::new(Http::new(token)),
        }
    }
}

#[async_trait]
impl GroupMembership for DiscordMembership {
    async fn current_roles(
        &self,
        group: GroupId,
        user: UserId,
    ) -> Result<BTreeSet<RoleId>, MembershipError> {
        let member = self
            .http
            .get_member(guild_id(group)?, user_id(user)?)
            .await
            .map_err(classify)?;

        Ok(member.roles.iter().map(|role| RoleId(role.get())).collect())
    }

    // Discord has no bulk role endpoint; each role is its own request.
    async fn add_roles(
        &self,
        group: GroupId,
        user: UserId,
        roles: &BTreeSet<RoleId>,
    ) -> Result<(), MembershipError> {
        let (guild, member) = (guild_id(group)?, user_id(user)?);
        for role in roles {
            self.http
                .add_member_role(guild, member, role_id(*role)?, Some(AUDIT_REASON))
                .await
                .map_err(classify)?;
        }
        Ok(())
    }

    async fn remove_roles(
        &self,
        group: GroupId,
        user: UserId,
        roles: &BTreeSet<RoleId>,
    ) -> Result<(), MembershipError> {
        let (guild, member) = (guild_id(group)?, user_id(user)?);
        for role in roles {
            self.http
                .remove_member_role(guild, member, role_id(*role)?, Some(AUDIT_REASON))
                .await
                .map_err(classify)?;
        }
        Ok(())
    }
}

fn guild_id(group: GroupId) -> Result<GuildId, MembershipError> {
    nonzero(group.get(), "guild").map(GuildId::new)
}

fn user_id(user: UserId) -> Result<DiscordUserId, MembershipError> {
    nonzero(user.get(), "user").map(DiscordUserId::new)
}

fn role_id(role: RoleId) -> Result<DiscordRoleId, MembershipError> {
    nonzero(role.get(), "role").map(DiscordRoleId::new)
}

fn nonzero(id: u64, kind: &str) -> Result<u64, MembershipError> {
    if id == 0 {
        return Err(MembershipError::InvalidId(format!("{kind} id 0")));
    }
    Ok(id)
}

fn classify(err: serenity::Error) -> MembershipError {
    let status = match &err {
        serenity::Error::Http(http_err) => http_err.status_code().map(|s| s.as_u16()),
        _ => None,
    };
    membership_error(status, err.to_string())
}

/// Map an HTTP status from Discord onto the membership error kinds.
fn membership_error(status: Option<u16>, message: String) -> MembershipError {
    match status {
        Some(403) => MembershipError::MissingPermissions(message),
        Some(404) => MembershipError::NotFound(message),
        _ => MembershipError::Request(message),
    }
}
