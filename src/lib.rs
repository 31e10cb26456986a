//! Practice streaks and tier roles for a community Discord server.
//!
//! Members log timed practice sessions. From that log this crate computes a
//! member's consecutive-day streak and keeps their tier roles (one for
//! lifetime minutes, one for streak length) in step with it.

pub mod activity;
pub mod config;
pub mod db;
pub mod discord;
pub mod error;
pub mod membership;
pub mod models;
pub mod progression;
pub mod report;
pub mod stats;
pub mod streak;
pub mod tiers;

#[cfg(test)]
mod testing;

pub use activity::ActivityLog;
pub use membership::{GroupMembership, MembershipError};
pub use progression::{RoleProgression, RoleSync, SyncStatus};
pub use streak::current_streak;
pub use tiers::TierConfig;
