use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! snowflake_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

snowflake_id!(UserId);
snowflake_id!(GroupId);
snowflake_id!(RoleId);

/// One logged practice session.
#[derive(Debug, Clone)]
pub struct ActivityRecord {
    pub record_id: Uuid,
    pub user_id: UserId,
    pub group_id: GroupId,
    pub duration_minutes: i32,
    pub occurred_at: DateTime<Utc>,
}

/// Sum and count of sessions over some scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub minutes: i64,
    pub sessions: i64,
}

/// One bucket of a timeframe chart; `times_ago` 0 is the current bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BucketStats {
    pub times_ago: i64,
    pub minutes: i64,
    pub sessions: i64,
}
