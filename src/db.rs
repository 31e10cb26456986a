use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::activity::ActivityLog;
use crate::error::{Error, Result};
use crate::models::{ActivityRecord, BucketStats, GroupId, Totals, UserId};
use crate::stats::{Timeframe, BUCKETS};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Activity log backed by the `activity_log` table.
#[derive(Clone)]
pub struct PgActivityLog {
    pool: PgPool,
}

impl PgActivityLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityLog for PgActivityLog {
    async fn sum_duration(&self, user: UserId, group: GroupId) -> Result<i64> {
        Ok(user_totals(&self.pool, group, user).await?.minutes)
    }

    async fn distinct_activity_days_ago(
        &self,
        user: UserId,
        group: GroupId,
        now: DateTime<Utc>,
    ) -> Result<Vec<i64>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT
                (($3::timestamptz AT TIME ZONE 'UTC')::date
                    - (occurred_at AT TIME ZONE 'UTC')::date)::BIGINT AS days_ago
            FROM activity_log
            WHERE user_id = $1 AND guild_id = $2
              AND (occurred_at AT TIME ZONE 'UTC')::date <= ($3::timestamptz AT TIME ZONE 'UTC')::date
            ORDER BY days_ago ASC
            "#,
        )
        .bind(user.to_string())
        .bind(group.to_string())
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row.try_get::<i64, _>("days_ago").map_err(Error::from))
            .collect()
    }
}

pub async fn insert_activity(
    pool: &PgPool,
    group: GroupId,
    user: UserId,
    minutes: i32,
    occurred_at: DateTime<Utc>,
) -> Result<ActivityRecord> {
    let record_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO activity_log (record_id, user_id, guild_id, duration_minutes, occurred_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(record_id)
    .bind(user.to_string())
    .bind(group.to_string())
    .bind(minutes)
    .bind(occurred_at)
    .execute(pool)
    .await?;

    tracing::debug!(%group, %user, %record_id, minutes, "Activity recorded");

    Ok(ActivityRecord {
        record_id,
        user_id: user,
        group_id: group,
        duration_minutes: minutes,
        occurred_at,
    })
}

pub async fn get_activity(
    pool: &PgPool,
    group: GroupId,
    record_id: Uuid,
) -> Result<Option<ActivityRecord>> {
    let row = sqlx::query(
        r#"
        SELECT record_id, user_id, guild_id, duration_minutes, occurred_at
        FROM activity_log
        WHERE record_id = $1 AND guild_id = $2
        "#,
    )
    .bind(record_id)
    .bind(group.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(record_from_row).transpose()
}

/// A member's entries, newest first.
pub async fn list_activity(
    pool: &PgPool,
    group: GroupId,
    user: UserId,
    limit: i64,
) -> Result<Vec<ActivityRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT record_id, user_id, guild_id, duration_minutes, occurred_at
        FROM activity_log
        WHERE user_id = $1 AND guild_id = $2
        ORDER BY occurred_at DESC
        LIMIT $3
        "#,
    )
    .bind(user.to_string())
    .bind(group.to_string())
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter().map(record_from_row).collect()
}

/// Returns `false` when no entry with that id exists in the group.
pub async fn update_activity(
    pool: &PgPool,
    group: GroupId,
    record_id: Uuid,
    minutes: i32,
    occurred_at: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE activity_log SET duration_minutes = $1, occurred_at = $2
        WHERE record_id = $3 AND guild_id = $4
        "#,
    )
    .bind(minutes)
    .bind(occurred_at)
    .bind(record_id)
    .bind(group.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_activity(pool: &PgPool, group: GroupId, record_id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM activity_log WHERE record_id = $1 AND guild_id = $2")
        .bind(record_id)
        .bind(group.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete every entry a member has in the group; returns the number removed.
pub async fn reset_member(pool: &PgPool, group: GroupId, user: UserId) -> Result<u64> {
    let result = sqlx::query("DELETE FROM activity_log WHERE user_id = $1 AND guild_id = $2")
        .bind(user.to_string())
        .bind(group.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

pub async fn user_totals(pool: &PgPool, group: GroupId, user: UserId) -> Result<Totals> {
    let row = sqlx::query(
        r#"
        SELECT COALESCE(SUM(duration_minutes), 0)::BIGINT AS minutes, COUNT(*) AS sessions
        FROM activity_log
        WHERE user_id = $1 AND guild_id = $2
        "#,
    )
    .bind(user.to_string())
    .bind(group.to_string())
    .fetch_one(pool)
    .await?;

    totals_from_row(&row)
}

pub async fn group_totals(pool: &PgPool, group: GroupId) -> Result<Totals> {
    let row = sqlx::query(
        r#"
        SELECT COALESCE(SUM(duration_minutes), 0)::BIGINT AS minutes, COUNT(*) AS sessions
        FROM activity_log
        WHERE guild_id = $1
        "#,
    )
    .bind(group.to_string())
    .fetch_one(pool)
    .await?;

    totals_from_row(&row)
}

/// Sum and count per bucket for the last [`BUCKETS`] buckets of `timeframe`.
///
/// Bucket `n` holds records whose UTC day started between `n` and `n + 1`
/// bucket widths before `now`. Pass `user` as `None` for the whole group.
pub async fn bucket_stats(
    pool: &PgPool,
    group: GroupId,
    user: Option<UserId>,
    timeframe: Timeframe,
    now: DateTime<Utc>,
) -> Result<Vec<BucketStats>> {
    let rows = sqlx::query(
        r#"
        WITH bucketed AS (
            SELECT
                FLOOR(EXTRACT(EPOCH FROM ($3::timestamptz - date_trunc('day', occurred_at, 'UTC')))::float8
                    / $4::float8)::BIGINT AS times_ago,
                duration_minutes
            FROM activity_log
            WHERE guild_id = $1
              AND ($2::TEXT IS NULL OR user_id = $2)
              AND occurred_at <= $3
        )
        SELECT times_ago, SUM(duration_minutes)::BIGINT AS minutes, COUNT(*) AS sessions
        FROM bucketed
        WHERE times_ago < $5
        GROUP BY times_ago
        "#,
    )
    .bind(group.to_string())
    .bind(user.map(|u| u.to_string()))
    .bind(now)
    .bind(timeframe.bucket_seconds() as f64)
    .bind(BUCKETS as i64)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| -> Result<BucketStats> {
            Ok(BucketStats {
                times_ago: row.try_get("times_ago")?,
                minutes: row.try_get("minutes")?,
                sessions: row.try_get("sessions")?,
            })
        })
        .collect()
}

fn totals_from_row(row: &PgRow) -> Result<Totals> {
    Ok(Totals {
        minutes: row.try_get("minutes")?,
        sessions: row.try_get("sessions")?,
    })
}

fn record_from_row(row: &PgRow) -> Result<ActivityRecord> {
    Ok(ActivityRecord {
        record_id: row.try_get("record_id")?,
        user_id: UserId(parse_snowflake(row.try_get("user_id")?)?),
        group_id: GroupId(parse_snowflake(row.try_get("guild_id")?)?),
        duration_minutes: row.try_get("duration_minutes")?,
        occurred_at: row.try_get("occurred_at")?,
    })
}

fn parse_snowflake(raw: String) -> Result<u64> {
    raw.parse()
        .map_err(|_| Error::InvalidData(format!("non-numeric id {raw:?}")))
}

pub async fn seed(pool: &PgPool, now: DateTime<Utc>) -> anyhow::Result<usize> {
    let group = GroupId(244917519477899264);
    // (user, minutes per session, consecutive days ending today, days skipped before today)
    let members = vec![
        (UserId(180000000000000001), 45, 16, 0),
        (UserId(180000000000000002), 20, 8, 1),
        (UserId(180000000000000003), 60, 30, 3),
    ];

    let mut inserted = 0usize;
    for (user, minutes, days, skipped) in members {
        for offset in 0..days {
            let occurred_at = now - Duration::days(offset + skipped);
            insert_activity(pool, group, user, minutes, occurred_at)
                .await
                .with_context(|| format!("failed to seed activity for {user}"))?;
            inserted += 1;
        }
    }

    Ok(inserted)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        guild_id: u64,
        user_id: u64,
        duration_minutes: i32,
        occurred_at: DateTime<Utc>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid CSV row {}", line + 1))?;
        if row.duration_minutes < 0 {
            anyhow::bail!("row {}: duration must not be negative", line + 1);
        }

        insert_activity(
            pool,
            GroupId(row.guild_id),
            UserId(row.user_id),
            row.duration_minutes,
            row.occurred_at,
        )
        .await?;
        inserted += 1;
    }

    Ok(inserted)
}
