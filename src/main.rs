use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use practice_streaks::activity::local_now;
use practice_streaks::config::Config;
use practice_streaks::db::{self, PgActivityLog};
use practice_streaks::discord::DiscordMembership;
use practice_streaks::models::{GroupId, UserId};
use practice_streaks::report::{self, MemberSnapshot};
use practice_streaks::stats::{fill_buckets, Timeframe};
use practice_streaks::{current_streak, RoleProgression, RoleSync, SyncStatus};

#[derive(Parser)]
#[command(name = "practice-streaks")]
#[command(about = "Practice log, streaks and tier roles for a Discord community", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load sample practice history
    Seed,
    /// Import activity records from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Log a practice session and update tier roles
    #[command(group(
        ArgGroup::new("when")
            .args(["utc_offset", "occurred_at"])
            .multiple(false)
    ))]
    Log {
        #[arg(long)]
        guild: u64,
        #[arg(long)]
        user: u64,
        #[arg(long, value_parser = clap::value_parser!(i32).range(0..))]
        minutes: i32,
        /// Member's UTC offset in minutes, so the entry lands on their local day
        #[arg(long, allow_hyphen_values = true, value_parser = clap::value_parser!(i64).range(-720..=840))]
        utc_offset: Option<i64>,
        /// Backdate the entry (RFC 3339)
        #[arg(long)]
        occurred_at: Option<DateTime<Utc>>,
        /// Skip the role update
        #[arg(long)]
        no_sync: bool,
    },
    /// Change the minutes or timestamp of an entry
    Edit {
        #[arg(long)]
        guild: u64,
        #[arg(long)]
        record: Uuid,
        #[arg(long, value_parser = clap::value_parser!(i32).range(0..))]
        minutes: Option<i32>,
        #[arg(long)]
        occurred_at: Option<DateTime<Utc>>,
    },
    /// Delete one entry
    Remove {
        #[arg(long)]
        guild: u64,
        #[arg(long)]
        record: Uuid,
    },
    /// Delete all of a member's entries
    Reset {
        #[arg(long)]
        guild: u64,
        #[arg(long)]
        user: u64,
    },
    /// Show a member's most recent entries
    Recent {
        #[arg(long)]
        guild: u64,
        #[arg(long)]
        user: u64,
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(i64).range(1..))]
        limit: i64,
    },
    /// Show a member's current streak
    Streak {
        #[arg(long)]
        guild: u64,
        #[arg(long)]
        user: u64,
    },
    /// Bring a member's tier roles in line with their log
    Sync {
        #[arg(long)]
        guild: u64,
        #[arg(long)]
        user: u64,
    },
    /// Show totals and a 12-bucket history for a member or the whole group
    Stats {
        #[arg(long)]
        guild: u64,
        #[arg(long)]
        user: Option<u64>,
        #[arg(long, value_enum, default_value_t = Timeframe::Daily)]
        timeframe: Timeframe,
    },
    /// Generate a markdown report for a member
    Report {
        #[arg(long)]
        guild: u64,
        #[arg(long)]
        user: u64,
        #[arg(long, value_enum, default_value_t = Timeframe::Weekly)]
        timeframe: Timeframe,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load configuration")?;
    let tiers = Arc::new(config.load_tiers().context("failed to load tier tables")?);

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;
    let log = PgActivityLog::new(pool.clone());
    let now = Utc::now();

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let inserted = db::seed(&pool, now).await?;
            println!("Inserted {inserted} sample sessions.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} sessions from {}.", csv.display());
        }
        Commands::Log {
            guild,
            user,
            minutes,
            utc_offset,
            occurred_at,
            no_sync,
        } => {
            let (group, user) = (GroupId(guild), UserId(user));
            // Stamp and sync on the member's local day so the new entry counts as today.
            let local = local_now(now, utc_offset.unwrap_or(0));
            let occurred_at = occurred_at.unwrap_or(local);

            db::insert_activity(&pool, group, user, minutes, occurred_at).await?;
            let totals = db::user_totals(&pool, group, user).await?;
            println!(
                "Added {minutes} minutes. Total practice time is now {} minutes.",
                totals.minutes
            );

            let group_totals = db::group_totals(&pool, group).await?;
            if group_totals.sessions > 0 && group_totals.sessions % 10 == 0 {
                println!(
                    "This group has practiced {} hours together.",
                    group_totals.minutes / 60
                );
            }

            if no_sync {
                return Ok(());
            }
            let Some(token) = config.discord_token.as_deref() else {
                tracing::info!("DISCORD_TOKEN not set; skipping role sync");
                return Ok(());
            };

            // The entry is already committed; a failed role sync must not undo it.
            let engine = RoleProgression::new(log, DiscordMembership::new(token), tiers);
            match engine.sync(group, user, local).await {
                Ok(sync) => announce(&sync),
                Err(err) => {
                    tracing::warn!(%group, %user, error = %err, "Role sync failed after logging");
                    println!("Session saved, but tier roles could not be updated.");
                }
            }
        }
        Commands::Edit {
            guild,
            record,
            minutes,
            occurred_at,
        } => {
            let group = GroupId(guild);
            let existing = db::get_activity(&pool, group, record)
                .await?
                .with_context(|| format!("no entry {record} in group {group}"))?;
            let minutes = minutes.unwrap_or(existing.duration_minutes);
            let occurred_at = occurred_at.unwrap_or(existing.occurred_at);

            db::update_activity(&pool, group, record, minutes, occurred_at).await?;
            println!(
                "Entry {record} now {minutes} minutes at {}.",
                occurred_at.to_rfc3339()
            );
        }
        Commands::Remove { guild, record } => {
            if db::delete_activity(&pool, GroupId(guild), record).await? {
                println!("Deleted entry {record}.");
            } else {
                println!("No entry {record} in group {guild}.");
            }
        }
        Commands::Reset { guild, user } => {
            let removed = db::reset_member(&pool, GroupId(guild), UserId(user)).await?;
            println!("Deleted {removed} entries for {user}.");
        }
        Commands::Recent { guild, user, limit } => {
            let entries = db::list_activity(&pool, GroupId(guild), UserId(user), limit).await?;
            if entries.is_empty() {
                println!("No sessions logged.");
                return Ok(());
            }
            for entry in entries {
                println!(
                    "- {} {} minutes ({})",
                    entry.occurred_at.format("%Y-%m-%d %H:%M"),
                    entry.duration_minutes,
                    entry.record_id
                );
            }
        }
        Commands::Streak { guild, user } => {
            let streak = current_streak(&log, UserId(user), GroupId(guild), now).await?;
            println!("Current streak: {streak} days.");
        }
        Commands::Sync { guild, user } => {
            let token = config
                .discord_token
                .as_deref()
                .context("DISCORD_TOKEN must be set to update roles")?;
            let engine = RoleProgression::new(log, DiscordMembership::new(token), tiers);
            let sync = engine.sync(GroupId(guild), UserId(user), now).await?;
            println!(
                "{} minutes, {} day streak; added {:?}, removed {:?}.",
                sync.lifetime_minutes, sync.streak, sync.added, sync.removed
            );
            announce(&sync);
        }
        Commands::Stats {
            guild,
            user,
            timeframe,
        } => {
            let (group, user) = (GroupId(guild), user.map(UserId));
            let totals = match user {
                Some(user) => db::user_totals(&pool, group, user).await?,
                None => db::group_totals(&pool, group).await?,
            };
            let buckets = fill_buckets(&db::bucket_stats(&pool, group, user, timeframe, now).await?);

            println!(
                "{} minutes across {} sessions.",
                totals.minutes, totals.sessions
            );
            if let Some(user) = user {
                let streak = current_streak(&log, user, group, now).await?;
                println!("Current streak: {streak} days.");
            }
            println!("Last {} {}s (oldest first):", buckets.len(), timeframe.unit());
            for bucket in &buckets {
                println!(
                    "- {} ago: {} minutes, {} sessions",
                    bucket.times_ago, bucket.minutes, bucket.sessions
                );
            }
        }
        Commands::Report {
            guild,
            user,
            timeframe,
            out,
        } => {
            let (group, user) = (GroupId(guild), UserId(user));
            let totals = db::user_totals(&pool, group, user).await?;
            let streak = current_streak(&log, user, group, now).await?;
            let buckets =
                fill_buckets(&db::bucket_stats(&pool, group, Some(user), timeframe, now).await?);

            let report = report::build_report(
                &tiers,
                &MemberSnapshot {
                    group,
                    user,
                    generated_at: now,
                    totals,
                    streak,
                    timeframe,
                    buckets: &buckets,
                },
            );
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

fn announce(sync: &RoleSync) {
    match sync.status {
        SyncStatus::SkippedMissingPermissions => {
            println!("Tier roles were not updated: the bot lacks permission to manage roles.");
        }
        SyncStatus::Unchanged | SyncStatus::Applied => {
            if let Some(tier) = sync.new_time_tier {
                println!(
                    "Congrats! {} total minutes earned the {} role (<@&{}>).",
                    sync.lifetime_minutes, tier.tier, tier.role
                );
            }
            if let Some(tier) = sync.new_streak_tier {
                println!(
                    "Congrats! A {} day streak earned the {} role (<@&{}>).",
                    sync.streak, tier.tier, tier.role
                );
            }
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("practice_streaks=info,warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
