use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tracing::{info, warn};

use lifetracker::config::AppConfig;
use lifetracker::dates::{day_of, format_date};
use lifetracker::life::{LifeCountdown, LifeProgress};
use lifetracker::local::{FileKv, KeyValueStore, LocalTasks, UserRepository, push_local_records};
use lifetracker::store::{Database, LibSqlBackend};
use lifetracker::sync::{GoalCollection, NoticeBoard, TaskCollection};
use lifetracker::todos::stats::{PriorityDistribution, current_streak};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().context("Invalid configuration")?;

    eprintln!("LifeTracker v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Database: {}", config.db_path.display());
    eprintln!("   User: {}", config.user_id);
    eprintln!("   Cache: {}\n", config.cache_dir.display());

    // ── Database ─────────────────────────────────────────────────────────
    let db: Arc<dyn Database> = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .with_context(|| format!("Failed to open database at {}", config.db_path.display()))?,
    );

    // ── Local records from before sign-in ───────────────────────────────
    let kv: Arc<dyn KeyValueStore> = Arc::new(FileKv::new(&config.cache_dir));
    let local_tasks = LocalTasks::new(kv.clone());
    let users = UserRepository::new(kv);
    let handoff = push_local_records(db.as_ref(), &config.user_id, &local_tasks, &users).await?;
    if !handoff.is_complete() {
        warn!(
            tasks_kept = handoff.tasks_kept,
            goals_kept = handoff.goals_kept,
            "Some local records could not be pushed"
        );
    }

    // ── Collections ─────────────────────────────────────────────────────
    let notices = NoticeBoard::new();
    let tasks = TaskCollection::new(db.clone(), &config.user_id, config.sync, notices.clone());
    let goals = GoalCollection::new(db.clone(), &config.user_id, config.sync, notices.clone());

    let (profile, _, _) = futures::try_join!(
        async { db.get_profile(&config.user_id).await.map_err(anyhow::Error::from) },
        async { tasks.refresh(true).await.map_err(anyhow::Error::from) },
        async { goals.refresh(true).await.map_err(anyhow::Error::from) },
    )?;

    let now = Utc::now();
    let today = day_of(now);

    // ── Life ────────────────────────────────────────────────────────────
    match profile.filter(|p| p.is_setup()) {
        Some(profile) => {
            let progress = LifeProgress::for_profile(&profile, now);
            let countdown = LifeCountdown::for_profile(&profile, now);
            info!(
                name = %profile.name,
                age = progress.age,
                weeks_lived = progress.past_weeks,
                weeks_left = progress.weeks_left,
                percent = %format!("{:.1}", progress.percent_complete),
                "Life progress"
            );
            info!(
                years = countdown.years,
                months = countdown.months,
                days = countdown.days,
                "Time remaining"
            );
        }
        None => info!("Profile not set up yet"),
    }

    // ── Tasks ───────────────────────────────────────────────────────────
    let all_tasks = tasks.tasks().await;
    let stats = tasks.stats(today).await;
    let distribution = PriorityDistribution::compute(&all_tasks);
    info!(
        completed = stats.completed,
        total = stats.total,
        rate = %format!("{:.0}%", stats.completion_rate),
        streak = current_streak(&all_tasks, today),
        high = distribution.high,
        medium = distribution.medium,
        low = distribution.low,
        "Task summary"
    );
    if let Some(best) = stats.most_productive_day().filter(|d| d.completed > 0) {
        info!(date = %format_date(best.date), completed = best.completed, "Most productive day");
    }

    // ── Goals ───────────────────────────────────────────────────────────
    let analytics = goals.analytics(now).await;
    info!(
        total = analytics.total_goals,
        completed = analytics.by_status.completed,
        rate = analytics.completion_rate,
        short_term = analytics.by_timeframe.short_term,
        medium_term = analytics.by_timeframe.medium_term,
        long_term = analytics.by_timeframe.long_term,
        "Goal summary"
    );
    for goal in &analytics.upcoming {
        if let Some(target) = goal.target_date {
            info!(title = %goal.title, due = %format_date(day_of(target)), "Upcoming goal");
        }
    }

    for notice in notices.errors().await {
        warn!(title = %notice.title, description = %notice.description, "Unresolved notice");
    }
    Ok(())
}
