use anyhow::Result;
use chrono::Local;
use rollcall_common::PeriodStats;
use rollcall_engine::{RankingEngine, RatingEngine, StatsAggregator};

use super::Ctx;

fn print_stats(stats: &PeriodStats) {
    println!("Present days:      {}", stats.present);
    println!("Leaves:            {} (unpaid: {})", stats.leaves, stats.unpaid_leaves);
    println!("Late arrivals:     {} ({} min)", stats.late, stats.total_late_minutes);
    println!("Early departures:  {}", stats.early_departures);
    println!("Extra worked:      {:.2} h", stats.extra_worked_hours);
    println!(
        "Penalty:           {:.1} - {:.1} offset = {:.1} days",
        stats.penalty, stats.penalty_offset, stats.effective_penalty
    );
    if !stats.breakdown.is_empty() {
        println!();
        println!("Breakdown:");
        for (category, count) in &stats.breakdown {
            println!("  {category}: {count}");
        }
    }
}

pub async fn month(ctx: &Ctx, user_id: &str) -> Result<()> {
    let aggregator = StatsAggregator::new(ctx.store.clone(), ctx.policy.clone());
    let stats = aggregator.monthly_stats(user_id, Local::now().date_naive()).await?;

    println!("Monthly stats for {user_id}");
    println!("=========================");
    print_stats(&stats);
    Ok(())
}

pub async fn year(ctx: &Ctx, user_id: &str) -> Result<()> {
    let aggregator = StatsAggregator::new(ctx.store.clone(), ctx.policy.clone());
    let today = Local::now().date_naive();
    let (from, to) = ctx.policy.financial_year_window(today);
    let stats = aggregator.yearly_stats(user_id, today).await?;

    println!("Financial year {from} .. {to} for {user_id}");
    println!("=========================");
    print_stats(&stats);
    Ok(())
}

pub async fn summary(ctx: &Ctx) -> Result<()> {
    let aggregator = StatsAggregator::new(ctx.store.clone(), ctx.policy.clone());
    let summary = aggregator.system_monthly_summary(Local::now().date_naive()).await;

    if summary.is_empty() {
        println!("No users found");
        return Ok(());
    }

    let mut rows: Vec<_> = summary.into_iter().collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0));
    println!("{:<16} {:>8} {:>6} {:>7} {:>9}", "user", "present", "late", "leaves", "penalty");
    for (user_id, stats) in rows {
        println!(
            "{:<16} {:>8} {:>6} {:>7} {:>9.1}",
            user_id, stats.present, stats.late, stats.leaves, stats.effective_penalty
        );
    }
    Ok(())
}

pub async fn hero(ctx: &Ctx) -> Result<()> {
    let ranking = RankingEngine::new(ctx.store.clone());
    match ranking.hero_of_the_week(Local::now().date_naive()).await {
        Some(hero) => {
            println!("Hero of the week: {} ({})", hero.name, hero.user_id);
            println!("Reason: {}", hero.reason);
            println!(
                "Score {:.1} over {} days, {:.1} hours worked",
                hero.score, hero.days_count, hero.total_hours
            );
        }
        None => println!("No attendance activity in the last 7 days"),
    }
    Ok(())
}

pub async fn trend(ctx: &Ctx) -> Result<()> {
    let ranking = RankingEngine::new(ctx.store.clone());
    let trend = ranking.system_performance(Local::now().date_naive()).await;

    println!("Activity trend (trailing week)");
    for day in &trend.days {
        let bar = "#".repeat((day.average_score / 5.0).round() as usize);
        println!("{}  {:>5.1}  {}", day.date, day.average_score, bar);
    }
    println!("Overall average: {:.1}", trend.overall_average);
    Ok(())
}

pub async fn rating(ctx: &Ctx, user_id: &str, days_back: u64, write: bool) -> Result<()> {
    let engine = RatingEngine::new(ctx.store.clone());
    let report = if write {
        engine.update_user_rating_at(user_id, days_back, Local::now().date_naive()).await?
    } else {
        engine.calculate_user_rating(user_id, days_back).await?
    };

    println!("Rating for {user_id}: {:.2} / 5", report.rating);
    println!(
        "{} tasks in window: {} completed, {} in process, {} overdue, {} not completed",
        report.tasks_considered,
        report.completion_stats.completed,
        report.completion_stats.in_process,
        report.completion_stats.overdue,
        report.completion_stats.not_completed
    );
    Ok(())
}
