use anyhow::Result;
use rollcall_engine::{CheckOutOptions, CheckOutRequest, SessionManager};

use super::Ctx;

pub async fn check_in(ctx: &Ctx, user_id: &str) -> Result<()> {
    let manager = SessionManager::new(ctx.store.clone(), ctx.policy.clone());
    let user = manager.check_in(user_id, None).await?;

    println!("Checked in: {} ({})", user.name, user.id);
    if let Some(at) = user.last_check_in {
        println!("Since: {}", at.format("%Y-%m-%d %H:%M"));
    }
    Ok(())
}

pub async fn check_out(
    ctx: &Ctx,
    user_id: &str,
    description: Option<String>,
    activity: Option<u32>,
) -> Result<()> {
    let manager = SessionManager::new(ctx.store.clone(), ctx.policy.clone());
    let log = manager
        .check_out(
            user_id,
            CheckOutRequest {
                description,
                options: CheckOutOptions { activity_score: activity, ..Default::default() },
                ..Default::default()
            },
        )
        .await?;

    println!("Checked out: {}", user_id);
    println!("Status: {}", log.status);
    println!("Worked: {:.2} hours", log.duration_ms as f64 / 3_600_000.0);
    if log.extra_worked_ms > 0 {
        println!("Extra: {} minutes", log.extra_worked_ms / 60_000);
    }
    Ok(())
}
