use anyhow::Result;
use rollcall_common::{collections, UserRecord};
use rollcall_store::{decode, encode};

use super::Ctx;

pub async fn add(ctx: &Ctx, id: &str, name: &str) -> Result<()> {
    if ctx.store.get(collections::USERS, id).await?.is_some() {
        anyhow::bail!("user {id} already exists");
    }
    let user = UserRecord::new(id, name);
    ctx.store.put(collections::USERS, encode(&user)?).await?;
    println!("Added user {name} ({id})");
    Ok(())
}

pub async fn list(ctx: &Ctx) -> Result<()> {
    let docs = ctx.store.get_all(collections::USERS).await?;
    if docs.is_empty() {
        println!("No users");
        return Ok(());
    }

    let mut users = Vec::with_capacity(docs.len());
    for doc in &docs {
        users.push(decode::<UserRecord>(doc)?);
    }
    users.sort_by(|a, b| a.id.cmp(&b.id));

    println!("{:<16} {:<24} {:>8} {:>7}", "id", "name", "rating", "status");
    for user in users {
        println!(
            "{:<16} {:<24} {:>8.2} {:>7}",
            user.id,
            user.name,
            user.rating,
            match user.presence {
                rollcall_common::Presence::In => "in",
                rollcall_common::Presence::Out => "out",
            }
        );
    }
    Ok(())
}
