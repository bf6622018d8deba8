use anyhow::Context;
use lisogo::application;
use lisogo::config::Settings;
use lisogo::logging::init_logger;
use lisogo::models::{Item, Objective, User};
use lisogo_odm::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env().context("invalid configuration")?;
    init_logger(&settings)?;

    let (client, db) = application::open(&settings)
        .await
        .with_context(|| format!("cannot open {}", settings.database_url()))?;

    let user = User::new("Martin Richard", "martius", "martius@martiusweb.net");
    let item = Item::new("Climb the Kilimanjaro", "At least once")?;
    let mut objective = Objective::new(user, item);
    objective.save(&db).await?;

    let Some(id) = objective.id().cloned() else {
        anyhow::bail!("the objective was saved without id");
    };
    tracing::info!(id = %id, "objective saved");

    let mut stored = Objective::default();
    stored.retrieve(id, &db).await?;

    let title = stored
        .item()
        .as_ref()
        .and_then(Reference::get)
        .map(|item| item.title().clone())
        .unwrap_or_default();
    let username = stored
        .user()
        .as_ref()
        .and_then(Reference::get)
        .map(|user| user.username().clone())
        .unwrap_or_default();

    println!("{username} plans to: {title} (achieved: {})", stored.achieved());

    let users = db.collection("users")?.count(filter!()).await?;
    let objectives = db.collection("objectives")?.count(filter!()).await?;
    println!("{users} user(s), {objectives} objective(s) stored in {}", db.name());

    client.close().await;
    Ok(())
}
