//! Connection of the application to its database, with the configured
//! defaults.

use lisogo_odm::{Client, Database, Result};

use crate::config::Settings;

pub async fn connect(settings: &Settings) -> Result<Client> {
    Client::connect(&settings.database_url()).await
}

pub fn select_db(client: &Client, settings: &Settings) -> Result<Database> {
    client.database(&settings.mongodb_db_name)
}

/// Connects and selects the configured database.
pub async fn open(settings: &Settings) -> Result<(Client, Database)> {
    let client = connect(settings).await?;
    let db = select_db(&client, settings)?;
    tracing::info!(database = db.name(), "database selected");
    Ok((client, db))
}
