//! `gongbu migrate` — Create the database schema.

pub async fn run(database_url: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let url = database_url.unwrap_or_else(|| config.database_url());

    println!("🗄️  Migrating {url}");
    // Opening the store applies the schema; a second pass is a no-op.
    let store = super::open_store(&config, Some(url)).await?;
    store.migrate().await?;
    println!("✅ Schema is up to date");

    Ok(())
}
