//! `gongbu role` — Show or set a user's role.

use gongbu_core::model::{Profile, UserRole};
use gongbu_core::store::Store;

pub async fn run(user_id: String, set: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let store = super::open_store(&config, None).await?;

    let existing = store.profile(&user_id).await?;

    let Some(role) = set else {
        match existing {
            Some(profile) => println!("  {user_id}: {}", profile.role.as_str()),
            None => println!(
                "  {user_id}: no profile (treated as {})",
                config.auth.default_role.as_str()
            ),
        }
        return Ok(());
    };

    let role: UserRole = role.parse()?;
    let profile = Profile {
        user_id: user_id.clone(),
        display_name: existing.map(|p| p.display_name).unwrap_or_default(),
        role,
    };
    store.upsert_profile(profile).await?;
    println!("✅ {user_id} is now {}", role.as_str());
    println!("   Running servers apply it on the user's next request.");

    Ok(())
}
