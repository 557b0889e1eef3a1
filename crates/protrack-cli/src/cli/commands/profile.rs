//! Profile handlers.

use anyhow::Result;
use protrack_types::{ProfileUpdate, UserProfile};

use super::{AppContext, report};

fn print_profile(profile: &UserProfile) {
    println!("Email:      {}", profile.email);
    println!("Name:       {} {}", profile.first_name, profile.last_name);
    if !profile.sex.is_empty() {
        println!("Sex:        {}", profile.sex);
    }
    if !profile.dob.is_empty() {
        println!("Born:       {}", profile.dob);
    }
    if !profile.state.is_empty() {
        println!("State:      {}", profile.state);
    }
    if !profile.lga.is_empty() {
        println!("LGA:        {}", profile.lga);
    }
}

pub async fn show(ctx: &AppContext) -> Result<()> {
    ctx.require_auth()?;

    // Restore usually has the profile already; fetch only if it doesn't.
    if let Some(profile) = ctx.session.snapshot().user {
        print_profile(&profile);
        return Ok(());
    }

    match ctx.session.refresh_user(&ctx.api).await {
        Ok(profile) => {
            print_profile(&profile);
            Ok(())
        }
        Err(err) => Err(report(ctx, err)),
    }
}

pub async fn update(ctx: &AppContext, update: ProfileUpdate) -> Result<()> {
    ctx.require_auth()?;
    if update.is_empty() {
        anyhow::bail!("Nothing to update (pass at least one field flag)");
    }

    match protrack_core::services::user::update_profile(&ctx.api, &update).await {
        Ok(profile) => {
            println!("Profile updated");
            print_profile(&profile);
            Ok(())
        }
        Err(err) => Err(report(ctx, err)),
    }
}
