//! Signup, login, and logout handlers.

use anyhow::Result;
use protrack_types::SignupRequest;

use super::AppContext;

pub async fn signup(ctx: &AppContext, request: SignupRequest) -> Result<()> {
    let email = request.email.clone();
    ctx.session.signup(&ctx.api, &request).await?;
    println!("Account created. Logged in as {email}");
    Ok(())
}

pub async fn login(ctx: &AppContext, email: &str, password: &str) -> Result<()> {
    ctx.session.login(&ctx.api, email, password).await?;
    println!("Logged in as {email}");
    Ok(())
}

pub async fn logout(ctx: &AppContext) -> Result<()> {
    ctx.session.logout(&ctx.api).await?;
    println!("Logged out");
    Ok(())
}
