use anyhow::anyhow;
use tracing::{debug, instrument};

use super::AppContext;
use crate::auth::{self, LOGIN_FAILED_MESSAGE, REGISTER_FAILED_MESSAGE};
use crate::error::ClientError;
use crate::session::is_authenticated;

fn failure(err: ClientError, generic: &'static str) -> anyhow::Error {
    if err.is_validation() {
        return anyhow::Error::new(err);
    }
    debug!(error = %err, "auth request failed");
    anyhow!(generic)
}

#[instrument(skip(ctx, password))]
pub(super) async fn register(ctx: &AppContext, email: &str, password: &str) -> anyhow::Result<()> {
    auth::register(ctx.api.as_ref(), email, password)
        .await
        .map_err(|err| failure(err, REGISTER_FAILED_MESSAGE))?;
    println!("Account created. Run `focusflow login` to sign in.");
    Ok(())
}

#[instrument(skip(ctx, password))]
pub(super) async fn login(ctx: &AppContext, email: &str, password: &str) -> anyhow::Result<()> {
    auth::login(ctx.api.as_ref(), ctx.session.as_ref(), email, password)
        .await
        .map_err(|err| failure(err, LOGIN_FAILED_MESSAGE))?;
    println!("Logged in as {}.", email.trim());
    Ok(())
}

#[instrument(skip(ctx))]
pub(super) fn logout(ctx: &AppContext) -> anyhow::Result<()> {
    let was_signed_in = is_authenticated(ctx.session.as_ref());
    auth::logout(ctx.session.as_ref())?;
    if was_signed_in {
        println!("Logged out.");
    } else {
        println!("Not logged in; cleared any leftover session data.");
    }
    Ok(())
}
