use focusflow_shared::Credentials;
use tracing::{debug, info, instrument};

use crate::api::AuthApi;
use crate::error::ClientError;
use crate::session::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, SessionStore};

pub const LOGIN_FAILED_MESSAGE: &str = "Login failed. Please check your credentials.";
pub const REGISTER_FAILED_MESSAGE: &str = "Registration failed. Try a different email.";

fn credentials(email: &str, password: &str) -> Result<Credentials, ClientError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ClientError::validation("email must not be empty"));
    }
    if password.is_empty() {
        return Err(ClientError::validation("password must not be empty"));
    }
    Ok(Credentials {
        email: email.to_string(),
        password: password.to_string(),
    })
}

/// Exchanges credentials for tokens and stores both in the session.
#[instrument(skip(api, store, password))]
pub async fn login<A>(
    api: &A,
    store: &dyn SessionStore,
    email: &str,
    password: &str,
) -> Result<(), ClientError>
where
    A: AuthApi + ?Sized,
{
    let creds = credentials(email, password)?;
    let tokens = api.login(&creds).await.inspect_err(|err| {
        debug!(error = %err, "login request failed");
    })?;

    store.set(ACCESS_TOKEN_KEY, &tokens.access_token)?;
    store.set(REFRESH_TOKEN_KEY, &tokens.refresh_token)?;
    info!(email = %creds.email, "logged in");
    Ok(())
}

#[instrument(skip(api, password))]
pub async fn register<A>(api: &A, email: &str, password: &str) -> Result<(), ClientError>
where
    A: AuthApi + ?Sized,
{
    let creds = credentials(email, password)?;
    api.register(&creds).await.inspect_err(|err| {
        debug!(error = %err, "register request failed");
    })?;
    info!(email = %creds.email, "registered account");
    Ok(())
}

/// Drops every stored credential.
#[instrument(skip(store))]
pub fn logout(store: &dyn SessionStore) -> Result<(), ClientError> {
    store.clear()?;
    info!("logged out");
    Ok(())
}
