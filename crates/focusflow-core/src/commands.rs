mod account;
mod shell;
mod tasks;

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, anyhow};
use tracing::{debug, instrument};

use crate::api::HttpApi;
use crate::cli::Command;
use crate::config::ClientSettings;
use crate::controller::TaskListController;
use crate::error::ClientError;
use crate::render::Renderer;
use crate::session::{FileSessionStore, SessionStore, require_access_token};

/// Everything a command needs, built once per invocation.
pub struct AppContext {
    pub settings: ClientSettings,
    pub session: Arc<dyn SessionStore>,
    pub api: Arc<HttpApi>,
    pub renderer: Renderer,
}

impl AppContext {
    #[instrument(skip(settings), fields(api_url = %settings.api_url))]
    pub fn open(settings: ClientSettings) -> anyhow::Result<Self> {
        let store = FileSessionStore::open(&settings.session_location).with_context(|| {
            format!(
                "failed to open session store at {}",
                settings.session_location.display()
            )
        })?;
        debug!(path = %store.path().display(), "using session file");
        let session: Arc<dyn SessionStore> = Arc::new(store);
        let api = Arc::new(
            HttpApi::new(
                &settings.api_url,
                settings.request_timeout,
                Arc::clone(&session),
            )
            .context("failed to set up API client")?,
        );
        let renderer = Renderer::new(settings.color);

        Ok(Self {
            settings,
            session,
            api,
            renderer,
        })
    }

    /// Dashboard guard: task commands need a stored access token.
    fn controller(&self) -> anyhow::Result<TaskListController<Arc<HttpApi>>> {
        require_access_token(self.session.as_ref()).map_err(user_facing)?;
        Ok(TaskListController::new(
            Arc::clone(&self.api),
            self.settings.controller(),
        ))
    }
}

#[instrument(skip(ctx, command))]
pub async fn dispatch(ctx: &AppContext, command: Command) -> anyhow::Result<()> {
    debug!(command = command_name(&command), "dispatching command");
    match command {
        Command::Register(args) => account::register(ctx, &args.email, &args.password).await,
        Command::Login(args) => account::login(ctx, &args.email, &args.password).await,
        Command::Logout => account::logout(ctx),
        Command::List(args) => tasks::list(ctx, &ctx.controller()?, args).await,
        Command::Stats(args) => tasks::stats(ctx, &ctx.controller()?, args).await,
        Command::Add { title } => tasks::add(ctx, &ctx.controller()?, &title.join(" ")).await,
        Command::Toggle { id } => tasks::toggle(ctx, &ctx.controller()?, id).await,
        Command::Edit { id, title, remarks } => {
            tasks::edit(ctx, &ctx.controller()?, id, title, remarks).await
        }
        Command::Show { id } => tasks::show(ctx, &ctx.controller()?, id).await,
        Command::Delete { id, yes } => tasks::delete(ctx, &ctx.controller()?, id, yes).await,
        Command::Shell => shell::run(ctx, ctx.controller()?).await,
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Register(_) => "register",
        Command::Login(_) => "login",
        Command::Logout => "logout",
        Command::List(_) => "list",
        Command::Stats(_) => "stats",
        Command::Add { .. } => "add",
        Command::Toggle { .. } => "toggle",
        Command::Edit { .. } => "edit",
        Command::Show { .. } => "show",
        Command::Delete { .. } => "delete",
        Command::Shell => "shell",
    }
}

/// Maps typed client errors onto messages that tell the user what to do next.
pub(crate) fn user_facing(err: ClientError) -> anyhow::Error {
    match err {
        ClientError::Unauthenticated => anyhow!("not logged in; run `focusflow login` first"),
        ClientError::Unauthorized { status } => anyhow!(
            "session rejected by server (status {status}); run `focusflow login` again"
        ),
        other => anyhow::Error::new(other),
    }
}

/// Blocking y/N prompt on stdin; anything but y/yes declines.
pub(crate) fn prompt_yes_no(prompt: &str) -> bool {
    let mut out = io::stdout().lock();
    if write!(out, "{prompt} [y/N] ").and_then(|_| out.flush()).is_err() {
        return false;
    }
    drop(out);

    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    is_affirmative(&answer)
}

pub(crate) fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affirmative_answers() {
        assert!(is_affirmative("y\n"));
        assert!(is_affirmative(" YES "));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("n"));
        assert!(!is_affirmative("yep"));
    }

    #[test]
    fn auth_errors_point_at_login() {
        let msg = user_facing(ClientError::Unauthenticated).to_string();
        assert!(msg.contains("focusflow login"));
        let msg = user_facing(ClientError::Unauthorized { status: 401 }).to_string();
        assert!(msg.contains("401"));
        let msg = user_facing(ClientError::Transport("refused".into())).to_string();
        assert_eq!(msg, "request failed: refused");
    }
}
