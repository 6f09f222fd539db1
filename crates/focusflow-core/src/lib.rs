pub mod api;
pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod controller;
pub mod debounce;
pub mod error;
pub mod query;
pub mod render;
pub mod session;
pub mod stats;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting focusflow CLI"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.rcfile.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let settings =
    config::ClientSettings::from_config(
      &cfg
    )
    .context(
      "failed to resolve client \
       settings"
    )?;

  let runtime =
    tokio::runtime::Builder::new_multi_thread()
      .enable_all()
      .build()
      .context(
        "failed to start async runtime"
      )?;

  let ctx =
    commands::AppContext::open(settings)?;

  runtime.block_on(commands::dispatch(
    &ctx,
    cli.command
  ))?;

  info!("done");
  Ok(())
}
