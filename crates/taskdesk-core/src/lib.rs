pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod render;
pub mod settings;
pub mod state;
pub mod storage;
pub mod store;
pub mod task;
pub mod user;
pub mod validation;
pub mod views;

use std::ffi::OsString;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli = cli::GlobalCli::parse_from(
    raw_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting taskdesk CLI"
  );

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    cli
      .rc_overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
  );
  debug!(
    files = cfg.loaded_files.len(),
    "configuration ready"
  );

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let storage =
    storage::LocalStorage::open(
      &data_dir
    )
    .with_context(|| {
      format!(
        "failed to open local storage \
         at {}",
        data_dir.display()
      )
    })?;

  let mut state =
    state::AppState::load(&storage)
      .with_context(|| {
        format!(
          "failed to load state from {}",
          data_dir.display()
        )
      })?;

  let mut renderer =
    render::Renderer::new(
      &cfg,
      state.settings.theme
    )?;

  commands::dispatch(
    &mut state,
    &storage,
    &cfg,
    &mut renderer,
    cli.command,
    Utc::now()
  )?;

  info!("done");
  Ok(())
}
