pub mod cli;
pub mod commands;
pub mod config;
pub mod terminal;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};
use tracker_core::TaskStore;
use tracker_core::datastore::{
  FileSlot,
  JsonRepository
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting tracker CLI"
  );

  let mut cfg = config::Config::load(
    cli.trackerrc.as_deref()
  )?;
  cfg.apply_overrides(
    cli
      .rc_overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
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

  let slot = FileSlot::open(&data_dir)
    .with_context(|| {
      format!(
        "failed to open data \
         directory {}",
        data_dir.display()
      )
    })?;
  let repo = JsonRepository::new(slot)
    .with_key(cfg.storage_key())
    .with_recovery(
      cfg.recovery_policy()?
    );
  debug!(key = %repo.key(), "using storage key");

  let mut store = TaskStore::open(
    repo,
    terminal::TerminalView::default()
  )?
  .with_render_options(
    cfg.render_options()
  );
  let painter =
    terminal::Painter::new(&cfg);

  let command =
    cli.command.unwrap_or_else(|| {
      cli::Command::List(
        cli::ListArgs::default()
      )
    });

  commands::with_stdio(|io| {
    commands::dispatch(
      &mut store, &cfg, &painter, io,
      command
    )
  })?;

  info!("done");
  Ok(())
}
