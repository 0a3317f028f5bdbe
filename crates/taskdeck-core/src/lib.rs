pub mod board;
pub mod cli;
pub mod client;
pub mod collection;
pub mod commands;
pub mod config;
pub mod error;
pub mod memory;
pub mod pagination;
pub mod render;
pub mod search;
pub mod shell;
pub mod ui_state;
pub mod view;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use board::TaskBoard;
pub use client::{
  HttpTaskStore,
  StoreConfig,
  TaskStore,
  UpdateMethod
};
pub use error::{
  StoreError,
  StoreResult
};
pub use memory::MemoryTaskStore;
pub use view::{
  TableEvent,
  TaskTable
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
    "starting taskdeck"
  );

  let mut cfg = config::Config::load(
    cli.taskdeckrc.as_deref()
  )?;
  cfg.apply_overrides(
    cli
      .rc_overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
      .chain(cli.api_url.map(|url| {
        ("api.url".to_string(), url)
      }))
  );
  debug!(files = ?cfg.loaded_files, "configuration loaded");

  let store_config = cfg
    .store_config()
    .context("invalid api settings")?;
  info!(
    api = %store_config.base_url,
    method = %store_config.update_method,
    "using task api"
  );
  let store =
    HttpTaskStore::new(store_config)
      .context(
        "failed to build http client"
      )?;

  let table =
    TaskTable::new(cfg.page_size()?);
  let board =
    TaskBoard::with_table(store, table);
  let renderer =
    render::Renderer::new(&cfg)?;

  let runtime =
    tokio::runtime::Builder::new_current_thread()
      .enable_all()
      .build()
      .context(
        "failed to start async runtime"
      )?;
  runtime.block_on(commands::dispatch(
    &board,
    &renderer,
    cli.command
  ))?;

  info!("done");
  Ok(())
}
