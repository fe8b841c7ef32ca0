pub mod action;
pub mod cli;
pub mod config;
pub mod datetime;
pub mod engine;
pub mod event;
pub mod grid;
pub mod notify;
pub mod render;

use std::cell::Cell;
use std::ffi::OsString;
use std::io::{
  self,
  Write
};
use std::rc::Rc;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use action::CalendarAction;
pub use datetime::WeekStart;
pub use engine::{
  CalendarConfig,
  CalendarEngine,
  CalendarState,
  CalendarViewModel
};
pub use event::{
  CalendarEvent,
  EventDate,
  EventId
};
pub use grid::{
  CalendarDate,
  CalendarGrid,
  PopupPosition
};
pub use notify::Subscription;

pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  run_with_output(
    raw_args,
    io::stdout().lock()
  )
}

/// Same as [`run`], with the rendered
/// calendar written to `out`.
#[tracing::instrument(skip_all)]
pub fn run_with_output<W: Write>(
  raw_args: Vec<OsString>,
  mut out: W
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
    "starting kalendly"
  );

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg
    .apply_overrides(
      cli.config_overrides()
    )
    .context(
      "invalid settings override"
    )?;

  let events = cfg.load_events()?;
  let actions = cli.actions()?;

  let mut engine =
    engine::CalendarEngine::new(
      cfg.calendar_config(events)
    );

  let changes = Rc::new(Cell::new(0usize));
  let subscription = {
    let changes = changes.clone();
    engine.subscribe(move |engine| {
      changes.set(changes.get() + 1);
      let state = engine.state();
      debug!(
        year = state.current_year,
        month = state.current_month,
        selected = ?state.selected_date,
        tasks = state.tasks.len(),
        "calendar redraw requested"
      );
    })
  };

  for action in actions {
    engine.dispatch(action);
  }

  let view = engine.view_model();
  let renderer =
    render::Renderer::new(&cfg);
  if cli.json {
    renderer.write_json(&mut out, &view)?;
  } else {
    renderer.write_view(
      &mut out,
      &view,
      engine.week_start()
    )?;
  }
  out.flush()?;

  subscription.unsubscribe();
  engine.destroy();

  info!(
    changes = changes.get(),
    "done"
  );
  Ok(())
}
