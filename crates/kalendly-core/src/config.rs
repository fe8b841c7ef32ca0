use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{
  debug,
  info,
  warn
};

use crate::datetime::WeekStart;
use crate::engine::CalendarConfig;
use crate::event::CalendarEvent;

const CONFIG_ENV_VAR: &str =
  "KALENDLY_CONFIG";
const CONFIG_DIR_NAME: &str =
  "kalendly";
const CONFIG_FILE_NAME: &str =
  "kalendly.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SettingsFile {
  events:       Option<String>,
  week_start:   Option<String>,
  min_year:     Option<i32>,
  max_year:     Option<i32>,
  initial_date: Option<String>,
  color:        Option<bool>
}

#[derive(Debug, Deserialize)]
struct TomlEventsFile {
  #[serde(default)]
  events: Vec<CalendarEvent>
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonEventsFile {
  List(Vec<CalendarEvent>),
  Wrapped { events: Vec<CalendarEvent> }
}

#[derive(Debug, Clone)]
pub struct Config {
  pub events_path:  Option<PathBuf>,
  pub week_start:   WeekStart,
  pub min_year:     Option<i32>,
  pub max_year:     Option<i32>,
  pub initial_date: Option<NaiveDate>,
  pub color:        bool,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    Self {
      events_path:  None,
      week_start:   WeekStart::Sunday,
      min_year:     None,
      max_year:     None,
      initial_date: None,
      color:        true,
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    config_override
  ))]
  pub fn load(
    config_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let Some(path) = resolve_config_path(
      config_override
    )?
    else {
      warn!(
        "no kalendly.toml found; using \
         defaults"
      );
      return Ok(Config::default());
    };

    info!(config = %path.display(), "loading settings");
    Config::load_file(&path)
  }

  #[tracing::instrument]
  pub fn load_file(
    path: &Path
  ) -> anyhow::Result<Self> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    let mut cfg =
      Config::from_toml_str(
        &text, &base_dir
      )
      .with_context(|| {
        format!(
          "invalid settings in {}",
          path.display()
        )
      })?;
    cfg.loaded_files.push(path);
    Ok(cfg)
  }

  /// Parses settings text. A relative
  /// `events` path is taken relative
  /// to `base_dir`.
  pub fn from_toml_str(
    text: &str,
    base_dir: &Path
  ) -> anyhow::Result<Self> {
    let raw = toml::from_str::<
      SettingsFile
    >(text)
    .context(
      "failed to parse settings toml"
    )?;

    let mut cfg = Config::default();

    if let Some(events) = raw.events {
      cfg.events_path = Some(
        resolve_relative_path(
          base_dir, &events
        )?
      );
    }

    if let Some(week_start) =
      raw.week_start
    {
      cfg.week_start =
        sanitize_week_start(
          &week_start
        );
    }

    if let Some(raw_date) =
      raw.initial_date
    {
      cfg.initial_date =
        parse_initial_date(&raw_date)?;
    }

    cfg.min_year = raw.min_year;
    cfg.max_year = raw.max_year;
    if let Some(color) = raw.color {
      cfg.color = color;
    }

    cfg.sanitize_year_range();
    debug!(?cfg, "parsed settings");
    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) -> anyhow::Result<()>
  where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .trim()
        .replace('-', "_")
        .to_ascii_lowercase();
      let value = v.trim();
      debug!(key = %key, value = %value, "applying override");

      match key.as_str() {
        | "events" => {
          self.events_path = Some(
            expand_tilde(Path::new(
              value
            ))
          );
        }
        | "week_start" => {
          self.week_start =
            value.parse()?;
        }
        | "min_year" => {
          self.min_year =
            Some(parse_year(value)?);
        }
        | "max_year" => {
          self.max_year =
            Some(parse_year(value)?);
        }
        | "initial_date" => {
          self.initial_date =
            parse_initial_date(value)?;
        }
        | "color" => {
          self.color = parse_bool(value);
        }
        | other => {
          return Err(anyhow!(
            "unknown setting: {other}"
          ));
        }
      }
    }

    self.sanitize_year_range();
    Ok(())
  }

  /// Engine configuration seeded with
  /// `events`.
  #[must_use]
  pub fn calendar_config(
    &self,
    events: Vec<CalendarEvent>
  ) -> CalendarConfig {
    CalendarConfig {
      events,
      initial_date: self.initial_date,
      min_year: self.min_year,
      max_year: self.max_year,
      week_starts_on: self.week_start
    }
  }

  /// Events named by `events_path`, or
  /// none when no file is configured.
  pub fn load_events(
    &self
  ) -> anyhow::Result<Vec<CalendarEvent>>
  {
    match self.events_path.as_deref() {
      | Some(path) => load_events(path),
      | None => {
        debug!(
          "no events file configured"
        );
        Ok(Vec::new())
      }
    }
  }

  fn sanitize_year_range(&mut self) {
    if let (Some(min), Some(max)) =
      (self.min_year, self.max_year)
      && min > max
    {
      warn!(
        min_year = min,
        max_year = max,
        "min_year above max_year; \
         swapping"
      );
      self.min_year = Some(max);
      self.max_year = Some(min);
    }
  }
}

/// Reads events from a `.toml` file
/// (`[[events]]` tables) or JSON (a
/// bare array or `{"events": [...]}`).
#[tracing::instrument]
pub fn load_events(
  path: &Path
) -> anyhow::Result<Vec<CalendarEvent>> {
  let text = fs::read_to_string(path)
    .with_context(|| {
      format!(
        "failed to read events file {}",
        path.display()
      )
    })?;

  let is_toml = path
    .extension()
    .and_then(|ext| ext.to_str())
    .is_some_and(|ext| {
      ext.eq_ignore_ascii_case("toml")
    });

  let events = if is_toml {
    toml::from_str::<TomlEventsFile>(
      &text
    )
    .with_context(|| {
      format!(
        "failed to parse {}",
        path.display()
      )
    })?
    .events
  } else {
    match serde_json::from_str::<
      JsonEventsFile
    >(&text)
    .with_context(|| {
      format!(
        "failed to parse {}",
        path.display()
      )
    })? {
      | JsonEventsFile::List(events) => {
        events
      }
      | JsonEventsFile::Wrapped {
        events
      } => events
    }
  };

  let invalid = events
    .iter()
    .filter(|event| {
      !event.date.is_valid()
    })
    .count();
  if invalid > 0 {
    warn!(
      file = %path.display(),
      invalid,
      "events with unparsable dates will not appear on any day"
    );
  }

  info!(
    file = %path.display(),
    count = events.len(),
    "loaded events"
  );
  Ok(events)
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_config_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(config_env) =
    std::env::var(CONFIG_ENV_VAR)
  {
    if config_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      config_env
    )));
  }

  let Some(config_dir) =
    dirs::config_dir()
  else {
    warn!(
      "cannot determine config \
       directory"
    );
    return Ok(None);
  };
  let candidate = config_dir
    .join(CONFIG_DIR_NAME)
    .join(CONFIG_FILE_NAME);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn resolve_relative_path(
  base_dir: &Path,
  raw: &str
) -> anyhow::Result<PathBuf> {
  if raw.trim().is_empty() {
    return Err(anyhow!(
      "events path cannot be empty"
    ));
  }

  let expanded =
    expand_tilde(Path::new(raw.trim()));
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

fn sanitize_week_start(
  raw: &str
) -> WeekStart {
  match raw.parse::<WeekStart>() {
    | Ok(week_start) => week_start,
    | Err(err) => {
      warn!(
        value = %raw,
        error = %err,
        "unknown week_start; using sunday"
      );
      WeekStart::Sunday
    }
  }
}

fn parse_initial_date(
  raw: &str
) -> anyhow::Result<Option<NaiveDate>> {
  let trimmed = raw.trim();
  if trimmed.is_empty()
    || trimmed
      .eq_ignore_ascii_case("today")
  {
    return Ok(None);
  }
  crate::action::parse_day(trimmed)
    .map(Some)
    .context("invalid initial_date")
}

fn parse_year(
  raw: &str
) -> anyhow::Result<i32> {
  raw.parse::<i32>().with_context(
    || format!("invalid year: {raw}")
  )
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(s: &str) -> bool {
  matches!(
    s.trim()
      .to_ascii_lowercase()
      .as_str(),
    "1" | "y" | "yes" | "on" | "true"
  )
}
