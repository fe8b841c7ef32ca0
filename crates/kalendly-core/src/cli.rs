use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{Context, anyhow};
use clap::{ArgAction, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::action::{CalendarAction, parse_year_month};
use crate::datetime::WeekStart;

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

/// `YYYY-MM` on the command line; `month` is zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthArg {
    pub year: i32,
    pub month: u32,
}

impl std::str::FromStr for MonthArg {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = parse_year_month(s)?;
        Ok(Self { year, month })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "kalendly",
    version,
    about = "Kalendly: month calendar with a per-day event schedule",
    after_help = "ACTIONS are replayed in order: next, prev, clear, jump:YYYY-MM, \
                  select:YYYY-MM-DD[@COL], goto:YYYY-MM-DD"
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    /// Settings file (defaults to $KALENDLY_CONFIG or the user config dir).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Events file (.json or .toml).
    #[arg(long = "events")]
    pub events: Option<PathBuf>,

    /// Month to open before replaying actions.
    #[arg(long = "month", value_name = "YYYY-MM")]
    pub month: Option<MonthArg>,

    #[arg(long = "week-start", value_name = "sunday|monday")]
    pub week_start: Option<WeekStart>,

    #[arg(long = "min-year")]
    pub min_year: Option<i32>,

    #[arg(long = "max-year")]
    pub max_year: Option<i32>,

    #[arg(
        long = "set",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub overrides: Vec<KeyVal>,

    /// Print the view model as JSON instead of the text grid.
    #[arg(long = "json")]
    pub json: bool,

    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ACTIONS")]
    pub rest: Vec<String>,
}

impl GlobalCli {
    /// Flag values expressed as settings overrides, explicit flags last so
    /// they win over `--set`.
    pub fn config_overrides(&self) -> Vec<(String, String)> {
        let mut overrides: Vec<(String, String)> = self
            .overrides
            .iter()
            .map(|kv| (kv.key.clone(), kv.value.clone()))
            .collect();

        if let Some(events) = &self.events {
            overrides.push(("events".to_string(), events.display().to_string()));
        }
        if let Some(week_start) = self.week_start {
            overrides.push(("week_start".to_string(), week_start.to_string()));
        }
        if let Some(min_year) = self.min_year {
            overrides.push(("min_year".to_string(), min_year.to_string()));
        }
        if let Some(max_year) = self.max_year {
            overrides.push(("max_year".to_string(), max_year.to_string()));
        }

        debug!(count = overrides.len(), "collected settings overrides");
        overrides
    }

    #[tracing::instrument(skip(self))]
    pub fn actions(&self) -> anyhow::Result<Vec<CalendarAction>> {
        let mut actions = Vec::with_capacity(self.rest.len() + 1);

        if let Some(month) = self.month {
            actions.push(CalendarAction::Jump {
                year: month.year,
                month: month.month,
            });
        }

        for token in &self.rest {
            let action = token
                .parse::<CalendarAction>()
                .with_context(|| format!("invalid action: {token}"))?;
            debug!(token = %token, %action, "parsed action");
            actions.push(action);
        }

        Ok(actions)
    }
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}
