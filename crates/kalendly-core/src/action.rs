use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use regex::Regex;

use crate::grid::WEEK_LEN;

/// User gestures an adapter feeds into the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarAction {
    Next,
    Previous,
    /// Zero-based month.
    Jump { year: i32, month: u32 },
    Select { date: NaiveDate, day_index: Option<usize> },
    ClearSelection,
    GoToDate(NaiveDate),
}

impl fmt::Display for CalendarAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalendarAction::Next => f.write_str("next"),
            CalendarAction::Previous => f.write_str("previous"),
            CalendarAction::Jump { year, month } => write!(f, "jump:{year:04}-{:02}", month + 1),
            CalendarAction::Select {
                date,
                day_index: Some(idx),
            } => write!(f, "select:{}@{idx}", date.format("%Y-%m-%d")),
            CalendarAction::Select {
                date,
                day_index: None,
            } => write!(f, "select:{}", date.format("%Y-%m-%d")),
            CalendarAction::ClearSelection => f.write_str("clear"),
            CalendarAction::GoToDate(date) => write!(f, "goto:{}", date.format("%Y-%m-%d")),
        }
    }
}

impl FromStr for CalendarAction {
    type Err = anyhow::Error;

    /// Accepts `next`, `prev`/`previous`, `clear`, `jump:YYYY-MM`,
    /// `select:YYYY-MM-DD[@COL]` and `goto:YYYY-MM-DD`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        let lower = token.to_ascii_lowercase();

        match lower.as_str() {
            "next" => return Ok(CalendarAction::Next),
            "prev" | "previous" => return Ok(CalendarAction::Previous),
            "clear" => return Ok(CalendarAction::ClearSelection),
            _ => {}
        }

        let (verb, arg) = lower
            .split_once(':')
            .ok_or_else(|| anyhow!("unknown calendar action: {token}"))?;

        match verb {
            "jump" => {
                let (year, month) = parse_year_month(arg)?;
                Ok(CalendarAction::Jump { year, month })
            }
            "select" => {
                let (raw_date, raw_index) = match arg.split_once('@') {
                    Some((date, idx)) => (date, Some(idx)),
                    None => (arg, None),
                };
                let date = parse_day(raw_date)?;
                let day_index = raw_index
                    .map(|idx| {
                        idx.parse::<usize>()
                            .ok()
                            .filter(|idx| *idx < WEEK_LEN)
                            .ok_or_else(|| anyhow!("day index must be 0-6, got: {idx}"))
                    })
                    .transpose()?;
                Ok(CalendarAction::Select { date, day_index })
            }
            "goto" => Ok(CalendarAction::GoToDate(parse_day(arg)?)),
            other => Err(anyhow!("unknown calendar action: {other}")),
        }
    }
}

fn year_month_re() -> Option<&'static Regex> {
    static YEAR_MONTH: OnceLock<Option<Regex>> = OnceLock::new();
    YEAR_MONTH
        .get_or_init(|| Regex::new(r"^(?P<year>-?\d{1,6})-(?P<month>\d{1,2})$").ok())
        .as_ref()
}

/// Parses `YYYY-MM` into a year and a zero-based month.
pub fn parse_year_month(raw: &str) -> anyhow::Result<(i32, u32)> {
    let trimmed = raw.trim();
    let captures = year_month_re()
        .and_then(|re| re.captures(trimmed))
        .ok_or_else(|| anyhow!("expected YYYY-MM, got: {trimmed}"))?;

    let year = captures["year"]
        .parse::<i32>()
        .with_context(|| format!("invalid year in {trimmed}"))?;
    let month = captures["month"]
        .parse::<u32>()
        .with_context(|| format!("invalid month in {trimmed}"))?;
    if !(1..=12).contains(&month) {
        return Err(anyhow!("month must be 01-12, got: {month}"));
    }

    Ok((year, month - 1))
}

pub fn parse_day(raw: &str) -> anyhow::Result<NaiveDate> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .with_context(|| format!("expected YYYY-MM-DD, got: {trimmed}"))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{CalendarAction, parse_year_month};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn parses_simple_verbs() {
        assert_eq!("next".parse::<CalendarAction>().expect("next"), CalendarAction::Next);
        assert_eq!("Prev".parse::<CalendarAction>().expect("prev"), CalendarAction::Previous);
        assert_eq!(
            "clear".parse::<CalendarAction>().expect("clear"),
            CalendarAction::ClearSelection
        );
    }

    #[test]
    fn parses_jump_with_one_based_month() {
        assert_eq!(
            "jump:2025-06".parse::<CalendarAction>().expect("jump"),
            CalendarAction::Jump { year: 2025, month: 5 }
        );
        assert!("jump:2025-13".parse::<CalendarAction>().is_err());
        assert!("jump:june".parse::<CalendarAction>().is_err());
    }

    #[test]
    fn parses_select_with_optional_column() {
        assert_eq!(
            "select:2024-01-15@3".parse::<CalendarAction>().expect("select"),
            CalendarAction::Select {
                date: day(2024, 1, 15),
                day_index: Some(3)
            }
        );
        assert_eq!(
            "select:2024-01-15".parse::<CalendarAction>().expect("select"),
            CalendarAction::Select {
                date: day(2024, 1, 15),
                day_index: None
            }
        );
        assert!("select:2024-01-15@7".parse::<CalendarAction>().is_err());
        assert!("select:2024-02-30".parse::<CalendarAction>().is_err());
    }

    #[test]
    fn display_parses_back() {
        let actions = [
            CalendarAction::Jump { year: 2024, month: 11 },
            CalendarAction::Select {
                date: day(2024, 2, 29),
                day_index: Some(4),
            },
            CalendarAction::GoToDate(day(2023, 7, 1)),
        ];
        for action in actions {
            let reparsed: CalendarAction = action.to_string().parse().expect("reparse");
            assert_eq!(reparsed, action);
        }
    }

    #[test]
    fn year_month_is_zero_based() {
        assert_eq!(parse_year_month("2024-01").expect("parse"), (2024, 0));
        assert_eq!(parse_year_month(" 1999-12 ").expect("parse"), (1999, 11));
        assert!(parse_year_month("2024-00").is_err());
        assert!(parse_year_month("2024/01").is_err());
    }
}
