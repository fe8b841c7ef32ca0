use std::ffi::OsString;
use std::fs;

use chrono::NaiveDate;
use kalendly_core::config::{Config, load_events};
use kalendly_core::{CalendarEngine, EventId, WeekStart};
use tempfile::tempdir;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

#[test]
fn settings_file_drives_engine_setup() {
    let temp = tempdir().expect("tempdir");
    let events_path = temp.path().join("events.json");
    fs::write(
        &events_path,
        r##"[
            {"id": 1, "name": "Team Meeting", "date": "2024-01-15", "description": "Weekly sync", "room": "4B"},
            {"id": "launch", "name": "Launch", "date": "2024-01-20T09:30:00", "color": "#ff0000"}
        ]"##,
    )
    .expect("write events");

    let settings_path = temp.path().join("kalendly.toml");
    fs::write(
        &settings_path,
        "events = \"events.json\"\nweek_start = \"monday\"\ninitial_date = \"2024-01-15\"\nmin_year = 2020\nmax_year = 2025\ncolor = false\n",
    )
    .expect("write settings");

    let cfg = Config::load(Some(settings_path.as_path())).expect("load settings");
    assert_eq!(cfg.events_path.as_deref(), Some(events_path.as_path()));
    assert_eq!(cfg.week_start, WeekStart::Monday);
    assert_eq!(cfg.loaded_files, vec![settings_path.clone()]);
    assert!(!cfg.color);

    let events = cfg.load_events().expect("load events");
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].extra.get("room"), Some(&serde_json::json!("4B")));
    assert_eq!(events[1].id, EventId::from("launch"));
    assert_eq!(events[1].color.as_deref(), Some("#ff0000"));

    let mut engine = CalendarEngine::new(cfg.calendar_config(events));
    let state = engine.state();
    assert_eq!((state.current_year, state.current_month, state.current_date), (2024, 0, 15));
    assert_eq!(engine.week_start(), WeekStart::Monday);

    engine.select_date(day(2024, 1, 20), Some(5));
    assert_eq!(engine.state().tasks[0].name, "Launch");

    let view = engine.view_model_at(day(2024, 1, 15));
    assert_eq!(view.years.first(), Some(&2020));
    assert_eq!(view.years.last(), Some(&2025));
}

#[test]
fn toml_events_and_wrapped_json_load() {
    let temp = tempdir().expect("tempdir");

    let toml_path = temp.path().join("events.toml");
    fs::write(
        &toml_path,
        "[[events]]\nid = 7\nname = \"Dentist\"\ndate = \"2024-03-05\"\n\n[[events]]\nid = \"b\"\nname = \"Standup\"\ndate = \"2024-03-06 09:00\"\n",
    )
    .expect("write toml");
    let events = load_events(&toml_path).expect("load toml events");
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].id, EventId::from(7));
    assert!(events[1].falls_on(day(2024, 3, 6)));

    let json_path = temp.path().join("wrapped.json");
    fs::write(
        &json_path,
        r#"{"events": [{"id": 1, "name": "A", "date": "2024-03-05"}]}"#,
    )
    .expect("write json");
    let events = load_events(&json_path).expect("load wrapped events");
    assert_eq!(events.len(), 1);
}

#[test]
fn invalid_event_dates_are_kept_but_never_match() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("events.json");
    fs::write(
        &path,
        r#"[
            {"id": 1, "name": "Broken", "date": "someday"},
            {"id": 2, "name": "Fine", "date": "2024-05-01"}
        ]"#,
    )
    .expect("write events");

    let events = load_events(&path).expect("load events");
    assert_eq!(events.len(), 2);
    assert!(!events[0].date.is_valid());
    assert_eq!(events[0].date.to_string(), "someday");
    assert!(events[1].date.is_valid());
}

#[test]
fn missing_or_malformed_files_are_errors() {
    let temp = tempdir().expect("tempdir");
    assert!(load_events(&temp.path().join("absent.json")).is_err());

    let bad = temp.path().join("bad.json");
    fs::write(&bad, "{ not json").expect("write");
    assert!(load_events(&bad).is_err());

    let settings = temp.path().join("kalendly.toml");
    fs::write(&settings, "initial_date = \"15/01/2024\"").expect("write");
    assert!(Config::load(Some(settings.as_path())).is_err());
}

fn cli_args(args: &[&str]) -> Vec<OsString> {
    args.iter().map(OsString::from).collect()
}

#[test]
fn run_replays_actions_against_settings() {
    let temp = tempdir().expect("tempdir");
    let events_path = temp.path().join("events.json");
    fs::write(&events_path, r#"[{"id": 1, "name": "A", "date": "2024-01-15"}]"#)
        .expect("write events");
    let settings_path = temp.path().join("kalendly.toml");
    fs::write(&settings_path, "color = false\n").expect("write settings");
    let settings = settings_path.to_str().expect("utf8 path");
    let events = events_path.to_str().expect("utf8 path");

    let mut json_out = Vec::new();
    kalendly_core::run_with_output(
        cli_args(&[
            "kalendly",
            "-q",
            "--config",
            settings,
            "--events",
            events,
            "--month",
            "2024-01",
            "--json",
            "next",
            "select:2024-01-15@1",
        ]),
        &mut json_out,
    )
    .expect("json run succeeds");

    let view: serde_json::Value = serde_json::from_slice(&json_out).expect("json output");
    assert_eq!(view["currentYear"], 2024);
    assert_eq!(view["currentMonth"], 0);
    assert_eq!(view["selectedDate"], "2024-01-15");
    assert_eq!(view["selectedDayIndex"], 1);
    assert_eq!(view["scheduleDay"], "Monday 15");
    assert_eq!(view["popupPositionClass"], "popup-right");
    assert_eq!(view["tasks"].as_array().map(Vec::len), Some(1));
    assert_eq!(view["tasks"][0]["name"], "A");

    let mut text_out = Vec::new();
    kalendly_core::run_with_output(
        cli_args(&[
            "kalendly",
            "-q",
            "--config",
            settings,
            "--events",
            events,
            "--week-start",
            "monday",
            "--month",
            "2024-01",
            "next",
            "prev",
            "select:2024-01-16",
        ]),
        &mut text_out,
    )
    .expect("text run succeeds");

    let text = String::from_utf8(text_out).expect("utf8 output");
    let lines = text.lines().collect::<Vec<_>>();
    assert_eq!(lines[0], "Jan 2024");
    assert_eq!(lines[2], "Mon Tue Wed Thu Fri Sat Sun");
    assert!(text.contains("15*"));
    assert!(text.contains("[16]"));
    assert!(text.contains("Tuesday 16"));
    assert!(text.contains("No events scheduled for this day."));

    let mut unused = Vec::new();
    assert!(
        kalendly_core::run_with_output(
            cli_args(&["kalendly", "-q", "--config", settings, "upward"]),
            &mut unused,
        )
        .is_err()
    );
    assert!(unused.is_empty());
}
