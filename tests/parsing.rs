use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;

use frc_scout::model::CompLevel;
use frc_scout::provider::{RatingError, events_started_by};
use frc_scout::statbotics_fetch::parse_statbotics_team_json;
use frc_scout::tba_fetch::{
    BreakdownFields, parse_tba_events_json, parse_tba_matches_json, parse_tba_teams_json,
};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn parses_tba_events_fixture() {
    let raw = read_fixture("tba_events.json");
    let events = parse_tba_events_json(&raw).expect("fixture should parse");
    assert_eq!(events.len(), 4);
    assert_eq!(events[0].key, "2025casj");
    assert_eq!(events[0].name, "Silicon Valley Regional");
    assert_eq!(events[0].start_date, "2025-03-19");
    // Missing name falls back to the key.
    assert_eq!(events[2].name, "2025week0");
    assert_eq!(events[3].start_date, "");
}

#[test]
fn started_filter_is_inclusive_and_drops_undated_events() {
    let raw = read_fixture("tba_events.json");
    let events = parse_tba_events_json(&raw).expect("fixture should parse");
    let today = NaiveDate::from_ymd_opt(2025, 3, 19).expect("valid date");
    let keys: Vec<String> = events_started_by(events, today)
        .into_iter()
        .map(|e| e.key)
        .collect();
    assert_eq!(keys, vec!["2025casj".to_string(), "2025week0".to_string()]);
}

#[test]
fn parses_tba_teams_fixture() {
    let raw = read_fixture("tba_teams.json");
    let teams = parse_tba_teams_json(&raw).expect("fixture should parse");
    let numbers: Vec<u32> = teams.iter().map(|t| t.team_number).collect();
    assert_eq!(numbers, vec![254, 604, 1678, 649, 971, 8033]);
}

#[test]
fn parses_tba_matches_fixture() {
    let raw = read_fixture("tba_matches.json");
    let matches = parse_tba_matches_json(&raw, &BreakdownFields::default())
        .expect("fixture should parse");
    assert_eq!(matches.len(), 4);

    let qm1 = &matches[0];
    assert_eq!(qm1.comp_level, CompLevel::Qualification);
    assert_eq!(qm1.red.team_keys, vec!["frc254", "frc604", "frc1678"]);
    assert_eq!(qm1.red.score, 132.0);
    assert_eq!(qm1.blue.score, 98.0);
    let breakdown = qm1.breakdown.expect("played match has a breakdown");
    assert_eq!(breakdown.red.auto_count, Some(5.0));
    assert_eq!(breakdown.red.teleop_count, Some(21.0));
    assert_eq!(breakdown.blue.teleop_count, Some(14.0));

    let qm2 = matches[1].breakdown.expect("played match has a breakdown");
    assert_eq!(qm2.blue.auto_count, Some(6.0));
    assert_eq!(qm2.blue.teleop_count, None);

    assert!(matches[2].breakdown.is_none());
    assert_eq!(matches[3].comp_level, CompLevel::Other);
}

#[test]
fn breakdown_field_names_are_configurable() {
    let raw = read_fixture("tba_matches.json");
    let fields = BreakdownFields {
        auto_count: "totalPoints".to_string(),
        teleop_count: "missingField".to_string(),
    };
    let matches = parse_tba_matches_json(&raw, &fields).expect("fixture should parse");
    let breakdown = matches[0].breakdown.expect("played match has a breakdown");
    assert_eq!(breakdown.red.auto_count, Some(132.0));
    assert_eq!(breakdown.red.teleop_count, None);
    assert_eq!(breakdown.blue.auto_count, Some(98.0));
}

#[test]
fn null_and_empty_bodies_parse_as_empty() {
    assert!(parse_tba_events_json("null").unwrap().is_empty());
    assert!(parse_tba_teams_json("   ").unwrap().is_empty());
    assert!(
        parse_tba_matches_json("null", &BreakdownFields::default())
            .unwrap()
            .is_empty()
    );
}

#[test]
fn invalid_tba_json_is_an_error() {
    assert!(parse_tba_teams_json("{\"team_number\": 1}").is_err());
    assert!(parse_tba_matches_json("[{", &BreakdownFields::default()).is_err());
}

#[test]
fn parses_statbotics_team_fixture() {
    let raw = read_fixture("statbotics_team.json");
    let epa = parse_statbotics_team_json(254, &raw).expect("fixture should parse");
    assert_eq!(epa, Some(1873.4));
}

#[test]
fn statbotics_missing_epa_is_none() {
    let epa = parse_statbotics_team_json(254, r#"{"team": 254, "norm_epa": null}"#)
        .expect("valid json");
    assert_eq!(epa, None);
    let epa = parse_statbotics_team_json(254, r#"{"norm_epa": {"current": "n/a"}}"#)
        .expect("valid json");
    assert_eq!(epa, None);
}

#[test]
fn statbotics_garbage_is_malformed_for_that_team() {
    let err = parse_statbotics_team_json(971, "<html>rate limited</html>")
        .expect_err("html is not json");
    assert!(matches!(err, RatingError::Malformed { team: 971, .. }));
    assert!(err.is_per_team());
}
