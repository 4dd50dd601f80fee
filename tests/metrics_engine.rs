use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, anyhow};
use chrono::NaiveDate;

use frc_scout::demo_feed::DemoProvider;
use frc_scout::event_cache::EventCache;
use frc_scout::metrics::MetricsEngine;
use frc_scout::model::{
    Alliance, AllianceBreakdown, CompLevel, EventSummary, Match, ScoreBreakdown, Team, TeamNumber,
    team_key,
};
use frc_scout::opr::UnknownTeamPolicy;
use frc_scout::provider::{MatchDataProvider, RatingError, RatingProvider};

#[derive(Default)]
struct CountingMatches {
    team_calls: AtomicUsize,
    match_calls: AtomicUsize,
    offline: bool,
}

impl CountingMatches {
    fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }
}

fn alliance(teams: &[TeamNumber], score: f64) -> Alliance {
    Alliance {
        team_keys: teams.iter().map(|&t| team_key(t)).collect(),
        score,
    }
}

impl MatchDataProvider for CountingMatches {
    fn list_events(&self, _season: i32) -> Result<Vec<EventSummary>> {
        Ok(vec![
            EventSummary {
                key: "2025past".to_string(),
                name: "Past".to_string(),
                start_date: "2025-03-01".to_string(),
            },
            EventSummary {
                key: "2025future".to_string(),
                name: "Future".to_string(),
                start_date: "2025-05-01".to_string(),
            },
        ])
    }

    fn list_teams(&self, _event_key: &str) -> Result<Vec<Team>> {
        self.team_calls.fetch_add(1, Ordering::SeqCst);
        if self.offline {
            return Err(anyhow!("connection refused"));
        }
        Ok([1, 2, 3, 4, 5, 6, 7]
            .iter()
            .map(|&team_number| Team { team_number })
            .collect())
    }

    fn list_matches(&self, event_key: &str) -> Result<Vec<Match>> {
        self.match_calls.fetch_add(1, Ordering::SeqCst);
        if self.offline {
            return Err(anyhow!("connection refused"));
        }
        let breakdown = ScoreBreakdown {
            red: AllianceBreakdown {
                auto_count: Some(3.0),
                teleop_count: Some(12.0),
            },
            blue: AllianceBreakdown {
                auto_count: Some(6.0),
                teleop_count: None,
            },
        };
        Ok(vec![
            Match {
                key: format!("{event_key}_qm1"),
                comp_level: CompLevel::Qualification,
                red: alliance(&[1, 2, 3], 30.0),
                blue: alliance(&[4, 5, 6], 60.0),
                breakdown: Some(breakdown),
            },
            Match {
                key: format!("{event_key}_qm2"),
                comp_level: CompLevel::Qualification,
                red: alliance(&[1, 2, 99], 45.0),
                blue: alliance(&[4, 5, 6], 50.0),
                breakdown: Some(breakdown),
            },
        ])
    }
}

struct FixedRatings {
    calls: AtomicUsize,
}

impl RatingProvider for FixedRatings {
    fn team_rating(&self, team: TeamNumber) -> Result<Option<f64>, RatingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match team {
            3 => Ok(None),
            5 => Err(RatingError::Status { team, status: 404 }),
            _ => Ok(Some(1500.0 + f64::from(team) * 10.04)),
        }
    }
}

struct DownRatings;

impl RatingProvider for DownRatings {
    fn team_rating(&self, _team: TeamNumber) -> Result<Option<f64>, RatingError> {
        Err(RatingError::Unavailable("timed out".to_string()))
    }
}

fn engine_with(
    matches: Arc<CountingMatches>,
    ratings: Arc<dyn RatingProvider>,
) -> MetricsEngine {
    MetricsEngine::new(matches, ratings, Arc::new(EventCache::new()))
}

#[test]
fn second_computation_hits_the_cache() {
    let matches = Arc::new(CountingMatches::default());
    let engine = engine_with(
        matches.clone(),
        Arc::new(FixedRatings {
            calls: AtomicUsize::new(0),
        }),
    );

    let first = engine.compute_ratings("2025past").expect("first compute");
    let second = engine.compute_ratings("2025past").expect("second compute");
    assert_eq!(first, second);
    assert_eq!(matches.team_calls.load(Ordering::SeqCst), 1);
    assert_eq!(matches.match_calls.load(Ordering::SeqCst), 1);
    assert_eq!(engine.cache().len(), 1);

    engine.compute_ratings("2025other").expect("other event");
    assert_eq!(matches.match_calls.load(Ordering::SeqCst), 2);
    assert_eq!(engine.cache().len(), 2);
}

#[test]
fn one_record_per_roster_team() {
    let engine = engine_with(
        Arc::new(CountingMatches::default()),
        Arc::new(FixedRatings {
            calls: AtomicUsize::new(0),
        }),
    );
    let ratings = engine.compute_ratings("2025past").expect("compute");
    let teams: Vec<TeamNumber> = ratings.rows.iter().map(|r| r.team).collect();
    assert_eq!(teams, vec![1, 2, 3, 4, 5, 6, 7]);
    let unique: HashSet<TeamNumber> = teams.iter().copied().collect();
    assert_eq!(unique.len(), teams.len());
    // Team 7 never played.
    assert_eq!(ratings.rows[6].opr, 0.0);
    assert_eq!(ratings.stats.matches_used, 2);
    assert_eq!(ratings.stats.dropped_slots, 1);
}

#[test]
fn missing_epa_is_exactly_zero() {
    let engine = engine_with(
        Arc::new(CountingMatches::default()),
        Arc::new(FixedRatings {
            calls: AtomicUsize::new(0),
        }),
    );
    let ratings = engine.compute_ratings("2025past").expect("compute");
    let epa_of = |team: TeamNumber| {
        ratings
            .rows
            .iter()
            .find(|r| r.team == team)
            .map(|r| r.epa)
            .expect("team present")
    };
    assert_eq!(epa_of(1), 1510.0);
    assert_eq!(epa_of(2), 1520.1);
    assert_eq!(epa_of(3), 0.0);
    assert_eq!(epa_of(5), 0.0);
    assert!(
        ratings
            .warnings
            .iter()
            .any(|w| w.contains("EPA unavailable for 2 team(s)"))
    );
}

#[test]
fn rating_outage_degrades_to_zero_with_warning() {
    let engine = engine_with(Arc::new(CountingMatches::default()), Arc::new(DownRatings))
        .with_fetch_parallelism(2);
    let ratings = engine.compute_ratings("2025past").expect("compute");
    assert_eq!(ratings.rows.len(), 7);
    assert!(ratings.rows.iter().all(|r| r.epa == 0.0));
    assert!(ratings.rows.iter().any(|r| r.opr != 0.0));
    assert!(ratings.warnings.iter().any(|w| w.contains("EPA fetch failed")));
}

#[test]
fn match_provider_failure_is_an_error() {
    let matches = Arc::new(CountingMatches::offline());
    let ratings = Arc::new(FixedRatings {
        calls: AtomicUsize::new(0),
    });
    let engine = engine_with(matches.clone(), ratings.clone());

    let err = engine
        .compute_ratings("2025past")
        .expect_err("offline provider must fail");
    assert!(format!("{err:#}").contains("connection refused"));
    assert!(engine.cache().is_empty());
    assert_eq!(ratings.calls.load(Ordering::SeqCst), 0);

    // Nothing was cached, so a retry goes back to the provider.
    let _ = engine.compute_ratings("2025past");
    assert_eq!(matches.match_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn reject_policy_is_reported() {
    let engine = engine_with(
        Arc::new(CountingMatches::default()),
        Arc::new(FixedRatings {
            calls: AtomicUsize::new(0),
        }),
    )
    .with_policy(UnknownTeamPolicy::RejectMatch);
    let ratings = engine.compute_ratings("2025past").expect("compute");
    assert_eq!(ratings.stats.matches_used, 1);
    assert_eq!(ratings.stats.rejected, 1);
    assert!(ratings.warnings.iter().any(|w| w.contains("rejected")));
    assert_eq!(ratings.rows[0].opr, 10.0);
    assert_eq!(ratings.rows[3].opr, 20.0);
}

#[test]
fn started_events_are_filtered_by_date() {
    let engine = engine_with(
        Arc::new(CountingMatches::default()),
        Arc::new(FixedRatings {
            calls: AtomicUsize::new(0),
        }),
    );
    let today = NaiveDate::from_ymd_opt(2025, 4, 1).expect("valid date");
    let events = engine.started_events(2025, today).expect("list events");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].key, "2025past");
}

#[test]
fn concurrent_computations_do_not_mix_events() {
    let start = NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date");
    let demo = Arc::new(DemoProvider::new(start));
    let engine = Arc::new(MetricsEngine::new(
        demo.clone(),
        demo,
        Arc::new(EventCache::new()),
    ));

    let handles: Vec<_> = ["2025demo1", "2025demo2", "2025demo1", "2025demo2"]
        .into_iter()
        .map(|key| {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || engine.compute_ratings(key).expect("demo compute"))
        })
        .collect();
    let results: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("worker thread"))
        .collect();

    assert_eq!(results[0], results[2]);
    assert_eq!(results[1], results[3]);
    assert_eq!(results[0].event_key, "2025demo1");
    assert_eq!(results[1].event_key, "2025demo2");
    assert_ne!(results[0].rows, results[1].rows);
}
