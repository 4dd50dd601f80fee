use std::collections::HashMap;

use anyhow::Result;
use chrono::NaiveDate;
use rayon::prelude::*;
use thiserror::Error;

use crate::model::{EventSummary, Match, Team, TeamNumber};

/// Read-only source of events, rosters and match results.
pub trait MatchDataProvider: Send + Sync {
    fn list_events(&self, season: i32) -> Result<Vec<EventSummary>>;
    fn list_teams(&self, event_key: &str) -> Result<Vec<Team>>;
    fn list_matches(&self, event_key: &str) -> Result<Vec<Match>>;
}

/// Read-only source of precomputed per-team ratings.
pub trait RatingProvider: Send + Sync {
    /// `Ok(None)` when the provider answered but has no rating for the team.
    fn team_rating(&self, team: TeamNumber) -> Result<Option<f64>, RatingError>;
}

#[derive(Debug, Error)]
pub enum RatingError {
    /// The provider answered with a non-success status. Skips one team.
    #[error("team {team}: http {status}")]
    Status { team: TeamNumber, status: u16 },
    /// The response body was not the expected JSON. Skips one team.
    #[error("team {team}: malformed response: {reason}")]
    Malformed { team: TeamNumber, reason: String },
    /// Network or timeout failure. Aborts the whole batch.
    #[error("rating provider unavailable: {0}")]
    Unavailable(String),
}

impl RatingError {
    pub fn is_per_team(&self) -> bool {
        !matches!(self, RatingError::Unavailable(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingBatch {
    pub ratings: HashMap<TeamNumber, f64>,
    pub skipped: Vec<TeamNumber>,
}

/// Fetches every roster team's rating, in parallel when a pool is supplied.
///
/// Per-team misses land in `skipped`; the first batch-level failure is returned as `Err`.
pub fn fetch_ratings(
    provider: &dyn RatingProvider,
    roster: &[TeamNumber],
    pool: Option<&rayon::ThreadPool>,
) -> Result<RatingBatch, RatingError> {
    let fetch_all = || -> Result<Vec<(TeamNumber, Option<f64>)>, RatingError> {
        roster
            .par_iter()
            .map(|&team| match provider.team_rating(team) {
                Ok(rating) => Ok((team, rating.filter(|v| v.is_finite()))),
                Err(err) if err.is_per_team() => Ok((team, None)),
                Err(err) => Err(err),
            })
            .collect()
    };
    let results = match pool {
        Some(pool) => pool.install(fetch_all)?,
        None => fetch_all()?,
    };

    let mut batch = RatingBatch::default();
    for (team, rating) in results {
        match rating {
            Some(value) => {
                batch.ratings.insert(team, value);
            }
            None => batch.skipped.push(team),
        }
    }
    Ok(batch)
}

pub fn build_fetch_pool(threads: usize) -> Option<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build()
        .ok()
}

/// Events whose start date is on or before `today`, in provider order.
/// Unparseable dates are kept out.
pub fn events_started_by(events: Vec<EventSummary>, today: NaiveDate) -> Vec<EventSummary> {
    events
        .into_iter()
        .filter(|event| {
            NaiveDate::parse_from_str(event.start_date.trim(), "%Y-%m-%d")
                .map(|start| start <= today)
                .unwrap_or(false)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scripted;

    impl RatingProvider for Scripted {
        fn team_rating(&self, team: TeamNumber) -> Result<Option<f64>, RatingError> {
            match team {
                1 => Ok(Some(1650.26)),
                2 => Err(RatingError::Status { team, status: 404 }),
                3 => Ok(None),
                4 => Err(RatingError::Malformed {
                    team,
                    reason: "expected object".to_string(),
                }),
                5 => Err(RatingError::Unavailable("connection reset".to_string())),
                _ => Ok(Some(1500.0)),
            }
        }
    }

    #[test]
    fn per_team_failures_are_skipped() {
        let batch = fetch_ratings(&Scripted, &[1, 2, 3, 4, 6], None).expect("batch should succeed");
        assert_eq!(batch.ratings.len(), 2);
        assert_eq!(batch.ratings.get(&1), Some(&1650.26));
        let mut skipped = batch.skipped.clone();
        skipped.sort_unstable();
        assert_eq!(skipped, vec![2, 3, 4]);
    }

    #[test]
    fn transport_failure_aborts_batch() {
        let err = fetch_ratings(&Scripted, &[1, 5, 6], None).expect_err("batch should fail");
        assert!(!err.is_per_team());
    }

    #[test]
    fn started_filter_uses_inclusive_date() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 7).expect("valid date");
        let events = vec![
            EventSummary {
                key: "2025early".to_string(),
                name: "Early".to_string(),
                start_date: "2025-02-28".to_string(),
            },
            EventSummary {
                key: "2025today".to_string(),
                name: "Today".to_string(),
                start_date: "2025-03-07".to_string(),
            },
            EventSummary {
                key: "2025later".to_string(),
                name: "Later".to_string(),
                start_date: "2025-04-01".to_string(),
            },
            EventSummary {
                key: "2025bad".to_string(),
                name: "Bad".to_string(),
                start_date: "TBD".to_string(),
            },
        ];
        let kept: Vec<String> = events_started_by(events, today)
            .into_iter()
            .map(|e| e.key)
            .collect();
        assert_eq!(kept, vec!["2025early", "2025today"]);
    }
}
