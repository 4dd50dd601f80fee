use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;

use crate::event_cache::EventCache;
use crate::model::{EventSnapshot, EventSummary, TeamRatingRow};
use crate::opr::{self, DesignStats, UnknownTeamPolicy};
use crate::provider::{self, MatchDataProvider, RatingProvider};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventRatings {
    pub event_key: String,
    /// Roster order.
    pub rows: Vec<TeamRatingRow>,
    pub stats: DesignStats,
    pub warnings: Vec<String>,
}

/// Pulls event data through the cache, solves the contribution ratings and joins
/// the external rating for every roster team.
pub struct MetricsEngine {
    matches: Arc<dyn MatchDataProvider>,
    ratings: Arc<dyn RatingProvider>,
    cache: Arc<EventCache>,
    policy: UnknownTeamPolicy,
    pool: Option<rayon::ThreadPool>,
}

impl MetricsEngine {
    pub fn new(
        matches: Arc<dyn MatchDataProvider>,
        ratings: Arc<dyn RatingProvider>,
        cache: Arc<EventCache>,
    ) -> Self {
        Self {
            matches,
            ratings,
            cache,
            policy: UnknownTeamPolicy::default(),
            pool: None,
        }
    }

    pub fn with_policy(mut self, policy: UnknownTeamPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_fetch_parallelism(mut self, threads: usize) -> Self {
        self.pool = provider::build_fetch_pool(threads);
        self
    }

    pub fn policy(&self) -> UnknownTeamPolicy {
        self.policy
    }

    pub fn cache(&self) -> &EventCache {
        &self.cache
    }

    pub fn started_events(&self, season: i32, today: NaiveDate) -> Result<Vec<EventSummary>> {
        let events = self
            .matches
            .list_events(season)
            .with_context(|| format!("listing {season} events"))?;
        Ok(provider::events_started_by(events, today))
    }

    pub fn event_snapshot(&self, event_key: &str) -> Result<Arc<EventSnapshot>> {
        self.cache.get_or_fetch(event_key, || {
            let matches = self
                .matches
                .list_matches(event_key)
                .with_context(|| format!("fetching matches for {event_key}"))?;
            let teams = self
                .matches
                .list_teams(event_key)
                .with_context(|| format!("fetching teams for {event_key}"))?;
            Ok(EventSnapshot { teams, matches })
        })
    }

    /// Match-data failures are returned as `Err`; rating-provider failures degrade to
    /// EPA 0 with a warning.
    pub fn compute_ratings(&self, event_key: &str) -> Result<EventRatings> {
        let snapshot = self.event_snapshot(event_key)?;
        let solved = opr::compute_event_opr(&snapshot, self.policy)
            .with_context(|| format!("solving ratings for {event_key}"))?;

        let mut warnings = Vec::new();
        if solved.teams.is_empty() {
            return Ok(EventRatings {
                event_key: event_key.to_string(),
                rows: Vec::new(),
                stats: solved.stats,
                warnings,
            });
        }
        if solved.stats.rejected > 0 {
            warnings.push(format!(
                "{} match(es) rejected: alliance team not on roster",
                solved.stats.rejected
            ));
        }

        let epa = match provider::fetch_ratings(
            self.ratings.as_ref(),
            &solved.teams,
            self.pool.as_ref(),
        ) {
            Ok(batch) => {
                if !batch.skipped.is_empty() {
                    warnings.push(format!(
                        "EPA unavailable for {} team(s)",
                        batch.skipped.len()
                    ));
                }
                batch.ratings
            }
            Err(err) => {
                warnings.push(format!("EPA fetch failed: {err}"));
                Default::default()
            }
        };

        Ok(EventRatings {
            event_key: event_key.to_string(),
            rows: opr::assemble_rows(&solved, &epa),
            stats: solved.stats,
            warnings,
        })
    }
}
