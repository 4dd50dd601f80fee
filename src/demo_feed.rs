use anyhow::{Result, anyhow};
use chrono::{Duration as ChronoDuration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::model::{
    Alliance, AllianceBreakdown, CompLevel, EventSnapshot, EventSummary, Match, ScoreBreakdown,
    Team, TeamNumber, team_key,
};
use crate::provider::{MatchDataProvider, RatingError, RatingProvider};

const DEMO_EVENTS: &[(&str, &str, i64)] = &[
    ("demo1", "Demo Regional (week 1)", 0),
    ("demo2", "Demo District Event", 7),
    ("demo3", "Demo Championship Division", 35),
];

/// Offline synthetic data: seeded events whose scores are additive team
/// contributions plus noise, and EPA values derived from the same strengths.
#[derive(Debug, Clone)]
pub struct DemoProvider {
    season_start: NaiveDate,
    played_fraction: f64,
}

impl DemoProvider {
    pub fn new(season_start: NaiveDate) -> Self {
        Self {
            season_start,
            played_fraction: 0.85,
        }
    }

    pub fn with_played_fraction(mut self, fraction: f64) -> Self {
        self.played_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    pub fn snapshot(&self, event_key: &str) -> Result<EventSnapshot> {
        let (code, _, _) = demo_event(event_key)?;
        let mut rng = StdRng::seed_from_u64(seed_for(code));

        let team_count = rng.gen_range(24..=36);
        let mut numbers: Vec<TeamNumber> = Vec::with_capacity(team_count);
        while numbers.len() < team_count {
            let candidate = rng.gen_range(1..=9999);
            if !numbers.contains(&candidate) {
                numbers.push(candidate);
            }
        }
        let teams: Vec<Team> = numbers
            .iter()
            .map(|&team_number| Team { team_number })
            .collect();

        let rounds = 10;
        let per_round = team_count / 6;
        let total = rounds * per_round;
        let played = ((total as f64) * self.played_fraction).round() as usize;
        let mut matches = Vec::with_capacity(total + 1);
        for round in 0..rounds {
            let mut order = numbers.clone();
            order.shuffle(&mut rng);
            for slot in 0..per_round {
                let number = round * per_round + slot + 1;
                let red = &order[slot * 6..slot * 6 + 3];
                let blue = &order[slot * 6 + 3..slot * 6 + 6];
                matches.push(simulate_match(
                    &mut rng,
                    format!("{code}_qm{number}"),
                    CompLevel::Qualification,
                    red,
                    blue,
                    number <= played,
                ));
            }
        }
        if numbers.len() >= 6 {
            matches.push(simulate_match(
                &mut rng,
                format!("{code}_f1m1"),
                CompLevel::Other,
                &numbers[..3],
                &numbers[3..6],
                true,
            ));
        }

        Ok(EventSnapshot { teams, matches })
    }
}

impl MatchDataProvider for DemoProvider {
    fn list_events(&self, season: i32) -> Result<Vec<EventSummary>> {
        Ok(DEMO_EVENTS
            .iter()
            .map(|(code, name, offset)| EventSummary {
                key: format!("{season}{code}"),
                name: name.to_string(),
                start_date: (self.season_start + ChronoDuration::days(*offset))
                    .format("%Y-%m-%d")
                    .to_string(),
            })
            .collect())
    }

    fn list_teams(&self, event_key: &str) -> Result<Vec<Team>> {
        Ok(self.snapshot(event_key)?.teams)
    }

    fn list_matches(&self, event_key: &str) -> Result<Vec<Match>> {
        Ok(self.snapshot(event_key)?.matches)
    }
}

impl RatingProvider for DemoProvider {
    fn team_rating(&self, team: TeamNumber) -> Result<Option<f64>, RatingError> {
        if team % 11 == 0 {
            return Ok(None);
        }
        if team % 13 == 0 {
            return Err(RatingError::Status { team, status: 404 });
        }
        let (points, _, _) = team_strength(team);
        Ok(Some(1500.0 + (points - 12.0) * 25.0))
    }
}

/// Expected (points, auto count, teleop count) for a team.
pub fn team_strength(team: TeamNumber) -> (f64, f64, f64) {
    let mut rng = StdRng::seed_from_u64(0x5eed_0000 ^ u64::from(team));
    let auto = rng.gen_range(0.0..3.0);
    let teleop = rng.gen_range(1.0..9.0);
    let points = auto * 7.0 + teleop * 3.0 + rng.gen_range(0.0..6.0);
    (points, auto, teleop)
}

fn simulate_match(
    rng: &mut StdRng,
    key: String,
    comp_level: CompLevel,
    red: &[TeamNumber],
    blue: &[TeamNumber],
    played: bool,
) -> Match {
    let mut side = |teams: &[TeamNumber]| {
        let (mut points, mut auto, mut teleop) = (0.0, 0.0, 0.0);
        for &team in teams {
            let (p, a, t) = team_strength(team);
            points += p;
            auto += a;
            teleop += t;
        }
        let points = (points + rng.gen_range(-8.0..8.0)).max(0.0).round();
        let auto = (auto + rng.gen_range(-1.0..1.0)).max(0.0).round();
        let teleop = (teleop + rng.gen_range(-2.0..2.0)).max(0.0).round();
        let alliance = Alliance {
            team_keys: teams.iter().map(|&t| team_key(t)).collect(),
            score: if played { points } else { -1.0 },
        };
        let breakdown = AllianceBreakdown {
            auto_count: Some(auto),
            teleop_count: Some(teleop),
        };
        (alliance, breakdown)
    };
    let (red_alliance, red_breakdown) = side(red);
    let (blue_alliance, blue_breakdown) = side(blue);

    Match {
        key,
        comp_level,
        red: red_alliance,
        blue: blue_alliance,
        breakdown: played.then_some(ScoreBreakdown {
            red: red_breakdown,
            blue: blue_breakdown,
        }),
    }
}

fn demo_event(event_key: &str) -> Result<(&'static str, &'static str, i64)> {
    DEMO_EVENTS
        .iter()
        .copied()
        .find(|(code, _, _)| event_key.ends_with(code))
        .ok_or_else(|| anyhow!("unknown demo event: {event_key}"))
}

fn seed_for(code: &str) -> u64 {
    code.bytes()
        .fold(0xcbf2_9ce4_8422_2325, |acc, b| (acc ^ u64::from(b)).wrapping_mul(0x100_0000_01b3))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> DemoProvider {
        DemoProvider::new(NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date"))
    }

    #[test]
    fn snapshots_are_deterministic() {
        let a = provider().snapshot("2025demo1").expect("demo event");
        let b = provider().snapshot("2025demo1").expect("demo event");
        assert_eq!(a, b);
        assert!(a.teams.len() >= 24);
        assert!(a.matches.iter().any(|m| m.breakdown.is_none()));
        assert!(a.matches.iter().any(|m| m.comp_level == CompLevel::Other));
    }

    #[test]
    fn unknown_event_is_an_error() {
        assert!(provider().snapshot("2025nope").is_err());
    }
}
