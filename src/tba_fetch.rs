use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_json::Value;

use crate::http_client::{fetch_text, http_client};
use crate::model::{
    Alliance, AllianceBreakdown, CompLevel, EventSummary, Match, ScoreBreakdown, Team,
};
use crate::provider::MatchDataProvider;

pub const TBA_BASE_URL: &str = "https://www.thebluealliance.com/api/v3";
const AUTH_HEADER: &str = "X-TBA-Auth-Key";

/// Score-breakdown keys for the season's scoring-object counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakdownFields {
    pub auto_count: String,
    pub teleop_count: String,
}

impl Default for BreakdownFields {
    fn default() -> Self {
        Self {
            auto_count: "autoCoralCount".to_string(),
            teleop_count: "teleopCoralCount".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TbaClient {
    base_url: String,
    api_key: Option<String>,
    timeout_secs: u64,
    fields: BreakdownFields,
}

impl TbaClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout_secs: u64,
        fields: BreakdownFields,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            timeout_secs,
            fields,
        }
    }

    fn get(&self, path: &str) -> Result<String> {
        let key = self
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| anyhow!("TBA_API_KEY is not set"))?;
        let client = http_client(self.timeout_secs)?;
        let url = format!("{}{path}", self.base_url);
        fetch_text(client, &url, &[(AUTH_HEADER, key)])
    }
}

impl MatchDataProvider for TbaClient {
    fn list_events(&self, season: i32) -> Result<Vec<EventSummary>> {
        let body = self
            .get(&format!("/events/{season}/simple"))
            .context("events request failed")?;
        parse_tba_events_json(&body)
    }

    fn list_teams(&self, event_key: &str) -> Result<Vec<Team>> {
        let body = self
            .get(&format!("/event/{event_key}/teams/simple"))
            .context("teams request failed")?;
        parse_tba_teams_json(&body)
    }

    fn list_matches(&self, event_key: &str) -> Result<Vec<Match>> {
        let body = self
            .get(&format!("/event/{event_key}/matches"))
            .context("matches request failed")?;
        parse_tba_matches_json(&body, &self.fields)
    }
}

#[derive(Debug, Deserialize)]
struct TbaEvent {
    key: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    start_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TbaTeam {
    team_number: u32,
}

#[derive(Debug, Deserialize)]
struct TbaMatch {
    #[serde(default)]
    key: String,
    #[serde(default)]
    comp_level: String,
    #[serde(default)]
    alliances: Option<TbaAlliances>,
    #[serde(default)]
    score_breakdown: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct TbaAlliances {
    #[serde(default)]
    red: TbaAlliance,
    #[serde(default)]
    blue: TbaAlliance,
}

#[derive(Debug, Default, Deserialize)]
struct TbaAlliance {
    #[serde(default)]
    team_keys: Vec<String>,
    #[serde(default)]
    score: Option<f64>,
}

pub fn parse_tba_events_json(raw: &str) -> Result<Vec<EventSummary>> {
    let Some(trimmed) = non_null(raw) else {
        return Ok(Vec::new());
    };
    let events: Vec<TbaEvent> = serde_json::from_str(trimmed).context("invalid tba events json")?;
    Ok(events
        .into_iter()
        .map(|e| EventSummary {
            name: e.name.unwrap_or_else(|| e.key.clone()),
            key: e.key,
            start_date: e.start_date.unwrap_or_default(),
        })
        .collect())
}

pub fn parse_tba_teams_json(raw: &str) -> Result<Vec<Team>> {
    let Some(trimmed) = non_null(raw) else {
        return Ok(Vec::new());
    };
    let teams: Vec<TbaTeam> = serde_json::from_str(trimmed).context("invalid tba teams json")?;
    Ok(teams
        .into_iter()
        .map(|t| Team {
            team_number: t.team_number,
        })
        .collect())
}

pub fn parse_tba_matches_json(raw: &str, fields: &BreakdownFields) -> Result<Vec<Match>> {
    let Some(trimmed) = non_null(raw) else {
        return Ok(Vec::new());
    };
    let matches: Vec<TbaMatch> =
        serde_json::from_str(trimmed).context("invalid tba matches json")?;
    Ok(matches
        .into_iter()
        .map(|m| {
            let alliances = m.alliances.unwrap_or_default();
            Match {
                key: m.key,
                comp_level: CompLevel::from_code(&m.comp_level),
                red: to_alliance(alliances.red),
                blue: to_alliance(alliances.blue),
                breakdown: m
                    .score_breakdown
                    .as_ref()
                    .and_then(|v| parse_breakdown(v, fields)),
            }
        })
        .collect())
}

fn to_alliance(raw: TbaAlliance) -> Alliance {
    Alliance {
        team_keys: raw.team_keys,
        score: raw.score.unwrap_or(0.0),
    }
}

fn parse_breakdown(value: &Value, fields: &BreakdownFields) -> Option<ScoreBreakdown> {
    if !value.is_object() {
        return None;
    }
    let side = |name: &str| {
        let side = value.get(name).unwrap_or(&Value::Null);
        AllianceBreakdown {
            auto_count: side.get(&fields.auto_count).and_then(Value::as_f64),
            teleop_count: side.get(&fields.teleop_count).and_then(Value::as_f64),
        }
    };
    Some(ScoreBreakdown {
        red: side("red"),
        blue: side("blue"),
    })
}

fn non_null(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        None
    } else {
        Some(trimmed)
    }
}
