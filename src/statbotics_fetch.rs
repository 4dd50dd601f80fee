use serde_json::Value;

use crate::http_client::{http_client, send_get};
use crate::model::TeamNumber;
use crate::provider::{RatingError, RatingProvider};

pub const STATBOTICS_BASE_URL: &str = "https://api.statbotics.io/v3";

#[derive(Debug, Clone)]
pub struct StatboticsClient {
    base_url: String,
    timeout_secs: u64,
}

impl StatboticsClient {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout_secs,
        }
    }
}

impl RatingProvider for StatboticsClient {
    fn team_rating(&self, team: TeamNumber) -> Result<Option<f64>, RatingError> {
        let client = http_client(self.timeout_secs)
            .map_err(|err| RatingError::Unavailable(format!("{err:#}")))?;
        let url = format!("{}/team/{team}", self.base_url);
        let resp = send_get(client, &url, &[])
            .map_err(|err| RatingError::Unavailable(format!("{err:#}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RatingError::Status {
                team,
                status: status.as_u16(),
            });
        }
        let body = resp
            .text()
            .map_err(|err| RatingError::Unavailable(format!("team {team}: {err}")))?;
        parse_statbotics_team_json(team, &body)
    }
}

/// Reads `norm_epa.current`. A missing field is `Ok(None)`; a non-JSON body is malformed.
pub fn parse_statbotics_team_json(team: TeamNumber, raw: &str) -> Result<Option<f64>, RatingError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(None);
    }
    let root: Value = serde_json::from_str(trimmed).map_err(|err| RatingError::Malformed {
        team,
        reason: err.to_string(),
    })?;
    Ok(root
        .get("norm_epa")
        .and_then(|v| v.get("current"))
        .and_then(Value::as_f64))
}
