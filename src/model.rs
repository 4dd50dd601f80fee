use serde::{Deserialize, Serialize};

pub type TeamNumber = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    pub key: String,
    pub name: String,
    /// `YYYY-MM-DD` as published by the provider.
    pub start_date: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub team_number: TeamNumber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompLevel {
    Qualification,
    Other,
}

impl CompLevel {
    pub fn from_code(code: &str) -> Self {
        if code.trim().eq_ignore_ascii_case("qm") {
            CompLevel::Qualification
        } else {
            CompLevel::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alliance {
    /// Raw provider keys, e.g. `frc254`.
    pub team_keys: Vec<String>,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AllianceBreakdown {
    pub auto_count: Option<f64>,
    pub teleop_count: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub red: AllianceBreakdown,
    pub blue: AllianceBreakdown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub key: String,
    pub comp_level: CompLevel,
    pub red: Alliance,
    pub blue: Alliance,
    /// `None` until the match has been played and scored.
    pub breakdown: Option<ScoreBreakdown>,
}

/// Teams and matches for one event, fetched once and never mutated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventSnapshot {
    pub teams: Vec<Team>,
    pub matches: Vec<Match>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RatingRecord {
    pub opr: f64,
    pub auto_opr: f64,
    pub teleop_opr: f64,
    pub epa: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeamRatingRow {
    /// 1-based position in roster order.
    pub row: usize,
    pub team: TeamNumber,
    pub opr: f64,
    pub auto_opr: f64,
    pub teleop_opr: f64,
    pub epa: f64,
}

impl TeamRatingRow {
    pub fn record(&self) -> RatingRecord {
        RatingRecord {
            opr: self.opr,
            auto_opr: self.auto_opr,
            teleop_opr: self.teleop_opr,
            epa: self.epa,
        }
    }
}

/// Parses `frc254` (or a bare `254`) into a team number.
/// Suffixed keys such as `frc254B` are not roster teams and yield `None`.
pub fn team_number_from_key(key: &str) -> Option<TeamNumber> {
    let trimmed = key.trim();
    let digits = trimmed
        .strip_prefix("frc")
        .or_else(|| trimmed.strip_prefix("FRC"))
        .unwrap_or(trimmed);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<TeamNumber>().ok().filter(|n| *n > 0)
}

pub fn team_key(team: TeamNumber) -> String {
    format!("frc{team}")
}

/// Rounds half away from zero and folds `-0.0` into `0.0`.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let factor = 10f64.powi(decimals);
    let rounded = (value * factor).round() / factor;
    if rounded == 0.0 { 0.0 } else { rounded }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn team_keys_parse() {
        assert_eq!(team_number_from_key("frc254"), Some(254));
        assert_eq!(team_number_from_key("1678"), Some(1678));
        assert_eq!(team_number_from_key("frc254B"), None);
        assert_eq!(team_number_from_key("frc"), None);
        assert_eq!(team_number_from_key("frc0"), None);
    }

    #[test]
    fn rounding_drops_negative_zero() {
        assert_eq!(round_to(-0.0001, 2).to_bits(), 0.0f64.to_bits());
        assert_eq!(round_to(12.345_6, 2), 12.35);
        assert_eq!(round_to(1650.26, 1), 1650.3);
        assert_eq!(round_to(f64::NAN, 2), 0.0);
    }
}
