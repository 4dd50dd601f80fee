use std::env;
use std::path::PathBuf;

use chrono::{Datelike, Local, NaiveDate};

use crate::http_client::DEFAULT_TIMEOUT_SECS;
use crate::opr::UnknownTeamPolicy;
use crate::statbotics_fetch::STATBOTICS_BASE_URL;
use crate::tba_fetch::{BreakdownFields, TBA_BASE_URL};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Tba,
    Demo,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_source: DataSource,
    pub tba_api_key: Option<String>,
    pub tba_base_url: String,
    pub statbotics_base_url: String,
    pub season: i32,
    pub today: NaiveDate,
    pub http_timeout_secs: u64,
    pub fetch_parallelism: usize,
    pub breakdown_fields: BreakdownFields,
    pub unknown_team_policy: UnknownTeamPolicy,
    pub export_dir: PathBuf,
}

impl AppConfig {
    /// Reads the process environment. Call after `dotenvy` has loaded any `.env` files.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let today = get("EVENTS_AS_OF")
            .and_then(|raw| NaiveDate::parse_from_str(&raw, "%Y-%m-%d").ok())
            .unwrap_or_else(|| Local::now().date_naive());
        let season = get("FRC_SEASON")
            .and_then(|raw| raw.parse::<i32>().ok())
            .unwrap_or_else(|| today.year());
        let data_source = match get("DATA_SOURCE").map(|v| v.to_ascii_lowercase()).as_deref() {
            Some("demo") => DataSource::Demo,
            _ => DataSource::Tba,
        };
        let defaults = BreakdownFields::default();

        Self {
            data_source,
            tba_api_key: get("TBA_API_KEY"),
            tba_base_url: get("TBA_BASE_URL").unwrap_or_else(|| TBA_BASE_URL.to_string()),
            statbotics_base_url: get("STATBOTICS_BASE_URL")
                .unwrap_or_else(|| STATBOTICS_BASE_URL.to_string()),
            season,
            today,
            http_timeout_secs: get("HTTP_TIMEOUT_SECS")
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS)
                .clamp(1, 120),
            fetch_parallelism: get("FETCH_PARALLELISM")
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(8)
                .clamp(1, 32),
            breakdown_fields: BreakdownFields {
                auto_count: get("AUTO_COUNT_FIELD").unwrap_or(defaults.auto_count),
                teleop_count: get("TELEOP_COUNT_FIELD").unwrap_or(defaults.teleop_count),
            },
            unknown_team_policy: get("UNKNOWN_TEAM_POLICY")
                .and_then(|v| UnknownTeamPolicy::from_name(&v))
                .unwrap_or_default(),
            export_dir: get("EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}

pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}
