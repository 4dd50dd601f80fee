use std::cmp::Ordering;
use std::collections::VecDeque;
use std::time::Instant;

use crate::metrics::EventRatings;
use crate::model::{EventSummary, TeamRatingRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Events,
    Table,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Row,
    Team,
    Opr,
    AutoOpr,
    TeleopOpr,
    Epa,
}

impl SortColumn {
    pub const ALL: [SortColumn; 6] = [
        SortColumn::Row,
        SortColumn::Team,
        SortColumn::Opr,
        SortColumn::AutoOpr,
        SortColumn::TeleopOpr,
        SortColumn::Epa,
    ];

    pub fn from_name(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "row" | "#" => Some(Self::Row),
            "team" => Some(Self::Team),
            "opr" => Some(Self::Opr),
            "auto" => Some(Self::AutoOpr),
            "teleop" => Some(Self::TeleopOpr),
            "epa" => Some(Self::Epa),
            _ => None,
        }
    }

    /// Metric columns read best highest-first; identifiers lowest-first.
    pub fn default_descending(self) -> bool {
        !matches!(self, SortColumn::Row | SortColumn::Team)
    }

    fn key(self, row: &TeamRatingRow) -> f64 {
        match self {
            SortColumn::Row => row.row as f64,
            SortColumn::Team => f64::from(row.team),
            SortColumn::Opr => row.opr,
            SortColumn::AutoOpr => row.auto_opr,
            SortColumn::TeleopOpr => row.teleop_opr,
            SortColumn::Epa => row.epa,
        }
    }
}

/// Stable sort by `column`, ties broken by roster order.
pub fn sort_rows(rows: &mut [TeamRatingRow], column: SortColumn, descending: bool) {
    rows.sort_by(|a, b| {
        let ord = column
            .key(a)
            .partial_cmp(&column.key(b))
            .unwrap_or(Ordering::Equal);
        let ord = if descending { ord.reverse() } else { ord };
        ord.then(a.row.cmp(&b.row))
    });
}

#[derive(Debug, Clone, Default)]
pub struct ExportState {
    pub active: bool,
    pub done: bool,
    pub path: Option<String>,
    pub message: String,
    pub last_updated: Option<Instant>,
}

impl ExportState {
    pub fn clear_if_done_for(&mut self, now: Instant, keep_secs: u64) {
        if !self.active || !self.done {
            return;
        }
        let Some(last) = self.last_updated else {
            return;
        };
        if now.duration_since(last).as_secs() >= keep_secs {
            *self = Self::default();
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub season: i32,
    pub source_label: String,
    pub focus: Focus,
    pub events: Vec<EventSummary>,
    pub events_loading: bool,
    pub event_selected: usize,
    pub event_search: String,
    pub event_search_active: bool,
    pub ratings: Option<EventRatings>,
    pub ratings_pending: Option<String>,
    pub ratings_error: Option<String>,
    pub sort: SortColumn,
    pub sort_desc: bool,
    pub table_selected: usize,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
    pub export: ExportState,
}

impl AppState {
    pub fn new(season: i32, source_label: impl Into<String>) -> Self {
        Self {
            season,
            source_label: source_label.into(),
            focus: Focus::Events,
            events: Vec::new(),
            events_loading: false,
            event_selected: 0,
            event_search: String::new(),
            event_search_active: false,
            ratings: None,
            ratings_pending: None,
            ratings_error: None,
            sort: SortColumn::Row,
            sort_desc: false,
            table_selected: 0,
            logs: VecDeque::new(),
            help_overlay: false,
            export: ExportState::default(),
        }
    }

    pub fn maybe_clear_export(&mut self, now: Instant) {
        self.export.clear_if_done_for(now, 8);
    }

    pub fn filtered_events(&self) -> Vec<&EventSummary> {
        let needle = self.event_search.trim().to_lowercase();
        self.events
            .iter()
            .filter(|e| {
                needle.is_empty()
                    || e.name.to_lowercase().contains(&needle)
                    || e.key.to_lowercase().contains(&needle)
            })
            .collect()
    }

    pub fn selected_event(&self) -> Option<&EventSummary> {
        self.filtered_events().get(self.event_selected).copied()
    }

    pub fn selected_event_key(&self) -> Option<String> {
        self.selected_event().map(|e| e.key.clone())
    }

    /// Rows in display order for the current sort.
    pub fn sorted_rows(&self) -> Vec<TeamRatingRow> {
        let Some(ratings) = &self.ratings else {
            return Vec::new();
        };
        let mut rows = ratings.rows.clone();
        sort_rows(&mut rows, self.sort, self.sort_desc);
        rows
    }

    pub fn cycle_sort(&mut self) {
        let pos = SortColumn::ALL
            .iter()
            .position(|c| *c == self.sort)
            .unwrap_or(0);
        self.sort = SortColumn::ALL[(pos + 1) % SortColumn::ALL.len()];
        self.sort_desc = self.sort.default_descending();
        self.table_selected = 0;
    }

    pub fn toggle_sort_direction(&mut self) {
        self.sort_desc = !self.sort_desc;
        self.table_selected = 0;
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Events => Focus::Table,
            Focus::Table => Focus::Events,
        };
    }

    pub fn select_next(&mut self) {
        let total = self.focused_len();
        let selected = self.focused_selection_mut();
        *selected = if total == 0 { 0 } else { (*selected + 1) % total };
    }

    pub fn select_prev(&mut self) {
        let total = self.focused_len();
        let selected = self.focused_selection_mut();
        *selected = if total == 0 {
            0
        } else if *selected == 0 {
            total - 1
        } else {
            *selected - 1
        };
    }

    pub fn clamp_selection(&mut self) {
        let events = self.filtered_events().len();
        self.event_selected = self.event_selected.min(events.saturating_sub(1));
        let rows = self.ratings.as_ref().map(|r| r.rows.len()).unwrap_or(0);
        self.table_selected = self.table_selected.min(rows.saturating_sub(1));
    }

    pub fn push_search_char(&mut self, c: char) {
        self.event_search.push(c);
        self.event_selected = 0;
    }

    pub fn pop_search_char(&mut self) {
        self.event_search.pop();
        self.event_selected = 0;
    }

    pub fn clear_search(&mut self) {
        self.event_search.clear();
        self.event_search_active = false;
        self.event_selected = 0;
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        const MAX_LOGS: usize = 200;
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    fn focused_len(&self) -> usize {
        match self.focus {
            Focus::Events => self.filtered_events().len(),
            Focus::Table => self.ratings.as_ref().map(|r| r.rows.len()).unwrap_or(0),
        }
    }

    fn focused_selection_mut(&mut self) -> &mut usize {
        match self.focus {
            Focus::Events => &mut self.event_selected,
            Focus::Table => &mut self.table_selected,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Delta {
    EventsStarted,
    SetEvents(Vec<EventSummary>),
    EventsFailed(String),
    RatingsStarted { event_key: String },
    SetRatings(EventRatings),
    RatingsFailed { event_key: String, error: String },
    ExportFinished { path: String, rows: usize },
    ExportFailed { path: String, error: String },
    Log(String),
}

#[derive(Debug, Clone)]
pub enum ProviderCommand {
    FetchEvents,
    FetchRatings {
        event_key: String,
    },
    ExportRatings {
        path: String,
        ratings: EventRatings,
        rows: Vec<TeamRatingRow>,
    },
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::EventsStarted => state.events_loading = true,
        Delta::SetEvents(events) => {
            let selected_key = state.selected_event_key();
            state.events_loading = false;
            state.push_log(format!("[INFO] {} started events loaded", events.len()));
            state.events = events;
            state.event_selected = selected_key
                .and_then(|key| state.filtered_events().iter().position(|e| e.key == key))
                .unwrap_or(0);
        }
        Delta::EventsFailed(error) => {
            state.events_loading = false;
            state.push_log(format!("[ERROR] Event list failed: {error}"));
        }
        Delta::RatingsStarted { event_key } => {
            state.ratings_pending = Some(event_key);
            state.ratings_error = None;
        }
        Delta::SetRatings(ratings) => {
            if state.ratings_pending.as_deref() != Some(ratings.event_key.as_str()) {
                state.push_log(format!(
                    "[INFO] Ignored stale ratings for {}",
                    ratings.event_key
                ));
                return;
            }
            state.ratings_pending = None;
            state.ratings_error = None;
            for warning in &ratings.warnings {
                state.push_log(format!("[WARN] {}: {warning}", ratings.event_key));
            }
            state.push_log(format!(
                "[INFO] {}: {} teams, {} matches used",
                ratings.event_key,
                ratings.rows.len(),
                ratings.stats.matches_used
            ));
            state.ratings = Some(ratings);
            state.table_selected = 0;
        }
        Delta::RatingsFailed { event_key, error } => {
            if state.ratings_pending.as_deref() == Some(event_key.as_str()) {
                state.ratings_pending = None;
                // The previous event's table must not outlive a failed request.
                state.ratings = None;
                state.ratings_error = Some(error.clone());
            }
            state.push_log(format!("[ERROR] {event_key}: {error}"));
        }
        Delta::ExportFinished { path, rows } => {
            let message = format!("Exported {rows} rows to {path}");
            state.push_log(format!("[INFO] {message}"));
            state.export = ExportState {
                active: true,
                done: true,
                message,
                path: Some(path),
                last_updated: Some(Instant::now()),
            };
        }
        Delta::ExportFailed { path, error } => {
            state.export = ExportState {
                active: true,
                done: true,
                message: format!("Export failed: {error}"),
                path: Some(path),
                last_updated: Some(Instant::now()),
            };
            state.push_log(format!("[ERROR] Export failed: {error}"));
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}
