use std::collections::HashMap;

use anyhow::{Result, anyhow};
use nalgebra::DMatrix;
use serde::Serialize;

use crate::model::{
    CompLevel, EventSnapshot, Match, Team, TeamNumber, TeamRatingRow, round_to,
    team_number_from_key,
};

pub const CONTRIBUTION_DECIMALS: i32 = 2;
pub const EPA_DECIMALS: i32 = 1;

/// Dense team number -> column mapping, valid for one computation only.
#[derive(Debug, Clone, Default)]
pub struct RosterIndex {
    teams: Vec<TeamNumber>,
    positions: HashMap<TeamNumber, usize>,
}

impl RosterIndex {
    pub fn build(roster: &[Team]) -> Self {
        let mut teams = Vec::with_capacity(roster.len());
        let mut positions = HashMap::with_capacity(roster.len());
        for team in roster {
            if positions.contains_key(&team.team_number) {
                continue;
            }
            positions.insert(team.team_number, teams.len());
            teams.push(team.team_number);
        }
        Self { teams, positions }
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    pub fn index_of(&self, team: TeamNumber) -> Option<usize> {
        self.positions.get(&team).copied()
    }

    pub fn index_of_key(&self, key: &str) -> Option<usize> {
        team_number_from_key(key).and_then(|team| self.index_of(team))
    }

    pub fn teams(&self) -> &[TeamNumber] {
        &self.teams
    }
}

/// What to do with an alliance slot whose team is not on the event roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownTeamPolicy {
    /// Keep the match; the slot adds no 1-entry to its row.
    #[default]
    DropContribution,
    /// Skip the whole match (both alliance rows).
    RejectMatch,
}

impl UnknownTeamPolicy {
    pub fn from_name(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "drop" | "drop_contribution" => Some(Self::DropContribution),
            "reject" | "reject_match" => Some(Self::RejectMatch),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::DropContribution => "drop",
            Self::RejectMatch => "reject",
        }
    }

    /// Column indices to set for one alliance, or `None` when the match must be rejected.
    pub fn resolve(self, index: &RosterIndex, team_keys: &[String]) -> Option<Vec<usize>> {
        let mut columns = Vec::with_capacity(team_keys.len());
        for key in team_keys {
            match index.index_of_key(key) {
                Some(col) => columns.push(col),
                None if self == Self::RejectMatch => return None,
                None => {}
            }
        }
        Some(columns)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DesignStats {
    pub matches_used: usize,
    pub unplayed: usize,
    pub non_qualification: usize,
    pub rejected: usize,
    pub dropped_slots: usize,
}

/// Indicator rows (red then blue per match) and their three aligned targets.
#[derive(Debug, Clone, Default)]
pub struct DesignSystem {
    pub num_teams: usize,
    pub rows: Vec<Vec<f64>>,
    pub total: Vec<f64>,
    pub auto: Vec<f64>,
    pub teleop: Vec<f64>,
    pub stats: DesignStats,
}

impl DesignSystem {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

pub fn build_design(
    index: &RosterIndex,
    matches: &[Match],
    policy: UnknownTeamPolicy,
) -> DesignSystem {
    let num_teams = index.len();
    let mut system = DesignSystem {
        num_teams,
        ..DesignSystem::default()
    };

    for m in matches {
        if m.comp_level != CompLevel::Qualification {
            system.stats.non_qualification += 1;
            continue;
        }
        let Some(breakdown) = m.breakdown else {
            system.stats.unplayed += 1;
            continue;
        };

        let (Some(red_cols), Some(blue_cols)) = (
            policy.resolve(index, &m.red.team_keys),
            policy.resolve(index, &m.blue.team_keys),
        ) else {
            system.stats.rejected += 1;
            continue;
        };
        system.stats.dropped_slots += (m.red.team_keys.len() - red_cols.len())
            + (m.blue.team_keys.len() - blue_cols.len());

        system.rows.push(indicator_row(num_teams, &red_cols));
        system.rows.push(indicator_row(num_teams, &blue_cols));
        system.total.extend([m.red.score, m.blue.score]);
        system.auto.extend([
            breakdown.red.auto_count.unwrap_or(0.0),
            breakdown.blue.auto_count.unwrap_or(0.0),
        ]);
        system.teleop.extend([
            breakdown.red.teleop_count.unwrap_or(0.0),
            breakdown.blue.teleop_count.unwrap_or(0.0),
        ]);
        system.stats.matches_used += 1;
    }

    system
}

fn indicator_row(num_teams: usize, columns: &[usize]) -> Vec<f64> {
    let mut row = vec![0.0; num_teams];
    for &col in columns {
        row[col] = 1.0;
    }
    row
}

/// Minimum-norm least-squares solutions of `rows * x = target` for each target.
///
/// The matrix is factored once (SVD) and every target is solved against the same
/// factorization. Singular values below `eps * max(m, n) * sigma_max` are treated
/// as zero, so rank-deficient and under-determined systems are fine.
pub fn solve_least_squares(
    rows: &[Vec<f64>],
    num_teams: usize,
    targets: &[&[f64]],
) -> Result<Vec<Vec<f64>>> {
    if rows.is_empty() || num_teams == 0 {
        return Ok(vec![vec![0.0; num_teams]; targets.len()]);
    }
    if let Some(bad) = rows.iter().find(|row| row.len() != num_teams) {
        return Err(anyhow!(
            "design row has {} columns, expected {num_teams}",
            bad.len()
        ));
    }
    if let Some(bad) = targets.iter().find(|t| t.len() != rows.len()) {
        return Err(anyhow!(
            "target has {} entries, expected {}",
            bad.len(),
            rows.len()
        ));
    }
    if targets.is_empty() {
        return Ok(Vec::new());
    }

    let m = rows.len();
    let flat: Vec<f64> = rows.iter().flat_map(|row| row.iter().copied()).collect();
    let a = DMatrix::from_row_slice(m, num_teams, &flat);
    // Column-major: each target becomes one column.
    let stacked: Vec<f64> = targets.iter().flat_map(|t| t.iter().copied()).collect();
    let b = DMatrix::from_column_slice(m, targets.len(), &stacked);

    let svd = a.svd(true, true);
    let sigma_max = svd.singular_values.iter().copied().fold(0.0_f64, f64::max);
    let eps = f64::EPSILON * m.max(num_teams) as f64 * sigma_max;
    let x = svd
        .solve(&b, eps)
        .map_err(|err| anyhow!("least-squares solve failed: {err}"))?;

    Ok((0..targets.len())
        .map(|col| x.column(col).iter().copied().collect())
        .collect())
}

#[derive(Debug, Clone, Default)]
pub struct EventOpr {
    pub teams: Vec<TeamNumber>,
    pub opr: Vec<f64>,
    pub auto_opr: Vec<f64>,
    pub teleop_opr: Vec<f64>,
    pub stats: DesignStats,
}

/// Raw (unrounded) contribution ratings for every roster team. No I/O.
pub fn compute_event_opr(snapshot: &EventSnapshot, policy: UnknownTeamPolicy) -> Result<EventOpr> {
    let index = RosterIndex::build(&snapshot.teams);
    if index.is_empty() {
        return Ok(EventOpr::default());
    }

    let system = build_design(&index, &snapshot.matches, policy);
    let mut solved = solve_least_squares(
        &system.rows,
        system.num_teams,
        &[&system.total, &system.auto, &system.teleop],
    )?
    .into_iter();
    let (Some(opr), Some(auto_opr), Some(teleop_opr)) =
        (solved.next(), solved.next(), solved.next())
    else {
        return Err(anyhow!("solver returned fewer than three solutions"));
    };

    Ok(EventOpr {
        teams: index.teams().to_vec(),
        opr,
        auto_opr,
        teleop_opr,
        stats: system.stats,
    })
}

/// One rounded row per roster team, in roster order. Missing EPA is 0.
pub fn assemble_rows(opr: &EventOpr, epa: &HashMap<TeamNumber, f64>) -> Vec<TeamRatingRow> {
    opr.teams
        .iter()
        .enumerate()
        .map(|(idx, &team)| TeamRatingRow {
            row: idx + 1,
            team,
            opr: round_to(value_at(&opr.opr, idx), CONTRIBUTION_DECIMALS),
            auto_opr: round_to(value_at(&opr.auto_opr, idx), CONTRIBUTION_DECIMALS),
            teleop_opr: round_to(value_at(&opr.teleop_opr, idx), CONTRIBUTION_DECIMALS),
            epa: round_to(epa.get(&team).copied().unwrap_or(0.0), EPA_DECIMALS),
        })
        .collect()
}

fn value_at(values: &[f64], idx: usize) -> f64 {
    values.get(idx).copied().unwrap_or(0.0)
}
