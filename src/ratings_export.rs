use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::metrics::EventRatings;
use crate::model::TeamRatingRow;

pub const HEADERS: [&str; 6] = ["#", "Team", "OPR", "Auto", "Teleop", "EPA"];

pub fn default_export_path(dir: &Path, event_key: &str) -> PathBuf {
    let safe: String = event_key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    dir.join(format!("{safe}_ratings.xlsx"))
}

/// Writes the rows in the order given, plus a summary sheet. Returns the row count.
pub fn export_ratings(path: &Path, ratings: &EventRatings, rows: &[TeamRatingRow]) -> Result<usize> {
    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Ratings")?;
        write_header(sheet)?;
        for (idx, row) in rows.iter().enumerate() {
            write_rating_row(sheet, idx as u32 + 1, row)?;
        }
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Summary")?;
        let summary = [
            ("Event", ratings.event_key.clone()),
            ("Teams", ratings.rows.len().to_string()),
            ("Matches used", ratings.stats.matches_used.to_string()),
            ("Unplayed", ratings.stats.unplayed.to_string()),
            ("Rejected", ratings.stats.rejected.to_string()),
        ];
        for (idx, (label, value)) in summary.iter().enumerate() {
            sheet
                .write_string(idx as u32, 0, *label)
                .with_context(|| format!("write summary label {idx}"))?;
            sheet
                .write_string(idx as u32, 1, value.as_str())
                .with_context(|| format!("write summary value {idx}"))?;
        }
        let base = summary.len() as u32 + 1;
        for (idx, warning) in ratings.warnings.iter().enumerate() {
            sheet
                .write_string(base + idx as u32, 0, warning.as_str())
                .with_context(|| format!("write warning {idx}"))?;
        }
    }

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed creating {}", dir.display()))?;
    }
    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;
    Ok(rows.len())
}

fn write_header(sheet: &mut Worksheet) -> Result<()> {
    for (col, title) in HEADERS.iter().enumerate() {
        sheet
            .write_string(0, col as u16, *title)
            .with_context(|| format!("write header {col}"))?;
    }
    Ok(())
}

fn write_rating_row(sheet: &mut Worksheet, row_idx: u32, row: &TeamRatingRow) -> Result<()> {
    let values = [
        row.row as f64,
        f64::from(row.team),
        row.opr,
        row.auto_opr,
        row.teleop_opr,
        row.epa,
    ];
    for (col, value) in values.iter().enumerate() {
        sheet
            .write_number(row_idx, col as u16, *value)
            .with_context(|| format!("write cell ({row_idx},{col})"))?;
    }
    Ok(())
}
