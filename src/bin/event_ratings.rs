use anyhow::{Context, Result, anyhow};

use frc_scout::config::{self, AppConfig};
use frc_scout::ratings_export::{HEADERS, default_export_path, export_ratings};
use frc_scout::state::{SortColumn, sort_rows};

fn main() -> Result<()> {
    config::load_dotenv();
    let cfg = AppConfig::from_env();
    let engine = frc_scout::build_engine(&cfg);

    if has_flag("--list-events") {
        let events = engine.started_events(cfg.season, cfg.today)?;
        for event in events {
            println!("{:<14} {}  {}", event.key, event.start_date, event.name);
        }
        return Ok(());
    }

    let event_key = parse_str_arg("--event")
        .ok_or_else(|| anyhow!("usage: event_ratings --event <key> [--sort <col>] [--asc|--desc] [--json] [--xlsx]\n       event_ratings --list-events"))?;
    let sort = match parse_str_arg("--sort") {
        Some(raw) => SortColumn::from_name(&raw).ok_or_else(|| anyhow!("unknown sort column: {raw}"))?,
        None => SortColumn::Row,
    };
    let descending = if has_flag("--asc") {
        false
    } else if has_flag("--desc") {
        true
    } else {
        sort.default_descending()
    };

    let ratings = engine
        .compute_ratings(&event_key)
        .with_context(|| format!("computing ratings for {event_key}"))?;
    for warning in &ratings.warnings {
        eprintln!("[WARN] {warning}");
    }

    let mut rows = ratings.rows.clone();
    sort_rows(&mut rows, sort, descending);

    if has_flag("--xlsx") {
        let path = default_export_path(&cfg.export_dir, &event_key);
        let written = export_ratings(&path, &ratings, &rows)?;
        eprintln!("[INFO] wrote {written} rows to {}", path.display());
    }

    if has_flag("--json") {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!(
        "{event_key}: {} teams, {} quals used, {} unplayed, {} rejected (policy: {})",
        rows.len(),
        ratings.stats.matches_used,
        ratings.stats.unplayed,
        ratings.stats.rejected,
        engine.policy().label()
    );
    println!(
        "{:>4} {:>6} {:>9} {:>9} {:>9} {:>8}",
        HEADERS[0], HEADERS[1], HEADERS[2], HEADERS[3], HEADERS[4], HEADERS[5]
    );
    for r in &rows {
        println!(
            "{:>4} {:>6} {:>9.2} {:>9.2} {:>9.2} {:>8.1}",
            r.row, r.team, r.opr, r.auto_opr, r.teleop_opr, r.epa
        );
    }
    Ok(())
}

fn has_flag(name: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == name)
}

fn parse_str_arg(name: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}="))
            && !raw.trim().is_empty()
        {
            return Some(raw.trim().to_string());
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}
