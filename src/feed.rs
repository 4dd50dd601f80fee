use std::path::Path;
use std::sync::mpsc::{Receiver, Sender};
use std::thread;

use chrono::NaiveDate;

use crate::metrics::MetricsEngine;
use crate::ratings_export;
use crate::state::{Delta, ProviderCommand};

/// Runs commands one at a time on a worker thread and reports back as deltas.
pub fn spawn_provider(
    engine: MetricsEngine,
    season: i32,
    today: NaiveDate,
    tx: Sender<Delta>,
    cmd_rx: Receiver<ProviderCommand>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while let Ok(cmd) = cmd_rx.recv() {
            handle_command(&engine, season, today, &tx, cmd);
        }
    })
}

pub fn handle_command(
    engine: &MetricsEngine,
    season: i32,
    today: NaiveDate,
    tx: &Sender<Delta>,
    cmd: ProviderCommand,
) {
    match cmd {
        ProviderCommand::FetchEvents => {
            let _ = tx.send(Delta::EventsStarted);
            match engine.started_events(season, today) {
                Ok(events) => {
                    let _ = tx.send(Delta::SetEvents(events));
                }
                Err(err) => {
                    let _ = tx.send(Delta::EventsFailed(format!("{err:#}")));
                }
            }
        }
        ProviderCommand::FetchRatings { event_key } => {
            let cached = engine.cache().get(&event_key).is_some();
            let _ = tx.send(Delta::Log(format!(
                "[INFO] Computing ratings for {event_key}{}",
                if cached { " (cached)" } else { "" }
            )));
            match engine.compute_ratings(&event_key) {
                Ok(ratings) => {
                    let _ = tx.send(Delta::SetRatings(ratings));
                }
                Err(err) => {
                    let _ = tx.send(Delta::RatingsFailed {
                        event_key,
                        error: format!("{err:#}"),
                    });
                }
            }
        }
        ProviderCommand::ExportRatings {
            path,
            ratings,
            rows,
        } => match ratings_export::export_ratings(Path::new(&path), &ratings, &rows) {
            Ok(rows) => {
                let _ = tx.send(Delta::ExportFinished { path, rows });
            }
            Err(err) => {
                let _ = tx.send(Delta::ExportFailed {
                    path,
                    error: format!("{err:#}"),
                });
            }
        },
    }
}
