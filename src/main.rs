use std::io;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use frc_scout::config::{self, AppConfig};
use frc_scout::feed;
use frc_scout::ratings_export::default_export_path;
use frc_scout::state::{AppState, Delta, Focus, ProviderCommand, SortColumn, apply_delta};

struct App {
    state: AppState,
    should_quit: bool,
    cmd_tx: Option<mpsc::Sender<ProviderCommand>>,
    export_dir: PathBuf,
}

impl App {
    fn new(cfg: &AppConfig, cmd_tx: Option<mpsc::Sender<ProviderCommand>>) -> Self {
        Self {
            state: AppState::new(cfg.season, frc_scout::source_label(cfg)),
            should_quit: false,
            cmd_tx,
            export_dir: cfg.export_dir.clone(),
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if self.state.event_search_active {
            match key.code {
                KeyCode::Esc => self.state.clear_search(),
                KeyCode::Enter => {
                    self.state.event_search_active = false;
                    self.request_ratings();
                }
                KeyCode::Backspace => self.state.pop_search_char(),
                KeyCode::Down => self.state.select_next(),
                KeyCode::Up => self.state.select_prev(),
                KeyCode::Char(c) => self.state.push_search_char(c),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            KeyCode::Esc => self.state.help_overlay = false,
            KeyCode::Tab => self.state.toggle_focus(),
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Char('/') => {
                self.state.focus = Focus::Events;
                self.state.event_search_active = true;
            }
            KeyCode::Enter | KeyCode::Char('f') => self.request_ratings(),
            KeyCode::Char('s') => self.state.cycle_sort(),
            KeyCode::Char('r') => self.state.toggle_sort_direction(),
            KeyCode::Char('l') => self.request_events(true),
            KeyCode::Char('e') => self.request_export(),
            _ => {}
        }
    }

    fn send(&mut self, cmd: ProviderCommand, what: &str) -> bool {
        let Some(tx) = &self.cmd_tx else {
            self.state.push_log(format!("[INFO] {what} unavailable"));
            return false;
        };
        if tx.send(cmd).is_err() {
            self.state.push_log(format!("[WARN] {what} request failed"));
            return false;
        }
        true
    }

    fn request_events(&mut self, announce: bool) {
        if self.send(ProviderCommand::FetchEvents, "Event list") && announce {
            self.state.push_log("[INFO] Event list request sent");
        }
    }

    fn request_ratings(&mut self) {
        let Some(event_key) = self.state.selected_event_key() else {
            self.state.push_log("[INFO] No event selected");
            return;
        };
        if self.state.ratings_pending.as_deref() == Some(event_key.as_str()) {
            return;
        }
        if self.send(
            ProviderCommand::FetchRatings {
                event_key: event_key.clone(),
            },
            "Ratings",
        ) {
            apply_delta(&mut self.state, Delta::RatingsStarted { event_key });
        }
    }

    fn request_export(&mut self) {
        let Some(ratings) = self.state.ratings.clone() else {
            self.state.push_log("[INFO] Nothing to export yet");
            return;
        };
        let path = default_export_path(&self.export_dir, &ratings.event_key)
            .display()
            .to_string();
        let rows = self.state.sorted_rows();
        if self.send(ProviderCommand::ExportRatings { path, ratings, rows }, "Export") {
            self.state.push_log("[INFO] Export request sent");
        }
    }
}

fn main() -> io::Result<()> {
    config::load_dotenv();
    let cfg = AppConfig::from_env();
    let engine = frc_scout::build_engine(&cfg);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    feed::spawn_provider(engine, cfg.season, cfg.today, tx, cmd_rx);

    let mut app = App::new(&cfg, Some(cmd_tx));
    if cfg.tba_api_key.is_none() && cfg.data_source == config::DataSource::Tba {
        app.state
            .push_log("[WARN] TBA_API_KEY is not set; set it or run with DATA_SOURCE=demo");
    }
    app.request_events(false);
    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }
        app.state.clamp_selection();
        app.state.maybe_clear_export(Instant::now());

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(5),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(&app.state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(38), Constraint::Min(30)])
        .split(chunks[1]);
    render_events(frame, body[0], &app.state);
    render_ratings(frame, body[1], &app.state);

    let console = Paragraph::new(console_text(&app.state))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, chunks[2]);

    let footer = Paragraph::new(footer_text(&app.state));
    frame.render_widget(footer, chunks[3]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let event = state
        .ratings
        .as_ref()
        .map(|r| r.event_key.clone())
        .unwrap_or_else(|| "-".to_string());
    let direction = if state.sort_desc { "desc" } else { "asc" };
    let line1 = format!(
        "FRC SCOUT | {} {} | Event: {event} | Sort: {} {direction}",
        state.season,
        state.source_label,
        sort_label(state.sort)
    );
    let line2 = match (&state.ratings_pending, &state.ratings) {
        (Some(key), _) => format!("Loading {key}..."),
        (None, Some(r)) => format!(
            "{} teams | {} quals used | {} unplayed | {} rejected",
            r.rows.len(),
            r.stats.matches_used,
            r.stats.unplayed,
            r.stats.rejected
        ),
        (None, None) => match &state.ratings_error {
            Some(err) => format!("Error: {err}"),
            None => "Pick an event and press Enter".to_string(),
        },
    };
    let line3 = if state.export.active {
        state.export.message.clone()
    } else {
        String::new()
    };
    format!("{line1}\n{line2}\n{line3}")
}

fn footer_text(state: &AppState) -> String {
    if state.event_search_active {
        return "Type to filter | Enter Fetch | Backspace Delete | Esc Cancel".to_string();
    }
    "Tab Focus | j/k Move | Enter/f Fetch | / Search | s Sort | r Reverse | e Export | l Reload | ? Help | q Quit"
        .to_string()
}

fn render_events(frame: &mut Frame, area: Rect, state: &AppState) {
    let focused = state.focus == Focus::Events;
    let title = if state.events_loading {
        "Events (loading)".to_string()
    } else {
        format!("Events ({})", state.filtered_events().len())
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(focus_style(focused));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.height == 0 {
        return;
    }

    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(inner);

    let search = if state.event_search_active {
        format!("/{}_", state.event_search)
    } else if state.event_search.is_empty() {
        "/ to search".to_string()
    } else {
        format!("/{}", state.event_search)
    };
    frame.render_widget(
        Paragraph::new(search).style(Style::default().fg(Color::DarkGray)),
        sections[0],
    );

    let list_area = sections[1];
    let events = state.filtered_events();
    if events.is_empty() {
        let empty = Paragraph::new("No started events")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, list_area);
        return;
    }

    let visible = list_area.height as usize;
    let (start, end) = visible_range(state.event_selected, events.len(), visible);
    for (i, idx) in (start..end).enumerate() {
        let row_area = Rect {
            x: list_area.x,
            y: list_area.y + i as u16,
            width: list_area.width,
            height: 1,
        };
        let selected = idx == state.event_selected;
        let style = if selected && focused {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        } else if selected {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let event = events[idx];
        let text = format!("{} {}", event.start_date.get(5..).unwrap_or(""), event.name);
        frame.render_widget(Paragraph::new(text).style(style), row_area);
    }
}

fn render_ratings(frame: &mut Frame, area: Rect, state: &AppState) {
    let focused = state.focus == Focus::Table;
    let block = Block::default()
        .title("Ratings")
        .borders(Borders::ALL)
        .border_style(focus_style(focused));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.height < 2 {
        return;
    }

    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(inner);
    let widths = rating_columns();
    render_ratings_header(frame, sections[0], &widths, state);

    let list_area = sections[1];
    let rows = state.sorted_rows();
    if rows.is_empty() {
        let msg = if state.ratings_pending.is_some() {
            "Computing..."
        } else if state.ratings_error.is_some() {
            "Fetch failed; see console"
        } else if state.ratings.is_some() {
            "No teams at this event"
        } else {
            "No event loaded"
        };
        frame.render_widget(
            Paragraph::new(msg).style(Style::default().fg(Color::DarkGray)),
            list_area,
        );
        return;
    }

    let visible = list_area.height as usize;
    let (start, end) = visible_range(state.table_selected, rows.len(), visible);
    for (i, idx) in (start..end).enumerate() {
        let row_area = Rect {
            x: list_area.x,
            y: list_area.y + i as u16,
            width: list_area.width,
            height: 1,
        };
        let selected = focused && idx == state.table_selected;
        let style = if selected {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        } else {
            Style::default()
        };
        if selected {
            frame.render_widget(Block::default().style(style), row_area);
        }
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(widths)
            .split(row_area);

        let r = &rows[idx];
        render_cell_text(frame, cols[0], &r.row.to_string(), style);
        render_cell_text(frame, cols[1], &r.team.to_string(), style);
        render_cell_text(frame, cols[2], &format!("{:>8.2}", r.opr), style);
        render_cell_text(frame, cols[3], &format!("{:>8.2}", r.auto_opr), style);
        render_cell_text(frame, cols[4], &format!("{:>8.2}", r.teleop_opr), style);
        render_cell_text(frame, cols[5], &format!("{:>8.1}", r.epa), style);
    }
}

fn rating_columns() -> [Constraint; 6] {
    [
        Constraint::Length(5),
        Constraint::Length(8),
        Constraint::Length(10),
        Constraint::Length(10),
        Constraint::Length(10),
        Constraint::Min(10),
    ]
}

fn render_ratings_header(frame: &mut Frame, area: Rect, widths: &[Constraint], state: &AppState) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(widths)
        .split(area);
    let style = Style::default().add_modifier(Modifier::BOLD);
    let active = style.fg(Color::Yellow);
    let arrow = if state.sort_desc { "v" } else { "^" };

    for (idx, column) in SortColumn::ALL.iter().enumerate() {
        let label = sort_label(*column);
        if *column == state.sort {
            render_cell_text(frame, cols[idx], &format!("{label}{arrow}"), active);
        } else {
            render_cell_text(frame, cols[idx], label, style);
        }
    }
}

fn render_cell_text(frame: &mut Frame, area: Rect, text: &str, style: Style) {
    let text_area = Rect {
        x: area.x,
        y: area.y + (area.height / 2),
        width: area.width,
        height: 1,
    };
    let paragraph = Paragraph::new(text).style(style);
    frame.render_widget(paragraph, text_area);
}

fn focus_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    }
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if total == 0 || visible == 0 {
        return (0, 0);
    }
    if total <= visible {
        return (0, total);
    }

    let mut start = selected.saturating_sub(visible / 2);
    if start + visible > total {
        start = total - visible;
    }
    (start, start + visible)
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No alerts yet".to_string();
    }
    let start = state.logs.len().saturating_sub(3);
    state
        .logs
        .iter()
        .skip(start)
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
}

fn sort_label(column: SortColumn) -> &'static str {
    match column {
        SortColumn::Row => "#",
        SortColumn::Team => "Team",
        SortColumn::Opr => "OPR",
        SortColumn::AutoOpr => "Auto",
        SortColumn::TeleopOpr => "Teleop",
        SortColumn::Epa => "EPA",
    }
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "FRC Scout - Help",
        "",
        "Events:",
        "  j/k or Up/Down  Move",
        "  /               Search events",
        "  Enter / f       Fetch ratings",
        "  l               Reload event list",
        "",
        "Ratings:",
        "  Tab             Switch focus",
        "  s               Cycle sort column",
        "  r               Reverse sort",
        "  e               Export to xlsx",
        "",
        "  ?               Toggle help",
        "  q               Quit",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
