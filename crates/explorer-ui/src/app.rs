//! Application state and TUI event loop for the WATCH data explorer.
//!
//! [`App`] owns the theme, the shared study table, the current [`Filters`]
//! and the view computed from them. Every input that changes a filter
//! recomputes the view.

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};

use explorer_core::config::DataSource;
use explorer_core::models::JoinedTable;
use explorer_runtime::controller::{compute_view, DashboardOptions, DashboardView, Filters};

use crate::chart_view;
use crate::components::controls::{ControlsPanel, Focus};
use crate::components::header::Header;
use crate::themes::Theme;

/// Width of the controls column.
const CONTROLS_WIDTH: u16 = 52;

// ── SourceLabels ──────────────────────────────────────────────────────────────

/// File names shown in the header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceLabels {
    pub vitals: String,
    pub users: String,
    pub sheet: String,
}

impl SourceLabels {
    pub fn from_source(source: &DataSource) -> Self {
        let file_name = |p: &Path| {
            p.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| p.display().to_string())
        };
        Self {
            vitals: file_name(&source.vitals_path),
            users: file_name(&source.users_path),
            sheet: source.sheet.clone(),
        }
    }
}

// ── App ───────────────────────────────────────────────────────────────────────

/// Root application state for the explorer TUI.
pub struct App {
    pub theme: Theme,
    table: Arc<JoinedTable>,
    options: DashboardOptions,
    filters: Filters,
    pub focus: Focus,
    customer_cursor: usize,
    view: DashboardView,
    labels: SourceLabels,
    /// Set to `true` to break out of the event loop on the next iteration.
    pub should_quit: bool,
}

impl App {
    pub fn new(
        theme_name: &str,
        table: Arc<JoinedTable>,
        options: DashboardOptions,
        filters: Filters,
        labels: SourceLabels,
    ) -> Self {
        let view = compute_view(&table, &filters);
        Self {
            theme: Theme::from_name(theme_name),
            table,
            options,
            filters,
            focus: Focus::default(),
            customer_cursor: 0,
            view,
            labels,
            should_quit: false,
        }
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    pub fn view(&self) -> &DashboardView {
        &self.view
    }

    // ── Event loop ────────────────────────────────────────────────────────────

    /// Run the dashboard until `q`, `Esc` or `Ctrl+C`.
    ///
    /// Uses `crossterm::event::poll` with a 250 ms timeout and yields to the
    /// runtime between ticks. Returns the final filters so the caller can
    /// remember them.
    pub async fn run(mut self) -> io::Result<Filters> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let tick_rate = Duration::from_millis(250);

        let result = loop {
            if let Err(e) = terminal.draw(|frame| self.render(frame)) {
                break Err(e);
            }

            match event::poll(tick_rate) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) => self.handle_key(key),
                    Ok(_) => {}
                    Err(e) => break Err(e),
                },
                Ok(false) => {}
                Err(e) => break Err(e),
            }

            if self.should_quit {
                break Ok(());
            }
            tokio::task::yield_now().await;
        };

        // Restore terminal state unconditionally.
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result.map(|_| self.filters)
    }

    // ── Input ─────────────────────────────────────────────────────────────────

    /// Apply one key press. Recomputes the view when a filter changed.
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Release {
            return;
        }
        let changed = match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
                false
            }
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
                false
            }
            KeyCode::Tab | KeyCode::Down => {
                self.focus = self.focus.next();
                false
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.focus = self.focus.prev();
                false
            }
            KeyCode::Left => self.step(-1),
            KeyCode::Right => self.step(1),
            KeyCode::Char(' ') | KeyCode::Enter => self.toggle(),
            KeyCode::Char('c') => {
                let had_customers = !self.filters.customers.is_empty();
                self.filters.customers.clear();
                had_customers
            }
            _ => false,
        };

        if changed {
            self.recompute();
        }
    }

    /// Change the focused value by `delta`. Returns whether a filter changed.
    fn step(&mut self, delta: i32) -> bool {
        match self.focus {
            Focus::Vital => {
                let types = &self.options.measurement_types;
                if types.is_empty() {
                    return false;
                }
                let current = types
                    .iter()
                    .position(|t| *t == self.filters.measurement_type)
                    .unwrap_or(0);
                let next = wrap(current, delta, types.len());
                let changed = types[next] != self.filters.measurement_type;
                self.filters.measurement_type = types[next].clone();
                changed
            }
            Focus::MinPoints => {
                let before = self.filters.min_points();
                self.filters.step_min_points(delta);
                before != self.filters.min_points()
            }
            Focus::Individuals => {
                let count = self.options.customers.len();
                if count > 0 {
                    self.customer_cursor = wrap(self.customer_cursor, delta, count);
                }
                false
            }
            Focus::StartDate | Focus::Intervention | Focus::ControlGroup => false,
        }
    }

    /// Toggle the focused control. Returns whether a filter changed.
    fn toggle(&mut self) -> bool {
        match self.focus {
            Focus::StartDate => {
                self.filters.reference = self.filters.reference.toggled();
                true
            }
            Focus::Intervention => {
                self.filters.visibility.intervention = !self.filters.visibility.intervention;
                true
            }
            Focus::ControlGroup => {
                self.filters.visibility.control = !self.filters.visibility.control;
                true
            }
            Focus::Individuals => match self.options.customers.get(self.customer_cursor) {
                Some(customer) => {
                    self.filters.toggle_customer(customer);
                    true
                }
                None => false,
            },
            Focus::Vital | Focus::MinPoints => false,
        }
    }

    fn recompute(&mut self) {
        self.view = compute_view(&self.table, &self.filters);
        tracing::debug!(
            measurement_type = %self.filters.measurement_type,
            min_points = self.filters.min_points(),
            reference = self.filters.reference.column(),
            groups = self.view.group_count,
            "filters changed"
        );
    }

    // ── Rendering ─────────────────────────────────────────────────────────────

    /// Render the current application state into `frame`.
    pub fn render(&self, frame: &mut Frame) {
        let area = frame.area();
        let rows = Layout::vertical([Constraint::Length(4), Constraint::Min(0)]).split(area);

        let header = Header::new(
            &self.labels.vitals,
            &self.labels.users,
            &self.labels.sheet,
            self.table.len(),
            &self.theme,
        );
        frame.render_widget(Paragraph::new(Text::from(header.to_lines())), rows[0]);

        let columns =
            Layout::horizontal([Constraint::Length(CONTROLS_WIDTH), Constraint::Min(0)]).split(rows[1]);
        self.render_controls(frame, columns[0]);

        let charts =
            Layout::vertical([Constraint::Percentage(60), Constraint::Percentage(40)]).split(columns[1]);
        let value_title = if self.filters.measurement_type.is_empty() {
            "Median".to_string()
        } else {
            format!("{} median", self.filters.measurement_type)
        };
        chart_view::render_layered(frame, charts[0], &self.view.value, &value_title, &self.theme);
        chart_view::render_outcome(frame, charts[1], &self.view.counts, "Sample count", &self.theme);
    }

    fn render_controls(&self, frame: &mut Frame, area: ratatui::layout::Rect) {
        let panel = ControlsPanel {
            filters: &self.filters,
            options: &self.options,
            focus: self.focus,
            customer_cursor: self.customer_cursor,
            theme: &self.theme,
        };
        let mut lines = panel.to_lines();
        lines.push(Line::from(vec![
            Span::styled("Groups shown: ", self.theme.label),
            Span::styled(self.view.group_count.to_string(), self.theme.value),
        ]));
        let paragraph = Paragraph::new(Text::from(lines)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(self.theme.separator)
                .title(Span::styled(" Controls ", self.theme.header)),
        );
        frame.render_widget(paragraph, area);
    }
}

/// Move `index` by `delta` within `0..len`, wrapping at both ends.
fn wrap(index: usize, delta: i32, len: usize) -> usize {
    let len = len as i64;
    ((index as i64 + delta as i64).rem_euclid(len)) as usize
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as Days, NaiveDate};
    use explorer_core::models::{Cohort, JoinedRow, Reference};
    use ratatui::backend::TestBackend;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn make_table() -> Arc<JoinedTable> {
        let enrollment = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut rows = Vec::new();
        for kind in ["hr", "spo2"] {
            for i in 0..12 {
                for (prefix, cohort) in [("I", Cohort::Intervention), ("C", Cohort::Control)] {
                    rows.push(JoinedRow {
                        customer: format!("{prefix}{i:02}"),
                        day: enrollment + Days::days(i % 2),
                        measurement_type: kind.to_string(),
                        value: 60.0 + i as f64,
                        enrollment,
                        days_since_start: i % 2,
                        cohort,
                    });
                }
            }
        }
        Arc::new(JoinedTable::new(rows))
    }

    fn make_app() -> App {
        let table = make_table();
        let options = DashboardOptions::from_table(&table, 0);
        let filters = options.initial_filters();
        App::new("dark", table, options, filters, SourceLabels::default())
    }

    // ── Construction ─────────────────────────────────────────────────────────

    #[test]
    fn test_app_creation_defaults() {
        let app = make_app();
        assert!(!app.should_quit);
        assert_eq!(app.focus, Focus::Vital);
        assert_eq!(app.filters().measurement_type, "hr");
        assert_eq!(app.filters().min_points(), 10);
        // Types need 10 points per day; with 6 per day nothing passes.
        assert!(app.view().value.base.is_no_data());
    }

    #[test]
    fn test_source_labels_use_file_names() {
        let source = DataSource {
            vitals_path: "/data/raw/vitals.csv".into(),
            users_path: "/data/external/users.xlsx".into(),
            sheet: "Tabelle1".to_string(),
        };
        let labels = SourceLabels::from_source(&source);
        assert_eq!(labels.vitals, "vitals.csv");
        assert_eq!(labels.users, "users.xlsx");
        assert_eq!(labels.sheet, "Tabelle1");
    }

    // ── Keys ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_quit_keys() {
        for code in [KeyCode::Char('q'), KeyCode::Char('Q'), KeyCode::Esc] {
            let mut app = make_app();
            app.handle_key(key(code));
            assert!(app.should_quit);
        }
        let mut app = make_app();
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }

    #[test]
    fn test_focus_navigation() {
        let mut app = make_app();
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.focus, Focus::MinPoints);
        app.handle_key(key(KeyCode::Down));
        assert_eq!(app.focus, Focus::StartDate);
        app.handle_key(key(KeyCode::BackTab));
        app.handle_key(key(KeyCode::Up));
        assert_eq!(app.focus, Focus::Vital);
    }

    #[test]
    fn test_vital_cycles_and_recomputes() {
        let mut app = make_app();
        app.handle_key(key(KeyCode::Right));
        assert_eq!(app.filters().measurement_type, "spo2");
        app.handle_key(key(KeyCode::Right));
        assert_eq!(app.filters().measurement_type, "hr");
        app.handle_key(key(KeyCode::Left));
        assert_eq!(app.filters().measurement_type, "spo2");
    }

    #[test]
    fn test_min_points_lowered_shows_data() {
        let mut app = make_app();
        app.focus = Focus::MinPoints;
        for _ in 0..5 {
            app.handle_key(key(KeyCode::Left));
        }
        assert_eq!(app.filters().min_points(), 5);
        let value = app.view().value.base.chart().expect("chart after lowering threshold");
        assert_eq!(value.series.len(), 1);
    }

    #[test]
    fn test_toggles() {
        let mut app = make_app();
        app.focus = Focus::StartDate;
        app.handle_key(key(KeyCode::Char(' ')));
        assert_eq!(app.filters().reference, Reference::DaysSinceStart);

        app.focus = Focus::ControlGroup;
        app.handle_key(key(KeyCode::Enter));
        assert!(app.filters().visibility.control);

        app.focus = Focus::Intervention;
        app.handle_key(key(KeyCode::Enter));
        assert!(!app.filters().visibility.intervention);
    }

    #[test]
    fn test_customer_selection_and_clear() {
        let mut app = make_app();
        app.focus = Focus::Individuals;
        app.handle_key(key(KeyCode::Char(' ')));
        app.handle_key(key(KeyCode::Right));
        app.handle_key(key(KeyCode::Char(' ')));
        assert_eq!(app.filters().customers.len(), 2);
        assert!(app.view().value.overlay.is_some());

        app.handle_key(key(KeyCode::Char('c')));
        assert!(app.filters().customers.is_empty());
        assert!(app.view().value.overlay.is_none());
    }

    #[test]
    fn test_customer_cursor_wraps() {
        let mut app = make_app();
        app.focus = Focus::Individuals;
        app.handle_key(key(KeyCode::Left));
        assert_eq!(app.customer_cursor, app.options.customers.len() - 1);
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap(0, -1, 3), 2);
        assert_eq!(wrap(2, 1, 3), 0);
        assert_eq!(wrap(1, 1, 3), 2);
    }

    // ── Rendering ────────────────────────────────────────────────────────────

    #[test]
    fn test_render_does_not_panic() {
        let mut app = make_app();
        app.focus = Focus::MinPoints;
        app.handle_key(key(KeyCode::Left));
        app.handle_key(key(KeyCode::Left));
        app.handle_key(key(KeyCode::Left));
        app.handle_key(key(KeyCode::Left));
        app.handle_key(key(KeyCode::Left));

        let backend = TestBackend::new(140, 40);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| app.render(frame)).unwrap();

        let screen: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(screen.contains("WATCH DATA EXPLORER"));
        assert!(screen.contains("Controls"));
        assert!(screen.contains("hr median"));
    }

    #[test]
    fn test_render_empty_table_does_not_panic() {
        let table = Arc::new(JoinedTable::default());
        let options = DashboardOptions::from_table(&table, 24);
        let filters = options.initial_filters();
        let app = App::new("classic", table, options, filters, SourceLabels::default());

        let backend = TestBackend::new(100, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| app.render(frame)).unwrap();
    }
}
