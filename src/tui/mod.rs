//! Ratatui-based terminal UI.
//!
//! The TUI mirrors the reference dashboard: pick a region, optionally type
//! up to five observed weighings into the entry form, fit, and watch the
//! curve move. The fitted coefficients live only in the session's table.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
    Terminal,
};

use crate::cli::{TuiArgs, parse_observation};
use crate::data::SampleConfig;
use crate::domain::{CurveRange, GrowthParams, Observation, ParameterTable};
use crate::error::AppError;
use crate::fit::FitOptions;
use crate::models::sample_curve;

mod plotters_chart;

use plotters_chart::GrowthChart;

/// Number of observation rows in the entry form, matching the dashboard.
const OBS_ROWS: usize = 5;

/// Start the TUI.
pub fn run(args: TuiArgs) -> Result<(), AppError> {
    let table = crate::app::pipeline::load_table(args.table.params.as_deref())?;
    let region_idx = match args.table.region.as_deref() {
        Some(id) => table
            .ids()
            .position(|r| r == id)
            .ok_or_else(|| AppError::input(format!("No parameter record with ID '{id}'.")))?,
        None => 0,
    };
    if table.is_empty() {
        return Err(AppError::data("Parameter table is empty."));
    }

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::numeric(format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(table, region_idx);
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::numeric(format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::numeric(format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

struct App {
    /// Table as loaded; baseline for the "before" curve.
    loaded: ParameterTable,
    /// Session table; fits are applied here.
    table: ParameterTable,
    region_idx: usize,
    /// Raw text of the five observation rows (`age:weight`).
    obs_rows: [String; OBS_ROWS],
    /// 0 = region selector, 1..=OBS_ROWS = observation rows.
    selected_field: usize,
    /// Row currently being edited, plus its pre-edit text for Esc.
    editing: Option<(usize, String)>,
    sample_seed: u64,
    status: String,
}

impl App {
    fn new(table: ParameterTable, region_idx: usize) -> Self {
        Self {
            loaded: table.clone(),
            table,
            region_idx,
            obs_rows: Default::default(),
            selected_field: 0,
            editing: None,
            sample_seed: 42,
            status: "Enter observations, then press f to fit.".to_string(),
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
    ) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::numeric(format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::numeric(format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::numeric(format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.editing.is_some() {
            self.handle_row_edit(code);
            return false;
        }

        match code {
            KeyCode::Char('q') => return true,
            KeyCode::Up => {
                if self.selected_field > 0 {
                    self.selected_field -= 1;
                }
            }
            KeyCode::Down => {
                if self.selected_field < OBS_ROWS {
                    self.selected_field += 1;
                }
            }
            KeyCode::Left => self.cycle_region(-1),
            KeyCode::Right => self.cycle_region(1),
            KeyCode::Enter => {
                if self.selected_field >= 1 {
                    let row = self.selected_field - 1;
                    self.editing = Some((row, self.obs_rows[row].clone()));
                    self.status =
                        "Editing row (age:weight). Enter to apply, Esc to cancel.".to_string();
                }
            }
            KeyCode::Char('f') => self.run_fit(),
            KeyCode::Char('g') => self.generate_rows(),
            KeyCode::Char('c') => {
                self.obs_rows = Default::default();
                self.status = "Cleared observations.".to_string();
            }
            KeyCode::Char('x') => self.reset_region(),
            _ => {}
        }

        false
    }

    fn handle_row_edit(&mut self, code: KeyCode) {
        let Some((row, original)) = self.editing.clone() else {
            return;
        };
        match code {
            KeyCode::Esc => {
                self.obs_rows[row] = original;
                self.editing = None;
                self.status = "Edit canceled.".to_string();
            }
            KeyCode::Enter => {
                self.editing = None;
                let text = self.obs_rows[row].trim().to_string();
                if text.is_empty() {
                    self.status = format!("Row {} cleared.", row + 1);
                } else {
                    match parse_observation(&text) {
                        Ok(_) => self.status = format!("Row {} set.", row + 1),
                        Err(e) => self.status = format!("Row {}: {e}", row + 1),
                    }
                }
            }
            KeyCode::Backspace => {
                self.obs_rows[row].pop();
            }
            KeyCode::Char(c) => {
                if c.is_ascii_digit() || matches!(c, '.' | ':' | ',' | ' ') {
                    self.obs_rows[row].push(c);
                }
            }
            _ => {}
        }
    }

    fn cycle_region(&mut self, delta: i64) {
        if self.selected_field != 0 || self.table.is_empty() {
            return;
        }
        let n = self.table.len() as i64;
        self.region_idx = ((self.region_idx as i64 + delta).rem_euclid(n)) as usize;
        self.status = format!("region: {}", self.region_id());
    }

    fn region_id(&self) -> String {
        self.table.records()[self.region_idx].id.clone()
    }

    fn current_params(&self) -> GrowthParams {
        self.table.records()[self.region_idx].params
    }

    fn loaded_params(&self) -> GrowthParams {
        let id = self.region_id();
        self.loaded
            .get(&id)
            .map(|r| r.params)
            .unwrap_or_else(|| self.current_params())
    }

    /// Parse the non-empty entry rows into an observation set.
    fn observations(&self) -> Result<Vec<Observation>, String> {
        let mut out = Vec::new();
        for (i, row) in self.obs_rows.iter().enumerate() {
            let text = row.trim();
            if text.is_empty() {
                continue;
            }
            let obs = parse_observation(text).map_err(|e| format!("row {}: {e}", i + 1))?;
            out.push(obs);
        }
        Ok(out)
    }

    fn run_fit(&mut self) {
        let observations = match self.observations() {
            Ok(obs) => obs,
            Err(e) => {
                self.status = e;
                return;
            }
        };

        let id = self.region_id();
        // Seed from the region's loaded coefficients; they are already in
        // the right ballpark for that breed.
        let options = FitOptions {
            seed: self.loaded_params(),
            ..FitOptions::default()
        };
        match crate::fit::fit(&observations, &options) {
            Ok(fitted) => match crate::fit::apply(&mut self.table, &id, fitted) {
                Ok(()) => {
                    self.status = format!(
                        "{id}: fitted b0={:.1} b1={:.2} b2={:.5}",
                        fitted.b0, fitted.b1, fitted.b2
                    );
                }
                Err(e) => self.status = e.to_string(),
            },
            Err(e) => self.status = e.to_string(),
        }
    }

    fn generate_rows(&mut self) {
        let config = SampleConfig {
            seed: self.sample_seed,
            ..SampleConfig::default()
        };
        self.sample_seed = self.sample_seed.wrapping_add(1);

        match crate::data::generate_observations(&self.loaded_params(), &config) {
            Ok(observations) => {
                self.obs_rows = Default::default();
                for (row, obs) in self.obs_rows.iter_mut().zip(&observations) {
                    *row = format!("{:.0}:{:.1}", obs.age_days, obs.weight_kg);
                }
                self.status = "Generated synthetic weighings.".to_string();
            }
            Err(e) => self.status = e.to_string(),
        }
    }

    fn reset_region(&mut self) {
        let id = self.region_id();
        let loaded = self.loaded_params();
        match crate::fit::apply(&mut self.table, &id, loaded) {
            Ok(()) => self.status = format!("{id}: restored loaded coefficients."),
            Err(e) => self.status = e.to_string(),
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let params = self.current_params();
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("gc", Style::default().fg(Color::Cyan)),
            Span::raw(" — Gompertz growth curves"),
        ]));
        lines.push(Line::from(Span::styled(
            format!(
                "region: {} ({}/{}) | b0={:.1} kg b1={:.2} b2={:.5}",
                self.region_id(),
                self.region_idx + 1,
                self.table.len(),
                params.b0,
                params.b1,
                params.b2,
            ),
            Style::default().fg(Color::Gray),
        )));

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(OBS_ROWS as u16 + 3)])
            .split(area);

        self.draw_chart(frame, chunks[0]);
        self.draw_form(frame, chunks[1]);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Growth Curve").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let range = CurveRange::default();
        let current = self.current_params();
        let loaded = self.loaded_params();

        let curve: Vec<(f64, f64)> = sample_curve(&current, range).collect();
        let baseline: Vec<(f64, f64)> = if loaded != current {
            sample_curve(&loaded, range).collect()
        } else {
            Vec::new()
        };
        let points: Vec<(f64, f64)> = self
            .observations()
            .unwrap_or_default()
            .iter()
            .map(|o| (o.age_days, o.weight_kg))
            .collect();

        let (mut y_min, mut y_max) = (0.0_f64, 1.0_f64);
        for &(_, y) in curve.iter().chain(&baseline).chain(&points) {
            if y.is_finite() {
                y_min = y_min.min(y);
                y_max = y_max.max(y);
            }
        }
        let pad = ((y_max - y_min).abs() * 0.05).max(1e-12);

        let widget = GrowthChart {
            curve: &curve,
            baseline: &baseline,
            points: &points,
            x_bounds: [range.start, range.stop],
            y_bounds: [y_min - pad, y_max + pad],
            x_label: "age (days)",
            y_label: "weight (kg)",
        };
        frame.render_widget(widget, inner);
    }

    fn draw_form(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut items = Vec::new();
        items.push(ListItem::new(format!("Region: {}", self.region_id())));
        for (i, row) in self.obs_rows.iter().enumerate() {
            let text = if row.trim().is_empty() { "—" } else { row.as_str() };
            items.push(ListItem::new(format!("Obs {}: {text}", i + 1)));
        }

        let list = List::new(items)
            .block(Block::default().title("Observed weights").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ratatui::widgets::ListState::default();
        state.select(Some(self.selected_field));
        frame.render_stateful_widget(list, area, &mut state);

        if self.editing.is_some() {
            let hint = Paragraph::new("Editing row…")
                .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
            let rect = Rect {
                x: area.x + 2,
                y: area.y + area.height.saturating_sub(2),
                width: area.width.saturating_sub(4),
                height: 1,
            };
            frame.render_widget(hint, rect);
        }
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select  ←/→ region  Enter edit row  f fit  g generate  c clear  x reset  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::default_table;

    fn app() -> App {
        App::new(default_table(), 0)
    }

    #[test]
    fn region_cycling_wraps_around() {
        let mut a = app();
        let n = a.table.len();
        a.cycle_region(-1);
        assert_eq!(a.region_idx, n - 1);
        a.cycle_region(1);
        assert_eq!(a.region_idx, 0);
    }

    #[test]
    fn observation_rows_parse_and_skip_blanks() {
        let mut a = app();
        a.obs_rows[0] = "100:45.2".to_string();
        a.obs_rows[3] = "300,210.5".to_string();
        let obs = a.observations().unwrap();
        assert_eq!(obs.len(), 2);
        assert_eq!(obs[1], Observation::new(300.0, 210.5));

        a.obs_rows[4] = "garbage".to_string();
        assert!(a.observations().is_err());
    }

    #[test]
    fn fit_key_applies_to_the_session_table() {
        let mut a = app();
        // Exact points from the loaded Angus curve: fit converges right back
        // to (approximately) the loaded coefficients.
        let params = a.current_params();
        for (row, &t) in [60.0, 180.0, 320.0, 520.0, 700.0].iter().enumerate() {
            a.obs_rows[row] = format!("{t}:{}", crate::models::predict(t, &params));
        }
        a.run_fit();
        assert!(a.status.contains("fitted"), "status was: {}", a.status);
        let fitted = a.current_params();
        assert!((fitted.b0 - params.b0).abs() / params.b0 < 1e-2);
    }

    #[test]
    fn generate_then_fit_succeeds_for_every_region() {
        // The demo flow: g fills the form with noisy weighings, f fits them.
        // Noisy data leaves a large residual cost at the optimum, and the fit
        // is seeded from the region's loaded coefficients; both must hold for
        // each breed in the default table.
        let mut a = app();
        for _ in 0..a.table.len() {
            a.generate_rows();
            a.run_fit();
            assert!(
                a.status.contains("fitted"),
                "region {}: status was: {}",
                a.region_id(),
                a.status
            );
            a.cycle_region(1);
        }
    }

    #[test]
    fn fit_key_with_empty_form_reports_invalid_observations() {
        let mut a = app();
        a.run_fit();
        assert!(a.status.contains("Invalid observations"), "status was: {}", a.status);
    }

    #[test]
    fn reset_restores_loaded_coefficients() {
        let mut a = app();
        let loaded = a.current_params();
        let id = a.region_id();
        crate::fit::apply(&mut a.table, &id, GrowthParams::new(1.0, 1.0, 1.0)).unwrap();
        assert_ne!(a.current_params(), loaded);
        a.reset_region();
        assert_eq!(a.current_params(), loaded);
    }
}
