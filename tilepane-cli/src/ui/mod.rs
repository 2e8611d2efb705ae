//! Terminal UI for the map viewer.
//!
//! Provides a full-screen dashboard showing the current tile rectangle as
//! a status grid alongside live engine telemetry, plus plain-text status
//! output for non-interactive terminals.
//!
//! # Module Structure
//!
//! - [`Dashboard`] - terminal lifecycle, input polling, and drawing
//! - [`widgets`] - reusable UI widget components

pub mod widgets;

use std::io;
use std::time::Duration;

use crossterm::{
    cursor::{Hide, Show},
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Terminal,
};

use tilepane::coord::TileRect;
use tilepane::telemetry::TelemetrySnapshot;
use tilepane::tile::TileStatus;
use tilepane::viewport::Viewport;

use widgets::{TelemetryWidget, TileGridWidget};

/// Input events the dashboard reports to the view loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardEvent {
    /// Leave the viewer
    Quit,
    /// Move the camera one step in screen directions (x right, y down)
    Pan(i32, i32),
    /// Zoom in one level
    ZoomIn,
    /// Zoom out one level
    ZoomOut,
    /// Re-request the current rectangle
    Refresh,
    /// Drop decoded tiles and redecode, as after a lost render surface
    Invalidate,
}

/// Full-screen terminal dashboard.
///
/// Owns the terminal: raw mode and the alternate screen are entered on
/// construction and restored on drop, so the shell comes back intact
/// even on early returns.
pub struct Dashboard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl Dashboard {
    /// Take over the terminal.
    pub fn new() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, Hide)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self { terminal })
    }

    /// Poll for one pending input event without blocking.
    pub fn poll_event(&mut self) -> io::Result<Option<DashboardEvent>> {
        if !event::poll(Duration::from_millis(0))? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => Ok(map_key(key)),
            _ => Ok(None),
        }
    }

    /// Draw one frame.
    ///
    /// `statuses` must be in `rect`'s row-major iteration order, as
    /// produced by looking up each coordinate of `rect.iter()`.
    pub fn draw(
        &mut self,
        viewport: &Viewport,
        rect: &TileRect,
        statuses: &[Option<TileStatus>],
        snapshot: &TelemetrySnapshot,
    ) -> io::Result<()> {
        self.terminal.draw(|frame| {
            let [header, map, telemetry, help] = Layout::vertical([
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(9),
                Constraint::Length(1),
            ])
            .areas(frame.area());

            let title = Line::from(vec![
                Span::styled(
                    " tilepane ",
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!(
                        "{:.5}°, {:.5}°  zoom {}  {}×{} tiles",
                        viewport.latitude(),
                        viewport.longitude(),
                        viewport.zoom(),
                        rect.columns(),
                        rect.rows(),
                    ),
                    Style::default().fg(Color::White),
                ),
            ]);
            frame.render_widget(Paragraph::new(title), header);

            let map_block = Block::default().borders(Borders::ALL).title(" Map ");
            let map_inner = map_block.inner(map);
            frame.render_widget(map_block, map);
            frame.render_widget(TileGridWidget::new(rect, statuses), map_inner);

            let telemetry_block = Block::default().borders(Borders::ALL).title(" Telemetry ");
            let telemetry_inner = telemetry_block.inner(telemetry);
            frame.render_widget(telemetry_block, telemetry);
            frame.render_widget(TelemetryWidget::new(snapshot), telemetry_inner);

            let mut spans = widgets::legend().spans;
            spans.push(Span::styled(
                "   arrows pan  +/- zoom  r refresh  i redecode  q quit",
                Style::default().fg(Color::DarkGray),
            ));
            frame.render_widget(Paragraph::new(Line::from(spans)), help);
        })?;
        Ok(())
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen, Show);
    }
}

/// Translate a key press into a dashboard event.
fn map_key(key: KeyEvent) -> Option<DashboardEvent> {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Some(DashboardEvent::Quit),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(DashboardEvent::Quit)
        }
        KeyCode::Left => Some(DashboardEvent::Pan(-1, 0)),
        KeyCode::Right => Some(DashboardEvent::Pan(1, 0)),
        KeyCode::Up => Some(DashboardEvent::Pan(0, -1)),
        KeyCode::Down => Some(DashboardEvent::Pan(0, 1)),
        KeyCode::Char('+') | KeyCode::Char('=') => Some(DashboardEvent::ZoomIn),
        KeyCode::Char('-') => Some(DashboardEvent::ZoomOut),
        KeyCode::Char('r') => Some(DashboardEvent::Refresh),
        KeyCode::Char('i') => Some(DashboardEvent::Invalidate),
        _ => None,
    }
}

/// Simple non-TUI status line for non-interactive terminals.
pub fn print_simple_status(snapshot: &TelemetrySnapshot) {
    println!(
        "[{}] Tiles: {}/{} ready | In flight: {} | Errors: {} ({:.1}%)",
        snapshot.uptime_human(),
        snapshot.ready_tiles,
        snapshot.resident_tiles,
        snapshot.in_flight_fetches,
        snapshot.errors_total(),
        snapshot.error_rate() * 100.0,
    );
}

/// Print final session summary.
pub fn print_session_summary(snapshot: &TelemetrySnapshot) {
    println!();
    println!("Session Summary");
    println!("───────────────");
    println!(
        "  Fetches: {} issued ({} retried)",
        snapshot.fetches_issued, snapshot.fetches_retried
    );
    println!("  Tiles decoded: {}", snapshot.tiles_ready);
    println!(
        "  Errors: {} server, {} transport, {} decode, {} context",
        snapshot.server_errors,
        snapshot.transport_errors,
        snapshot.decode_errors,
        snapshot.context_losses
    );
    println!("  Evicted: {} tiles", snapshot.tiles_evicted);
    println!("  Stale completions: {}", snapshot.stale_completions);
    println!("  Uptime: {}", snapshot.uptime_human());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_map_key_quit() {
        assert_eq!(map_key(press(KeyCode::Char('q'))), Some(DashboardEvent::Quit));
        assert_eq!(map_key(press(KeyCode::Esc)), Some(DashboardEvent::Quit));
        assert_eq!(
            map_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(DashboardEvent::Quit)
        );
    }

    #[test]
    fn test_map_key_pan_directions() {
        assert_eq!(map_key(press(KeyCode::Left)), Some(DashboardEvent::Pan(-1, 0)));
        assert_eq!(map_key(press(KeyCode::Right)), Some(DashboardEvent::Pan(1, 0)));
        assert_eq!(map_key(press(KeyCode::Up)), Some(DashboardEvent::Pan(0, -1)));
        assert_eq!(map_key(press(KeyCode::Down)), Some(DashboardEvent::Pan(0, 1)));
    }

    #[test]
    fn test_map_key_zoom_and_refresh() {
        assert_eq!(map_key(press(KeyCode::Char('+'))), Some(DashboardEvent::ZoomIn));
        assert_eq!(map_key(press(KeyCode::Char('='))), Some(DashboardEvent::ZoomIn));
        assert_eq!(map_key(press(KeyCode::Char('-'))), Some(DashboardEvent::ZoomOut));
        assert_eq!(map_key(press(KeyCode::Char('r'))), Some(DashboardEvent::Refresh));
        assert_eq!(
            map_key(press(KeyCode::Char('i'))),
            Some(DashboardEvent::Invalidate)
        );
    }

    #[test]
    fn test_map_key_ignores_unbound_keys() {
        assert_eq!(map_key(press(KeyCode::Char('x'))), None);
        assert_eq!(map_key(press(KeyCode::Char('c'))), None);
        assert_eq!(map_key(press(KeyCode::Tab)), None);
    }
}
