//! Engine counters panel.
//!
//! Renders one label/value line per stat, in the order an operator
//! scans them: liveness and traffic before failure counts.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};
use tilepane::telemetry::TelemetrySnapshot;

/// Widget displaying a telemetry snapshot as aligned stat lines.
pub struct TelemetryWidget<'a> {
    snapshot: &'a TelemetrySnapshot,
}

impl<'a> TelemetryWidget<'a> {
    /// Create a telemetry widget for one snapshot.
    pub fn new(snapshot: &'a TelemetrySnapshot) -> Self {
        Self { snapshot }
    }
}

impl Widget for TelemetryWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Paragraph::new(stat_lines(self.snapshot)).render(area, buf);
    }
}

/// One aligned label/value line.
fn stat_line(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("{:<11}", label),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(value, Style::default().fg(Color::White)),
    ])
}

/// All stat lines for one snapshot.
fn stat_lines(snapshot: &TelemetrySnapshot) -> Vec<Line<'static>> {
    vec![
        stat_line("Uptime", snapshot.uptime_human()),
        stat_line(
            "Resident",
            format!(
                "{} tiles, {} ready",
                snapshot.resident_tiles, snapshot.ready_tiles
            ),
        ),
        stat_line("In flight", snapshot.in_flight_fetches.to_string()),
        stat_line(
            "Fetches",
            format!(
                "{} issued, {} retried",
                snapshot.fetches_issued, snapshot.fetches_retried
            ),
        ),
        stat_line(
            "Errors",
            format!(
                "{} server, {} transport, {} decode, {} context",
                snapshot.server_errors,
                snapshot.transport_errors,
                snapshot.decode_errors,
                snapshot.context_losses
            ),
        ),
        stat_line(
            "Error rate",
            format!("{:.1}%", snapshot.error_rate() * 100.0),
        ),
        stat_line("Evicted", format!("{} tiles", snapshot.tiles_evicted)),
    ]
}
