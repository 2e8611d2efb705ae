//! Tile status grid widget.
//!
//! Shows the viewer's current tile rectangle as a grid of colored cells,
//! one cell per tile:
//!
//! ```text
//! ┌ Map ───────────────────┐
//! │   ██ ██ ░░ ██ ██       │
//! │   ██ ░░ ░░ ██ ··       │
//! │   ██ ██ !! ██ ██       │
//! └────────────────────────┘
//! ```
//!
//! Green cells are decoded and ready, yellow cells are still loading,
//! red cells failed, and gray cells are not resident at all.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};
use tilepane::coord::TileRect;
use tilepane::tile::TileStatus;

/// Cell glyphs, two characters per tile so cells render roughly square.
const CELL_READY: &str = "██";
const CELL_LOADING: &str = "░░";
const CELL_ERROR: &str = "!!";
const CELL_ABSENT: &str = "··";

/// Width of one rendered cell in terminal columns, including spacing.
const CELL_WIDTH: u16 = 3;

/// Widget displaying the status of every tile in a rectangle.
pub struct TileGridWidget<'a> {
    /// The rectangle being displayed.
    rect: &'a TileRect,
    /// Tile statuses in the rectangle's row-major iteration order.
    statuses: &'a [Option<TileStatus>],
}

impl<'a> TileGridWidget<'a> {
    /// Create a grid widget for one tile rectangle.
    ///
    /// `statuses` must hold one entry per tile, in the rectangle's
    /// row-major order.
    pub fn new(rect: &'a TileRect, statuses: &'a [Option<TileStatus>]) -> Self {
        debug_assert_eq!(statuses.len(), rect.tile_count());
        Self { rect, statuses }
    }
}

impl Widget for TileGridWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < CELL_WIDTH || area.height == 0 {
            return;
        }

        let cols = self.rect.columns() as usize;
        let rows = self.rect.rows() as usize;
        let shown_cols = cols.min((area.width / CELL_WIDTH) as usize);
        let shown_rows = rows.min(area.height as usize);

        // Center what fits; oversized grids are clipped at the right
        // and bottom edges.
        let grid_width = shown_cols as u16 * CELL_WIDTH - 1;
        let x = area.x + area.width.saturating_sub(grid_width) / 2;
        let y = area.y + area.height.saturating_sub(shown_rows as u16) / 2;

        for row in 0..shown_rows {
            let mut spans = Vec::with_capacity(shown_cols * 2);
            for col in 0..shown_cols {
                let status = self.statuses[row * cols + col].as_ref();
                let (symbol, color) = cell_appearance(status);
                spans.push(Span::styled(symbol, Style::default().fg(color)));
                if col + 1 < shown_cols {
                    spans.push(Span::raw(" "));
                }
            }

            let row_area = Rect {
                x,
                y: y + row as u16,
                width: grid_width,
                height: 1,
            };
            Paragraph::new(Line::from(spans)).render(row_area, buf);
        }
    }
}

/// Glyph and color for one tile's status.
fn cell_appearance(status: Option<&TileStatus>) -> (&'static str, Color) {
    match status {
        Some(TileStatus::Ready(_)) => (CELL_READY, Color::Green),
        Some(TileStatus::Loading) => (CELL_LOADING, Color::Yellow),
        Some(TileStatus::Error(_)) => (CELL_ERROR, Color::Red),
        None => (CELL_ABSENT, Color::DarkGray),
    }
}

/// Legend line explaining the cell glyphs.
pub fn legend() -> Line<'static> {
    Line::from(vec![
        Span::styled(CELL_READY, Style::default().fg(Color::Green)),
        Span::raw(" ready  "),
        Span::styled(CELL_LOADING, Style::default().fg(Color::Yellow)),
        Span::raw(" loading  "),
        Span::styled(CELL_ERROR, Style::default().fg(Color::Red)),
        Span::raw(" error  "),
        Span::styled(CELL_ABSENT, Style::default().fg(Color::DarkGray)),
        Span::raw(" absent"),
    ])
}
