use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::shared::{Cell, DisplayState};

pub const CELL_WIDTH: u16 = 3;
pub const LABEL_WIDTH: u16 = 11;

// one per selected collection, in selection order
const PALETTE: [Color; 10] = [
    Color::Red,
    Color::LightRed,
    Color::Yellow,
    Color::LightGreen,
    Color::Green,
    Color::Cyan,
    Color::Blue,
    Color::Magenta,
    Color::LightMagenta,
    Color::LightBlue,
];

// How many grid cells fit in a timeline of `width` columns (borders included)
pub fn visible_cols(width: u16) -> u16 {
    width.saturating_sub(LABEL_WIDTH + 2) / CELL_WIDTH
}

pub fn draw_lanes(frame: &mut Frame, area: Rect, state: &DisplayState, blink_on: bool) {
    let mut lines = vec![ruler(state)];

    for (track_idx, lane) in state.lanes.iter().enumerate() {
        let label_style = if track_idx == state.cursor_track {
            Style::default().fg(Color::Black).bg(Color::White)
        } else {
            Style::default().fg(Color::Gray)
        };
        let mut spans = vec![Span::styled(
            format!("{:<width$}", lane.label, width = LABEL_WIDTH as usize),
            label_style,
        )];

        for (i, cell) in lane.cells.iter().enumerate() {
            let block = state.first_block + i as u32;
            let (text, mut style) = match cell {
                Cell::Empty => (" · ".to_string(), Style::default().fg(Color::DarkGray)),
                Cell::ClipStart { sound, color } => (
                    format!("{:<3}", sound.0 % 1000),
                    Style::default().fg(Color::Black).bg(PALETTE[color % PALETTE.len()]),
                ),
                Cell::ClipBody { color, .. } => (
                    "   ".to_string(),
                    Style::default().bg(PALETTE[color % PALETTE.len()]),
                ),
            };
            if block == state.playhead_block && (state.playing || blink_on) {
                style = style.add_modifier(Modifier::UNDERLINED | Modifier::BOLD);
            }
            if track_idx == state.cursor_track && block == state.cursor_block {
                style = style.add_modifier(Modifier::REVERSED);
            }
            spans.push(Span::styled(text, style));
        }
        lines.push(Line::from(spans));
    }

    if state.lanes.is_empty() {
        lines.push(Line::from(Span::styled(
            "no tracks, press t to add one",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let block = Block::default().borders(Borders::ALL).title(" timeline ");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

// block numbers every fourth cell, playhead marked
fn ruler(state: &DisplayState) -> Line<'static> {
    let cols = state.lanes.first().map_or(0, |l| l.cells.len());
    let mut spans = vec![Span::raw(" ".repeat(LABEL_WIDTH as usize))];
    for i in 0..cols {
        let block = state.first_block + i as u32;
        let text = if block == state.playhead_block {
            " ▼ ".to_string()
        } else if block % 4 == 0 {
            format!("{:<3}", block % 1000)
        } else {
            "   ".to_string()
        };
        spans.push(Span::styled(text, Style::default().fg(Color::Yellow)));
    }
    Line::from(spans)
}
