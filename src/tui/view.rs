use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use super::grid;
use crate::shared::DisplayState;

const HELP: &str =
    "spc play/pause  s stop  ⏎ place  x delete  t track  1-9 sample  c collections  p preview  f lowpass  -/= vol  e export  w save  esc quit";

pub fn render(frame: &mut Frame, area: Rect, state: &DisplayState, collection_mode: bool, blink_on: bool) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // transport + sounds
            Constraint::Min(5), // lanes
            Constraint::Length(3), // trax string
            Constraint::Length(1), // help
        ])
        .split(area);

    draw_header(frame, sections[0], state, collection_mode);
    grid::draw_lanes(frame, sections[1], state, blink_on);
    draw_trax(frame, sections[2], state);
    frame.render_widget(
        Paragraph::new(HELP).style(Style::default().fg(Color::DarkGray)),
        sections[3],
    );
}

fn draw_header(frame: &mut Frame, area: Rect, state: &DisplayState, collection_mode: bool) {
    let transport = if state.playing {
        Span::styled(" ▶ PLAYING ", Style::default().fg(Color::Black).bg(Color::Green))
    } else {
        Span::styled(" ■ STOPPED ", Style::default().fg(Color::Black).bg(Color::Gray))
    };
    let mut top = vec![transport, Span::raw("  ")];
    if state.lowpass {
        top.push(Span::styled("LOWPASS ", Style::default().fg(Color::Cyan)));
    }
    if state.exporting {
        top.push(Span::styled("EXPORTING ", Style::default().fg(Color::Yellow)));
    }
    top.push(Span::raw(format!("sample {}  ", state.selected_sample)));
    top.push(Span::styled(state.status.clone(), Style::default().fg(Color::LightYellow)));

    let mode_style = if collection_mode {
        Style::default().add_modifier(Modifier::BOLD).fg(Color::Magenta)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let mut cols = vec![Span::styled("collections: ", mode_style)];
    for (i, (name, selected)) in state.collections.iter().enumerate() {
        let style = if *selected {
            Style::default().fg(Color::Black).bg(Color::Magenta)
        } else {
            Style::default().fg(Color::Gray)
        };
        cols.push(Span::styled(format!("{} {name}", i + 1), style));
        cols.push(Span::raw(" "));
    }

    let block = Block::default().borders(Borders::ALL).title(" trax ");
    frame.render_widget(
        Paragraph::new(vec![Line::from(top), Line::from(cols)]).block(block),
        area,
    );
}

fn draw_trax(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let block = Block::default().borders(Borders::ALL).title(" song ");
    frame.render_widget(
        Paragraph::new(state.trax.as_str()).block(block).wrap(Wrap { trim: true }),
        area,
    );
}
