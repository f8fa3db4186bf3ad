use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};

use super::mode::TuiState;
use crate::shared::{Direction, InputEvent};

// poll for input from tui, tracks the collection-mode toggle in tuistate,
// resolves keys to input events for the backend to handle
pub fn poll_input(timeout: Duration, ts: &mut TuiState) -> anyhow::Result<Vec<InputEvent>> {
    if !event::poll(timeout)? {
        return Ok(vec![]);
    }

    if let Event::Key(key) = event::read()? {
        if key.kind != KeyEventKind::Press {
            return Ok(vec![]);
        }
        return Ok(handle_key(key.code, ts));
    }
    Ok(vec![])
}

fn handle_key(code: KeyCode, ts: &mut TuiState) -> Vec<InputEvent> {
    match code {
        KeyCode::Esc | KeyCode::Char('q') => vec![InputEvent::Quit],

        // cursor
        KeyCode::Left | KeyCode::Char('h') => vec![InputEvent::MoveCursor(Direction::Left)],
        KeyCode::Right | KeyCode::Char('l') => vec![InputEvent::MoveCursor(Direction::Right)],
        KeyCode::Up | KeyCode::Char('k') => vec![InputEvent::MoveCursor(Direction::Up)],
        KeyCode::Down | KeyCode::Char('j') => vec![InputEvent::MoveCursor(Direction::Down)],

        // timeline edits
        KeyCode::Enter => vec![InputEvent::PlaceClip],
        KeyCode::Char('x') | KeyCode::Delete => vec![InputEvent::DeleteClip],
        KeyCode::Char('t') => vec![InputEvent::AddTrack],
        KeyCode::Char('<') | KeyCode::Char(',') => vec![InputEvent::ScrollLeft],
        KeyCode::Char('>') | KeyCode::Char('.') => vec![InputEvent::ScrollRight],

        // transport
        KeyCode::Char(' ') => vec![InputEvent::PlayPause],
        KeyCode::Char('s') => vec![InputEvent::Stop],

        // sounds
        KeyCode::Char('c') => {
            ts.collection_mode = !ts.collection_mode;
            vec![]
        }
        KeyCode::Char(c @ '1'..='9') => resolve_digit(c as u8 - b'0', ts),
        KeyCode::Char('p') => vec![InputEvent::PreviewSample],
        KeyCode::Char('f') => vec![InputEvent::ToggleLowpass],
        KeyCode::Char('-') => vec![InputEvent::VolumeDown],
        KeyCode::Char('=') | KeyCode::Char('+') => vec![InputEvent::VolumeUp],

        // song
        KeyCode::Char('e') => vec![InputEvent::Export],
        KeyCode::Char('w') => vec![InputEvent::Save],
        KeyCode::Char('X') => {
            if ts.playing {
                vec![] // clearing is refused while playing anyway
            } else {
                vec![InputEvent::ClearSong]
            }
        }

        _ => vec![],
    }
}

// resolve digit keys based on the collection toggle
fn resolve_digit(n: u8, ts: &TuiState) -> Vec<InputEvent> {
    if ts.collection_mode {
        vec![InputEvent::ToggleCollection(n)]
    } else {
        vec![InputEvent::SelectSample(n)]
    }
}
