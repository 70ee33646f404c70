use std::time::Duration;

use ratatui::crossterm::event::{self, Event, KeyCode};
use tracing::trace;

use crate::domain::{Message, TrendsConfig, TrendsError};
use crate::model::Model;

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &TrendsConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, TrendsError> {
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            match event::read()? {
                Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                    // The command prompt consumes keys unmapped.
                    if model.raw_keyevents() {
                        return Ok(Some(Message::RawKey(key)));
                    }
                    return Ok(self.handle_key(key));
                }
                Event::Resize(width, height) => {
                    return Ok(Some(Message::Resize(width as usize, height as usize)));
                }
                _ => {}
            }
        }
        Ok(None)
    }

    fn handle_key(&self, key: event::KeyEvent) -> Option<Message> {
        let message = match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Char('d') => Some(Message::ShowPreview),
            KeyCode::Char('f') => Some(Message::ShowFilters),
            KeyCode::Char('s') => Some(Message::ShowStats),
            KeyCode::Char('b') => Some(Message::ShowBar),
            KeyCode::Char('c') => Some(Message::ShowPie),
            KeyCode::Char('t') => Some(Message::ShowTrend),
            KeyCode::Char('e') => Some(Message::Export),
            KeyCode::Char('v') => Some(Message::ChooseBarColumn),
            KeyCode::Char('r') => Some(Message::ResetFilters),
            KeyCode::Char(' ') => Some(Message::ToggleValue),
            KeyCode::Char('?') => Some(Message::Help),
            KeyCode::Up => Some(Message::MoveUp),
            KeyCode::Down => Some(Message::MoveDown),
            KeyCode::PageUp => Some(Message::MovePageUp),
            KeyCode::PageDown => Some(Message::MovePageDown),
            KeyCode::Home => Some(Message::MoveBeginning),
            KeyCode::End => Some(Message::MoveEnd),
            KeyCode::Esc => Some(Message::Exit),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}
