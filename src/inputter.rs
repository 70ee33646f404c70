use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};

/// Line editor for the command prompt (column picking). Collects raw key
/// events until Enter finishes or Esc cancels the input.
#[derive(Default)]
pub struct Inputter {
    buffer: String,
    cursor: usize,
    finished: bool,
    canceled: bool,
}

#[derive(Default, Clone)]
pub struct InputResult {
    pub input: String,
    pub finished: bool,
    pub canceled: bool,
    pub cursor: usize,
}

impl Inputter {
    pub fn read(&mut self, key: event::KeyEvent) -> InputResult {
        match (key.code, key.modifiers) {
            (KeyCode::Enter, KeyModifiers::NONE) => self.finished = true,
            (KeyCode::Esc, KeyModifiers::NONE) => {
                self.buffer.clear();
                self.cursor = 0;
                self.canceled = true;
                self.finished = true;
            }
            (KeyCode::Backspace, KeyModifiers::NONE) => self.backspace(),
            (KeyCode::Left, KeyModifiers::NONE) => self.cursor = self.cursor.saturating_sub(1),
            (KeyCode::Right, KeyModifiers::NONE) => {
                self.cursor = (self.cursor + 1).min(self.buffer.chars().count());
            }
            (code, _) => {
                if let Some(chr) = code.as_char() {
                    self.buffer.insert(self.byte_pos(), chr);
                    self.cursor += 1;
                }
            }
        }
        self.get()
    }

    pub fn get(&self) -> InputResult {
        InputResult {
            input: self.buffer.clone(),
            finished: self.finished,
            canceled: self.canceled,
            cursor: self.cursor,
        }
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
        self.finished = false;
        self.canceled = false;
    }

    fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let pos = self.byte_pos();
            self.buffer.remove(pos);
        }
    }

    fn byte_pos(&self) -> usize {
        self.buffer
            .char_indices()
            .nth(self.cursor)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.buffer.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyEvent;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn collects_typed_characters() {
        let mut input = Inputter::default();
        for c in "Age".chars() {
            input.read(key(KeyCode::Char(c)));
        }
        let result = input.read(key(KeyCode::Enter));
        assert_eq!(result.input, "Age");
        assert!(result.finished);
        assert!(!result.canceled);
    }

    #[test]
    fn backspace_removes_before_cursor() {
        let mut input = Inputter::default();
        for c in "abc".chars() {
            input.read(key(KeyCode::Char(c)));
        }
        input.read(key(KeyCode::Left));
        let result = input.read(key(KeyCode::Backspace));
        assert_eq!(result.input, "ac");
        assert_eq!(result.cursor, 1);
    }

    #[test]
    fn escape_cancels_and_finishes() {
        let mut input = Inputter::default();
        input.read(key(KeyCode::Char('x')));
        let result = input.read(key(KeyCode::Esc));
        assert!(result.finished);
        assert!(result.canceled);
        assert!(result.input.is_empty());
    }
}
