use crate::error::Result;
use crossterm::event::{poll, read, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// something happened on the physical input device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// physical key `code` went down or up
    Key { code: u32, down: bool },
    /// the user wants out
    Quit,
}

/// reads keypresses
pub trait Input {
    /// append everything that happened since the last poll, without blocking
    fn poll(&mut self, events: &mut Vec<InputEvent>) -> Result<()>;
}

/// Terminals report key presses (and auto-repeats) but never releases. A
/// key counts as held until it has gone `hold` without another press.
pub struct KeyLatch {
    hold: Duration,
    held: HashMap<u32, Instant>,
}

impl KeyLatch {
    pub fn new(hold: Duration) -> Self {
        KeyLatch {
            hold,
            held: HashMap::new(),
        }
    }

    /// note a press at `now`; true if the key wasn't already held
    pub fn press(&mut self, code: u32, now: Instant) -> bool {
        self.held.insert(code, now).is_none()
    }

    /// keys whose hold has run out by `now`; they are no longer held
    pub fn expire(&mut self, now: Instant) -> Vec<u32> {
        let hold = self.hold;
        let mut released: Vec<u32> = self
            .held
            .iter()
            .filter(|&(_, &at)| now.saturating_duration_since(at) >= hold)
            .map(|(&code, _)| code)
            .collect();
        released.sort_unstable();
        for code in &released {
            self.held.remove(code);
        }
        released
    }
}

/// Input from the controlling terminal, in raw mode, using crossterm.
/// Escape or ctrl-c quits.
pub struct TermInput {
    latch: KeyLatch,
}

impl TermInput {
    pub fn new(hold: Duration) -> Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(TermInput {
            latch: KeyLatch::new(hold),
        })
    }

    /// block until a character key is pressed; None if the user quit
    pub fn wait_press(&mut self) -> Result<Option<u32>> {
        loop {
            if let Event::Key(evt) = read()? {
                match classify(evt) {
                    Some(InputEvent::Key { code, .. }) => return Ok(Some(code)),
                    Some(InputEvent::Quit) => return Ok(None),
                    None => {}
                }
            }
        }
    }
}

/// what a terminal key event means to us: a key press, quit, or nothing
fn classify(evt: KeyEvent) -> Option<InputEvent> {
    match evt.code {
        KeyCode::Esc => Some(InputEvent::Quit),
        KeyCode::Char('c') if evt.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(InputEvent::Quit)
        }
        KeyCode::Char(key) => Some(InputEvent::Key {
            code: u32::from(key.to_ascii_lowercase()),
            down: true,
        }),
        _ => None,
    }
}

impl Drop for TermInput {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

impl Input for TermInput {
    fn poll(&mut self, events: &mut Vec<InputEvent>) -> Result<()> {
        while poll(Duration::from_millis(0))? {
            if let Event::Key(evt) = read()? {
                match classify(evt) {
                    Some(InputEvent::Key { code, .. }) => {
                        if self.latch.press(code, Instant::now()) {
                            events.push(InputEvent::Key { code, down: true });
                        }
                    }
                    Some(InputEvent::Quit) => events.push(InputEvent::Quit),
                    None => {}
                }
            }
        }
        for code in self.latch.expire(Instant::now()) {
            events.push(InputEvent::Key { code, down: false });
        }
        Ok(())
    }
}

/// dummy Input implementation for testing; hands out one batch per poll
pub struct DummyInput {
    batches: Vec<Vec<InputEvent>>,
}

impl DummyInput {
    pub fn new(batches: Vec<Vec<InputEvent>>) -> Self {
        DummyInput { batches }
    }
}

impl Input for DummyInput {
    fn poll(&mut self, events: &mut Vec<InputEvent>) -> Result<()> {
        if !self.batches.is_empty() {
            events.extend(self.batches.remove(0));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    const HOLD: Duration = Duration::from_millis(150);

    #[test]
    fn test_latch_press_and_release() {
        let t0 = Instant::now();
        let mut latch = KeyLatch::new(HOLD);
        assert!(latch.press(49, t0));
        assert!(latch.expire(t0 + Duration::from_millis(100)).is_empty());
        assert_eq!(latch.expire(t0 + HOLD), [49]);
        // released, so a new press is a new key down
        assert!(latch.press(49, t0 + HOLD));
    }

    #[test]
    fn test_latch_repeat_extends_hold() {
        let t0 = Instant::now();
        let mut latch = KeyLatch::new(HOLD);
        assert!(latch.press(49, t0));
        assert!(!latch.press(49, t0 + Duration::from_millis(100)));
        assert!(latch.expire(t0 + Duration::from_millis(200)).is_empty());
        assert_eq!(latch.expire(t0 + Duration::from_millis(250)), [49]);
    }

    #[test]
    fn test_latch_releases_independently() {
        let t0 = Instant::now();
        let mut latch = KeyLatch::new(HOLD);
        latch.press(50, t0);
        latch.press(49, t0);
        latch.press(51, t0 + Duration::from_millis(100));
        assert_eq!(latch.expire(t0 + HOLD), [49, 50]);
        assert_eq!(latch.expire(t0 + Duration::from_millis(250)), [51]);
    }

    #[test]
    fn test_default_hold_bridges_autorepeat_delay() {
        let t0 = Instant::now();
        let mut latch = KeyLatch::new(Config::default().key_hold);
        assert!(latch.press(49, t0));
        // first repeat after a slow 600ms delay, then every 33ms
        let mut at = t0 + Duration::from_millis(600);
        assert!(latch.expire(at).is_empty());
        for _ in 0..10 {
            assert!(!latch.press(49, at));
            at += Duration::from_millis(33);
            assert!(latch.expire(at).is_empty());
        }
    }

    #[test]
    fn test_classify() {
        let key = |code, modifiers| KeyEvent::new(code, modifiers);
        assert_eq!(
            classify(key(KeyCode::Char('Q'), KeyModifiers::SHIFT)),
            Some(InputEvent::Key {
                code: 'q' as u32,
                down: true
            })
        );
        assert_eq!(classify(key(KeyCode::Esc, KeyModifiers::NONE)), Some(InputEvent::Quit));
        assert_eq!(
            classify(key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(InputEvent::Quit)
        );
        assert_eq!(classify(key(KeyCode::Up, KeyModifiers::NONE)), None);
    }

    #[test]
    fn test_dummy_input_batches() -> Result<()> {
        let mut input = DummyInput::new(vec![vec![InputEvent::Quit], vec![]]);
        let mut events = Vec::new();
        input.poll(&mut events)?;
        input.poll(&mut events)?;
        input.poll(&mut events)?;
        assert_eq!(events, [InputEvent::Quit]);
        Ok(())
    }
}
