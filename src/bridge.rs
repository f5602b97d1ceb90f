//! # bridge
//!
//! The only state shared between the simulation and render threads: a queue
//! of key transitions and the run flag, behind a single mutex. The render
//! thread enqueues; the simulation thread drains the queue into its own key
//! vector before each step, or blocks on it for FX0A.
use crate::error::{Chip8Error, Result};
use crate::state::KEY_COUNT;
use log::debug;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

/// a logical key going down or up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: u8,
    pub down: bool,
}

/// Blocks the interpreter until a key is pressed (FX0A)
pub trait Keypad {
    /// the logical key pressed, or None if the machine is shutting down
    fn wait_for_key(&self) -> Option<u8>;
}

/// what the mutex protects
#[derive(Debug)]
pub struct Shared {
    queue: Vec<KeyEvent>,
    running: bool,
}

impl Shared {
    pub fn push(&mut self, key: u8, down: bool) -> Result<()> {
        if key as usize >= KEY_COUNT {
            return Err(Chip8Error::InvalidKeyIndex(key));
        }
        self.queue.push(KeyEvent { key, down });
        Ok(())
    }

    /// apply every queued transition to `keys` and empty the queue
    pub fn drain_into(&mut self, keys: &mut [bool; KEY_COUNT]) {
        for event in self.queue.drain(..) {
            keys[event.key as usize] = event.down;
        }
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn queued(&self) -> &[KeyEvent] {
        &self.queue
    }
}

pub struct Bridge {
    shared: Mutex<Shared>,
    poll: Duration,
}

impl Bridge {
    /// `poll` is how long a blocked key wait sleeps between looks at the queue
    pub fn new(poll: Duration) -> Self {
        Bridge {
            shared: Mutex::new(Shared {
                queue: Vec::new(),
                running: true,
            }),
            poll,
        }
    }

    /// nothing in `Shared` can be left half-updated by a panicking holder,
    /// so a poisoned lock is still usable
    pub fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// queue a key transition; never blocks for longer than the lock is held
    pub fn enqueue(&self, key: u8, down: bool) -> Result<()> {
        self.lock().push(key, down)
    }

    /// drain pending transitions into `keys`; false once the run flag is cleared
    pub fn sync(&self, keys: &mut [bool; KEY_COUNT]) -> bool {
        let mut shared = self.lock();
        shared.drain_into(keys);
        shared.running
    }

    /// Wait for a fresh key press. Anything already queued is discarded
    /// first so a stale event can't answer the wait. Key releases are
    /// ignored. Returns None if the run flag is cleared while waiting.
    pub fn block_for_key_press(&self) -> Option<u8> {
        self.lock().queue.clear();
        debug!("waiting for a key press");
        loop {
            {
                let mut shared = self.lock();
                if !shared.running {
                    return None;
                }
                if let Some(event) = shared.queue.iter().find(|e| e.down).copied() {
                    shared.queue.clear();
                    return Some(event.key);
                }
            }
            thread::sleep(self.poll);
        }
    }

    pub fn stop(&self) {
        self.lock().stop();
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }
}

impl Keypad for Bridge {
    fn wait_for_key(&self) -> Option<u8> {
        self.block_for_key_press()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    const POLL: Duration = Duration::from_millis(10);

    #[test]
    fn test_drain_applies_in_order() -> Result<()> {
        let bridge = Bridge::new(POLL);
        let mut keys = [false; KEY_COUNT];
        bridge.enqueue(3, true)?;
        bridge.enqueue(4, true)?;
        bridge.enqueue(3, false)?;
        assert!(bridge.sync(&mut keys));
        assert!(!keys[3]);
        assert!(keys[4]);
        assert!(bridge.lock().queued().is_empty());
        Ok(())
    }

    #[test]
    fn test_enqueue_rejects_bad_key() {
        let bridge = Bridge::new(POLL);
        assert!(matches!(
            bridge.enqueue(16, true),
            Err(Chip8Error::InvalidKeyIndex(16))
        ));
        assert!(bridge.lock().queued().is_empty());
    }

    #[test]
    fn test_sync_reports_stop() {
        let bridge = Bridge::new(POLL);
        let mut keys = [false; KEY_COUNT];
        bridge.stop();
        assert!(!bridge.sync(&mut keys));
        assert!(!bridge.is_running());
    }

    #[test]
    fn test_wait_returns_pressed_key() {
        let bridge = Bridge::new(POLL);
        thread::scope(|s| {
            let waiter = s.spawn(|| bridge.block_for_key_press());
            thread::sleep(Duration::from_millis(30));
            bridge.enqueue(0xa, false).unwrap();
            bridge.enqueue(0xa, true).unwrap();
            let started = Instant::now();
            assert_eq!(waiter.join().unwrap(), Some(0xa));
            assert!(started.elapsed() < POLL * 20);
        });
        // the answering event was consumed
        assert!(bridge.lock().queued().is_empty());
    }

    #[test]
    fn test_wait_ignores_stale_press() {
        let bridge = Bridge::new(POLL);
        bridge.enqueue(1, true).unwrap();
        thread::scope(|s| {
            let waiter = s.spawn(|| bridge.block_for_key_press());
            thread::sleep(Duration::from_millis(30));
            bridge.enqueue(2, true).unwrap();
            assert_eq!(waiter.join().unwrap(), Some(2));
        });
    }

    #[test]
    fn test_wait_ignores_releases() {
        let bridge = Bridge::new(POLL);
        thread::scope(|s| {
            let waiter = s.spawn(|| bridge.block_for_key_press());
            thread::sleep(Duration::from_millis(30));
            bridge.enqueue(5, false).unwrap();
            thread::sleep(Duration::from_millis(30));
            assert!(!waiter.is_finished());
            bridge.enqueue(6, true).unwrap();
            assert_eq!(waiter.join().unwrap(), Some(6));
        });
    }

    #[test]
    fn test_stop_unblocks_wait() {
        let bridge = Bridge::new(POLL);
        thread::scope(|s| {
            let waiter = s.spawn(|| bridge.wait_for_key());
            thread::sleep(Duration::from_millis(30));
            bridge.stop();
            assert_eq!(waiter.join().unwrap(), None);
        });
    }
}
