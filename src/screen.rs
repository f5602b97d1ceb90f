use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

pub const SCREEN_WIDTH: usize = 64;
pub const SCREEN_HEIGHT: usize = 32;

/// 64x32 monochrome pixels, one u64 per row with x=0 in the most
/// significant bit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Framebuffer {
    rows: [u64; SCREEN_HEIGHT],
}

impl Framebuffer {
    pub fn new() -> Self {
        Framebuffer {
            rows: [0; SCREEN_HEIGHT],
        }
    }

    pub fn clear(&mut self) {
        self.rows = [0; SCREEN_HEIGHT];
    }

    /// coordinates wrap rather than clip
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.rows[y % SCREEN_HEIGHT] & column_bit(x) != 0
    }

    /// XOR one pixel, returning true if it was on and is now off
    pub fn flip(&mut self, x: usize, y: usize) -> bool {
        let row = &mut self.rows[y % SCREEN_HEIGHT];
        let bit = column_bit(x);
        let was_on = *row & bit != 0;
        *row ^= bit;
        was_on
    }

    /// XOR an 8-pixel-wide sprite in at (x0, y0), one byte per row with the
    /// most significant bit leftmost. Returns the collision flag: true if any
    /// pixel was turned off.
    pub fn draw_sprite(&mut self, x0: usize, y0: usize, sprite: &[u8]) -> bool {
        let mut collision = false;
        for (row, byte) in sprite.iter().enumerate() {
            for bit in 0..8 {
                if byte & (0x80 >> bit) != 0 {
                    collision |= self.flip(x0 + bit, y0 + row);
                }
            }
        }
        collision
    }

    pub fn row(&self, y: usize) -> u64 {
        self.rows[y]
    }

    /// every lit pixel as (x, y)
    pub fn lit(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..SCREEN_HEIGHT).flat_map(move |y| {
            (0..SCREEN_WIDTH)
                .filter(move |&x| self.get(x, y))
                .map(move |x| (x, y))
        })
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

fn column_bit(x: usize) -> u64 {
    1 << (SCREEN_WIDTH - 1 - x % SCREEN_WIDTH)
}

/// The front buffer the render thread reads. The simulation publishes its
/// own framebuffer here after each change; rows are stored independently so
/// a reader can see a frame that is half old, half new. That tearing is
/// accepted: it only lasts until the next frame.
pub struct SharedScreen {
    rows: [AtomicU64; SCREEN_HEIGHT],
    buzzer: AtomicBool,
}

impl SharedScreen {
    pub fn new() -> Self {
        SharedScreen {
            rows: std::array::from_fn(|_| AtomicU64::new(0)),
            buzzer: AtomicBool::new(false),
        }
    }

    pub fn publish(&self, frame: &Framebuffer) {
        for (shared, row) in self.rows.iter().zip(frame.rows.iter()) {
            shared.store(*row, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> Framebuffer {
        Framebuffer {
            rows: std::array::from_fn(|y| self.rows[y].load(Ordering::Relaxed)),
        }
    }

    /// the sound timer is running
    pub fn set_buzzer(&self, on: bool) {
        self.buzzer.store(on, Ordering::Relaxed);
    }

    pub fn buzzer(&self) -> bool {
        self.buzzer.load(Ordering::Relaxed)
    }
}

impl Default for SharedScreen {
    fn default() -> Self {
        Self::new()
    }
}
