use crate::error::Result;
use crate::screen::{Framebuffer, SCREEN_HEIGHT, SCREEN_WIDTH};
use std::io;
use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders};
use tui::Terminal;

/// Display is used by the render loop to put the framebuffer on a screen. It
/// should abstract the implementation details, so a variety of kinds of
/// screen would work.
pub trait Display {
    /// draw one frame
    fn draw(&mut self, frame: &Framebuffer) -> Result<()>;
}

// store useful metadata about the canvas
struct Resolution(usize, usize);

impl Resolution {
    fn pixel_count(&self) -> usize {
        self.0 * self.1
    }

    fn x_bounds(&self) -> [f64; 2] {
        [0.0, (self.0 - 1) as f64]
    }

    fn y_bounds(&self) -> [f64; 2] {
        [-1.0 * (self.1 - 1) as f64, 0.0]
    }

    /// canvas coordinates of every pixel that is (or isn't) lit; y grows
    /// downwards on the CHIP-8 but upwards on the canvas
    fn bitplane(&self, frame: &Framebuffer, lit: bool) -> Vec<(f64, f64)> {
        let w = self.0;
        (0..self.pixel_count())
            .map(|n| (n % w, n / w))
            .filter(|&(x, y)| frame.get(x, y) == lit)
            .map(|(x, y)| (x as f64, -1.0 * y as f64))
            .collect()
    }
}

/// monochrome display in a terminal, rendered using TUI and crossterm
pub struct MonoTermDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    resolution: Resolution,
}

impl MonoTermDisplay {
    pub fn new() -> Result<MonoTermDisplay> {
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        terminal.hide_cursor()?;
        Ok(MonoTermDisplay {
            terminal,
            resolution: Resolution(SCREEN_WIDTH, SCREEN_HEIGHT),
        })
    }
}

impl Drop for MonoTermDisplay {
    fn drop(&mut self) {
        let _ = self.terminal.show_cursor();
    }
}

impl Display for MonoTermDisplay {
    fn draw(&mut self, frame: &Framebuffer) -> Result<()> {
        let resolution = &self.resolution;
        let off = resolution.bitplane(frame, false);
        let on = resolution.bitplane(frame, true);

        // for now this assumes a 1:1 ratio between terminal, chip8 and the
        // internal TUI canvas
        self.terminal.draw(|f| {
            let size = Rect::new(0, 0, 2 + resolution.0 as u16, 2 + resolution.1 as u16);

            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title("CHIP-8")
                        .borders(Borders::ALL)
                        .style(Style::default().bg(Color::Black)),
                )
                .x_bounds(resolution.x_bounds())
                .y_bounds(resolution.y_bounds())
                .marker(Marker::Block)
                .paint(|ctx| {
                    ctx.draw(&Points {
                        coords: &off,
                        color: Color::Black,
                    });
                    ctx.draw(&Points {
                        coords: &on,
                        color: Color::White,
                    });
                });
            f.render_widget(canvas, size);
        })?;
        Ok(())
    }
}

/// useful for testing non-display routines; remembers the last frame
pub struct DummyDisplay {
    pub frames: usize,
    pub last: Framebuffer,
}

impl DummyDisplay {
    pub fn new() -> DummyDisplay {
        DummyDisplay {
            frames: 0,
            last: Framebuffer::new(),
        }
    }
}

impl Default for DummyDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for DummyDisplay {
    fn draw(&mut self, frame: &Framebuffer) -> Result<()> {
        self.frames += 1;
        self.last = *frame;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Resolution tests
    #[test]
    fn test_pixel_count() {
        let r = Resolution(64, 32);
        assert_eq!(r.pixel_count(), 2048)
    }

    #[test]
    fn test_x_bounds() {
        let r = Resolution(64, 32);
        assert_eq!(r.x_bounds(), [0.0, 63.0]);
    }

    #[test]
    fn test_y_bounds() {
        let r = Resolution(64, 32);
        assert_eq!(r.y_bounds(), [-31.0, 0.0]);
    }

    #[test]
    fn test_bitplanes_partition_the_screen() {
        let r = Resolution(64, 32);
        let mut fb = Framebuffer::new();
        fb.flip(0, 0);
        fb.flip(63, 31);
        let on = r.bitplane(&fb, true);
        assert_eq!(on, [(0.0, 0.0), (63.0, -31.0)]);
        assert_eq!(r.bitplane(&fb, false).len(), 2046);
    }

    #[test]
    fn test_dummy_display_keeps_last_frame() -> Result<()> {
        let mut d = DummyDisplay::new();
        let mut fb = Framebuffer::new();
        fb.flip(5, 5);
        d.draw(&fb)?;
        assert_eq!(d.frames, 1);
        assert_eq!(d.last, fb);
        Ok(())
    }

    #[test]
    #[ignore]
    // NB. needs a real terminal
    fn test_draw_blank_frame() -> Result<()> {
        let mut d = MonoTermDisplay::new()?;
        d.draw(&Framebuffer::new())
    }
}
