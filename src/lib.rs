//!
//! ## Design
//!
//! * a plain CHIP-8: no SUPER-CHIP or XO-CHIP extensions
//! * one instruction per step, looked up in an ordered (mask, pattern) table
//! * the program runs on its own thread at a fixed instruction rate; input
//!   and rendering run on another at a fixed frame rate
//! * abstract display, input and sound so alternatives can be plugged in;
//!   starting with TUI in-console
//!
//! Model
//!
//! ```text
//! main
//!  |-- config, keymap, display, input, sound
//!  |-- machine state, with the ROM loaded at 0x200
//!  `-- driver::run
//!       |-- simulation thread
//!       |    |-- bridge.sync(keys)      // drain queued key transitions
//!       |    |-- interpreter.step()     // fetch/decode/execute, timers
//!       |    `-- screen.publish(fb)     // when the framebuffer changed
//!       `-- render thread (this one)
//!            |-- input.poll() -> keymap -> bridge.enqueue
//!            |-- display.draw(screen.snapshot())
//!            `-- sound on/off with the sound timer
//! ```
//!
//! Timing compromises:
//!
//! * by default the delay and sound timers count down once per instruction,
//!   not at 60Hz; at the default 1000 instructions/s they run ~16x fast.
//!   `TimerMode::WallClock` decouples them
//! * the render thread can see a frame that is part-way through being
//!   published; it is corrected on the next frame
pub mod bridge;
pub mod config;
pub mod display;
pub mod driver;
pub mod error;
pub mod input;
pub mod instruction;
pub mod interpreter;
pub mod keymap;
pub mod memory;
pub mod screen;
pub mod sound;
pub mod state;

pub use error::{Chip8Error, Result};
