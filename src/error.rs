use std::io;
use thiserror::Error;

/// Everything that can stop the machine. None of these are retried: CHIP-8
/// has no notion of a transient failure.
#[derive(Debug, Error)]
pub enum Chip8Error {
    #[error("unknown opcode {opcode:#06x} at {addr:#05x}")]
    Decode { opcode: u16, addr: u16 },

    #[error("stack overflow calling from {addr:#05x}")]
    StackOverflow { addr: u16 },

    #[error("stack underflow returning from {addr:#05x}")]
    StackUnderflow { addr: u16 },

    #[error("ROM is {size} bytes, at most {max} fit in memory")]
    RomTooLarge { size: usize, max: usize },

    #[error("can't read ROM: {0}")]
    RomRead(#[source] io::Error),

    #[error("key index {0:#04x} is outside the 16-key keypad")]
    InvalidKeyIndex(u8),

    #[error("memory access at {addr:#06x} is outside the 4K address space")]
    AddressOutOfRange { addr: usize },

    #[error("{name} must be a finite number above zero, not {value}")]
    InvalidRate { name: &'static str, value: f64 },

    #[error("keymap line {line}: {reason}")]
    KeyMap { line: usize, reason: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Chip8Error>;
