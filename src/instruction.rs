//! # instruction
//!
//! The 35 standard CHIP-8 instructions, and the table that maps an opcode to
//! one of them. Each entry is (mask, pattern, id): the first entry where
//! `opcode & mask == pattern` wins, so fully-specified opcodes (00E0, 00EE)
//! must come before the general family they belong to (0NNN).
use crate::error::{Chip8Error, Result};

/// Identifies an instruction; named after the opcode family it decodes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Instruction {
    /// 0NNN machine code routine; ignored
    Sys,
    /// 00E0
    ClearScreen,
    /// 00EE
    Return,
    /// 1NNN
    Jump,
    /// 2NNN
    Call,
    /// 3XNN
    SkipEqImm,
    /// 4XNN
    SkipNeImm,
    /// 5XY0
    SkipEqReg,
    /// 6XNN
    LoadImm,
    /// 7XNN
    AddImm,
    /// 8XY0
    LoadReg,
    /// 8XY1
    Or,
    /// 8XY2
    And,
    /// 8XY3
    Xor,
    /// 8XY4
    AddReg,
    /// 8XY5
    Sub,
    /// 8XY6
    ShiftRight,
    /// 8XY7
    SubReverse,
    /// 8XYE
    ShiftLeft,
    /// 9XY0
    SkipNeReg,
    /// ANNN
    LoadIndex,
    /// BNNN
    JumpOffset,
    /// CXNN
    Random,
    /// DXYN
    Draw,
    /// EX9E
    SkipKeyDown,
    /// EXA1
    SkipKeyUp,
    /// FX07
    LoadDelay,
    /// FX0A
    WaitKey,
    /// FX15
    SetDelay,
    /// FX18
    SetSound,
    /// FX1E
    AddIndex,
    /// FX29
    FontGlyph,
    /// FX33
    Bcd,
    /// FX55
    StoreRegs,
    /// FX65
    LoadRegs,
}

use Instruction::*;

#[rustfmt::skip]
pub const INSTRUCTION_TABLE: [(u16, u16, Instruction); 35] = [
    (0xFFFF, 0x00E0, ClearScreen),
    (0xFFFF, 0x00EE, Return),
    (0xF000, 0x0000, Sys),         // must follow 00E0 and 00EE
    (0xF000, 0x1000, Jump),
    (0xF000, 0x2000, Call),
    (0xF000, 0x3000, SkipEqImm),
    (0xF000, 0x4000, SkipNeImm),
    (0xF00F, 0x5000, SkipEqReg),
    (0xF000, 0x6000, LoadImm),
    (0xF000, 0x7000, AddImm),
    (0xF00F, 0x8000, LoadReg),
    (0xF00F, 0x8001, Or),
    (0xF00F, 0x8002, And),
    (0xF00F, 0x8003, Xor),
    (0xF00F, 0x8004, AddReg),
    (0xF00F, 0x8005, Sub),
    (0xF00F, 0x8006, ShiftRight),
    (0xF00F, 0x8007, SubReverse),
    (0xF00F, 0x800E, ShiftLeft),
    (0xF00F, 0x9000, SkipNeReg),
    (0xF000, 0xA000, LoadIndex),
    (0xF000, 0xB000, JumpOffset),
    (0xF000, 0xC000, Random),
    (0xF000, 0xD000, Draw),
    (0xF0FF, 0xE09E, SkipKeyDown),
    (0xF0FF, 0xE0A1, SkipKeyUp),
    (0xF0FF, 0xF007, LoadDelay),
    (0xF0FF, 0xF00A, WaitKey),
    (0xF0FF, 0xF015, SetDelay),
    (0xF0FF, 0xF018, SetSound),
    (0xF0FF, 0xF01E, AddIndex),
    (0xF0FF, 0xF029, FontGlyph),
    (0xF0FF, 0xF033, Bcd),
    (0xF0FF, 0xF055, StoreRegs),
    (0xF0FF, 0xF065, LoadRegs),
];

/// look an opcode up in the instruction table
pub fn lookup(opcode: u16) -> Option<Instruction> {
    INSTRUCTION_TABLE
        .iter()
        .find(|(mask, pattern, _)| opcode & mask == *pattern)
        .map(|&(_, _, id)| id)
}

/// A fetched 16-bit instruction word, with accessors for its nibble fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode(pub u16);

impl Opcode {
    pub fn x(self) -> usize {
        ((self.0 & 0x0F00) >> 8) as usize
    }

    pub fn y(self) -> usize {
        ((self.0 & 0x00F0) >> 4) as usize
    }

    pub fn n(self) -> u8 {
        (self.0 & 0x000F) as u8
    }

    pub fn nn(self) -> u8 {
        (self.0 & 0x00FF) as u8
    }

    pub fn nnn(self) -> u16 {
        self.0 & 0x0FFF
    }

    /// decode, with `addr` recorded for the error
    pub fn decode(self, addr: u16) -> Result<Instruction> {
        lookup(self.0).ok_or(Chip8Error::Decode {
            opcode: self.0,
            addr,
        })
    }
}
