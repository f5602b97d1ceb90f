//! # state
//!
//! Everything the CHIP-8 program can see: memory, the V registers, I, the
//! call stack, the program counter, both timers and the keypad. Only the
//! interpreter mutates it; the render thread never touches it directly.
use crate::error::{Chip8Error, Result};
use crate::memory::{Memory, PROGRAM_ADDR};
use crate::screen::Framebuffer;

pub const REGISTER_COUNT: usize = 16;
pub const STACK_DEPTH: usize = 16;
pub const KEY_COUNT: usize = 16;

/// VF doubles as the carry/borrow/collision flag
pub const FLAG: usize = 0xF;

pub struct MachineState {
    pub memory: Memory,
    pub v: [u8; REGISTER_COUNT],
    /// 12 bits are meaningful
    pub i: u16,
    stack: [u16; STACK_DEPTH],
    stack_depth: usize,
    pub pc: u16,
    pub delay_timer: u8,
    pub sound_timer: u8,
    pub keys: [bool; KEY_COUNT],
    pub framebuffer: Framebuffer,
}

impl MachineState {
    pub fn new() -> Self {
        MachineState {
            memory: Memory::new(),
            v: [0; REGISTER_COUNT],
            i: 0,
            stack: [0; STACK_DEPTH],
            stack_depth: 0,
            pc: PROGRAM_ADDR,
            delay_timer: 0,
            sound_timer: 0,
            keys: [false; KEY_COUNT],
            framebuffer: Framebuffer::new(),
        }
    }

    /// back to power-on: everything zeroed, the font reloaded, pc at 0x200
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn push(&mut self, addr: u16) -> Result<()> {
        if self.stack_depth == STACK_DEPTH {
            return Err(Chip8Error::StackOverflow { addr: self.pc });
        }
        self.stack[self.stack_depth] = addr;
        self.stack_depth += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<u16> {
        if self.stack_depth == 0 {
            return Err(Chip8Error::StackUnderflow { addr: self.pc });
        }
        self.stack_depth -= 1;
        Ok(self.stack[self.stack_depth])
    }

    pub fn stack(&self) -> &[u16] {
        &self.stack[..self.stack_depth]
    }

    /// is logical key `k` held down?
    pub fn key(&self, k: u8) -> Result<bool> {
        self.keys
            .get(k as usize)
            .copied()
            .ok_or(Chip8Error::InvalidKeyIndex(k))
    }

    /// both timers count down to zero and stay there
    pub fn count_down(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }
}

impl Default for MachineState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryMap;

    #[test]
    fn test_power_on() {
        let s = MachineState::new();
        assert_eq!(s.pc, 0x200);
        assert_eq!(s.v, [0; 16]);
        assert_eq!(s.i, 0);
        assert!(s.stack().is_empty());
        assert_eq!(s.keys, [false; 16]);
    }

    #[test]
    fn test_reset() -> Result<()> {
        let mut s = MachineState::new();
        s.v[3] = 9;
        s.pc = 0x300;
        s.push(0x202)?;
        s.memory.set(0x200, 0x12)?;
        s.framebuffer.flip(1, 1);
        s.reset();
        assert_eq!(s.pc, 0x200);
        assert_eq!(s.v[3], 0);
        assert!(s.stack().is_empty());
        assert_eq!(s.memory.get_word(0x200)?, 0);
        assert_eq!(s.framebuffer, Framebuffer::new());
        Ok(())
    }

    #[test]
    fn test_stack_limits() -> Result<()> {
        let mut s = MachineState::new();
        assert!(matches!(s.pop(), Err(Chip8Error::StackUnderflow { .. })));
        for n in 0..16 {
            s.push(0x200 + n * 2)?;
        }
        assert!(matches!(s.push(0x300), Err(Chip8Error::StackOverflow { .. })));
        assert_eq!(s.stack().len(), 16);
        assert_eq!(s.pop()?, 0x21e);
        Ok(())
    }

    #[test]
    fn test_timer_floor() {
        let mut s = MachineState::new();
        s.delay_timer = 1;
        s.count_down();
        assert_eq!(s.delay_timer, 0);
        assert_eq!(s.sound_timer, 0);
        s.count_down();
        assert_eq!(s.delay_timer, 0);
        assert_eq!(s.sound_timer, 0);
    }

    #[test]
    fn test_key_index_checked() {
        let mut s = MachineState::new();
        s.keys[0xf] = true;
        assert!(s.key(0xf).unwrap());
        assert!(matches!(s.key(0x10), Err(Chip8Error::InvalidKeyIndex(0x10))));
    }
}
