/// # interpreter
///
/// Fetch, decode, execute. Each `step()` runs exactly one instruction:
///
///  1. fetch the big-endian word at pc
///  2. look it up in the instruction table; an unknown opcode is fatal
///  3. execute it; jumps, calls and returns set pc themselves, everything
///     else moves on by 2 (or 4 for a taken skip)
///  4. count both timers down, unless they run off the wall clock instead
///
/// The only instruction that can block is FX0A, which hands off to the
/// `Keypad`. If the machine is shut down while it waits, the step reports
/// `Halted` and leaves pc on the FX0A.
use crate::bridge::Keypad;
use crate::config::{Config, TimerMode};
use crate::error::Result;
use crate::instruction::{Instruction, Opcode};
use crate::memory::{MemoryMap, FONT_ADDR, FONT_GLYPH_BYTES};
use crate::state::{MachineState, FLAG};
use log::trace;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use std::io;

/// what a step did, as far as the driver cares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    /// the framebuffer changed
    Redraw,
    /// FX0A gave up waiting because the machine is stopping
    Halted,
}

/// where pc goes after an instruction
enum Flow {
    Next,
    Skip,
    Goto(u16),
    Redraw,
    Halt,
}

impl Flow {
    fn skip_if(condition: bool) -> Flow {
        if condition {
            Flow::Skip
        } else {
            Flow::Next
        }
    }
}

pub struct Chip8Interpreter<'a> {
    state: MachineState,
    keypad: &'a dyn Keypad,
    rng: StdRng,
    timer_mode: TimerMode,
    seen: BTreeSet<Instruction>,
}

impl<'a> Chip8Interpreter<'a> {
    pub fn new(keypad: &'a dyn Keypad, config: &Config) -> Self {
        Self::with_state(MachineState::new(), keypad, config)
    }

    /// pick up a machine that already has a program loaded
    pub fn with_state(state: MachineState, keypad: &'a dyn Keypad, config: &Config) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Chip8Interpreter {
            state,
            keypad,
            rng,
            timer_mode: config.timer_mode,
            seen: BTreeSet::new(),
        }
    }

    /// load a chip8 program
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize> {
        self.state.memory.load_rom(reader)
    }

    pub fn state(&self) -> &MachineState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut MachineState {
        &mut self.state
    }

    /// every instruction executed so far
    pub fn seen_instructions(&self) -> &BTreeSet<Instruction> {
        &self.seen
    }

    /// one 60Hz timer tick, for when the timers run off the wall clock
    pub fn tick_timers(&mut self) {
        self.state.count_down();
    }

    /// run one instruction. Errors leave the machine as it was before the
    /// failing instruction.
    pub fn step(&mut self) -> Result<StepOutcome> {
        let addr = self.state.pc;
        let opcode = Opcode(self.state.memory.get_word(addr)?);
        let instruction = opcode.decode(addr)?;
        trace!("{:#05x}: {:04x} {:?}", addr, opcode.0, instruction);
        self.seen.insert(instruction);

        let outcome = match self.execute(instruction, opcode)? {
            Flow::Halt => return Ok(StepOutcome::Halted),
            Flow::Next => {
                self.state.pc = addr.wrapping_add(2);
                StepOutcome::Continue
            }
            Flow::Skip => {
                self.state.pc = addr.wrapping_add(4);
                StepOutcome::Continue
            }
            Flow::Goto(target) => {
                self.state.pc = target;
                StepOutcome::Continue
            }
            Flow::Redraw => {
                self.state.pc = addr.wrapping_add(2);
                StepOutcome::Redraw
            }
        };
        if self.timer_mode == TimerMode::PerInstruction {
            self.state.count_down();
        }
        Ok(outcome)
    }

    fn execute(&mut self, instruction: Instruction, op: Opcode) -> Result<Flow> {
        let s = &mut self.state;
        let (x, y) = (op.x(), op.y());
        let (vx, vy) = (s.v[x], s.v[y]);
        Ok(match instruction {
            Instruction::Sys => Flow::Next,
            Instruction::ClearScreen => {
                s.framebuffer.clear();
                Flow::Redraw
            }
            Instruction::Return => Flow::Goto(s.pop()?.wrapping_add(2)),
            Instruction::Jump => Flow::Goto(op.nnn()),
            Instruction::Call => {
                s.push(s.pc)?;
                Flow::Goto(op.nnn())
            }
            Instruction::SkipEqImm => Flow::skip_if(vx == op.nn()),
            Instruction::SkipNeImm => Flow::skip_if(vx != op.nn()),
            Instruction::SkipEqReg => Flow::skip_if(vx == vy),
            Instruction::LoadImm => {
                s.v[x] = op.nn();
                Flow::Next
            }
            Instruction::AddImm => {
                s.v[x] = vx.wrapping_add(op.nn());
                Flow::Next
            }
            Instruction::LoadReg => {
                s.v[x] = vy;
                Flow::Next
            }
            Instruction::Or => {
                s.v[x] = vx | vy;
                Flow::Next
            }
            Instruction::And => {
                s.v[x] = vx & vy;
                Flow::Next
            }
            Instruction::Xor => {
                s.v[x] = vx ^ vy;
                Flow::Next
            }
            Instruction::AddReg => {
                let (sum, carry) = vx.overflowing_add(vy);
                s.v[FLAG] = carry as u8;
                s.v[x] = sum;
                Flow::Next
            }
            Instruction::Sub => {
                // VF is 1 when there is no borrow
                let (diff, borrow) = vx.overflowing_sub(vy);
                s.v[FLAG] = !borrow as u8;
                s.v[x] = diff;
                Flow::Next
            }
            Instruction::ShiftRight => {
                s.v[FLAG] = vx & 0x01;
                s.v[x] = vx >> 1;
                Flow::Next
            }
            Instruction::SubReverse => {
                let (diff, borrow) = vy.overflowing_sub(vx);
                s.v[FLAG] = !borrow as u8;
                s.v[x] = diff;
                Flow::Next
            }
            Instruction::ShiftLeft => {
                s.v[FLAG] = vx >> 7;
                s.v[x] = vx << 1;
                Flow::Next
            }
            Instruction::SkipNeReg => Flow::skip_if(vx != vy),
            Instruction::LoadIndex => {
                s.i = op.nnn();
                Flow::Next
            }
            Instruction::JumpOffset => Flow::Goto(op.nnn() + s.v[0] as u16),
            Instruction::Random => {
                s.v[x] = self.rng.gen_range(0..=op.nn());
                Flow::Next
            }
            Instruction::Draw => {
                let sprite = s.memory.get_ro_slice(s.i, op.n() as usize)?;
                let collision = s.framebuffer.draw_sprite(vx as usize, vy as usize, sprite);
                s.v[FLAG] = collision as u8;
                Flow::Redraw
            }
            Instruction::SkipKeyDown => Flow::skip_if(s.key(vx)?),
            Instruction::SkipKeyUp => Flow::skip_if(!s.key(vx)?),
            Instruction::LoadDelay => {
                s.v[x] = s.delay_timer;
                Flow::Next
            }
            Instruction::WaitKey => match self.keypad.wait_for_key() {
                Some(key) => {
                    s.v[x] = key;
                    Flow::Next
                }
                None => Flow::Halt,
            },
            Instruction::SetDelay => {
                s.delay_timer = vx;
                Flow::Next
            }
            Instruction::SetSound => {
                s.sound_timer = vx;
                Flow::Next
            }
            Instruction::AddIndex => {
                // NB. wraps modulo 0xfff, not 0x1000; existing ROMs were run
                // against this
                let sum = s.i as u32 + vx as u32;
                s.v[FLAG] = (sum > 0xfff) as u8;
                s.i = (sum % 0xfff) as u16;
                Flow::Next
            }
            Instruction::FontGlyph => {
                s.i = FONT_ADDR + FONT_GLYPH_BYTES * (vx & 0x0f) as u16;
                Flow::Next
            }
            Instruction::Bcd => {
                s.memory.write(&[vx / 100, vx / 10 % 10, vx % 10], s.i)?;
                Flow::Next
            }
            Instruction::StoreRegs => {
                s.memory.write(&s.v[..=x], s.i)?;
                Flow::Next
            }
            Instruction::LoadRegs => {
                let bytes = s.memory.get_ro_slice(s.i, x + 1)?;
                s.v[..=x].copy_from_slice(bytes);
                Flow::Next
            }
        })
    }
}
