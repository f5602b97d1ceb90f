use crate::error::{Chip8Error, Result};
use crate::state::KEY_COUNT;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

/// left-hand side of a qwerty keyboard, laid out like the COSMAC hex keypad:
///
/// ```text
/// 1 2 3 C      1 2 3 4
/// 4 5 6 D      q w e r
/// 7 8 9 E      a s d f
/// A 0 B F      z x c v
/// ```
const CHIP8_CONVENTIONAL_KEYMAP: [char; KEY_COUNT] = [
    'x', // 0
    '1', // 1
    '2', // 2
    '3', // 3
    'q', // 4
    'w', // 5
    'e', // 6
    'a', // 7
    's', // 8
    'd', // 9
    'z', // a
    'c', // b
    '4', // c
    'r', // d
    'f', // e
    'v', // f
];

/// Which physical key stands in for each of the 16 logical keys. Physical
/// keys are identified by a number; for a terminal that's the character's
/// code point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMap {
    codes: [u32; KEY_COUNT],
}

impl KeyMap {
    pub fn conventional() -> Self {
        KeyMap {
            codes: CHIP8_CONVENTIONAL_KEYMAP.map(u32::from),
        }
    }

    /// the logical key a physical key maps to, if any
    pub fn lookup(&self, code: u32) -> Option<u8> {
        self.codes.iter().position(|&c| c == code).map(|k| k as u8)
    }

    /// the physical key for logical key `key`
    pub fn code(&self, key: u8) -> Result<u32> {
        self.codes
            .get(key as usize)
            .copied()
            .ok_or(Chip8Error::InvalidKeyIndex(key))
    }

    /// one decimal code per line, line n for logical key n
    pub fn read_from(reader: impl io::Read) -> Result<Self> {
        let mut lines = BufReader::new(reader).lines();
        let mut codes = [0u32; KEY_COUNT];
        for (n, code) in codes.iter_mut().enumerate() {
            let line = lines.next().ok_or_else(|| Chip8Error::KeyMap {
                line: n + 1,
                reason: format!("expected {} lines", KEY_COUNT),
            })??;
            *code = line.trim().parse().map_err(|e| Chip8Error::KeyMap {
                line: n + 1,
                reason: format!("{:?} is not a key code: {}", line, e),
            })?;
        }
        Self::from_codes(codes)
    }

    pub fn write_to(&self, mut writer: impl io::Write) -> Result<()> {
        for code in self.codes {
            writeln!(writer, "{}", code)?;
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::read_from(File::open(path)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut f = File::create(path)?;
        self.write_to(&mut f)?;
        f.flush()?;
        Ok(())
    }

    /// Build a map from a stream of key presses, assigning logical keys 0-F
    /// in order. A key that is already taken is skipped and `rejected` is
    /// told about it. Runs out if the stream ends before all 16 are assigned.
    pub fn capture(
        presses: impl IntoIterator<Item = u32>,
        mut prompt: impl FnMut(u8),
        mut rejected: impl FnMut(u32),
    ) -> Result<Self> {
        let mut codes = Vec::with_capacity(KEY_COUNT);
        let mut presses = presses.into_iter();
        while codes.len() < KEY_COUNT {
            prompt(codes.len() as u8);
            let code = loop {
                let code = presses.next().ok_or_else(|| {
                    io::Error::new(io::ErrorKind::UnexpectedEof, "key capture abandoned")
                })?;
                if codes.contains(&code) {
                    rejected(code);
                } else {
                    break code;
                }
            };
            codes.push(code);
        }
        let mut all = [0u32; KEY_COUNT];
        all.copy_from_slice(&codes);
        Ok(KeyMap { codes: all })
    }

    fn from_codes(codes: [u32; KEY_COUNT]) -> Result<Self> {
        for (n, code) in codes.iter().enumerate() {
            if codes[..n].contains(code) {
                return Err(Chip8Error::KeyMap {
                    line: n + 1,
                    reason: format!("key code {} is used twice", code),
                });
            }
        }
        Ok(KeyMap { codes })
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        Self::conventional()
    }
}
