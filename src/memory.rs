use crate::error::{Chip8Error, Result};
use std::io;

// NB. addresses are u16 as per the chip-8; lengths are usize to stop endless casting

/// Represents the addressable memory of the machine
pub trait MemoryMap {
    /// write a chunk of bytes into "RAM"
    fn write(&mut self, data: &[u8], addr: u16) -> Result<()> {
        let bytes = self.get_rw_slice(addr, data.len())?;
        bytes.copy_from_slice(data);
        Ok(())
    }

    /// get a big-endian two-byte word (opcodes)
    fn get_word(&self, addr: u16) -> Result<u16> {
        let word = self.get_ro_slice(addr, 2)?;
        Ok(u16::from_be_bytes([word[0], word[1]]))
    }

    /// get a r/w slice of the underlying memory
    fn get_rw_slice(&mut self, addr: u16, len: usize) -> Result<&mut [u8]>;

    /// get a r/o slice of the underlying memory
    fn get_ro_slice(&self, addr: u16, len: usize) -> Result<&[u8]>;
}

/// how much RAM we have
pub const RAM_SIZE_BYTES: usize = 4096;

/// where the program is loaded
pub const PROGRAM_ADDR: u16 = 0x0200;

/// the largest ROM that fits between the program address and the top of RAM
pub const MAX_ROM_BYTES: usize = RAM_SIZE_BYTES - PROGRAM_ADDR as usize;

/// where the hex digit glyphs live; FX29 points I in here
pub const FONT_ADDR: u16 = 0x050;

/// bytes per glyph
pub const FONT_GLYPH_BYTES: u16 = 5;

/// 4K of RAM. 0x000-0x1ff belongs to the interpreter (only the font is used
/// here), programs live from 0x200 up
pub struct Memory {
    bytes: Box<[u8]>,
}

impl MemoryMap for Memory {
    fn get_rw_slice(&mut self, addr: u16, len: usize) -> Result<&mut [u8]> {
        let a = addr as usize;
        check_range(a, len)?;
        Ok(&mut self.bytes[a..(a + len)])
    }

    fn get_ro_slice(&self, addr: u16, len: usize) -> Result<&[u8]> {
        let a = addr as usize;
        check_range(a, len)?;
        Ok(&self.bytes[a..(a + len)])
    }
}

fn check_range(addr: usize, len: usize) -> Result<()> {
    if addr + len > RAM_SIZE_BYTES {
        // report the first byte that doesn't exist
        return Err(Chip8Error::AddressOutOfRange {
            addr: addr.max(RAM_SIZE_BYTES),
        });
    }
    Ok(())
}

impl Memory {
    /// zeroed memory with the font baked in
    pub fn new() -> Self {
        let mut bytes = vec![0u8; RAM_SIZE_BYTES].into_boxed_slice();
        let font = FONT_ADDR as usize;
        bytes[font..font + CHIP8_FONT.len()].copy_from_slice(&CHIP8_FONT);
        Memory { bytes }
    }

    /// load a CHIP-8 program at 0x200, refusing anything that won't fit
    pub fn load_rom(&mut self, reader: &mut impl io::Read) -> Result<usize> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).map_err(Chip8Error::RomRead)?;
        if buf.len() > MAX_ROM_BYTES {
            return Err(Chip8Error::RomTooLarge {
                size: buf.len(),
                max: MAX_ROM_BYTES,
            });
        }
        self.write(&buf, PROGRAM_ADDR)?;
        Ok(buf.len())
    }

    pub fn get(&self, addr: u16) -> Result<u8> {
        Ok(self.get_ro_slice(addr, 1)?[0])
    }

    pub fn set(&mut self, addr: u16, value: u8) -> Result<()> {
        self.get_rw_slice(addr, 1)?[0] = value;
        Ok(())
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

#[rustfmt::skip]
const CHIP8_FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_zeroed() {
        let m = Memory::new();
        // NB. memory is zeroed from 0x200 because before that we bake in the font
        assert_eq!(m.bytes[0x200..], [0; 0xe00]);
        assert_eq!(m.bytes[..0x50], [0; 0x50]);
    }

    #[test]
    fn test_font_baked_in() -> Result<()> {
        let m = Memory::new();
        // glyph for 'A'
        assert_eq!(
            m.get_ro_slice(FONT_ADDR + 10 * FONT_GLYPH_BYTES, 5)?,
            &[0xF0, 0x90, 0xF0, 0x90, 0x90]
        );
        Ok(())
    }

    #[test]
    fn test_write_slice_ok() -> Result<()> {
        let mut dst = Memory::new();
        dst.write(&[0, 1, 2, 3, 4, 5, 6, 7], 0x300)?;
        assert_eq!(dst.bytes[0x2f8..0x308], [0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 2, 3, 4, 5, 6, 7]);
        Ok(())
    }

    #[test]
    fn test_read_word() -> Result<()> {
        let mut m = Memory::new();
        m.write(&[0, 1, 2, 3, 4, 5, 6, 7], 0x400)?;
        assert_eq!(m.get_word(0x404)?, 0x0405);
        Ok(())
    }

    #[test]
    fn test_read_past_end_fails() {
        let m = Memory::new();
        assert!(m.get_word(0xfff).is_err());
        assert!(matches!(
            m.get(0x1000),
            Err(Chip8Error::AddressOutOfRange { addr: 0x1000 })
        ));
    }

    #[test]
    fn test_write_past_end_fails() {
        let mut m = Memory::new();
        assert!(m.write(&[0; 8], 4089).is_err());
        // nothing partially written
        assert_eq!(m.bytes[4089..], [0; 7]);
    }

    #[test]
    fn test_program_load_ok() -> Result<()> {
        let mut dst = Memory::new();
        let mut prog: &[u8] = &[0x00, 0xe0]; // clear screen
        assert_eq!(dst.load_rom(&mut prog)?, 2);
        assert_eq!(dst.get_ro_slice(0x200, 2)?, &[0x00, 0xe0]);
        Ok(())
    }

    #[test]
    fn test_program_fills_memory() -> Result<()> {
        let mut dst = Memory::new();
        let rom = vec![0xaa; MAX_ROM_BYTES];
        dst.load_rom(&mut rom.as_slice())?;
        assert_eq!(dst.get(0xfff)?, 0xaa);
        Ok(())
    }

    #[test]
    fn test_program_too_large() {
        let mut dst = Memory::new();
        let rom = vec![0xaa; MAX_ROM_BYTES + 1];
        match dst.load_rom(&mut rom.as_slice()) {
            Err(Chip8Error::RomTooLarge { size, max }) => {
                assert_eq!(size, 3585);
                assert_eq!(max, 3584);
            }
            other => panic!("expected RomTooLarge, got {:?}", other.map(|_| ())),
        }
        assert_eq!(dst.bytes[0x200], 0);
    }

    #[test]
    fn test_program_read_error() {
        struct Broken;
        impl io::Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "disk on fire"))
            }
        }
        let mut dst = Memory::new();
        assert!(matches!(
            dst.load_rom(&mut Broken),
            Err(Chip8Error::RomRead(_))
        ));
    }
}
