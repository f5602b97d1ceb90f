use std::collections::BTreeSet;
use std::error::Error;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chip8_vm::config::{
    check_rate, Config, TimerMode, DEFAULT_FRAMES_PER_SECOND, DEFAULT_INSTRUCTIONS_PER_SECOND,
};
use chip8_vm::display::MonoTermDisplay;
use chip8_vm::driver::{self, Devices};
use chip8_vm::input::TermInput;
use chip8_vm::instruction::Instruction;
use chip8_vm::keymap::KeyMap;
use chip8_vm::sound::{Mute, SimpleBeep, Sound};
use chip8_vm::state::MachineState;
use chip8_vm::{Chip8Error, Result};
use clap::{Parser, ValueEnum};
use log::{debug, error, info};

/// where the keymap is read from, or captured to on first run
const DEFAULT_KEYMAP_FILE: &str = ".chip8_keymap.txt";

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Timers {
    /// count down once per instruction
    PerInstruction,
    /// count down at 60Hz
    WallClock,
}

/// Run a CHIP-8 program in the terminal. Escape quits.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// the ROM to run
    rom: PathBuf,

    #[arg(long, default_value_t = DEFAULT_INSTRUCTIONS_PER_SECOND, value_parser = parse_rate, help = "Instructions per second")]
    ips: f64,

    #[arg(long, default_value_t = DEFAULT_FRAMES_PER_SECOND, value_parser = parse_rate, help = "Frames per second")]
    fps: f64,

    #[arg(long, value_enum, default_value_t = Timers::PerInstruction, help = "How the delay and sound timers count down")]
    timers: Timers,

    #[arg(long, default_value = DEFAULT_KEYMAP_FILE, help = "Keymap file, one key code per line; captured interactively if missing")]
    keymap: PathBuf,

    #[arg(long, help = "Sound the PC speaker while the sound timer runs")]
    beep: bool,

    #[arg(long, help = "Seed for the random number instruction")]
    seed: Option<u64>,
}

/// a loop rate from the command line: finite and above zero
fn parse_rate(s: &str) -> std::result::Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("{}", e))?;
    check_rate("rate", value).map_err(|e| e.to_string())
}

impl Args {
    fn config(&self) -> Config {
        Config {
            instructions_per_second: self.ips,
            frames_per_second: self.fps,
            timer_mode: match self.timers {
                Timers::PerInstruction => TimerMode::PerInstruction,
                Timers::WallClock => TimerMode::WallClock,
            },
            seed: self.seed,
            ..Config::default()
        }
    }
}

fn main() -> std::result::Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    let config = args.config();

    // load a program before touching the terminal
    let mut state = MachineState::new();
    let mut f = File::open(&args.rom).map_err(Chip8Error::RomRead)?;
    let size = state.memory.load_rom(&mut f)?;
    info!("loaded {} bytes from {}", size, args.rom.display());

    let seen = emulate(&args, &config, state)?;
    debug!("instructions executed: {:?}", seen);

    // shove some junk on stdout to stop the cli messing up the last frame
    println!();
    println!();
    Ok(())
}

/// everything that needs the terminal in raw mode
fn emulate(args: &Args, config: &Config, state: MachineState) -> Result<BTreeSet<Instruction>> {
    let mut input = TermInput::new(config.key_hold)?;
    let keymap = if args.keymap.exists() {
        KeyMap::load(&args.keymap)?
    } else {
        capture_keymap(&mut input, &args.keymap)?
    };
    let mut display = MonoTermDisplay::new()?;
    let (mut beeper, mut mute) = (SimpleBeep::new(), Mute::new());
    let sound: &mut dyn Sound = if args.beep { &mut beeper } else { &mut mute };

    let devices = Devices {
        display: &mut display,
        input: &mut input,
        sound,
    };
    driver::run(config, state, &keymap, devices)
}

/// ask for each of the 16 keys in turn, then save the result
fn capture_keymap(input: &mut TermInput, path: &Path) -> Result<KeyMap> {
    // raw mode: no automatic carriage returns
    print!("no keymap file, creating one...\r\n");
    let presses = std::iter::from_fn(|| match input.wait_press() {
        Ok(code) => code,
        Err(e) => {
            error!("reading keyboard: {}", e);
            None
        }
    });
    let keymap = KeyMap::capture(
        presses,
        |key| {
            print!("press the key for {:X}\r\n", key);
            let _ = io::stdout().flush();
        },
        |code| {
            let key = char::from_u32(code).unwrap_or('?');
            print!("{:?} is already taken, choose another one\r\n", key);
        },
    )?;
    keymap.save(path)?;
    info!("saved keymap to {}", path.display());
    Ok(keymap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["chip8-vm", "pong.ch8"]).unwrap();
        assert_eq!(args.keymap, PathBuf::from(DEFAULT_KEYMAP_FILE));
        assert_eq!(args.config(), Config::default());
    }

    #[test]
    fn test_rejects_unusable_rates() {
        for bad in ["0", "-1", "NaN", "inf", "fast"] {
            assert!(Args::try_parse_from(["chip8-vm", "pong.ch8", "--ips", bad]).is_err());
            assert!(Args::try_parse_from(["chip8-vm", "pong.ch8", "--fps", bad]).is_err());
        }
        let args = Args::try_parse_from(["chip8-vm", "pong.ch8", "--ips", "700", "--fps", "30"]).unwrap();
        assert_eq!(args.config().instructions_per_second, 700.0);
        assert_eq!(args.config().frames_per_second, 30.0);
    }
}
