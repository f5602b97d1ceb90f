//! # driver
//!
//! Two loops, one per thread:
//!
//! * the simulation runs the interpreter as close to the configured
//!   instruction rate as the host allows, publishing the framebuffer
//!   whenever it changes
//! * the renderer polls input, queues key transitions, and draws the last
//!   published frame at the configured frame rate
//!
//! They share nothing but the `Bridge` and the `SharedScreen`. Either side
//! stopping (quit, or a fatal error) clears the run flag and the other
//! follows within one iteration.
use crate::bridge::Bridge;
use crate::config::{Config, TimerMode, TIMER_HZ};
use crate::display::Display;
use crate::error::Result;
use crate::input::{Input, InputEvent};
use crate::instruction::Instruction;
use crate::interpreter::{Chip8Interpreter, StepOutcome};
use crate::keymap::KeyMap;
use crate::screen::SharedScreen;
use crate::sound::Sound;
use crate::state::MachineState;
use log::{debug, error, warn};
use spin_sleep::LoopHelper;
use std::collections::BTreeSet;
use std::panic;
use std::thread;
use std::time::{Duration, Instant};

/// how often the loops log their measured rate
const REPORT_INTERVAL_S: f64 = 5.0;

pub struct Simulation<'a> {
    interpreter: Chip8Interpreter<'a>,
    bridge: &'a Bridge,
    screen: &'a SharedScreen,
    instructions_per_second: f64,
    timer_mode: TimerMode,
}

impl<'a> Simulation<'a> {
    pub fn new(
        state: MachineState,
        bridge: &'a Bridge,
        screen: &'a SharedScreen,
        config: &Config,
    ) -> Self {
        Simulation {
            interpreter: Chip8Interpreter::with_state(state, bridge, config),
            bridge,
            screen,
            instructions_per_second: config.instructions_per_second,
            timer_mode: config.timer_mode,
        }
    }

    /// run until the run flag is cleared or the program fails; returns
    /// every instruction executed
    pub fn run(mut self) -> Result<BTreeSet<Instruction>> {
        debug!("simulation starting at {} instructions/s", self.instructions_per_second);
        self.screen.publish(&self.interpreter.state().framebuffer);
        if let Err(e) = self.run_loop() {
            error!("simulation stopped: {}", e);
            self.bridge.stop();
            return Err(e);
        }
        debug!("simulation stopped");
        Ok(self.interpreter.seen_instructions().clone())
    }

    fn run_loop(&mut self) -> Result<()> {
        let mut pace = LoopHelper::builder()
            .report_interval_s(REPORT_INTERVAL_S)
            .build_with_target_rate(self.instructions_per_second);
        let timer_period = Duration::from_secs_f64(1.0 / TIMER_HZ);
        let mut next_tick = Instant::now() + timer_period;

        loop {
            pace.loop_start();
            if !self.bridge.sync(&mut self.interpreter.state_mut().keys) {
                return Ok(());
            }
            match self.interpreter.step()? {
                StepOutcome::Continue => {}
                StepOutcome::Redraw => self.screen.publish(&self.interpreter.state().framebuffer),
                StepOutcome::Halted => return Ok(()),
            }
            if self.timer_mode == TimerMode::WallClock {
                let now = Instant::now();
                while now >= next_tick {
                    self.interpreter.tick_timers();
                    next_tick += timer_period;
                }
            }
            self.screen.set_buzzer(self.interpreter.state().sound_timer > 0);
            if let Some(rate) = pace.report_rate() {
                debug!("simulation running at {:.0} instructions/s", rate);
            }
            pace.loop_sleep();
        }
    }
}

pub struct Renderer<'a> {
    display: &'a mut dyn Display,
    input: &'a mut dyn Input,
    sound: &'a mut dyn Sound,
    keymap: &'a KeyMap,
    bridge: &'a Bridge,
    screen: &'a SharedScreen,
    frames_per_second: f64,
    beeping: bool,
}

impl<'a> Renderer<'a> {
    pub fn new(
        devices: Devices<'a>,
        keymap: &'a KeyMap,
        bridge: &'a Bridge,
        screen: &'a SharedScreen,
        config: &Config,
    ) -> Self {
        Renderer {
            display: devices.display,
            input: devices.input,
            sound: devices.sound,
            keymap,
            bridge,
            screen,
            frames_per_second: config.frames_per_second,
            beeping: false,
        }
    }

    /// run until the user quits or the simulation stops
    pub fn run(&mut self) -> Result<()> {
        let result = self.run_loop();
        if let Err(e) = &result {
            error!("renderer stopped: {}", e);
        }
        self.bridge.stop();
        self.set_buzzer(false);
        result
    }

    fn run_loop(&mut self) -> Result<()> {
        let mut pace = LoopHelper::builder()
            .report_interval_s(REPORT_INTERVAL_S)
            .build_with_target_rate(self.frames_per_second);
        let mut events = Vec::new();

        loop {
            pace.loop_start();
            events.clear();
            self.input.poll(&mut events)?;
            {
                let mut shared = self.bridge.lock();
                for event in &events {
                    match *event {
                        InputEvent::Key { code, down } => match self.keymap.lookup(code) {
                            Some(key) => shared.push(key, down)?,
                            None if down => warn!("can't map key {:#x} to the keypad", code),
                            None => {}
                        },
                        InputEvent::Quit => shared.stop(),
                    }
                }
                if !shared.is_running() {
                    return Ok(());
                }
            }
            self.display.draw(&self.screen.snapshot())?;
            self.set_buzzer(self.screen.buzzer());
            if let Some(rate) = pace.report_rate() {
                debug!("rendering at {:.1} frames/s", rate);
            }
            pace.loop_sleep();
        }
    }

    /// a sound device that fails shouldn't take the machine down with it
    fn set_buzzer(&mut self, on: bool) {
        if on == self.beeping {
            return;
        }
        let result = if on { self.sound.beep() } else { self.sound.stop() };
        if let Err(e) = result {
            warn!("sound device: {}", e);
        }
        self.beeping = on;
    }
}

/// clears the run flag however its thread leaves, unwinding included, so
/// the other thread never waits on a dead one
struct StopOnDrop<'a>(&'a Bridge);

impl Drop for StopOnDrop<'_> {
    fn drop(&mut self) {
        self.0.stop();
    }
}

/// the outside world, as seen from the render thread
pub struct Devices<'a> {
    pub display: &'a mut dyn Display,
    pub input: &'a mut dyn Input,
    pub sound: &'a mut dyn Sound,
}

/// Run a machine with a program already loaded: the simulation on its own
/// thread, rendering on this one. Returns once both have stopped, with the
/// set of instructions the program executed. A simulation error takes
/// precedence over a render error. Unusable loop rates are rejected before
/// either thread starts.
pub fn run(
    config: &Config,
    state: MachineState,
    keymap: &KeyMap,
    devices: Devices,
) -> Result<BTreeSet<Instruction>> {
    config.validate()?;
    let bridge = Bridge::new(config.key_wait_poll);
    let screen = SharedScreen::new();
    let (bridge, screen) = (&bridge, &screen);
    // reborrow so the devices live no longer than the bridge
    let Devices {
        display,
        input,
        sound,
    } = devices;
    let devices = Devices {
        display: &mut *display,
        input: &mut *input,
        sound: &mut *sound,
    };

    thread::scope(|s| {
        let simulation = s.spawn(move || {
            let _stop = StopOnDrop(bridge);
            Simulation::new(state, bridge, screen, config).run()
        });
        let rendered = {
            let _stop = StopOnDrop(bridge);
            Renderer::new(devices, keymap, bridge, screen, config).run()
        };
        let simulated = match simulation.join() {
            Ok(result) => result,
            Err(payload) => panic::resume_unwind(payload),
        };
        let seen = simulated?;
        rendered?;
        Ok(seen)
    })
}
