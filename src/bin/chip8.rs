// Copyright 2018 Ian Johnson

// This file is part of Chip-8.

// Chip-8 is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// Chip-8 is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with Chip-8.  If not, see <http://www.gnu.org/licenses/>.

//! The `chip8` binary program.
//!
//! This is the SDL front-end.  The interpreter itself never sleeps or polls
//! anything; this program decides how many instructions to run and how many
//! timer ticks to apply on each pass of its loop, based on two wall-clock
//! `Timer`s.

extern crate chip8_vm;
#[macro_use]
extern crate clap;
extern crate env_logger;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;
#[macro_use]
extern crate maplit;
extern crate sdl2;

use std::cmp;
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::process;
use std::thread;
use std::time::Duration;

use clap::{App, Arg, ArgMatches};
use failure::{Error, ResultExt};
use log::LevelFilter;
use sdl2::EventPump;
use sdl2::audio::{AudioCallback, AudioDevice, AudioSpecDesired};
use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::pixels::Color;
use sdl2::rect::Rect;
use sdl2::render::Canvas;
use sdl2::video::Window;

use chip8_vm::display::{self, Buffer};
use chip8_vm::input::Key;
use chip8_vm::interpreter::{Interpreter, Options};
use chip8_vm::timer::Timer;

/// The most instructions to run in one pass of the main loop, so that a long
/// stall doesn't turn into a burst of catch-up execution.
const MAX_STEPS_PER_PASS: u32 = 64;
const SAMPLE_RATE: i32 = 44_100;
const OFF: Color = Color {
    r: 0x10,
    g: 0x10,
    b: 0x10,
    a: 0xFF,
};
const ON: Color = Color {
    r: 0xE0,
    g: 0xE0,
    b: 0xE0,
    a: 0xFF,
};

/// An SDL error.
#[derive(Debug, Fail)]
#[fail(display = "SDL error: {}", _0)]
struct SdlError(String);

/// The settings which only matter to the SDL side of the program.
struct HostConfig {
    /// Size of one Chip-8 pixel on screen.
    scale: u32,
    /// Buzzer pitch in Hz.
    tone: u32,
    /// Buzzer volume, as a percentage.
    volume: u32,
}

/// Whether the main loop should keep going after handling events.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// The SDL resources backing the interpreter's screen, keypad and buzzer.
struct Host {
    canvas: Canvas<Window>,
    events: EventPump,
    buzzer: AudioDevice<Buzzer>,
    keymap: HashMap<Keycode, Key>,
    // Dropped last, after everything that depends on it.
    _sdl: sdl2::Sdl,
}

impl Host {
    fn open(config: &HostConfig) -> Result<Self, Error> {
        let sdl = sdl2::init()
            .map_err(SdlError)
            .context("could not initialize SDL")?;
        let video = sdl.video()
            .map_err(SdlError)
            .context("could not initialize SDL video")?;
        let audio = sdl.audio()
            .map_err(SdlError)
            .context("could not initialize SDL audio")?;
        let events = sdl.event_pump()
            .map_err(SdlError)
            .context("could not initialize SDL event loop")?;

        let (width, height) = (display::WIDTH as u32, display::HEIGHT as u32);
        let window = video
            .window("Chip-8", width * config.scale, height * config.scale)
            .position_centered()
            .resizable()
            .build()
            .context("could not create window")?;
        let mut canvas = window
            .into_canvas()
            .build()
            .context("could not create canvas")?;
        // Everything is drawn in Chip-8 pixels; SDL scales to the window.
        canvas
            .set_logical_size(width, height)
            .context("could not set canvas size")?;

        let amplitude = cmp::min(config.volume, 100) as f32 / 100.0;
        let tone = config.tone as f32;
        let spec = AudioSpecDesired {
            freq: Some(SAMPLE_RATE),
            channels: Some(1),
            samples: None,
        };
        let buzzer = audio
            .open_playback(None, &spec, |have| Buzzer::new(amplitude, tone, have.freq))
            .map_err(SdlError)
            .context("could not open audio playback")?;

        Ok(Host {
            canvas,
            events,
            buzzer,
            keymap: keymap(),
            _sdl: sdl,
        })
    }

    /// Feeds pending SDL events to the interpreter's keypad.
    fn handle_events(&mut self, interpreter: &mut Interpreter) -> Flow {
        for event in self.events.poll_iter() {
            match event {
                Event::Quit { .. } => return Flow::Quit,
                Event::Window { .. } => interpreter.display_mut().force_refresh(),
                Event::KeyDown {
                    keycode: Some(code),
                    repeat: false,
                    ..
                } => if let Some(&key) = self.keymap.get(&code) {
                    interpreter.input_mut().press(key);
                },
                Event::KeyUp {
                    keycode: Some(code),
                    ..
                } => if let Some(&key) = self.keymap.get(&code) {
                    interpreter.input_mut().release(key);
                },
                _ => {}
            }
        }
        Flow::Continue
    }

    /// Redraws the window (if the screen changed) and sets the buzzer from
    /// the sound timer.
    fn present(&mut self, interpreter: &mut Interpreter) -> Result<(), Error> {
        let sounding = interpreter.st() > 0;
        let canvas = &mut self.canvas;
        interpreter
            .display_mut()
            .refresh(|buf| render(canvas, buf))
            .context("could not refresh display window")?;

        if sounding {
            self.buzzer.resume();
        } else {
            self.buzzer.pause();
        }
        Ok(())
    }
}

fn render(canvas: &mut Canvas<Window>, buf: &Buffer) -> Result<(), SdlError> {
    let lit: Vec<Rect> = buf.data()
        .iter()
        .enumerate()
        .filter(|&(_, &on)| on)
        .map(|(n, _)| {
            let x = n % display::WIDTH;
            let y = n / display::WIDTH;
            Rect::new(x as i32, y as i32, 1, 1)
        })
        .collect();

    canvas.set_draw_color(OFF);
    canvas.clear();
    if !lit.is_empty() {
        canvas.set_draw_color(ON);
        canvas.fill_rects(&lit).map_err(SdlError)?;
    }
    canvas.present();
    Ok(())
}

/// The usual layout: the left four columns of a QWERTY keyboard stand in for
/// the 4x4 hex keypad.
fn keymap() -> HashMap<Keycode, Key> {
    use Key::*;
    use Keycode::*;

    hashmap![
        Num1 => K1, Num2 => K2, Num3 => K3, Num4 => KC,
        Q => K4, W => K5, E => K6, R => KD,
        A => K7, S => K8, D => K9, F => KE,
        Z => KA, X => K0, C => KB, V => KF,
    ]
}

/// A square wave, counted in samples.
struct Buzzer {
    amplitude: f32,
    /// Samples per full cycle of the wave.
    period: f32,
    /// Position in the current cycle, in samples.
    pos: f32,
}

impl Buzzer {
    fn new(amplitude: f32, tone: f32, sample_rate: i32) -> Self {
        Buzzer {
            amplitude,
            period: sample_rate as f32 / tone.max(1.0),
            pos: 0.0,
        }
    }
}

impl AudioCallback for Buzzer {
    type Channel = f32;

    fn callback(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            *sample = if self.pos < self.period / 2.0 {
                self.amplitude
            } else {
                -self.amplitude
            };
            self.pos += 1.0;
            if self.pos >= self.period {
                self.pos -= self.period;
            }
        }
    }
}

fn main() {
    let matches = App::new("chip8")
        .version(crate_version!())
        .author("Ian Johnson <ianprime0509@gmail.com>")
        .about("A Chip-8 interpreter")
        .arg(Arg::from_usage("--speed [IPS] 'instructions per second'").default_value("700"))
        .arg(Arg::from_usage("--frequency [HZ] 'timer tick rate'").default_value("60"))
        .arg(Arg::from_usage("-s, --scale [N] 'window pixels per pixel'").default_value("10"))
        .arg(Arg::from_usage("-t, --tone [HZ] 'buzzer pitch'").default_value("440"))
        .arg(Arg::from_usage("--volume [PERCENT] 'buzzer volume'").default_value("10"))
        .args_from_usage(
            "--seed [SEED]          'seed for the RND instruction'
             -q, --shift-quirks     'SHR and SHL shift Vy into Vx'
             -l, --load-quirks      'Fx55 and Fx65 advance I'
             -v, --verbose...       'increase verbosity'
             <FILE>                 'program file to run'",
        )
        .get_matches();

    init_logging(matches.occurrences_of("verbose"));
    if let Err(e) = run(&matches) {
        error!("{}", e);
        for cause in e.causes().skip(1) {
            info!("caused by: {}", cause);
        }
        trace!("backtrace: {}", e.backtrace());
        process::exit(1);
    }
}

fn init_logging(verbosity: u64) {
    let filter = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter(None, filter)
        .format(|buf, record| writeln!(buf, "{}: {}", record.level(), record.args()))
        .init();
}

fn run(matches: &ArgMatches) -> Result<(), Error> {
    let speed = value_t!(matches, "speed", u32).context("invalid speed")?;
    let frequency = value_t!(matches, "frequency", u32).context("invalid timer frequency")?;
    if speed == 0 || frequency == 0 {
        bail!("speed and timer frequency must be positive");
    }
    let config = HostConfig {
        scale: value_t!(matches, "scale", u32).context("invalid scale")?,
        tone: value_t!(matches, "tone", u32).context("invalid tone")?,
        volume: value_t!(matches, "volume", u32).context("invalid volume")?,
    };
    let options = Options {
        load_quirks: matches.is_present("load-quirks"),
        shift_quirks: matches.is_present("shift-quirks"),
        rng_seed: match matches.value_of("seed") {
            Some(_) => Some(value_t!(matches, "seed", u32).context("invalid seed")?),
            None => None,
        },
    };

    let path = matches.value_of("FILE").unwrap();
    let mut interpreter = Interpreter::with_options(options);
    let mut file = File::open(path).with_context(|_| format!("could not open file '{}'", path))?;
    interpreter
        .load_program(&mut file)
        .with_context(|_| format!("could not load program from file '{}'", path))?;

    let mut host = Host::open(&config)?;
    let mut ticks = Timer::new(frequency);
    let mut clock = Timer::new(speed);
    info!("running '{}' at {} instructions per second", path, speed);

    while host.handle_events(&mut interpreter) == Flow::Continue {
        for _ in 0..ticks.lap() {
            interpreter.tick_timers();
        }
        for _ in 0..cmp::min(clock.lap(), MAX_STEPS_PER_PASS) {
            // Errors from 'step' already name the instruction and address.
            interpreter.step()?;
        }
        host.present(&mut interpreter)?;
        thread::sleep(Duration::from_millis(1));
    }

    Ok(())
}
