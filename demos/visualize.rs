//! Interactive terminal visualiser using crossterm.
//!
//! Run: cargo run --bin visualize

use std::io::{self, Write};
use std::time::{Duration, Instant};

use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, ClearType},
};

use stepgrid_core::Point;
use stepgrid_demos::{
    GridConfig, HEURISTIC_PRESETS, RANDOM_OBSTACLE_DENSITY, build_grid, glyph, next_preset,
    render_with_endpoints, scatter_obstacles, status_line,
};
use stepgrid_paths::{PathFinder, Playback, PlaybackConfig, Stepper};

const HELP: &str = "space/n step  r run/pause  +/- speed  h heuristic  c reset  x clear  m maze  q quit";
const SPEED_INCREMENT: u32 = 5;
/// First terminal row of the grid; row 0 holds the help line.
const GRID_TOP: u16 = 1;

fn glyph_color(ch: char) -> Color {
    match ch {
        glyph::BLOCKED => Color::DarkGrey,
        glyph::START => Color::Green,
        glyph::GOAL => Color::Red,
        glyph::PATH => Color::Yellow,
        glyph::CURRENT => Color::Magenta,
        glyph::PENDING => Color::Cyan,
        glyph::FRONTIER => Color::Blue,
        _ => Color::Grey,
    }
}

struct Visualizer {
    pf: PathFinder,
    stepper: Stepper,
    playback: Playback,
    preset: usize,
    message: String,
}

impl Visualizer {
    fn new(config: &GridConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let grid = build_grid(config, &mut rand::rng())?;
        let playback_config = PlaybackConfig::default();
        Ok(Self {
            pf: PathFinder::new(grid),
            stepper: Stepper::new(config.start, config.goal).with_config(&playback_config),
            playback: Playback::new(&playback_config),
            preset: 0,
            message: String::new(),
        })
    }

    fn step(&mut self) {
        if let Err(e) = self.stepper.advance(&mut self.pf) {
            self.message = e.to_string();
            self.playback.pause();
        } else if self.stepper.is_finished() {
            self.playback.pause();
        }
    }

    fn rewind(&mut self) {
        let (start, goal) = self.stepper.endpoints();
        self.pf.reset();
        self.stepper.restart(start, goal);
        self.playback.pause();
    }

    /// Returns `false` when the user asked to quit.
    fn on_key(&mut self, code: KeyCode) -> bool {
        self.message.clear();
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return false,
            KeyCode::Char(' ') | KeyCode::Char('n') => self.step(),
            KeyCode::Char('r') => {
                if self.stepper.is_finished() {
                    self.rewind();
                }
                self.playback.toggle();
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                let level = self.playback.speed_level() + SPEED_INCREMENT;
                self.playback.set_speed_level(level);
            }
            KeyCode::Char('-') => {
                let level = self.playback.speed_level().saturating_sub(SPEED_INCREMENT);
                self.playback.set_speed_level(level);
            }
            KeyCode::Char('h') => {
                self.preset = next_preset(self.preset);
                let (name, text) = HEURISTIC_PRESETS[self.preset];
                self.message = if self.pf.set_heuristic(text) {
                    format!("heuristic: {name} (applies to the next search)")
                } else {
                    format!("heuristic {name} rejected")
                };
            }
            KeyCode::Char('c') => self.rewind(),
            KeyCode::Char('x') => {
                self.rewind();
                self.pf.clear_blocked();
            }
            KeyCode::Char('m') => {
                self.rewind();
                self.pf.clear_blocked();
                let (start, goal) = self.stepper.endpoints();
                if let Err(e) = scatter_obstacles(
                    &mut self.pf,
                    RANDOM_OBSTACLE_DENSITY,
                    &[start, goal],
                    &mut rand::rng(),
                ) {
                    self.message = e.to_string();
                }
            }
            _ => {}
        }
        true
    }

    fn on_mouse(&mut self, me: MouseEvent) {
        if me.kind != MouseEventKind::Down(MouseButton::Left) || me.row < GRID_TOP {
            return;
        }
        if self.playback.is_running() || self.pf.state().is_in_progress() {
            self.message = "reset the search (c) before editing obstacles".to_string();
            return;
        }
        // Each cell is drawn two columns wide.
        let p = Point::new(i32::from(me.column / 2), i32::from(me.row - GRID_TOP));
        let (start, goal) = self.stepper.endpoints();
        if p == start || p == goal {
            return;
        }
        let Ok(blocked) = self.pf.grid().is_blocked(p) else {
            return;
        };
        self.rewind();
        if let Err(e) = self.pf.set_blocked(p, !blocked) {
            self.message = e.to_string();
        }
    }

    fn draw(&self, out: &mut impl Write) -> io::Result<()> {
        queue!(out, cursor::MoveTo(0, 0), ResetColor, Print(HELP))?;
        queue!(out, terminal::Clear(ClearType::UntilNewLine))?;

        let lines = render_with_endpoints(&self.pf, Some(self.stepper.endpoints()));
        let mut row = GRID_TOP;
        for line in &lines {
            queue!(out, cursor::MoveTo(0, row))?;
            for ch in line.chars() {
                queue!(out, SetForegroundColor(glyph_color(ch)), Print(ch), Print(' '))?;
            }
            row += 1;
        }

        let speed = format!(
            " | speed {} ({})",
            self.playback.speed_level(),
            if self.playback.is_running() { "running" } else { "paused" }
        );
        queue!(
            out,
            ResetColor,
            cursor::MoveTo(0, row),
            Print(status_line(&self.pf)),
            Print(speed),
            terminal::Clear(ClearType::UntilNewLine),
            cursor::MoveTo(0, row + 1),
            Print(format!("h = {}", self.pf.get_heuristic())),
            terminal::Clear(ClearType::UntilNewLine),
            cursor::MoveTo(0, row + 2),
            Print(&self.message),
            terminal::Clear(ClearType::UntilNewLine),
        )?;
        out.flush()
    }

    fn run(&mut self, out: &mut impl Write) -> Result<(), Box<dyn std::error::Error>> {
        let mut last = Instant::now();
        loop {
            self.draw(out)?;

            if event::poll(Duration::from_millis(16))? {
                while event::poll(Duration::ZERO)? {
                    match event::read()? {
                        Event::Key(KeyEvent {
                            code,
                            kind: KeyEventKind::Press,
                            ..
                        }) => {
                            if !self.on_key(code) {
                                return Ok(());
                            }
                        }
                        Event::Mouse(me) => self.on_mouse(me),
                        Event::Resize(..) => execute!(out, terminal::Clear(ClearType::All))?,
                        _ => {}
                    }
                }
            }

            let now = Instant::now();
            for _ in 0..self.playback.tick(now - last) {
                self.step();
                if !self.playback.is_running() {
                    break;
                }
            }
            last = now;
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = Visualizer::new(&GridConfig::default())?;

    let mut stdout = io::stdout();
    terminal::enable_raw_mode()?;
    execute!(
        stdout,
        terminal::EnterAlternateScreen,
        cursor::Hide,
        terminal::Clear(ClearType::All),
        event::EnableMouseCapture
    )?;

    let result = app.run(&mut stdout);

    let _ = execute!(
        stdout,
        event::DisableMouseCapture,
        ResetColor,
        cursor::Show,
        terminal::LeaveAlternateScreen
    );
    let _ = terminal::disable_raw_mode();
    result
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
