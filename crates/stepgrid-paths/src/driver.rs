//! Drive a [`PathFinder`] the way an interactive visualiser does.
//!
//! [`Stepper`] groups engine calls into user-visible steps: seed the
//! search, pick the next frontier cell, then relax its neighbours.
//! [`Playback`] turns elapsed wall time into a number of due steps so a
//! render loop can run the search at an adjustable speed.

use std::time::Duration;

use stepgrid_core::Point;

use crate::error::PathError;
use crate::finder::PathFinder;

/// Highest accepted speed level.
pub const MAX_SPEED_LEVEL: u32 = 100;

/// Speed level giving roughly ten steps per second.
pub const DEFAULT_SPEED_LEVEL: u32 = 16;

/// Time between automatic steps for a speed level.
///
/// Level 0 is half a second per step; level `n` is `100 / (60 n)` seconds,
/// so level 100 steps once per frame at 60 Hz. Levels above
/// [`MAX_SPEED_LEVEL`] are clamped.
pub fn speed_level_to_step_time(level: u32) -> Duration {
    match level.min(MAX_SPEED_LEVEL) {
        0 => Duration::from_millis(500),
        n => Duration::from_secs_f64(100.0 / (60.0 * f64::from(n))),
    }
}

/// Settings shared by [`Stepper`] and [`Playback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlaybackConfig {
    /// Speed level, `0..=MAX_SPEED_LEVEL`.
    pub speed_level: u32,
    /// Relax every pending neighbour in one step instead of one per step.
    pub drain_neighbors: bool,
}

impl PlaybackConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_speed_level(mut self, level: u32) -> Self {
        self.speed_level = level.min(MAX_SPEED_LEVEL);
        self
    }

    pub fn with_drain_neighbors(mut self, drain: bool) -> Self {
        self.drain_neighbors = drain;
        self
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            speed_level: DEFAULT_SPEED_LEVEL,
            drain_neighbors: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Stepper
// ---------------------------------------------------------------------------

/// What the next [`Stepper::advance`] will do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DriverPhase {
    /// Begin the search.
    Start,
    /// Pop the best frontier cell.
    SelectFrontier,
    /// Relax neighbours of the popped cell.
    SelectNeighbor,
    /// The search is over; further advances do nothing.
    Finish,
}

/// Phase machine over the engine's step operations.
#[derive(Debug, Clone)]
pub struct Stepper {
    phase: DriverPhase,
    start: Point,
    goal: Point,
    drain_neighbors: bool,
}

impl Stepper {
    /// A stepper that will search from `start` to `goal`, relaxing all of a
    /// cell's neighbours in a single step.
    pub fn new(start: Point, goal: Point) -> Self {
        Self {
            phase: DriverPhase::Start,
            start,
            goal,
            drain_neighbors: true,
        }
    }

    pub fn with_config(mut self, config: &PlaybackConfig) -> Self {
        self.drain_neighbors = config.drain_neighbors;
        self
    }

    pub fn with_drain_neighbors(mut self, drain: bool) -> Self {
        self.drain_neighbors = drain;
        self
    }

    #[inline]
    pub fn phase(&self) -> DriverPhase {
        self.phase
    }

    #[inline]
    pub fn endpoints(&self) -> (Point, Point) {
        (self.start, self.goal)
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.phase == DriverPhase::Finish
    }

    /// Rewind to [`DriverPhase::Start`] with new endpoints.
    pub fn restart(&mut self, start: Point, goal: Point) {
        self.start = start;
        self.goal = goal;
        self.phase = DriverPhase::Start;
    }

    /// Perform one user-visible step and return the phase that follows.
    ///
    /// Only [`DriverPhase::Start`] can fail, when an endpoint is blocked or
    /// out of bounds; the stepper then stays at `Start`.
    pub fn advance(&mut self, pf: &mut PathFinder) -> Result<DriverPhase, PathError> {
        self.phase = match self.phase {
            DriverPhase::Start => {
                pf.start(self.start, self.goal)?;
                DriverPhase::SelectFrontier
            }
            DriverPhase::SelectFrontier => {
                if pf.step_frontier() {
                    DriverPhase::SelectNeighbor
                } else {
                    DriverPhase::Finish
                }
            }
            DriverPhase::SelectNeighbor => {
                if self.drain_neighbors {
                    while pf.step_neighbor() {}
                    DriverPhase::SelectFrontier
                } else if pf.step_neighbor() {
                    DriverPhase::SelectNeighbor
                } else {
                    DriverPhase::SelectFrontier
                }
            }
            DriverPhase::Finish => DriverPhase::Finish,
        };
        Ok(self.phase)
    }
}

// ---------------------------------------------------------------------------
// Playback
// ---------------------------------------------------------------------------

/// Fixed-interval step scheduler for a render loop.
#[derive(Debug, Clone)]
pub struct Playback {
    speed_level: u32,
    step_time: Duration,
    accumulator: Duration,
    running: bool,
}

impl Playback {
    /// A paused scheduler at the configured speed.
    pub fn new(config: &PlaybackConfig) -> Self {
        let speed_level = config.speed_level.min(MAX_SPEED_LEVEL);
        Self {
            speed_level,
            step_time: speed_level_to_step_time(speed_level),
            accumulator: Duration::ZERO,
            running: false,
        }
    }

    #[inline]
    pub fn speed_level(&self) -> u32 {
        self.speed_level
    }

    pub fn set_speed_level(&mut self, level: u32) {
        self.speed_level = level.min(MAX_SPEED_LEVEL);
        self.step_time = speed_level_to_step_time(self.speed_level);
    }

    #[inline]
    pub fn step_time(&self) -> Duration {
        self.step_time
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn play(&mut self) {
        self.running = true;
    }

    /// Stop and forget any partially elapsed step.
    pub fn pause(&mut self) {
        self.running = false;
        self.accumulator = Duration::ZERO;
    }

    pub fn toggle(&mut self) {
        if self.running {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Account for `dt` of elapsed time and return how many steps are due.
    ///
    /// Always 0 while paused.
    pub fn tick(&mut self, dt: Duration) -> usize {
        if !self.running {
            return 0;
        }
        self.accumulator += dt;
        let mut due = 0;
        while self.accumulator > self.step_time {
            self.accumulator -= self.step_time;
            due += 1;
        }
        due
    }
}

impl Default for Playback {
    fn default() -> Self {
        Self::new(&PlaybackConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepgrid_core::Grid;

    fn phases(stepper: &mut Stepper, pf: &mut PathFinder) -> Vec<DriverPhase> {
        let mut out = Vec::new();
        while !stepper.is_finished() {
            out.push(stepper.advance(pf).unwrap());
        }
        out
    }

    #[test]
    fn step_times() {
        assert_eq!(speed_level_to_step_time(0), Duration::from_millis(500));
        let t = speed_level_to_step_time(10).as_secs_f64();
        assert!((t - 100.0 / 600.0).abs() < 1e-9);
        assert!((speed_level_to_step_time(100).as_secs_f64() - 1.0 / 60.0).abs() < 1e-9);
        assert_eq!(speed_level_to_step_time(500), speed_level_to_step_time(100));
        assert!(speed_level_to_step_time(1) > speed_level_to_step_time(2));
    }

    #[test]
    fn draining_cadence() {
        use DriverPhase::*;
        let mut pf = PathFinder::new(Grid::new(3, 1));
        let mut stepper = Stepper::new(Point::new(0, 0), Point::new(2, 0));
        assert_eq!(stepper.phase(), Start);
        assert_eq!(
            phases(&mut stepper, &mut pf),
            vec![
                SelectFrontier,
                SelectNeighbor,
                SelectFrontier,
                SelectNeighbor,
                SelectFrontier,
                Finish
            ]
        );
        assert_eq!(pf.path().len(), 3);
        assert_eq!(stepper.advance(&mut pf), Ok(Finish));
    }

    #[test]
    fn single_neighbor_cadence() {
        use DriverPhase::*;
        let mut pf = PathFinder::new(Grid::new(3, 1));
        let config = PlaybackConfig::new().with_drain_neighbors(false);
        let mut stepper = Stepper::new(Point::new(0, 0), Point::new(2, 0)).with_config(&config);
        // (0, 0) has one neighbour, (1, 0) has two.
        assert_eq!(
            phases(&mut stepper, &mut pf),
            vec![
                SelectFrontier,
                SelectNeighbor,
                SelectNeighbor,
                SelectFrontier,
                SelectNeighbor,
                SelectNeighbor,
                SelectNeighbor,
                SelectFrontier,
                Finish
            ]
        );
        assert_eq!(pf.path().len(), 3);
    }

    #[test]
    fn failed_start_stays_at_start() {
        let mut g = Grid::new(3, 3);
        g.set_blocked(Point::new(2, 2), true).unwrap();
        let mut pf = PathFinder::new(g);
        let mut stepper = Stepper::new(Point::new(0, 0), Point::new(2, 2));
        assert_eq!(
            stepper.advance(&mut pf),
            Err(PathError::InvalidCell(Point::new(2, 2)))
        );
        assert_eq!(stepper.phase(), DriverPhase::Start);

        stepper.restart(Point::new(0, 0), Point::new(1, 2));
        assert_eq!(stepper.endpoints(), (Point::new(0, 0), Point::new(1, 2)));
        while !stepper.is_finished() {
            stepper.advance(&mut pf).unwrap();
        }
        assert_eq!(pf.path().len(), 4);
    }

    #[test]
    fn unreachable_goal_finishes() {
        let mut g = Grid::new(3, 3);
        g.set_blocked(Point::new(1, 0), true).unwrap();
        g.set_blocked(Point::new(1, 1), true).unwrap();
        g.set_blocked(Point::new(1, 2), true).unwrap();
        let mut pf = PathFinder::new(g);
        let mut stepper = Stepper::new(Point::new(0, 0), Point::new(2, 2));
        phases(&mut stepper, &mut pf);
        assert!(pf.path().is_empty());
        assert!(pf.state().is_finished());
    }

    #[test]
    fn playback_accumulates() {
        let mut pb = Playback::new(&PlaybackConfig::new().with_speed_level(0));
        assert_eq!(pb.tick(Duration::from_secs(2)), 0);

        pb.play();
        assert!(pb.is_running());
        assert_eq!(pb.tick(Duration::from_millis(300)), 0);
        assert_eq!(pb.tick(Duration::from_millis(300)), 1);
        assert_eq!(pb.tick(Duration::from_millis(1250)), 2);

        pb.pause();
        pb.play();
        // The partial 350 ms was dropped by pause.
        assert_eq!(pb.tick(Duration::from_millis(450)), 0);
    }

    #[test]
    fn playback_speed_changes() {
        let mut pb = Playback::default();
        assert_eq!(pb.speed_level(), DEFAULT_SPEED_LEVEL);
        pb.set_speed_level(250);
        assert_eq!(pb.speed_level(), MAX_SPEED_LEVEL);
        assert_eq!(pb.step_time(), speed_level_to_step_time(100));

        pb.toggle();
        assert!(pb.is_running());
        assert_eq!(pb.tick(Duration::from_millis(90)), 5);
        pb.toggle();
        assert!(!pb.is_running());
    }
}

#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;

    #[test]
    fn config_from_json() {
        let config: PlaybackConfig =
            serde_json::from_str(r#"{"speed_level": 40, "drain_neighbors": false}"#).unwrap();
        assert_eq!(
            config,
            PlaybackConfig::new()
                .with_speed_level(40)
                .with_drain_neighbors(false)
        );
        let json = serde_json::to_string(&DriverPhase::SelectNeighbor).unwrap();
        assert_eq!(json, r#""SelectNeighbor""#);
    }
}
