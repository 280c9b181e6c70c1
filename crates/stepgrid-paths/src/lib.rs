//! Incremental A* search on obstacle grids.
//!
//! The search is exposed as a sequence of small, observable steps so that a
//! visualiser can draw the frontier, the cell being expanded and each
//! neighbour relaxation as they happen:
//!
//! - **Engine**: [`PathFinder`] with [`start`](PathFinder::start),
//!   [`step_frontier`](PathFinder::step_frontier) and
//!   [`step_neighbor`](PathFinder::step_neighbor)
//! - **Heuristics**: user-editable expressions ([`Heuristic`], [`Expr`])
//!   over `nodeX`, `nodeY`, `goalX` and `goalY`, Manhattan distance by
//!   default
//! - **Sessions**: per-cell [`SearchRecord`]s invalidated lazily by
//!   session id, so restarting a search costs nothing
//! - **Driving**: [`Stepper`] and [`Playback`] for step-by-step or timed
//!   playback
//! - **Reference**: [`CostMap`], a one-shot Dijkstra to compare against
//!
//! # Driving loop
//!
//! | Call | Returns `true` when |
//! |---|---|
//! | [`step_frontier`](PathFinder::step_frontier) | a non-goal cell was popped |
//! | [`step_neighbor`](PathFinder::step_neighbor) | a candidate was relaxed |

mod dijkstra;
mod distance;
mod driver;
mod error;
mod expr;
mod finder;
mod heap;
mod heuristic;
mod session;

pub use dijkstra::{CostMap, UNREACHABLE};
pub use distance::manhattan;
pub use driver::{
    DEFAULT_SPEED_LEVEL, DriverPhase, MAX_SPEED_LEVEL, Playback, PlaybackConfig, Stepper,
    speed_level_to_step_time,
};
pub use error::PathError;
pub use expr::{Arity, Bindings, Expr, ExprError, Func, MAX_DEPTH};
pub use finder::{PathFinder, SearchState};
pub use heap::{HeapKey, IndexedHeap};
pub use heuristic::{DEFAULT_HEURISTIC, Heuristic, evaluate, validate};
pub use session::{Category, SearchRecord, SessionLedger};
