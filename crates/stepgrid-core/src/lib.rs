//! **stepgrid-core**: geometry and grid types for step-driven pathfinding.
//!
//! This crate provides the foundational types shared across the *stepgrid*
//! workspace: integer geometry primitives and the obstacle/cost [`Grid`]
//! that the search engine in `stepgrid-paths` walks over.

pub mod geom;
pub mod grid;

pub use geom::{Point, Range};
pub use grid::{Grid, GridError};
