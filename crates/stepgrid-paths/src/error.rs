use std::fmt;

use stepgrid_core::{GridError, Point};

use crate::expr::ExprError;

/// Errors returned by [`PathFinder`](crate::PathFinder) operations.
///
/// A call that fails leaves the engine exactly as it was before the call.
#[derive(Debug, Clone, PartialEq)]
pub enum PathError {
    /// The cell identity lies outside the grid extents.
    OutOfBounds(Point),
    /// A start or goal cell that is out of bounds or blocked, or an attempt
    /// to block the start or goal of a search in progress.
    InvalidCell(Point),
    /// Movement costs are fixed while a search is in progress.
    SearchInProgress(Point),
    /// Movement costs must be at least 1.
    InvalidCost { pos: Point, cost: i32 },
    /// The heuristic text failed to parse or evaluate.
    InvalidExpression(ExprError),
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds(p) => write!(f, "cell {p} is outside the grid"),
            Self::InvalidCell(p) => write!(f, "cell {p} cannot be used as a search endpoint"),
            Self::SearchInProgress(p) => {
                write!(f, "cost of cell {p} cannot change while a search is in progress")
            }
            Self::InvalidCost { pos, cost } => {
                write!(f, "invalid movement cost {cost} for cell {pos} (must be >= 1)")
            }
            Self::InvalidExpression(e) => write!(f, "invalid heuristic expression: {e}"),
        }
    }
}

impl std::error::Error for PathError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidExpression(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GridError> for PathError {
    fn from(e: GridError) -> Self {
        match e {
            GridError::OutOfBounds(p) => Self::OutOfBounds(p),
            GridError::InvalidCost { pos, cost } => Self::InvalidCost { pos, cost },
        }
    }
}

impl From<ExprError> for PathError {
    fn from(e: ExprError) -> Self {
        Self::InvalidExpression(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn grid_errors_convert() {
        let p = Point::new(9, 9);
        assert_eq!(
            PathError::from(GridError::OutOfBounds(p)),
            PathError::OutOfBounds(p)
        );
        assert_eq!(
            PathError::from(GridError::InvalidCost { pos: p, cost: 0 }),
            PathError::InvalidCost { pos: p, cost: 0 }
        );
    }

    #[test]
    fn expression_error_is_source() {
        let e = PathError::from(ExprError::DivisionByZero);
        assert_eq!(
            e.to_string(),
            "invalid heuristic expression: division by zero"
        );
        assert!(e.source().is_some());
        assert!(PathError::InvalidCell(Point::ZERO).source().is_none());
    }

    #[test]
    fn frozen_cost_message_names_the_cell() {
        let e = PathError::SearchInProgress(Point::new(2, 0));
        assert_eq!(
            e.to_string(),
            "cost of cell (2, 0) cannot change while a search is in progress"
        );
    }
}
