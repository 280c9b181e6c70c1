//! User-editable heuristic functions.
//!
//! A [`Heuristic`] pairs the expression text with its parsed form. Creating
//! one validates the text by evaluating it once with every variable bound
//! to zero, so a `Heuristic` value is always one that the editor accepted.

use stepgrid_core::Point;

use crate::expr::{Bindings, Expr, ExprError};

/// Manhattan distance, the heuristic every engine starts with.
pub const DEFAULT_HEURISTIC: &str = "ABS(nodeX - goalX) + ABS(nodeY - goalY)";

/// A validated heuristic expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Heuristic {
    text: String,
    expr: Expr,
}

impl Heuristic {
    /// Parse and validate `text`.
    pub fn new(text: &str) -> Result<Self, ExprError> {
        let expr = Expr::parse(text)?;
        expr.eval(&Bindings::default())?;
        Ok(Self {
            text: text.to_string(),
            expr,
        })
    }

    /// The Manhattan-distance heuristic.
    pub fn manhattan() -> Self {
        Self {
            text: DEFAULT_HEURISTIC.to_string(),
            expr: Expr::manhattan(),
        }
    }

    /// The expression text as entered.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Estimated cost from `node` to `goal`.
    pub fn estimate(&self, node: Point, goal: Point) -> Result<f64, ExprError> {
        self.expr.eval(&Bindings::new(
            node.x as f64,
            node.y as f64,
            goal.x as f64,
            goal.y as f64,
        ))
    }
}

impl Default for Heuristic {
    fn default() -> Self {
        Self::manhattan()
    }
}

/// Evaluate `text` once for the given node and goal coordinates.
pub fn evaluate(
    text: &str,
    node_x: f64,
    node_y: f64,
    goal_x: f64,
    goal_y: f64,
) -> Result<f64, ExprError> {
    Expr::parse(text)?.eval(&Bindings::new(node_x, node_y, goal_x, goal_y))
}

/// Whether `text` parses and evaluates with all variables bound to zero.
pub fn validate(text: &str) -> bool {
    Heuristic::new(text).is_ok()
}
