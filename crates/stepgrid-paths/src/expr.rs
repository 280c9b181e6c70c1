//! Arithmetic expressions over the four heuristic variables.
//!
//! An [`Expr`] is parsed once from text into a small tree and can then be
//! evaluated many times with different [`Bindings`]. The language covers
//! numbers, the variables `nodeX`, `nodeY`, `goalX`, `goalY`, the constants
//! `PI`, `e`, `TRUE` and `FALSE`, the usual arithmetic, comparison and logic
//! operators, and a fixed function library (see [`Func`]). Identifiers are
//! case-insensitive. Trigonometric functions work in degrees.
//!
//! Operator precedence, lowest first:
//!
//! | Operators | Associativity |
//! |---|---|
//! | `\|\|` | left |
//! | `&&` | left |
//! | `=` `==` `!=` `<>` | left |
//! | `<` `<=` `>` `>=` | left |
//! | `+` `-` | left |
//! | `*` `/` `%` | left |
//! | `^` | right |
//! | unary `-` `+` `!` | prefix |
//!
//! Unary minus binds tighter than `^`, so `-2^2` is `4`.
//!
//! Trees are at most [`MAX_DEPTH`] levels deep, counting parentheses.

use std::fmt;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Parse or evaluation failure of an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprError {
    /// A character that starts no token.
    UnexpectedChar { ch: char, pos: usize },
    /// The text ended where more input was required.
    UnexpectedEnd,
    /// A token that does not fit the grammar at this point.
    UnexpectedToken { found: String, pos: usize },
    /// An identifier that is neither a variable nor a constant.
    UnknownIdentifier { name: String, pos: usize },
    /// A call to a function outside the library.
    UnknownFunction { name: String, pos: usize },
    /// A known function called with the wrong number of arguments.
    Arity {
        func: &'static str,
        expected: Arity,
        found: usize,
    },
    /// Division or modulo by zero (including `CSC`, `SEC`, `COT` poles).
    DivisionByZero,
    /// An operation produced NaN or an infinity.
    NonFinite { op: &'static str },
    /// A numeric literal too large for `f64`.
    NumberOutOfRange { text: String, pos: usize },
    /// Nesting deeper than [`MAX_DEPTH`].
    TooDeep { pos: usize },
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedChar { ch, pos } => {
                write!(f, "unexpected character '{ch}' at position {pos}")
            }
            Self::UnexpectedEnd => f.write_str("unexpected end of expression"),
            Self::UnexpectedToken { found, pos } => {
                write!(f, "unexpected \"{found}\" at position {pos}")
            }
            Self::UnknownIdentifier { name, pos } => {
                write!(f, "unknown variable \"{name}\" at position {pos}")
            }
            Self::UnknownFunction { name, pos } => {
                write!(f, "unknown function \"{name}\" at position {pos}")
            }
            Self::Arity {
                func,
                expected,
                found,
            } => write!(f, "{func} expects {expected} argument(s), got {found}"),
            Self::DivisionByZero => f.write_str("division by zero"),
            Self::NonFinite { op } => write!(f, "{op} produced a non-finite result"),
            Self::NumberOutOfRange { text, pos } => {
                write!(f, "number {text} at position {pos} is out of range")
            }
            Self::TooDeep { pos } => {
                write!(f, "expression nested deeper than {MAX_DEPTH} at position {pos}")
            }
        }
    }
}

impl std::error::Error for ExprError {}

// ---------------------------------------------------------------------------
// Bindings
// ---------------------------------------------------------------------------

/// Values for the four heuristic variables.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bindings {
    pub node_x: f64,
    pub node_y: f64,
    pub goal_x: f64,
    pub goal_y: f64,
}

impl Bindings {
    pub fn new(node_x: f64, node_y: f64, goal_x: f64, goal_y: f64) -> Self {
        Self {
            node_x,
            node_y,
            goal_x,
            goal_y,
        }
    }
}

// ---------------------------------------------------------------------------
// Function library
// ---------------------------------------------------------------------------

/// Accepted argument counts of a [`Func`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    Between(usize, usize),
}

impl Arity {
    fn accepts(self, n: usize) -> bool {
        match self {
            Self::Exact(k) => n == k,
            Self::AtLeast(k) => n >= k,
            Self::Between(lo, hi) => (lo..=hi).contains(&n),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(k) => write!(f, "{k}"),
            Self::AtLeast(k) => write!(f, "at least {k}"),
            Self::Between(lo, hi) => write!(f, "{lo} to {hi}"),
        }
    }
}

/// Built-in functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Abs,
    Sqrt,
    Log,
    Log10,
    Min,
    Max,
    Round,
    Floor,
    Ceiling,
    Rad,
    Deg,
    Sin,
    Cos,
    Tan,
    Csc,
    Sec,
    Cot,
    Asin,
    Acos,
    Atan,
    Acot,
    Atan2,
    Sinh,
    Cosh,
    Tanh,
    Csch,
    Sech,
    Asinh,
    Acosh,
    Atanh,
    Random,
    If,
    Not,
}

const FUNCS: &[(&str, Func)] = &[
    ("ABS", Func::Abs),
    ("SQRT", Func::Sqrt),
    ("LOG", Func::Log),
    ("LOG10", Func::Log10),
    ("MIN", Func::Min),
    ("MAX", Func::Max),
    ("ROUND", Func::Round),
    ("FLOOR", Func::Floor),
    ("CEILING", Func::Ceiling),
    ("RAD", Func::Rad),
    ("DEG", Func::Deg),
    ("SIN", Func::Sin),
    ("COS", Func::Cos),
    ("TAN", Func::Tan),
    ("CSC", Func::Csc),
    ("SEC", Func::Sec),
    ("COT", Func::Cot),
    ("ASIN", Func::Asin),
    ("ACOS", Func::Acos),
    ("ATAN", Func::Atan),
    ("ACOT", Func::Acot),
    ("ATAN2", Func::Atan2),
    ("SINH", Func::Sinh),
    ("COSH", Func::Cosh),
    ("TANH", Func::Tanh),
    ("CSCH", Func::Csch),
    ("SECH", Func::Sech),
    ("ASINH", Func::Asinh),
    ("ACOSH", Func::Acosh),
    ("ATANH", Func::Atanh),
    ("RANDOM", Func::Random),
    ("IF", Func::If),
    ("NOT", Func::Not),
];

impl Func {
    /// Look up a function by case-insensitive name.
    pub fn from_name(name: &str) -> Option<Self> {
        FUNCS
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|&(_, f)| f)
    }

    /// Canonical (upper-case) name.
    pub fn name(self) -> &'static str {
        FUNCS
            .iter()
            .find(|&&(_, f)| f == self)
            .map_or("?", |&(n, _)| n)
    }

    pub fn arity(self) -> Arity {
        match self {
            Self::Min | Self::Max => Arity::AtLeast(1),
            Self::Round => Arity::Between(1, 2),
            Self::Atan2 => Arity::Exact(2),
            Self::If => Arity::Exact(3),
            Self::Random => Arity::Exact(0),
            _ => Arity::Exact(1),
        }
    }

    /// All function names, in palette order.
    pub fn names() -> impl Iterator<Item = &'static str> {
        FUNCS.iter().map(|&(n, _)| n)
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Var {
    NodeX,
    NodeY,
    GoalX,
    GoalY,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnaryOp {
    Neg,
    Plus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Num(f64),
    Var(Var),
    Unary(UnaryOp, Box<Node>),
    Binary(BinaryOp, Box<Node>, Box<Node>),
    Call(Func, Vec<Node>),
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Num(f64),
    Ident(String),
    Op(&'static str),
    LParen,
    RParen,
    Comma,
}

impl fmt::Display for Tok {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(v) => write!(f, "{v}"),
            Self::Ident(s) => f.write_str(s),
            Self::Op(s) => f.write_str(s),
            Self::LParen => f.write_str("("),
            Self::RParen => f.write_str(")"),
            Self::Comma => f.write_str(","),
        }
    }
}

const OPERATORS: &[&str] = &[
    "||", "&&", "==", "!=", "<>", "<=", ">=", "=", "<", ">", "+", "-", "*", "/", "%", "^", "!",
];

fn tokenize(src: &str) -> Result<Vec<(Tok, usize)>, ExprError> {
    let bytes = src.as_bytes();
    let mut toks = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        let start = i;

        if c.is_ascii_digit() || (c == b'.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)) {
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                i += 1;
            }
            // Exponent only when digits follow, so `2e` stays `2` then `e`.
            if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
                let mut j = i + 1;
                if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
                    j += 1;
                }
                if j < bytes.len() && bytes[j].is_ascii_digit() {
                    while j < bytes.len() && bytes[j].is_ascii_digit() {
                        j += 1;
                    }
                    i = j;
                }
            }
            let text = &src[start..i];
            let v: f64 = text.parse().map_err(|_| ExprError::UnexpectedToken {
                found: text.to_string(),
                pos: start,
            })?;
            if !v.is_finite() {
                return Err(ExprError::NumberOutOfRange {
                    text: text.to_string(),
                    pos: start,
                });
            }
            toks.push((Tok::Num(v), start));
            continue;
        }

        if c.is_ascii_alphabetic() || c == b'_' {
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            toks.push((Tok::Ident(src[start..i].to_string()), start));
            continue;
        }

        match c {
            b'(' => toks.push((Tok::LParen, start)),
            b')' => toks.push((Tok::RParen, start)),
            b',' => toks.push((Tok::Comma, start)),
            _ => {
                let rest = &src[i..];
                let Some(op) = OPERATORS.iter().find(|op| rest.starts_with(**op)) else {
                    let ch = rest.chars().next().unwrap_or('\0');
                    return Err(ExprError::UnexpectedChar { ch, pos: start });
                };
                toks.push((Tok::Op(*op), start));
                i += op.len();
                continue;
            }
        }
        i += 1;
    }
    Ok(toks)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Deepest accepted nesting of operators, calls and parentheses.
pub const MAX_DEPTH: usize = 256;

/// A subtree and its height.
type Parsed = Result<(Node, usize), ExprError>;

struct Parser {
    toks: Vec<(Tok, usize)>,
    pos: usize,
    /// Source length, reported for errors at the end of input.
    end: usize,
    /// Active recursive descents.
    depth: usize,
}

impl Parser {
    fn here(&self) -> usize {
        self.toks.get(self.pos).map_or(self.end, |&(_, p)| p)
    }

    /// Descend one level for the token at `at`.
    fn enter(&mut self, at: usize) -> Result<(), ExprError> {
        if self.depth >= MAX_DEPTH {
            return Err(ExprError::TooDeep { pos: at });
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Height check for a new inner node whose tallest child is `below`.
    fn grow(node: Node, below: usize, at: usize) -> Parsed {
        let height = below + 1;
        if height > MAX_DEPTH {
            return Err(ExprError::TooDeep { pos: at });
        }
        Ok((node, height))
    }

    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.pos).map(|(t, _)| t)
    }

    fn next(&mut self) -> Option<(Tok, usize)> {
        let t = self.toks.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn unexpected(&self) -> ExprError {
        match self.toks.get(self.pos) {
            Some((t, p)) => ExprError::UnexpectedToken {
                found: t.to_string(),
                pos: *p,
            },
            None => ExprError::UnexpectedEnd,
        }
    }

    /// Consume the next token if it is one of `ops`.
    fn eat_op(&mut self, ops: &[(&str, BinaryOp)]) -> Option<BinaryOp> {
        let Some(Tok::Op(s)) = self.peek() else {
            return None;
        };
        let op = ops.iter().find(|(o, _)| o == s).map(|&(_, op)| op)?;
        self.pos += 1;
        Some(op)
    }

    fn expect(&mut self, want: Tok) -> Result<(), ExprError> {
        if self.peek() == Some(&want) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn left_assoc(
        &mut self,
        ops: &[(&str, BinaryOp)],
        next: fn(&mut Self) -> Parsed,
    ) -> Parsed {
        let (mut lhs, mut height) = next(self)?;
        loop {
            let at = self.here();
            let Some(op) = self.eat_op(ops) else {
                break;
            };
            let (rhs, rhs_height) = next(self)?;
            let node = Node::Binary(op, Box::new(lhs), Box::new(rhs));
            (lhs, height) = Self::grow(node, height.max(rhs_height), at)?;
        }
        Ok((lhs, height))
    }

    fn or(&mut self) -> Parsed {
        self.left_assoc(&[("||", BinaryOp::Or)], Self::and)
    }

    fn and(&mut self) -> Parsed {
        self.left_assoc(&[("&&", BinaryOp::And)], Self::equality)
    }

    fn equality(&mut self) -> Parsed {
        self.left_assoc(
            &[
                ("=", BinaryOp::Eq),
                ("==", BinaryOp::Eq),
                ("!=", BinaryOp::Ne),
                ("<>", BinaryOp::Ne),
            ],
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> Parsed {
        self.left_assoc(
            &[
                ("<", BinaryOp::Lt),
                ("<=", BinaryOp::Le),
                (">", BinaryOp::Gt),
                (">=", BinaryOp::Ge),
            ],
            Self::additive,
        )
    }

    fn additive(&mut self) -> Parsed {
        self.left_assoc(&[("+", BinaryOp::Add), ("-", BinaryOp::Sub)], Self::term)
    }

    fn term(&mut self) -> Parsed {
        self.left_assoc(
            &[
                ("*", BinaryOp::Mul),
                ("/", BinaryOp::Div),
                ("%", BinaryOp::Rem),
            ],
            Self::power,
        )
    }

    fn power(&mut self) -> Parsed {
        let (base, base_height) = self.unary()?;
        let at = self.here();
        if self.eat_op(&[("^", BinaryOp::Pow)]).is_some() {
            self.enter(at)?;
            let (exp, exp_height) = self.power()?;
            self.leave();
            let node = Node::Binary(BinaryOp::Pow, Box::new(base), Box::new(exp));
            return Self::grow(node, base_height.max(exp_height), at);
        }
        Ok((base, base_height))
    }

    fn unary(&mut self) -> Parsed {
        let op = match self.peek() {
            Some(Tok::Op("-")) => UnaryOp::Neg,
            Some(Tok::Op("+")) => UnaryOp::Plus,
            Some(Tok::Op("!")) => UnaryOp::Not,
            _ => return self.primary(),
        };
        let at = self.here();
        self.pos += 1;
        self.enter(at)?;
        let (operand, height) = self.unary()?;
        self.leave();
        Self::grow(Node::Unary(op, Box::new(operand)), height, at)
    }

    fn primary(&mut self) -> Parsed {
        let Some((tok, at)) = self.next() else {
            return Err(ExprError::UnexpectedEnd);
        };
        match tok {
            Tok::Num(v) => Ok((Node::Num(v), 1)),
            Tok::LParen => {
                self.enter(at)?;
                let inner = self.or()?;
                self.leave();
                self.expect(Tok::RParen)?;
                Ok(inner)
            }
            Tok::Ident(name) if self.peek() == Some(&Tok::LParen) => self.call(name, at),
            Tok::Ident(name) => Ok((ident(&name, at)?, 1)),
            other => Err(ExprError::UnexpectedToken {
                found: other.to_string(),
                pos: at,
            }),
        }
    }

    fn call(&mut self, name: String, at: usize) -> Parsed {
        let func = Func::from_name(&name).ok_or(ExprError::UnknownFunction { name, pos: at })?;
        self.expect(Tok::LParen)?;
        self.enter(at)?;
        let mut args = Vec::new();
        let mut tallest = 0;
        if self.peek() != Some(&Tok::RParen) {
            loop {
                let (arg, height) = self.or()?;
                tallest = tallest.max(height);
                args.push(arg);
                if self.peek() == Some(&Tok::Comma) {
                    self.pos += 1;
                } else {
                    break;
                }
            }
        }
        self.leave();
        self.expect(Tok::RParen)?;
        let expected = func.arity();
        if !expected.accepts(args.len()) {
            return Err(ExprError::Arity {
                func: func.name(),
                expected,
                found: args.len(),
            });
        }
        Self::grow(Node::Call(func, args), tallest, at)
    }
}

fn ident(name: &str, at: usize) -> Result<Node, ExprError> {
    match name.to_ascii_lowercase().as_str() {
        "nodex" => Ok(Node::Var(Var::NodeX)),
        "nodey" => Ok(Node::Var(Var::NodeY)),
        "goalx" => Ok(Node::Var(Var::GoalX)),
        "goaly" => Ok(Node::Var(Var::GoalY)),
        "pi" => Ok(Node::Num(std::f64::consts::PI)),
        "e" => Ok(Node::Num(std::f64::consts::E)),
        "true" => Ok(Node::Num(1.0)),
        "false" => Ok(Node::Num(0.0)),
        _ => Err(ExprError::UnknownIdentifier {
            name: name.to_string(),
            pos: at,
        }),
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

#[inline]
fn finite(v: f64, op: &'static str) -> Result<f64, ExprError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(ExprError::NonFinite { op })
    }
}

#[inline]
fn recip(v: f64) -> Result<f64, ExprError> {
    if v == 0.0 {
        Err(ExprError::DivisionByZero)
    } else {
        Ok(1.0 / v)
    }
}

#[inline]
fn truth(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

impl Node {
    fn eval(&self, b: &Bindings) -> Result<f64, ExprError> {
        match self {
            Self::Num(v) => Ok(*v),
            Self::Var(Var::NodeX) => Ok(b.node_x),
            Self::Var(Var::NodeY) => Ok(b.node_y),
            Self::Var(Var::GoalX) => Ok(b.goal_x),
            Self::Var(Var::GoalY) => Ok(b.goal_y),
            Self::Unary(op, x) => {
                let v = x.eval(b)?;
                match op {
                    UnaryOp::Neg => finite(-v, "-"),
                    UnaryOp::Plus => finite(v, "+"),
                    UnaryOp::Not => Ok(truth(v == 0.0)),
                }
            }
            Self::Binary(BinaryOp::And, l, r) => {
                Ok(truth(l.eval(b)? != 0.0 && r.eval(b)? != 0.0))
            }
            Self::Binary(BinaryOp::Or, l, r) => Ok(truth(l.eval(b)? != 0.0 || r.eval(b)? != 0.0)),
            Self::Binary(op, l, r) => binary(*op, l.eval(b)?, r.eval(b)?),
            Self::Call(Func::If, args) => {
                if args[0].eval(b)? != 0.0 {
                    args[1].eval(b)
                } else {
                    args[2].eval(b)
                }
            }
            Self::Call(f, args) => {
                let vals = args
                    .iter()
                    .map(|a| a.eval(b))
                    .collect::<Result<Vec<f64>, ExprError>>()?;
                call(*f, &vals)
            }
        }
    }
}

fn binary(op: BinaryOp, l: f64, r: f64) -> Result<f64, ExprError> {
    match op {
        BinaryOp::Add => finite(l + r, "+"),
        BinaryOp::Sub => finite(l - r, "-"),
        BinaryOp::Mul => finite(l * r, "*"),
        BinaryOp::Div => {
            if r == 0.0 {
                return Err(ExprError::DivisionByZero);
            }
            finite(l / r, "/")
        }
        BinaryOp::Rem => {
            if r == 0.0 {
                return Err(ExprError::DivisionByZero);
            }
            finite(l % r, "%")
        }
        BinaryOp::Pow => finite(l.powf(r), "^"),
        BinaryOp::Eq => Ok(truth(l == r)),
        BinaryOp::Ne => Ok(truth(l != r)),
        BinaryOp::Lt => Ok(truth(l < r)),
        BinaryOp::Le => Ok(truth(l <= r)),
        BinaryOp::Gt => Ok(truth(l > r)),
        BinaryOp::Ge => Ok(truth(l >= r)),
        // Short-circuit forms are handled in `Node::eval`.
        BinaryOp::And => Ok(truth(l != 0.0 && r != 0.0)),
        BinaryOp::Or => Ok(truth(l != 0.0 || r != 0.0)),
    }
}

fn call(f: Func, a: &[f64]) -> Result<f64, ExprError> {
    let x = a.first().copied().unwrap_or(0.0);
    let name = f.name();
    let v = match f {
        Func::Abs => x.abs(),
        Func::Sqrt => x.sqrt(),
        Func::Log => x.ln(),
        Func::Log10 => x.log10(),
        Func::Min => a.iter().copied().fold(f64::INFINITY, f64::min),
        Func::Max => a.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        Func::Round => round_half_up(x, a.get(1).copied().unwrap_or(0.0) as i64),
        Func::Floor => x.floor(),
        Func::Ceiling => x.ceil(),
        Func::Rad => x.to_radians(),
        Func::Deg => x.to_degrees(),
        Func::Sin => x.to_radians().sin(),
        Func::Cos => x.to_radians().cos(),
        Func::Tan => x.to_radians().tan(),
        Func::Csc => recip(x.to_radians().sin())?,
        Func::Sec => recip(x.to_radians().cos())?,
        Func::Cot => recip(x.to_radians().tan())?,
        Func::Asin => x.asin().to_degrees(),
        Func::Acos => x.acos().to_degrees(),
        Func::Atan => x.atan().to_degrees(),
        Func::Acot => recip(x)?.atan().to_degrees(),
        Func::Atan2 => x.atan2(a[1]).to_degrees(),
        Func::Sinh => x.sinh(),
        Func::Cosh => x.cosh(),
        Func::Tanh => x.tanh(),
        Func::Csch => recip(x.sinh())?,
        Func::Sech => recip(x.cosh())?,
        Func::Asinh => x.asinh(),
        Func::Acosh => x.acosh(),
        Func::Atanh => x.atanh(),
        Func::Random => rand::random::<f64>(),
        Func::Not => truth(x == 0.0),
        Func::If => {
            if x != 0.0 {
                a[1]
            } else {
                a[2]
            }
        }
    };
    finite(v, name)
}

/// Round `x` to `places` decimals, half away from zero, on its shortest
/// decimal form. `2.675` rounds to `2.68` even though the nearest `f64`
/// lies just below it.
fn round_half_up(x: f64, places: i64) -> f64 {
    // Shortest round-trip digits, e.g. "2.675e0".
    let sci = format!("{:e}", x.abs());
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return x;
    };
    let Ok(exp) = exp.parse::<i64>() else {
        return x;
    };
    let digits: Vec<u8> = mantissa.bytes().filter(u8::is_ascii_digit).collect();
    // Digits that survive: those left of the cut `places` after the point.
    let keep = exp.saturating_add(1).saturating_add(places);
    if keep >= digits.len() as i64 {
        return x;
    }
    if keep < 0 {
        return 0.0_f64.copysign(x);
    }
    let keep = keep as usize;
    let mut kept = digits[..keep]
        .iter()
        .fold(0u64, |n, d| n * 10 + u64::from(d - b'0'));
    if digits[keep] >= b'5' {
        kept += 1;
    }
    let rounded: f64 = format!("{kept}e{}", -places).parse().unwrap_or(x.abs());
    rounded.copysign(x)
}

// ---------------------------------------------------------------------------
// Expr
// ---------------------------------------------------------------------------

/// A parsed expression, ready for repeated evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    root: Node,
}

impl Expr {
    /// Parse `src` into an expression tree.
    pub fn parse(src: &str) -> Result<Self, ExprError> {
        let toks = tokenize(src)?;
        let mut p = Parser {
            toks,
            pos: 0,
            end: src.len(),
            depth: 0,
        };
        let (root, _) = p.or()?;
        if p.pos != p.toks.len() {
            return Err(p.unexpected());
        }
        Ok(Self { root })
    }

    /// `ABS(nodeX - goalX) + ABS(nodeY - goalY)`, built without parsing.
    pub fn manhattan() -> Self {
        let abs_diff = |a, b| {
            Node::Call(
                Func::Abs,
                vec![Node::Binary(
                    BinaryOp::Sub,
                    Box::new(Node::Var(a)),
                    Box::new(Node::Var(b)),
                )],
            )
        };
        Self {
            root: Node::Binary(
                BinaryOp::Add,
                Box::new(abs_diff(Var::NodeX, Var::GoalX)),
                Box::new(abs_diff(Var::NodeY, Var::GoalY)),
            ),
        }
    }

    /// Evaluate with the given variable bindings.
    pub fn eval(&self, b: &Bindings) -> Result<f64, ExprError> {
        self.root.eval(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(src: &str) -> Result<f64, ExprError> {
        Expr::parse(src)?.eval(&Bindings::default())
    }

    fn eval_at(src: &str, b: Bindings) -> f64 {
        Expr::parse(src).unwrap().eval(&b).unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(eval("1 + 2 * 3"), Ok(7.0));
        assert_eq!(eval("(1 + 2) * 3"), Ok(9.0));
        assert_eq!(eval("10 - 4 - 3"), Ok(3.0));
        assert_eq!(eval("2 ^ 3 ^ 2"), Ok(512.0));
        assert_eq!(eval("-2^2"), Ok(4.0));
        assert_eq!(eval("2^-1"), Ok(0.5));
        assert_eq!(eval("7 % 4 * 2"), Ok(6.0));
        assert_eq!(eval("1 + 2 > 2 && 0 = 0"), Ok(1.0));
    }

    #[test]
    fn number_forms() {
        assert_eq!(eval("2.5"), Ok(2.5));
        assert_eq!(eval(".5"), Ok(0.5));
        assert_eq!(eval("1e3"), Ok(1000.0));
        assert_eq!(eval("1.5E-1"), Ok(0.15));
        assert!(close(eval("2*e").unwrap(), 2.0 * std::f64::consts::E));
    }

    #[test]
    fn variables_are_case_insensitive() {
        let b = Bindings::new(1.0, 2.0, 4.0, 6.0);
        assert_eq!(eval_at("nodeX + NODEY * 10", b), 21.0);
        assert_eq!(eval_at("goalx - GoalY", b), -2.0);
    }

    #[test]
    fn manhattan_and_squared_euclid() {
        let b = Bindings::new(0.0, 0.0, 3.0, 4.0);
        assert_eq!(eval_at("ABS(nodeX - goalX) + ABS(nodeY - goalY)", b), 7.0);
        assert_eq!(eval_at("(nodeX-goalX)^2+(nodeY-goalY)^2", b), 25.0);
        assert_eq!(eval_at("SQRT((nodeX-goalX)^2+(nodeY-goalY)^2)", b), 5.0);
    }

    #[test]
    fn function_library() {
        assert_eq!(eval("MIN(3, 1, 2)"), Ok(1.0));
        assert_eq!(eval("MAX(3, 1, 2)"), Ok(3.0));
        assert_eq!(eval("ROUND(2.5)"), Ok(3.0));
        assert_eq!(eval("ROUND(-2.5)"), Ok(-3.0));
        assert!(close(eval("ROUND(3.14159, 2)").unwrap(), 3.14));
        assert_eq!(eval("FLOOR(-1.5)"), Ok(-2.0));
        assert_eq!(eval("CEILING(1.2)"), Ok(2.0));
        assert!(close(eval("SIN(90)").unwrap(), 1.0));
        assert!(close(eval("COS(180)").unwrap(), -1.0));
        assert!(close(eval("ATAN2(1, 1)").unwrap(), 45.0));
        assert!(close(eval("DEG(PI)").unwrap(), 180.0));
        assert!(close(eval("RAD(180)").unwrap(), std::f64::consts::PI));
        assert!(close(eval("LOG10(1000)").unwrap(), 3.0));
        assert_eq!(eval("IF(1 > 2, 10, 20)"), Ok(20.0));
        assert_eq!(eval("NOT(0) + !5"), Ok(1.0));
        assert_eq!(eval("abs(-4)"), Ok(4.0));
    }

    #[test]
    fn if_only_evaluates_taken_branch() {
        assert_eq!(eval("IF(TRUE, 1, 1/0)"), Ok(1.0));
        assert_eq!(eval("IF(FALSE, 1/0, 2)"), Ok(2.0));
    }

    #[test]
    fn random_is_unit_interval() {
        for _ in 0..32 {
            let v = eval("RANDOM()").unwrap();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn numeric_errors() {
        assert_eq!(eval("1/0"), Err(ExprError::DivisionByZero));
        assert_eq!(eval("5 % 0"), Err(ExprError::DivisionByZero));
        assert_eq!(eval("CSC(0)"), Err(ExprError::DivisionByZero));
        assert_eq!(eval("SQRT(-1)"), Err(ExprError::NonFinite { op: "SQRT" }));
        assert_eq!(eval("LOG(0)"), Err(ExprError::NonFinite { op: "LOG" }));
        assert_eq!(eval("ASIN(2)"), Err(ExprError::NonFinite { op: "ASIN" }));
        assert_eq!(eval("10^400"), Err(ExprError::NonFinite { op: "^" }));
        assert_eq!(
            eval("1e400"),
            Err(ExprError::NumberOutOfRange {
                text: "1e400".to_string(),
                pos: 0
            })
        );
        assert_eq!(
            eval("-1e400"),
            Err(ExprError::NumberOutOfRange {
                text: "1e400".to_string(),
                pos: 1
            })
        );
        assert_eq!(eval("-1e300 * 1e300"), Err(ExprError::NonFinite { op: "*" }));
    }

    #[test]
    fn round_uses_shortest_decimal_form() {
        assert_eq!(eval("ROUND(2.675, 2)"), Ok(2.68));
        assert_eq!(eval("ROUND(-2.675, 2)"), Ok(-2.68));
        assert_eq!(eval("ROUND(1.005, 2)"), Ok(1.01));
        assert_eq!(eval("ROUND(1234.5, -2)"), Ok(1200.0));
        assert_eq!(eval("ROUND(0.4)"), Ok(0.0));
        assert_eq!(eval("ROUND(0.5)"), Ok(1.0));
        assert_eq!(eval("ROUND(9.99, 1)"), Ok(10.0));
        assert_eq!(eval("ROUND(0.123, 9)"), Ok(0.123));
        assert_eq!(eval("ROUND(42, -5)"), Ok(0.0));
    }

    #[test]
    fn nesting_is_bounded() {
        let ok = format!("{}nodeX{}", "(".repeat(200), ")".repeat(200));
        assert_eq!(eval(&ok), Ok(0.0));
        let chain = vec!["1"; 200].join(" + ");
        assert_eq!(eval(&chain), Ok(200.0));

        for text in [
            format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000)),
            format!("{}1", "-".repeat(10_000)),
            format!("{}1", "!".repeat(MAX_DEPTH + 1)),
            vec!["1"; 10_000].join("+"),
            vec!["2"; 10_000].join("^"),
            format!("{}1{}", "MAX(".repeat(10_000), ")".repeat(10_000)),
        ] {
            assert!(
                matches!(Expr::parse(&text), Err(ExprError::TooDeep { .. })),
                "{}...",
                &text[..16]
            );
        }
        let unclosed = "(".repeat(MAX_DEPTH + 1);
        assert_eq!(
            Expr::parse(&unclosed),
            Err(ExprError::TooDeep { pos: MAX_DEPTH })
        );
    }

    #[test]
    fn parse_errors() {
        assert_eq!(eval(""), Err(ExprError::UnexpectedEnd));
        assert_eq!(eval("1 +"), Err(ExprError::UnexpectedEnd));
        assert_eq!(
            eval("1 $ 2"),
            Err(ExprError::UnexpectedChar { ch: '$', pos: 2 })
        );
        assert_eq!(
            eval("(1 + 2"),
            Err(ExprError::UnexpectedEnd)
        );
        assert_eq!(
            eval("1 2"),
            Err(ExprError::UnexpectedToken {
                found: "2".to_string(),
                pos: 2
            })
        );
        assert_eq!(
            eval("foo + 1"),
            Err(ExprError::UnknownIdentifier {
                name: "foo".to_string(),
                pos: 0
            })
        );
        assert_eq!(
            eval("FOO(1)"),
            Err(ExprError::UnknownFunction {
                name: "FOO".to_string(),
                pos: 0
            })
        );
        assert_eq!(
            eval("ATAN2(1)"),
            Err(ExprError::Arity {
                func: "ATAN2",
                expected: Arity::Exact(2),
                found: 1
            })
        );
        assert!(matches!(eval("MIN()"), Err(ExprError::Arity { .. })));
    }

    #[test]
    fn prebuilt_manhattan_matches_parsed() {
        let parsed = Expr::parse("ABS(nodeX - goalX) + ABS(nodeY - goalY)").unwrap();
        assert_eq!(Expr::manhattan(), parsed);
    }

    #[test]
    fn function_names_resolve() {
        for name in Func::names() {
            let f = Func::from_name(name).unwrap();
            assert_eq!(f.name(), name);
        }
        assert_eq!(Func::names().count(), 33);
    }
}
