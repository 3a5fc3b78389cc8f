//! Expression AST for parsed conditions and target bodies
//!
//! All nodes are immutable after parsing.

use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    And,
    Or,
}

/// Postfix `is` tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTest {
    Empty,
    Boolean,
    Number,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Identifier(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `operand is [not] <test>`
    Test {
        operand: Box<Expr>,
        test: TypeTest,
        negated: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `name = value`, writes a state field
    Assign { name: String, value: Expr },
    Expr(Expr),
}

/// A `;`-separated target body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
}
