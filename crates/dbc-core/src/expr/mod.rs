//! Expression language for manifest conditions and target bodies
//!
//! Conditions are single expressions that must evaluate to `true`. Target
//! bodies are `;`-separated statements where `name = expr` writes a state
//! field and the last statement's value is returned.
//!
//! ```text
//! n2 != 0 && n1 >= 0
//! message is not empty
//! total = total + amount; total
//! ```

pub mod ast;
pub mod eval;
pub mod parser;
pub mod tokenizer;

pub use ast::{Expr, Program};

use crate::Result;

/// Parse a condition expression
pub fn parse_expression(text: &str) -> Result<Expr> {
    parser::Parser::new(text)?.parse_expression()
}

/// Parse a target body
pub fn parse_program(text: &str) -> Result<Program> {
    parser::Parser::new(text)?.parse_program()
}
