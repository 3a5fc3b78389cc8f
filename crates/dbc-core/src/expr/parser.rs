//! Recursive descent parser for conditions and target bodies
//!
//! Precedence, lowest first:
//!
//! ```text
//! ||  →  &&  →  == !=  →  < <= > >=  →  is [not] test  →  + -  →  * /  →  unary ! -
//! ```
//!
//! Tree depth and parser nesting are both bounded, so hostile input fails with
//! a parse error instead of exhausting the stack during parsing or evaluation.

use super::ast::{BinaryOp, Expr, Program, Statement, TypeTest, UnaryOp};
use super::tokenizer::{SpannedToken, Token, Tokenizer};
use crate::value::Value;
use crate::{Error, Result};

/// Deepest expression tree accepted
const MAX_DEPTH: usize = 256;

/// Deepest run of parentheses and prefix operators accepted
const MAX_NESTING: usize = 64;

/// A parsed expression with the depth of its tree
type Parsed = (Expr, usize);

pub struct Parser {
    tokens: Vec<SpannedToken>,
    position: usize,
    nesting: usize,
}

impl Parser {
    pub fn new(text: &str) -> Result<Self> {
        let tokens = Tokenizer::new(text).tokenize()?;
        Ok(Parser {
            tokens,
            position: 0,
            nesting: 0,
        })
    }

    /// Parse a single expression spanning the whole input
    pub fn parse_expression(mut self) -> Result<Expr> {
        let (expr, _) = self.expression()?;
        self.expect_eof()?;
        Ok(expr)
    }

    /// Parse `;`-separated statements spanning the whole input
    pub fn parse_program(mut self) -> Result<Program> {
        let mut statements = Vec::new();
        loop {
            while self.eat(&Token::Semicolon) {}
            if self.check(&Token::Eof) {
                break;
            }
            statements.push(self.statement()?);
            if !self.eat(&Token::Semicolon) {
                break;
            }
        }
        self.expect_eof()?;
        Ok(Program { statements })
    }

    // ── Token helpers ──────────────────────────────────────

    fn peek(&self) -> &Token {
        // the tokenizer always ends the stream with Eof
        &self.tokens[self.position.min(self.tokens.len() - 1)].token
    }

    fn peek_ahead(&self, offset: usize) -> &Token {
        let index = (self.position + offset).min(self.tokens.len() - 1);
        &self.tokens[index].token
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
        token
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if matches!(self.peek(), Token::Identifier(w) if w == word) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, expected: &str) -> Error {
        let spanned = &self.tokens[self.position.min(self.tokens.len() - 1)];
        Error::ParseError(format!(
            "Expected {}, found {:?} at {}",
            expected, spanned.token, spanned.span
        ))
    }

    fn too_deep(&self, limit: usize) -> Error {
        let spanned = &self.tokens[self.position.min(self.tokens.len() - 1)];
        Error::ParseError(format!(
            "Expression nested too deeply (limit {}) at {}",
            limit, spanned.span
        ))
    }

    fn expect_eof(&self) -> Result<()> {
        if self.check(&Token::Eof) {
            Ok(())
        } else {
            Err(self.error("end of input"))
        }
    }

    /// Run a recursive grammar rule one nesting level deeper
    fn nested<T>(&mut self, rule: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.nesting >= MAX_NESTING {
            return Err(self.too_deep(MAX_NESTING));
        }
        self.nesting += 1;
        let result = rule(self);
        self.nesting -= 1;
        result
    }

    /// Wrap `expr` as a node one level above its deepest child
    fn node(&self, expr: Expr, child_depth: usize) -> Result<Parsed> {
        let depth = child_depth + 1;
        if depth > MAX_DEPTH {
            return Err(self.too_deep(MAX_DEPTH));
        }
        Ok((expr, depth))
    }

    fn binary(&self, op: BinaryOp, lhs: Parsed, rhs: Parsed) -> Result<Parsed> {
        let depth = lhs.1.max(rhs.1);
        self.node(
            Expr::Binary {
                op,
                lhs: Box::new(lhs.0),
                rhs: Box::new(rhs.0),
            },
            depth,
        )
    }

    // ── Grammar ────────────────────────────────────────────

    fn statement(&mut self) -> Result<Statement> {
        if let (Token::Identifier(name), Token::Assign) = (self.peek(), self.peek_ahead(1)) {
            let name = name.clone();
            self.advance();
            self.advance();
            let (value, _) = self.expression()?;
            return Ok(Statement::Assign { name, value });
        }
        Ok(Statement::Expr(self.expression()?.0))
    }

    fn expression(&mut self) -> Result<Parsed> {
        self.or()
    }

    fn or(&mut self) -> Result<Parsed> {
        let mut lhs = self.and()?;
        while self.eat(&Token::OrOr) {
            let rhs = self.and()?;
            lhs = self.binary(BinaryOp::Or, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Parsed> {
        let mut lhs = self.equality()?;
        while self.eat(&Token::AndAnd) {
            let rhs = self.equality()?;
            lhs = self.binary(BinaryOp::And, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn equality(&mut self) -> Result<Parsed> {
        let mut lhs = self.comparison()?;
        loop {
            let op = match self.peek() {
                Token::EqEq => BinaryOp::Eq,
                Token::NotEq => BinaryOp::NotEq,
                _ => break,
            };
            self.advance();
            let rhs = self.comparison()?;
            lhs = self.binary(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn comparison(&mut self) -> Result<Parsed> {
        let mut lhs = self.test()?;
        loop {
            let op = match self.peek() {
                Token::Less => BinaryOp::Less,
                Token::LessEq => BinaryOp::LessEq,
                Token::Greater => BinaryOp::Greater,
                Token::GreaterEq => BinaryOp::GreaterEq,
                _ => break,
            };
            self.advance();
            let rhs = self.test()?;
            lhs = self.binary(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn test(&mut self) -> Result<Parsed> {
        let (operand, depth) = self.additive()?;
        if !self.eat_word("is") {
            return Ok((operand, depth));
        }
        let negated = self.eat_word("not");
        let test = if self.eat_word("empty") {
            TypeTest::Empty
        } else if self.eat_word("boolean") {
            TypeTest::Boolean
        } else if self.eat_word("number") {
            TypeTest::Number
        } else {
            return Err(self.error("'empty', 'boolean' or 'number' after 'is'"));
        };
        self.node(
            Expr::Test {
                operand: Box::new(operand),
                test,
                negated,
            },
            depth,
        )
    }

    fn additive(&mut self) -> Result<Parsed> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.multiplicative()?;
            lhs = self.binary(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn multiplicative(&mut self) -> Result<Parsed> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                _ => break,
            };
            self.advance();
            let rhs = self.unary()?;
            lhs = self.binary(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Parsed> {
        let op = match self.peek() {
            Token::Bang => UnaryOp::Not,
            Token::Minus => UnaryOp::Neg,
            _ => return self.primary(),
        };
        self.advance();
        let (operand, depth) = self.nested(Self::unary)?;
        self.node(
            Expr::Unary {
                op,
                operand: Box::new(operand),
            },
            depth,
        )
    }

    fn primary(&mut self) -> Result<Parsed> {
        let expr = match self.peek() {
            Token::IntegerLiteral(i) => Expr::Literal(Value::Integer(*i)),
            Token::FloatLiteral(f) => Expr::Literal(Value::Float(*f)),
            Token::StringLiteral(s) => Expr::Literal(Value::String(s.clone())),
            Token::BooleanLiteral(b) => Expr::Literal(Value::Boolean(*b)),
            Token::Null => Expr::Literal(Value::Null),
            Token::Identifier(name) => Expr::Identifier(name.clone()),
            Token::LParen => {
                self.advance();
                let inner = self.nested(Self::expression)?;
                if !self.eat(&Token::RParen) {
                    return Err(self.error("')'"));
                }
                return Ok(inner);
            }
            _ => return Err(self.error("an expression")),
        };
        self.advance();
        Ok((expr, 1))
    }
}
