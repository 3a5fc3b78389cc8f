//! Expression tokenizer — converts condition and target text into tokens
//!
//! Handles: identifiers, integer/float literals, double-quoted strings,
//! `true`/`false`/`null`, arithmetic, comparison and logical operators,
//! parentheses, assignment and statement separators.

use crate::{Error, Result};

/// Token types for the expression language
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    IntegerLiteral(i64),
    FloatLiteral(f64),
    StringLiteral(String),
    BooleanLiteral(bool),
    Null,

    // Arithmetic
    Plus,  // +
    Minus, // -
    Star,  // *
    Slash, // /

    // Comparison
    EqEq,   // ==
    NotEq,  // !=
    Less,   // <
    LessEq, // <=
    Greater,   // >
    GreaterEq, // >=

    // Logic
    AndAnd, // &&
    OrOr,   // ||
    Bang,   // !

    // Structure
    LParen,    // (
    RParen,    // )
    Assign,    // =
    Semicolon, // ;

    Identifier(String),
    Eof,
}

/// Position in source text for error reporting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub column: usize,
    pub offset: usize,
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "column {}", self.column)
    }
}

/// Token with source position
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

/// Tokenizer for expression source text
pub struct Tokenizer {
    input: Vec<char>,
    position: usize,
}

impl Tokenizer {
    pub fn new(text: &str) -> Self {
        Tokenizer {
            input: text.chars().collect(),
            position: 0,
        }
    }

    /// Tokenize the entire input, ending with `Eof`
    pub fn tokenize(&mut self) -> Result<Vec<SpannedToken>> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();

            if self.is_at_end() {
                tokens.push(SpannedToken {
                    token: Token::Eof,
                    span: self.current_span(),
                });
                break;
            }

            tokens.push(self.next_token()?);
        }

        Ok(tokens)
    }

    // ── Character helpers ──────────────────────────────────

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_ahead(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek();
        if ch.is_some() {
            self.position += 1;
        }
        ch
    }

    fn current_span(&self) -> Span {
        Span {
            column: self.position + 1,
            offset: self.position,
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_whitespace()) {
            self.advance();
        }
    }

    // ── Main dispatch ──────────────────────────────────────

    fn next_token(&mut self) -> Result<SpannedToken> {
        let span = self.current_span();
        let Some(ch) = self.peek() else {
            return Ok(SpannedToken {
                token: Token::Eof,
                span,
            });
        };

        let token = match ch {
            '+' => self.single(Token::Plus),
            '-' => self.single(Token::Minus),
            '*' => self.single(Token::Star),
            '/' => self.single(Token::Slash),
            '(' => self.single(Token::LParen),
            ')' => self.single(Token::RParen),
            ';' => self.single(Token::Semicolon),
            '=' => self.pair('=', Token::EqEq, Token::Assign),
            '!' => self.pair('=', Token::NotEq, Token::Bang),
            '<' => self.pair('=', Token::LessEq, Token::Less),
            '>' => self.pair('=', Token::GreaterEq, Token::Greater),
            '&' | '|' => {
                if self.peek_ahead(1) != Some(ch) {
                    return Err(Error::ParseError(format!(
                        "Expected '{}{}' at {}",
                        ch, ch, span
                    )));
                }
                self.advance();
                self.advance();
                if ch == '&' {
                    Token::AndAnd
                } else {
                    Token::OrOr
                }
            }
            '"' => self.read_string(span)?,
            c if c.is_ascii_digit() => self.read_number(span)?,
            c if c.is_alphabetic() || c == '_' => self.read_word(),
            _ => {
                return Err(Error::ParseError(format!(
                    "Unexpected character '{}' at {}",
                    ch, span
                )))
            }
        };

        Ok(SpannedToken { token, span })
    }

    fn single(&mut self, token: Token) -> Token {
        self.advance();
        token
    }

    /// Two-character operator if the next char is `second`, else one-character
    fn pair(&mut self, second: char, double: Token, single: Token) -> Token {
        self.advance();
        if self.peek() == Some(second) {
            self.advance();
            double
        } else {
            single
        }
    }

    // ── Literals ───────────────────────────────────────────

    fn read_string(&mut self, span: Span) -> Result<Token> {
        self.advance(); // opening quote
        let mut value = String::new();

        loop {
            match self.advance() {
                None => {
                    return Err(Error::ParseError(format!(
                        "Unterminated string starting at {}",
                        span
                    )));
                }
                Some('"') => break,
                Some('\\') => match self.advance() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('\\') => value.push('\\'),
                    Some('"') => value.push('"'),
                    Some(c) => {
                        return Err(Error::ParseError(format!(
                            "Invalid escape sequence '\\{}' at {}",
                            c,
                            self.current_span()
                        )));
                    }
                    None => {
                        return Err(Error::ParseError(format!(
                            "Unterminated escape sequence at {}",
                            self.current_span()
                        )));
                    }
                },
                Some(c) => value.push(c),
            }
        }

        Ok(Token::StringLiteral(value))
    }

    fn read_number(&mut self, span: Span) -> Result<Token> {
        let start = self.position;
        let mut has_dot = false;

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                self.advance();
            } else if ch == '.' && !has_dot && self.peek_ahead(1).is_some_and(|c| c.is_ascii_digit()) {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        let text: String = self.input[start..self.position].iter().collect();

        if has_dot {
            text.parse()
                .map(Token::FloatLiteral)
                .map_err(|_| Error::ParseError(format!("Invalid float '{}' at {}", text, span)))
        } else {
            text.parse()
                .map(Token::IntegerLiteral)
                .map_err(|_| Error::ParseError(format!("Invalid integer '{}' at {}", text, span)))
        }
    }

    fn read_word(&mut self) -> Token {
        let start = self.position;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.advance();
        }
        let text: String = self.input[start..self.position].iter().collect();

        match text.as_str() {
            "true" => Token::BooleanLiteral(true),
            "false" => Token::BooleanLiteral(false),
            "null" => Token::Null,
            _ => Token::Identifier(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<Token> {
        Tokenizer::new(text)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn test_comparison_and_logic() {
        assert_eq!(
            tokens("n2 != 0 && ok"),
            vec![
                Token::Identifier("n2".into()),
                Token::NotEq,
                Token::IntegerLiteral(0),
                Token::AndAnd,
                Token::Identifier("ok".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_assignment_vs_equality() {
        assert_eq!(
            tokens("a = b == 1.5;"),
            vec![
                Token::Identifier("a".into()),
                Token::Assign,
                Token::Identifier("b".into()),
                Token::EqEq,
                Token::FloatLiteral(1.5),
                Token::Semicolon,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_string_and_keywords() {
        assert_eq!(
            tokens(r#"name == "a\"b" || null != false"#),
            vec![
                Token::Identifier("name".into()),
                Token::EqEq,
                Token::StringLiteral("a\"b".into()),
                Token::OrOr,
                Token::Null,
                Token::NotEq,
                Token::BooleanLiteral(false),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_single_ampersand_is_error() {
        let err = Tokenizer::new("a & b").tokenize().unwrap_err();
        assert!(err.to_string().contains("Expected '&&'"));
    }

    #[test]
    fn test_unexpected_character() {
        let err = Tokenizer::new("a # b").tokenize().unwrap_err();
        assert!(err.to_string().contains("column 3"));
    }

    #[test]
    fn test_unterminated_string() {
        assert!(Tokenizer::new("\"abc").tokenize().is_err());
    }
}
