//! Literal value parsing for template property lines.
//!
//! Property values in templates are written as literals: numbers, quoted
//! strings, booleans, `None`, and bracketed lists or tuples of those. This
//! module turns that text into a [`Value`].
//!
//! # Example
//!
//! ```rust
//! use scenegraph_core::Value;
//! use scenegraph_template::literal::parse_literal;
//!
//! assert_eq!(parse_literal("42").unwrap(), Value::Int(42));
//! assert_eq!(parse_literal("'Foo'").unwrap(), Value::from("Foo"));
//! assert_eq!(
//!     parse_literal("[1.0, 0.5]").unwrap(),
//!     Value::vector(&[1.0, 0.5])
//! );
//! assert!(parse_literal("unquoted words").is_err());
//! ```

use scenegraph_core::Value;
use std::iter::Peekable;
use std::str::CharIndices;

/// Deepest list or tuple nesting accepted in a literal.
pub const MAX_DEPTH: usize = 64;

/// Error raised when a literal cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid literal at offset {offset}: {message}")]
pub struct LiteralError {
    /// Byte offset into the input where parsing failed
    pub offset: usize,
    /// What went wrong
    pub message: String,
}

/// Parse a complete literal. Leading and trailing whitespace is ignored;
/// anything else left over is an error.
pub fn parse_literal(input: &str) -> Result<Value, LiteralError> {
    let mut parser = LiteralParser {
        input,
        chars: input.char_indices().peekable(),
        depth: 0,
    };
    parser.skip_ws();
    let value = parser.value()?;
    parser.skip_ws();
    match parser.chars.peek() {
        None => Ok(value),
        Some(&(offset, c)) => Err(LiteralError {
            offset,
            message: format!("unexpected trailing character '{c}'"),
        }),
    }
}

struct LiteralParser<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    depth: usize,
}

impl LiteralParser<'_> {
    fn offset(&mut self) -> usize {
        self.chars
            .peek()
            .map(|&(i, _)| i)
            .unwrap_or(self.input.len())
    }

    fn error<T>(&mut self, message: impl Into<String>) -> Result<T, LiteralError> {
        Err(LiteralError {
            offset: self.offset(),
            message: message.into(),
        })
    }

    fn skip_ws(&mut self) {
        while self.chars.next_if(|&(_, c)| c.is_whitespace()).is_some() {}
    }

    fn value(&mut self) -> Result<Value, LiteralError> {
        match self.chars.peek().map(|&(_, c)| c) {
            None => self.error("empty value"),
            Some('[') => self.sequence(']'),
            Some('(') => self.sequence(')'),
            Some(q @ ('"' | '\'')) => self.string(q),
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => self.number(),
            Some(c) if c.is_alphabetic() => self.keyword(),
            Some(c) => self.error(format!("unexpected character '{c}'")),
        }
    }

    fn sequence(&mut self, close: char) -> Result<Value, LiteralError> {
        if self.depth >= MAX_DEPTH {
            return self.error(format!("nesting deeper than {MAX_DEPTH} levels"));
        }
        self.depth += 1;
        let items = self.items(close);
        self.depth -= 1;
        items.map(Value::List)
    }

    fn items(&mut self, close: char) -> Result<Vec<Value>, LiteralError> {
        self.chars.next();
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.chars.next_if(|&(_, c)| c == close).is_some() {
                return Ok(items);
            }
            items.push(self.value()?);
            self.skip_ws();
            match self.chars.next() {
                Some((_, ',')) => continue,
                Some((_, c)) if c == close => return Ok(items),
                Some((offset, c)) => {
                    return Err(LiteralError {
                        offset,
                        message: format!("expected ',' or '{close}', found '{c}'"),
                    });
                }
                None => return self.error(format!("unterminated sequence, expected '{close}'")),
            }
        }
    }

    fn string(&mut self, quote: char) -> Result<Value, LiteralError> {
        self.chars.next();
        let mut out = String::new();
        while let Some((_, c)) = self.chars.next() {
            match c {
                c if c == quote => return Ok(Value::String(out)),
                '\\' => match self.chars.next() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, 'r')) => out.push('\r'),
                    Some((_, other)) => out.push(other),
                    None => break,
                },
                c => out.push(c),
            }
        }
        self.error("unterminated string")
    }

    fn number(&mut self) -> Result<Value, LiteralError> {
        let start = self.offset();
        while self
            .chars
            .next_if(|&(_, c)| c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '.'))
            .is_some()
        {}
        let end = self.offset();
        let text = &self.input[start..end];
        if let Ok(i) = text.parse::<i64>() {
            return Ok(Value::Int(i));
        }
        match text.parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(Value::Float(f)),
            _ => Err(LiteralError {
                offset: start,
                message: format!("invalid number '{text}'"),
            }),
        }
    }

    fn keyword(&mut self) -> Result<Value, LiteralError> {
        let start = self.offset();
        while self
            .chars
            .next_if(|&(_, c)| c.is_alphanumeric() || c == '_')
            .is_some()
        {}
        let end = self.offset();
        match &self.input[start..end] {
            "True" | "true" => Ok(Value::Bool(true)),
            "False" | "false" => Ok(Value::Bool(false)),
            "None" | "null" => Ok(Value::Null),
            word => Err(LiteralError {
                offset: start,
                message: format!("unknown name '{word}'"),
            }),
        }
    }
}
