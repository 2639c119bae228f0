//! Parser for the literal syntax used by the push-feed lines.
//!
//! The streamer prints each event with the host language's literal syntax
//! rather than JSON: single-quoted strings, optional `u`/`b`/`r` string
//! prefixes, `True`/`False`/`None`, tuples, and trailing commas. This module
//! turns one such token into a [`serde_json::Value`] so the typed decode step
//! can run through serde.

use std::fmt;

use serde_json::{Map, Number, Value};

/// A literal that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralError {
    /// Byte offset where parsing failed
    pub offset: usize,
    /// What went wrong
    pub message: String,
}

impl fmt::Display for LiteralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at byte {}", self.message, self.offset)
    }
}

impl std::error::Error for LiteralError {}

/// Deepest container nesting accepted, matching serde_json's recursion limit
pub const MAX_NESTING: usize = 128;

/// Parse a single literal into a JSON value
///
/// Dict keys must be strings or numbers; numeric keys are stringified.
/// Containers nested deeper than [`MAX_NESTING`] are an error.
/// Integers become JSON integers, other numbers become JSON floats.
///
/// # Example
///
/// ```rust
/// use poloniex_book::feed::literal::parse;
///
/// let value = parse("{u'type': u'bid', 'rate': '0.5', 'n': (1, 2), 'ok': True}").unwrap();
/// assert_eq!(value["type"], "bid");
/// assert_eq!(value["n"][1], 2);
/// assert_eq!(value["ok"], true);
/// ```
pub fn parse(input: &str) -> Result<Value, LiteralError> {
    let mut parser = Parser {
        src: input.as_bytes(),
        text: input,
        pos: 0,
        depth: 0,
    };
    let value = parser.value()?;
    parser.skip_ws();
    if parser.pos != parser.src.len() {
        return Err(parser.error("trailing characters"));
    }
    Ok(value)
}

struct Parser<'a> {
    src: &'a [u8],
    text: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, message: impl Into<String>) -> LiteralError {
        LiteralError {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), LiteralError> {
        self.skip_ws();
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", byte as char)))
        }
    }

    fn value(&mut self) -> Result<Value, LiteralError> {
        self.skip_ws();
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some(b'{') => self.nested(Self::dict),
            Some(b'[') => self.nested(|p| p.sequence(b'[', b']')),
            Some(b'(') => self.nested(|p| p.sequence(b'(', b')')),
            Some(b'\'' | b'"') => self.string().map(Value::String),
            Some(b'-' | b'+' | b'.' | b'0'..=b'9') => self.number(),
            Some(c) if c.is_ascii_alphabetic() => self.word(),
            Some(c) => Err(self.error(format!("unexpected character '{}'", c as char))),
        }
    }

    fn nested(
        &mut self,
        container: impl FnOnce(&mut Self) -> Result<Value, LiteralError>,
    ) -> Result<Value, LiteralError> {
        if self.depth == MAX_NESTING {
            return Err(self.error("containers nested too deeply"));
        }
        self.depth += 1;
        let value = container(self);
        self.depth -= 1;
        value
    }

    fn dict(&mut self) -> Result<Value, LiteralError> {
        self.expect(b'{')?;
        let mut map = Map::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(b'}') {
                self.pos += 1;
                return Ok(Value::Object(map));
            }
            let key = match self.value()? {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                _ => return Err(self.error("dict keys must be strings or numbers")),
            };
            self.expect(b':')?;
            let value = self.value()?;
            map.insert(key, value);

            self.skip_ws();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {}
                _ => return Err(self.error("expected ',' or '}'")),
            }
        }
    }

    fn sequence(&mut self, open: u8, close: u8) -> Result<Value, LiteralError> {
        self.expect(open)?;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(Value::Array(items));
            }
            items.push(self.value()?);

            self.skip_ws();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(c) if c == close => {}
                _ => return Err(self.error(format!("expected ',' or '{}'", close as char))),
            }
        }
    }

    /// Bare words: booleans, None, or a prefixed string such as `u'...'`
    fn word(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
            self.pos += 1;
        }
        let text = self.text;
        let word = &text[start..self.pos];

        if matches!(self.peek(), Some(b'\'' | b'"')) {
            let prefix = word.to_ascii_lowercase();
            if prefix.len() <= 2 && prefix.chars().all(|c| matches!(c, 'u' | 'b' | 'r')) {
                let raw = prefix.contains('r');
                return self.quoted(raw).map(Value::String);
            }
        }

        match word {
            "True" => Ok(Value::Bool(true)),
            "False" => Ok(Value::Bool(false)),
            "None" => Ok(Value::Null),
            _ => {
                self.pos = start;
                Err(self.error(format!("unknown name '{word}'")))
            }
        }
    }

    fn string(&mut self) -> Result<String, LiteralError> {
        self.quoted(false)
    }

    fn quoted(&mut self, raw: bool) -> Result<String, LiteralError> {
        let quote = match self.peek() {
            Some(q @ (b'\'' | b'"')) => q,
            _ => return Err(self.error("expected string")),
        };
        self.pos += 1;

        let mut out = String::new();
        loop {
            let start = self.pos;
            while matches!(self.peek(), Some(c) if c != quote && c != b'\\') {
                self.pos += 1;
            }
            out.push_str(&self.text[start..self.pos]);

            match self.peek() {
                None => return Err(self.error("unterminated string")),
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(_) => {
                    // backslash
                    self.pos += 1;
                    let Some(escaped) = self.peek() else {
                        return Err(self.error("unterminated escape"));
                    };
                    if raw {
                        out.push('\\');
                        continue;
                    }
                    self.pos += 1;
                    match escaped {
                        b'n' => out.push('\n'),
                        b't' => out.push('\t'),
                        b'r' => out.push('\r'),
                        b'0' => out.push('\0'),
                        b'\\' => out.push('\\'),
                        b'\'' => out.push('\''),
                        b'"' => out.push('"'),
                        b'x' => out.push(self.hex_escape(2)?),
                        b'u' => out.push(self.hex_escape(4)?),
                        b'U' => out.push(self.hex_escape(8)?),
                        _ => {
                            // unknown escapes are kept verbatim
                            out.push('\\');
                            self.pos -= 1;
                        }
                    }
                }
            }
        }
    }

    fn hex_escape(&mut self, digits: usize) -> Result<char, LiteralError> {
        let end = self.pos + digits;
        let hex = self
            .text
            .get(self.pos..end)
            .ok_or_else(|| self.error("truncated escape"))?;
        let code = u32::from_str_radix(hex, 16).map_err(|_| self.error("invalid hex escape"))?;
        let ch = char::from_u32(code).ok_or_else(|| self.error("invalid code point"))?;
        self.pos = end;
        Ok(ch)
    }

    fn number(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        while matches!(
            self.peek(),
            Some(b'0'..=b'9' | b'.' | b'-' | b'+' | b'e' | b'E' | b'_')
        ) {
            self.pos += 1;
        }
        // Python 2 long suffix
        if matches!(self.peek(), Some(b'L' | b'l')) {
            self.pos += 1;
        }
        let text: String = self.text[start..self.pos]
            .chars()
            .filter(|c| !matches!(c, '_' | 'L' | 'l'))
            .collect();

        if let Ok(n) = text.parse::<i64>() {
            return Ok(Value::Number(n.into()));
        }
        if let Ok(n) = text.trim_start_matches('+').parse::<u64>() {
            return Ok(Value::Number(n.into()));
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| {
                self.pos = start;
                self.error(format!("invalid number '{text}'"))
            })
    }
}
