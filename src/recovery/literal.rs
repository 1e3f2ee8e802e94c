//! Restricted literal evaluator for JSON-like text.
//!
//! LLMs emit a dialect somewhere between strict JSON and Python repr:
//! single-quoted strings, `True`/`False`/`None`, trailing commas. This module
//! evaluates that dialect into a `serde_json::Value` with a small
//! recursive-descent parser — literals only, no expressions, so there is
//! nothing here that can execute code.

use serde_json::{Map, Number, Value};

/// Maximum nesting depth the evaluator will follow before giving up.
const MAX_DEPTH: usize = 128;

/// Errors produced while evaluating a literal.
#[derive(Debug, thiserror::Error)]
pub enum LiteralError {
    /// Input ended before the literal was complete.
    #[error("unexpected end of input")]
    UnexpectedEnd,

    /// A character that cannot start or continue the expected token.
    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    /// A complete literal was parsed but input remained after it.
    #[error("trailing characters after literal at position {pos}")]
    TrailingChars { pos: usize },

    /// A malformed numeric token.
    #[error("invalid number at position {pos}")]
    InvalidNumber { pos: usize },

    /// A backslash escape the evaluator does not accept.
    #[error("invalid escape sequence at position {pos}")]
    InvalidEscape { pos: usize },

    /// Nesting beyond the supported depth.
    #[error("nesting too deep")]
    TooDeep,
}

/// Evaluate a text fragment as a structured literal.
///
/// Accepts strict JSON plus the Python-flavored forms LLMs produce:
/// single-quoted strings, `True`/`False`/`None`, and trailing commas after
/// at least one element. Rejects everything else — identifiers, arithmetic,
/// unquoted keys, comments.
///
/// The entire input must be consumed (surrounding whitespace aside).
///
/// # Examples
///
/// ```
/// use prompt_forge::recovery::literal_eval;
///
/// let v = literal_eval("{'active': True, 'tags': ['a', 'b',]}").unwrap();
/// assert_eq!(v["active"], true);
/// assert_eq!(v["tags"][1], "b");
///
/// assert!(literal_eval("1 + 1").is_err());
/// ```
pub fn literal_eval(input: &str) -> Result<Value, LiteralError> {
    let chars: Vec<char> = input.chars().collect();
    let mut parser = Parser {
        chars: &chars,
        pos: 0,
    };
    parser.skip_whitespace();
    let value = parser.parse_value(0)?;
    parser.skip_whitespace();
    if parser.pos < parser.chars.len() {
        return Err(LiteralError::TrailingChars { pos: parser.pos });
    }
    Ok(value)
}

/// Check whether text evaluates to a mapping or sequence.
///
/// Scalars do not count: a bare number or string is valid as a literal but is
/// not the structured payload callers of the recovery parser are after.
pub fn is_valid_container(input: &str) -> bool {
    matches!(
        literal_eval(input),
        Ok(Value::Object(_)) | Ok(Value::Array(_))
    )
}

struct Parser<'a> {
    chars: &'a [char],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn parse_value(&mut self, depth: usize) -> Result<Value, LiteralError> {
        if depth >= MAX_DEPTH {
            return Err(LiteralError::TooDeep);
        }
        match self.peek() {
            None => Err(LiteralError::UnexpectedEnd),
            Some('{') => self.parse_object(depth),
            Some('[') => self.parse_array(depth),
            Some('"') | Some('\'') => Ok(Value::String(self.parse_string()?)),
            Some(c) if c == '-' || c.is_ascii_digit() => self.parse_number(),
            Some(c) if c.is_alphabetic() => self.parse_word(),
            Some(ch) => Err(LiteralError::UnexpectedChar { ch, pos: self.pos }),
        }
    }

    fn parse_object(&mut self, depth: usize) -> Result<Value, LiteralError> {
        self.bump(); // consume '{'
        let mut map = Map::new();
        self.skip_whitespace();
        if self.peek() == Some('}') {
            self.bump();
            return Ok(Value::Object(map));
        }
        loop {
            self.skip_whitespace();
            // Keys must be quoted strings in either style.
            match self.peek() {
                Some('"') | Some('\'') => {}
                Some(ch) => return Err(LiteralError::UnexpectedChar { ch, pos: self.pos }),
                None => return Err(LiteralError::UnexpectedEnd),
            }
            let key = self.parse_string()?;
            self.skip_whitespace();
            match self.bump() {
                Some(':') => {}
                Some(ch) => {
                    return Err(LiteralError::UnexpectedChar {
                        ch,
                        pos: self.pos - 1,
                    })
                }
                None => return Err(LiteralError::UnexpectedEnd),
            }
            self.skip_whitespace();
            let value = self.parse_value(depth + 1)?;
            map.insert(key, value);
            self.skip_whitespace();
            match self.bump() {
                Some(',') => {
                    self.skip_whitespace();
                    // Trailing comma before the closing brace.
                    if self.peek() == Some('}') {
                        self.bump();
                        return Ok(Value::Object(map));
                    }
                }
                Some('}') => return Ok(Value::Object(map)),
                Some(ch) => {
                    return Err(LiteralError::UnexpectedChar {
                        ch,
                        pos: self.pos - 1,
                    })
                }
                None => return Err(LiteralError::UnexpectedEnd),
            }
        }
    }

    fn parse_array(&mut self, depth: usize) -> Result<Value, LiteralError> {
        self.bump(); // consume '['
        let mut items = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(']') {
            self.bump();
            return Ok(Value::Array(items));
        }
        loop {
            self.skip_whitespace();
            items.push(self.parse_value(depth + 1)?);
            self.skip_whitespace();
            match self.bump() {
                Some(',') => {
                    self.skip_whitespace();
                    // Trailing comma before the closing bracket.
                    if self.peek() == Some(']') {
                        self.bump();
                        return Ok(Value::Array(items));
                    }
                }
                Some(']') => return Ok(Value::Array(items)),
                Some(ch) => {
                    return Err(LiteralError::UnexpectedChar {
                        ch,
                        pos: self.pos - 1,
                    })
                }
                None => return Err(LiteralError::UnexpectedEnd),
            }
        }
    }

    fn parse_string(&mut self) -> Result<String, LiteralError> {
        let delim = self.bump().expect("caller checked for a quote");
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(LiteralError::UnexpectedEnd),
                Some(c) if c == delim => return Ok(out),
                Some('\\') => {
                    let escape_pos = self.pos - 1;
                    match self.bump() {
                        None => return Err(LiteralError::UnexpectedEnd),
                        Some('n') => out.push('\n'),
                        Some('t') => out.push('\t'),
                        Some('r') => out.push('\r'),
                        Some('b') => out.push('\u{0008}'),
                        Some('f') => out.push('\u{000C}'),
                        Some('\\') => out.push('\\'),
                        Some('/') => out.push('/'),
                        Some('\'') => out.push('\''),
                        Some('"') => out.push('"'),
                        Some('u') => {
                            let mut code = 0u32;
                            for _ in 0..4 {
                                let digit = self
                                    .bump()
                                    .and_then(|c| c.to_digit(16))
                                    .ok_or(LiteralError::InvalidEscape { pos: escape_pos })?;
                                code = code * 16 + digit;
                            }
                            let ch = char::from_u32(code)
                                .ok_or(LiteralError::InvalidEscape { pos: escape_pos })?;
                            out.push(ch);
                        }
                        Some(_) => return Err(LiteralError::InvalidEscape { pos: escape_pos }),
                    }
                }
                Some(c) => out.push(c),
            }
        }
    }

    fn parse_number(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        let mut text = String::new();
        if self.peek() == Some('-') {
            text.push('-');
            self.bump();
        }
        let int_digits = self.take_digits(&mut text);
        let mut is_float = false;
        if self.peek() == Some('.') {
            is_float = true;
            text.push('.');
            self.bump();
            self.take_digits(&mut text);
        }
        if int_digits == 0 && text.trim_start_matches('-') == "." {
            return Err(LiteralError::InvalidNumber { pos: start });
        }
        if int_digits == 0 && !is_float {
            return Err(LiteralError::InvalidNumber { pos: start });
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            is_float = true;
            text.push('e');
            self.bump();
            if matches!(self.peek(), Some('+') | Some('-')) {
                text.push(self.bump().expect("peeked"));
            }
            if self.take_digits(&mut text) == 0 {
                return Err(LiteralError::InvalidNumber { pos: start });
            }
        }

        if !is_float {
            if let Ok(n) = text.parse::<i64>() {
                return Ok(Value::Number(Number::from(n)));
            }
        }
        let f: f64 = text
            .parse()
            .map_err(|_| LiteralError::InvalidNumber { pos: start })?;
        Number::from_f64(f)
            .map(Value::Number)
            .ok_or(LiteralError::InvalidNumber { pos: start })
    }

    fn take_digits(&mut self, text: &mut String) -> usize {
        let mut count = 0;
        while let Some(c) = self.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            text.push(c);
            self.bump();
            count += 1;
        }
        count
    }

    fn parse_word(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        let mut word = String::new();
        while self.peek().is_some_and(|c| c.is_alphabetic()) {
            word.push(self.bump().expect("peeked"));
        }
        match word.as_str() {
            "true" | "True" => Ok(Value::Bool(true)),
            "false" | "False" => Ok(Value::Bool(false)),
            "null" | "None" => Ok(Value::Null),
            _ => Err(LiteralError::UnexpectedChar {
                ch: self.chars[start],
                pos: start,
            }),
        }
    }
}
