//! Literal codec for structured attribute values.
//!
//! Structured values travel on the wire as Python-style literal text, as
//! written by the network build tooling: `{50: 10.0, 55: 4.5}` for a noise
//! exposure map, `{'road': 2}` for source counts, `(0, 1)` for a node pair,
//! `True`/`False` for booleans. This module parses exactly that subset —
//! single-level containers with numeric or quoted-string scalars, nothing
//! evaluated.

use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Parse a literal boolean token (`True` / `False`).
pub fn parse_bool(text: &str) -> Result<bool> {
    match text.trim() {
        "True" => Ok(true),
        "False" => Ok(false),
        _ => Err(literal_err(text)),
    }
}

/// Parse an int-keyed float map, e.g. `{50: 10.0, 55: 4.5}`.
pub fn parse_db_map(text: &str) -> Result<BTreeMap<i32, f64>> {
    let mut cur = Cursor::new(text);
    cur.skip_ws();
    cur.eat('{')?;

    let mut map = BTreeMap::new();
    cur.skip_ws();
    if cur.peek() == Some('}') {
        cur.bump();
        cur.finish()?;
        return Ok(map);
    }

    loop {
        cur.skip_ws();
        let key: i32 = cur.number()?;
        cur.skip_ws();
        cur.eat(':')?;
        cur.skip_ws();
        let value: f64 = cur.number()?;
        map.insert(key, value);

        cur.skip_ws();
        match cur.bump() {
            Some(',') => continue,
            Some('}') => break,
            _ => return Err(literal_err(text)),
        }
    }

    cur.finish()?;
    Ok(map)
}

/// Parse a string-keyed integer map, e.g. `{'road': 2, 'tram': 1}`.
pub fn parse_count_map(text: &str) -> Result<BTreeMap<String, i64>> {
    let mut cur = Cursor::new(text);
    cur.skip_ws();
    cur.eat('{')?;

    let mut map = BTreeMap::new();
    cur.skip_ws();
    if cur.peek() == Some('}') {
        cur.bump();
        cur.finish()?;
        return Ok(map);
    }

    loop {
        cur.skip_ws();
        let key = cur.quoted_string()?;
        cur.skip_ws();
        cur.eat(':')?;
        cur.skip_ws();
        let value: i64 = cur.number()?;
        map.insert(key, value);

        cur.skip_ws();
        match cur.bump() {
            Some(',') => continue,
            Some('}') => break,
            _ => return Err(literal_err(text)),
        }
    }

    cur.finish()?;
    Ok(map)
}

/// Parse an integer pair, e.g. `(0, 1)`.
pub fn parse_int_pair(text: &str) -> Result<(i64, i64)> {
    let mut cur = Cursor::new(text);
    cur.skip_ws();
    cur.eat('(')?;
    cur.skip_ws();
    let first: i64 = cur.number()?;
    cur.skip_ws();
    cur.eat(',')?;
    cur.skip_ws();
    let second: i64 = cur.number()?;
    cur.skip_ws();
    cur.eat(')')?;
    cur.finish()?;
    Ok((first, second))
}

/// Format a float the way the wire format expects (`2.0`, not `2`).
pub fn format_float(value: f64) -> String {
    format!("{:?}", value)
}

/// Format an int-keyed float map, keys in ascending order.
pub fn format_db_map(map: &BTreeMap<i32, f64>) -> String {
    let entries: Vec<String> = map
        .iter()
        .map(|(k, v)| format!("{}: {}", k, format_float(*v)))
        .collect();
    format!("{{{}}}", entries.join(", "))
}

/// Format a string-keyed integer map with single-quoted keys.
pub fn format_count_map(map: &BTreeMap<String, i64>) -> String {
    let entries: Vec<String> = map
        .iter()
        .map(|(k, v)| format!("'{}': {}", k, v))
        .collect();
    format!("{{{}}}", entries.join(", "))
}

fn literal_err(text: &str) -> Error {
    Error::Literal(text.to_string())
}

/// Character cursor over the literal text.
struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn eat(&mut self, expected: char) -> Result<()> {
        if self.bump() == Some(expected) {
            Ok(())
        } else {
            Err(literal_err(self.src))
        }
    }

    /// Consume a numeric token and parse it.
    fn number<T: std::str::FromStr>(&mut self) -> Result<T> {
        let start = self.pos;
        while matches!(
            self.peek(),
            Some(c) if c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E')
        ) {
            self.bump();
        }
        if self.pos == start {
            return Err(literal_err(self.src));
        }
        self.src[start..self.pos]
            .parse()
            .map_err(|_| literal_err(self.src))
    }

    /// Consume a single- or double-quoted string.
    fn quoted_string(&mut self) -> Result<String> {
        let quote = match self.bump() {
            Some(c @ ('\'' | '"')) => c,
            _ => return Err(literal_err(self.src)),
        };
        let mut out = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(out),
                Some('\\') => match self.bump() {
                    Some(escaped) => out.push(escaped),
                    None => return Err(literal_err(self.src)),
                },
                Some(c) => out.push(c),
                None => return Err(literal_err(self.src)),
            }
        }
    }

    /// Require that the whole input was consumed.
    fn finish(&mut self) -> Result<()> {
        self.skip_ws();
        if self.pos == self.src.len() {
            Ok(())
        } else {
            Err(literal_err(self.src))
        }
    }
}
