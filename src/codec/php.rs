//! PHP `serialize()` text format for `serde_json::Value`.
//!
//! Arrays are written as `a:` with integer keys and objects as
//! `O:8:"stdClass"`, the way PHP serializes decoded JSON, so an empty object
//! stays distinct from an empty array. On read, an `a:` whose keys are
//! exactly `0..n` in order becomes a JSON array and any other `a:` becomes
//! a JSON object; `O:` payloads are read as objects whatever their class.
//!
//! PHP integers are signed 64-bit. Larger `u64` values are written as a `d:`
//! literal without a fraction, which PHP reads as a float and the reader
//! here reads back exactly; floats always carry a fraction or exponent.

use serde_json::{Map, Number, Value};

use super::CodecError;

const OBJECT_CLASS: &str = "stdClass";

/// Nesting limit for arrays and objects, matching serde_json's reader.
const MAX_DEPTH: usize = 128;

// == Writer ==
pub fn serialize(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("N;"),
        Value::Bool(b) => out.push_str(if *b { "b:1;" } else { "b:0;" }),
        Value::Number(n) => write_number(out, n),
        Value::String(s) => write_str(out, s),
        Value::Array(items) => {
            out.push_str(&format!("a:{}:{{", items.len()));
            for (index, item) in items.iter().enumerate() {
                out.push_str(&format!("i:{};", index));
                write_value(out, item);
            }
            out.push('}');
        }
        Value::Object(map) => {
            out.push_str(&format!(
                "O:{}:\"{}\":{}:{{",
                OBJECT_CLASS.len(),
                OBJECT_CLASS,
                map.len()
            ));
            for (key, item) in map {
                write_str(out, key);
                write_value(out, item);
            }
            out.push('}');
        }
    }
}

fn write_number(out: &mut String, n: &Number) {
    if let Some(i) = n.as_i64() {
        out.push_str(&format!("i:{};", i));
    } else if let Some(u) = n.as_u64() {
        out.push_str(&format!("d:{};", u));
    } else {
        let mut text = n.as_f64().unwrap_or(0.0).to_string();
        if !text.contains(['.', 'e', 'E']) {
            text.push_str(".0");
        }
        out.push_str(&format!("d:{};", text));
    }
}

fn write_str(out: &mut String, s: &str) {
    // Length is in bytes, not chars
    out.push_str(&format!("s:{}:\"{}\";", s.len(), s));
}

// == Reader ==
pub fn unserialize(bytes: &[u8]) -> Result<Value, CodecError> {
    let mut parser = Parser {
        input: bytes,
        pos: 0,
        depth: 0,
    };
    let value = parser.parse_value()?;
    if parser.pos != bytes.len() {
        return Err(parser.error("trailing data"));
    }
    Ok(value)
}

enum ArrayKey {
    Int(i64),
    Str(String),
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn parse_value(&mut self) -> Result<Value, CodecError> {
        match self.next_byte()? {
            b'N' => {
                self.expect(b';')?;
                Ok(Value::Null)
            }
            b'b' => {
                self.expect(b':')?;
                match self.read_until(b';')? {
                    b"0" => Ok(Value::Bool(false)),
                    b"1" => Ok(Value::Bool(true)),
                    _ => Err(self.error("invalid boolean")),
                }
            }
            b'i' => {
                self.expect(b':')?;
                let n: i64 = self.read_number(b';')?;
                Ok(Value::from(n))
            }
            b'd' => {
                self.expect(b':')?;
                self.read_float()
            }
            b's' => {
                self.expect(b':')?;
                Ok(Value::String(self.read_string()?))
            }
            b'a' => {
                self.expect(b':')?;
                let entries = self.read_entries()?;
                Ok(entries_to_value(entries))
            }
            b'O' => {
                self.expect(b':')?;
                let _class = self.read_string_body()?;
                self.expect(b':')?;
                let entries = self.read_entries()?;
                let map = entries
                    .into_iter()
                    .map(|(key, value)| (key_to_string(key), value))
                    .collect::<Map<_, _>>();
                Ok(Value::Object(map))
            }
            other => {
                self.pos -= 1;
                Err(self.error(format!("unknown type tag '{}'", other as char)))
            }
        }
    }

    /// Reads a `d:` body. A bare integer above `i64::MAX` is a `u64`.
    fn read_float(&mut self) -> Result<Value, CodecError> {
        let start = self.pos;
        let text = self.read_until(b';')?;
        let text = std::str::from_utf8(text).map_err(|_| CodecError::Php {
            offset: start,
            reason: "invalid number".to_string(),
        })?;

        if text.bytes().all(|b| b.is_ascii_digit()) {
            if let Some(u) = text.parse::<u64>().ok().filter(|u| i64::try_from(*u).is_err()) {
                return Ok(Value::from(u));
            }
        }

        let f: f64 = text.parse().map_err(|_| CodecError::Php {
            offset: start,
            reason: "invalid number".to_string(),
        })?;
        Number::from_f64(f)
            .map(Value::Number)
            .ok_or_else(|| self.error("non-finite float"))
    }

    /// Reads `<count>:{<key><value>...}`.
    fn read_entries(&mut self) -> Result<Vec<(ArrayKey, Value)>, CodecError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        self.depth += 1;
        let entries = self.read_entry_list();
        self.depth -= 1;
        entries
    }

    fn read_entry_list(&mut self) -> Result<Vec<(ArrayKey, Value)>, CodecError> {
        let count: usize = self.read_number(b':')?;
        self.expect(b'{')?;
        let remaining = self.input.len() - self.pos;
        let mut entries = Vec::with_capacity(count.min(remaining));
        for _ in 0..count {
            let key = self.parse_key()?;
            let value = self.parse_value()?;
            entries.push((key, value));
        }
        self.expect(b'}')?;
        Ok(entries)
    }

    fn parse_key(&mut self) -> Result<ArrayKey, CodecError> {
        match self.next_byte()? {
            b'i' => {
                self.expect(b':')?;
                Ok(ArrayKey::Int(self.read_number(b';')?))
            }
            b's' => {
                self.expect(b':')?;
                Ok(ArrayKey::Str(self.read_string()?))
            }
            _ => {
                self.pos -= 1;
                Err(self.error("array key must be int or string"))
            }
        }
    }

    /// Reads `<len>:"<bytes>";`.
    fn read_string(&mut self) -> Result<String, CodecError> {
        let s = self.read_string_body()?;
        self.expect(b';')?;
        Ok(s)
    }

    /// Reads `<len>:"<bytes>"`.
    fn read_string_body(&mut self) -> Result<String, CodecError> {
        let len: usize = self.read_number(b':')?;
        self.expect(b'"')?;
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.input.len())
            .ok_or_else(|| self.error("string length exceeds payload"))?;
        let bytes = &self.input[self.pos..end];
        let s = std::str::from_utf8(bytes)
            .map_err(|_| self.error("string is not valid utf-8"))?
            .to_string();
        self.pos = end;
        self.expect(b'"')?;
        Ok(s)
    }

    fn read_number<T: std::str::FromStr>(&mut self, terminator: u8) -> Result<T, CodecError> {
        let start = self.pos;
        let text = self.read_until(terminator)?;
        std::str::from_utf8(text)
            .ok()
            .and_then(|t| t.parse().ok())
            .ok_or(CodecError::Php {
                offset: start,
                reason: "invalid number".to_string(),
            })
    }

    /// Returns the bytes before `terminator` and consumes the terminator.
    fn read_until(&mut self, terminator: u8) -> Result<&'a [u8], CodecError> {
        let input = self.input;
        let rest = &input[self.pos..];
        let len = rest
            .iter()
            .position(|b| *b == terminator)
            .ok_or_else(|| self.error(format!("expected '{}'", terminator as char)))?;
        self.pos += len + 1;
        Ok(&rest[..len])
    }

    fn next_byte(&mut self) -> Result<u8, CodecError> {
        let b = *self
            .input
            .get(self.pos)
            .ok_or_else(|| self.error("unexpected end of payload"))?;
        self.pos += 1;
        Ok(b)
    }

    fn expect(&mut self, expected: u8) -> Result<(), CodecError> {
        if self.next_byte()? == expected {
            Ok(())
        } else {
            self.pos -= 1;
            Err(self.error(format!("expected '{}'", expected as char)))
        }
    }

    fn error(&self, reason: impl Into<String>) -> CodecError {
        CodecError::Php {
            offset: self.pos,
            reason: reason.into(),
        }
    }
}

fn entries_to_value(entries: Vec<(ArrayKey, Value)>) -> Value {
    let is_list = entries
        .iter()
        .enumerate()
        .all(|(index, (key, _))| matches!(key, ArrayKey::Int(i) if *i == index as i64));

    if is_list {
        Value::Array(entries.into_iter().map(|(_, value)| value).collect())
    } else {
        Value::Object(
            entries
                .into_iter()
                .map(|(key, value)| (key_to_string(key), value))
                .collect(),
        )
    }
}

fn key_to_string(key: ArrayKey) -> String {
    match key {
        ArrayKey::Int(i) => i.to_string(),
        ArrayKey::Str(s) => s,
    }
}
