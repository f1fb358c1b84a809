//! Literal-sequence cell encoding for list-valued CSV cells.
//!
//! Lists are written the way the downstream notebooks expect to read them back:
//! `['first', "it's"]`. Parsing accepts single- or double-quoted strings with
//! backslash escapes, plus bare numbers and identifiers (`nan`, `None`, `True`)
//! which are kept as their text. A nested list becomes one element holding its
//! re-rendered literal (`[['x']]` → `["['x']"]`); bare scalars inside it are
//! rendered quoted. Dicts, tuples and sets are rejected.

use std::fmt::Write as _;

/// Render `items` as a literal sequence.
pub fn format_list<S: AsRef<str>>(items: &[S]) -> String {
    let mut out = String::from("[");
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        push_quoted(&mut out, item.as_ref());
    }
    out.push(']');
    out
}

fn push_quoted(out: &mut String, s: &str) {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
}

/// Parse a literal sequence. Returns `None` when `s` is not a flat literal list.
pub fn parse_list(s: &str) -> Option<Vec<String>> {
    let mut p = Parser { chars: s.trim().chars().collect(), pos: 0 };
    let items = p.list()?;
    p.skip_ws();
    if p.pos != p.chars.len() {
        return None;
    }
    Some(items)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn list(&mut self) -> Option<Vec<String>> {
        if self.bump()? != '[' {
            return None;
        }
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            match self.peek()? {
                ']' => {
                    self.pos += 1;
                    return Some(items);
                }
                _ => items.push(self.element()?),
            }
            self.skip_ws();
            match self.bump()? {
                ',' => continue,
                ']' => return Some(items),
                _ => return None,
            }
        }
    }

    fn element(&mut self) -> Option<String> {
        match self.peek()? {
            q @ ('\'' | '"') => {
                self.pos += 1;
                self.quoted(q)
            }
            '[' => self.list().map(|inner| format_list(&inner)),
            c if c.is_alphanumeric() || matches!(c, '_' | '-' | '+' | '.') => Some(self.bare()),
            _ => None,
        }
    }

    fn bare(&mut self) -> String {
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '+' | '.') {
                s.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        s
    }

    fn quoted(&mut self, quote: char) -> Option<String> {
        let mut s = String::new();
        loop {
            match self.bump()? {
                c if c == quote => return Some(s),
                '\\' => {
                    let esc = self.bump()?;
                    match esc {
                        'n' => s.push('\n'),
                        'r' => s.push('\r'),
                        't' => s.push('\t'),
                        '0' => s.push('\0'),
                        '\\' | '\'' | '"' => s.push(esc),
                        'x' => s.push(self.hex_escape(2)?),
                        'u' => s.push(self.hex_escape(4)?),
                        'U' => s.push(self.hex_escape(8)?),
                        '\n' => {} // line continuation
                        other => {
                            s.push('\\');
                            s.push(other);
                        }
                    }
                }
                c => s.push(c),
            }
        }
    }

    fn hex_escape(&mut self, digits: usize) -> Option<char> {
        let mut v = 0u32;
        for _ in 0..digits {
            v = v * 16 + self.bump()?.to_digit(16)?;
        }
        char::from_u32(v)
    }
}
