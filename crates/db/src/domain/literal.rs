//! Literal-only parser for stored filter domains.
//!
//! Accepts the literal subset of the expression syntax saved filters are
//! stored in: strings, numbers, `True`/`False`/`None`, lists, tuples, dicts
//! and sets. Names, calls, attribute access and operators are rejected, so a
//! stored domain can never run code.

use serde_json::{Map, Number, Value};

use super::DomainError;

/// Maximum container nesting accepted by the parser.
pub const MAX_DEPTH: usize = 64;

/// A parsed literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Literal>),
    Tuple(Vec<Literal>),
    Set(Vec<Literal>),
    Dict(Vec<(Literal, Literal)>),
}

impl Literal {
    /// Returns the string payload, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to a JSON value. Sequences become arrays, dict keys are stringified.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::None => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::Number((*i).into()),
            Self::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
            Self::Str(s) => Value::String(s.clone()),
            Self::List(items) | Self::Tuple(items) | Self::Set(items) => {
                Value::Array(items.iter().map(Self::to_json).collect())
            }
            Self::Dict(pairs) => {
                let map: Map<String, Value> = pairs
                    .iter()
                    .map(|(k, v)| {
                        let key = match k {
                            Self::Str(s) => s.clone(),
                            other => other.to_json().to_string(),
                        };
                        (key, v.to_json())
                    })
                    .collect();
                Value::Object(map)
            }
        }
    }
}

/// Parse a complete literal expression.
///
/// # Errors
/// Returns a [`DomainError`] for anything that is not a plain literal.
pub fn parse_literal(input: &str) -> Result<Literal, DomainError> {
    let mut parser = Parser::new(input);
    let value = parser.value(0)?;
    parser.skip_ws();
    match parser.peek() {
        None => Ok(value),
        Some(c) => Err(parser.unexpected(c)),
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    #[inline]
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    #[inline]
    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn unexpected(&self, found: char) -> DomainError {
        DomainError::UnexpectedChar {
            found,
            offset: self.pos,
        }
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += 1;
            } else if c == '\\' && matches!(self.peek_at(1), Some('\n')) {
                // explicit line continuation
                self.pos += 2;
            } else {
                break;
            }
        }
    }

    fn expect(&mut self, want: char) -> Result<(), DomainError> {
        self.skip_ws();
        match self.bump() {
            Some(c) if c == want => Ok(()),
            Some(c) => {
                self.pos -= 1;
                Err(self.unexpected(c))
            }
            None => Err(DomainError::UnexpectedEnd),
        }
    }

    fn value(&mut self, depth: usize) -> Result<Literal, DomainError> {
        if depth > MAX_DEPTH {
            return Err(DomainError::TooDeep(MAX_DEPTH));
        }
        self.skip_ws();
        let Some(c) = self.peek() else {
            return Err(DomainError::UnexpectedEnd);
        };

        match c {
            '[' => {
                self.bump();
                self.sequence(']', depth).map(Literal::List)
            }
            '(' => self.paren(depth),
            '{' => self.braces(depth),
            '\'' | '"' => self.strings(false),
            '+' | '-' => self.signed_number(),
            c if c.is_ascii_digit() => self.number(false),
            '.' if self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) => self.number(false),
            c if c.is_alphabetic() || c == '_' => self.word(),
            other => Err(self.unexpected(other)),
        }
    }

    /// Items up to `close`, the opening bracket already consumed. Trailing comma allowed.
    fn sequence(&mut self, close: char, depth: usize) -> Result<Vec<Literal>, DomainError> {
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some(c) if c == close => {
                    self.bump();
                    return Ok(items);
                }
                None => return Err(DomainError::UnexpectedEnd),
                _ => {}
            }

            items.push(self.value(depth + 1)?);

            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some(c) if c == close => {}
                Some(c) => return Err(self.unexpected(c)),
                None => return Err(DomainError::UnexpectedEnd),
            }
        }
    }

    fn paren(&mut self, depth: usize) -> Result<Literal, DomainError> {
        self.bump();
        self.skip_ws();
        if self.peek() == Some(')') {
            self.bump();
            return Ok(Literal::Tuple(Vec::new()));
        }

        let first = self.value(depth + 1)?;
        self.skip_ws();
        match self.bump() {
            // parenthesized expression, not a tuple
            Some(')') => Ok(first),
            Some(',') => {
                let mut items = vec![first];
                items.extend(self.sequence(')', depth)?);
                Ok(Literal::Tuple(items))
            }
            Some(c) => {
                self.pos -= 1;
                Err(self.unexpected(c))
            }
            None => Err(DomainError::UnexpectedEnd),
        }
    }

    fn braces(&mut self, depth: usize) -> Result<Literal, DomainError> {
        self.bump();
        self.skip_ws();
        if self.peek() == Some('}') {
            self.bump();
            return Ok(Literal::Dict(Vec::new()));
        }

        let first = self.value(depth + 1)?;
        self.skip_ws();
        if self.peek() != Some(':') {
            let mut items = vec![first];
            match self.peek() {
                Some(',') => {
                    self.bump();
                    items.extend(self.sequence('}', depth)?);
                }
                Some('}') => {
                    self.bump();
                }
                Some(c) => return Err(self.unexpected(c)),
                None => return Err(DomainError::UnexpectedEnd),
            }
            return Ok(Literal::Set(items));
        }

        self.bump();
        let mut pairs = vec![(first, self.value(depth + 1)?)];
        loop {
            self.skip_ws();
            match self.bump() {
                Some('}') => return Ok(Literal::Dict(pairs)),
                Some(',') => {
                    self.skip_ws();
                    if self.peek() == Some('}') {
                        self.bump();
                        return Ok(Literal::Dict(pairs));
                    }
                    let key = self.value(depth + 1)?;
                    self.expect(':')?;
                    let value = self.value(depth + 1)?;
                    pairs.push((key, value));
                }
                Some(c) => {
                    self.pos -= 1;
                    return Err(self.unexpected(c));
                }
                None => return Err(DomainError::UnexpectedEnd),
            }
        }
    }

    /// Identifiers: the three keyword constants or a string prefix.
    fn word(&mut self) -> Result<Literal, DomainError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();

        if matches!(self.peek(), Some('\'' | '"')) {
            let lower = word.to_ascii_lowercase();
            if matches!(lower.as_str(), "u" | "b" | "r" | "br" | "rb") {
                return self.strings(lower.contains('r'));
            }
        }

        match word.as_str() {
            "True" => Ok(Literal::Bool(true)),
            "False" => Ok(Literal::Bool(false)),
            "None" => Ok(Literal::None),
            _ => Err(DomainError::NonLiteral(word)),
        }
    }

    /// One string literal plus any adjacent ones (implicit concatenation).
    fn strings(&mut self, raw: bool) -> Result<Literal, DomainError> {
        let mut out = self.string(raw)?;
        loop {
            self.skip_ws();
            match self.peek() {
                Some('\'' | '"') => out.push_str(&self.string(false)?),
                Some(c) if c.is_alphabetic() => {
                    let prefix_len = (1..=2)
                        .find(|&n| matches!(self.peek_at(n), Some('\'' | '"')))
                        .filter(|&n| {
                            let p: String = self.chars[self.pos..self.pos + n]
                                .iter()
                                .collect::<String>()
                                .to_ascii_lowercase();
                            matches!(p.as_str(), "u" | "b" | "r" | "br" | "rb")
                        });
                    let Some(n) = prefix_len else { break };
                    let is_raw = self.chars[self.pos..self.pos + n]
                        .iter()
                        .any(|c| c.eq_ignore_ascii_case(&'r'));
                    self.pos += n;
                    out.push_str(&self.string(is_raw)?);
                }
                _ => break,
            }
        }
        Ok(Literal::Str(out))
    }

    fn string(&mut self, raw: bool) -> Result<String, DomainError> {
        let start = self.pos;
        let Some(quote) = self.bump() else {
            return Err(DomainError::UnexpectedEnd);
        };
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.pos += 2;
        }

        let mut out = String::new();
        loop {
            let Some(c) = self.bump() else {
                return Err(DomainError::UnterminatedString(start));
            };
            match c {
                c if c == quote => {
                    if !triple {
                        return Ok(out);
                    }
                    if self.peek() == Some(quote) && self.peek_at(1) == Some(quote) {
                        self.pos += 2;
                        return Ok(out);
                    }
                    out.push(c);
                }
                '\n' if !triple => return Err(DomainError::UnterminatedString(start)),
                '\\' if raw => {
                    // raw strings keep the backslash, but it still protects a quote
                    out.push('\\');
                    if let Some(next) = self.bump() {
                        out.push(next);
                    }
                }
                '\\' => self.escape(&mut out)?,
                c => out.push(c),
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> Result<(), DomainError> {
        let at = self.pos - 1;
        let Some(c) = self.bump() else {
            return Err(DomainError::UnterminatedString(at));
        };
        match c {
            '\n' => {}
            '\\' | '\'' | '"' => out.push(c),
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0C}'),
            'v' => out.push('\u{0B}'),
            'x' => out.push(self.hex_escape(2, at)?),
            'u' => out.push(self.hex_escape(4, at)?),
            'U' => out.push(self.hex_escape(8, at)?),
            // unknown escapes are kept verbatim
            other => {
                out.push('\\');
                out.push(other);
            }
        }
        Ok(())
    }

    fn hex_escape(&mut self, len: usize, at: usize) -> Result<char, DomainError> {
        let end = self.pos + len;
        if end > self.chars.len() {
            return Err(DomainError::InvalidEscape(at));
        }
        let digits: String = self.chars[self.pos..end].iter().collect();
        self.pos = end;
        u32::from_str_radix(&digits, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or(DomainError::InvalidEscape(at))
    }

    fn signed_number(&mut self) -> Result<Literal, DomainError> {
        let negative = self.bump() == Some('-');
        self.skip_ws();
        match self.peek() {
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(negative),
            Some(c) => Err(self.unexpected(c)),
            None => Err(DomainError::UnexpectedEnd),
        }
    }

    fn number(&mut self, negative: bool) -> Result<Literal, DomainError> {
        let start = self.pos;
        let radix = match (self.peek(), self.peek_at(1)) {
            (Some('0'), Some('x' | 'X')) => Some(16),
            (Some('0'), Some('o' | 'O')) => Some(8),
            (Some('0'), Some('b' | 'B')) => Some(2),
            _ => None,
        };

        let literal = if let Some(radix) = radix {
            self.pos += 2;
            let digits = self.digits(|c| c.is_digit(radix));
            let parsed = i64::from_str_radix(&digits, radix).map_err(|_| self.bad_number(start))?;
            Literal::Int(if negative { -parsed } else { parsed })
        } else {
            let mut text = self.digits(|c| c.is_ascii_digit());
            let mut is_float = false;
            if self.peek() == Some('.') {
                is_float = true;
                self.bump();
                text.push('.');
                text.push_str(&self.digits(|c| c.is_ascii_digit()));
            }
            if matches!(self.peek(), Some('e' | 'E')) {
                is_float = true;
                self.bump();
                text.push('e');
                if let Some(sign @ ('+' | '-')) = self.peek() {
                    self.bump();
                    text.push(sign);
                }
                let exponent = self.digits(|c| c.is_ascii_digit());
                if exponent.is_empty() {
                    return Err(self.bad_number(start));
                }
                text.push_str(&exponent);
            }
            if negative {
                text.insert(0, '-');
            }
            if is_float {
                Literal::Float(text.parse().map_err(|_| self.bad_number(start))?)
            } else {
                Literal::Int(text.parse().map_err(|_| self.bad_number(start))?)
            }
        };

        // `1j`, `12abc` and friends
        if self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            return Err(self.bad_number(start));
        }
        Ok(literal)
    }

    fn digits(&mut self, accept: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if accept(c) {
                out.push(c);
            } else if c != '_' || !self.peek_at(1).is_some_and(&accept) {
                break;
            }
            self.pos += 1;
        }
        out
    }

    fn bad_number(&mut self, start: usize) -> DomainError {
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '.' || c == '_')
        {
            self.pos += 1;
        }
        DomainError::InvalidNumber(self.chars[start..self.pos].iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Literal {
        Literal::Str(v.to_string())
    }

    #[test]
    fn parses_typical_domain() {
        let parsed = parse_literal("[('state', '=', 'draft'), ('amount', '>=', -1.5)]").unwrap();
        assert_eq!(
            parsed,
            Literal::List(vec![
                Literal::Tuple(vec![s("state"), s("="), s("draft")]),
                Literal::Tuple(vec![s("amount"), s(">="), Literal::Float(-1.5)]),
            ])
        );
    }

    #[test]
    fn parses_constants_and_containers() {
        assert_eq!(parse_literal("True").unwrap(), Literal::Bool(true));
        assert_eq!(parse_literal(" None ").unwrap(), Literal::None);
        assert_eq!(parse_literal("[]").unwrap(), Literal::List(vec![]));
        assert_eq!(parse_literal("()").unwrap(), Literal::Tuple(vec![]));
        assert_eq!(parse_literal("(1,)").unwrap(), Literal::Tuple(vec![Literal::Int(1)]));
        assert_eq!(parse_literal("(1)").unwrap(), Literal::Int(1));
        assert_eq!(
            parse_literal("{'a': 1, 'b': [2,],}").unwrap(),
            Literal::Dict(vec![
                (s("a"), Literal::Int(1)),
                (s("b"), Literal::List(vec![Literal::Int(2)])),
            ])
        );
        assert_eq!(
            parse_literal("{1, 2}").unwrap(),
            Literal::Set(vec![Literal::Int(1), Literal::Int(2)])
        );
    }

    #[test]
    fn parses_string_forms() {
        assert_eq!(parse_literal(r#""it's""#).unwrap(), s("it's"));
        assert_eq!(parse_literal(r"'a\'b\n'").unwrap(), s("a'b\n"));
        assert_eq!(parse_literal(r"u'caf\xe9'").unwrap(), s("café"));
        assert_eq!(parse_literal(r"r'\d+'").unwrap(), s(r"\d+"));
        assert_eq!(parse_literal("'ab' 'cd'").unwrap(), s("abcd"));
        assert_eq!(parse_literal("'''multi\nline'''").unwrap(), s("multi\nline"));
    }

    #[test]
    fn parses_numbers() {
        assert_eq!(parse_literal("42").unwrap(), Literal::Int(42));
        assert_eq!(parse_literal("-7").unwrap(), Literal::Int(-7));
        assert_eq!(parse_literal("1_000").unwrap(), Literal::Int(1000));
        assert_eq!(parse_literal("0x1F").unwrap(), Literal::Int(31));
        assert_eq!(parse_literal("1e3").unwrap(), Literal::Float(1000.0));
        assert_eq!(parse_literal(".5").unwrap(), Literal::Float(0.5));
        assert!(matches!(
            parse_literal("1j"),
            Err(DomainError::InvalidNumber(_))
        ));
        assert!(matches!(
            parse_literal("99999999999999999999"),
            Err(DomainError::InvalidNumber(_))
        ));
    }

    #[test]
    fn rejects_code() {
        assert_eq!(
            parse_literal("__import__('os').system('id')"),
            Err(DomainError::NonLiteral("__import__".to_string()))
        );
        assert_eq!(
            parse_literal("[('user_id', '=', uid)]"),
            Err(DomainError::NonLiteral("uid".to_string()))
        );
        assert!(matches!(
            parse_literal("1 + 2"),
            Err(DomainError::UnexpectedChar { found: '+', .. })
        ));
        assert!(parse_literal("lambda: 1").is_err());
        assert!(parse_literal("[x for x in y]").is_err());
        assert!(parse_literal("--1").is_err());
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(parse_literal(""), Err(DomainError::UnexpectedEnd));
        assert_eq!(parse_literal("[1, 2"), Err(DomainError::UnexpectedEnd));
        assert!(matches!(
            parse_literal("'open"),
            Err(DomainError::UnterminatedString(0))
        ));
        assert!(matches!(
            parse_literal("[1 2]"),
            Err(DomainError::UnexpectedChar { found: '2', .. })
        ));
    }

    #[test]
    fn rejects_excessive_nesting() {
        let deep = format!("{}{}", "[".repeat(MAX_DEPTH + 2), "]".repeat(MAX_DEPTH + 2));
        assert_eq!(parse_literal(&deep), Err(DomainError::TooDeep(MAX_DEPTH)));
    }

    #[test]
    fn converts_to_json() {
        let parsed = parse_literal("{'ids': (1, 2), 'flag': False, 3: None}").unwrap();
        assert_eq!(
            parsed.to_json(),
            serde_json::json!({ "ids": [1, 2], "flag": false, "3": null })
        );
    }
}
