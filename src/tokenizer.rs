//! Scans template fragments and embedded values into a token stream: advance
//! a pointer, try each candidate longest-match-first, and fail with a
//! positioned error when nothing matches.

use once_cell::sync::Lazy;
use regex::bytes::Regex;

use crate::error::{SourceExcerpt, TokenizingError};
use crate::operator::OPERATOR_LITERALS;
use crate::token::{Constant, Punct, Span, SpannedToken, Token};
use crate::util::{Code, Log};
use crate::value::Value;

static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]*\.?[0-9]+([eE][+-]?[0-9]+)?n?").unwrap());

/// Scans tagged-template fragments (and the plain-string equivalent, via an
/// empty `values` list) into a [Token] stream.
pub struct Tokenizer {
    pub keep_whitespace: bool,
    pub log: Log<&'static str>,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self {
            keep_whitespace: false,
            log: Log::None,
        }
    }
}

impl Tokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log(mut self, log: Log<&'static str>) -> Self {
        self.log = log;
        self
    }

    pub fn keeping_whitespace(mut self) -> Self {
        self.keep_whitespace = true;
        self
    }

    /// Tokenize the logical stream `f0, v0, f1, v1, ..., fn`.
    pub fn tokenize_template(
        &self,
        fragments: &[&str],
        values: Vec<Value>,
    ) -> Result<Vec<SpannedToken>, TokenizingError> {
        let mut tokens = Vec::new();
        for (i, fragment) in fragments.iter().enumerate() {
            self.scan_fragment(i, fragment, &mut tokens)?;
            if let Some(value) = values.get(i).cloned() {
                tokens.push(SpannedToken {
                    token: Token::Embedded(value),
                    span: Span {
                        fragment: i,
                        offset: fragment.len(),
                    },
                });
            }
        }
        if !self.keep_whitespace {
            tokens.retain(|t| !t.token.is_whitespace());
        }
        Ok(tokens)
    }

    /// Tokenize a plain string with no embedded slots.
    pub fn tokenize_str(&self, source: &str) -> Result<Vec<SpannedToken>, TokenizingError> {
        self.tokenize_template(&[source], Vec::new())
    }

    fn scan_fragment(
        &self,
        fragment_index: usize,
        fragment: &str,
        tokens: &mut Vec<SpannedToken>,
    ) -> Result<(), TokenizingError> {
        let expanded = expand_unicode_escapes(fragment);
        let code = Code::from(expanded.as_str());
        let bytes = code.value;
        let mut pointer = 0usize;
        let push = |tokens: &mut Vec<SpannedToken>, token: Token, at: usize| {
            tokens.push(SpannedToken {
                token,
                span: Span {
                    fragment: fragment_index,
                    offset: at,
                },
            });
        };

        while pointer < bytes.len() {
            let rest = &bytes[pointer..];

            if let Some(len) = scan_whitespace(rest) {
                let literal = std::str::from_utf8(&rest[..len]).unwrap().to_string();
                self.log.trace_success(pointer, &literal, &code);
                push(tokens, Token::Whitespace(literal), pointer);
                pointer += len;
                continue;
            }

            if rest[0].is_ascii() {
                if let Some(p) = Punct::from_char(rest[0] as char) {
                    self.log.trace_success(pointer, &p, &code);
                    push(tokens, Token::Punctuation(p), pointer);
                    pointer += 1;
                    continue;
                }
            }

            if let Some(lit) = OPERATOR_LITERALS
                .iter()
                .find(|lit| rest.starts_with(lit.as_bytes()))
            {
                self.log.trace_success(pointer, lit, &code);
                push(tokens, Token::Operator((*lit).to_string()), pointer);
                pointer += lit.len();
                continue;
            }

            if let Some(m) = NUMBER_RE.find(rest) {
                debug_assert_eq!(m.start(), 0);
                let text = std::str::from_utf8(&rest[..m.end()]).unwrap();
                push(tokens, Token::Constant(decode_number(text)), pointer);
                pointer += m.end();
                continue;
            }

            if let Some(len) = scan_string(rest) {
                let text = std::str::from_utf8(&rest[..len]).unwrap();
                push(
                    tokens,
                    Token::Constant(Constant::Str(decode_string(text))),
                    pointer,
                );
                pointer += len;
                continue;
            }

            if let Some(len) = scan_identifier(&expanded[pointer..]) {
                let name = expanded[pointer..pointer + len].to_string();
                push(tokens, Token::Identifier(name), pointer);
                pointer += len;
                continue;
            }

            self.log.trace_failure(pointer, &code);
            let found = rest
                .get(..rest.len().min(4))
                .and_then(|b| std::str::from_utf8(b).ok())
                .and_then(|s| s.chars().next())
                .map(|c| format!("'{}' (U+{:04X})", c, c as u32))
                .unwrap_or_else(|| "<invalid utf-8>".to_string());
            return Err(TokenizingError {
                excerpt: SourceExcerpt::at(&code, pointer),
                found,
            });
        }
        Ok(())
    }
}

fn scan_whitespace(rest: &[u8]) -> Option<usize> {
    let len = rest
        .iter()
        .take_while(|b| matches!(b, b' ' | b'\t' | b'\n'))
        .count();
    if len > 0 {
        Some(len)
    } else {
        None
    }
}

/// Single- or double-quoted string constant: `\\` and the matching-quote
/// escape are allowed inside.
fn scan_string(rest: &[u8]) -> Option<usize> {
    let quote = *rest.first()?;
    if quote != b'\'' && quote != b'"' {
        return None;
    }
    let mut i = 1;
    while i < rest.len() {
        match rest[i] {
            b'\\' if i + 1 < rest.len() => i += 2,
            c if c == quote => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

fn decode_string(literal: &str) -> String {
    let quote = literal.as_bytes()[0] as char;
    let inner = &literal[1..literal.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(escaped) if escaped == '\\' || escaped == quote => out.push(escaped),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn decode_number(literal: &str) -> Constant {
    if let Some(digits) = literal.strip_suffix('n') {
        return Constant::BigInt(digits.parse().expect("number regex guarantees digits"));
    }
    if literal.contains('.') || literal.contains('e') || literal.contains('E') {
        Constant::Float(literal.parse().expect("number regex guarantees a valid float"))
    } else {
        literal
            .parse::<i64>()
            .map(Constant::Int)
            .unwrap_or_else(|_| Constant::Float(literal.parse().unwrap()))
    }
}

/// `[$_<ID_Start>][$_<ID_Continue>]*`, approximating the Unicode ID_Start /
/// ID_Continue classes with `char::is_alphabetic` / `is_alphanumeric` (the
/// `regex` crate's default Unicode tables do not expose those exact
/// classes, so identifiers are scanned by hand rather than via `NUMBER_RE`'s
/// byte-regex approach).
fn scan_identifier(rest: &str) -> Option<usize> {
    let mut chars = rest.char_indices();
    let (_, first) = chars.next()?;
    if !(first == '$' || first == '_' || first.is_alphabetic()) {
        return None;
    }
    let mut end = first.len_utf8();
    for (idx, c) in chars {
        if c == '$' || c == '_' || c.is_alphanumeric() {
            end = idx + c.len_utf8();
        } else {
            break;
        }
    }
    Some(end)
}

/// Pre-expands `\uXXXX` and `\u{XXXX...}` escapes to their code points
/// before scanning.
pub(crate) fn expand_unicode_escapes(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut chars = src.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' || chars.peek() != Some(&'u') {
            out.push(c);
            continue;
        }
        let mut lookahead = chars.clone();
        lookahead.next(); // consume 'u'
        if lookahead.peek() == Some(&'{') {
            lookahead.next();
            let mut hex = String::new();
            while let Some(&d) = lookahead.peek() {
                if d == '}' {
                    break;
                }
                hex.push(d);
                lookahead.next();
            }
            if lookahead.peek() == Some(&'}') {
                lookahead.next();
                if let Some(code_point) = u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                {
                    out.push(code_point);
                    chars = lookahead;
                    continue;
                }
            }
        } else {
            let hex: String = lookahead.by_ref().take(4).collect();
            if hex.len() == 4 {
                if let Some(code_point) = u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                {
                    out.push(code_point);
                    chars = lookahead;
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(tokens: &[SpannedToken]) -> Vec<String> {
        tokens.iter().map(|t| t.token.literal()).collect()
    }

    #[test]
    fn tokenizes_arithmetic_expression() {
        let tokens = Tokenizer::new().tokenize_str("2 + 3 * 4").unwrap();
        assert_eq!(lit(&tokens), vec!["2", "+", "3", "*", "4"]);
    }

    #[test]
    fn right_assoc_power_is_a_single_operator_token() {
        let tokens = Tokenizer::new().tokenize_str("2 ** 3 ** 2").unwrap();
        assert_eq!(lit(&tokens), vec!["2", "**", "3", "**", "2"]);
    }

    #[test]
    fn longest_match_prefers_strict_equality() {
        let tokens = Tokenizer::new().tokenize_str("a === b").unwrap();
        assert_eq!(lit(&tokens), vec!["a", "===", "b"]);
    }

    #[test]
    fn embedded_values_are_inserted_between_fragments() {
        let tokens = Tokenizer::new()
            .tokenize_template(&["", " + ", ""], vec![Value::Int(1), Value::Int(2)])
            .unwrap();
        assert!(matches!(tokens[0].token, Token::Embedded(Value::Int(1))));
        assert!(matches!(tokens[2].token, Token::Embedded(Value::Int(2))));
    }

    #[test]
    fn unicode_identifier_is_a_single_token() {
        let tokens = Tokenizer::new().tokenize_str("你好 + Привет").unwrap();
        assert_eq!(lit(&tokens), vec!["你好", "+", "Привет"]);
    }

    #[test]
    fn exponent_case_is_insensitive_in_decoding() {
        let a = Tokenizer::new().tokenize_str("1e-4").unwrap();
        let b = Tokenizer::new().tokenize_str("1E-4").unwrap();
        match (&a[0].token, &b[0].token) {
            (Token::Constant(Constant::Float(x)), Token::Constant(Constant::Float(y))) => {
                assert_eq!(x, y);
            }
            _ => panic!("expected float constants"),
        }
    }

    #[test]
    fn big_integer_suffix_decodes_to_bigint() {
        let tokens = Tokenizer::new().tokenize_str("123n").unwrap();
        assert!(matches!(tokens[0].token, Token::Constant(Constant::BigInt(_))));
    }

    #[test]
    fn unknown_code_point_fails_with_excerpt() {
        let err = Tokenizer::new().tokenize_str("1 @ 2").unwrap_err();
        assert!(err.to_string().contains("unexpected character"));
    }

    #[test]
    fn whitespace_is_filtered_by_default() {
        let tokens = Tokenizer::new().tokenize_str("  1   +    2  ").unwrap();
        assert_eq!(lit(&tokens), vec!["1", "+", "2"]);
    }

    #[test]
    fn whitespace_can_be_retained() {
        let tokens = Tokenizer::new()
            .keeping_whitespace()
            .tokenize_str("1 + 2")
            .unwrap();
        assert!(tokens.iter().any(|t| t.token.is_whitespace()));
    }
}
