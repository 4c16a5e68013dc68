//! Turns a token stream into a single [Expr] by precedence climbing: parse
//! a left operand, then repeatedly fold in binary operators whose
//! precedence meets a minimum threshold, descending recursively for the
//! right-hand side.

use crate::ast::{Dimension, Expr, ValueSource};
use crate::error::{ParseError, SourceExcerpt};
use crate::operator::{lookup_binary, lookup_prefix_unary, Assoc};
use crate::token::{Punct, Span, SpannedToken, Token};
use crate::tokenizer::expand_unicode_escapes;
use crate::util::Code;

pub struct Parser<'a> {
    tokens: &'a [SpannedToken],
    fragments: &'a [&'a str],
    pos: usize,
}

/// Parse a full token stream into one expression tree; fails if the list is
/// empty or has trailing tokens.
pub fn parse(tokens: &[SpannedToken], fragments: &[&str]) -> Result<Expr, ParseError> {
    if tokens.is_empty() {
        return Err(ParseError::EmptyExpression);
    }
    let mut parser = Parser {
        tokens,
        fragments,
        pos: 0,
    };
    let expr = parser.parse_expression(0)?;
    if parser.pos != parser.tokens.len() {
        let span = parser.tokens[parser.pos].span;
        return Err(ParseError::TrailingTokens(parser.excerpt_at(span)));
    }
    Ok(expr)
}

impl<'a> Parser<'a> {
    fn excerpt_at(&self, span: Span) -> SourceExcerpt {
        let expanded = expand_unicode_escapes(self.fragments[span.fragment]);
        let code = Code::from(expanded.as_str());
        SourceExcerpt::at(&code, span.offset)
    }

    fn excerpt_here(&self) -> SourceExcerpt {
        match self.tokens.get(self.pos) {
            Some(t) => self.excerpt_at(t.span),
            None => self.excerpt_at(self.tokens[self.tokens.len() - 1].span),
        }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn advance(&mut self) -> Option<&'a SpannedToken> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn check_punct(&self, p: Punct) -> bool {
        matches!(self.peek(), Some(Token::Punctuation(x)) if *x == p)
    }

    fn expect_punct(&mut self, p: Punct) -> Result<(), ParseError> {
        if self.check_punct(p) {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::UnmatchedBracket(self.excerpt_here()))
        }
    }

    /// Precedence climbing: parse a primary, then repeatedly fold in binary
    /// operators whose precedence is at least `min_prec`.
    fn parse_expression(&mut self, min_prec: u8) -> Result<Expr, ParseError> {
        let mut left = self.parse_primary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Operator(lit)) => lookup_binary(lit),
                _ => None,
            };
            let Some(op) = op else { break };
            if op.precedence < min_prec {
                break;
            }
            self.advance();
            let next_min = match op.assoc {
                Assoc::Right => op.precedence,
                Assoc::Left => op.precedence + 1,
            };
            let right = self.parse_expression(next_min)?;
            left = Expr::Binary {
                left: Box::new(left),
                op: op.tag,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    /// An atom followed by as many `.prop`, `(...)`, `[...]` suffixes as
    /// appear; these bind tighter than any binary operator.
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_atom()?;
        loop {
            if self.check_punct(Punct::Dot) {
                self.advance();
                let property = match self.peek() {
                    Some(Token::Identifier(name)) => name.clone(),
                    _ => return Err(ParseError::ExpectedIdentifierAfterDot(self.excerpt_here())),
                };
                self.advance();
                expr = Expr::AccessProperty {
                    object: Box::new(expr),
                    property,
                };
            } else if self.check_punct(Punct::LParen) {
                self.advance();
                let args = self.parse_args()?;
                expr = Expr::Invoke {
                    callee: Box::new(expr),
                    args,
                };
            } else if self.check_punct(Punct::LBracket) {
                expr = self.parse_bracket(expr)?;
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_atom(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Some(Token::Constant(c)) => {
                let c = c.clone();
                self.advance();
                Ok(Expr::Value(ValueSource::Constant(c)))
            }
            Some(Token::Embedded(v)) => {
                let v = v.clone();
                self.advance();
                Ok(Expr::Value(ValueSource::Embedded(v)))
            }
            Some(Token::Identifier(name)) => {
                let name = name.clone();
                self.advance();
                Ok(Expr::Identifier(name))
            }
            Some(Token::Operator(lit)) => {
                let desc = lookup_prefix_unary(lit)
                    .ok_or_else(|| ParseError::UnexpectedToken(self.excerpt_here(), lit.clone()))?;
                let tag = desc.tag;
                let prec = desc.precedence;
                self.advance();
                let operand = self.parse_expression(prec)?;
                Ok(Expr::Unary {
                    op: tag,
                    operand: Box::new(operand),
                })
            }
            Some(Token::Punctuation(Punct::LParen)) => {
                self.advance();
                let inner = self.parse_expression(0)?;
                self.expect_punct(Punct::RParen)?;
                Ok(inner)
            }
            Some(_) => {
                let literal = self.tokens[self.pos].token.literal();
                Err(ParseError::UnexpectedToken(self.excerpt_here(), literal))
            }
            None => Err(ParseError::DanglingOperator(self.excerpt_here())),
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if self.check_punct(Punct::RParen) {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_expression(0)?);
            if self.check_punct(Punct::Comma) {
                self.advance();
                if self.check_punct(Punct::RParen) {
                    self.advance();
                    break;
                }
                continue;
            }
            self.expect_punct(Punct::RParen)?;
            break;
        }
        Ok(args)
    }

    /// Whether the parser has reached a dimension boundary: `:`, `,`, `]`,
    /// or end of input, meaning no sub-expression is present here.
    fn at_dimension_boundary(&self) -> bool {
        matches!(
            self.peek(),
            None | Some(Token::Punctuation(Punct::Colon | Punct::Comma | Punct::RBracket))
        )
    }

    fn parse_dimension(&mut self) -> Result<(Dimension, bool), ParseError> {
        let mut dim = Dimension::default();
        let mut had_colon = false;
        if !self.at_dimension_boundary() {
            dim.start = Some(Box::new(self.parse_expression(0)?));
        }
        if self.check_punct(Punct::Colon) {
            had_colon = true;
            self.advance();
            if !self.at_dimension_boundary() {
                dim.end = Some(Box::new(self.parse_expression(0)?));
            }
            if self.check_punct(Punct::Colon) {
                self.advance();
                if !self.at_dimension_boundary() {
                    dim.step = Some(Box::new(self.parse_expression(0)?));
                }
            }
        }
        Ok((dim, had_colon))
    }

    /// Disambiguates `[i]` (Indexing) from `[start:end:step, ...]`
    /// (Slicing): the bracket is a Slicing whenever any dimension has a
    /// colon or there is more than one dimension.
    fn parse_bracket(&mut self, target: Expr) -> Result<Expr, ParseError> {
        self.advance(); // consume '['
        if self.check_punct(Punct::RBracket) {
            return Err(ParseError::EmptySubscript(self.excerpt_here()));
        }
        let mut dimensions = Vec::new();
        let mut any_colon = false;
        loop {
            let (dim, had_colon) = self.parse_dimension()?;
            any_colon |= had_colon;
            dimensions.push(dim);
            if self.check_punct(Punct::Comma) {
                self.advance();
                continue;
            }
            break;
        }
        self.expect_punct(Punct::RBracket)?;

        if !any_colon && dimensions.len() == 1 {
            let index = dimensions
                .into_iter()
                .next()
                .unwrap()
                .start
                .expect("a colon-free single dimension always parses a start expression");
            Ok(Expr::Indexing {
                target: Box::new(target),
                index,
            })
        } else {
            Ok(Expr::Slicing {
                target: Box::new(target),
                dimensions,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::OpTag;
    use crate::tokenizer::Tokenizer;

    fn parse_str(src: &str) -> Expr {
        let tokens = Tokenizer::new().tokenize_str(src).unwrap();
        parse(&tokens, &[src]).unwrap()
    }

    fn parse_err(src: &str) -> ParseError {
        let tokens = Tokenizer::new().tokenize_str(src).unwrap();
        parse(&tokens, &[src]).unwrap_err()
    }

    #[test]
    fn precedence_binds_multiplication_tighter_than_addition() {
        match parse_str("2 + 3 * 4") {
            Expr::Binary { op: OpTag::Add, right, .. } => {
                assert!(matches!(*right, Expr::Binary { op: OpTag::Mul, .. }));
            }
            other => panic!("unexpected tree: {:?}", other),
        }
    }

    #[test]
    fn power_is_right_associative() {
        // 2 ** 3 ** 2 should parse as 2 ** (3 ** 2)
        match parse_str("2 ** 3 ** 2") {
            Expr::Binary { op: OpTag::Pow, left, right } => {
                assert!(matches!(*left, Expr::Value(_)));
                assert!(matches!(*right, Expr::Binary { op: OpTag::Pow, .. }));
            }
            other => panic!("unexpected tree: {:?}", other),
        }
    }

    #[test]
    fn parenthesization_overrides_precedence() {
        match parse_str("(2 + 3) * 4") {
            Expr::Binary { op: OpTag::Mul, left, .. } => {
                assert!(matches!(*left, Expr::Binary { op: OpTag::Add, .. }));
            }
            other => panic!("unexpected tree: {:?}", other),
        }
    }

    #[test]
    fn property_access_and_invocation_chain() {
        match parse_str("Math.max(3, 4)") {
            Expr::Invoke { callee, args } => {
                assert!(matches!(*callee, Expr::AccessProperty { .. }));
                assert_eq!(args.len(), 2);
            }
            other => panic!("unexpected tree: {:?}", other),
        }
    }

    #[test]
    fn bracket_with_single_expression_is_indexing() {
        assert!(matches!(parse_str("arr[0]"), Expr::Indexing { .. }));
    }

    #[test]
    fn bracket_with_colon_is_slicing() {
        assert!(matches!(parse_str("arr[1:2]"), Expr::Slicing { .. }));
    }

    #[test]
    fn bracket_with_multiple_dimensions_is_slicing() {
        assert!(matches!(parse_str("arr[1, 2]"), Expr::Slicing { .. }));
    }

    #[test]
    fn empty_colon_slice_has_one_empty_dimension() {
        match parse_str("arr[:]") {
            Expr::Slicing { dimensions, .. } => {
                assert_eq!(dimensions.len(), 1);
                assert!(dimensions[0].start.is_none());
                assert!(dimensions[0].end.is_none());
                assert!(dimensions[0].step.is_none());
            }
            other => panic!("unexpected tree: {:?}", other),
        }
    }

    #[test]
    fn empty_input_fails() {
        let tokens = Tokenizer::new().tokenize_str("").unwrap();
        assert!(matches!(parse(&tokens, &[""]), Err(ParseError::EmptyExpression)));
    }

    #[test]
    fn dangling_operator_fails() {
        assert!(matches!(parse_err("3 +"), ParseError::DanglingOperator(_)));
    }

    #[test]
    fn empty_subscript_fails() {
        assert!(matches!(parse_err("arr[]"), ParseError::EmptySubscript(_)));
    }

    #[test]
    fn trailing_tokens_fail() {
        assert!(matches!(parse_err("1 2"), ParseError::TrailingTokens(_)));
    }

    #[test]
    fn dot_without_identifier_fails() {
        assert!(matches!(
            parse_err("a.1"),
            ParseError::ExpectedIdentifierAfterDot(_)
        ));
    }
}
