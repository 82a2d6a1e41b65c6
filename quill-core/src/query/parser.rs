//! Recursive-descent parsers for the three query shapes.
//!
//! ```text
//! and      ::= term*
//! or       ::= term ('|' term)*
//! cnf      ::= and_term (' ' and_term)*
//! and_term ::= term | '(' or_expr ')'
//! or_expr  ::= term ('|' term)*
//! term     ::= TERM | '"' ... '"'
//! ```
//!
//! Double-quoted phrases are accepted and collapse into a single TERM lexeme
//! (phrase semantics are not interpreted here). Parse errors carry the
//! scanner position.

use super::expr::{QueryExpr, QueryTerm};
use super::scanner::{Scanner, Token};
use crate::error::{Error, Result};

pub struct QueryParser;

impl QueryParser {
    /// Parse a whitespace-separated conjunction of terms.
    pub fn parse_and(input: &str) -> Result<QueryExpr> {
        let mut scanner = Scanner::new(input);
        let mut terms = Vec::new();
        loop {
            match scanner.get_next() {
                Token::End => return Ok(QueryExpr::And(terms)),
                tok => terms.push(parse_term(&mut scanner, tok, terms.len())?),
            }
        }
    }

    /// Parse a `t1 | t2 | ...` disjunction of terms.
    pub fn parse_or(input: &str) -> Result<QueryExpr> {
        let mut scanner = Scanner::new(input);
        let mut terms = Vec::new();
        let tok = scanner.get_next();
        if tok == Token::End {
            return Ok(QueryExpr::Or(terms));
        }
        terms.push(parse_term(&mut scanner, tok, 0)?);
        loop {
            match scanner.get_next() {
                Token::End => return Ok(QueryExpr::Or(terms)),
                Token::Or => {
                    let tok = scanner.get_next();
                    terms.push(parse_term(&mut scanner, tok, terms.len())?);
                }
                tok => return Err(unexpected(&scanner, tok, "'|'")),
            }
        }
    }

    /// Parse an AND of parenthesized OR-groups; a bare term is a one-element
    /// group.
    pub fn parse_cnf(input: &str) -> Result<QueryExpr> {
        let mut scanner = Scanner::new(input);
        let mut groups: Vec<Vec<QueryTerm>> = Vec::new();
        let mut next_pos = 0usize;
        loop {
            match scanner.get_next() {
                Token::End => return Ok(QueryExpr::Cnf(groups)),
                Token::LBracket => {
                    let group = parse_or_group(&mut scanner, &mut next_pos)?;
                    groups.push(group);
                }
                tok => {
                    let term = parse_term(&mut scanner, tok, next_pos)?;
                    next_pos += 1;
                    groups.push(vec![term]);
                }
            }
        }
    }
}

/// Terms of an OR-group, after the opening bracket, through the closing one.
fn parse_or_group(scanner: &mut Scanner<'_>, next_pos: &mut usize) -> Result<Vec<QueryTerm>> {
    let mut group = Vec::new();
    let tok = scanner.get_next();
    group.push(parse_term(scanner, tok, *next_pos)?);
    *next_pos += 1;
    loop {
        match scanner.get_next() {
            Token::RBracket => return Ok(group),
            Token::Or => {
                let tok = scanner.get_next();
                group.push(parse_term(scanner, tok, *next_pos)?);
                *next_pos += 1;
            }
            tok => return Err(unexpected(scanner, tok, "'|' or ')'")),
        }
    }
}

/// A single term given its already-scanned leading token: either a TERM or a
/// double-quoted phrase collapsed into one lexeme.
fn parse_term(scanner: &mut Scanner<'_>, tok: Token, query_pos: usize) -> Result<QueryTerm> {
    match tok {
        Token::Term => Ok(QueryTerm::new(scanner.lexeme(), query_pos as u16)),
        Token::DoubleQuote => parse_phrase(scanner, query_pos as u16),
        tok => Err(unexpected(scanner, tok, "a term")),
    }
}

/// The remainder of a quoted phrase, up to the closing quote. Inner spaces
/// are preserved so the whole phrase becomes one lexeme.
fn parse_phrase(scanner: &mut Scanner<'_>, query_pos: u16) -> Result<QueryTerm> {
    scanner.ignore_spaces = false;
    let mut lexeme = String::new();
    let result = loop {
        match scanner.get_next() {
            Token::Term => lexeme.push_str(scanner.lexeme()),
            Token::Space => lexeme.push(' '),
            Token::DoubleQuote => break Ok(QueryTerm::new(lexeme, query_pos)),
            Token::End => {
                break Err(Error::parse(scanner.position(), "unterminated phrase"))
            }
            tok => break Err(unexpected(scanner, tok, "a term or closing '\"'")),
        }
    };
    scanner.ignore_spaces = true;
    result
}

fn unexpected(scanner: &Scanner<'_>, tok: Token, wanted: &str) -> Error {
    Error::parse(
        scanner.position(),
        format!("expected {wanted}, found {}", tok.name()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexemes(terms: &[QueryTerm]) -> Vec<&str> {
        terms.iter().map(|t| t.lexeme.as_str()).collect()
    }

    #[test]
    fn and_terms() {
        let expr = QueryParser::parse_and("alpha beta  gamma").unwrap();
        match expr {
            QueryExpr::And(terms) => {
                assert_eq!(lexemes(&terms), ["alpha", "beta", "gamma"]);
                assert_eq!(terms[2].query_pos, 2);
            }
            other => panic!("wrong shape: {other:?}"),
        }
    }

    #[test]
    fn or_terms() {
        let expr = QueryParser::parse_or("a | b|c").unwrap();
        match expr {
            QueryExpr::Or(terms) => assert_eq!(lexemes(&terms), ["a", "b", "c"]),
            other => panic!("wrong shape: {other:?}"),
        }
    }

    #[test]
    fn cnf_groups() {
        let expr = QueryParser::parse_cnf("(a | b) c (d | e | f)").unwrap();
        match expr {
            QueryExpr::Cnf(groups) => {
                assert_eq!(groups.len(), 3);
                assert_eq!(lexemes(&groups[0]), ["a", "b"]);
                assert_eq!(lexemes(&groups[1]), ["c"]);
                assert_eq!(lexemes(&groups[2]), ["d", "e", "f"]);
                // positions run through the whole query
                assert_eq!(groups[2][2].query_pos, 5);
            }
            other => panic!("wrong shape: {other:?}"),
        }
    }

    #[test]
    fn empty_queries_parse() {
        assert_eq!(QueryParser::parse_and("").unwrap(), QueryExpr::And(vec![]));
        assert_eq!(QueryParser::parse_or("  ").unwrap(), QueryExpr::Or(vec![]));
        assert_eq!(QueryParser::parse_cnf("").unwrap(), QueryExpr::Cnf(vec![]));
    }

    #[test]
    fn phrase_is_one_lexeme() {
        let expr = QueryParser::parse_and("\"hello world\" x").unwrap();
        match expr {
            QueryExpr::And(terms) => {
                assert_eq!(lexemes(&terms), ["hello world", "x"]);
            }
            other => panic!("wrong shape: {other:?}"),
        }
    }

    #[test]
    fn errors_carry_position() {
        let err = QueryParser::parse_and("a | b").unwrap_err();
        match err {
            Error::Parse { pos, .. } => assert_eq!(pos, 3),
            other => panic!("wrong error: {other:?}"),
        }
    }

    #[test]
    fn unterminated_group_fails() {
        assert!(QueryParser::parse_cnf("(a | b").is_err());
        assert!(QueryParser::parse_cnf("(a b)").is_err());
        assert!(QueryParser::parse_cnf("()").is_err());
    }

    #[test]
    fn unterminated_phrase_fails() {
        assert!(QueryParser::parse_and("\"a b").is_err());
    }

    #[test]
    fn or_rejects_brackets() {
        assert!(QueryParser::parse_or("(a | b)").is_err());
    }
}
