// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Recursive-descent parser: pattern text -> `Ast` + `CaptureTable`.
//!
//! Precedence, lowest first: alternation, concatenation, quantifier,
//! primary. Single token (single byte) of lookahead throughout.
//!
//! The three compile-time flags (case folding, multiline, dot-all) never
//! change the grammar recognized here -- they only change what a node
//! *means* once the compiler emits instructions for it. Parsing is
//! therefore flag-independent.

use ast::{
    Ast, AnchorKind, BackrefTarget, ClassAst, CaptureTable, Greediness, GroupKind,
};
use error::{Error, ParseError, ParseErrorKind, StructureError, StructureErrorKind};

const METACHARS: &[u8] = b".^$*+?()[]{}|\\";

fn is_metachar(c: u8) -> bool {
    METACHARS.contains(&c)
}

/// Parses `pattern` into an AST and its named-capture table.
pub fn parse(pattern: &str) -> Result<(Ast, CaptureTable), Error> {
    if pattern.is_empty() {
        return Err(ParseError::new(ParseErrorKind::EmptyPattern, 0).into());
    }
    let mut p = Parser {
        pattern: pattern.as_bytes(),
        pos: 0,
        captures: CaptureTable::new(),
    };
    let ast = p.parse_alternate()?;
    if !p.eof() {
        // Only reachable if an unmatched ')' stopped concatenation early.
        return Err(ParseError::new(ParseErrorKind::UnexpectedChar(')'), p.pos).into());
    }
    validate_backreferences(&ast, &p.captures)?;
    Ok((ast, p.captures))
}

struct Parser<'a> {
    pattern: &'a [u8],
    pos: usize,
    captures: CaptureTable,
}

enum ClassPiece {
    Byte(u8),
    Ranges(Vec<(u8, u8)>),
}

impl<'a> Parser<'a> {
    fn eof(&self) -> bool {
        self.pos >= self.pattern.len()
    }

    fn peek(&self) -> Option<u8> {
        self.pattern.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.pattern.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn err<T>(&self, kind: ParseErrorKind, offset: usize) -> Result<T, Error> {
        Err(ParseError::new(kind, offset).into())
    }

    // alternation := concat ('|' concat)*
    fn parse_alternate(&mut self) -> Result<Ast, Error> {
        let mut branches = vec![self.parse_concat()?];
        while self.peek() == Some(b'|') {
            self.bump();
            branches.push(self.parse_concat()?);
        }
        if branches.len() == 1 {
            Ok(branches.pop().unwrap())
        } else {
            Ok(Ast::Alternate(branches))
        }
    }

    // concat := quantified*
    fn parse_concat(&mut self) -> Result<Ast, Error> {
        let mut parts = vec![];
        while let Some(c) = self.peek() {
            if c == b'|' || c == b')' {
                break;
            }
            parts.push(self.parse_quantified()?);
        }
        if parts.is_empty() {
            Ok(Ast::Empty)
        } else if parts.len() == 1 {
            Ok(parts.pop().unwrap())
        } else {
            Ok(Ast::Concat(parts))
        }
    }

    // quantified := primary ( ('*'|'+'|'?'|'{m,n}') ('?'|'+')? )*
    //
    // The loop (rather than a single optional suffix) is what lets us catch
    // `a**` and `(a+)+` uniformly: each iteration checks whether the atom
    // built so far is itself a quantifier before wrapping it in another one.
    fn parse_quantified(&mut self) -> Result<Ast, Error> {
        let mut atom = self.parse_primary()?;
        loop {
            let quant_offset = self.pos;
            let bounds = match self.peek() {
                Some(b'*') => { self.bump(); Some((0, None)) }
                Some(b'+') => { self.bump(); Some((1, None)) }
                Some(b'?') => { self.bump(); Some((0, Some(1))) }
                Some(b'{') => self.try_parse_brace_bounds()?,
                _ => None,
            };
            let (min, max) = match bounds {
                Some(b) => b,
                None => break,
            };
            if is_quantifier_like(&atom) {
                return Err(StructureError::new(
                    StructureErrorKind::NestedQuantifier,
                    quant_offset,
                ).into());
            }
            let greediness = match self.peek() {
                Some(b'?') => { self.bump(); Greediness::Lazy }
                Some(b'+') => { self.bump(); Greediness::Possessive }
                _ => Greediness::Greedy,
            };
            atom = Ast::quantifier(atom, min, max, greediness);
        }
        Ok(atom)
    }

    /// Attempts to parse `{m}`, `{m,}` or `{m,n}` starting at the current
    /// `{`. Returns `None` (and rewinds) if what follows isn't valid bound
    /// syntax, in which case `{` is just a literal character.
    fn try_parse_brace_bounds(&mut self) -> Result<Option<(u32, Option<u32>)>, Error> {
        let save = self.pos;
        self.bump(); // '{'
        let min_digits = self.take_digits();
        if min_digits.is_empty() && self.peek() != Some(b',') {
            self.pos = save;
            return Ok(None);
        }
        let min = parse_digits(&min_digits);
        let mut max = Some(min);
        if self.peek() == Some(b',') {
            self.bump();
            let max_digits = self.take_digits();
            max = if max_digits.is_empty() { None } else { Some(parse_digits(&max_digits)) };
        }
        if self.peek() != Some(b'}') {
            self.pos = save;
            return Ok(None);
        }
        self.bump(); // '}'
        if let Some(m) = max {
            if m < min {
                return self.err(ParseErrorKind::InvalidQuantifier, save);
            }
        }
        Ok(Some((min, max)))
    }

    fn take_digits(&mut self) -> Vec<u8> {
        let mut digits = vec![];
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.bump();
            } else {
                break;
            }
        }
        digits
    }

    fn parse_primary(&mut self) -> Result<Ast, Error> {
        let offset = self.pos;
        match self.peek() {
            None => self.err(ParseErrorKind::PrematureEnd, offset),
            Some(b'*') | Some(b'+') | Some(b'?') => {
                self.err(ParseErrorKind::QuantifierWithoutOperand, offset)
            }
            Some(b'.') => { self.bump(); Ok(Ast::AnyChar) }
            Some(b'^') => { self.bump(); Ok(Ast::Anchor(AnchorKind::StartLineOrText)) }
            Some(b'$') => { self.bump(); Ok(Ast::Anchor(AnchorKind::EndLineOrText)) }
            Some(b'(') => { self.bump(); self.parse_group(offset) }
            Some(b'[') => { self.bump(); self.parse_class(offset) }
            Some(b'\\') => { self.bump(); self.parse_escape(offset) }
            Some(b')') => self.err(ParseErrorKind::UnexpectedChar(')'), offset),
            Some(c) => { self.bump(); Ok(Ast::Literal(c)) }
        }
    }

    fn parse_group(&mut self, open_offset: usize) -> Result<Ast, Error> {
        let kind = if self.peek() == Some(b'?') {
            self.bump();
            match self.peek() {
                Some(b':') => { self.bump(); GroupKind::NonCapturing }
                Some(b'=') => { self.bump(); GroupKind::LookaheadPositive }
                Some(b'!') => { self.bump(); GroupKind::LookaheadNegative }
                Some(b'>') => { self.bump(); GroupKind::Atomic }
                Some(b'P') => {
                    self.bump();
                    self.expect(b'<', open_offset)?;
                    let name = self.read_name_until(b'>', open_offset)?;
                    let idx = self.captures.push(Some(name.clone()));
                    GroupKind::Named(idx, name)
                }
                Some(b'<') => {
                    self.bump();
                    match self.peek() {
                        Some(b'=') => { self.bump(); GroupKind::LookbehindPositive }
                        Some(b'!') => { self.bump(); GroupKind::LookbehindNegative }
                        _ => {
                            let name = self.read_name_until(b'>', open_offset)?;
                            let idx = self.captures.push(Some(name.clone()));
                            GroupKind::Named(idx, name)
                        }
                    }
                }
                Some(c) => return self.err(ParseErrorKind::UnexpectedChar(c as char), self.pos),
                None => return self.err(ParseErrorKind::PrematureEnd, self.pos),
            }
        } else {
            let idx = self.captures.push(None);
            GroupKind::Capturing(idx)
        };
        let child = self.parse_alternate()?;
        if self.peek() != Some(b')') {
            return self.err(ParseErrorKind::UnmatchedParen, open_offset);
        }
        self.bump();
        Ok(Ast::group(child, kind))
    }

    fn expect(&mut self, c: u8, open_offset: usize) -> Result<(), Error> {
        if self.peek() == Some(c) {
            self.bump();
            Ok(())
        } else {
            self.err(ParseErrorKind::UnmatchedParen, open_offset)
        }
    }

    fn read_name_until(&mut self, terminator: u8, open_offset: usize) -> Result<String, Error> {
        let mut name = String::new();
        loop {
            match self.peek() {
                Some(c) if c == terminator => { self.bump(); break; }
                Some(c) if c.is_ascii_alphanumeric() || c == b'_' => {
                    name.push(c as char);
                    self.bump();
                }
                _ => return self.err(ParseErrorKind::UnmatchedParen, open_offset),
            }
        }
        Ok(name)
    }

    fn parse_escape(&mut self, offset: usize) -> Result<Ast, Error> {
        match self.bump() {
            None => self.err(ParseErrorKind::PrematureEnd, offset),
            Some(b'd') => Ok(Ast::Class(ClassAst::new(digit_ranges(false), false))),
            Some(b'D') => Ok(Ast::Class(ClassAst::new(digit_ranges(true), false))),
            Some(b'w') => Ok(Ast::Class(ClassAst::new(word_ranges(false), false))),
            Some(b'W') => Ok(Ast::Class(ClassAst::new(word_ranges(true), false))),
            Some(b's') => Ok(Ast::Class(ClassAst::new(space_ranges(false), false))),
            Some(b'S') => Ok(Ast::Class(ClassAst::new(space_ranges(true), false))),
            Some(b'n') => Ok(Ast::Literal(b'\n')),
            Some(b't') => Ok(Ast::Literal(b'\t')),
            Some(b'r') => Ok(Ast::Literal(b'\r')),
            Some(b'f') => Ok(Ast::Literal(0x0C)),
            Some(b'v') => Ok(Ast::Literal(0x0B)),
            Some(b'A') => Ok(Ast::Anchor(AnchorKind::StartText)),
            Some(b'z') => Ok(Ast::Anchor(AnchorKind::EndText)),
            // `\Z` is treated identically to `\z`.
            Some(b'Z') => Ok(Ast::Anchor(AnchorKind::EndText)),
            Some(b'b') => Ok(Ast::Anchor(AnchorKind::WordBoundary)),
            Some(b'B') => Ok(Ast::Anchor(AnchorKind::NotWordBoundary)),
            Some(c @ b'1'..=b'9') => {
                Ok(Ast::Backreference(BackrefTarget::Index((c - b'0') as usize)))
            }
            Some(b'k') => {
                self.expect(b'<', offset)?;
                let name = self.read_name_until(b'>', offset)?;
                Ok(Ast::Backreference(BackrefTarget::Name(name)))
            }
            Some(c) if is_metachar(c) => Ok(Ast::Literal(c)),
            Some(c) => self.err(ParseErrorKind::InvalidEscape(c as char), offset),
        }
    }

    fn parse_class(&mut self, open_offset: usize) -> Result<Ast, Error> {
        let negated = if self.peek() == Some(b'^') {
            self.bump();
            true
        } else {
            false
        };
        let mut ranges = vec![];
        let mut first = true;
        loop {
            match self.peek() {
                None => return self.err(ParseErrorKind::UnmatchedBracket, open_offset),
                Some(b']') if !first => { self.bump(); break; }
                Some(b'[') if self.peek_at(1) == Some(b':') => {
                    ranges.extend(self.parse_posix_class(open_offset)?);
                }
                _ => {
                    let piece = self.parse_class_piece(open_offset)?;
                    match piece {
                        ClassPiece::Ranges(rs) => ranges.extend(rs),
                        ClassPiece::Byte(start) => {
                            if self.peek() == Some(b'-')
                                && self.peek_at(1).is_some()
                                && self.peek_at(1) != Some(b']')
                            {
                                self.bump(); // '-'
                                let end = match self.parse_class_piece(open_offset)? {
                                    ClassPiece::Byte(b) => b,
                                    ClassPiece::Ranges(_) => {
                                        return self.err(
                                            ParseErrorKind::InvalidClass(
                                                "shorthand class cannot be a range endpoint"
                                                    .into(),
                                            ),
                                            open_offset,
                                        );
                                    }
                                };
                                if start > end {
                                    return self.err(
                                        ParseErrorKind::InvertedClassRange(
                                            start as char,
                                            end as char,
                                        ),
                                        open_offset,
                                    );
                                }
                                ranges.push((start, end));
                            } else {
                                ranges.push((start, start));
                            }
                        }
                    }
                }
            }
            first = false;
        }
        Ok(Ast::Class(ClassAst::new(ranges, negated)))
    }

    fn parse_class_piece(&mut self, open_offset: usize) -> Result<ClassPiece, Error> {
        match self.peek() {
            Some(b'\\') => { self.bump(); self.parse_class_escape(open_offset) }
            Some(c) => { self.bump(); Ok(ClassPiece::Byte(c)) }
            None => self.err(ParseErrorKind::UnmatchedBracket, open_offset),
        }
    }

    fn parse_class_escape(&mut self, open_offset: usize) -> Result<ClassPiece, Error> {
        match self.bump() {
            None => self.err(ParseErrorKind::PrematureEnd, open_offset),
            Some(b'd') => Ok(ClassPiece::Ranges(digit_ranges(false))),
            Some(b'D') => Ok(ClassPiece::Ranges(digit_ranges(true))),
            Some(b'w') => Ok(ClassPiece::Ranges(word_ranges(false))),
            Some(b'W') => Ok(ClassPiece::Ranges(word_ranges(true))),
            Some(b's') => Ok(ClassPiece::Ranges(space_ranges(false))),
            Some(b'S') => Ok(ClassPiece::Ranges(space_ranges(true))),
            Some(b'n') => Ok(ClassPiece::Byte(b'\n')),
            Some(b't') => Ok(ClassPiece::Byte(b'\t')),
            Some(b'r') => Ok(ClassPiece::Byte(b'\r')),
            Some(b'f') => Ok(ClassPiece::Byte(0x0C)),
            Some(b'v') => Ok(ClassPiece::Byte(0x0B)),
            Some(c) if is_metachar(c) || c == b']' || c == b'-' || c == b'^' => {
                Ok(ClassPiece::Byte(c))
            }
            Some(c) => self.err(ParseErrorKind::InvalidEscape(c as char), open_offset),
        }
    }

    fn parse_posix_class(&mut self, open_offset: usize) -> Result<Vec<(u8, u8)>, Error> {
        self.bump(); // '['
        self.bump(); // ':'
        let mut name = String::new();
        loop {
            match self.peek() {
                Some(b':') if self.peek_at(1) == Some(b']') => { self.bump(); self.bump(); break; }
                Some(c) if c.is_ascii_alphabetic() => { name.push(c as char); self.bump(); }
                _ => {
                    return self.err(ParseErrorKind::InvalidClass(name), open_offset);
                }
            }
        }
        posix_ranges(&name)
            .ok_or_else(|| ParseError::new(ParseErrorKind::InvalidClass(name.clone()), open_offset).into())
    }
}

fn parse_digits(digits: &[u8]) -> u32 {
    let mut n: u32 = 0;
    for &d in digits {
        n = n.saturating_mul(10).saturating_add((d - b'0') as u32);
    }
    n
}

fn unwrap_transparent(ast: &Ast) -> &Ast {
    match ast {
        Ast::Concat(v) if v.len() == 1 => unwrap_transparent(&v[0]),
        Ast::Group(g)
            if matches!(
                g.kind,
                GroupKind::Capturing(_) | GroupKind::NonCapturing | GroupKind::Named(_, _)
            ) =>
        {
            unwrap_transparent(&g.child)
        }
        other => other,
    }
}

fn is_quantifier_like(ast: &Ast) -> bool {
    matches!(unwrap_transparent(ast), Ast::Quantifier(_))
}

fn complement(ranges: &[(u8, u8)]) -> Vec<(u8, u8)> {
    let mut sorted = ranges.to_vec();
    sorted.sort();
    let mut result = vec![];
    let mut next: u16 = 0;
    for &(s, e) in &sorted {
        let (s, e) = (s as u16, e as u16);
        if s > next {
            result.push((next as u8, (s - 1) as u8));
        }
        if e + 1 > next {
            next = e + 1;
        }
    }
    if next <= 255 {
        result.push((next as u8, 255));
    }
    result
}

fn digit_ranges(negated: bool) -> Vec<(u8, u8)> {
    let d = vec![(b'0', b'9')];
    if negated { complement(&d) } else { d }
}

fn word_ranges(negated: bool) -> Vec<(u8, u8)> {
    let w = vec![(b'A', b'Z'), (b'a', b'z'), (b'0', b'9'), (b'_', b'_')];
    if negated { complement(&w) } else { w }
}

fn space_ranges(negated: bool) -> Vec<(u8, u8)> {
    let s = vec![
        (b' ', b' '),
        (b'\t', b'\t'),
        (b'\n', b'\n'),
        (b'\r', b'\r'),
        (0x0C, 0x0C),
        (0x0B, 0x0B),
    ];
    if negated { complement(&s) } else { s }
}

fn posix_ranges(name: &str) -> Option<Vec<(u8, u8)>> {
    Some(match name {
        "alpha" => vec![(b'A', b'Z'), (b'a', b'z')],
        "digit" => vec![(b'0', b'9')],
        "alnum" => vec![(b'A', b'Z'), (b'a', b'z'), (b'0', b'9')],
        "space" => vec![(b' ', b' '), (0x09, 0x0D)],
        "upper" => vec![(b'A', b'Z')],
        "lower" => vec![(b'a', b'z')],
        "punct" => vec![(b'!', b'/'), (b':', b'@'), (b'[', b'`'), (b'{', b'~')],
        "xdigit" => vec![(b'0', b'9'), (b'A', b'F'), (b'a', b'f')],
        "cntrl" => vec![(0, 31), (127, 127)],
        "print" => vec![(32, 126)],
        "graph" => vec![(33, 126)],
        "blank" => vec![(b' ', b' '), (b'\t', b'\t')],
        "ascii" => vec![(0, 127)],
        _ => return None,
    })
}

/// Post-parse structural check: every backreference must name a group that
/// was actually declared somewhere in the pattern.
fn validate_backreferences(ast: &Ast, captures: &CaptureTable) -> Result<(), Error> {
    match ast {
        Ast::Backreference(BackrefTarget::Index(i)) => {
            if *i == 0 || *i > captures.count() {
                return Err(StructureError::new(
                    StructureErrorKind::UndeclaredGroup(*i),
                    0,
                ).into());
            }
            Ok(())
        }
        Ast::Backreference(BackrefTarget::Name(name)) => {
            if captures.index_of(name).is_none() {
                return Err(StructureError::new(
                    StructureErrorKind::UndeclaredGroupName(name.clone()),
                    0,
                ).into());
            }
            Ok(())
        }
        Ast::Concat(parts) | Ast::Alternate(parts) => {
            for p in parts {
                validate_backreferences(p, captures)?;
            }
            Ok(())
        }
        Ast::Quantifier(q) => validate_backreferences(&q.child, captures),
        Ast::Group(g) => validate_backreferences(&g.child, captures),
        Ast::Empty | Ast::Literal(_) | Ast::AnyChar | Ast::Class(_) | Ast::Anchor(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ast::GroupKind;

    fn must_parse(pattern: &str) -> Ast {
        parse(pattern).unwrap().0
    }

    #[test]
    fn empty_pattern_is_an_error() {
        assert!(parse("").is_err());
    }

    #[test]
    fn literal_concat() {
        let ast = must_parse("ab");
        assert_eq!(ast, Ast::Concat(vec![Ast::Literal(b'a'), Ast::Literal(b'b')]));
    }

    #[test]
    fn alternation() {
        let ast = must_parse("a|b");
        assert_eq!(ast, Ast::Alternate(vec![Ast::Literal(b'a'), Ast::Literal(b'b')]));
    }

    #[test]
    fn capturing_groups_numbered_left_to_right() {
        let (_, caps) = parse("(a)(b)").unwrap();
        assert_eq!(caps.count(), 2);
    }

    #[test]
    fn named_group_index() {
        let (ast, caps) = parse("(?P<user>\\w+)").unwrap();
        assert_eq!(caps.index_of("user"), Some(1));
        match ast {
            Ast::Group(g) => assert_eq!(g.kind, GroupKind::Named(1, "user".into())),
            _ => panic!("expected group"),
        }
    }

    #[test]
    fn nested_quantifier_rejected_double_star() {
        let err = parse("a**").unwrap_err();
        match err {
            Error::Structure(e) => assert_eq!(e.kind, StructureErrorKind::NestedQuantifier),
            _ => panic!("expected structure error, got {:?}", err),
        }
    }

    #[test]
    fn nested_quantifier_rejected_group() {
        let err = parse("(a+)+b").unwrap_err();
        match err {
            Error::Structure(e) => assert_eq!(e.kind, StructureErrorKind::NestedQuantifier),
            _ => panic!("expected structure error, got {:?}", err),
        }
    }

    #[test]
    fn atomic_group_wrapping_quantifier_is_allowed() {
        assert!(parse("(?>a+)+").is_ok());
    }

    #[test]
    fn inverted_quantifier_bounds() {
        assert!(parse("a{3,1}").is_err());
    }

    #[test]
    fn unmatched_paren() {
        assert!(parse("(a").is_err());
        assert!(parse("a)").is_err());
    }

    #[test]
    fn unmatched_bracket() {
        assert!(parse("[a").is_err());
    }

    #[test]
    fn class_with_trailing_hyphen_is_literal() {
        let ast = must_parse("[a-]");
        assert_eq!(ast, Ast::Class(ClassAst::new(vec![(b'a', b'a'), (b'-', b'-')], false)));
    }

    #[test]
    fn class_inverted_range_rejected() {
        assert!(parse("[z-a]").is_err());
    }

    #[test]
    fn posix_class_union() {
        let ast = must_parse("[[:digit:]a]");
        assert_eq!(
            ast,
            Ast::Class(ClassAst::new(vec![(b'0', b'9'), (b'a', b'a')], false))
        );
    }

    #[test]
    fn undeclared_backreference() {
        assert!(parse("\\1").is_err());
    }

    #[test]
    fn undeclared_named_backreference() {
        assert!(parse("\\k<x>").is_err());
    }

    #[test]
    fn quantifier_without_operand() {
        assert!(parse("*a").is_err());
    }

    #[test]
    fn brace_without_valid_bounds_is_literal() {
        let ast = must_parse("a{");
        assert_eq!(ast, Ast::Concat(vec![Ast::Literal(b'a'), Ast::Literal(b'{')]));
    }
}
