// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Computes the `OptimizationRecord` the dispatcher uses to pick a scan
//! strategy and an execution engine, by structural induction over the AST.
//! Nothing here touches the input; it runs once per compiled pattern.

use ast::{Ast, AnchorKind, Flags, GroupKind};

/// What the dispatcher learns about a pattern before ever seeing input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OptimizationRecord {
    pub literal_prefix: Option<Vec<u8>>,
    pub anchored_start: bool,
    pub anchored_end: bool,
    pub min_length: u32,
    pub max_length: Option<u32>,
    pub needs_backtracker: bool,
}

pub fn analyze(ast: &Ast, flags: Flags) -> OptimizationRecord {
    OptimizationRecord {
        literal_prefix: literal_prefix(ast, flags),
        anchored_start: starts_with_anchor(ast, flags),
        anchored_end: ends_with_anchor(ast, flags),
        min_length: min_length(ast),
        max_length: max_length(ast),
        needs_backtracker: needs_backtracker(ast),
    }
}

/// A group kind that contributes its child's bytes directly to an
/// enclosing concatenation (as opposed to a lookaround, which is
/// zero-width and opaque to byte-level analysis).
fn is_transparent(kind: &GroupKind) -> bool {
    matches!(
        kind,
        GroupKind::Capturing(_) | GroupKind::NonCapturing | GroupKind::Named(_, _) | GroupKind::Atomic
    )
}

// --- literal_prefix -------------------------------------------------------

/// Case folding makes a byte ambiguous for prefix purposes (either case can
/// appear in the input), so case-insensitive patterns don't get a literal
/// prefix at all. Simpler and always correct; only costs a fast path.
fn literal_prefix(ast: &Ast, flags: Flags) -> Option<Vec<u8>> {
    if flags.case_insensitive {
        return None;
    }
    let mut buf = Vec::new();
    collect_prefix(ast, &mut buf);
    if buf.is_empty() {
        None
    } else {
        Some(buf)
    }
}

/// Appends bytes that every match is guaranteed to begin with to `buf`.
/// Returns whether the caller may keep appending sibling content after this
/// node (true) or must stop because what follows is no longer guaranteed
/// fixed (false).
fn collect_prefix(ast: &Ast, buf: &mut Vec<u8>) -> bool {
    match *ast {
        Ast::Literal(b) => {
            buf.push(b);
            true
        }
        Ast::Empty => true,
        Ast::Anchor(_) => true,
        Ast::Concat(ref parts) => {
            for p in parts {
                if !collect_prefix(p, buf) {
                    return false;
                }
            }
            true
        }
        Ast::Group(ref g) => {
            if g.kind.is_lookaround() {
                // Zero-width; doesn't add bytes but doesn't break the chain.
                true
            } else if is_transparent(&g.kind) {
                collect_prefix(&g.child, buf)
            } else {
                false
            }
        }
        Ast::Quantifier(ref q) => {
            // Only the mandatory copies are guaranteed present. Rather than
            // unroll them, contribute at most one copy's worth and stop: a
            // tighter prefix is a nice-to-have, not a correctness
            // requirement.
            if q.min >= 1 {
                collect_prefix(&q.child, buf);
            }
            false
        }
        Ast::Class(_) | Ast::AnyChar | Ast::Alternate(_) | Ast::Backreference(_) => false,
    }
}

// --- anchored_start / anchored_end ----------------------------------------

// Under multiline, `^`/`$` also accept every newline-successor/predecessor,
// not just position 0 / text end, so only a flag-independent anchor
// (`\A`/`\z`) or a `^`/`$` under a non-multiline flag pins the match to a
// single position the dispatcher can special-case.
fn starts_with_anchor(ast: &Ast, flags: Flags) -> bool {
    match *ast {
        Ast::Anchor(AnchorKind::StartText) => true,
        Ast::Anchor(AnchorKind::StartLineOrText) => !flags.multi_line,
        Ast::Concat(ref parts) => parts.first().map_or(false, |p| starts_with_anchor(p, flags)),
        Ast::Alternate(ref parts) => {
            !parts.is_empty() && parts.iter().all(|p| starts_with_anchor(p, flags))
        }
        Ast::Group(ref g) if is_transparent(&g.kind) => starts_with_anchor(&g.child, flags),
        _ => false,
    }
}

fn ends_with_anchor(ast: &Ast, flags: Flags) -> bool {
    match *ast {
        Ast::Anchor(AnchorKind::EndText) => true,
        Ast::Anchor(AnchorKind::EndLineOrText) => !flags.multi_line,
        Ast::Concat(ref parts) => parts.last().map_or(false, |p| ends_with_anchor(p, flags)),
        Ast::Alternate(ref parts) => {
            !parts.is_empty() && parts.iter().all(|p| ends_with_anchor(p, flags))
        }
        Ast::Group(ref g) if is_transparent(&g.kind) => ends_with_anchor(&g.child, flags),
        _ => false,
    }
}

// --- min_length / max_length ----------------------------------------------

pub(crate) fn min_length(ast: &Ast) -> u32 {
    match *ast {
        Ast::Empty | Ast::Anchor(_) | Ast::Backreference(_) => 0,
        Ast::Literal(_) | Ast::AnyChar | Ast::Class(_) => 1,
        Ast::Concat(ref parts) => parts.iter().map(min_length).fold(0u32, |a, b| a.saturating_add(b)),
        Ast::Alternate(ref parts) => parts.iter().map(min_length).min().unwrap_or(0),
        Ast::Quantifier(ref q) => min_length(&q.child).saturating_mul(q.min),
        Ast::Group(ref g) => {
            if g.kind.is_lookaround() {
                0
            } else {
                min_length(&g.child)
            }
        }
    }
}

pub(crate) fn max_length(ast: &Ast) -> Option<u32> {
    match *ast {
        Ast::Empty | Ast::Anchor(_) => Some(0),
        Ast::Literal(_) | Ast::AnyChar | Ast::Class(_) => Some(1),
        // A backreference's length tracks whatever the referenced group
        // captured; no static bound is derivable.
        Ast::Backreference(_) => None,
        Ast::Concat(ref parts) => {
            let mut total = 0u32;
            for p in parts {
                total = total.saturating_add(max_length(p)?);
            }
            Some(total)
        }
        Ast::Alternate(ref parts) => {
            let mut best = 0u32;
            for p in parts {
                best = best.max(max_length(p)?);
            }
            Some(best)
        }
        Ast::Quantifier(ref q) => match q.max {
            None => None,
            Some(0) => Some(0),
            Some(qmax) => max_length(&q.child).map(|cmax| cmax.saturating_mul(qmax)),
        },
        Ast::Group(ref g) => {
            if g.kind.is_lookaround() {
                Some(0)
            } else {
                max_length(&g.child)
            }
        }
    }
}

// --- needs_backtracker -----------------------------------------------------

fn needs_backtracker(ast: &Ast) -> bool {
    match *ast {
        Ast::Backreference(_) => true,
        Ast::Quantifier(ref q) => !q.greediness.is_greedy() || needs_backtracker(&q.child),
        Ast::Group(ref g) => {
            g.kind.is_lookaround() || matches!(g.kind, GroupKind::Atomic) || needs_backtracker(&g.child)
        }
        Ast::Concat(ref parts) | Ast::Alternate(ref parts) => parts.iter().any(needs_backtracker),
        Ast::Empty | Ast::Literal(_) | Ast::AnyChar | Ast::Class(_) | Ast::Anchor(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parse::parse;

    fn analyze_pattern(pattern: &str) -> OptimizationRecord {
        let (ast, _) = parse(pattern).unwrap();
        analyze(&ast, Flags::default())
    }

    #[test]
    fn literal_prefix_of_plain_literal() {
        let rec = analyze_pattern("hello");
        assert_eq!(rec.literal_prefix, Some(b"hello".to_vec()));
        assert_eq!(rec.min_length, 5);
        assert_eq!(rec.max_length, Some(5));
    }

    #[test]
    fn literal_prefix_stops_at_class() {
        let rec = analyze_pattern("ab[cd]ef");
        assert_eq!(rec.literal_prefix, Some(b"ab".to_vec()));
    }

    #[test]
    fn no_prefix_under_case_insensitive() {
        let (ast, _) = parse("hello").unwrap();
        let rec = analyze(&ast, Flags { case_insensitive: true, ..Flags::default() });
        assert_eq!(rec.literal_prefix, None);
    }

    #[test]
    fn anchored_start_detected() {
        assert!(analyze_pattern("^abc").anchored_start);
        assert!(analyze_pattern("\\Aabc").anchored_start);
        assert!(!analyze_pattern("abc").anchored_start);
    }

    #[test]
    fn anchored_end_detected() {
        assert!(analyze_pattern("abc$").anchored_end);
        assert!(analyze_pattern("abc\\z").anchored_end);
    }

    #[test]
    fn multiline_caret_and_dollar_are_not_single_position_anchors() {
        let (ast, _) = parse("^abc$").unwrap();
        let rec = analyze(&ast, Flags { multi_line: true, ..Flags::default() });
        assert!(!rec.anchored_start);
        assert!(!rec.anchored_end);
        // `\A`/`\z` stay flag-independent: always a true single-position anchor.
        let (ast, _) = parse("\\Aabc\\z").unwrap();
        let rec = analyze(&ast, Flags { multi_line: true, ..Flags::default() });
        assert!(rec.anchored_start);
        assert!(rec.anchored_end);
    }

    #[test]
    fn length_bounds_through_quantifiers() {
        let rec = analyze_pattern("\\d{3}-\\d{4}");
        assert_eq!(rec.min_length, 8);
        assert_eq!(rec.max_length, Some(8));
    }

    #[test]
    fn unbounded_quantifier_has_no_max() {
        let rec = analyze_pattern("a+");
        assert_eq!(rec.min_length, 1);
        assert_eq!(rec.max_length, None);
    }

    #[test]
    fn needs_backtracker_for_lazy_and_lookaround_and_backref() {
        assert!(analyze_pattern("a+?").needs_backtracker);
        assert!(analyze_pattern("foo(?=bar)").needs_backtracker);
        assert!(analyze_pattern("(\\w+) \\1").needs_backtracker);
        assert!(!analyze_pattern("a+b*").needs_backtracker);
    }
}
