// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Thompson construction: builds the flat `Insts` array from an `Ast`.
//!
//! Every AST subtree compiles to a *fragment*: one entry instruction index
//! and a list of still-dangling out-edges that the caller patches once the
//! continuation is known, applied uniformly to every instruction that can
//! have a forward-only successor.

use analyze;
use ast::{Ast, AnchorKind, BackrefTarget, ClassAst, Flags, Greediness, Group, GroupKind, Quantifier};
use error::{Error, ResourceError};
use inst::{
    Inst, InstAtomic, InstBackref, InstBytes, InstEmptyLook, InstLook, InstNop, InstSave,
    InstSplit, Insts, EmptyLook, InstIdx, LookKind,
};

/// An edge still waiting to be pointed at its continuation.
enum Patch {
    Goto(InstIdx),
    Split1(InstIdx),
    Split2(InstIdx),
    Look(InstIdx),
    Atomic(InstIdx),
}

struct Fragment {
    entry: InstIdx,
    dangling: Vec<Patch>,
}

pub fn compile(
    ast: &Ast,
    cap_names: Vec<Option<String>>,
    flags: Flags,
    size_limit: usize,
) -> Result<(Insts, Vec<Option<String>>), Error> {
    let mut c = Compiler { insts: Vec::new(), flags: flags, size_limit: size_limit, cap_names: cap_names };
    c.compile_pattern(ast)?;
    let cap_names = c.cap_names.clone();
    Ok((Insts::new(c.insts), cap_names))
}

struct Compiler {
    insts: Vec<Inst>,
    flags: Flags,
    size_limit: usize,
    cap_names: Vec<Option<String>>,
}

impl Compiler {
    fn compile_pattern(&mut self, ast: &Ast) -> Result<(), Error> {
        let start_idx = self.push_placeholder_save(0);
        let body = self.c(ast)?;
        self.set_save_goto(start_idx, body.entry);
        let end_idx = self.push_placeholder_save(1);
        self.patch_all(&body.dangling, end_idx);
        let match_idx = self.insts.len();
        self.set_save_goto(end_idx, match_idx);
        self.insts.push(Inst::Match);
        self.check_size()
    }

    fn c(&mut self, ast: &Ast) -> Result<Fragment, Error> {
        let frag = match *ast {
            Ast::Empty => self.compile_nop(),
            Ast::Literal(b) => {
                let ranges = normalize_ranges(&[(b, b)], false, self.flags.case_insensitive);
                self.compile_bytes(ranges)
            }
            Ast::AnyChar => {
                let ranges = if self.flags.dot_matches_new_line {
                    vec![(0u8, 255u8)]
                } else {
                    vec![(0u8, 9u8), (11u8, 255u8)]
                };
                self.compile_bytes(ranges)
            }
            Ast::Class(ref cls) => self.compile_class(cls),
            Ast::Anchor(ref kind) => self.compile_anchor(kind),
            Ast::Backreference(ref target) => self.compile_backref(target)?,
            Ast::Concat(ref parts) => self.compile_concat(parts)?,
            Ast::Alternate(ref parts) => self.compile_alternate(parts)?,
            Ast::Quantifier(ref q) => self.compile_quantifier(q)?,
            Ast::Group(ref g) => self.compile_group(g)?,
        };
        self.check_size()?;
        Ok(frag)
    }

    // --- primitive fragments ----------------------------------------------

    fn compile_nop(&mut self) -> Fragment {
        let idx = self.insts.len();
        self.insts.push(Inst::Nop(InstNop { goto: 0 }));
        Fragment { entry: idx, dangling: vec![Patch::Goto(idx)] }
    }

    fn compile_bytes(&mut self, ranges: Vec<(u8, u8)>) -> Fragment {
        let idx = self.insts.len();
        self.insts.push(Inst::Bytes(InstBytes { goto: 0, ranges: ranges }));
        Fragment { entry: idx, dangling: vec![Patch::Goto(idx)] }
    }

    fn compile_class(&mut self, cls: &ClassAst) -> Fragment {
        let ranges = normalize_ranges(&cls.ranges, cls.negated, self.flags.case_insensitive);
        self.compile_bytes(ranges)
    }

    fn compile_anchor(&mut self, kind: &AnchorKind) -> Fragment {
        let look = match *kind {
            AnchorKind::StartLineOrText => {
                if self.flags.multi_line { EmptyLook::StartLine } else { EmptyLook::StartText }
            }
            AnchorKind::EndLineOrText => {
                if self.flags.multi_line { EmptyLook::EndLine } else { EmptyLook::EndText }
            }
            AnchorKind::StartText => EmptyLook::StartText,
            AnchorKind::EndText => EmptyLook::EndText,
            AnchorKind::WordBoundary => EmptyLook::WordBoundary,
            AnchorKind::NotWordBoundary => EmptyLook::NotWordBoundary,
        };
        let idx = self.insts.len();
        self.insts.push(Inst::EmptyLook(InstEmptyLook { goto: 0, look: look }));
        Fragment { entry: idx, dangling: vec![Patch::Goto(idx)] }
    }

    fn compile_backref(&mut self, target: &BackrefTarget) -> Result<Fragment, Error> {
        let group = match *target {
            BackrefTarget::Index(i) => i,
            BackrefTarget::Name(ref name) => {
                // Parsing already rejected any name that doesn't resolve.
                self.cap_names
                    .iter()
                    .position(|n| n.as_deref() == Some(name.as_str()))
                    .expect("backreference name validated during parsing")
            }
        };
        let idx = self.insts.len();
        self.insts.push(Inst::Backref(InstBackref {
            goto: 0,
            group: group,
            case_insensitive: self.flags.case_insensitive,
        }));
        Ok(Fragment { entry: idx, dangling: vec![Patch::Goto(idx)] })
    }

    // --- composite fragments ------------------------------------------------

    fn compile_concat(&mut self, parts: &[Ast]) -> Result<Fragment, Error> {
        if parts.is_empty() {
            return Ok(self.compile_nop());
        }
        let mut frag = self.c(&parts[0])?;
        for p in &parts[1..] {
            let next = self.c(p)?;
            self.patch_all(&frag.dangling, next.entry);
            frag = Fragment { entry: frag.entry, dangling: next.dangling };
        }
        Ok(frag)
    }

    fn compile_alternate(&mut self, parts: &[Ast]) -> Result<Fragment, Error> {
        if parts.is_empty() {
            return Ok(self.compile_nop());
        }
        if parts.len() == 1 {
            return self.c(&parts[0]);
        }
        let split_idx = self.insts.len();
        self.insts.push(Inst::Split(InstSplit { goto1: 0, goto2: 0 }));
        let left = self.c(&parts[0])?;
        self.set_split_goto1(split_idx, left.entry);
        let rest = self.compile_alternate(&parts[1..])?;
        self.set_split_goto2(split_idx, rest.entry);
        let mut dangling = left.dangling;
        dangling.extend(rest.dangling);
        Ok(Fragment { entry: split_idx, dangling: dangling })
    }

    /// `X*`: `entry --eps--> X.entry` (priority depends on greediness),
    /// `entry --eps--> exit`, `X.exit --eps--> entry`.
    fn compile_star(&mut self, child: &Ast, greedy: bool) -> Result<Fragment, Error> {
        let split_idx = self.insts.len();
        self.insts.push(Inst::Split(InstSplit { goto1: 0, goto2: 0 }));
        let body = self.c(child)?;
        self.patch_all(&body.dangling, split_idx);
        let dangling = if greedy {
            self.set_split_goto1(split_idx, body.entry);
            vec![Patch::Split2(split_idx)]
        } else {
            self.set_split_goto2(split_idx, body.entry);
            vec![Patch::Split1(split_idx)]
        };
        Ok(Fragment { entry: split_idx, dangling: dangling })
    }

    /// `X+`: `X.entry` is reached unconditionally, then `X.exit --eps-->
    /// X.entry` and `--eps--> exit`.
    fn compile_plus(&mut self, child: &Ast, greedy: bool) -> Result<Fragment, Error> {
        let body = self.c(child)?;
        let split_idx = self.insts.len();
        self.insts.push(Inst::Split(InstSplit { goto1: 0, goto2: 0 }));
        self.patch_all(&body.dangling, split_idx);
        let dangling = if greedy {
            self.set_split_goto1(split_idx, body.entry);
            vec![Patch::Split2(split_idx)]
        } else {
            self.set_split_goto2(split_idx, body.entry);
            vec![Patch::Split1(split_idx)]
        };
        Ok(Fragment { entry: body.entry, dangling: dangling })
    }

    /// `X?`: `entry --eps--> X.entry` and `--eps--> exit`, by greediness.
    fn compile_optional(&mut self, child: &Ast, greedy: bool) -> Result<Fragment, Error> {
        let split_idx = self.insts.len();
        self.insts.push(Inst::Split(InstSplit { goto1: 0, goto2: 0 }));
        let body = self.c(child)?;
        let mut dangling = body.dangling;
        if greedy {
            self.set_split_goto1(split_idx, body.entry);
            dangling.push(Patch::Split2(split_idx));
        } else {
            self.set_split_goto2(split_idx, body.entry);
            dangling.push(Patch::Split1(split_idx));
        }
        Ok(Fragment { entry: split_idx, dangling: dangling })
    }

    /// `X{m,n}`: `m` mandatory copies concatenated, then `n - m` copies each
    /// gated by its own priority-ordered choice; an infinite `n` makes the
    /// final copy loop like `*`.
    fn compile_bounded(
        &mut self,
        child: &Ast,
        min: u32,
        max: Option<u32>,
        greedy: bool,
    ) -> Result<Fragment, Error> {
        let tail_greediness = if greedy { Greediness::Greedy } else { Greediness::Lazy };
        let mut parts: Vec<Ast> = Vec::new();
        for _ in 0..min {
            parts.push(child.clone());
        }
        match max {
            None => {
                if min == 0 {
                    return self.compile_star(child, greedy);
                }
                parts.push(Ast::quantifier(child.clone(), 0, None, tail_greediness));
            }
            Some(max) => {
                for _ in min..max {
                    parts.push(Ast::quantifier(child.clone(), 0, Some(1), tail_greediness));
                }
            }
        }
        if parts.is_empty() {
            return Ok(self.compile_nop());
        }
        self.compile_concat(&parts)
    }

    fn compile_quantifier(&mut self, q: &Quantifier) -> Result<Fragment, Error> {
        if q.greediness.is_possessive() {
            // Equivalent to an atomic group wrapping the greedy form
            // an atomic group wrapping the greedy form of the same quantifier.
            let greedy = Ast::quantifier(q.child.clone(), q.min, q.max, Greediness::Greedy);
            return self.compile_atomic(&greedy);
        }
        let greedy = q.greediness.is_greedy();
        match (q.min, q.max) {
            (0, None) => self.compile_star(&q.child, greedy),
            (1, None) => self.compile_plus(&q.child, greedy),
            (0, Some(1)) => self.compile_optional(&q.child, greedy),
            (min, max) => self.compile_bounded(&q.child, min, max, greedy),
        }
    }

    fn compile_group(&mut self, g: &Group) -> Result<Fragment, Error> {
        match g.kind {
            GroupKind::Capturing(idx) | GroupKind::Named(idx, _) => {
                let start_idx = self.push_placeholder_save(idx * 2);
                let body = self.c(&g.child)?;
                self.set_save_goto(start_idx, body.entry);
                let end_idx = self.push_placeholder_save(idx * 2 + 1);
                self.patch_all(&body.dangling, end_idx);
                Ok(Fragment { entry: start_idx, dangling: vec![Patch::Goto(end_idx)] })
            }
            GroupKind::NonCapturing => self.c(&g.child),
            GroupKind::Atomic => self.compile_atomic(&g.child),
            GroupKind::LookaheadPositive => self.compile_look(LookKind::AheadPositive, &g.child),
            GroupKind::LookaheadNegative => self.compile_look(LookKind::AheadNegative, &g.child),
            GroupKind::LookbehindPositive => self.compile_look(LookKind::BehindPositive, &g.child),
            GroupKind::LookbehindNegative => self.compile_look(LookKind::BehindNegative, &g.child),
        }
    }

    fn compile_look(&mut self, kind: LookKind, child: &Ast) -> Result<Fragment, Error> {
        let min_len = analyze::min_length(child);
        let max_len = analyze::max_length(child);
        let idx = self.insts.len();
        self.insts.push(Inst::Look(InstLook {
            goto: 0,
            sub_entry: 0,
            kind: kind,
            min_len: min_len,
            max_len: max_len,
        }));
        let sub_entry = self.compile_closed(child)?;
        if let Inst::Look(ref mut l) = self.insts[idx] {
            l.sub_entry = sub_entry;
        }
        Ok(Fragment { entry: idx, dangling: vec![Patch::Look(idx)] })
    }

    fn compile_atomic(&mut self, child: &Ast) -> Result<Fragment, Error> {
        let idx = self.insts.len();
        self.insts.push(Inst::Atomic(InstAtomic { goto: 0, sub_entry: 0 }));
        let sub_entry = self.compile_closed(child)?;
        if let Inst::Atomic(ref mut a) = self.insts[idx] {
            a.sub_entry = sub_entry;
        }
        Ok(Fragment { entry: idx, dangling: vec![Patch::Atomic(idx)] })
    }

    /// Compiles `ast` as a self-contained sub-program terminated by
    /// `SubMatch` rather than leaving dangling out-edges, for use as the
    /// body of a `Look` or `Atomic` instruction.
    fn compile_closed(&mut self, ast: &Ast) -> Result<InstIdx, Error> {
        let frag = self.c(ast)?;
        let end = self.insts.len();
        self.insts.push(Inst::SubMatch);
        self.patch_all(&frag.dangling, end);
        Ok(frag.entry)
    }

    // --- patch bookkeeping ---------------------------------------------------

    fn push_placeholder_save(&mut self, slot: usize) -> InstIdx {
        let idx = self.insts.len();
        self.insts.push(Inst::Save(InstSave { goto: 0, slot: slot }));
        idx
    }

    fn set_save_goto(&mut self, idx: InstIdx, target: InstIdx) {
        if let Inst::Save(ref mut s) = self.insts[idx] {
            s.goto = target;
        }
    }

    fn set_split_goto1(&mut self, idx: InstIdx, target: InstIdx) {
        if let Inst::Split(ref mut s) = self.insts[idx] {
            s.goto1 = target;
        }
    }

    fn set_split_goto2(&mut self, idx: InstIdx, target: InstIdx) {
        if let Inst::Split(ref mut s) = self.insts[idx] {
            s.goto2 = target;
        }
    }

    fn patch_all(&mut self, patches: &[Patch], target: InstIdx) {
        for p in patches {
            match *p {
                Patch::Goto(i) => match self.insts[i] {
                    Inst::Save(ref mut s) => s.goto = target,
                    Inst::Bytes(ref mut b) => b.goto = target,
                    Inst::EmptyLook(ref mut e) => e.goto = target,
                    Inst::Backref(ref mut b) => b.goto = target,
                    Inst::Nop(ref mut n) => n.goto = target,
                    _ => unreachable!("patch target is not a goto-bearing instruction"),
                },
                Patch::Split1(i) => self.set_split_goto1(i, target),
                Patch::Split2(i) => self.set_split_goto2(i, target),
                Patch::Look(i) => {
                    if let Inst::Look(ref mut l) = self.insts[i] {
                        l.goto = target;
                    }
                }
                Patch::Atomic(i) => {
                    if let Inst::Atomic(ref mut a) = self.insts[i] {
                        a.goto = target;
                    }
                }
            }
        }
    }

    fn check_size(&self) -> Result<(), Error> {
        let used = self.insts.len() * ::std::mem::size_of::<Inst>();
        if used > self.size_limit {
            Err(ResourceError::CompiledTooBig(self.size_limit).into())
        } else {
            Ok(())
        }
    }
}

/// Bitset-based range normalization: applies ASCII case folding to the
/// declared (positive) members of the class, then negates if asked to.
/// Folding before negating means `(?i)[^a]` excludes both `a` and `A`.
fn normalize_ranges(ranges: &[(u8, u8)], negated: bool, case_insensitive: bool) -> Vec<(u8, u8)> {
    let mut set = ranges_to_bitset(ranges);
    if case_insensitive {
        fold_case(&mut set);
    }
    if negated {
        for b in set.iter_mut() {
            *b = !*b;
        }
    }
    bitset_to_ranges(&set)
}

fn ranges_to_bitset(ranges: &[(u8, u8)]) -> [bool; 256] {
    let mut set = [false; 256];
    for &(a, b) in ranges {
        let mut i = a as usize;
        let end = b as usize;
        while i <= end {
            set[i] = true;
            i += 1;
        }
    }
    set
}

fn fold_case(set: &mut [bool; 256]) {
    for b in 0u16..256 {
        let c = b as u8;
        if set[b as usize] {
            if c.is_ascii_uppercase() {
                set[c.to_ascii_lowercase() as usize] = true;
            } else if c.is_ascii_lowercase() {
                set[c.to_ascii_uppercase() as usize] = true;
            }
        }
    }
}

fn bitset_to_ranges(set: &[bool; 256]) -> Vec<(u8, u8)> {
    let mut ranges = vec![];
    let mut i = 0usize;
    while i < 256 {
        if set[i] {
            let start = i;
            while i < 256 && set[i] {
                i += 1;
            }
            ranges.push((start as u8, (i - 1) as u8));
        } else {
            i += 1;
        }
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use parse::parse;

    fn compile_pattern(pattern: &str) -> Insts {
        let (ast, caps) = parse(pattern).unwrap();
        compile(&ast, caps.names, Flags::default(), 10 << 20).unwrap().0
    }

    #[test]
    fn literal_compiles_to_save_bytes_match() {
        let insts = compile_pattern("ab");
        assert!(matches!(insts[0], Inst::Save(_)));
        assert!(matches!(insts[insts.len() - 1], Inst::Match));
    }

    #[test]
    fn case_insensitive_literal_has_both_cases() {
        let (ast, caps) = parse("a").unwrap();
        let (insts, _) = compile(
            &ast,
            caps.names,
            Flags { case_insensitive: true, ..Flags::default() },
            10 << 20,
        )
        .unwrap();
        let bytes_inst = insts.iter().find_map(|i| match i {
            Inst::Bytes(b) => Some(b),
            _ => None,
        });
        let b = bytes_inst.unwrap();
        assert!(b.matches(b'a' as u8));
        assert!(b.matches(b'A' as u8));
    }

    #[test]
    fn capturing_group_emits_two_saves() {
        let insts = compile_pattern("(a)");
        let save_slots: Vec<usize> = insts
            .iter()
            .filter_map(|i| match i {
                Inst::Save(s) => Some(s.slot),
                _ => None,
            })
            .collect();
        assert!(save_slots.contains(&2));
        assert!(save_slots.contains(&3));
    }

    #[test]
    fn lookahead_compiles_to_look_with_submatch() {
        let insts = compile_pattern("foo(?=bar)");
        assert!(insts.iter().any(|i| matches!(i, Inst::Look(_))));
        assert!(insts.iter().any(|i| matches!(i, Inst::SubMatch)));
    }

    #[test]
    fn possessive_quantifier_desugars_to_atomic() {
        let insts = compile_pattern("a++");
        assert!(insts.iter().any(|i| matches!(i, Inst::Atomic(_))));
    }

    #[test]
    fn size_limit_is_enforced() {
        let (ast, caps) = parse("a{1000}").unwrap();
        let err = compile(&ast, caps.names, Flags::default(), 16).unwrap_err();
        match err {
            Error::Resource(_) => {}
            _ => panic!("expected resource error, got {:?}", err),
        }
    }
}
