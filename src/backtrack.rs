// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// The bounded backtracking engine. It has the same capability as the NFA
// simulation but is the only engine that can execute `Backref`, `Look` and
// `Atomic` instructions. Its main loop keeps worst-case
// linear time the same way the NFA does: a `(pc, pos)` visited bitmap means
// no state is ever explored twice. Lookaround/atomic sub-programs are run
// by direct recursion rather than through the job stack, since they can
// themselves nest arbitrarily; a step budget shared with the main loop
// bounds the total work so a pathological pattern fails loudly instead of
// hanging.

use error::{Error, ResourceError};
use input::Input;
use inst::{Inst, InstIdx, LookKind};
use program::Program;

type Bits = u32;
const BIT_SIZE: usize = 32;
pub const MAX_PROG_SIZE: usize = 4 * 1024;
pub const MAX_INPUT_SIZE: usize = 256 * (1 << 10);

/// Cached allocation reused across searches on the same compiled program.
#[derive(Debug, Default)]
pub struct BackMachine {
    jobs: Vec<Job>,
    visited: Vec<Bits>,
}

impl BackMachine {
    pub fn new() -> BackMachine {
        BackMachine { jobs: vec![], visited: vec![] }
    }
}

#[derive(Clone, Copy, Debug)]
enum Job {
    Inst { pc: InstIdx, at: usize },
    SaveRestore { slot: usize, old_pos: Option<usize> },
}

pub struct Backtrack<'r, 't, 'c> {
    prog: &'r Program,
    input: Input<'t>,
    caps: &'c mut [Option<usize>],
    jobs: &'c mut Vec<Job>,
    visited: &'c mut Vec<Bits>,
    steps_left: usize,
}

/// A generous per-starting-position allowance; large enough that any
/// pattern the nested-quantifier check admits finishes well under it, small
/// enough that a pathological lookaround/atomic nesting fails fast.
const STEP_BUDGET: usize = 1_000_000;

impl<'r, 't, 'c> Backtrack<'r, 't, 'c> {
    /// Returns true iff the given regex and input are small enough for this
    /// engine to be worth running (it isn't chosen for this reason alone --
    /// `needs_backtracker` callers ignore this check and use it regardless).
    pub fn should_exec(prog: &Program, input: &Input) -> bool {
        prog.insts.len() <= MAX_PROG_SIZE && input.len() <= MAX_INPUT_SIZE
    }

    pub fn exec(
        prog: &'r Program,
        caps: &'c mut [Option<usize>],
        input: Input<'t>,
        start: usize,
        machine: &'c mut BackMachine,
    ) -> Result<bool, Error> {
        let visited_len =
            (prog.insts.len() * (input.len() + 1) + BIT_SIZE - 1) / BIT_SIZE;
        machine.jobs.clear();
        machine.visited.clear();
        machine.visited.resize(visited_len, 0);
        let mut b = Backtrack {
            prog: prog,
            input: input,
            caps: caps,
            jobs: &mut machine.jobs,
            visited: &mut machine.visited,
            steps_left: STEP_BUDGET,
        };
        b.exec_(start)
    }

    fn exec_(&mut self, start: usize) -> Result<bool, Error> {
        if self.prog.anchored_begin && start != 0 {
            return Ok(false);
        }
        let mut at = start;
        loop {
            if self.backtrack(at)? {
                return Ok(true);
            }
            if self.prog.anchored_begin || at >= self.input.len() {
                return Ok(false);
            }
            at += 1;
        }
    }

    fn backtrack(&mut self, start: usize) -> Result<bool, Error> {
        // Resets per starting position: otherwise one unmatchable position
        // exhausts the budget and poisons every later position in the scan.
        self.steps_left = STEP_BUDGET;
        self.jobs.clear();
        for v in self.visited.iter_mut() {
            *v = 0;
        }
        self.push(0, start);
        while let Some(job) = self.jobs.pop() {
            match job {
                Job::Inst { pc, at } => {
                    if self.step(pc, at)? {
                        return Ok(true);
                    }
                }
                Job::SaveRestore { slot, old_pos } => {
                    self.caps[slot] = old_pos;
                }
            }
        }
        Ok(false)
    }

    fn step(&mut self, mut pc: InstIdx, mut at: usize) -> Result<bool, Error> {
        loop {
            self.charge()?;
            match self.prog.insts[pc] {
                Inst::Match => return Ok(true),
                Inst::Save(ref inst) => {
                    if inst.slot < self.caps.len() {
                        let old_pos = self.caps[inst.slot];
                        self.push_save_restore(inst.slot, old_pos);
                        self.caps[inst.slot] = Some(at);
                    }
                    pc = inst.goto;
                }
                Inst::Split(ref inst) => {
                    self.push(inst.goto2, at);
                    pc = inst.goto1;
                }
                Inst::Nop(ref inst) => {
                    pc = inst.goto;
                }
                Inst::EmptyLook(ref inst) => {
                    let before = self.input.byte_before(at);
                    let after = self.input.byte_at(at);
                    if inst.matches(before, after) {
                        pc = inst.goto;
                    } else {
                        return Ok(false);
                    }
                }
                Inst::Bytes(ref inst) => {
                    match self.input.byte_at(at) {
                        Some(b) if inst.matches(b) => {
                            pc = inst.goto;
                            at += 1;
                            continue;
                        }
                        _ => return Ok(false),
                    }
                }
                Inst::Backref(ref inst) => {
                    match self.backref_len(inst.group, inst.case_insensitive, at) {
                        Some(len) => {
                            pc = inst.goto;
                            at += len;
                            continue;
                        }
                        None => return Ok(false),
                    }
                }
                Inst::Look(ref inst) => {
                    if self.eval_look(inst.kind, inst.sub_entry, inst.min_len, inst.max_len, at)? {
                        pc = inst.goto;
                    } else {
                        return Ok(false);
                    }
                }
                Inst::Atomic(ref inst) => {
                    match self.run_closed(inst.sub_entry, at, None)? {
                        Some(end) => {
                            pc = inst.goto;
                            at = end;
                            continue;
                        }
                        None => return Ok(false),
                    }
                }
                Inst::SubMatch => {
                    unreachable!("SubMatch only appears inside a closed sub-program")
                }
            }
            if self.has_visited(pc, at) {
                return Ok(false);
            }
        }
    }

    /// Byte-for-byte (optionally case-folded) comparison of the input at
    /// `at` against whatever group `group` most recently captured. An
    /// unset group matches the empty string.
    fn backref_len(&self, group: usize, case_insensitive: bool, at: usize) -> Option<usize> {
        let lo = self.caps.get(group * 2).copied().flatten()?;
        let hi = self.caps.get(group * 2 + 1).copied().flatten()?;
        if hi < lo {
            return None;
        }
        let wanted = &self.input[lo..hi];
        let got = self.input.get(at..at + wanted.len())?;
        let eq = if case_insensitive {
            wanted.eq_ignore_ascii_case(got)
        } else {
            wanted == got
        };
        if eq { Some(wanted.len()) } else { None }
    }

    fn eval_look(
        &mut self,
        kind: LookKind,
        sub_entry: InstIdx,
        min_len: u32,
        max_len: Option<u32>,
        at: usize,
    ) -> Result<bool, Error> {
        if !kind.is_behind() {
            let snapshot = self.caps.to_vec();
            let found = self.run_closed(sub_entry, at, None)?.is_some();
            let holds = found != kind.is_negative();
            if !holds || kind.is_negative() {
                self.caps.copy_from_slice(&snapshot);
            }
            return Ok(holds);
        }
        let max_back = match max_len {
            Some(m) => m as usize,
            None => at,
        };
        let min_back = min_len as usize;
        if min_back > max_back || min_back > at {
            return Ok(kind.is_negative());
        }
        let snapshot = self.caps.to_vec();
        let mut found = false;
        let lo = at.saturating_sub(max_back);
        let hi = at.saturating_sub(min_back);
        let mut start = hi;
        loop {
            if self.run_closed(sub_entry, start, Some(at))?.is_some() {
                found = true;
                break;
            }
            if start == lo {
                break;
            }
            start -= 1;
        }
        let holds = found != kind.is_negative();
        if !holds || kind.is_negative() {
            self.caps.copy_from_slice(&snapshot);
        }
        Ok(holds)
    }

    /// Runs a closed sub-program (the body of a `Look` or `Atomic`) by
    /// direct recursion, in priority order, stopping at the first path that
    /// reaches `SubMatch` -- and, for lookbehind, that reaches it exactly at
    /// `target_end`. Returns the end position of that path.
    fn run_closed(
        &mut self,
        pc: InstIdx,
        at: usize,
        target_end: Option<usize>,
    ) -> Result<Option<usize>, Error> {
        self.charge()?;
        match self.prog.insts[pc] {
            Inst::SubMatch => {
                Ok(if target_end.map_or(true, |t| t == at) { Some(at) } else { None })
            }
            Inst::Save(ref inst) => {
                if inst.slot >= self.caps.len() {
                    return self.run_closed(inst.goto, at, target_end);
                }
                let old = self.caps[inst.slot];
                self.caps[inst.slot] = Some(at);
                let r = self.run_closed(inst.goto, at, target_end)?;
                if r.is_none() {
                    self.caps[inst.slot] = old;
                }
                Ok(r)
            }
            Inst::Split(ref inst) => {
                let r = self.run_closed(inst.goto1, at, target_end)?;
                if r.is_some() {
                    return Ok(r);
                }
                self.run_closed(inst.goto2, at, target_end)
            }
            Inst::Nop(ref inst) => self.run_closed(inst.goto, at, target_end),
            Inst::EmptyLook(ref inst) => {
                let before = self.input.byte_before(at);
                let after = self.input.byte_at(at);
                if inst.matches(before, after) {
                    self.run_closed(inst.goto, at, target_end)
                } else {
                    Ok(None)
                }
            }
            Inst::Bytes(ref inst) => match self.input.byte_at(at) {
                Some(b) if inst.matches(b) => self.run_closed(inst.goto, at + 1, target_end),
                _ => Ok(None),
            },
            Inst::Backref(ref inst) => {
                match self.backref_len(inst.group, inst.case_insensitive, at) {
                    Some(len) => self.run_closed(inst.goto, at + len, target_end),
                    None => Ok(None),
                }
            }
            Inst::Look(ref inst) => {
                if self.eval_look(inst.kind, inst.sub_entry, inst.min_len, inst.max_len, at)? {
                    self.run_closed(inst.goto, at, target_end)
                } else {
                    Ok(None)
                }
            }
            Inst::Atomic(ref inst) => {
                match self.run_closed(inst.sub_entry, at, None)? {
                    Some(end) => self.run_closed(inst.goto, end, target_end),
                    None => Ok(None),
                }
            }
            Inst::Match => unreachable!("closed sub-programs never contain the top-level Match"),
        }
    }

    fn push(&mut self, pc: InstIdx, at: usize) {
        self.jobs.push(Job::Inst { pc: pc, at: at });
    }

    fn push_save_restore(&mut self, slot: usize, old_pos: Option<usize>) {
        self.jobs.push(Job::SaveRestore { slot: slot, old_pos: old_pos });
    }

    fn charge(&mut self) -> Result<(), Error> {
        if self.steps_left == 0 {
            return Err(ResourceError::StepBudgetExceeded.into());
        }
        self.steps_left -= 1;
        Ok(())
    }

    fn has_visited(&mut self, pc: InstIdx, at: usize) -> bool {
        let k = pc * (self.input.len() + 1) + at;
        let k1 = k / BIT_SIZE;
        let k2 = (1 << (k & (BIT_SIZE - 1))) as Bits;
        if self.visited[k1] & k2 == 0 {
            self.visited[k1] |= k2;
            false
        } else {
            true
        }
    }
}
