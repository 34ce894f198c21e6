// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Pike's construction: a thread list per input position, each thread
// carrying its own capture slots, explored in priority order so the first
// thread to reach Match wins (leftmost-first semantics). Guaranteed
// linear time because `Threads` is a sparse set: a pc is added to a list
// at most once per position.
//
// This engine cannot run a pattern containing a lazy quantifier,
// lookaround, a backreference or an atomic group -- those are routed to
// the bounded backtracker by `analyze::needs_backtracker` before this
// engine is ever selected.

use input::Input;
use inst::Inst;
use program::Program;

/// An NFA simulation matching engine.
pub struct Nfa<'r> {
    prog: &'r Program,
    input: Input<'r>,
}

impl<'r> Nfa<'r> {
    /// Executes the NFA matching engine, writing capture slots into `caps`
    /// (`caps.len() == 2 * num_captures`). Returns whether a match was found.
    pub fn exec(
        prog: &'r Program,
        caps: &mut [Option<usize>],
        input: Input<'r>,
        start: usize,
        threads: &mut NfaThreads,
    ) -> bool {
        threads.resize(prog.insts.len(), caps.len());
        let nfa = Nfa { prog: prog, input: input };
        nfa.run(threads, caps, start)
    }

    fn run(&self, q: &mut NfaThreads, caps: &mut [Option<usize>], start: usize) -> bool {
        let mut matched = false;
        let mut pos = start;
        q.clist.clear();
        q.nlist.clear();
        loop {
            if q.clist.size == 0 {
                if matched || (pos > start && self.prog.anchored_begin) {
                    break;
                }
                if let Some(prefix) = self.prog.prefixes.prefix() {
                    if !prefix.is_empty() {
                        match self.prog.prefixes.find(&self.input[pos..]) {
                            None => break,
                            Some((s, _)) => pos += s,
                        }
                    }
                }
            }
            if q.clist.size == 0 || (!self.prog.anchored_begin && !matched) {
                let mut fresh = vec![None; caps.len()];
                self.add(&mut q.clist, &mut fresh, 0, pos);
            }
            let mut stepped_match = false;
            for i in 0..q.clist.size {
                let pc = q.clist.pc(i);
                let mut tcaps = q.clist.caps(i).to_vec();
                if self.step(&mut q.nlist, caps, &mut tcaps, pc, pos) {
                    matched = true;
                    stepped_match = true;
                    break;
                }
            }
            let _ = stepped_match;
            if pos >= self.input.len() {
                break;
            }
            pos += 1;
            q.swap();
            q.nlist.clear();
        }
        matched
    }

    fn step(
        &self,
        nlist: &mut Threads,
        caps: &mut [Option<usize>],
        thread_caps: &mut [Option<usize>],
        pc: usize,
        pos: usize,
    ) -> bool {
        match self.prog.insts[pc] {
            Inst::Match => {
                for (slot, val) in caps.iter_mut().zip(thread_caps.iter()) {
                    *slot = *val;
                }
                true
            }
            Inst::Bytes(ref inst) => {
                if let Some(b) = self.input.byte_at(pos) {
                    if inst.matches(b) {
                        self.add(nlist, thread_caps, inst.goto, pos + 1);
                    }
                }
                false
            }
            Inst::EmptyLook(_) | Inst::Save(_) | Inst::Split(_) | Inst::Nop(_) => false,
            Inst::Backref(_) | Inst::Look(_) | Inst::Atomic(_) | Inst::SubMatch => {
                unreachable!("pattern requiring the backtracker reached the NFA simulator")
            }
        }
    }

    fn add(&self, nlist: &mut Threads, thread_caps: &mut [Option<usize>], pc: usize, pos: usize) {
        if nlist.contains(pc) {
            return;
        }
        let ti = nlist.add(pc);
        match self.prog.insts[pc] {
            Inst::EmptyLook(ref inst) => {
                let before = self.input.byte_before(pos);
                let after = self.input.byte_at(pos);
                if inst.matches(before, after) {
                    self.add(nlist, thread_caps, inst.goto, pos);
                }
            }
            Inst::Save(ref inst) => {
                if inst.slot >= thread_caps.len() {
                    self.add(nlist, thread_caps, inst.goto, pos);
                } else {
                    let old = thread_caps[inst.slot];
                    thread_caps[inst.slot] = Some(pos);
                    self.add(nlist, thread_caps, inst.goto, pos);
                    thread_caps[inst.slot] = old;
                }
            }
            Inst::Split(ref inst) => {
                self.add(nlist, thread_caps, inst.goto1, pos);
                self.add(nlist, thread_caps, inst.goto2, pos);
            }
            Inst::Nop(ref inst) => {
                self.add(nlist, thread_caps, inst.goto, pos);
            }
            Inst::Match | Inst::Bytes(_) => {
                let t = nlist.thread(ti);
                t.caps.copy_from_slice(thread_caps);
            }
            Inst::Backref(_) | Inst::Look(_) | Inst::Atomic(_) | Inst::SubMatch => {
                unreachable!("pattern requiring the backtracker reached the NFA simulator")
            }
        }
    }
}

/// Cached thread-list allocation, reused across searches on the same
/// compiled program.
#[derive(Debug)]
pub struct NfaThreads {
    clist: Threads,
    nlist: Threads,
}

impl NfaThreads {
    pub fn new(num_insts: usize, ncaps: usize) -> NfaThreads {
        let mut t = NfaThreads { clist: Threads::new(), nlist: Threads::new() };
        t.resize(num_insts, ncaps);
        t
    }

    fn resize(&mut self, num_insts: usize, ncaps: usize) {
        self.clist.resize(num_insts, ncaps);
        self.nlist.resize(num_insts, ncaps);
    }

    fn swap(&mut self) {
        ::std::mem::swap(&mut self.clist, &mut self.nlist);
    }
}

#[derive(Debug)]
struct Threads {
    dense: Vec<Thread>,
    sparse: Vec<usize>,
    size: usize,
}

#[derive(Clone, Debug)]
struct Thread {
    pc: usize,
    caps: Vec<Option<usize>>,
}

impl Threads {
    fn new() -> Threads {
        Threads { dense: vec![], sparse: vec![], size: 0 }
    }

    fn resize(&mut self, num_insts: usize, ncaps: usize) {
        let old_slots = self.dense.get(0).map_or(0, |t| t.caps.len());
        if num_insts != self.dense.len() || old_slots != ncaps {
            let t = Thread { pc: 0, caps: vec![None; ncaps] };
            *self = Threads { dense: vec![t; num_insts], sparse: vec![0; num_insts], size: 0 };
        }
    }

    fn add(&mut self, pc: usize) -> usize {
        let i = self.size;
        self.dense[i].pc = pc;
        self.sparse[pc] = i;
        self.size += 1;
        i
    }

    fn thread(&mut self, i: usize) -> &mut Thread {
        &mut self.dense[i]
    }

    fn contains(&self, pc: usize) -> bool {
        let s = self.sparse[pc];
        s < self.size && self.dense[s].pc == pc
    }

    fn clear(&mut self) {
        self.size = 0;
    }

    fn pc(&self, i: usize) -> usize {
        self.dense[i].pc
    }

    fn caps(&mut self, i: usize) -> &mut [Option<usize>] {
        &mut self.dense[i].caps
    }
}
