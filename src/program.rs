// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `Program`: a compiled pattern plus the dispatcher that picks an engine
//! for each search. Once built, a `Program` is
//! immutable except for the interior-mutable engine caches, which are not
//! observable from outside this crate.

use analyze::{self, OptimizationRecord};
use ast::Flags;
use backtrack::{self, BackMachine, Backtrack};
use compile;
use error::Error;
use input::Input;
use inst::Insts;
use literals::Literals;
use nfa::{Nfa, NfaThreads};
use parse::parse;
use pool::Pool;

/// The matching engines this crate can dispatch to.
#[derive(Clone, Copy, Debug)]
pub enum MatchEngine {
    /// Bounded backtracking. The only engine able to run backreferences,
    /// lookaround and atomic groups; also the fastest for small inputs.
    Backtrack,
    /// Pike's NFA simulation. Always correct, guaranteed linear time,
    /// the slowest of the three.
    Nfa,
    /// The whole pattern reduces to one required literal with no captures
    /// requested: a plain substring search suffices.
    Literals,
}

pub struct Program {
    pub original: String,
    pub insts: Insts,
    pub cap_names: Vec<Option<String>>,
    pub flags: Flags,
    pub opt: OptimizationRecord,
    pub prefixes: Literals,
    pub anchored_begin: bool,
    pub anchored_end: bool,
    pub engine: Option<MatchEngine>,
    nfa_threads: Pool<NfaThreads>,
    backtrack: Pool<BackMachine>,
}

impl Program {
    /// Parses, analyzes and compiles `pattern` under `flags`.
    pub fn new(
        pattern: &str,
        flags: Flags,
        engine: Option<MatchEngine>,
        size_limit: usize,
    ) -> Result<Program, Error> {
        let (ast, caps) = parse(pattern)?;
        let opt = analyze::analyze(&ast, flags);
        let (insts, cap_names) = compile::compile(&ast, caps.names, flags, size_limit)?;
        let prefixes = Literals::new(opt.literal_prefix.clone());
        let num_insts = insts.len();
        let num_slots = 2 * cap_names.len();
        let create_threads = move || NfaThreads::new(num_insts, num_slots);
        let create_backtrack = move || BackMachine::new();
        Ok(Program {
            original: pattern.to_owned(),
            insts: insts,
            cap_names: cap_names,
            flags: flags,
            anchored_begin: opt.anchored_start,
            anchored_end: opt.anchored_end,
            opt: opt,
            prefixes: prefixes,
            engine: engine,
            nfa_threads: Pool::new(Box::new(create_threads)),
            backtrack: Pool::new(Box::new(create_backtrack)),
        })
    }

    /// Executes the program against `text` starting the search at `start`.
    /// On a match, fills `caps` (length `2 * num_captures()`) with the byte
    /// offsets of each capture group that participated.
    pub fn exec(
        &self,
        caps: &mut [Option<usize>],
        text: &[u8],
        start: usize,
    ) -> Result<bool, Error> {
        let input = Input::new(text);
        match self.choose_engine(caps.len(), input.len()) {
            MatchEngine::Literals => match self.prefixes.find(&text[start..]) {
                None => Ok(false),
                Some((s, e)) => {
                    if caps.len() >= 2 {
                        caps[0] = Some(start + s);
                        caps[1] = Some(start + e);
                    }
                    Ok(true)
                }
            },
            MatchEngine::Nfa => {
                let mut threads = self.nfa_threads.get();
                Ok(Nfa::exec(self, caps, input, start, &mut threads))
            }
            MatchEngine::Backtrack => {
                let mut machine = self.backtrack.get();
                Backtrack::exec(self, caps, input, start, &mut machine)
            }
        }
    }

    fn choose_engine(&self, cap_slots: usize, input_len: usize) -> MatchEngine {
        if self.opt.needs_backtracker {
            // Nfa cannot execute Backref/Look/Atomic; Literals can't carry
            // captures through lookaround either. No override applies.
            return MatchEngine::Backtrack;
        }
        if let Some(e) = self.engine {
            return e;
        }
        if cap_slots <= 2
            && self.prefixes.is_exact(
                self.opt.anchored_start,
                self.opt.anchored_end,
                self.opt.min_length,
                self.opt.max_length,
            )
        {
            MatchEngine::Literals
        } else if self.insts.len() <= backtrack::MAX_PROG_SIZE && input_len <= backtrack::MAX_INPUT_SIZE {
            MatchEngine::Backtrack
        } else {
            MatchEngine::Nfa
        }
    }

    /// The total number of capture groups, including the implicit group 0
    /// for the whole match.
    pub fn num_captures(&self) -> usize {
        self.cap_names.len()
    }

    pub fn alloc_captures(&self) -> Vec<Option<usize>> {
        vec![None; 2 * self.num_captures()]
    }
}

impl Clone for Program {
    fn clone(&self) -> Program {
        let num_insts = self.insts.len();
        let num_slots = 2 * self.cap_names.len();
        let create_threads = move || NfaThreads::new(num_insts, num_slots);
        let create_backtrack = move || BackMachine::new();
        Program {
            original: self.original.clone(),
            insts: self.insts.clone(),
            cap_names: self.cap_names.clone(),
            flags: self.flags,
            opt: self.opt.clone(),
            prefixes: self.prefixes.clone(),
            anchored_begin: self.anchored_begin,
            anchored_end: self.anchored_end,
            engine: self.engine,
            nfa_threads: Pool::new(Box::new(create_threads)),
            backtrack: Pool::new(Box::new(create_backtrack)),
        }
    }
}

impl ::std::fmt::Debug for Program {
    fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
        f.debug_struct("Program")
            .field("original", &self.original)
            .field("num_insts", &self.insts.len())
            .field("opt", &self.opt)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_pattern_uses_literals_engine() {
        let prog = Program::new("hello", Flags::default(), None, 10 << 20).unwrap();
        let mut caps = prog.alloc_captures();
        assert!(prog.exec(&mut caps, b"say hello world", 0).unwrap());
        assert_eq!(caps[0], Some(4));
        assert_eq!(caps[1], Some(9));
    }

    #[test]
    fn backreference_forces_backtracker() {
        let prog = Program::new(r"(\w+)-\1", Flags::default(), None, 10 << 20).unwrap();
        let mut caps = prog.alloc_captures();
        assert!(prog.exec(&mut caps, b"ab-ab", 0).unwrap());
    }

    #[test]
    fn anchored_start_is_detected_from_analysis() {
        let prog = Program::new("^abc", Flags::default(), None, 10 << 20).unwrap();
        assert!(prog.anchored_begin);
    }
}
