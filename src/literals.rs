// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A fast pre-filter used to skip ahead to where a match could possibly
//! start, built from the `literal_prefix` an `analyze::OptimizationRecord`
//! already worked out by structural induction over the AST. There is no
//! Aho-Corasick automaton here: the analyzer only ever produces a single
//! required prefix, so a `memchr`/`memmem` scan is the whole story.

use memchr::memmem::Finder;

/// A compiled required-prefix scanner, or the absence of one.
#[derive(Clone, Debug)]
pub struct Literals {
    prefix: Option<Vec<u8>>,
}

impl Literals {
    pub fn new(prefix: Option<Vec<u8>>) -> Literals {
        Literals { prefix: prefix }
    }

    pub fn empty() -> Literals {
        Literals { prefix: None }
    }

    /// True iff the whole pattern is exactly this literal, i.e. a match is
    /// reported as soon as the prefix is found (dispatcher's `Literals`
    /// engine).
    pub fn is_exact(&self, anchored_start: bool, anchored_end: bool, min_len: u32, max_len: Option<u32>) -> bool {
        match (&self.prefix, max_len) {
            (Some(p), Some(max)) => {
                !anchored_start
                    && !anchored_end
                    && p.len() as u32 == min_len
                    && p.len() as u32 == max
            }
            _ => false,
        }
    }

    pub fn prefix(&self) -> Option<&[u8]> {
        self.prefix.as_deref()
    }

    /// Finds the first occurrence of the required prefix at or after the
    /// start of `text`, returning its byte range.
    pub fn find(&self, text: &[u8]) -> Option<(usize, usize)> {
        let p = self.prefix.as_ref()?;
        if p.is_empty() {
            return Some((0, 0));
        }
        let finder = Finder::new(p);
        finder.find(text).map(|s| (s, s + p.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_prefix_occurrence() {
        let lits = Literals::new(Some(b"bar".to_vec()));
        assert_eq!(lits.find(b"foobarbaz"), Some((3, 6)));
    }

    #[test]
    fn no_prefix_finds_nothing() {
        let lits = Literals::empty();
        assert_eq!(lits.find(b"foobarbaz"), None);
    }

    #[test]
    fn exact_literal_detected() {
        let lits = Literals::new(Some(b"hello".to_vec()));
        assert!(lits.is_exact(false, false, 5, Some(5)));
        assert!(!lits.is_exact(false, false, 5, Some(6)));
        assert!(!lits.is_exact(true, false, 5, Some(5)));
    }
}
