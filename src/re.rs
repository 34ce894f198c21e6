// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The public surface: `Regex`, `RegexBuilder`, match/capture results and
//! the iterators and template-replacement helpers built on top of
//! `Program::exec`.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use ast::Flags;
use error::Error;
use program::{MatchEngine, Program};

/// A compiled pattern, immutable once built and safe to share across
/// threads (`Program` never mutates after construction; any per-call
/// scratch lives in thread-safe pools owned by `Program`).
#[derive(Clone)]
pub struct Regex {
    prog: Arc<Program>,
}

impl fmt::Debug for Regex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Regex").field(&self.prog.original).finish()
    }
}

impl fmt::Display for Regex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.prog.original)
    }
}

impl Regex {
    /// Compiles `pattern` with default flags.
    pub fn new(pattern: &str) -> Result<Regex, Error> {
        RegexBuilder::new(pattern).build()
    }

    /// The pattern text this `Regex` was compiled from.
    pub fn as_str(&self) -> &str {
        &self.prog.original
    }

    /// Byte-offset ranges of every named capturing group, in declaration
    /// order; `None` for an unnamed group (including group 0).
    pub fn capture_names(&self) -> &[Option<String>] {
        &self.prog.cap_names
    }

    /// The index of the capturing group named `name`, if any.
    pub fn capture_index_for_name(&self, name: &str) -> Option<usize> {
        self.prog.cap_names.iter().position(|n| n.as_deref() == Some(name))
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.is_match_at(text.as_bytes(), 0)
    }

    pub fn is_match_at(&self, text: &[u8], start: usize) -> bool {
        let mut caps = vec![None; 2];
        self.prog.exec(&mut caps, text, start).unwrap_or(false)
    }

    /// The first non-overlapping match, scanning from the start of `text`.
    pub fn find<'t>(&self, text: &'t str) -> Option<Match<'t>> {
        self.find_at(text, 0)
    }

    pub fn find_at<'t>(&self, text: &'t str, start: usize) -> Option<Match<'t>> {
        let mut caps = vec![None; 2];
        match self.prog.exec(&mut caps, text.as_bytes(), start) {
            Ok(true) => Some(Match { text: text, start: caps[0].unwrap(), end: caps[1].unwrap() }),
            _ => None,
        }
    }

    /// A lazy, stateful iterator over every non-overlapping match.
    pub fn find_iter<'r, 't>(&'r self, text: &'t str) -> Matches<'r, 't> {
        Matches { re: self, text: text, last_end: 0, last_match: None }
    }

    /// The first non-overlapping match's captures.
    pub fn captures<'t>(&self, text: &'t str) -> Option<Captures<'t>> {
        let mut locs = self.prog.alloc_captures();
        match self.prog.exec(&mut locs, text.as_bytes(), 0) {
            Ok(true) => Some(Captures { text: text, locs: locs, named: self.prog.cap_names.clone() }),
            _ => None,
        }
    }

    pub fn captures_iter<'r, 't>(&'r self, text: &'t str) -> CaptureMatches<'r, 't> {
        CaptureMatches { re: self, text: text, last_end: 0, last_match: None }
    }

    /// Replaces the first match with `rep`'s expansion of the template.
    pub fn replace<'t>(&self, text: &'t str, rep: &str) -> Cow<'t, str> {
        self.replacen(text, 1, rep)
    }

    /// Replaces every non-overlapping match with `rep`'s expansion.
    pub fn replace_all<'t>(&self, text: &'t str, rep: &str) -> Cow<'t, str> {
        self.replacen(text, 0, rep)
    }

    /// Replaces the first `limit` matches (0 means unbounded) with `rep`'s
    /// expansion of the template. `$0`/`$name`/`$k` reference the whole
    /// match or a capture group; `$$` is a literal `$`; an unresolved `$k`
    /// is passed through verbatim.
    pub fn replacen<'t>(&self, text: &'t str, limit: usize, rep: &str) -> Cow<'t, str> {
        let mut it = self.captures_iter(text).enumerate().peekable();
        if it.peek().is_none() {
            return Cow::Borrowed(text);
        }
        let mut new = String::with_capacity(text.len());
        let mut last_end = 0;
        for (i, caps) in it {
            if limit > 0 && i >= limit {
                break;
            }
            let m = caps.get(0).unwrap();
            new.push_str(&text[last_end..m.start]);
            expand_template(&caps, rep, &mut new);
            last_end = m.end;
        }
        new.push_str(&text[last_end..]);
        Cow::Owned(new)
    }

    /// Splits `text` at each non-overlapping match. A string with no match
    /// yields the whole input as the only element.
    pub fn split<'r, 't>(&'r self, text: &'t str) -> Split<'r, 't> {
        Split { finder: self.find_iter(text), last_end: 0 }
    }
}

fn expand_template(caps: &Captures, template: &str, dst: &mut String) {
    let bytes = template.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'$' {
            let start = i;
            while i < bytes.len() && bytes[i] != b'$' {
                i += 1;
            }
            dst.push_str(&template[start..i]);
            continue;
        }
        if i + 1 >= bytes.len() {
            dst.push('$');
            break;
        }
        match bytes[i + 1] {
            b'$' => {
                dst.push('$');
                i += 2;
            }
            b'0'..=b'9' => {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && bytes[end].is_ascii_digit() {
                    end += 1;
                }
                let idx: usize = template[start..end].parse().unwrap();
                match caps.get(idx) {
                    Some(m) => dst.push_str(m.as_str()),
                    None => dst.push_str(&template[i..end]),
                }
                i = end;
            }
            b'{' => {
                if let Some(close) = template[i + 2..].find('}') {
                    let name = &template[i + 2..i + 2 + close];
                    match caps.name(name) {
                        Some(m) => dst.push_str(m.as_str()),
                        None => dst.push_str(&template[i..i + 3 + close]),
                    }
                    i = i + 3 + close;
                } else {
                    dst.push('$');
                    i += 1;
                }
            }
            c if c == b'_' || (c as char).is_alphabetic() => {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && (bytes[end] == b'_' || (bytes[end] as char).is_alphanumeric()) {
                    end += 1;
                }
                let name = &template[start..end];
                match caps.name(name) {
                    Some(m) => dst.push_str(m.as_str()),
                    None => dst.push_str(&template[i..end]),
                }
                i = end;
            }
            _ => {
                dst.push('$');
                i += 1;
            }
        }
    }
}

/// A single match: the byte range and borrowed text it spans.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Match<'t> {
    text: &'t str,
    start: usize,
    end: usize,
}

impl<'t> Match<'t> {
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn as_str(&self) -> &'t str {
        &self.text[self.start..self.end]
    }
}

/// The capture groups of one match: group 0 is the whole match.
#[derive(Debug)]
pub struct Captures<'t> {
    text: &'t str,
    locs: Vec<Option<usize>>,
    named: Vec<Option<String>>,
}

impl<'t> Captures<'t> {
    pub fn get(&self, i: usize) -> Option<Match<'t>> {
        let s = *self.locs.get(i * 2)?;
        let e = *self.locs.get(i * 2 + 1)?;
        Some(Match { text: self.text, start: s?, end: e? })
    }

    pub fn name(&self, name: &str) -> Option<Match<'t>> {
        let idx = self.named.iter().position(|n| n.as_deref() == Some(name))?;
        self.get(idx)
    }

    pub fn len(&self) -> usize {
        self.locs.len() / 2
    }
}

/// A lazy iterator over every non-overlapping match in a `&str`, advancing
/// past a zero-width match by one byte to guarantee termination.
pub struct Matches<'r, 't> {
    re: &'r Regex,
    text: &'t str,
    last_end: usize,
    last_match: Option<usize>,
}

impl<'r, 't> Iterator for Matches<'r, 't> {
    type Item = Match<'t>;

    fn next(&mut self) -> Option<Match<'t>> {
        if self.last_end > self.text.len() {
            return None;
        }
        let m = self.re.find_at(self.text, self.last_end)?;
        if m.start == m.end {
            self.last_end = m.end + 1;
            if Some(m.end) == self.last_match {
                return self.next();
            }
        } else {
            self.last_end = m.end;
        }
        self.last_match = Some(m.end);
        Some(m)
    }
}

/// Like `Matches`, but yielding full `Captures` per match.
pub struct CaptureMatches<'r, 't> {
    re: &'r Regex,
    text: &'t str,
    last_end: usize,
    last_match: Option<usize>,
}

impl<'r, 't> Iterator for CaptureMatches<'r, 't> {
    type Item = Captures<'t>;

    fn next(&mut self) -> Option<Captures<'t>> {
        if self.last_end > self.text.len() {
            return None;
        }
        let mut locs = self.re.prog.alloc_captures();
        let matched = self.re.prog.exec(&mut locs, self.text.as_bytes(), self.last_end).unwrap_or(false);
        if !matched {
            return None;
        }
        let start = locs[0].unwrap();
        let end = locs[1].unwrap();
        if start == end {
            self.last_end = end + 1;
            if Some(end) == self.last_match {
                return self.next();
            }
        } else {
            self.last_end = end;
        }
        self.last_match = Some(end);
        Some(Captures { text: self.text, locs: locs, named: self.re.prog.cap_names.clone() })
    }
}

/// Splits text at each match of a pattern.
pub struct Split<'r, 't> {
    finder: Matches<'r, 't>,
    last_end: usize,
}

impl<'r, 't> Iterator for Split<'r, 't> {
    type Item = &'t str;

    fn next(&mut self) -> Option<&'t str> {
        let text = self.finder.text;
        match self.finder.next() {
            Some(m) => {
                let piece = &text[self.last_end..m.start];
                self.last_end = m.end;
                Some(piece)
            }
            None => {
                if self.last_end > text.len() {
                    None
                } else {
                    let piece = &text[self.last_end..];
                    self.last_end = text.len() + 1;
                    Some(piece)
                }
            }
        }
    }
}

/// Builds a `Regex` with non-default flags, a compile-time size limit and
/// (for testing) a forced engine choice.
pub struct RegexBuilder {
    pattern: String,
    flags: Flags,
    size_limit: usize,
    engine: Option<MatchEngine>,
}

const DEFAULT_SIZE_LIMIT: usize = 10 * (1 << 20);

impl RegexBuilder {
    pub fn new(pattern: &str) -> RegexBuilder {
        RegexBuilder {
            pattern: pattern.to_owned(),
            flags: Flags::default(),
            size_limit: DEFAULT_SIZE_LIMIT,
            engine: None,
        }
    }

    pub fn case_insensitive(mut self, yes: bool) -> RegexBuilder {
        self.flags.case_insensitive = yes;
        self
    }

    pub fn multi_line(mut self, yes: bool) -> RegexBuilder {
        self.flags.multi_line = yes;
        self
    }

    pub fn dot_matches_new_line(mut self, yes: bool) -> RegexBuilder {
        self.flags.dot_matches_new_line = yes;
        self
    }

    pub fn size_limit(mut self, bytes: usize) -> RegexBuilder {
        self.size_limit = bytes;
        self
    }

    /// Forces a specific matching engine instead of the dispatcher's own
    /// choice. Exposed so the test suite can run a scenario through both
    /// engines and check they agree.
    pub fn engine(mut self, engine: MatchEngine) -> RegexBuilder {
        self.engine = Some(engine);
        self
    }

    pub fn build(self) -> Result<Regex, Error> {
        let prog = Program::new(&self.pattern, self.flags, self.engine, self.size_limit)?;
        Ok(Regex { prog: Arc::new(prog) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_match_basic() {
        let re = Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap();
        assert!(re.is_match("Today is 2024-03-15!"));
        assert!(!re.is_match("no date here"));
    }

    #[test]
    fn find_reports_byte_range() {
        let re = Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap();
        let m = re.find("Today is 2024-03-15!").unwrap();
        assert_eq!(m.as_str(), "2024-03-15");
    }

    #[test]
    fn named_captures() {
        let re = Regex::new(r"(?P<user>\w+)@(?P<host>\w+)").unwrap();
        let caps = re.captures("email: a@b ok").unwrap();
        assert_eq!(caps.name("user").unwrap().as_str(), "a");
        assert_eq!(caps.name("host").unwrap().as_str(), "b");
    }

    #[test]
    fn find_iter_is_non_overlapping_and_terminates_on_empty_match() {
        let re = Regex::new(r"a*").unwrap();
        let matches: Vec<_> = re.find_iter("baab").map(|m| m.as_str().to_owned()).collect();
        assert_eq!(matches, vec!["", "aa", "", ""]);
    }

    #[test]
    fn replace_all_numeric_and_named_templates() {
        let re = Regex::new(r"(?P<y>\d{4})-(?P<m>\d{2})-(?P<d>\d{2})").unwrap();
        assert_eq!(re.replace_all("2024-03-15", "$d/$m/$y"), "15/03/2024");
        assert_eq!(re.replace_all("2024-03-15", "${y}/${m}/${d}"), "2024/03/15");
    }

    #[test]
    fn replace_all_with_dollar0_is_identity() {
        let re = Regex::new(r"\w+").unwrap();
        let text = "hello world";
        assert_eq!(re.replace_all(text, "$0"), text);
    }

    #[test]
    fn split_preserves_empty_leading_and_trailing_pieces() {
        let re = Regex::new(r",").unwrap();
        let pieces: Vec<_> = re.split(",a,b,").collect();
        assert_eq!(pieces, vec!["", "a", "b", ""]);
    }

    #[test]
    fn split_with_no_match_yields_whole_input() {
        let re = Regex::new(r",").unwrap();
        let pieces: Vec<_> = re.split("abc").collect();
        assert_eq!(pieces, vec!["abc"]);
    }

    #[test]
    fn case_insensitive_backreference() {
        let re = RegexBuilder::new(r"(\w+) \1").case_insensitive(true).build().unwrap();
        assert!(re.is_match("Hello HELLO"));
    }
}
