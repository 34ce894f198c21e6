// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use rex::{Regex, RegexBuilder};

#[test]
fn phone_number_slice_and_offsets() {
    let re = Regex::new(r"\d{3}-\d{4}").unwrap();
    let m = re.find("Call me at 555-1234").unwrap();
    assert_eq!(m.as_str(), "555-1234");
    assert_eq!(m.start(), 11);
    assert_eq!(m.end(), 19);
}

#[test]
fn date_with_numbered_captures() {
    let re = Regex::new(r"(\d{4})-(\d{2})-(\d{2})").unwrap();
    let caps = re.captures("Today is 2024-03-15!").unwrap();
    assert_eq!(caps.get(0).unwrap().as_str(), "2024-03-15");
    assert_eq!(caps.get(1).unwrap().as_str(), "2024");
    assert_eq!(caps.get(2).unwrap().as_str(), "03");
    assert_eq!(caps.get(3).unwrap().as_str(), "15");
}

#[test]
fn email_with_named_captures() {
    let re = Regex::new(r"(?P<user>\w+)@(?P<host>\w+)").unwrap();
    let caps = re.captures("email: a@b ok").unwrap();
    assert_eq!(caps.name("user").unwrap().as_str(), "a");
    assert_eq!(caps.name("host").unwrap().as_str(), "b");
}

#[test]
fn greedy_word_class_consumes_whole_run() {
    let re = Regex::new(r"\w+").unwrap();
    let all: Vec<_> = re.find_iter("a1b23c456").map(|m| m.as_str().to_owned()).collect();
    assert_eq!(all, vec!["a1b23c456"]);
}

#[test]
fn digit_class_splits_on_alphabetic_gaps() {
    let re = Regex::new(r"\d+").unwrap();
    let all: Vec<_> = re.find_iter("a1b23c456").map(|m| m.as_str().to_owned()).collect();
    assert_eq!(all, vec!["1", "23", "456"]);
}

#[test]
fn nested_quantifier_is_a_structure_error() {
    assert!(Regex::new(r"(a+)+b").is_err());
}

#[test]
fn lookahead_does_not_consume() {
    let re = Regex::new(r"foo(?=bar)").unwrap();
    let m = re.find("foobar").unwrap();
    assert_eq!(m.as_str(), "foo");
    assert_eq!(m.end(), 3);
}

#[test]
fn backreference_matches_repeated_word() {
    let re = Regex::new(r"(\w+) \1").unwrap();
    assert!(re.is_match("hello hello"));
}

#[test]
fn case_insensitive_backreference_matches_repeated_word() {
    let re = RegexBuilder::new(r"(\w+) \1").case_insensitive(true).build().unwrap();
    assert!(re.is_match("Hello HELLO"));
}

#[test]
fn multiline_caret_matches_after_newline() {
    let re = RegexBuilder::new(r"^line").multi_line(true).build().unwrap();
    let m = re.find("first\nline2").unwrap();
    assert_eq!(m.as_str(), "line");
    assert_eq!(m.start(), 6);
}

#[test]
fn anchored_pattern_without_a_match_at_zero_fails_fast() {
    let re = Regex::new(r"^abc").unwrap();
    assert!(!re.is_match("xabc"));
}

#[test]
fn empty_input_matches_pure_anchors() {
    let start = Regex::new(r"^").unwrap();
    let end = Regex::new(r"$").unwrap();
    assert!(start.is_match(""));
    assert!(end.is_match(""));
}

#[test]
fn zero_width_star_terminates_find_all_on_empty_input() {
    let re = Regex::new(r"a*").unwrap();
    let all: Vec<_> = re.find_iter("").collect();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].as_str(), "");
}

#[test]
fn positive_and_negative_lookahead_scenarios_agree_across_engines() {
    for engine in [None, Some(rex::MatchEngine::Backtrack)] {
        let mut builder = RegexBuilder::new(r"foo(?!bar)");
        if let Some(e) = engine {
            builder = builder.engine(e);
        }
        let re = builder.build().unwrap();
        assert!(!re.is_match("foobar"));
        assert!(re.is_match("foobaz"));
    }
}

#[test]
fn replace_all_expands_named_template() {
    let re = Regex::new(r"(?P<y>\d{4})-(?P<m>\d{2})-(?P<d>\d{2})").unwrap();
    assert_eq!(re.replace_all("2024-03-15", "${d}/${m}/${y}"), "15/03/2024");
}

#[test]
fn split_on_comma_preserves_empty_pieces() {
    let re = Regex::new(r",").unwrap();
    let pieces: Vec<_> = re.split(",a,b,").collect();
    assert_eq!(pieces, vec!["", "a", "b", ""]);
}

#[test]
fn atomic_group_rejects_backtracking_into_its_body() {
    let re = Regex::new(r"(?>a+)a").unwrap();
    assert!(!re.is_match("aaa"));
}

#[test]
fn lookbehind_requires_preceding_text() {
    let re = Regex::new(r"(?<=foo)bar").unwrap();
    assert!(re.is_match("foobar"));
    assert!(!re.is_match("bazbar"));
}

#[test]
fn posix_class_names_are_recognized() {
    let re = Regex::new(r"[[:digit:]]+").unwrap();
    assert_eq!(re.find("ab123cd").unwrap().as_str(), "123");
}
