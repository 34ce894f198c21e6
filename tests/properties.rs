// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Universal invariants and round-trip laws, checked against a handful of
//! patterns and randomized inputs rather than a fixed example table.

use rand::Rng;
use rex::Regex;

const ALPHABET: &[u8] = b"ab012 -";

fn random_text(rng: &mut impl Rng, max_len: usize) -> String {
    let len = rng.gen_range(0..=max_len);
    (0..len).map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char).collect()
}

fn sample_patterns() -> Vec<&'static str> {
    vec![
        r"a+",
        r"\d+",
        r"a*b",
        r"(a)(b)?",
        r"\w+-\w+",
        r"^a",
        r"a$",
        r"(a|b)+",
    ]
}

#[test]
fn is_match_agrees_with_find_being_present() {
    let mut rng = rand::thread_rng();
    for pattern in sample_patterns() {
        let re = Regex::new(pattern).unwrap();
        for _ in 0..200 {
            let text = random_text(&mut rng, 12);
            assert_eq!(re.is_match(&text), re.find(&text).is_some(), "pattern {:?} text {:?}", pattern, text);
        }
    }
}

#[test]
fn captures_are_substrings_of_the_whole_match() {
    let mut rng = rand::thread_rng();
    for pattern in sample_patterns() {
        let re = Regex::new(pattern).unwrap();
        for _ in 0..200 {
            let text = random_text(&mut rng, 12);
            if let Some(caps) = re.captures(&text) {
                let whole = caps.get(0).unwrap();
                for i in 1..caps.len() {
                    if let Some(g) = caps.get(i) {
                        assert!(g.start() >= whole.start() && g.end() <= whole.end());
                        assert!(text[g.start()..g.end()] == *g.as_str());
                    }
                }
            }
        }
    }
}

#[test]
fn replace_all_with_dollar0_is_identity() {
    let mut rng = rand::thread_rng();
    for pattern in sample_patterns() {
        let re = Regex::new(pattern).unwrap();
        for _ in 0..200 {
            let text = random_text(&mut rng, 12);
            assert_eq!(re.replace_all(&text, "$0"), text);
        }
    }
}

#[test]
fn split_joined_by_a_matching_separator_reconstructs_single_match_input() {
    let re = Regex::new(r"-").unwrap();
    let text = "left-right";
    let pieces: Vec<_> = re.split(text).collect();
    assert_eq!(pieces.len(), 2);
    assert_eq!(pieces.join("-"), text);
}

#[test]
fn replace_all_is_idempotent_when_replacement_does_not_match_the_pattern() {
    let re = Regex::new(r"\d+").unwrap();
    let text = "a1 b22 c333";
    let repl = "#";
    let once = re.replace_all(text, repl);
    let twice = re.replace_all(&once, repl);
    assert_eq!(once, twice);
}

#[test]
fn find_all_is_non_overlapping_and_ascending() {
    let mut rng = rand::thread_rng();
    for pattern in sample_patterns() {
        let re = Regex::new(pattern).unwrap();
        for _ in 0..200 {
            let text = random_text(&mut rng, 16);
            let mut last_end = 0;
            for m in re.find_iter(&text) {
                assert!(m.start() >= last_end);
                assert!(m.end() >= m.start());
                last_end = m.end();
            }
        }
    }
}

#[test]
fn anchored_pattern_never_matches_past_position_zero() {
    let re = Regex::new(r"^a").unwrap();
    assert!(re.find_at("xa", 1).is_none());
}
