/*
** This file is a part of Ikstream (XMPP client engine for Jabber/XMPP)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use super::error::BadFilter;
use super::error::description;
use crate::tag::Tag;

#[derive(Debug)]
struct FilterStep {
    stanza: String,
    child: String,
    xmlns: Option<String>,
}

enum State {
    Start,
    StanzaName,
    ChildName,
    Predicate,
    PredicateValue,
    PredicateEnd,
    AlternativeEnd,
}

const PREDICATE_PREFIX: &[u8] = b"@xmlns='";

/// A compiled extension filter expression.
///
/// The filter language is a small XPath subset: absolute two step
/// location paths with an optional namespace attribute predicate,
/// joined into a union with `|`. A name can be `*` to match any
/// element.
///
/// ```text
/// /iq/query[@xmlns='jabber:iq:version']
/// /message/active[@xmlns='...']|/message/composing[@xmlns='...']
/// ```
#[derive(Debug)]
pub struct Filter {
    steps: Vec<FilterStep>,
}

impl Filter {
    pub fn new(expression: &str) -> Result<Filter, BadFilter> {
        let bytes = expression.as_bytes();
        let mut steps: Vec<FilterStep> = Vec::new();
        let mut state = State::Start;
        let mut back: usize = 0;
        let mut pos: usize = 0;
        let mut stanza: &str = "";
        let mut child: &str = "";
        let mut predicate_match: usize = 0;

        while pos < bytes.len() {
            let c = bytes[pos];

            match state {
                State::Start => {
                    if c != b'/' {
                        return Err(BadFilter(description::MISSING_SLASH));
                    }
                    back = pos + 1;
                    state = State::StanzaName;
                }
                State::StanzaName => match c {
                    b'/' => {
                        if back == pos {
                            return Err(BadFilter(description::EMPTY_NAME));
                        }
                        stanza = &expression[back..pos];
                        back = pos + 1;
                        state = State::ChildName;
                    }
                    b'|' | b'[' => {
                        return Err(BadFilter(description::BAD_STEP_COUNT));
                    }
                    _ => (),
                },
                State::ChildName => match c {
                    b'/' => {
                        return Err(BadFilter(description::BAD_STEP_COUNT));
                    }
                    b'[' => {
                        if back == pos {
                            return Err(BadFilter(description::EMPTY_NAME));
                        }
                        child = &expression[back..pos];
                        predicate_match = 0;
                        state = State::Predicate;
                    }
                    b'|' => {
                        if back == pos {
                            return Err(BadFilter(description::EMPTY_NAME));
                        }
                        steps.push(FilterStep {
                            stanza: stanza.to_string(),
                            child: expression[back..pos].to_string(),
                            xmlns: None,
                        });
                        state = State::Start;
                    }
                    _ => (),
                },
                State::Predicate => {
                    if c != PREDICATE_PREFIX[predicate_match] {
                        return Err(BadFilter(description::BAD_PREDICATE));
                    }
                    predicate_match += 1;
                    if predicate_match == PREDICATE_PREFIX.len() {
                        back = pos + 1;
                        state = State::PredicateValue;
                    }
                }
                State::PredicateValue => {
                    if c == b'\'' {
                        steps.push(FilterStep {
                            stanza: stanza.to_string(),
                            child: child.to_string(),
                            xmlns: Some(expression[back..pos].to_string()),
                        });
                        state = State::PredicateEnd;
                    }
                }
                State::PredicateEnd => {
                    if c != b']' {
                        return Err(BadFilter(description::BAD_PREDICATE));
                    }
                    state = State::AlternativeEnd;
                }
                State::AlternativeEnd => {
                    if c != b'|' {
                        return Err(BadFilter(description::TRAILING_GARBAGE));
                    }
                    state = State::Start;
                }
            }

            pos += 1;
        }

        match state {
            State::AlternativeEnd => {}
            State::ChildName => {
                if back == pos {
                    return Err(BadFilter(description::EMPTY_NAME));
                }
                steps.push(FilterStep {
                    stanza: stanza.to_string(),
                    child: expression[back..pos].to_string(),
                    xmlns: None,
                });
            }
            State::Start | State::StanzaName => {
                return Err(BadFilter(description::BAD_STEP_COUNT));
            }
            State::Predicate | State::PredicateValue | State::PredicateEnd => {
                return Err(BadFilter(description::UNTERMINATED_PREDICATE));
            }
        }

        Ok(Filter { steps })
    }

    fn name_matches(pattern: &str, name: &str) -> bool {
        pattern == "*" || pattern == name
    }

    /// Finds the first child of the stanza selected by any alternative.
    pub fn find_match<'a>(&self, stanza: &'a Tag) -> Option<&'a Tag> {
        for step in &self.steps {
            if !Filter::name_matches(&step.stanza, stanza.name()) {
                continue;
            }
            for child in stanza.children() {
                if !Filter::name_matches(&step.child, child.name()) {
                    continue;
                }
                match &step.xmlns {
                    Some(xmlns) => {
                        if child.has_attribute("xmlns", Some(xmlns)) {
                            return Some(child);
                        }
                    }
                    None => return Some(child),
                }
            }
        }
        None
    }
}
