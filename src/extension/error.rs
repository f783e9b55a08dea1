/*
** This file is a part of Ikstream (XMPP client engine for Jabber/XMPP)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::error::Error;
use std::fmt::Display;

#[derive(Debug, Eq, PartialEq)]
pub struct BadFilter(pub(super) &'static str);

impl Display for BadFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid extension filter: {}", self.0)
    }
}

impl Error for BadFilter {}

pub(super) mod description {
    pub const MISSING_SLASH: &str = "filter steps must start with '/'";
    pub const EMPTY_NAME: &str = "filter element names cannot be empty";
    pub const BAD_PREDICATE: &str = "only [@xmlns='...'] predicates are supported";
    pub const UNTERMINATED_PREDICATE: &str = "unterminated filter predicate";
    pub const TRAILING_GARBAGE: &str = "unexpected characters after a filter step";
    pub const BAD_STEP_COUNT: &str = "filters select children of a stanza, two steps deep";
}
