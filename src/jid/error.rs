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
pub struct BadJid(pub(super) &'static str);

impl Display for BadJid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid JID: {}", self.0)
    }
}

impl Error for BadJid {}

pub(super) mod description {
    pub const DOMAIN_EMPTY: &str = "domain part cannot be empty";
    pub const DOMAIN_TOO_LONG: &str = "domain part cannot be longer than 1023 bytes";
    pub const LOCAL_EMPTY: &str = "local part cannot be empty";
    pub const LOCAL_TOO_LONG: &str = "local part cannot be longer than 1023 bytes";
    pub const RESOURCE_EMPTY: &str = "resource part cannot be empty";
    pub const RESOURCE_TOO_LONG: &str = "resource part cannot be longer than 1023 bytes";
}
