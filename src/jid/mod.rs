/*
** This file is a part of Ikstream (XMPP client engine for Jabber/XMPP)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::fmt::Display;

pub use error::BadJid;
use error::description;

mod error;

const MAX_PART_SIZE: usize = 1023;

// The split and normalized parts of an address. The local and domain
// parts match case insensitively in the XMPP address profiles, so they
// are folded to lowercase right here and every Jid is built from
// already normalized parts.
struct JidParts {
    local: Option<String>,
    domain: String,
    resource: Option<String>,
}

impl JidParts {
    fn parse(jid: &str) -> Result<JidParts, BadJid> {
        let (bare, resource) = match jid.split_once('/') {
            Some((bare, resource)) => (bare, Some(resource)),
            None => (jid, None),
        };
        let (local, mut domain) = match bare.split_once('@') {
            Some((local, domain)) => (Some(local), domain),
            None => (None, bare),
        };

        if domain.is_empty() {
            return Err(BadJid(description::DOMAIN_EMPTY));
        }
        if domain.len() > MAX_PART_SIZE {
            return Err(BadJid(description::DOMAIN_TOO_LONG));
        }
        if let Some(trimmed) = domain.strip_suffix('.') {
            // Remove final dot as per RFC 7622 section 3.2
            domain = trimmed;
        }
        if let Some(local) = local {
            if local.is_empty() {
                return Err(BadJid(description::LOCAL_EMPTY));
            }
            if local.len() > MAX_PART_SIZE {
                return Err(BadJid(description::LOCAL_TOO_LONG));
            }
        }
        if let Some(resource) = resource {
            if resource.is_empty() {
                return Err(BadJid(description::RESOURCE_EMPTY));
            }
            if resource.len() > MAX_PART_SIZE {
                return Err(BadJid(description::RESOURCE_TOO_LONG));
            }
        }

        Ok(JidParts {
            local: local.map(|part| part.to_lowercase()),
            domain: domain.to_lowercase(),
            resource: resource.map(String::from),
        })
    }

    fn assemble(self) -> Jid {
        let mut size = self.domain.len();
        if let Some(local) = &self.local {
            size += local.len() + 1;
        }
        if let Some(resource) = &self.resource {
            size += resource.len() + 1;
        }

        let mut full = String::with_capacity(size);
        let mut local_end = 0;
        if let Some(local) = &self.local {
            full.push_str(local);
            local_end = full.len() as u16;
            full.push('@');
        }
        full.push_str(&self.domain);
        let domain_end = full.len() as u16;
        if let Some(resource) = &self.resource {
            full.push('/');
            full.push_str(resource);
        }

        Jid {
            full,
            local_end,
            domain_end,
        }
    }
}

/// A structured XMPP address of the local@domain/resource form.
///
/// The address is stored as one normalized string: the local and
/// domain parts are folded to lowercase when it is built, following
/// the case insensitive matching of the XMPP address profiles, so two
/// addresses spelled with different case compare equal. The resource
/// part keeps its case. Part boundaries are kept as byte offsets into
/// the string, so the accessors are all slicing.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Jid {
    full: String,
    // Offset of the '@' separator, 0 when there is no local part
    local_end: u16,
    // Offset of the '/' separator, or the string end when bare
    domain_end: u16,
}

impl Jid {
    pub fn new(jid: &str) -> Result<Self, BadJid> {
        Ok(JidParts::parse(jid)?.assemble())
    }

    pub fn full(&self) -> &str {
        &self.full
    }

    pub fn bare(&self) -> &str {
        &self.full[..self.domain_end as usize]
    }

    pub fn localpart(&self) -> Option<&str> {
        if self.local_end == 0 {
            return None;
        }
        Some(&self.full[..self.local_end as usize])
    }

    pub fn domainpart(&self) -> &str {
        let start = match self.local_end {
            0 => 0,
            end => end as usize + 1,
        };
        &self.full[start..self.domain_end as usize]
    }

    pub fn resourcepart(&self) -> Option<&str> {
        if self.is_bare() {
            return None;
        }
        Some(&self.full[self.domain_end as usize + 1..])
    }

    pub fn is_bare(&self) -> bool {
        self.domain_end as usize == self.full.len()
    }

    /// Returns the address with the given resource part, replacing any
    /// current one.
    pub fn with_resource(self, resource: &str) -> Result<Jid, BadJid> {
        if resource.is_empty() {
            return Err(BadJid(description::RESOURCE_EMPTY));
        }
        if resource.len() > MAX_PART_SIZE {
            return Err(BadJid(description::RESOURCE_TOO_LONG));
        }
        let mut full = String::with_capacity(self.domain_end as usize + 1 + resource.len());
        full.push_str(self.bare());
        full.push('/');
        full.push_str(resource);
        Ok(Jid {
            full,
            local_end: self.local_end,
            domain_end: self.domain_end,
        })
    }
}

impl Display for Jid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.full)
    }
}

#[cfg(test)]
mod tests;
