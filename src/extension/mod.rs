/*
** This file is a part of Ikstream (XMPP client engine for Jabber/XMPP)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

mod chatstate;
mod disco;
mod error;
mod filter;
mod version;

pub use chatstate::ChatState;
pub use chatstate::ChatStateKind;
pub use disco::DiscoIdentity;
pub use disco::DiscoInfo;
pub use disco::DiscoItem;
pub use disco::DiscoItems;
pub use error::BadFilter;
pub use filter::Filter;
pub use version::SoftwareVersion;

use crate::tag::Tag;

/// Identifies the kind of a typed stanza payload.
///
/// A stanza holds at most one extension of each kind.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ExtensionKind {
    DiscoInfo,
    DiscoItems,
    SoftwareVersion,
    ChatState,
}

/// A typed XML payload carried inside a stanza.
///
/// Implementations serve double duty: a value describes itself, and a
/// registered prototype manufactures new values from matching tags.
pub trait StanzaExtension: std::fmt::Debug {
    fn kind(&self) -> ExtensionKind;

    /// The filter selecting the payload element inside a stanza.
    fn filter_string(&self) -> &'static str;

    /// Builds a new typed value from a tag matched by the filter.
    fn new_instance(&self, tag: &Tag) -> Option<Box<dyn StanzaExtension>>;

    /// Serializes the payload for insertion under the stanza root.
    fn tag(&self) -> Option<Tag>;

    /// Gives access to the concrete type behind the trait object.
    fn as_any(&self) -> &dyn std::any::Any;
}

struct Prototype {
    filter: Filter,
    proto: Box<dyn StanzaExtension>,
}

/// Holds one prototype per extension kind and decorates inbound
/// stanzas with the typed payloads their filters select.
///
/// Prototypes are exclusively owned by the registry and the values
/// they manufacture are exclusively owned by their stanza.
pub struct ExtensionRegistry {
    prototypes: Vec<Prototype>,
}

impl ExtensionRegistry {
    /// Creates an empty registry.
    pub fn new() -> ExtensionRegistry {
        ExtensionRegistry {
            prototypes: Vec::new(),
        }
    }

    /// Creates a registry with all extension kinds of this crate.
    pub fn with_defaults() -> ExtensionRegistry {
        let mut registry = ExtensionRegistry::new();
        // The filter strings of the bundled extensions are known good
        let _ = registry.register(Box::new(SoftwareVersion::default()));
        let _ = registry.register(Box::new(DiscoInfo::default()));
        let _ = registry.register(Box::new(DiscoItems::default()));
        let _ = registry.register(Box::new(ChatState::new(ChatStateKind::Active)));
        registry
    }

    /// Registers a prototype, replacing any previous one of the same
    /// kind.
    pub fn register(&mut self, proto: Box<dyn StanzaExtension>) -> Result<(), BadFilter> {
        let filter = Filter::new(proto.filter_string())?;
        let prototype = Prototype { filter, proto };
        for existing in self.prototypes.iter_mut() {
            if existing.proto.kind() == prototype.proto.kind() {
                *existing = prototype;
                return Ok(());
            }
        }
        self.prototypes.push(prototype);
        Ok(())
    }

    /// Manufactures the typed payloads matching the given stanza tag.
    pub fn extensions(&self, stanza: &Tag) -> Vec<Box<dyn StanzaExtension>> {
        let mut result = Vec::new();
        for prototype in &self.prototypes {
            if let Some(payload) = prototype.filter.find_match(stanza)
                && let Some(extension) = prototype.proto.new_instance(payload)
            {
                result.push(extension);
            }
        }
        result
    }
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        ExtensionRegistry::with_defaults()
    }
}
