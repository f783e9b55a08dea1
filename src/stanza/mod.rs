/*
** This file is a part of Ikstream (XMPP client engine for Jabber/XMPP)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

mod error;

pub use error::StanzaError;
pub use error::StanzaErrorCondition;
pub use error::StanzaErrorType;

use crate::extension::ExtensionKind;
use crate::extension::ExtensionRegistry;
use crate::extension::StanzaExtension;
use crate::jid::Jid;
use crate::tag::Tag;

/// The kind of a top level stream element.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StanzaKind {
    Message,
    Presence,
    Iq,
    Unknown,
}

/// The kind specific subtype of a stanza.
///
/// An unknown or missing type attribute maps to `Undefined` instead of
/// being rejected; a message without a type is `MessageNormal` and a
/// presence without one is `PresenceAvailable`, as the protocol
/// defines.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StanzaSubType {
    IqGet,
    IqSet,
    IqResult,
    IqError,
    MessageChat,
    MessageGroupchat,
    MessageHeadline,
    MessageNormal,
    MessageError,
    PresenceAvailable,
    PresenceUnavailable,
    PresenceProbe,
    PresenceError,
    S10nSubscribe,
    S10nSubscribed,
    S10nUnsubscribe,
    S10nUnsubscribed,
    Undefined,
}

impl StanzaSubType {
    fn from_message_type(value: Option<&str>) -> StanzaSubType {
        match value {
            None | Some("normal") => StanzaSubType::MessageNormal,
            Some("chat") => StanzaSubType::MessageChat,
            Some("groupchat") => StanzaSubType::MessageGroupchat,
            Some("headline") => StanzaSubType::MessageHeadline,
            Some("error") => StanzaSubType::MessageError,
            Some(_) => StanzaSubType::Undefined,
        }
    }

    fn from_presence_type(value: Option<&str>) -> StanzaSubType {
        match value {
            None => StanzaSubType::PresenceAvailable,
            Some("unavailable") => StanzaSubType::PresenceUnavailable,
            Some("probe") => StanzaSubType::PresenceProbe,
            Some("error") => StanzaSubType::PresenceError,
            Some("subscribe") => StanzaSubType::S10nSubscribe,
            Some("subscribed") => StanzaSubType::S10nSubscribed,
            Some("unsubscribe") => StanzaSubType::S10nUnsubscribe,
            Some("unsubscribed") => StanzaSubType::S10nUnsubscribed,
            Some(_) => StanzaSubType::Undefined,
        }
    }

    fn from_iq_type(value: Option<&str>) -> StanzaSubType {
        match value {
            Some("get") => StanzaSubType::IqGet,
            Some("set") => StanzaSubType::IqSet,
            Some("result") => StanzaSubType::IqResult,
            Some("error") => StanzaSubType::IqError,
            _ => StanzaSubType::Undefined,
        }
    }

    fn type_attribute(self) -> Option<&'static str> {
        match self {
            StanzaSubType::IqGet => Some("get"),
            StanzaSubType::IqSet => Some("set"),
            StanzaSubType::IqResult => Some("result"),
            StanzaSubType::IqError => Some("error"),
            StanzaSubType::MessageChat => Some("chat"),
            StanzaSubType::MessageGroupchat => Some("groupchat"),
            StanzaSubType::MessageHeadline => Some("headline"),
            StanzaSubType::MessageError => Some("error"),
            StanzaSubType::PresenceUnavailable => Some("unavailable"),
            StanzaSubType::PresenceProbe => Some("probe"),
            StanzaSubType::PresenceError => Some("error"),
            StanzaSubType::S10nSubscribe => Some("subscribe"),
            StanzaSubType::S10nSubscribed => Some("subscribed"),
            StanzaSubType::S10nUnsubscribe => Some("unsubscribe"),
            StanzaSubType::S10nUnsubscribed => Some("unsubscribed"),
            StanzaSubType::MessageNormal
            | StanzaSubType::PresenceAvailable
            | StanzaSubType::Undefined => None,
        }
    }
}

/// A typed top level stanza.
///
/// A Stanza wraps the raw element tree and gives typed access to the
/// common attributes, the kind specific subtype, a structured error
/// and the attached extension payloads. The raw tree always carries
/// the serialized form of everything, so writing a stanza to the wire
/// is just serializing its tag.
#[derive(Debug)]
pub struct Stanza {
    tag: Tag,
    kind: StanzaKind,
    subtype: StanzaSubType,
    from: Option<Jid>,
    to: Option<Jid>,
    id: String,
    xml_lang: String,
    error: Option<StanzaError>,
    extensions: Vec<Box<dyn StanzaExtension>>,
}

impl Stanza {
    /// Builds a typed stanza from a parsed tag, attaching all matching
    /// extensions from the registry.
    pub fn from_tag(tag: Tag, registry: &ExtensionRegistry) -> Stanza {
        let kind = match tag.name() {
            "message" => StanzaKind::Message,
            "presence" => StanzaKind::Presence,
            "iq" => StanzaKind::Iq,
            _ => StanzaKind::Unknown,
        };
        let type_attribute = tag.find_attribute("type");
        let subtype = match kind {
            StanzaKind::Message => StanzaSubType::from_message_type(type_attribute),
            StanzaKind::Presence => StanzaSubType::from_presence_type(type_attribute),
            StanzaKind::Iq => StanzaSubType::from_iq_type(type_attribute),
            StanzaKind::Unknown => StanzaSubType::Undefined,
        };
        let from = tag
            .find_attribute("from")
            .and_then(|value| Jid::new(value).ok());
        let to = tag
            .find_attribute("to")
            .and_then(|value| Jid::new(value).ok());
        let id = tag.find_attribute("id").unwrap_or_default().to_string();
        let xml_lang = tag
            .find_attribute("xml:lang")
            .unwrap_or_default()
            .to_string();
        let error = tag.find_child("error").map(StanzaError::from_tag);
        let extensions = registry.extensions(&tag);

        Stanza {
            tag,
            kind,
            subtype,
            from,
            to,
            id,
            xml_lang,
            error,
            extensions,
        }
    }

    fn new(kind: StanzaKind, name: &str, subtype: StanzaSubType, to: Option<&Jid>) -> Stanza {
        let mut tag = Tag::new(name);
        if let Some(to) = to {
            tag.add_attribute("to", to.full());
        }
        if let Some(value) = subtype.type_attribute() {
            tag.add_attribute("type", value);
        }
        Stanza {
            tag,
            kind,
            subtype,
            from: None,
            to: to.cloned(),
            id: String::new(),
            xml_lang: String::new(),
            error: None,
            extensions: Vec::new(),
        }
    }

    pub fn new_iq(subtype: StanzaSubType, to: Option<&Jid>, id: &str) -> Stanza {
        let mut stanza = Stanza::new(StanzaKind::Iq, "iq", subtype, to);
        if !id.is_empty() {
            stanza.set_id(id);
        }
        stanza
    }

    pub fn new_message(to: &Jid, subtype: StanzaSubType, body: &str, subject: &str) -> Stanza {
        let mut stanza = Stanza::new(StanzaKind::Message, "message", subtype, Some(to));
        if !subject.is_empty() {
            stanza
                .tag
                .add_child(Tag::with_cdata("subject", subject));
        }
        if !body.is_empty() {
            stanza.tag.add_child(Tag::with_cdata("body", body));
        }
        stanza
    }

    pub fn new_presence(subtype: StanzaSubType, status: &str) -> Stanza {
        let mut stanza = Stanza::new(StanzaKind::Presence, "presence", subtype, None);
        if !status.is_empty() {
            stanza.tag.add_child(Tag::with_cdata("status", status));
        }
        stanza
    }

    pub fn new_subscription(to: &Jid, subtype: StanzaSubType) -> Stanza {
        Stanza::new(StanzaKind::Presence, "presence", subtype, Some(to))
    }

    pub fn kind(&self) -> StanzaKind {
        self.kind
    }

    pub fn subtype(&self) -> StanzaSubType {
        self.subtype
    }

    /// Whether this is a presence subscription management stanza.
    ///
    /// These are dispatched separately from ordinary presence.
    pub fn is_subscription(&self) -> bool {
        matches!(
            self.subtype,
            StanzaSubType::S10nSubscribe
                | StanzaSubType::S10nSubscribed
                | StanzaSubType::S10nUnsubscribe
                | StanzaSubType::S10nUnsubscribed
        )
    }

    pub fn from(&self) -> Option<&Jid> {
        self.from.as_ref()
    }

    pub fn to(&self) -> Option<&Jid> {
        self.to.as_ref()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: &str) {
        self.id = id.to_string();
        self.tag.add_attribute("id", id);
    }

    pub fn xml_lang(&self) -> &str {
        &self.xml_lang
    }

    pub fn error(&self) -> Option<&StanzaError> {
        self.error.as_ref()
    }

    /// The raw element tree of the stanza.
    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    /// Serializes the stanza into XML text.
    pub fn xml(&self) -> String {
        self.tag.xml()
    }

    pub fn extensions(&self) -> &[Box<dyn StanzaExtension>] {
        &self.extensions
    }

    pub fn extension(&self, kind: ExtensionKind) -> Option<&dyn StanzaExtension> {
        self.extensions
            .iter()
            .find(|extension| extension.kind() == kind)
            .map(|extension| extension.as_ref())
    }

    pub fn has_extension(&self, kind: ExtensionKind) -> bool {
        self.extension(kind).is_some()
    }

    /// Attaches a typed payload, replacing any payload of the same
    /// kind, and inserts its serialized form into the element tree.
    pub fn add_extension(&mut self, extension: Box<dyn StanzaExtension>) {
        if let Some(pos) = self
            .extensions
            .iter()
            .position(|existing| existing.kind() == extension.kind())
        {
            let old = self.extensions.remove(pos);
            if let Some(old_tag) = old.tag() {
                self.tag.remove_child_ns(old_tag.name(), old_tag.xmlns());
            }
        }
        if let Some(tag) = extension.tag() {
            self.tag.add_child(tag);
        }
        self.extensions.push(extension);
    }
}

impl std::fmt::Display for Stanza {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.tag, f)
    }
}
