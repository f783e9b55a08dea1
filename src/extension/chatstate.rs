/*
** This file is a part of Ikstream (XMPP client engine for Jabber/XMPP)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use super::ExtensionKind;
use super::StanzaExtension;
use crate::constants::XMLNS_CHAT_STATES;
use crate::tag::Tag;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChatStateKind {
    Active,
    Composing,
    Paused,
    Inactive,
    Gone,
}

impl ChatStateKind {
    fn element_name(self) -> &'static str {
        match self {
            ChatStateKind::Active => "active",
            ChatStateKind::Composing => "composing",
            ChatStateKind::Paused => "paused",
            ChatStateKind::Inactive => "inactive",
            ChatStateKind::Gone => "gone",
        }
    }

    fn from_element_name(name: &str) -> Option<ChatStateKind> {
        match name {
            "active" => Some(ChatStateKind::Active),
            "composing" => Some(ChatStateKind::Composing),
            "paused" => Some(ChatStateKind::Paused),
            "inactive" => Some(ChatStateKind::Inactive),
            "gone" => Some(ChatStateKind::Gone),
            _ => None,
        }
    }
}

/// A Chat State Notification (XEP-0085) payload of a message stanza.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ChatState {
    state: ChatStateKind,
}

impl ChatState {
    pub fn new(state: ChatStateKind) -> ChatState {
        ChatState { state }
    }

    pub fn state(&self) -> ChatStateKind {
        self.state
    }
}

impl StanzaExtension for ChatState {
    fn kind(&self) -> ExtensionKind {
        ExtensionKind::ChatState
    }

    fn filter_string(&self) -> &'static str {
        "/message/active[@xmlns='http://jabber.org/protocol/chatstates']\
         |/message/composing[@xmlns='http://jabber.org/protocol/chatstates']\
         |/message/paused[@xmlns='http://jabber.org/protocol/chatstates']\
         |/message/inactive[@xmlns='http://jabber.org/protocol/chatstates']\
         |/message/gone[@xmlns='http://jabber.org/protocol/chatstates']"
    }

    fn new_instance(&self, tag: &Tag) -> Option<Box<dyn StanzaExtension>> {
        let state = ChatStateKind::from_element_name(tag.name())?;
        Some(Box::new(ChatState::new(state)))
    }

    fn tag(&self) -> Option<Tag> {
        let mut tag = Tag::new(self.state.element_name());
        tag.add_attribute("xmlns", XMLNS_CHAT_STATES);
        Some(tag)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
