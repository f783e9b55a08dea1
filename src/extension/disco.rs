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
use crate::constants::XMLNS_DISCO_INFO;
use crate::constants::XMLNS_DISCO_ITEMS;
use crate::tag::Tag;

/// One identity advertised in a Service Discovery info result.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DiscoIdentity {
    pub category: String,
    pub kind: String,
    pub name: String,
}

impl DiscoIdentity {
    pub fn new(
        category: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
    ) -> DiscoIdentity {
        DiscoIdentity {
            category: category.into(),
            kind: kind.into(),
            name: name.into(),
        }
    }

    fn from_tag(tag: &Tag) -> DiscoIdentity {
        DiscoIdentity {
            category: tag.find_attribute("category").unwrap_or_default().to_string(),
            kind: tag.find_attribute("type").unwrap_or_default().to_string(),
            name: tag.find_attribute("name").unwrap_or_default().to_string(),
        }
    }

    fn tag(&self) -> Option<Tag> {
        if self.category.is_empty() || self.kind.is_empty() {
            return None;
        }
        let mut identity = Tag::new("identity");
        identity.add_attribute("category", self.category.clone());
        identity.add_attribute("type", self.kind.clone());
        if !self.name.is_empty() {
            identity.add_attribute("name", self.name.clone());
        }
        Some(identity)
    }
}

/// A Service Discovery (XEP-0030) info query payload.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DiscoInfo {
    pub node: String,
    pub identities: Vec<DiscoIdentity>,
    pub features: Vec<String>,
}

impl DiscoInfo {
    /// Creates an info payload advertising the disco features
    /// themselves.
    pub fn new(node: impl Into<String>) -> DiscoInfo {
        DiscoInfo {
            node: node.into(),
            identities: Vec::new(),
            features: vec![
                XMLNS_DISCO_INFO.to_string(),
                XMLNS_DISCO_ITEMS.to_string(),
            ],
        }
    }

    pub fn from_tag(tag: &Tag) -> DiscoInfo {
        let mut info = DiscoInfo {
            node: tag.find_attribute("node").unwrap_or_default().to_string(),
            identities: Vec::new(),
            features: Vec::new(),
        };
        for child in tag.children() {
            match child.name() {
                "identity" => info.identities.push(DiscoIdentity::from_tag(child)),
                "feature" => {
                    if let Some(var) = child.find_attribute("var") {
                        info.features.push(var.to_string());
                    }
                }
                _ => (),
            }
        }
        info
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|var| var == feature)
    }
}

impl Default for DiscoInfo {
    fn default() -> Self {
        DiscoInfo::new("")
    }
}

impl StanzaExtension for DiscoInfo {
    fn kind(&self) -> ExtensionKind {
        ExtensionKind::DiscoInfo
    }

    fn filter_string(&self) -> &'static str {
        "/iq/query[@xmlns='http://jabber.org/protocol/disco#info']"
    }

    fn new_instance(&self, tag: &Tag) -> Option<Box<dyn StanzaExtension>> {
        Some(Box::new(DiscoInfo::from_tag(tag)))
    }

    fn tag(&self) -> Option<Tag> {
        let mut query = Tag::new("query");
        query.add_attribute("xmlns", XMLNS_DISCO_INFO);
        if !self.node.is_empty() {
            query.add_attribute("node", self.node.clone());
        }
        for identity in &self.identities {
            if let Some(tag) = identity.tag() {
                query.add_child(tag);
            }
        }
        for feature in &self.features {
            let child = query.add_child(Tag::new("feature"));
            child.add_attribute("var", feature.clone());
        }
        Some(query)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// One item of a Service Discovery items result.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DiscoItem {
    pub jid: String,
    pub node: String,
    pub name: String,
}

impl DiscoItem {
    fn from_tag(tag: &Tag) -> DiscoItem {
        DiscoItem {
            jid: tag.find_attribute("jid").unwrap_or_default().to_string(),
            node: tag.find_attribute("node").unwrap_or_default().to_string(),
            name: tag.find_attribute("name").unwrap_or_default().to_string(),
        }
    }

    fn tag(&self) -> Option<Tag> {
        if self.jid.is_empty() {
            return None;
        }
        let mut item = Tag::new("item");
        item.add_attribute("jid", self.jid.clone());
        if !self.node.is_empty() {
            item.add_attribute("node", self.node.clone());
        }
        if !self.name.is_empty() {
            item.add_attribute("name", self.name.clone());
        }
        Some(item)
    }
}

/// A Service Discovery (XEP-0030) items query payload.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DiscoItems {
    pub node: String,
    pub items: Vec<DiscoItem>,
}

impl DiscoItems {
    pub fn new(node: impl Into<String>) -> DiscoItems {
        DiscoItems {
            node: node.into(),
            items: Vec::new(),
        }
    }

    pub fn from_tag(tag: &Tag) -> DiscoItems {
        DiscoItems {
            node: tag.find_attribute("node").unwrap_or_default().to_string(),
            items: tag
                .children()
                .iter()
                .filter(|child| child.name() == "item")
                .map(DiscoItem::from_tag)
                .collect(),
        }
    }
}

impl StanzaExtension for DiscoItems {
    fn kind(&self) -> ExtensionKind {
        ExtensionKind::DiscoItems
    }

    fn filter_string(&self) -> &'static str {
        "/iq/query[@xmlns='http://jabber.org/protocol/disco#items']"
    }

    fn new_instance(&self, tag: &Tag) -> Option<Box<dyn StanzaExtension>> {
        Some(Box::new(DiscoItems::from_tag(tag)))
    }

    fn tag(&self) -> Option<Tag> {
        let mut query = Tag::new("query");
        query.add_attribute("xmlns", XMLNS_DISCO_ITEMS);
        if !self.node.is_empty() {
            query.add_attribute("node", self.node.clone());
        }
        for item in &self.items {
            if let Some(tag) = item.tag() {
                query.add_child(tag);
            }
        }
        Some(query)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
