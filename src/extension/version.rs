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
use crate::constants::XMLNS_VERSION;
use crate::tag::Tag;

/// A Software Version (XEP-0092) query or reply payload.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SoftwareVersion {
    pub name: String,
    pub version: String,
    pub os: String,
}

impl SoftwareVersion {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        os: impl Into<String>,
    ) -> SoftwareVersion {
        SoftwareVersion {
            name: name.into(),
            version: version.into(),
            os: os.into(),
        }
    }

    pub fn from_tag(tag: &Tag) -> SoftwareVersion {
        SoftwareVersion {
            name: tag.child_cdata("name").unwrap_or_default().to_string(),
            version: tag.child_cdata("version").unwrap_or_default().to_string(),
            os: tag.child_cdata("os").unwrap_or_default().to_string(),
        }
    }
}

impl StanzaExtension for SoftwareVersion {
    fn kind(&self) -> ExtensionKind {
        ExtensionKind::SoftwareVersion
    }

    fn filter_string(&self) -> &'static str {
        "/iq/query[@xmlns='jabber:iq:version']"
    }

    fn new_instance(&self, tag: &Tag) -> Option<Box<dyn StanzaExtension>> {
        Some(Box::new(SoftwareVersion::from_tag(tag)))
    }

    fn tag(&self) -> Option<Tag> {
        let mut query = Tag::new("query");
        query.add_attribute("xmlns", XMLNS_VERSION);
        if !self.name.is_empty() {
            query.add_child(Tag::with_cdata("name", self.name.clone()));
        }
        if !self.version.is_empty() {
            query.add_child(Tag::with_cdata("version", self.version.clone()));
        }
        if !self.os.is_empty() {
            query.add_child(Tag::with_cdata("os", self.os.clone()));
        }
        Some(query)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
