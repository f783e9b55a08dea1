/*
** This file is a part of Ikstream (XMPP client engine for Jabber/XMPP)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use crate::entities::escape_fmt;
use crate::entities::escape_into;
use crate::entities::escaped_size;

/// A single XML element attribute.
///
/// Attributes keep their insertion order, which is also the order they
/// are serialized in.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// An XML element node.
///
/// A Tag owns its attributes, character data and child elements. The
/// character data is kept in the unescaped form and escaped during
/// serialization. Children are exclusively owned by their parent, so
/// dropping a Tag drops its whole subtree.
///
/// # Examples
///
/// ```
/// use ikstream::Tag;
///
/// let mut message = Tag::new("message");
/// message.add_attribute("to", "romeo@montague.net");
/// message.add_child(Tag::with_cdata("body", "art thou not Romeo?"));
/// assert_eq!(
///     message.xml(),
///     "<message to='romeo@montague.net'><body>art thou not Romeo?</body></message>",
/// );
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Tag {
    name: String,
    attributes: Vec<Attribute>,
    cdata: String,
    children: Vec<Tag>,
}

impl Tag {
    /// Creates a free-standing element with the given name.
    pub fn new(name: impl Into<String>) -> Tag {
        Tag {
            name: name.into(),
            attributes: Vec::new(),
            cdata: String::new(),
            children: Vec::new(),
        }
    }

    /// Creates an element carrying character data.
    ///
    /// The cdata is given in the unescaped form.
    pub fn with_cdata(name: impl Into<String>, cdata: impl Into<String>) -> Tag {
        Tag {
            name: name.into(),
            attributes: Vec::new(),
            cdata: cdata.into(),
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the accumulated character data in unescaped form.
    pub fn cdata(&self) -> &str {
        &self.cdata
    }

    pub fn set_cdata(&mut self, cdata: impl Into<String>) {
        self.cdata = cdata.into();
    }

    /// Appends another run of character data.
    pub fn add_cdata(&mut self, cdata: &str) {
        self.cdata.push_str(cdata);
    }

    /// Sets an attribute, replacing the value of an existing one.
    ///
    /// Attributes with an empty name or an empty value are dropped.
    pub fn add_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if name.is_empty() || value.is_empty() {
            return;
        }
        for attribute in self.attributes.iter_mut() {
            if attribute.name == name {
                attribute.value = value;
                return;
            }
        }
        self.attributes.push(Attribute { name, value });
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn find_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name == name)
            .map(|attribute| attribute.value.as_str())
    }

    /// Checks for an attribute, optionally with a specific value.
    pub fn has_attribute(&self, name: &str, value: Option<&str>) -> bool {
        match self.find_attribute(name) {
            Some(found) => match value {
                Some(value) => found == value,
                None => true,
            },
            None => false,
        }
    }

    /// Returns the value of the xmlns attribute, if any.
    pub fn xmlns(&self) -> Option<&str> {
        self.find_attribute("xmlns")
    }

    /// Attaches a child element and returns a reference to it.
    pub fn add_child(&mut self, child: Tag) -> &mut Tag {
        self.children.push(child);
        self.children.last_mut().unwrap()
    }

    pub fn children(&self) -> &[Tag] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [Tag] {
        &mut self.children
    }

    /// Detaches and returns the first child with the given name.
    pub fn remove_child(&mut self, name: &str) -> Option<Tag> {
        let pos = self.children.iter().position(|child| child.name == name)?;
        Some(self.children.remove(pos))
    }

    /// Detaches and returns the first child with the given name and
    /// xmlns attribute.
    pub fn remove_child_ns(&mut self, name: &str, xmlns: Option<&str>) -> Option<Tag> {
        let pos = self
            .children
            .iter()
            .position(|child| child.name == name && child.xmlns() == xmlns)?;
        Some(self.children.remove(pos))
    }

    pub fn find_child(&self, name: &str) -> Option<&Tag> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn find_child_mut(&mut self, name: &str) -> Option<&mut Tag> {
        self.children.iter_mut().find(|child| child.name == name)
    }

    /// Finds the first child with the given name carrying the attribute.
    pub fn find_child_by(&self, name: &str, attribute: &str, value: Option<&str>) -> Option<&Tag> {
        self.children
            .iter()
            .find(|child| child.name == name && child.has_attribute(attribute, value))
    }

    /// Finds the first child carrying the attribute, regardless of name.
    pub fn find_child_with_attribute(&self, attribute: &str, value: Option<&str>) -> Option<&Tag> {
        self.children
            .iter()
            .find(|child| child.has_attribute(attribute, value))
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.find_child(name).is_some()
    }

    pub fn has_child_by(&self, name: &str, attribute: &str, value: Option<&str>) -> bool {
        self.find_child_by(name, attribute, value).is_some()
    }

    pub fn has_child_with_cdata(&self, name: &str, cdata: &str) -> bool {
        self.children
            .iter()
            .any(|child| child.name == name && child.cdata == cdata)
    }

    /// Returns the cdata of the named child, if present.
    pub fn child_cdata(&self, name: &str) -> Option<&str> {
        self.find_child(name).map(|child| child.cdata())
    }

    fn xml_size(&self) -> usize {
        let mut size = 1 + self.name.len();
        for attribute in &self.attributes {
            // space, name, ='...'
            size += 1 + attribute.name.len() + 2 + escaped_size(&attribute.value) + 1;
        }
        if self.cdata.is_empty() && self.children.is_empty() {
            size += 2;
        } else if !self.children.is_empty() {
            size += 1;
            for child in &self.children {
                size += child.xml_size();
            }
            size += 2 + self.name.len() + 1;
        } else {
            size += 1 + escaped_size(&self.cdata) + 2 + self.name.len() + 1;
        }

        size
    }

    fn xml_into(&self, buf: &mut String) {
        buf.push('<');
        buf.push_str(&self.name);
        for attribute in &self.attributes {
            buf.push(' ');
            buf.push_str(&attribute.name);
            buf.push_str("='");
            escape_into(&attribute.value, buf);
            buf.push('\'');
        }
        if self.cdata.is_empty() && self.children.is_empty() {
            buf.push_str("/>");
        } else if !self.children.is_empty() {
            // Mixed content is not part of the stanza model: an element
            // with children renders the children only.
            buf.push('>');
            for child in &self.children {
                child.xml_into(buf);
            }
            buf.push_str("</");
            buf.push_str(&self.name);
            buf.push('>');
        } else {
            buf.push('>');
            escape_into(&self.cdata, buf);
            buf.push_str("</");
            buf.push_str(&self.name);
            buf.push('>');
        }
    }

    /// Serializes the element and its subtree into XML text.
    pub fn xml(&self) -> String {
        let mut buf = String::with_capacity(self.xml_size());
        self.xml_into(&mut buf);

        buf
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<")?;
        f.write_str(&self.name)?;
        for attribute in &self.attributes {
            f.write_str(" ")?;
            f.write_str(&attribute.name)?;
            f.write_str("='")?;
            escape_fmt(&attribute.value, f)?;
            f.write_str("'")?;
        }
        if self.cdata.is_empty() && self.children.is_empty() {
            f.write_str("/>")?;
        } else if !self.children.is_empty() {
            f.write_str(">")?;
            for child in &self.children {
                std::fmt::Display::fmt(child, f)?;
            }
            f.write_str("</")?;
            f.write_str(&self.name)?;
            f.write_str(">")?;
        } else {
            f.write_str(">")?;
            escape_fmt(&self.cdata, f)?;
            f.write_str("</")?;
            f.write_str(&self.name)?;
            f.write_str(">")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
