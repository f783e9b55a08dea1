/*
** This file is a part of Ikstream (XMPP client engine for Jabber/XMPP)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use super::*;

fn check_tag_xml(tag: &Tag, expected: &str) {
    let xml = tag.xml();
    assert_eq!(xml, expected);
    // Verify that the capacity is measured correctly
    assert_eq!(xml.len(), xml.capacity());
    // Verify that the Display and xml are same
    let xml2 = format!("{}", tag);
    assert_eq!(xml2, expected);
}

#[test]
fn empty_element() {
    check_tag_xml(&Tag::new("presence"), "<presence/>");

    let mut tag = Tag::new("presence");
    tag.add_attribute("type", "unavailable");
    check_tag_xml(&tag, "<presence type='unavailable'/>");
}

#[test]
fn cdata_element() {
    let tag = Tag::with_cdata("body", "hello");
    check_tag_xml(&tag, "<body>hello</body>");

    let mut tag = Tag::new("body");
    tag.add_cdata("one");
    tag.add_cdata(" two");
    assert_eq!(tag.cdata(), "one two");
    check_tag_xml(&tag, "<body>one two</body>");

    tag.set_cdata("three");
    check_tag_xml(&tag, "<body>three</body>");
}

#[test]
fn children_render_over_cdata() {
    // An element with children renders the children only, even when
    // character data was collected at the parent level.
    let mut tag = Tag::with_cdata("message", "ignored");
    tag.add_child(Tag::with_cdata("body", "kept"));
    check_tag_xml(&tag, "<message><body>kept</body></message>");
}

#[test]
fn escaping() {
    let tag = Tag::with_cdata("t", "a & b < c");
    check_tag_xml(&tag, "<t>a &amp; b &lt; c</t>");

    let mut tag = Tag::new("t");
    tag.add_attribute("v", "it's <b>");
    check_tag_xml(&tag, "<t v='it&apos;s &lt;b&gt;'/>");
}

#[test]
fn attributes() {
    let mut tag = Tag::new("iq");
    tag.add_attribute("type", "get");
    tag.add_attribute("id", "a1");
    assert_eq!(tag.find_attribute("type"), Some("get"));
    assert_eq!(tag.find_attribute("id"), Some("a1"));
    assert_eq!(tag.find_attribute("to"), None);
    check_tag_xml(&tag, "<iq type='get' id='a1'/>");

    // Replacement keeps the original position
    tag.add_attribute("type", "set");
    check_tag_xml(&tag, "<iq type='set' id='a1'/>");

    // Empty names and values are dropped
    tag.add_attribute("", "x");
    tag.add_attribute("x", "");
    check_tag_xml(&tag, "<iq type='set' id='a1'/>");

    assert!(tag.has_attribute("type", None));
    assert!(tag.has_attribute("type", Some("set")));
    assert!(!tag.has_attribute("type", Some("get")));
    assert!(!tag.has_attribute("from", None));
}

#[test]
fn xmlns() {
    let mut query = Tag::new("query");
    assert_eq!(query.xmlns(), None);
    query.add_attribute("xmlns", "jabber:iq:roster");
    assert_eq!(query.xmlns(), Some("jabber:iq:roster"));
}

#[test]
fn children() {
    let mut iq = Tag::new("iq");
    let query = iq.add_child(Tag::new("query"));
    query.add_attribute("xmlns", "jabber:iq:version");
    query.add_child(Tag::with_cdata("name", "ikstream"));
    query.add_child(Tag::with_cdata("version", "0.2"));

    check_tag_xml(
        &iq,
        "<iq><query xmlns='jabber:iq:version'>\
         <name>ikstream</name><version>0.2</version></query></iq>",
    );

    let query = iq.find_child("query").unwrap();
    assert_eq!(query.child_cdata("name"), Some("ikstream"));
    assert_eq!(query.child_cdata("os"), None);
    assert!(query.has_child("version"));
    assert!(!query.has_child("os"));
    assert!(query.has_child_with_cdata("version", "0.2"));
    assert!(!query.has_child_with_cdata("version", "0.1"));

    assert!(iq.find_child("query").is_some());
    assert!(iq.find_child("error").is_none());
}

#[test]
fn child_searches_by_attribute() {
    let mut features = Tag::new("stream:features");
    let mechanisms = features.add_child(Tag::new("mechanisms"));
    mechanisms.add_attribute("xmlns", "urn:ietf:params:xml:ns:xmpp-sasl");
    let bind = features.add_child(Tag::new("bind"));
    bind.add_attribute("xmlns", "urn:ietf:params:xml:ns:xmpp-bind");

    let found = features
        .find_child_by("bind", "xmlns", Some("urn:ietf:params:xml:ns:xmpp-bind"))
        .unwrap();
    assert_eq!(found.name(), "bind");
    assert!(
        features
            .find_child_by("bind", "xmlns", Some("urn:ietf:params:xml:ns:xmpp-tls"))
            .is_none()
    );

    let found = features
        .find_child_with_attribute("xmlns", Some("urn:ietf:params:xml:ns:xmpp-sasl"))
        .unwrap();
    assert_eq!(found.name(), "mechanisms");
    assert!(features.has_child_by("mechanisms", "xmlns", None));
}

#[test]
fn remove_child() {
    let mut tag = Tag::new("iq");
    tag.add_child(Tag::new("query"));
    tag.add_child(Tag::new("error"));
    let removed = tag.remove_child("query").unwrap();
    assert_eq!(removed.name(), "query");
    assert!(tag.remove_child("query").is_none());
    check_tag_xml(&tag, "<iq><error/></iq>");
}

#[test]
fn deep_clone_and_equality() {
    let mut tag = Tag::new("message");
    tag.add_attribute("to", "a@b");
    tag.add_child(Tag::with_cdata("body", "hi"));

    let copy = tag.clone();
    assert_eq!(tag, copy);

    let mut other = copy.clone();
    other.find_child_mut("body").unwrap().set_cdata("bye");
    assert_ne!(tag, other);
    // The original subtree is untouched
    assert_eq!(tag.find_child("body").unwrap().cdata(), "hi");
}

#[test]
fn attribute_order_is_observable() {
    let mut a = Tag::new("t");
    a.add_attribute("x", "1");
    a.add_attribute("y", "2");
    let mut b = Tag::new("t");
    b.add_attribute("y", "2");
    b.add_attribute("x", "1");
    assert_ne!(a, b);
    assert_eq!(a.xml(), "<t x='1' y='2'/>");
    assert_eq!(b.xml(), "<t y='2' x='1'/>");
}
