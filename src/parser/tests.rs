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

#[derive(Debug, Eq, PartialEq)]
enum Event {
    StreamOpen(Tag),
    Stanza(Tag),
    StreamClose,
}

#[derive(Default)]
struct Collector {
    events: Vec<Event>,
}

impl StreamHandler for Collector {
    fn handle_stream_open(&mut self, tag: Tag) {
        self.events.push(Event::StreamOpen(tag));
    }

    fn handle_tag(&mut self, tag: Tag) {
        self.events.push(Event::Stanza(tag));
    }

    fn handle_stream_close(&mut self) {
        self.events.push(Event::StreamClose);
    }
}

struct Tester {
    expected: Vec<Event>,
}

impl Tester {
    fn new(expected: Vec<Event>) -> Tester {
        Tester { expected }
    }

    fn check(&self, s: &str) {
        let mut parser = Parser::new();
        let mut collector = Collector::default();
        assert_eq!(parser.feed(&mut collector, s.as_bytes()), Ok(()));
        assert_eq!(collector.events, self.expected);
        assert_eq!(parser.location().bytes, s.len());

        // now try byte by byte: split boundaries must not matter
        parser.reset();
        let mut collector = Collector::default();
        for i in 0..s.len() {
            assert_eq!(parser.feed(&mut collector, &s.as_bytes()[i..i + 1]), Ok(()));
        }
        assert_eq!(collector.events, self.expected);
        assert_eq!(parser.location().bytes, s.len());
    }
}

struct BadTester {
    violation: &'static str,
    bad_byte: usize,
}

impl BadTester {
    fn new(violation: &'static str, bad_byte: usize) -> BadTester {
        BadTester {
            violation,
            bad_byte,
        }
    }

    fn check(&self, s: &str) {
        self.check_bytes(s.as_bytes());
    }

    fn check_bytes(&self, bytes: &[u8]) {
        let mut parser = Parser::new();
        let mut collector = Collector::default();
        assert_eq!(
            parser.feed(&mut collector, bytes),
            Err(ParseError::BadXml(self.violation, self.bad_byte))
        );
        assert_eq!(parser.location().bytes, self.bad_byte);
    }
}

fn stream_tag() -> Tag {
    let mut tag = Tag::new("stream:stream");
    tag.add_attribute("xmlns", "jabber:client");
    tag.add_attribute("version", "1.0");
    tag
}

#[test]
fn single_stanza() {
    Tester::new(vec![Event::Stanza(Tag::new("presence"))]).check("<presence/>");
    Tester::new(vec![Event::Stanza(Tag::new("presence"))]).check("  <presence/>  ");
    Tester::new(vec![Event::Stanza(Tag::new("presence"))]).check("<presence></presence>");
}

#[test]
fn stanza_with_attributes() {
    let mut iq = Tag::new("iq");
    iq.add_attribute("type", "get");
    iq.add_attribute("id", "a1");
    Tester::new(vec![Event::Stanza(iq.clone())]).check("<iq type='get' id='a1'/>");
    Tester::new(vec![Event::Stanza(iq.clone())]).check("<iq type=\"get\" id=\"a1\"/>");
    Tester::new(vec![Event::Stanza(iq)]).check("<iq  type = 'get'  id = 'a1' />");
}

#[test]
fn quotes_inside_values() {
    let mut tag = Tag::new("t");
    tag.add_attribute("a", "it's");
    tag.add_attribute("b", "say \"hi\"");
    Tester::new(vec![Event::Stanza(tag)]).check("<t a=\"it's\" b='say \"hi\"'/>");
}

#[test]
fn stream_open_then_stanza() {
    let mut message = Tag::new("message");
    message.add_attribute("to", "a@b");
    message.add_child(Tag::with_cdata("body", "hi"));

    let mut parser = Parser::new();
    let mut collector = Collector::default();
    // Deliberately split in the middle of a token
    parser
        .feed(
            &mut collector,
            b"<stream:stream xmlns='jabber:client' version='1.0'><mes",
        )
        .unwrap();
    assert_eq!(
        collector.events,
        vec![Event::StreamOpen(stream_tag())],
    );
    parser
        .feed(&mut collector, b"sage to='a@b'><body>hi</body></message>")
        .unwrap();
    assert_eq!(
        collector.events,
        vec![Event::StreamOpen(stream_tag()), Event::Stanza(message)],
    );
    assert!(parser.is_stream_open());
}

#[test]
fn stream_close() {
    let mut presence = Tag::new("presence");
    presence.add_attribute("type", "unavailable");
    Tester::new(vec![
        Event::StreamOpen(stream_tag()),
        Event::Stanza(presence),
        Event::StreamClose,
    ])
    .check(
        "<stream:stream xmlns='jabber:client' version='1.0'>\
         <presence type='unavailable'/></stream:stream>",
    );
}

#[test]
fn nested_children_and_trailing_text() {
    let mut a = Tag::new("a");
    a.add_cdata("xy");
    a.add_child(Tag::new("b"));
    Tester::new(vec![Event::Stanza(a)]).check("<a>x<b/>y</a>");
}

#[test]
fn entities_in_cdata() {
    let tag = Tag::with_cdata("t", "a & b < c");
    Tester::new(vec![Event::Stanza(tag)]).check("<t>a &amp; b &lt; c</t>");
}

#[test]
fn entities_in_attributes() {
    let mut tag = Tag::new("t");
    tag.add_attribute("v", "a&b\"c");
    Tester::new(vec![Event::Stanza(tag)]).check("<t v='a&amp;b&#34;c'/>");
}

#[test]
fn cdata_section() {
    let tag = Tag::with_cdata("t", "<raw>&not-an-entity;");
    Tester::new(vec![Event::Stanza(tag)]).check("<t><![CDATA[<raw>&not-an-entity;]]></t>");
}

#[test]
fn cdata_section_with_brackets() {
    Tester::new(vec![Event::Stanza(Tag::with_cdata("t", "a]b"))])
        .check("<t><![CDATA[a]b]]></t>");
    Tester::new(vec![Event::Stanza(Tag::with_cdata("t", "a]]"))])
        .check("<t><![CDATA[a]]]]></t>");
    Tester::new(vec![Event::Stanza(Tag::with_cdata("t", "a]>b"))])
        .check("<t><![CDATA[a]>b]]></t>");
}

#[test]
fn cdata_section_mixed_with_text() {
    Tester::new(vec![Event::Stanza(Tag::with_cdata("t", "a&<kept>b"))])
        .check("<t>a&amp;<![CDATA[<kept>]]>b</t>");
}

#[test]
fn preamble() {
    Tester::new(vec![Event::StreamOpen(stream_tag())]).check(
        "<?xml version='1.0'?><stream:stream xmlns='jabber:client' version='1.0'>",
    );
}

#[test]
fn roundtrip() {
    // Serializing a parsed tag yields the input again
    let inputs = [
        "<presence/>",
        "<iq type='get' id='a1'/>",
        "<message to='a@b'><body>a &amp; b &lt; c</body></message>",
        "<stanza><one/><two x='1'/><three>t</three></stanza>",
    ];
    for input in inputs {
        let mut parser = Parser::new();
        let mut collector = Collector::default();
        parser.feed(&mut collector, input.as_bytes()).unwrap();
        assert_eq!(collector.events.len(), 1);
        let Event::Stanza(tag) = &collector.events[0] else {
            panic!("expected a stanza");
        };
        assert_eq!(tag.xml(), input);
    }
}

#[test]
fn utf8_content() {
    let tag = Tag::with_cdata("t", "göçüş 漢字 🎉");
    Tester::new(vec![Event::Stanza(tag)]).check("<t>göçüş 漢字 🎉</t>");
}

#[test]
fn char_range_boundaries() {
    // The last characters of each allowed XML Char range are valid
    let text = "\u{d7ff}\u{e000}\u{fffd}\u{10ffff}";
    let tag = Tag::with_cdata("t", text);
    Tester::new(vec![Event::Stanza(tag)]).check(&format!("<t>{text}</t>"));

    // U+FFFE sits just past the second range
    BadTester::new(description::CHAR_INVALID, 5).check_bytes(b"<a>\xef\xbf\xbe</a>");
}

#[test]
fn text_outside_root() {
    BadTester::new(description::TEXT_OUTSIDE_ROOT, 0).check("x<a/>");
    BadTester::new(description::TEXT_OUTSIDE_ROOT, 2).check("  x");
}

#[test]
fn mismatched_close() {
    BadTester::new(description::TAG_MISMATCH, 6).check("<a></b>");
    BadTester::new(description::TAG_MISMATCH, 9).check("<a><b></a>");
}

#[test]
fn close_without_open() {
    BadTester::new(description::TAG_CLOSE_WITHOUT_OPEN, 3).check("</a>");
}

#[test]
fn bad_tag_starts() {
    BadTester::new(description::TAG_BAD_START, 1).check("<>");
    BadTester::new(description::TAG_BAD_START, 1).check("<<a/>");
    BadTester::new(description::TAG_NAME_INVALID, 2).check("<a<b/>");
}

#[test]
fn bad_self_close() {
    BadTester::new(description::TAG_SELF_CLOSE_MISSING_END, 3).check("<a/b>");
}

#[test]
fn bad_attributes() {
    BadTester::new(description::ATTRIBUTE_BAD_NAME, 4).check("<a b/>");
    BadTester::new(description::ATTRIBUTE_MISSING_EQUAL, 5).check("<a b c='1'/>");
    BadTester::new(description::ATTRIBUTE_MISSING_QUOTE, 5).check("<a b=c/>");
    BadTester::new(description::ATTRIBUTE_BAD_VALUE, 6).check("<a b='<'/>");
}

#[test]
fn bad_preambles() {
    BadTester::new(description::DECL_MALFORMED, 5).check("<?xml><a/>");
    BadTester::new(description::DECL_DUPLICATE, 41)
        .check("<?xml version='1.0'?><?xml version='1.0'?>");
    BadTester::new(description::DECL_MISPLACED, 24).check("<a/><?xml version='1.0'?>");
}

#[test]
fn bad_cdata_start() {
    BadTester::new(description::MARKUP_BAD_CDATA_START, 5).check("<a><!CDATA[x]]></a>");
    BadTester::new(description::MARKUP_BAD_CDATA_START, 8).check("<a><![CDETA[x]]></a>");
}

#[test]
fn invalid_bytes() {
    BadTester::new(description::CHAR_INVALID, 3).check_bytes(b"<a>\xc0\xaf</a>");
    BadTester::new(description::CHAR_INVALID, 3).check_bytes(b"<a>\xc1\x81</a>");
    BadTester::new(description::CHAR_INVALID, 3).check_bytes(b"<a>\xf5\x80\x80\x80</a>");
    BadTester::new(description::CHAR_INVALID, 3).check_bytes(b"<a>\x07</a>");
}

#[test]
fn invalid_utf8_sequences() {
    // Continuation byte without a prefix
    BadTester::new(description::UTF8_INVALID_PREFIX_BYTE, 3).check_bytes(b"<a>\x80</a>");
    // Prefix byte without its continuation
    BadTester::new(description::UTF8_INVALID_CONT_BYTE, 4).check_bytes(b"<a>\xc3x</a>");
    // Overlong three byte encoding of a one byte character
    BadTester::new(description::UTF8_OVERLONG_SEQUENCE, 5).check_bytes(b"<a>\xe0\x80\x80</a>");
}

#[test]
fn error_resets_parser() {
    let mut parser = Parser::new();
    let mut collector = Collector::default();
    assert!(parser.feed(&mut collector, b"<a></b>").is_err());
    // The parser is reusable after a reset
    parser.reset();
    let mut collector = Collector::default();
    parser.feed(&mut collector, b"<a></a>").unwrap();
    assert_eq!(collector.events, vec![Event::Stanza(Tag::new("a"))]);
}
