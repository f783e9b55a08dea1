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
mod location;

pub use error::ParseError;
use error::description;
pub use location::Location;

use crate::constants::STREAM_TAG;
use crate::entities::unescape;
use crate::tag::Tag;

/// Receives the elements found in an XMPP byte stream.
///
/// The parser delivers every direct child of the stream root as one
/// complete [Tag] tree. The stream root itself is special: its opening
/// tag is delivered through
/// [handle_stream_open()](StreamHandler::handle_stream_open) as soon as
/// it is parsed, and its closing tag through
/// [handle_stream_close()](StreamHandler::handle_stream_close).
pub trait StreamHandler {
    fn handle_stream_open(&mut self, tag: Tag);

    fn handle_tag(&mut self, tag: Tag);

    fn handle_stream_close(&mut self);
}

#[derive(Clone, Copy, Eq, PartialEq)]
enum State {
    Initial,
    TagOpening,
    TagNameCollect,
    TagNameComplete,
    TagInside,
    TagOpeningSlash,
    TagClosingSlash,
    TagClosing,
    TagAttribute,
    TagAttributeComplete,
    TagAttributeEqual,
    TagValue,
    TagCDataStart,
    TagCDataSection,
    TagCDataMaybeEnd,
    TagCDataMaybeEnd2,
}

const CDATA_START: &[u8] = b"![CDATA[";

macro_rules! whitespace {
    () => {
        b' ' | b'\t' | b'\r' | b'\n'
    };
}

fn is_valid_xml_char(c: u32) -> bool {
    matches!(c, 0x09 | 0x0a | 0x0d | 0x20..=0xd7ff | 0xe000..=0xfffd | 0x10000..=0x10ffff)
}

// The accumulator buffers only ever hold bytes which already went
// through the UTF-8 validation, and they are flushed at ASCII bytes,
// so a flushed buffer always holds complete sequences.
fn take_buffer_string(buffer: &mut Vec<u8>) -> String {
    let bytes = std::mem::take(buffer);
    unsafe { String::from_utf8_unchecked(bytes) }
}

/// An incremental parser turning an XMPP octet stream into stanzas.
///
/// The parser can consume the input in arbitrarily small pieces; all
/// parsing state is kept between [feed()](Parser::feed) calls. Whenever
/// a top level child of the stream root is complete, the whole element
/// tree is handed to the [StreamHandler].
///
/// # Examples
///
/// ```
/// use ikstream::{Parser, StreamHandler, Tag};
///
/// struct Printer {}
/// impl StreamHandler for Printer {
///     fn handle_stream_open(&mut self, tag: Tag) {
///         println!("stream opened by {:?}", tag.find_attribute("from"));
///     }
///     fn handle_tag(&mut self, tag: Tag) {
///         println!("stanza: {}", tag.xml());
///     }
///     fn handle_stream_close(&mut self) {
///         println!("stream closed");
///     }
/// }
///
/// let mut handler = Printer {};
/// let mut parser = Parser::new();
/// parser.feed(&mut handler, b"<stream:stream version='1.0'>").unwrap();
/// parser.feed(&mut handler, b"<presence/>").unwrap();
/// ```
pub struct Parser {
    state: State,
    stack: Vec<Tag>,
    tag: Vec<u8>,
    attrib: Vec<u8>,
    value: Vec<u8>,
    attribs: Vec<(String, String)>,
    cdata: Vec<u8>,
    quote: u8,
    preamble: u8,
    seen_preamble: bool,
    seen_content: bool,
    cdata_match: usize,
    stream_open: bool,
    uni_len: u32,
    uni_left: u32,
    uni_char: u32,
    location: Location,
}

impl Parser {
    pub fn new() -> Parser {
        Parser {
            state: State::Initial,
            stack: Vec::new(),
            tag: Vec::new(),
            attrib: Vec::new(),
            value: Vec::new(),
            attribs: Vec::new(),
            cdata: Vec::new(),
            quote: 0,
            preamble: 0,
            seen_preamble: false,
            seen_content: false,
            cdata_match: 0,
            stream_open: false,
            uni_len: 0,
            uni_left: 0,
            uni_char: 0,
            location: Location::new(),
        }
    }

    /// Resets the parser into a clean state, ready for a new stream.
    pub fn reset(&mut self) {
        self.cleanup();
        self.seen_preamble = false;
        self.location = Location::new();
    }

    /// Position of the next byte to be parsed.
    ///
    /// After an error this points at the offending byte.
    pub fn location(&self) -> Location {
        self.location
    }

    /// Whether the opening stream header has been seen.
    pub fn is_stream_open(&self) -> bool {
        self.stream_open
    }

    fn cleanup(&mut self) {
        self.state = State::Initial;
        self.stack.clear();
        self.tag.clear();
        self.attrib.clear();
        self.value.clear();
        self.attribs.clear();
        self.cdata.clear();
        self.quote = 0;
        self.preamble = 0;
        self.seen_content = false;
        self.cdata_match = 0;
        self.stream_open = false;
        self.uni_len = 0;
        self.uni_left = 0;
        self.uni_char = 0;
    }

    fn commit_attribute(&mut self) {
        let name = unescape(&take_buffer_string(&mut self.attrib));
        let value = unescape(&take_buffer_string(&mut self.value));
        self.attribs.push((name, value));
    }

    fn flush_cdata(&mut self) {
        if self.cdata.is_empty() {
            return;
        }
        let text = take_buffer_string(&mut self.cdata);
        if let Some(current) = self.stack.last_mut() {
            current.add_cdata(&unescape(&text));
        }
    }

    fn flush_cdata_raw(&mut self) {
        // CDATA section content is taken verbatim
        let text = take_buffer_string(&mut self.cdata);
        if let Some(current) = self.stack.last_mut() {
            current.add_cdata(&text);
        }
    }

    /// Creates the collected element. Returns true for the stream root,
    /// which is delivered right away instead of being put on the stack.
    fn open_tag(&mut self, handler: &mut impl StreamHandler) -> bool {
        let name = unescape(&take_buffer_string(&mut self.tag));
        let mut tag = Tag::new(name);
        for (name, value) in self.attribs.drain(..) {
            tag.add_attribute(name, value);
        }
        self.seen_content = true;
        if self.stack.is_empty() && tag.name() == STREAM_TAG {
            self.stream_open = true;
            handler.handle_stream_open(tag);
            return true;
        }
        self.stack.push(tag);
        false
    }

    fn close_current(&mut self, handler: &mut impl StreamHandler) {
        if let Some(tag) = self.stack.pop() {
            match self.stack.last_mut() {
                Some(parent) => {
                    parent.add_child(tag);
                }
                None => handler.handle_tag(tag),
            }
        }
    }

    fn close_tag(&mut self, handler: &mut impl StreamHandler) -> Result<(), &'static str> {
        let name = unescape(&take_buffer_string(&mut self.tag));
        if name == STREAM_TAG {
            self.stack.clear();
            self.stream_open = false;
            handler.handle_stream_close();
            return Ok(());
        }
        match self.stack.last() {
            None => Err(description::TAG_CLOSE_WITHOUT_OPEN),
            Some(current) => {
                if current.name() != name {
                    return Err(description::TAG_MISMATCH);
                }
                self.close_current(handler);
                Ok(())
            }
        }
    }

    fn end_preamble(&mut self) -> Result<(), &'static str> {
        if self.tag.as_slice() != b"xml" {
            return Err(description::DECL_MALFORMED);
        }
        if self.seen_preamble {
            return Err(description::DECL_DUPLICATE);
        }
        if self.seen_content {
            return Err(description::DECL_MISPLACED);
        }
        self.seen_preamble = true;
        self.preamble = 0;
        self.tag.clear();
        self.attribs.clear();
        Ok(())
    }

    fn validate_byte(&mut self, c: u8) -> Result<(), &'static str> {
        if self.uni_left > 0 {
            if c & 0xc0 != 0x80 {
                return Err(description::UTF8_INVALID_CONT_BYTE);
            }
            self.uni_char <<= 6;
            self.uni_char += c as u32 & 0x3f;
            self.uni_left -= 1;
            if self.uni_left == 0 {
                // Sequences longer than the actual character codepoint
                // size are security hazards.
                if (self.uni_len == 2 && self.uni_char <= 0x7f)
                    || (self.uni_len == 3 && self.uni_char <= 0x7ff)
                    || (self.uni_len == 4 && self.uni_char <= 0xffff)
                {
                    return Err(description::UTF8_OVERLONG_SEQUENCE);
                }
                if !is_valid_xml_char(self.uni_char) {
                    return Err(description::CHAR_INVALID);
                }
            }
        } else if c & 0x80 == 0x80 {
            if c == 0xc0 || c == 0xc1 || c >= 0xf5 {
                return Err(description::CHAR_INVALID);
            }
            if c & 0xe0 == 0xc0 {
                self.uni_len = 2;
                self.uni_left = 1;
                self.uni_char = c as u32 & 0x1f;
            } else if c & 0xf0 == 0xe0 {
                self.uni_len = 3;
                self.uni_left = 2;
                self.uni_char = c as u32 & 0x0f;
            } else if c & 0xf8 == 0xf0 {
                self.uni_len = 4;
                self.uni_left = 3;
                self.uni_char = c as u32 & 0x07;
            } else {
                return Err(description::UTF8_INVALID_PREFIX_BYTE);
            }
        } else if c < 0x20 && c != 0x09 && c != 0x0a && c != 0x0d {
            return Err(description::CHAR_INVALID);
        }
        Ok(())
    }

    fn feed_byte(
        &mut self,
        handler: &mut impl StreamHandler,
        c: u8,
    ) -> Result<(), &'static str> {
        self.validate_byte(c)?;

        match self.state {
            State::Initial => match c {
                b'<' => {
                    self.flush_cdata();
                    self.state = State::TagOpening;
                }
                whitespace!() => (),
                _ => {
                    if self.stack.is_empty() {
                        return Err(description::TEXT_OUTSIDE_ROOT);
                    }
                    self.cdata.push(c);
                    self.state = State::TagInside;
                }
            },

            State::TagOpening => match c {
                whitespace!() => (),
                b'<' | b'>' => {
                    return Err(description::TAG_BAD_START);
                }
                b'/' => self.state = State::TagClosingSlash,
                b'?' => {
                    self.preamble = 1;
                    self.state = State::TagNameCollect;
                }
                b'!' => {
                    self.cdata_match = 1;
                    self.state = State::TagCDataStart;
                }
                _ => {
                    self.tag.push(c);
                    self.state = State::TagNameCollect;
                }
            },

            State::TagCDataStart => {
                if c != CDATA_START[self.cdata_match] {
                    return Err(description::MARKUP_BAD_CDATA_START);
                }
                self.cdata_match += 1;
                if self.cdata_match == CDATA_START.len() {
                    self.cdata_match = 0;
                    self.state = State::TagCDataSection;
                }
            }

            State::TagCDataSection => match c {
                b']' => self.state = State::TagCDataMaybeEnd,
                _ => self.cdata.push(c),
            },

            State::TagCDataMaybeEnd => match c {
                b']' => self.state = State::TagCDataMaybeEnd2,
                _ => {
                    self.cdata.push(b']');
                    self.cdata.push(c);
                    self.state = State::TagCDataSection;
                }
            },

            State::TagCDataMaybeEnd2 => match c {
                b'>' => {
                    self.flush_cdata_raw();
                    self.state = State::TagInside;
                }
                b']' => self.cdata.push(b']'),
                _ => {
                    self.cdata.push(b']');
                    self.cdata.push(b']');
                    self.cdata.push(c);
                    self.state = State::TagCDataSection;
                }
            },

            State::TagNameCollect => match c {
                whitespace!() => self.state = State::TagNameComplete,
                b'<' | b'?' => {
                    return Err(description::TAG_NAME_INVALID);
                }
                b'/' => {
                    if self.preamble != 0 {
                        return Err(description::DECL_MALFORMED);
                    }
                    self.state = State::TagOpeningSlash;
                }
                b'>' => {
                    if self.preamble != 0 {
                        return Err(description::DECL_MALFORMED);
                    }
                    self.open_tag(handler);
                    self.state = State::TagInside;
                }
                _ => self.tag.push(c),
            },

            State::TagNameComplete => match c {
                whitespace!() => (),
                b'<' => {
                    return Err(description::TAG_NAME_INVALID);
                }
                b'/' => {
                    if self.preamble != 0 {
                        return Err(description::DECL_MALFORMED);
                    }
                    self.state = State::TagOpeningSlash;
                }
                b'>' => {
                    if self.preamble == 1 {
                        return Err(description::DECL_MALFORMED);
                    }
                    if self.preamble == 2 {
                        self.end_preamble()?;
                        self.state = State::Initial;
                    } else {
                        self.open_tag(handler);
                        self.state = State::TagInside;
                    }
                }
                b'?' => {
                    if self.preamble == 1 {
                        self.preamble = 2;
                    } else {
                        return Err(description::TAG_NAME_INVALID);
                    }
                }
                _ => {
                    self.attrib.push(c);
                    self.state = State::TagAttribute;
                }
            },

            State::TagInside => match c {
                b'<' => {
                    self.flush_cdata();
                    self.state = State::TagOpening;
                }
                _ => self.cdata.push(c),
            },

            State::TagOpeningSlash => match c {
                whitespace!() => (),
                b'>' => {
                    if !self.open_tag(handler) {
                        self.close_current(handler);
                    }
                    self.state = State::Initial;
                }
                _ => {
                    return Err(description::TAG_SELF_CLOSE_MISSING_END);
                }
            },

            State::TagClosingSlash => match c {
                whitespace!() => (),
                b'>' | b'<' | b'/' => {
                    return Err(description::TAG_NAME_INVALID);
                }
                _ => {
                    self.tag.push(c);
                    self.state = State::TagClosing;
                }
            },

            State::TagClosing => match c {
                b'<' | b'/' => {
                    return Err(description::TAG_NAME_INVALID);
                }
                b'>' => {
                    self.close_tag(handler)?;
                    self.state = State::Initial;
                }
                _ => self.tag.push(c),
            },

            State::TagAttribute => match c {
                whitespace!() => self.state = State::TagAttributeComplete,
                b'<' | b'/' | b'>' => {
                    return Err(description::ATTRIBUTE_BAD_NAME);
                }
                b'=' => self.state = State::TagAttributeEqual,
                _ => self.attrib.push(c),
            },

            State::TagAttributeComplete => match c {
                whitespace!() => (),
                b'=' => self.state = State::TagAttributeEqual,
                _ => {
                    return Err(description::ATTRIBUTE_MISSING_EQUAL);
                }
            },

            State::TagAttributeEqual => match c {
                whitespace!() => (),
                b'"' | b'\'' => {
                    self.quote = c;
                    self.state = State::TagValue;
                }
                _ => {
                    return Err(description::ATTRIBUTE_MISSING_QUOTE);
                }
            },

            State::TagValue => match c {
                b'<' => {
                    return Err(description::ATTRIBUTE_BAD_VALUE);
                }
                _ => {
                    if c == self.quote {
                        self.commit_attribute();
                        self.state = State::TagNameComplete;
                    } else {
                        self.value.push(c);
                    }
                }
            },
        }

        Ok(())
    }

    /// Parses the given bytes, delivering completed elements to the
    /// handler.
    ///
    /// Any violation resets the parser state; the returned error names
    /// the problem and the byte offset where it was found.
    pub fn feed(
        &mut self,
        handler: &mut impl StreamHandler,
        bytes: &[u8],
    ) -> Result<(), ParseError> {
        for &c in bytes {
            match self.feed_byte(handler, c) {
                Ok(()) => self.location.advance(c),
                Err(violation) => {
                    let offset = self.location.bytes;
                    self.cleanup();
                    return Err(ParseError::BadXml(violation, offset));
                }
            }
        }

        Ok(())
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;
