/*
** This file is a part of Ikstream (XMPP client engine for Jabber/XMPP)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use super::IqHandler;
use crate::stanza::Stanza;
use crate::tag::Tag;

/// The operation buffer handed to handler callbacks.
///
/// Handlers run while the client walks its registries, so they cannot
/// touch the client directly. Everything queued here is applied by the
/// client right after the notification round, in queue order: stanzas
/// are written to the transport and new tracked IDs are recorded.
pub struct Context {
    pub(super) id_count: u64,
    pub(super) outbox: Vec<String>,
    pub(super) tracked: Vec<(String, Box<dyn IqHandler>, i32)>,
    pub(super) disconnect_requested: bool,
}

impl Context {
    pub(super) fn new(id_count: u64) -> Context {
        Context {
            id_count,
            outbox: Vec::new(),
            tracked: Vec::new(),
            disconnect_requested: false,
        }
    }

    /// Creates a session-unique ID for a request.
    pub fn new_id(&mut self) -> String {
        self.id_count += 1;
        format!("i{}", self.id_count)
    }

    /// Queues a stanza for sending, giving it an ID if it has none.
    pub fn send(&mut self, mut stanza: Stanza) {
        if stanza.id().is_empty() {
            let id = self.new_id();
            stanza.set_id(&id);
        }
        self.outbox.push(stanza.xml());
    }

    /// Queues a stanza and tracks its ID: the handler is called once
    /// with the given value when the matching reply arrives.
    pub fn send_with_handler(
        &mut self,
        mut stanza: Stanza,
        handler: Box<dyn IqHandler>,
        user_context: i32,
    ) {
        if stanza.id().is_empty() {
            let id = self.new_id();
            stanza.set_id(&id);
        }
        self.tracked
            .push((stanza.id().to_string(), handler, user_context));
        self.outbox.push(stanza.xml());
    }

    /// Queues a raw element for sending.
    pub fn send_tag(&mut self, tag: &Tag) {
        self.outbox.push(tag.xml());
    }

    /// Asks the client to close the stream once the notification round
    /// is over.
    pub fn disconnect(&mut self) {
        self.disconnect_requested = true;
    }
}
