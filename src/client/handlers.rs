/*
** This file is a part of Ikstream (XMPP client engine for Jabber/XMPP)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use super::CertInfo;
use super::ConnectionError;
use super::Context;
use crate::stanza::Stanza;
use crate::stanza::StanzaError;
use crate::tag::Tag;

/// Identifies a registered handler so it can be removed later.
pub type HandlerId = usize;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LogDirection {
    Incoming,
    Outgoing,
}

/// Receives connection lifecycle notifications.
pub trait ConnectionListener {
    /// The session reached the authenticated state.
    fn on_connect(&mut self, _context: &mut Context) {}

    /// The session ended; the error tells why.
    fn on_disconnect(&mut self, _error: &ConnectionError) {}

    /// The TLS handshake finished. Return false to reject the
    /// certificate and drop the connection.
    fn on_tls_connect(&mut self, _info: &CertInfo) -> bool {
        true
    }

    fn on_resource_bind_error(&mut self, _error: Option<&StanzaError>) {}

    fn on_session_create_error(&mut self, _error: Option<&StanzaError>) {}
}

/// Receives info/query stanzas, either by payload namespace or as the
/// tracked reply to an earlier request.
pub trait IqHandler {
    /// Handles an IQ whose payload namespace was registered. Return
    /// true when the stanza was consumed to stop further namespace
    /// dispatch.
    fn handle_iq(&mut self, _context: &mut Context, _stanza: &Stanza) -> bool {
        false
    }

    /// Handles the reply to a tracked request together with the value
    /// given at tracking time.
    fn handle_iq_id(&mut self, _context: &mut Context, _stanza: &Stanza, _user_context: i32) {}
}

pub trait MessageHandler {
    fn handle_message(&mut self, context: &mut Context, stanza: &Stanza);
}

pub trait PresenceHandler {
    fn handle_presence(&mut self, context: &mut Context, stanza: &Stanza);
}

/// Receives the presence subscription management stanzas.
pub trait SubscriptionHandler {
    fn handle_subscription(&mut self, context: &mut Context, stanza: &Stanza);
}

/// Receives stanzas carrying a registered (element, namespace) child.
///
/// The handler is given the matched child element.
pub trait TagHandler {
    fn handle_tag(&mut self, context: &mut Context, tag: &Tag);
}

/// Observes the XML text exchanged on the connection, in both
/// directions. Suitable for traffic logging.
pub trait LogHandler {
    fn handle_log(&mut self, direction: LogDirection, xml: &str);
}
