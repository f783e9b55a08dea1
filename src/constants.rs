/*
** This file is a part of Ikstream (XMPP client engine for Jabber/XMPP)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

//! Protocol constants: well-known ports, stream element names and the
//! XML namespaces used during stream negotiation and dispatch.

pub const XMPP_CLIENT_PORT: u16 = 5222;

pub const XMPP_SERVER_PORT: u16 = 5269;

pub const STREAM_TAG: &str = "stream:stream";

pub const FEATURES_TAG: &str = "stream:features";

pub const STREAM_ERROR_TAG: &str = "stream:error";

pub const XMLNS_CLIENT: &str = "jabber:client";

pub const XMLNS_COMPONENT_ACCEPT: &str = "jabber:component:accept";

pub const XMLNS_STREAM: &str = "http://etherx.jabber.org/streams";

pub const XMLNS_XMPP_STREAMS: &str = "urn:ietf:params:xml:ns:xmpp-streams";

pub const XMLNS_XMPP_STANZAS: &str = "urn:ietf:params:xml:ns:xmpp-stanzas";

pub const XMLNS_STREAM_TLS: &str = "urn:ietf:params:xml:ns:xmpp-tls";

pub const XMLNS_STREAM_SASL: &str = "urn:ietf:params:xml:ns:xmpp-sasl";

pub const XMLNS_STREAM_BIND: &str = "urn:ietf:params:xml:ns:xmpp-bind";

pub const XMLNS_STREAM_SESSION: &str = "urn:ietf:params:xml:ns:xmpp-session";

pub const XMLNS_AUTH: &str = "jabber:iq:auth";

pub const XMLNS_ROSTER: &str = "jabber:iq:roster";

pub const XMLNS_VERSION: &str = "jabber:iq:version";

pub const XMLNS_DISCO_INFO: &str = "http://jabber.org/protocol/disco#info";

pub const XMLNS_DISCO_ITEMS: &str = "http://jabber.org/protocol/disco#items";

pub const XMLNS_CHAT_STATES: &str = "http://jabber.org/protocol/chatstates";
