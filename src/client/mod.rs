/*
** This file is a part of Ikstream (XMPP client engine for Jabber/XMPP)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

mod connection;
mod context;
mod error;
mod handlers;
mod sasl;

pub use connection::CERT_CN_MISMATCH;
pub use connection::CERT_EXPIRED;
pub use connection::CERT_INVALID;
pub use connection::CERT_OK;
pub use connection::CERT_REVOKED;
pub use connection::CERT_SIGNER_UNKNOWN;
pub use connection::CertInfo;
pub use connection::Connection;
pub use connection::TcpConnection;
pub use context::Context;
pub use error::AuthenticationError;
pub use error::ConnectionError;
pub use error::StreamErrorCondition;
pub use handlers::ConnectionListener;
pub use handlers::HandlerId;
pub use handlers::IqHandler;
pub use handlers::LogDirection;
pub use handlers::LogHandler;
pub use handlers::MessageHandler;
pub use handlers::PresenceHandler;
pub use handlers::SubscriptionHandler;
pub use handlers::TagHandler;

use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::*;
use crate::extension::ExtensionRegistry;
use crate::jid::Jid;
use crate::parser::Parser;
use crate::parser::StreamHandler;
use crate::stanza::Stanza;
use crate::stanza::StanzaError;
use crate::stanza::StanzaErrorCondition;
use crate::stanza::StanzaErrorType;
use crate::stanza::StanzaKind;
use crate::stanza::StanzaSubType;
use crate::tag::Tag;

/// The lifecycle state of a session.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConnectionState {
    Disconnected,
    /// The transport is open and the stream header was sent.
    Connecting,
    /// The server stream header arrived; waiting for its features.
    StreamOpened,
    TlsNegotiating,
    SaslNegotiating,
    Binding,
    SessionEstablishing,
    Authenticated,
    Disconnecting,
}

enum StreamEvent {
    StreamOpen(Tag),
    Stanza(Tag),
    StreamClose,
}

#[derive(Default)]
struct EventQueue {
    queue: VecDeque<StreamEvent>,
}

impl EventQueue {
    fn pop(&mut self) -> Option<StreamEvent> {
        self.queue.pop_front()
    }

    fn clear(&mut self) {
        self.queue.clear();
    }
}

impl StreamHandler for EventQueue {
    fn handle_stream_open(&mut self, tag: Tag) {
        self.queue.push_back(StreamEvent::StreamOpen(tag));
    }

    fn handle_tag(&mut self, tag: Tag) {
        self.queue.push_back(StreamEvent::Stanza(tag));
    }

    fn handle_stream_close(&mut self) {
        self.queue.push_back(StreamEvent::StreamClose);
    }
}

fn stream_version_ok(version: &str) -> bool {
    version
        .split('.')
        .next()
        .and_then(|major| major.parse::<u32>().ok())
        .is_some_and(|major| major >= 1)
}

fn iq_matches_namespace(stanza: &Stanza, xmlns: &str) -> bool {
    // Attached extensions are derived from the payload children, so
    // checking the children covers both registered and raw payloads.
    stanza
        .tag()
        .children()
        .iter()
        .any(|child| child.xmlns() == Some(xmlns))
}

fn service_unavailable_reply(stanza: &Stanza) -> Tag {
    let mut iq = Tag::new("iq");
    if let Some(from) = stanza.from() {
        iq.add_attribute("to", from.full());
    }
    iq.add_attribute("type", "error");
    if !stanza.id().is_empty() {
        iq.add_attribute("id", stanza.id());
    }
    let error = StanzaError::new(
        StanzaErrorType::Cancel,
        StanzaErrorCondition::ServiceUnavailable,
    );
    iq.add_child(error.tag());
    iq
}

/// Configures and creates a [Client].
pub struct ClientBuilder {
    jid: Jid,
    password: String,
    server: Option<String>,
    port: Option<u16>,
    tls: bool,
    sasl: bool,
    xml_lang: String,
    ca_certs: Vec<PathBuf>,
    force_non_sasl: bool,
    compression: bool,
}

impl ClientBuilder {
    pub fn new(jid: Jid, password: impl Into<String>) -> ClientBuilder {
        ClientBuilder {
            jid,
            password: password.into(),
            server: None,
            port: None,
            tls: true,
            sasl: true,
            xml_lang: "en".to_string(),
            ca_certs: Vec::new(),
            force_non_sasl: false,
            compression: true,
        }
    }

    /// Connects to this host instead of the JID domain.
    pub fn server(mut self, server: Option<String>) -> ClientBuilder {
        self.server = server;
        self
    }

    pub fn port(mut self, port: u16) -> ClientBuilder {
        self.port = Some(port);
        self
    }

    pub fn tls(mut self, tls: bool) -> ClientBuilder {
        self.tls = tls;
        self
    }

    pub fn sasl(mut self, sasl: bool) -> ClientBuilder {
        self.sasl = sasl;
        self
    }

    pub fn xml_lang(mut self, xml_lang: impl Into<String>) -> ClientBuilder {
        self.xml_lang = xml_lang.into();
        self
    }

    /// Additional trusted CA root certificates, as PEM file paths.
    pub fn ca_certs(mut self, ca_certs: Vec<PathBuf>) -> ClientBuilder {
        self.ca_certs = ca_certs;
        self
    }

    /// Uses the legacy jabber:iq:auth login even on XMPP 1.0 streams.
    pub fn force_non_sasl(mut self, force_non_sasl: bool) -> ClientBuilder {
        self.force_non_sasl = force_non_sasl;
        self
    }

    pub fn compression(mut self, compression: bool) -> ClientBuilder {
        self.compression = compression;
        self
    }

    /// Creates a client on a TCP transport to the configured server.
    pub fn build(self) -> Client<TcpConnection> {
        let host = match &self.server {
            Some(server) => server.clone(),
            None => self.jid.domainpart().to_string(),
        };
        let port = self.port.unwrap_or(XMPP_CLIENT_PORT);
        let connection = TcpConnection::new(host, port);
        self.build_with(connection)
    }

    /// Creates a client on the given transport.
    pub fn build_with<C: Connection>(self, connection: C) -> Client<C> {
        Client {
            connection,
            jid: self.jid,
            password: self.password,
            tls: self.tls,
            sasl: self.sasl,
            xml_lang: self.xml_lang,
            ca_certs: self.ca_certs,
            force_non_sasl: self.force_non_sasl,
            compression: self.compression,
            parser: Parser::new(),
            events: EventQueue::default(),
            registry: ExtensionRegistry::with_defaults(),
            state: ConnectionState::Disconnected,
            authed: false,
            disconnecting: false,
            stream_id: String::new(),
            id_count: 0,
            handler_id_count: 0,
            connection_listeners: Vec::new(),
            iq_ns_handlers: Vec::new(),
            iq_id_handlers: Vec::new(),
            message_handlers: Vec::new(),
            presence_handlers: Vec::new(),
            subscription_handlers: Vec::new(),
            tag_handlers: Vec::new(),
            log_handlers: Vec::new(),
            stream_error: None,
            stream_error_text: Vec::new(),
            stream_error_cdata: String::new(),
            stream_error_app_condition: None,
            auth_error: None,
            bind_id: String::new(),
            session_id: String::new(),
            auth_id: String::new(),
            session_required: false,
        }
    }
}

/// An XMPP client session.
///
/// The client owns the transport, the stream parser and the handler
/// registries. It drives the stream negotiation (features, TLS, SASL,
/// resource binding, session) and then dispatches every inbound stanza
/// to the registered handlers. All state changes happen on the thread
/// calling [recv()](Client::recv); handlers run on that thread and
/// talk back through the [Context] they are given.
///
/// # Examples
///
/// ```no_run
/// use ikstream::{Client, ConnectionListener, Context, Jid};
///
/// struct Greeter {}
/// impl ConnectionListener for Greeter {
///     fn on_connect(&mut self, context: &mut Context) {
///         println!("connected");
///     }
/// }
///
/// let jid = Jid::new("juliet@capulet.com/balcony").unwrap();
/// let mut client = Client::build(jid, "secret").build();
/// client.register_connection_listener(Box::new(Greeter {}));
/// client.connect(true).unwrap();
/// ```
pub struct Client<C: Connection> {
    connection: C,
    jid: Jid,
    password: String,
    tls: bool,
    sasl: bool,
    xml_lang: String,
    ca_certs: Vec<PathBuf>,
    force_non_sasl: bool,
    compression: bool,

    parser: Parser,
    events: EventQueue,
    registry: ExtensionRegistry,
    state: ConnectionState,
    authed: bool,
    disconnecting: bool,
    stream_id: String,
    id_count: u64,
    handler_id_count: HandlerId,

    connection_listeners: Vec<(HandlerId, Box<dyn ConnectionListener>)>,
    iq_ns_handlers: Vec<(String, Box<dyn IqHandler>)>,
    iq_id_handlers: Vec<(String, Box<dyn IqHandler>, i32)>,
    message_handlers: Vec<(HandlerId, Box<dyn MessageHandler>)>,
    presence_handlers: Vec<(HandlerId, Box<dyn PresenceHandler>)>,
    subscription_handlers: Vec<(HandlerId, Box<dyn SubscriptionHandler>)>,
    tag_handlers: Vec<(HandlerId, String, String, Box<dyn TagHandler>)>,
    log_handlers: Vec<(HandlerId, Box<dyn LogHandler>)>,

    stream_error: Option<StreamErrorCondition>,
    stream_error_text: Vec<(String, String)>,
    stream_error_cdata: String,
    stream_error_app_condition: Option<Tag>,
    auth_error: Option<AuthenticationError>,

    bind_id: String,
    session_id: String,
    auth_id: String,
    session_required: bool,
}

impl Client<TcpConnection> {
    /// Starts building a client for the given account.
    pub fn build(jid: Jid, password: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(jid, password)
    }
}

impl<C: Connection> Client<C> {
    //
    // Lifecycle
    //

    /// Opens the transport and starts the stream negotiation.
    ///
    /// With `block` the call runs the receive loop until the session
    /// ends; a disconnect requested by the application is a normal
    /// return. Without it the caller polls with
    /// [recv()](Client::recv).
    pub fn connect(&mut self, block: bool) -> Result<(), ConnectionError> {
        self.connection.connect()?;
        self.send_header();
        if block {
            loop {
                if let Err(error) = self.recv(None) {
                    return match error {
                        ConnectionError::UserDisconnected => Ok(()),
                        error => Err(error),
                    };
                }
            }
        }
        Ok(())
    }

    /// Receives and processes data from the transport.
    ///
    /// Waits up to the timeout for inbound bytes, feeds the parser and
    /// dispatches every completed stanza. A `None` timeout blocks
    /// until data arrives. Returns the reason when the session ended.
    pub fn recv(&mut self, timeout: Option<Duration>) -> Result<(), ConnectionError> {
        if self.state == ConnectionState::Disconnected {
            return Err(ConnectionError::NotConnected);
        }
        if self.disconnecting {
            self.disconnecting = false;
            self.state = ConnectionState::Disconnecting;
            self.send_raw("</stream:stream>");
            return Err(self.teardown(ConnectionError::UserDisconnected));
        }
        let bytes = match self.connection.recv(timeout) {
            Ok(bytes) => bytes,
            Err(error) => return Err(self.teardown(error)),
        };
        if bytes.is_empty() {
            return Ok(());
        }
        let text = String::from_utf8_lossy(&bytes).into_owned();
        tracing::trace!("recv: {text}");
        self.log(LogDirection::Incoming, &text);
        if let Err(error) = self.parser.feed(&mut self.events, &bytes) {
            tracing::debug!("parse error: {error}");
            return Err(self.teardown(ConnectionError::ParseError(error)));
        }
        while let Some(event) = self.events.pop() {
            self.process_event(event)?;
        }
        Ok(())
    }

    /// Requests an orderly disconnect.
    ///
    /// The stream is closed and the connection listeners see a
    /// `UserDisconnected` reason.
    pub fn disconnect(&mut self) {
        if self.state == ConnectionState::Disconnected {
            return;
        }
        self.state = ConnectionState::Disconnecting;
        self.send_raw("</stream:stream>");
        let _ = self.teardown(ConnectionError::UserDisconnected);
    }

    //
    // Send path
    //

    /// Creates a session-unique ID for a request.
    pub fn new_id(&mut self) -> String {
        self.id_count += 1;
        format!("i{}", self.id_count)
    }

    /// Sends a stanza, giving it an ID if it has none.
    pub fn send(&mut self, mut stanza: Stanza) {
        if stanza.id().is_empty() {
            let id = self.new_id();
            stanza.set_id(&id);
        }
        self.send_raw(&stanza.xml());
    }

    /// Sends a stanza and tracks its ID. The handler is invoked once,
    /// with the given value, when the matching reply arrives.
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
        self.iq_id_handlers
            .push((stanza.id().to_string(), handler, user_context));
        self.send_raw(&stanza.xml());
    }

    /// Sends a raw element.
    pub fn send_tag(&mut self, tag: &Tag) {
        self.send_raw(&tag.xml());
    }

    fn send_raw(&mut self, xml: &str) {
        tracing::trace!("send: {xml}");
        if !self.connection.send(xml.as_bytes()) {
            tracing::warn!("transport refused {} bytes", xml.len());
        }
        self.log(LogDirection::Outgoing, xml);
    }

    fn send_header(&mut self) {
        let header = format!(
            "<?xml version='1.0'?>\
             <stream:stream xmlns='{}' xmlns:stream='{}' to='{}' version='1.0' xml:lang='{}'>",
            XMLNS_CLIENT,
            XMLNS_STREAM,
            self.jid.domainpart(),
            self.xml_lang,
        );
        self.state = ConnectionState::Connecting;
        self.send_raw(&header);
    }

    fn restart_stream(&mut self) {
        self.parser.reset();
        self.events.clear();
        self.send_header();
    }

    fn teardown(&mut self, error: ConnectionError) -> ConnectionError {
        self.connection.disconnect();
        self.state = ConnectionState::Disconnected;
        self.authed = false;
        self.events.clear();
        self.parser.reset();
        self.notify_on_disconnect(&error);
        error
    }

    //
    // Negotiation
    //

    fn process_event(&mut self, event: StreamEvent) -> Result<(), ConnectionError> {
        match event {
            StreamEvent::StreamOpen(tag) => {
                self.handle_stream_open(tag);
                Ok(())
            }
            StreamEvent::Stanza(tag) => {
                if tag.name() == STREAM_ERROR_TAG {
                    return Err(self.handle_stream_error(tag));
                }
                if self.state == ConnectionState::Authenticated {
                    self.dispatch(tag);
                    Ok(())
                } else {
                    self.handle_handshake_tag(tag)
                }
            }
            StreamEvent::StreamClose => Err(self.teardown(ConnectionError::StreamClosed)),
        }
    }

    fn handle_stream_open(&mut self, tag: Tag) {
        self.stream_id = tag.find_attribute("id").unwrap_or_default().to_string();
        let version_ok = tag
            .find_attribute("version")
            .is_some_and(stream_version_ok);
        tracing::debug!(
            "stream open, id '{}', version ok: {version_ok}",
            self.stream_id
        );
        if !self.authed && (self.force_non_sasl || !version_ok) {
            // Pre-1.0 servers send no features; log in the old way
            self.start_non_sasl_auth();
        } else {
            self.state = ConnectionState::StreamOpened;
        }
    }

    fn handle_handshake_tag(&mut self, tag: Tag) -> Result<(), ConnectionError> {
        match self.state {
            ConnectionState::StreamOpened => self.handle_features(tag),
            ConnectionState::TlsNegotiating => self.handle_tls_tag(tag),
            ConnectionState::SaslNegotiating => self.handle_auth_tag(tag),
            ConnectionState::Binding | ConnectionState::SessionEstablishing => {
                self.handle_session_iq(tag);
                Ok(())
            }
            _ => {
                tracing::debug!("ignoring <{}/> in state {:?}", tag.name(), self.state);
                Ok(())
            }
        }
    }

    fn handle_features(&mut self, tag: Tag) -> Result<(), ConnectionError> {
        if tag.name() != FEATURES_TAG {
            tracing::debug!("expected stream features, got <{}/>", tag.name());
            return Ok(());
        }
        let starttls = tag
            .find_child_by("starttls", "xmlns", Some(XMLNS_STREAM_TLS))
            .is_some();
        let mechanisms: Vec<String> = tag
            .find_child_by("mechanisms", "xmlns", Some(XMLNS_STREAM_SASL))
            .map(|child| {
                child
                    .children()
                    .iter()
                    .filter(|mechanism| mechanism.name() == "mechanism")
                    .map(|mechanism| mechanism.cdata().to_string())
                    .collect()
            })
            .unwrap_or_default();
        let bind = tag
            .find_child_by("bind", "xmlns", Some(XMLNS_STREAM_BIND))
            .is_some();
        let session = tag
            .find_child_by("session", "xmlns", Some(XMLNS_STREAM_SESSION))
            .is_some();

        if starttls && self.tls && !self.connection.is_secure() {
            let mut request = Tag::new("starttls");
            request.add_attribute("xmlns", XMLNS_STREAM_TLS);
            self.send_tag(&request);
            self.state = ConnectionState::TlsNegotiating;
            return Ok(());
        }

        if !self.authed {
            if self.force_non_sasl {
                self.start_non_sasl_auth();
                return Ok(());
            }
            if !self.sasl || mechanisms.is_empty() {
                return Err(self.teardown(ConnectionError::NoSupportedAuth));
            }
            let have_password = !self.password.is_empty();
            let Some(mechanism) = sasl::select_mechanism(&mechanisms, have_password) else {
                return Err(self.teardown(ConnectionError::NoSupportedAuth));
            };
            tracing::debug!("authenticating with {}", mechanism.name());
            let response = match mechanism {
                sasl::SaslMechanism::Plain => Some(sasl::plain_response(
                    self.jid.localpart().unwrap_or_default(),
                    &self.password,
                )),
                _ => None,
            };
            self.send_tag(&sasl::auth_tag(mechanism, response));
            self.state = ConnectionState::SaslNegotiating;
            return Ok(());
        }

        if bind {
            self.session_required = session;
            self.send_bind();
        } else {
            self.finish_handshake();
        }
        Ok(())
    }

    fn handle_tls_tag(&mut self, tag: Tag) -> Result<(), ConnectionError> {
        match tag.name() {
            "proceed" => {
                let domain = self.jid.domainpart().to_string();
                let info = match self.connection.start_tls(&domain, &self.ca_certs) {
                    Ok(info) => info,
                    Err(error) => return Err(self.teardown(error)),
                };
                tracing::debug!("TLS established: {} {}", info.protocol, info.cipher);
                if !self.notify_on_tls_connect(&info) {
                    tracing::debug!("certificate rejected by a listener");
                    return Err(self.teardown(ConnectionError::TlsFailed));
                }
                self.restart_stream();
                Ok(())
            }
            "failure" => Err(self.teardown(ConnectionError::TlsFailed)),
            _ => Ok(()),
        }
    }

    fn handle_auth_tag(&mut self, tag: Tag) -> Result<(), ConnectionError> {
        if tag.name() == "iq" {
            if !self.auth_id.is_empty()
                && tag.find_attribute("id") == Some(self.auth_id.as_str())
            {
                return self.handle_non_sasl_reply(&tag);
            }
            return Ok(());
        }
        match tag.name() {
            "success" => {
                self.authed = true;
                self.restart_stream();
                Ok(())
            }
            "failure" => {
                self.auth_error = Some(sasl::failure_error(&tag));
                Err(self.teardown(ConnectionError::AuthenticationFailed))
            }
            "challenge" => {
                // None of the built-in mechanisms has a challenge step
                let mut abort = Tag::new("abort");
                abort.add_attribute("xmlns", XMLNS_STREAM_SASL);
                self.send_tag(&abort);
                self.auth_error = Some(AuthenticationError::SaslAborted);
                Err(self.teardown(ConnectionError::AuthenticationFailed))
            }
            _ => Ok(()),
        }
    }

    fn start_non_sasl_auth(&mut self) {
        let id = self.new_id();
        self.auth_id = id.clone();
        let mut iq = Tag::new("iq");
        iq.add_attribute("type", "set");
        iq.add_attribute("id", id);
        let query = iq.add_child(Tag::new("query"));
        query.add_attribute("xmlns", XMLNS_AUTH);
        query.add_child(Tag::with_cdata(
            "username",
            self.jid.localpart().unwrap_or_default(),
        ));
        query.add_child(Tag::with_cdata("password", self.password.clone()));
        query.add_child(Tag::with_cdata(
            "resource",
            self.jid.resourcepart().unwrap_or("ikstream"),
        ));
        self.send_tag(&iq);
        self.state = ConnectionState::SaslNegotiating;
    }

    fn handle_non_sasl_reply(&mut self, tag: &Tag) -> Result<(), ConnectionError> {
        self.auth_id.clear();
        match tag.find_attribute("type") {
            Some("result") => {
                self.authed = true;
                self.finish_handshake();
                Ok(())
            }
            _ => {
                let error = tag.find_child("error").map(StanzaError::from_tag);
                self.auth_error = Some(match error.map(|e| e.condition) {
                    Some(StanzaErrorCondition::NotAcceptable) => {
                        AuthenticationError::NonSaslNotAcceptable
                    }
                    Some(StanzaErrorCondition::Conflict) => AuthenticationError::NonSaslConflict,
                    _ => AuthenticationError::NonSaslNotAuthorized,
                });
                Err(self.teardown(ConnectionError::AuthenticationFailed))
            }
        }
    }

    fn send_bind(&mut self) {
        let id = self.new_id();
        self.bind_id = id.clone();
        let mut iq = Tag::new("iq");
        iq.add_attribute("type", "set");
        iq.add_attribute("id", id);
        let bind = iq.add_child(Tag::new("bind"));
        bind.add_attribute("xmlns", XMLNS_STREAM_BIND);
        if let Some(resource) = self.jid.resourcepart() {
            bind.add_child(Tag::with_cdata("resource", resource));
        }
        self.send_tag(&iq);
        self.state = ConnectionState::Binding;
    }

    fn send_session(&mut self) {
        let id = self.new_id();
        self.session_id = id.clone();
        let mut iq = Tag::new("iq");
        iq.add_attribute("type", "set");
        iq.add_attribute("id", id);
        let session = iq.add_child(Tag::new("session"));
        session.add_attribute("xmlns", XMLNS_STREAM_SESSION);
        self.send_tag(&iq);
        self.state = ConnectionState::SessionEstablishing;
    }

    fn handle_session_iq(&mut self, tag: Tag) {
        if tag.name() != "iq" {
            return;
        }
        let id = tag.find_attribute("id").unwrap_or_default();
        if self.state == ConnectionState::Binding && id == self.bind_id {
            match tag.find_attribute("type") {
                Some("result") => {
                    if let Some(bound) = tag
                        .find_child_by("bind", "xmlns", Some(XMLNS_STREAM_BIND))
                        .and_then(|bind| bind.child_cdata("jid"))
                        && let Ok(jid) = Jid::new(bound)
                    {
                        tracing::debug!("bound as {jid}");
                        self.jid = jid;
                    }
                    if self.session_required {
                        self.send_session();
                    } else {
                        self.finish_handshake();
                    }
                }
                _ => {
                    let error = tag.find_child("error").map(StanzaError::from_tag);
                    self.notify_on_resource_bind_error(error.as_ref());
                }
            }
        } else if self.state == ConnectionState::SessionEstablishing && id == self.session_id {
            match tag.find_attribute("type") {
                Some("result") => self.finish_handshake(),
                _ => {
                    let error = tag.find_child("error").map(StanzaError::from_tag);
                    self.notify_on_session_create_error(error.as_ref());
                }
            }
        }
    }

    fn finish_handshake(&mut self) {
        self.state = ConnectionState::Authenticated;
        tracing::debug!("session established as {}", self.jid);
        self.notify_on_connect();
    }

    //
    // Dispatch
    //

    fn dispatch(&mut self, tag: Tag) {
        let stanza = Stanza::from_tag(tag, &self.registry);
        let mut context = Context::new(self.id_count);
        let mut handled = false;

        // Tracked replies come first and are one-shot
        if stanza.kind() == StanzaKind::Iq && !stanza.id().is_empty() {
            if let Some(pos) = self
                .iq_id_handlers
                .iter()
                .position(|entry| entry.0 == stanza.id())
            {
                let (_, mut handler, user_context) = self.iq_id_handlers.remove(pos);
                handler.handle_iq_id(&mut context, &stanza, user_context);
                handled = true;
            }
        }

        match stanza.kind() {
            StanzaKind::Iq => {
                for (xmlns, handler) in self.iq_ns_handlers.iter_mut() {
                    if !iq_matches_namespace(&stanza, xmlns) {
                        continue;
                    }
                    if handler.handle_iq(&mut context, &stanza) {
                        handled = true;
                        break;
                    }
                }
            }
            StanzaKind::Message => {
                for (_, handler) in self.message_handlers.iter_mut() {
                    handler.handle_message(&mut context, &stanza);
                }
            }
            StanzaKind::Presence => {
                if stanza.is_subscription() {
                    for (_, handler) in self.subscription_handlers.iter_mut() {
                        handler.handle_subscription(&mut context, &stanza);
                    }
                } else {
                    for (_, handler) in self.presence_handlers.iter_mut() {
                        handler.handle_presence(&mut context, &stanza);
                    }
                }
            }
            StanzaKind::Unknown => {}
        }

        for (_, name, xmlns, handler) in self.tag_handlers.iter_mut() {
            if let Some(child) = stanza
                .tag()
                .find_child_by(name.as_str(), "xmlns", Some(xmlns.as_str()))
            {
                handler.handle_tag(&mut context, child);
            }
        }

        // The auto reply goes out last so that every handler observing
        // this stanza gets its own sends queued first
        let queryable = matches!(
            stanza.subtype(),
            StanzaSubType::IqGet | StanzaSubType::IqSet
        );
        if !handled && queryable {
            context.send_tag(&service_unavailable_reply(&stanza));
        }

        self.absorb_context(context);
    }

    fn absorb_context(&mut self, context: Context) {
        self.id_count = context.id_count;
        for entry in context.tracked {
            self.iq_id_handlers.push(entry);
        }
        for xml in context.outbox {
            self.send_raw(&xml);
        }
        if context.disconnect_requested {
            self.disconnecting = true;
        }
    }

    //
    // Stream errors
    //

    fn handle_stream_error(&mut self, tag: Tag) -> ConnectionError {
        self.stream_error = Some(StreamErrorCondition::UndefinedCondition);
        self.stream_error_text.clear();
        self.stream_error_cdata.clear();
        self.stream_error_app_condition = None;
        for child in tag.children() {
            let xmlns = child.xmlns();
            if xmlns.is_some() && xmlns != Some(XMLNS_XMPP_STREAMS) {
                self.stream_error_app_condition = Some(child.clone());
                continue;
            }
            if child.name() == "text" {
                let lang = child
                    .find_attribute("xml:lang")
                    .unwrap_or_default()
                    .to_string();
                self.stream_error_text.push((lang, child.cdata().to_string()));
            } else if let Some(condition) = StreamErrorCondition::from_element_name(child.name()) {
                if condition == StreamErrorCondition::SeeOtherHost {
                    self.stream_error_cdata = child.cdata().to_string();
                }
                self.stream_error = Some(condition);
            }
        }
        tracing::debug!("stream error: {:?}", self.stream_error);
        self.teardown(ConnectionError::StreamError)
    }

    //
    // Notifications
    //

    fn notify_on_connect(&mut self) {
        let mut context = Context::new(self.id_count);
        for (_, listener) in self.connection_listeners.iter_mut() {
            listener.on_connect(&mut context);
        }
        self.absorb_context(context);
    }

    fn notify_on_disconnect(&mut self, error: &ConnectionError) {
        for (_, listener) in self.connection_listeners.iter_mut() {
            listener.on_disconnect(error);
        }
    }

    fn notify_on_tls_connect(&mut self, info: &CertInfo) -> bool {
        let mut accepted = true;
        for (_, listener) in self.connection_listeners.iter_mut() {
            accepted &= listener.on_tls_connect(info);
        }
        accepted
    }

    fn notify_on_resource_bind_error(&mut self, error: Option<&StanzaError>) {
        for (_, listener) in self.connection_listeners.iter_mut() {
            listener.on_resource_bind_error(error);
        }
    }

    fn notify_on_session_create_error(&mut self, error: Option<&StanzaError>) {
        for (_, listener) in self.connection_listeners.iter_mut() {
            listener.on_session_create_error(error);
        }
    }

    fn log(&mut self, direction: LogDirection, xml: &str) {
        for (_, handler) in self.log_handlers.iter_mut() {
            handler.handle_log(direction, xml);
        }
    }

    //
    // Handler registry
    //

    fn next_handler_id(&mut self) -> HandlerId {
        self.handler_id_count += 1;
        self.handler_id_count
    }

    pub fn register_connection_listener(
        &mut self,
        listener: Box<dyn ConnectionListener>,
    ) -> HandlerId {
        let id = self.next_handler_id();
        self.connection_listeners.push((id, listener));
        id
    }

    pub fn remove_connection_listener(&mut self, id: HandlerId) {
        self.connection_listeners.retain(|entry| entry.0 != id);
    }

    /// Registers the IQ handler for a payload namespace. Only one
    /// handler per namespace is possible; a second registration
    /// replaces the first.
    pub fn register_iq_handler(&mut self, xmlns: &str, handler: Box<dyn IqHandler>) {
        for entry in self.iq_ns_handlers.iter_mut() {
            if entry.0 == xmlns {
                entry.1 = handler;
                return;
            }
        }
        self.iq_ns_handlers.push((xmlns.to_string(), handler));
    }

    pub fn remove_iq_handler(&mut self, xmlns: &str) {
        self.iq_ns_handlers.retain(|entry| entry.0 != xmlns);
    }

    /// Tracks an ID: the handler is notified once when a reply with
    /// this ID arrives, together with the given value.
    pub fn track_id(&mut self, id: &str, handler: Box<dyn IqHandler>, user_context: i32) {
        self.iq_id_handlers
            .push((id.to_string(), handler, user_context));
    }

    /// Drops a tracked ID, for example when a request timed out.
    pub fn remove_tracked_id(&mut self, id: &str) {
        self.iq_id_handlers.retain(|entry| entry.0 != id);
    }

    pub fn register_message_handler(&mut self, handler: Box<dyn MessageHandler>) -> HandlerId {
        let id = self.next_handler_id();
        self.message_handlers.push((id, handler));
        id
    }

    pub fn remove_message_handler(&mut self, id: HandlerId) {
        self.message_handlers.retain(|entry| entry.0 != id);
    }

    pub fn register_presence_handler(&mut self, handler: Box<dyn PresenceHandler>) -> HandlerId {
        let id = self.next_handler_id();
        self.presence_handlers.push((id, handler));
        id
    }

    pub fn remove_presence_handler(&mut self, id: HandlerId) {
        self.presence_handlers.retain(|entry| entry.0 != id);
    }

    pub fn register_subscription_handler(
        &mut self,
        handler: Box<dyn SubscriptionHandler>,
    ) -> HandlerId {
        let id = self.next_handler_id();
        self.subscription_handlers.push((id, handler));
        id
    }

    pub fn remove_subscription_handler(&mut self, id: HandlerId) {
        self.subscription_handlers.retain(|entry| entry.0 != id);
    }

    /// Registers a handler for stanzas carrying a child with the given
    /// element name and namespace. The handler receives the child.
    pub fn register_tag_handler(
        &mut self,
        tag: &str,
        xmlns: &str,
        handler: Box<dyn TagHandler>,
    ) -> HandlerId {
        let id = self.next_handler_id();
        self.tag_handlers
            .push((id, tag.to_string(), xmlns.to_string(), handler));
        id
    }

    pub fn remove_tag_handler(&mut self, id: HandlerId) {
        self.tag_handlers.retain(|entry| entry.0 != id);
    }

    pub fn register_log_handler(&mut self, handler: Box<dyn LogHandler>) -> HandlerId {
        let id = self.next_handler_id();
        self.log_handlers.push((id, handler));
        id
    }

    pub fn remove_log_handler(&mut self, id: HandlerId) {
        self.log_handlers.retain(|entry| entry.0 != id);
    }

    //
    // Accessors
    //

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn authed(&self) -> bool {
        self.authed
    }

    /// The current address; after binding this is the server-assigned
    /// full JID.
    pub fn jid(&self) -> &Jid {
        &self.jid
    }

    /// The stream ID assigned by the server.
    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub fn tls(&self) -> bool {
        self.tls
    }

    pub fn sasl(&self) -> bool {
        self.sasl
    }

    pub fn compression(&self) -> bool {
        self.compression
    }

    pub fn xml_lang(&self) -> &str {
        &self.xml_lang
    }

    /// The extension registry decorating inbound stanzas.
    pub fn registry_mut(&mut self) -> &mut ExtensionRegistry {
        &mut self.registry
    }

    /// The stream error condition after a `StreamError` disconnect.
    pub fn stream_error(&self) -> Option<StreamErrorCondition> {
        self.stream_error
    }

    /// The stream error text for the given language, falling back to
    /// the text without a language attribute.
    pub fn stream_error_text(&self, lang: &str) -> Option<&str> {
        self.stream_error_text
            .iter()
            .find(|entry| entry.0 == lang)
            .or_else(|| self.stream_error_text.iter().find(|entry| entry.0.is_empty()))
            .map(|entry| entry.1.as_str())
    }

    /// The character data of a see-other-host stream error.
    pub fn stream_error_cdata(&self) -> &str {
        &self.stream_error_cdata
    }

    /// The application-defined condition of a stream error, if any.
    pub fn stream_error_app_condition(&self) -> Option<&Tag> {
        self.stream_error_app_condition.as_ref()
    }

    /// The authentication error after an `AuthenticationFailed`
    /// disconnect.
    pub fn auth_error(&self) -> Option<AuthenticationError> {
        self.auth_error
    }
}
