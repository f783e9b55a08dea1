/*
** This file is a part of Ikstream (XMPP client engine for Jabber/XMPP)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::error::Error;
use std::fmt::Display;

use crate::parser::ParseError;

/// Why a connection ended or cannot proceed.
///
/// The details behind `StreamError` and `AuthenticationFailed` stay on
/// the client and are available through the
/// [stream_error()](crate::Client::stream_error) and
/// [auth_error()](crate::Client::auth_error) accessors after the
/// listeners have been notified.
#[derive(Debug)]
pub enum ConnectionError {
    NotConnected,
    IoError(std::io::Error),
    StreamClosed,
    StreamError,
    AuthenticationFailed,
    TlsFailed,
    UserDisconnected,
    NoSupportedAuth,
    ParseError(ParseError),
}

impl Display for ConnectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionError::NotConnected => write!(f, "not connected"),
            ConnectionError::IoError(err) => err.fmt(f),
            ConnectionError::StreamClosed => write!(f, "stream closed by the peer"),
            ConnectionError::StreamError => write!(f, "stream level error received"),
            ConnectionError::AuthenticationFailed => write!(f, "authentication failed"),
            ConnectionError::TlsFailed => write!(f, "TLS negotiation failed"),
            ConnectionError::UserDisconnected => write!(f, "disconnect requested"),
            ConnectionError::NoSupportedAuth => {
                write!(f, "no supported authentication mechanism offered")
            }
            ConnectionError::ParseError(err) => err.fmt(f),
        }
    }
}

impl Error for ConnectionError {}

impl From<std::io::Error> for ConnectionError {
    fn from(err: std::io::Error) -> Self {
        ConnectionError::IoError(err)
    }
}

impl From<ParseError> for ConnectionError {
    fn from(err: ParseError) -> Self {
        ConnectionError::ParseError(err)
    }
}

impl From<rustls::Error> for ConnectionError {
    fn from(err: rustls::Error) -> Self {
        tracing::debug!("TLS failure: {err}");
        ConnectionError::TlsFailed
    }
}

impl From<rustls::pki_types::InvalidDnsNameError> for ConnectionError {
    fn from(_err: rustls::pki_types::InvalidDnsNameError) -> Self {
        ConnectionError::TlsFailed
    }
}

/// The reason of a failed authentication exchange.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AuthenticationError {
    SaslAborted,
    SaslIncorrectEncoding,
    SaslInvalidAuthzid,
    SaslInvalidMechanism,
    SaslMalformedRequest,
    SaslMechanismTooWeak,
    SaslNotAuthorized,
    SaslTemporaryAuthFailure,
    NonSaslNotAcceptable,
    NonSaslNotAuthorized,
    NonSaslConflict,
}

impl Display for AuthenticationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            AuthenticationError::SaslAborted => "authentication exchange aborted",
            AuthenticationError::SaslIncorrectEncoding => "incorrect encoding in response",
            AuthenticationError::SaslInvalidAuthzid => "invalid authorization identity",
            AuthenticationError::SaslInvalidMechanism => "mechanism not supported by the server",
            AuthenticationError::SaslMalformedRequest => "malformed authentication request",
            AuthenticationError::SaslMechanismTooWeak => "mechanism too weak for this account",
            AuthenticationError::SaslNotAuthorized => "credentials not authorized",
            AuthenticationError::SaslTemporaryAuthFailure => "temporary authentication failure",
            AuthenticationError::NonSaslNotAcceptable => "legacy authentication not acceptable",
            AuthenticationError::NonSaslNotAuthorized => "legacy credentials not authorized",
            AuthenticationError::NonSaslConflict => "resource already in use",
        };
        f.write_str(text)
    }
}

impl Error for AuthenticationError {}

/// The defined conditions of stream level errors.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StreamErrorCondition {
    BadFormat,
    BadNamespacePrefix,
    Conflict,
    ConnectionTimeout,
    HostGone,
    HostUnknown,
    ImproperAddressing,
    InternalServerError,
    InvalidFrom,
    InvalidId,
    InvalidNamespace,
    InvalidXml,
    NotAuthorized,
    PolicyViolation,
    RemoteConnectionFailed,
    ResourceConstraint,
    RestrictedXml,
    SeeOtherHost,
    SystemShutdown,
    UndefinedCondition,
    UnsupportedEncoding,
    UnsupportedStanzaType,
    UnsupportedVersion,
    XmlNotWellFormed,
}

impl StreamErrorCondition {
    pub(super) fn from_element_name(name: &str) -> Option<StreamErrorCondition> {
        match name {
            "bad-format" => Some(StreamErrorCondition::BadFormat),
            "bad-namespace-prefix" => Some(StreamErrorCondition::BadNamespacePrefix),
            "conflict" => Some(StreamErrorCondition::Conflict),
            "connection-timeout" => Some(StreamErrorCondition::ConnectionTimeout),
            "host-gone" => Some(StreamErrorCondition::HostGone),
            "host-unknown" => Some(StreamErrorCondition::HostUnknown),
            "improper-addressing" => Some(StreamErrorCondition::ImproperAddressing),
            "internal-server-error" => Some(StreamErrorCondition::InternalServerError),
            "invalid-from" => Some(StreamErrorCondition::InvalidFrom),
            "invalid-id" => Some(StreamErrorCondition::InvalidId),
            "invalid-namespace" => Some(StreamErrorCondition::InvalidNamespace),
            "invalid-xml" => Some(StreamErrorCondition::InvalidXml),
            "not-authorized" => Some(StreamErrorCondition::NotAuthorized),
            "policy-violation" => Some(StreamErrorCondition::PolicyViolation),
            "remote-connection-failed" => Some(StreamErrorCondition::RemoteConnectionFailed),
            "resource-constraint" => Some(StreamErrorCondition::ResourceConstraint),
            "restricted-xml" => Some(StreamErrorCondition::RestrictedXml),
            "see-other-host" => Some(StreamErrorCondition::SeeOtherHost),
            "system-shutdown" => Some(StreamErrorCondition::SystemShutdown),
            "undefined-condition" => Some(StreamErrorCondition::UndefinedCondition),
            "unsupported-encoding" => Some(StreamErrorCondition::UnsupportedEncoding),
            "unsupported-stanza-type" => Some(StreamErrorCondition::UnsupportedStanzaType),
            "unsupported-version" => Some(StreamErrorCondition::UnsupportedVersion),
            "xml-not-well-formed" => Some(StreamErrorCondition::XmlNotWellFormed),
            _ => None,
        }
    }

    pub(super) fn element_name(self) -> &'static str {
        match self {
            StreamErrorCondition::BadFormat => "bad-format",
            StreamErrorCondition::BadNamespacePrefix => "bad-namespace-prefix",
            StreamErrorCondition::Conflict => "conflict",
            StreamErrorCondition::ConnectionTimeout => "connection-timeout",
            StreamErrorCondition::HostGone => "host-gone",
            StreamErrorCondition::HostUnknown => "host-unknown",
            StreamErrorCondition::ImproperAddressing => "improper-addressing",
            StreamErrorCondition::InternalServerError => "internal-server-error",
            StreamErrorCondition::InvalidFrom => "invalid-from",
            StreamErrorCondition::InvalidId => "invalid-id",
            StreamErrorCondition::InvalidNamespace => "invalid-namespace",
            StreamErrorCondition::InvalidXml => "invalid-xml",
            StreamErrorCondition::NotAuthorized => "not-authorized",
            StreamErrorCondition::PolicyViolation => "policy-violation",
            StreamErrorCondition::RemoteConnectionFailed => "remote-connection-failed",
            StreamErrorCondition::ResourceConstraint => "resource-constraint",
            StreamErrorCondition::RestrictedXml => "restricted-xml",
            StreamErrorCondition::SeeOtherHost => "see-other-host",
            StreamErrorCondition::SystemShutdown => "system-shutdown",
            StreamErrorCondition::UndefinedCondition => "undefined-condition",
            StreamErrorCondition::UnsupportedEncoding => "unsupported-encoding",
            StreamErrorCondition::UnsupportedStanzaType => "unsupported-stanza-type",
            StreamErrorCondition::UnsupportedVersion => "unsupported-version",
            StreamErrorCondition::XmlNotWellFormed => "xml-not-well-formed",
        }
    }
}

impl Display for StreamErrorCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.element_name())
    }
}
