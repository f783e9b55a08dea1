/*
** This file is a part of Ikstream (XMPP client engine for Jabber/XMPP)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

mod client;
pub mod constants;
mod entities;
mod extension;
mod jid;
mod parser;
mod stanza;
mod tag;

pub use client::AuthenticationError;
pub use client::CERT_CN_MISMATCH;
pub use client::CERT_EXPIRED;
pub use client::CERT_INVALID;
pub use client::CERT_OK;
pub use client::CERT_REVOKED;
pub use client::CERT_SIGNER_UNKNOWN;
pub use client::CertInfo;
pub use client::Client;
pub use client::ClientBuilder;
pub use client::Connection;
pub use client::ConnectionError;
pub use client::ConnectionListener;
pub use client::ConnectionState;
pub use client::Context;
pub use client::HandlerId;
pub use client::IqHandler;
pub use client::LogDirection;
pub use client::LogHandler;
pub use client::MessageHandler;
pub use client::PresenceHandler;
pub use client::StreamErrorCondition;
pub use client::SubscriptionHandler;
pub use client::TagHandler;
pub use client::TcpConnection;

pub use extension::BadFilter;
pub use extension::ChatState;
pub use extension::ChatStateKind;
pub use extension::DiscoIdentity;
pub use extension::DiscoInfo;
pub use extension::DiscoItem;
pub use extension::DiscoItems;
pub use extension::ExtensionKind;
pub use extension::ExtensionRegistry;
pub use extension::Filter;
pub use extension::SoftwareVersion;
pub use extension::StanzaExtension;

pub use jid::BadJid;
pub use jid::Jid;

pub use parser::Location;
pub use parser::ParseError;
pub use parser::Parser;
pub use parser::StreamHandler;

pub use stanza::Stanza;
pub use stanza::StanzaError;
pub use stanza::StanzaErrorCondition;
pub use stanza::StanzaErrorType;
pub use stanza::StanzaKind;
pub use stanza::StanzaSubType;

pub use tag::Attribute;
pub use tag::Tag;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
