/*
** This file is a part of Ikstream (XMPP client engine for Jabber/XMPP)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use super::error::AuthenticationError;
use crate::constants::XMLNS_STREAM_SASL;
use crate::tag::Tag;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) enum SaslMechanism {
    DigestMd5,
    Plain,
    Anonymous,
}

impl SaslMechanism {
    pub(super) fn name(self) -> &'static str {
        match self {
            SaslMechanism::DigestMd5 => "DIGEST-MD5",
            SaslMechanism::Plain => "PLAIN",
            SaslMechanism::Anonymous => "ANONYMOUS",
        }
    }
}

// Preference order per the protocol; DIGEST-MD5 needs a cryptography
// provider this crate does not ship, so selection falls through to the
// next offered mechanism.
const PREFERENCE: [SaslMechanism; 3] = [
    SaslMechanism::DigestMd5,
    SaslMechanism::Plain,
    SaslMechanism::Anonymous,
];

pub(super) fn select_mechanism(offered: &[String], have_password: bool) -> Option<SaslMechanism> {
    for mechanism in PREFERENCE {
        if !offered.iter().any(|name| name == mechanism.name()) {
            continue;
        }
        match mechanism {
            SaslMechanism::DigestMd5 => {
                tracing::debug!("skipping DIGEST-MD5, no mechanism provider");
            }
            SaslMechanism::Plain => {
                if have_password {
                    return Some(mechanism);
                }
            }
            SaslMechanism::Anonymous => return Some(mechanism),
        }
    }
    None
}

pub(super) fn plain_response(authcid: &str, password: &str) -> String {
    let mut credentials = Vec::with_capacity(authcid.len() + password.len() + 2);
    credentials.push(0);
    credentials.extend_from_slice(authcid.as_bytes());
    credentials.push(0);
    credentials.extend_from_slice(password.as_bytes());
    BASE64.encode(credentials)
}

pub(super) fn auth_tag(mechanism: SaslMechanism, response: Option<String>) -> Tag {
    let mut auth = match response {
        Some(response) => Tag::with_cdata("auth", response),
        None => Tag::new("auth"),
    };
    auth.add_attribute("xmlns", XMLNS_STREAM_SASL);
    auth.add_attribute("mechanism", mechanism.name());
    auth
}

pub(super) fn failure_error(failure: &Tag) -> AuthenticationError {
    for child in failure.children() {
        let error = match child.name() {
            "aborted" => AuthenticationError::SaslAborted,
            "incorrect-encoding" => AuthenticationError::SaslIncorrectEncoding,
            "invalid-authzid" => AuthenticationError::SaslInvalidAuthzid,
            "invalid-mechanism" => AuthenticationError::SaslInvalidMechanism,
            "malformed-request" => AuthenticationError::SaslMalformedRequest,
            "mechanism-too-weak" => AuthenticationError::SaslMechanismTooWeak,
            "not-authorized" => AuthenticationError::SaslNotAuthorized,
            "temporary-auth-failure" => AuthenticationError::SaslTemporaryAuthFailure,
            _ => continue,
        };
        return error;
    }
    AuthenticationError::SaslNotAuthorized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offered(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn selection_prefers_plain_over_anonymous() {
        let mechanisms = offered(&["ANONYMOUS", "PLAIN"]);
        assert_eq!(
            select_mechanism(&mechanisms, true),
            Some(SaslMechanism::Plain)
        );
        // Without a password only anonymous login is possible
        assert_eq!(
            select_mechanism(&mechanisms, false),
            Some(SaslMechanism::Anonymous)
        );
    }

    #[test]
    fn selection_skips_digest_md5() {
        let mechanisms = offered(&["DIGEST-MD5", "PLAIN"]);
        assert_eq!(
            select_mechanism(&mechanisms, true),
            Some(SaslMechanism::Plain)
        );
        assert_eq!(select_mechanism(&offered(&["DIGEST-MD5"]), true), None);
    }

    #[test]
    fn selection_needs_an_offer() {
        assert_eq!(select_mechanism(&offered(&["SCRAM-SHA-1"]), true), None);
        assert_eq!(select_mechanism(&[], true), None);
    }

    #[test]
    fn plain_response_encoding() {
        // RFC 4616 example: \0tim\0tanstaaftanstaaf
        assert_eq!(
            plain_response("tim", "tanstaaftanstaaf"),
            "AHRpbQB0YW5zdGFhZnRhbnN0YWFm"
        );
    }

    #[test]
    fn auth_tag_shape() {
        let tag = auth_tag(SaslMechanism::Plain, Some("AHgAeQ==".to_string()));
        assert_eq!(
            tag.xml(),
            "<auth xmlns='urn:ietf:params:xml:ns:xmpp-sasl' mechanism='PLAIN'>AHgAeQ==</auth>"
        );

        let tag = auth_tag(SaslMechanism::Anonymous, None);
        assert_eq!(
            tag.xml(),
            "<auth xmlns='urn:ietf:params:xml:ns:xmpp-sasl' mechanism='ANONYMOUS'/>"
        );
    }

    #[test]
    fn failure_mapping() {
        let mut failure = Tag::new("failure");
        failure.add_child(Tag::new("not-authorized"));
        assert_eq!(
            failure_error(&failure),
            AuthenticationError::SaslNotAuthorized
        );

        let mut failure = Tag::new("failure");
        failure.add_child(Tag::new("mechanism-too-weak"));
        assert_eq!(
            failure_error(&failure),
            AuthenticationError::SaslMechanismTooWeak
        );

        // An unknown condition maps to the generic refusal
        let mut failure = Tag::new("failure");
        failure.add_child(Tag::new("fancy-new-condition"));
        assert_eq!(
            failure_error(&failure),
            AuthenticationError::SaslNotAuthorized
        );
    }
}
