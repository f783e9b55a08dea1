/*
** This file is a part of Ikstream (XMPP client engine for Jabber/XMPP)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use crate::constants::XMLNS_XMPP_STANZAS;
use crate::tag::Tag;

/// The error class of a stanza error, telling the recipient how to
/// react.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StanzaErrorType {
    /// Retry after providing credentials.
    Auth,
    /// Do not retry, the error cannot be remedied.
    Cancel,
    /// The request can proceed, the condition is only a warning.
    Continue,
    /// Retry after changing the data sent.
    Modify,
    /// Retry after waiting.
    Wait,
    Undefined,
}

impl StanzaErrorType {
    pub(crate) fn from_attribute(value: &str) -> StanzaErrorType {
        match value {
            "auth" => StanzaErrorType::Auth,
            "cancel" => StanzaErrorType::Cancel,
            "continue" => StanzaErrorType::Continue,
            "modify" => StanzaErrorType::Modify,
            "wait" => StanzaErrorType::Wait,
            _ => StanzaErrorType::Undefined,
        }
    }

    pub(crate) fn attribute(self) -> Option<&'static str> {
        match self {
            StanzaErrorType::Auth => Some("auth"),
            StanzaErrorType::Cancel => Some("cancel"),
            StanzaErrorType::Continue => Some("continue"),
            StanzaErrorType::Modify => Some("modify"),
            StanzaErrorType::Wait => Some("wait"),
            StanzaErrorType::Undefined => None,
        }
    }
}

impl std::fmt::Display for StanzaErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.attribute().unwrap_or("undefined"))
    }
}

/// The defined conditions of stanza errors.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StanzaErrorCondition {
    BadRequest,
    Conflict,
    FeatureNotImplemented,
    Forbidden,
    Gone,
    InternalServerError,
    ItemNotFound,
    JidMalformed,
    NotAcceptable,
    NotAllowed,
    NotAuthorized,
    PaymentRequired,
    RecipientUnavailable,
    Redirect,
    RegistrationRequired,
    RemoteServerNotFound,
    RemoteServerTimeout,
    ResourceConstraint,
    ServiceUnavailable,
    SubscriptionRequired,
    UndefinedCondition,
    UnexpectedRequest,
}

impl StanzaErrorCondition {
    pub(crate) fn from_element_name(name: &str) -> Option<StanzaErrorCondition> {
        match name {
            "bad-request" => Some(StanzaErrorCondition::BadRequest),
            "conflict" => Some(StanzaErrorCondition::Conflict),
            "feature-not-implemented" => Some(StanzaErrorCondition::FeatureNotImplemented),
            "forbidden" => Some(StanzaErrorCondition::Forbidden),
            "gone" => Some(StanzaErrorCondition::Gone),
            "internal-server-error" => Some(StanzaErrorCondition::InternalServerError),
            "item-not-found" => Some(StanzaErrorCondition::ItemNotFound),
            "jid-malformed" => Some(StanzaErrorCondition::JidMalformed),
            "not-acceptable" => Some(StanzaErrorCondition::NotAcceptable),
            "not-allowed" => Some(StanzaErrorCondition::NotAllowed),
            "not-authorized" => Some(StanzaErrorCondition::NotAuthorized),
            "payment-required" => Some(StanzaErrorCondition::PaymentRequired),
            "recipient-unavailable" => Some(StanzaErrorCondition::RecipientUnavailable),
            "redirect" => Some(StanzaErrorCondition::Redirect),
            "registration-required" => Some(StanzaErrorCondition::RegistrationRequired),
            "remote-server-not-found" => Some(StanzaErrorCondition::RemoteServerNotFound),
            "remote-server-timeout" => Some(StanzaErrorCondition::RemoteServerTimeout),
            "resource-constraint" => Some(StanzaErrorCondition::ResourceConstraint),
            "service-unavailable" => Some(StanzaErrorCondition::ServiceUnavailable),
            "subscription-required" => Some(StanzaErrorCondition::SubscriptionRequired),
            "undefined-condition" => Some(StanzaErrorCondition::UndefinedCondition),
            "unexpected-request" => Some(StanzaErrorCondition::UnexpectedRequest),
            _ => None,
        }
    }

    pub(crate) fn element_name(self) -> &'static str {
        match self {
            StanzaErrorCondition::BadRequest => "bad-request",
            StanzaErrorCondition::Conflict => "conflict",
            StanzaErrorCondition::FeatureNotImplemented => "feature-not-implemented",
            StanzaErrorCondition::Forbidden => "forbidden",
            StanzaErrorCondition::Gone => "gone",
            StanzaErrorCondition::InternalServerError => "internal-server-error",
            StanzaErrorCondition::ItemNotFound => "item-not-found",
            StanzaErrorCondition::JidMalformed => "jid-malformed",
            StanzaErrorCondition::NotAcceptable => "not-acceptable",
            StanzaErrorCondition::NotAllowed => "not-allowed",
            StanzaErrorCondition::NotAuthorized => "not-authorized",
            StanzaErrorCondition::PaymentRequired => "payment-required",
            StanzaErrorCondition::RecipientUnavailable => "recipient-unavailable",
            StanzaErrorCondition::Redirect => "redirect",
            StanzaErrorCondition::RegistrationRequired => "registration-required",
            StanzaErrorCondition::RemoteServerNotFound => "remote-server-not-found",
            StanzaErrorCondition::RemoteServerTimeout => "remote-server-timeout",
            StanzaErrorCondition::ResourceConstraint => "resource-constraint",
            StanzaErrorCondition::ServiceUnavailable => "service-unavailable",
            StanzaErrorCondition::SubscriptionRequired => "subscription-required",
            StanzaErrorCondition::UndefinedCondition => "undefined-condition",
            StanzaErrorCondition::UnexpectedRequest => "unexpected-request",
        }
    }
}

impl std::fmt::Display for StanzaErrorCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.element_name())
    }
}

/// A structured stanza level error.
#[derive(Debug)]
pub struct StanzaError {
    pub error_type: StanzaErrorType,
    pub condition: StanzaErrorCondition,
    texts: Vec<(String, String)>,
    pub app_condition: Option<Tag>,
}

impl StanzaError {
    pub fn new(error_type: StanzaErrorType, condition: StanzaErrorCondition) -> StanzaError {
        StanzaError {
            error_type,
            condition,
            texts: Vec::new(),
            app_condition: None,
        }
    }

    pub fn from_tag(tag: &Tag) -> StanzaError {
        let error_type = match tag.find_attribute("type") {
            Some(value) => StanzaErrorType::from_attribute(value),
            None => StanzaErrorType::Undefined,
        };
        let mut error = StanzaError::new(error_type, StanzaErrorCondition::UndefinedCondition);
        for child in tag.children() {
            if child.xmlns() == Some(XMLNS_XMPP_STANZAS) {
                if child.name() == "text" {
                    let lang = child.find_attribute("xml:lang").unwrap_or_default();
                    error.add_text(lang, child.cdata());
                } else if let Some(condition) =
                    StanzaErrorCondition::from_element_name(child.name())
                {
                    error.condition = condition;
                }
            } else {
                // An application specific condition
                error.app_condition = Some(child.clone());
            }
        }
        error
    }

    pub fn add_text(&mut self, lang: &str, text: &str) {
        for entry in self.texts.iter_mut() {
            if entry.0 == lang {
                entry.1 = text.to_string();
                return;
            }
        }
        self.texts.push((lang.to_string(), text.to_string()));
    }

    /// Returns the descriptive text for the given language, falling
    /// back to the text without a language attribute.
    pub fn text(&self, lang: &str) -> Option<&str> {
        self.texts
            .iter()
            .find(|entry| entry.0 == lang)
            .or_else(|| self.texts.iter().find(|entry| entry.0.is_empty()))
            .map(|entry| entry.1.as_str())
    }

    pub fn tag(&self) -> Tag {
        let mut error = Tag::new("error");
        if let Some(error_type) = self.error_type.attribute() {
            error.add_attribute("type", error_type);
        }
        let condition = error.add_child(Tag::new(self.condition.element_name()));
        condition.add_attribute("xmlns", XMLNS_XMPP_STANZAS);
        for (lang, text) in &self.texts {
            let child = error.add_child(Tag::with_cdata("text", text.clone()));
            child.add_attribute("xmlns", XMLNS_XMPP_STANZAS);
            child.add_attribute("xml:lang", lang.clone());
        }
        if let Some(app_condition) = &self.app_condition {
            error.add_child(app_condition.clone());
        }
        error
    }
}
