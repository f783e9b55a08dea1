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

#[test]
fn full_jid() {
    let jid = Jid::new("juliet@capulet.com/balcony").unwrap();
    assert_eq!(jid.full(), "juliet@capulet.com/balcony");
    assert_eq!(jid.bare(), "juliet@capulet.com");
    assert_eq!(jid.localpart(), Some("juliet"));
    assert_eq!(jid.domainpart(), "capulet.com");
    assert_eq!(jid.resourcepart(), Some("balcony"));
    assert!(!jid.is_bare());
}

#[test]
fn bare_jid() {
    let jid = Jid::new("juliet@capulet.com").unwrap();
    assert_eq!(jid.full(), "juliet@capulet.com");
    assert_eq!(jid.bare(), "juliet@capulet.com");
    assert_eq!(jid.resourcepart(), None);
    assert!(jid.is_bare());
}

#[test]
fn domain_only() {
    let jid = Jid::new("capulet.com").unwrap();
    assert_eq!(jid.localpart(), None);
    assert_eq!(jid.domainpart(), "capulet.com");
    assert_eq!(jid.resourcepart(), None);

    let jid = Jid::new("capulet.com/conference").unwrap();
    assert_eq!(jid.localpart(), None);
    assert_eq!(jid.domainpart(), "capulet.com");
    assert_eq!(jid.resourcepart(), Some("conference"));
}

#[test]
fn final_dot_is_removed() {
    let jid = Jid::new("juliet@capulet.com.").unwrap();
    assert_eq!(jid.domainpart(), "capulet.com");
}

#[test]
fn case_folding() {
    let jid = Jid::new("Juliet@Capulet.COM/Balcony").unwrap();
    assert_eq!(jid.full(), "juliet@capulet.com/Balcony");
    assert_eq!(jid.localpart(), Some("juliet"));
    assert_eq!(jid.domainpart(), "capulet.com");
    // The resource part keeps its case
    assert_eq!(jid.resourcepart(), Some("Balcony"));

    assert_eq!(
        Jid::new("JULIET@CAPULET.com/home").unwrap(),
        Jid::new("juliet@capulet.COM/home").unwrap(),
    );
    assert_ne!(
        Jid::new("juliet@capulet.com/home").unwrap(),
        Jid::new("juliet@capulet.com/Home").unwrap(),
    );
}

#[test]
fn with_resource() {
    let jid = Jid::new("juliet@capulet.com").unwrap();
    let jid = jid.with_resource("chamber").unwrap();
    assert_eq!(jid.full(), "juliet@capulet.com/chamber");

    // An existing resource is replaced
    let jid = jid.with_resource("balcony").unwrap();
    assert_eq!(jid.full(), "juliet@capulet.com/balcony");

    assert!(
        Jid::new("juliet@capulet.com")
            .unwrap()
            .with_resource("")
            .is_err()
    );
}

#[test]
fn bad_jids() {
    assert_eq!(Jid::new(""), Err(BadJid(description::DOMAIN_EMPTY)));
    assert_eq!(Jid::new("@capulet.com"), Err(BadJid(description::LOCAL_EMPTY)));
    assert_eq!(Jid::new("juliet@"), Err(BadJid(description::DOMAIN_EMPTY)));
    assert_eq!(
        Jid::new("juliet@capulet.com/"),
        Err(BadJid(description::RESOURCE_EMPTY))
    );

    let long = "x".repeat(1024);
    assert_eq!(
        Jid::new(&format!("{long}@capulet.com")),
        Err(BadJid(description::LOCAL_TOO_LONG))
    );
    assert_eq!(
        Jid::new(&long),
        Err(BadJid(description::DOMAIN_TOO_LONG))
    );
    assert_eq!(
        Jid::new(&format!("juliet@capulet.com/{long}")),
        Err(BadJid(description::RESOURCE_TOO_LONG))
    );
}

#[test]
fn display() {
    let jid = Jid::new("juliet@capulet.com/balcony").unwrap();
    assert_eq!(format!("{jid}"), "juliet@capulet.com/balcony");
}
