/*
** This file is a part of Ikstream (XMPP client engine for Jabber/XMPP)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::env;
use std::process::ExitCode;

use rpassword::prompt_password;

use ikstream::Client;
use ikstream::ConnectionListener;
use ikstream::Context;
use ikstream::Jid;
use ikstream::LogDirection;
use ikstream::LogHandler;
use ikstream::MessageHandler;
use ikstream::Stanza;
use ikstream::StanzaSubType;

fn print_version() {
    println!("ikstalk (ikstream) v{}", ikstream::VERSION);
}

fn print_usage() {
    println!(concat!(
        "Usage: ikstalk [OPTIONS]\n",
        "This tool can communicate over XMPP.\n",
        "Options:\n",
        "  -j, --jid <JID>             Jabber ID\n",
        "  -s, --server <SERVER>       XMPP server override\n",
        "  -p, --password <ENVVARNAME> Environment variable with the password\n",
        "  -m, --message <JID> <BODY>  Send a message\n",
        "  -w, --watch                 Listen and print messages forever\n",
        "  -d, --debug                 Print XMPP traffic\n",
        "  -h, --help                  Display this help message and exit\n",
        "  -v, --version               Display the version and exit\n",
        "Report issues at https://github.com/meduketto/ikstream/issues"
    ));
}

struct MessageOptions {
    jid: Jid,
    body: String,
}

struct Talker {
    messages: Vec<MessageOptions>,
    watch: bool,
}

impl ConnectionListener for Talker {
    fn on_connect(&mut self, context: &mut Context) {
        context.send(Stanza::new_presence(StanzaSubType::PresenceAvailable, ""));
        for message in self.messages.drain(..) {
            context.send(Stanza::new_message(
                &message.jid,
                StanzaSubType::MessageChat,
                &message.body,
                "",
            ));
        }
        if !self.watch {
            context.disconnect();
        }
    }
}

struct Printer {}

impl MessageHandler for Printer {
    fn handle_message(&mut self, _context: &mut Context, stanza: &Stanza) {
        if let Some(body) = stanza.tag().child_cdata("body") {
            match stanza.from() {
                Some(from) => println!("{from}: {body}"),
                None => println!("{body}"),
            }
        }
    }
}

struct Debugger {}

impl LogHandler for Debugger {
    fn handle_log(&mut self, direction: LogDirection, xml: &str) {
        match direction {
            LogDirection::Incoming => println!("RECV {xml}"),
            LogDirection::Outgoing => println!("SEND {xml}"),
        }
    }
}

fn run(
    jid: Jid,
    server: Option<String>,
    password: String,
    messages: Vec<MessageOptions>,
    watch_mode: bool,
    debug: bool,
) -> Result<(), ikstream::ConnectionError> {
    let mut client = Client::build(jid, password).server(server).build();
    client.register_connection_listener(Box::new(Talker {
        messages,
        watch: watch_mode,
    }));
    if watch_mode {
        client.register_message_handler(Box::new(Printer {}));
    }
    if debug {
        client.register_log_handler(Box::new(Debugger {}));
    }
    client.connect(true)
}

fn get_password(var_name: Option<String>) -> Result<String, String> {
    if let Some(name) = &var_name {
        return match env::var(name) {
            Ok(value) => Ok(value),
            Err(err) => Err(format!(
                "Failed to get password from environment variable {}: {}",
                name, err
            )),
        };
    }
    if let Ok(password) = prompt_password("Jabber password: ") {
        Ok(password)
    } else {
        Err("Password not provided".to_string())
    }
}

fn main() -> ExitCode {
    let mut args = env::args();
    let mut jid: Option<Jid> = None;
    let mut server: Option<String> = None;
    let mut password_var: Option<String> = None;
    let mut messages: Vec<MessageOptions> = Vec::new();
    let mut debug = false;
    let mut watch_mode = false;

    // Skip the first argument (program name)
    args.next();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-j" | "--jid" => {
                if let Some(value) = args.next() {
                    jid = match Jid::new(&value) {
                        Ok(jid) => {
                            if jid.is_bare() {
                                Some(jid.with_resource("ikstalk").unwrap())
                            } else {
                                Some(jid)
                            }
                        }
                        Err(err) => {
                            eprintln!("Error: {}", err);
                            return ExitCode::FAILURE;
                        }
                    };
                } else {
                    eprintln!("Error: Jabber ID expected after {arg}");
                    return ExitCode::FAILURE;
                }
            }
            "-s" | "--server" => {
                if let Some(value) = args.next() {
                    server = Some(value);
                } else {
                    eprintln!("Error: Server address expected after {arg}");
                    return ExitCode::FAILURE;
                }
            }
            "-p" | "--password" => {
                if let Some(value) = args.next() {
                    password_var = Some(value);
                } else {
                    eprintln!("Error: Password environment variable expected after {arg}");
                    return ExitCode::FAILURE;
                }
            }
            "-m" | "--message" => {
                if let Some(jid_str) = args.next() {
                    let jid = match Jid::new(&jid_str) {
                        Ok(jid) => jid,
                        Err(err) => {
                            eprintln!("Error: Invalid JID: {}", err);
                            return ExitCode::FAILURE;
                        }
                    };
                    if let Some(body) = args.next() {
                        messages.push(MessageOptions { jid, body });
                    } else {
                        eprintln!("Error: Message body expected after {arg} <JID>");
                        return ExitCode::FAILURE;
                    }
                } else {
                    eprintln!("Error: Jid expected after {arg}");
                    return ExitCode::FAILURE;
                }
            }
            "-w" | "--watch" => {
                watch_mode = true;
            }
            "-d" | "--debug" => {
                debug = true;
            }
            "-h" | "--help" => {
                print_usage();
                return ExitCode::SUCCESS;
            }
            "-v" | "--version" => {
                print_version();
                return ExitCode::SUCCESS;
            }
            _ => {}
        }
    }

    let Some(jid) = jid else {
        eprintln!("Error: Jabber ID not provided");
        return ExitCode::FAILURE;
    };
    let password = match get_password(password_var) {
        Ok(password) => password,
        Err(err) => {
            eprintln!("Error: {}", err);
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = run(jid, server, password, messages, watch_mode, debug) {
        eprintln!("Error: {}", err);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
