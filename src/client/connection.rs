/*
** This file is a part of Ikstream (XMPP client engine for Jabber/XMPP)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::io::Read;
use std::io::Write;
use std::net::SocketAddr;
use std::net::TcpStream;
use std::net::ToSocketAddrs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use rustls::RootCertStore;
use rustls::pki_types::CertificateDer;
use rustls::pki_types::pem::PemObject;
use webpki_roots::TLS_SERVER_ROOTS;

use super::error::ConnectionError;

pub const CERT_OK: u32 = 0;
pub const CERT_INVALID: u32 = 1;
pub const CERT_EXPIRED: u32 = 2;
pub const CERT_REVOKED: u32 = 4;
pub const CERT_CN_MISMATCH: u32 = 8;
pub const CERT_SIGNER_UNKNOWN: u32 = 16;

/// Details of a negotiated TLS session and its peer certificate.
#[derive(Clone, Debug, Default)]
pub struct CertInfo {
    /// Bitmask of the `CERT_` status constants.
    pub status: u32,
    pub issuer: String,
    pub subject: String,
    pub protocol: String,
    pub cipher: String,
    pub mac: String,
    pub compression: String,
    /// Start of the validity period, Unix seconds.
    pub date_from: i64,
    /// End of the validity period, Unix seconds.
    pub date_to: i64,
}

/// The transport a session runs on.
///
/// The client drives the transport from its poll thread only: bytes
/// are pulled with [recv()](Connection::recv) and pushed with
/// [send()](Connection::send). A transport which uses threads
/// internally must serialize the two directions itself and never call
/// back into the client while holding its locks.
pub trait Connection {
    fn connect(&mut self) -> Result<(), ConnectionError>;

    fn disconnect(&mut self);

    /// Writes the bytes out. Returns false when the transport cannot
    /// take data anymore.
    fn send(&mut self, bytes: &[u8]) -> bool;

    /// Waits up to the timeout for inbound bytes. An empty result
    /// means the timeout passed without data; a clean end of stream is
    /// the `StreamClosed` error.
    fn recv(&mut self, timeout: Option<Duration>) -> Result<Vec<u8>, ConnectionError>;

    /// Wraps the transport with TLS and reports the negotiated
    /// session.
    fn start_tls(
        &mut self,
        server_name: &str,
        ca_certs: &[PathBuf],
    ) -> Result<CertInfo, ConnectionError>;

    fn is_secure(&self) -> bool;
}

pub(super) fn need_port(host: &str) -> bool {
    // Rust resolver does require a port number but does NOT provide
    // a way to provide a default one :(
    let column_pos = host.rfind(':');
    let bracket_pos = host.find(']');
    match (column_pos, bracket_pos) {
        (None, None) | (None, Some(_)) => true,
        (Some(_), None) => false,
        (Some(column), Some(bracket)) => column < bracket,
    }
}

fn resolve_host_with_default_port(
    host: &str,
    default_port: u16,
) -> std::io::Result<std::vec::IntoIter<SocketAddr>> {
    if need_port(host) {
        (host, default_port).to_socket_addrs()
    } else {
        host.to_socket_addrs()
    }
}

const READ_BUFFER_SIZE: usize = 4096;

/// A plain TCP transport with an in-place TLS upgrade.
pub struct TcpConnection {
    host: String,
    default_port: u16,
    connect_timeout: Duration,
    tcp_stream: Option<TcpStream>,
    tls_stream: Option<rustls::StreamOwned<rustls::ClientConnection, TcpStream>>,
}

impl TcpConnection {
    /// Creates a transport for the given host. The host string may
    /// carry an explicit port; the given port is used otherwise.
    pub fn new(host: impl Into<String>, default_port: u16) -> TcpConnection {
        TcpConnection {
            host: host.into(),
            default_port,
            connect_timeout: Duration::from_secs(30),
            tcp_stream: None,
            tls_stream: None,
        }
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> TcpConnection {
        self.connect_timeout = timeout;
        self
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> std::io::Result<()> {
        if let Some(tcp) = &self.tcp_stream {
            tcp.set_read_timeout(timeout)?;
        } else if let Some(tls) = &self.tls_stream {
            tls.sock.set_read_timeout(timeout)?;
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if let Some(tcp) = &mut self.tcp_stream {
            tcp.read(buf)
        } else if let Some(tls) = &mut self.tls_stream {
            tls.read(buf)
        } else {
            Err(std::io::Error::other("no stream"))
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        if let Some(tcp) = &mut self.tcp_stream {
            tcp.write_all(buf)
        } else if let Some(tls) = &mut self.tls_stream {
            tls.write_all(buf)
        } else {
            Err(std::io::Error::other("no stream"))
        }
    }

    fn root_store(ca_certs: &[PathBuf]) -> RootCertStore {
        let mut roots = RootCertStore {
            roots: TLS_SERVER_ROOTS.into(),
        };
        for path in ca_certs {
            Self::add_pem_file(&mut roots, path);
        }
        roots
    }

    fn add_pem_file(roots: &mut RootCertStore, path: &Path) {
        let certs = match CertificateDer::pem_file_iter(path) {
            Ok(certs) => certs,
            Err(err) => {
                tracing::warn!("cannot read CA file {}: {err}", path.display());
                return;
            }
        };
        for cert in certs {
            match cert {
                Ok(cert) => {
                    if let Err(err) = roots.add(cert) {
                        tracing::warn!("rejected CA from {}: {err}", path.display());
                    }
                }
                Err(err) => {
                    tracing::warn!("bad certificate in {}: {err}", path.display());
                }
            }
        }
    }

    fn protocol_name(version: rustls::ProtocolVersion) -> &'static str {
        match version {
            rustls::ProtocolVersion::TLSv1_2 => "TLSv1.2",
            rustls::ProtocolVersion::TLSv1_3 => "TLSv1.3",
            rustls::ProtocolVersion::SSLv3 => "SSLv3",
            _ => "unknown",
        }
    }
}

impl Connection for TcpConnection {
    fn connect(&mut self) -> Result<(), ConnectionError> {
        let addrs = resolve_host_with_default_port(&self.host, self.default_port)?;
        for addr in addrs {
            tracing::debug!("connecting to {addr:?}");
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(tcp_stream) => {
                    self.tcp_stream = Some(tcp_stream);
                    return Ok(());
                }
                Err(err) => {
                    tracing::debug!("failed to connect to {addr:?}: {err}");
                }
            }
        }
        Err(ConnectionError::IoError(std::io::Error::other(
            "no address of the server accepted the connection",
        )))
    }

    fn disconnect(&mut self) {
        self.tcp_stream = None;
        self.tls_stream = None;
    }

    fn send(&mut self, bytes: &[u8]) -> bool {
        match self.write_all(bytes) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!("send failed: {err}");
                false
            }
        }
    }

    fn recv(&mut self, timeout: Option<Duration>) -> Result<Vec<u8>, ConnectionError> {
        if self.tcp_stream.is_none() && self.tls_stream.is_none() {
            return Err(ConnectionError::NotConnected);
        }
        self.set_read_timeout(timeout)?;
        let mut buf = [0u8; READ_BUFFER_SIZE];
        match self.read(&mut buf) {
            Ok(0) => Err(ConnectionError::StreamClosed),
            Ok(nr_read) => Ok(buf[..nr_read].to_vec()),
            Err(err) => match err.kind() {
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => Ok(Vec::new()),
                _ => Err(err.into()),
            },
        }
    }

    fn start_tls(
        &mut self,
        server_name: &str,
        ca_certs: &[PathBuf],
    ) -> Result<CertInfo, ConnectionError> {
        let config = rustls::ClientConfig::builder_with_provider(
            rustls::crypto::aws_lc_rs::default_provider().into(),
        )
        .with_safe_default_protocol_versions()?
        .with_root_certificates(Self::root_store(ca_certs))
        .with_no_client_auth();

        let server_name = server_name.to_owned().try_into()?;
        let mut conn = rustls::ClientConnection::new(Arc::new(config), server_name)?;
        let Some(mut tcp_stream) = self.tcp_stream.take() else {
            return Err(ConnectionError::NotConnected);
        };

        tcp_stream.set_read_timeout(None)?;
        while conn.is_handshaking() {
            conn.complete_io(&mut tcp_stream)?;
        }

        let mut info = CertInfo {
            status: CERT_OK,
            ..CertInfo::default()
        };
        if let Some(version) = conn.protocol_version() {
            info.protocol = Self::protocol_name(version).to_string();
        }
        if let Some(suite) = conn.negotiated_cipher_suite() {
            info.cipher = format!("{:?}", suite.suite());
        }

        self.tls_stream = Some(rustls::StreamOwned::new(conn, tcp_stream));
        Ok(info)
    }

    fn is_secure(&self) -> bool {
        self.tls_stream.is_some()
    }
}
