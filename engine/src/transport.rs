// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Affero General Public License that can be found
// in the LICENSE file.

use std::io;
use std::pin::Pin;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::rustls::{self, OwnedTrustAnchor};
use tokio_rustls::{client::TlsStream, TlsConnector};

/// Which kind of transport a given connect attempt should create. The
/// public name for the internal secure-socket concept is `Tls`; there is
/// no separate `SecureSocket` variant exposed to callers.
#[derive(Clone, Debug)]
pub enum TransportKind {
    /// Caller already owns and manages a connected duplex byte stream; the
    /// engine never closes it.
    RawDevice,
    /// The engine opens and owns a plain TCP connection.
    Plain,
    /// The engine opens a TCP connection and owns performing the TLS
    /// handshake on top of it, using the platform's webpki root store.
    Tls { domain: String },
}

/// A transport the engine reads from and writes to. `RawDevice` wraps a
/// caller-supplied stream; `Plain` and `Tls` are opened and owned by the
/// engine itself and closed along with it.
pub enum Transport {
    RawDevice(Pin<Box<dyn AsyncReadWrite + Send>>),
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

/// Convenience trait object bound for caller-supplied duplex devices
/// (e.g. `tokio::io::DuplexStream` in tests, or any other AsyncRead + AsyncWrite).
pub trait AsyncReadWrite: AsyncRead + AsyncWrite {}
impl<T: AsyncRead + AsyncWrite> AsyncReadWrite for T {}

impl Transport {
    #[must_use]
    pub fn from_raw_device(device: impl AsyncRead + AsyncWrite + Send + 'static) -> Self {
        Self::RawDevice(Box::pin(device))
    }

    /// Opens a plain TCP connection to `hostname:port`.
    ///
    /// # Errors
    ///
    /// Returns an io error if the connection cannot be established.
    pub async fn connect_plain(hostname: &str, port: u16) -> io::Result<Self> {
        let socket = TcpStream::connect((hostname, port)).await?;
        Ok(Self::Plain(socket))
    }

    /// Opens a TCP connection to `hostname:port` and performs a TLS
    /// handshake using the platform's trusted webpki roots.
    ///
    /// # Errors
    ///
    /// Returns an io error if the TCP connection or the TLS handshake fails.
    pub async fn connect_tls(hostname: &str, port: u16) -> io::Result<Self> {
        let mut root_store = rustls::RootCertStore::empty();
        root_store.add_trust_anchors(webpki_roots::TLS_SERVER_ROOTS.iter().map(|ta| {
            OwnedTrustAnchor::from_subject_spki_name_constraints(
                ta.subject,
                ta.spki,
                ta.name_constraints,
            )
        }));
        let tls_config = rustls::ClientConfig::builder()
            .with_safe_defaults()
            .with_root_certificates(root_store)
            .with_no_client_auth();
        let connector = TlsConnector::from(Arc::new(tls_config));

        let socket = TcpStream::connect((hostname, port)).await?;
        let server_name = rustls::ServerName::try_from(hostname)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "invalid dns name"))?;
        let tls_socket = connector.connect(server_name, socket).await?;
        Ok(Self::Tls(Box::new(tls_socket)))
    }

    /// Reads whatever bytes are currently available into `buf`, appending
    /// rather than overwriting. Returns 0 on a clean transport close.
    pub async fn read_buf(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        let mut chunk = [0u8; 4096];
        let n = match self {
            Self::RawDevice(stream) => stream.read(&mut chunk).await?,
            Self::Plain(socket) => socket.read(&mut chunk).await?,
            Self::Tls(socket) => socket.read(&mut chunk).await?,
        };
        buf.extend_from_slice(&chunk[..n]);
        Ok(n)
    }

    pub async fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            Self::RawDevice(stream) => stream.write_all(buf).await,
            Self::Plain(socket) => socket.write_all(buf).await,
            Self::Tls(socket) => socket.write_all(buf).await,
        }
    }

    /// Flushes and shuts down the write half of an engine-owned transport.
    /// A `RawDevice` is never shut down here: the caller owns it and may
    /// still want to use it after this engine lets go of its reference.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        match self {
            Self::RawDevice(_) => Ok(()),
            Self::Plain(socket) => socket.shutdown().await,
            Self::Tls(socket) => socket.shutdown().await,
        }
    }

    #[must_use]
    pub const fn is_engine_owned(&self) -> bool {
        !matches!(self, Self::RawDevice(_))
    }
}
