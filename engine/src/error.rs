// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Affero General Public License that can be found
// in the LICENSE file.

use std::fmt::{self, Display};
use std::io;

use codec::{DecodeError, EncodeError};

/// Error taxonomy for the connection engine (spec-level error handling
/// design): transport/handshake failures abort a connect attempt, protocol
/// errors tear down a live session, and `IdentifierUnknown` is a warning
/// that never touches connection state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// No transport was configured, or the transport failed to connect.
    TransportUnavailable,
    /// The TLS handshake did not complete.
    TlsHandshakeFailed,
    /// The broker returned a nonzero CONNACK return code.
    ConnectionRefused,
    /// Malformed header, unexpected packet for the current state, or an
    /// invalid field inside an otherwise well-framed packet.
    ProtocolError,
    /// A publish topic contained a wildcard, or a subscribe filter was
    /// rejected for exceeding the wire length limit.
    InvalidTopic,
    /// Unsupported protocol version, or an invalid will QoS.
    InvalidConfiguration,
    /// An ack packet named a packet identifier this engine has no record of.
    IdentifierUnknown,
    /// `unsubscribe()` was called, while connected, for a filter this
    /// engine has no subscription recorded for.
    UnknownSubscription,
}

#[derive(Clone, Debug)]
pub struct Error {
    kind: ErrorKind,
    message: String,
}

impl Error {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::new(ErrorKind::TransportUnavailable, format!("io error: {err}"))
    }
}

impl From<EncodeError> for Error {
    fn from(err: EncodeError) -> Self {
        Self::new(ErrorKind::ProtocolError, format!("encode error: {err}"))
    }
}

impl From<DecodeError> for Error {
    fn from(err: DecodeError) -> Self {
        Self::new(ErrorKind::ProtocolError, format!("decode error: {err}"))
    }
}

impl From<codec::topic::TopicError> for Error {
    fn from(err: codec::topic::TopicError) -> Self {
        Self::new(ErrorKind::InvalidTopic, format!("{err:?}"))
    }
}
