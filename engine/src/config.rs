// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Affero General Public License that can be found
// in the LICENSE file.

use codec::utils::random_string;
use codec::QoS;

use crate::error::{Error, ErrorKind};

/// Last-will-and-testament configuration, published by the broker on the
/// client's behalf if the connection drops uncleanly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WillConfig {
    pub topic: String,
    pub message: Vec<u8>,
    pub qos: QoS,
    pub retain: bool,
}

/// Immutable snapshot of client configuration, consumed at
/// `connect_to_host()` time. Built with a builder-style setter chain.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    hostname: String,
    port: u16,
    client_id: String,
    protocol_version: u8,
    keep_alive: u16,
    clean_session: bool,
    will: Option<WillConfig>,
    username: Option<String>,
    password: Option<Vec<u8>>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            hostname: "127.0.0.1".to_string(),
            port: 1883,
            client_id: random_string(8),
            protocol_version: 4,
            keep_alive: 60,
            clean_session: true,
            will: None,
            username: None,
            password: None,
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn new(hostname: &str, port: u16) -> Self {
        Self {
            hostname: hostname.to_string(),
            port,
            ..Self::default()
        }
    }

    pub fn set_client_id(&mut self, client_id: &str) -> &mut Self {
        self.client_id = client_id.to_string();
        self
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Update protocol version.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if `version` is neither 3 nor 4.
    pub fn set_protocol_version(&mut self, version: u8) -> Result<&mut Self, Error> {
        if version != 3 && version != 4 {
            return Err(Error::new(
                ErrorKind::InvalidConfiguration,
                format!("unsupported protocol version {version}"),
            ));
        }
        self.protocol_version = version;
        Ok(self)
    }

    #[must_use]
    pub const fn protocol_version(&self) -> u8 {
        self.protocol_version
    }

    pub fn set_keep_alive(&mut self, keep_alive: u16) -> &mut Self {
        self.keep_alive = keep_alive;
        self
    }

    #[must_use]
    pub const fn keep_alive(&self) -> u16 {
        self.keep_alive
    }

    pub fn set_clean_session(&mut self, clean_session: bool) -> &mut Self {
        self.clean_session = clean_session;
        self
    }

    #[must_use]
    pub const fn clean_session(&self) -> bool {
        self.clean_session
    }

    /// Set the last-will-and-testament.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if `qos` is out of range (unreachable
    /// with this crate's `QoS` type, kept for parity with the wire-level
    /// validation CONNECT decoding performs).
    pub fn set_will(&mut self, will: WillConfig) -> Result<&mut Self, Error> {
        self.will = Some(will);
        Ok(self)
    }

    #[must_use]
    pub const fn will(&self) -> Option<&WillConfig> {
        self.will.as_ref()
    }

    pub fn set_username(&mut self, username: &str) -> &mut Self {
        self.username = Some(username.to_string());
        self
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn set_password(&mut self, password: &[u8]) -> &mut Self {
        self.password = Some(password.to_vec());
        self
    }

    #[must_use]
    pub fn password(&self) -> Option<&[u8]> {
        self.password.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unsupported_protocol_version() {
        let mut config = ClientConfig::new("localhost", 1883);
        assert!(config.set_protocol_version(5).is_err());
    }

    #[test]
    fn builder_chains() {
        let mut config = ClientConfig::new("localhost", 1883);
        config
            .set_client_id("abc")
            .set_keep_alive(60)
            .set_clean_session(true);
        assert_eq!(config.client_id(), "abc");
        assert_eq!(config.keep_alive(), 60);
    }
}
