// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2026 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! Configuration for streaming channel connections.
//!
//! Values are accepted as given: an empty host or a non-numeric port is not rejected here and
//! only surfaces later as a resolution failure during `connect()`.

use std::time::Duration;

/// Default request path for the protocol handshake.
pub const DEFAULT_PATH: &str = "/ws";

/// Default bound on the whole connection setup.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound on waiting for a single inbound frame.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for a streaming channel connection.
///
/// The configuration is moved into the client at construction and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamConfig {
    /// The server host name or IP address.
    pub host: String,
    /// The server port (e.g. "443").
    pub port: String,
    /// The request path for the protocol handshake (default `/ws`).
    pub path: String,
    /// Whether the server certificate chain is verified (default `true`).
    pub verify_certificate: bool,
    /// Whether the connection is wrapped in TLS (default `true`).
    pub use_tls: bool,
    /// The bound on resolution, TCP connect, TLS and protocol handshakes together.
    pub connect_timeout: Duration,
    /// The bound on waiting for a single inbound frame, `None` waits indefinitely.
    pub read_timeout: Option<Duration>,
}

impl StreamConfig {
    /// Creates a new [`StreamConfig`] for `host` and `port` with default settings.
    #[must_use]
    pub fn new(host: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: port.into(),
            path: DEFAULT_PATH.to_string(),
            verify_certificate: true,
            use_tls: true,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: Some(DEFAULT_READ_TIMEOUT),
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    #[must_use]
    pub const fn with_verify_certificate(mut self, verify: bool) -> Self {
        self.verify_certificate = verify;
        self
    }

    #[must_use]
    pub const fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Returns the URL scheme implied by the TLS setting.
    #[must_use]
    pub const fn scheme(&self) -> &'static str {
        if self.use_tls { "wss" } else { "ws" }
    }

    /// Returns the URL used for the protocol handshake request.
    #[must_use]
    pub fn url(&self) -> String {
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };

        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };

        format!("{}://{host}:{}{path}", self.scheme(), self.port)
    }
}
