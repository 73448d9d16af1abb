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

//! Error types for the streaming channel client.

use std::time::Duration;

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Error types for the streaming channel client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// Host and port could not be resolved to any endpoint.
    #[error("Resolution error: {0}")]
    Resolution(String),
    /// No resolved endpoint accepted a TCP connection.
    #[error("Connect error: {0}")]
    Connect(String),
    /// The connect timer fired before setup completed; the pending attempt was cancelled.
    #[error("Connect timed out after {0:?}")]
    ConnectTimeout(Duration),
    /// TLS negotiation failed.
    #[error("TLS handshake error: {0}")]
    TlsHandshake(String),
    /// The WebSocket upgrade failed.
    #[error("Protocol handshake error: {0}")]
    ProtocolHandshake(String),
    /// Send or receive attempted outside the `Connected` state.
    #[error("Not connected")]
    NotConnected,
    /// Writing a frame failed.
    #[error("Write error: {0}")]
    Write(String),
    /// Reading a frame failed.
    #[error("Read error: {0}")]
    Read(String),
    /// No frame arrived within the configured read timeout.
    #[error("Read timed out after {0:?}")]
    ReadTimeout(Duration),
    /// The close handshake failed (recorded only, never returned from `disconnect`).
    #[error("Close error: {0}")]
    Close(String),
}

impl StreamError {
    /// Returns `true` if the error was raised while establishing a connection.
    #[must_use]
    pub const fn is_connect_failure(&self) -> bool {
        matches!(
            self,
            Self::Resolution(_)
                | Self::Connect(_)
                | Self::ConnectTimeout(_)
                | Self::TlsHandshake(_)
                | Self::ProtocolHandshake(_)
        )
    }

    /// Returns `true` if the error was caused by a connect or read timer firing.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::ConnectTimeout(_) | Self::ReadTimeout(_))
    }
}

impl From<tungstenite::Error> for StreamError {
    fn from(error: tungstenite::Error) -> Self {
        Self::Read(error.to_string())
    }
}

/// Result type alias for stream operations.
pub type StreamResult<T> = Result<T, StreamError>;
