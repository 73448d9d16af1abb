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

//! Connection lifecycle state for the streaming channel.
//!
//! Legal transitions:
//!
//! ```text
//! Disconnected --connect()--> Connecting --success--> Connected
//!                             Connecting --failure--> Disconnected
//! Connected --disconnect() / drop--> Disconnected
//! ```

use std::sync::atomic::{AtomicU8, Ordering};

use strum::{AsRefStr, Display};

/// The lifecycle state of a stream connection.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, AsRefStr, Display)]
pub enum ConnectionState {
    /// No transport is open.
    #[default]
    Disconnected = 0,
    /// A connection attempt is in flight.
    Connecting = 1,
    /// TLS and protocol handshakes completed on the current transport.
    Connected = 2,
}

impl ConnectionState {
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Converts a raw value back into a state, unknown values map to `Disconnected`.
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Connected,
            _ => Self::Disconnected,
        }
    }
}

/// Lock-free cell holding the authoritative [`ConnectionState`].
///
/// Writers must hold the client gate, readers never block.
#[derive(Debug, Default)]
pub(crate) struct AtomicConnectionState(AtomicU8);

impl AtomicConnectionState {
    pub(crate) fn load(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn store(&self, state: ConnectionState) {
        self.0.store(state.as_u8(), Ordering::Release);
    }
}
