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

//! Observability hooks for stream lifecycle events.

use std::fmt::Debug;

use strum::{AsRefStr, Display};

use super::{config::StreamConfig, error::StreamError};

/// The facade operation during which a fault occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum StreamOperation {
    Connect,
    Disconnect,
    Send,
    Receive,
}

/// Receives lifecycle notifications from a [`StreamClient`](super::StreamClient).
///
/// Hooks are invoked synchronously while the client gate is held and must not block.
pub trait StreamObserver: Debug + Send + Sync {
    /// Called after the TLS and protocol handshakes completed.
    fn on_connected(&self, _config: &StreamConfig) {}

    /// Called for every recorded fault, including suppressed close failures.
    fn on_fault(&self, _operation: StreamOperation, _error: &StreamError) {}

    /// Called when a connected client transitions back to `Disconnected`.
    fn on_disconnected(&self, _config: &StreamConfig) {}
}

/// Observer which logs lifecycle events through `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl StreamObserver for TracingObserver {
    fn on_connected(&self, config: &StreamConfig) {
        tracing::info!(url = %config.url(), "Stream connected");
    }

    fn on_fault(&self, operation: StreamOperation, error: &StreamError) {
        match error {
            StreamError::Close(_) => tracing::warn!(%operation, "{error}"),
            _ => tracing::error!(%operation, "{error}"),
        }
    }

    fn on_disconnected(&self, config: &StreamConfig) {
        tracing::info!(url = %config.url(), "Stream disconnected");
    }
}
