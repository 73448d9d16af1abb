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

//! Streaming channel client for real-time trading data.
//!
//! A [`StreamClient`] owns exactly one transport session and serializes every stateful
//! operation (connect, disconnect, send, receive) through a single gate. See
//! [`client`] for the lifecycle rules.

pub mod client;
pub mod config;
pub mod error;
pub mod observer;
pub mod state;
pub mod transport;

#[cfg(test)]
pub(crate) mod stubs;

pub use client::{Receipt, StreamClient};
pub use config::StreamConfig;
pub use error::{StreamError, StreamResult};
pub use observer::{StreamObserver, StreamOperation, TracingObserver};
pub use state::ConnectionState;
pub use transport::{FrameTransport, StreamConnector, WsConnector, WsTransport};
