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

//! Network primitives for the tradewire trading client.
//!
//! The centerpiece is the [`stream::StreamClient`], a long-lived, thread-shared, TLS-secured
//! WebSocket channel used for real-time market data. It provides:
//!
//! - An explicit lifecycle state machine (`Disconnected` → `Connecting` → `Connected`).
//! - Timeout-bounded connection setup covering resolution, TCP, TLS and protocol handshakes.
//! - A single gate serializing every stateful operation against the one owned transport.
//! - A most-recent-failure recorder that stays queryable after a fault.
//!
//! The [`tls`] module builds the `rustls` client configuration and wraps raw sockets.

#![deny(unsafe_code)]
#![deny(nonstandard_style)]
#![deny(missing_debug_implementations)]
#![deny(clippy::missing_errors_doc)]
#![deny(clippy::missing_panics_doc)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod stream;
pub mod tls;
