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

//! Subscription envelopes for public market data channels.

use std::fmt::Display;

use serde::Serialize;
use strum::{AsRefStr, EnumIter, EnumString};

/// JSON-RPC method used to subscribe to public channels.
pub const PUBLIC_SUBSCRIBE: &str = "public/subscribe";

/// Public market data channel kinds.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    AsRefStr,
    strum::Display,
    EnumIter,
    EnumString,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ChannelKind {
    /// Order book changes: `book.{instrument}.{interval}`.
    #[default]
    Book,
    /// Public trades: `trades.{instrument}.{interval}`.
    Trades,
    /// Ticker snapshots: `ticker.{instrument}.{interval}`.
    Ticker,
}

/// Channel update intervals.
///
/// `Raw` requires an authenticated session on most venues.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    AsRefStr,
    strum::Display,
    EnumIter,
    EnumString,
)]
pub enum UpdateInterval {
    #[strum(serialize = "raw")]
    Raw,
    #[default]
    #[strum(serialize = "100ms")]
    Ms100,
    #[strum(serialize = "agg2")]
    Agg2,
}

/// A single channel subscription.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionChannel {
    pub kind: ChannelKind,
    pub instrument: String,
    pub interval: UpdateInterval,
}

impl SubscriptionChannel {
    /// Creates a new [`SubscriptionChannel`] instance.
    #[must_use]
    pub fn new(kind: ChannelKind, instrument: impl Into<String>, interval: UpdateInterval) -> Self {
        Self {
            kind,
            instrument: instrument.into(),
            interval,
        }
    }

    /// Returns the wire channel name, e.g. `book.BTC-PERPETUAL.100ms`.
    #[must_use]
    pub fn name(&self) -> String {
        format!(
            "{}.{}.{}",
            self.kind.as_ref(),
            self.instrument,
            self.interval.as_ref()
        )
    }
}

impl Display for SubscriptionChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name())
    }
}

/// Parameters of a subscribe request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SubscribeParams {
    pub channels: Vec<String>,
}

/// JSON-RPC 2.0 subscribe request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SubscribeRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'static str,
    pub params: SubscribeParams,
}

impl SubscribeRequest {
    /// Creates a public subscribe request for `channels`.
    #[must_use]
    pub fn new(id: u64, channels: &[SubscriptionChannel]) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method: PUBLIC_SUBSCRIBE,
            params: SubscribeParams {
                channels: channels.iter().map(SubscriptionChannel::name).collect(),
            },
        }
    }

    /// Serializes the request to its JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
