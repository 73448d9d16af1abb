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

//! Command line options.

use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tradewire_network::stream::StreamConfig;

use crate::subscription::{ChannelKind, SubscriptionChannel, UpdateInterval};

#[derive(Debug, Parser)]
#[command(name = "tradewire", version, about = "TLS streaming channel client", long_about = None)]
pub struct TradewireCli {
    /// Log level filter, overridden by `RUST_LOG` when set.
    #[arg(long, env = "TRADEWIRE_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Connect, subscribe to one channel and print every frame received.
    Stream(StreamOpt),
}

#[derive(Clone, Debug, Args)]
pub struct StreamOpt {
    #[arg(long, env = "TRADEWIRE_HOST", default_value = "test.deribit.com")]
    pub host: String,
    #[arg(long, env = "TRADEWIRE_PORT", default_value = "443")]
    pub port: String,
    #[arg(long, env = "TRADEWIRE_PATH", default_value = "/ws/api/v2")]
    pub path: String,
    /// Skip server certificate verification.
    #[arg(long, env = "TRADEWIRE_INSECURE")]
    pub insecure: bool,
    /// Connect without TLS (`ws://`).
    #[arg(long, env = "TRADEWIRE_PLAIN")]
    pub plain: bool,
    #[arg(long, env = "TRADEWIRE_CONNECT_TIMEOUT_SECS", default_value_t = 10)]
    pub connect_timeout_secs: u64,
    /// Seconds to wait for each frame; `0` waits indefinitely.
    #[arg(long, env = "TRADEWIRE_READ_TIMEOUT_SECS", default_value_t = 30)]
    pub read_timeout_secs: u64,
    #[arg(long, env = "TRADEWIRE_CHANNEL", default_value = "book")]
    pub channel: ChannelKind,
    #[arg(long, env = "TRADEWIRE_INSTRUMENT", default_value = "BTC-PERPETUAL")]
    pub instrument: String,
    #[arg(long, env = "TRADEWIRE_INTERVAL", default_value = "100ms")]
    pub interval: UpdateInterval,
    /// Stop after this many frames have been delivered.
    #[arg(long, env = "TRADEWIRE_MAX_MESSAGES")]
    pub max_messages: Option<usize>,
}

impl StreamOpt {
    /// Builds the connection configuration described by these options.
    #[must_use]
    pub fn stream_config(&self) -> StreamConfig {
        let read_timeout =
            (self.read_timeout_secs > 0).then(|| Duration::from_secs(self.read_timeout_secs));

        StreamConfig::new(self.host.clone(), self.port.clone())
            .with_path(self.path.clone())
            .with_verify_certificate(!self.insecure)
            .with_tls(!self.plain)
            .with_connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .with_read_timeout(read_timeout)
    }

    /// Returns the channel to subscribe to.
    #[must_use]
    pub fn subscription(&self) -> SubscriptionChannel {
        SubscriptionChannel::new(self.channel, self.instrument.clone(), self.interval)
    }
}
