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

//! Command line client for streaming public market data channels.
//!
//! The `tradewire` binary connects a [`tradewire_network::stream::StreamClient`], sends one
//! subscription envelope, then streams frames from a dedicated receive task until interrupted.

#![deny(unsafe_code)]
#![deny(nonstandard_style)]
#![deny(missing_debug_implementations)]
#![deny(clippy::missing_errors_doc)]
#![deny(clippy::missing_panics_doc)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod logging;
pub mod opt;
pub mod runner;
pub mod subscription;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tradewire_network::stream::StreamClient;

use crate::{
    opt::{Commands, StreamOpt, TradewireCli},
    subscription::SubscribeRequest,
};

/// Executes the parsed command.
///
/// # Errors
///
/// Returns an error if the command fails.
pub async fn run(cli: TradewireCli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Stream(opt) => run_stream_command(opt).await,
    }
}

async fn run_stream_command(opt: StreamOpt) -> anyhow::Result<()> {
    let client = Arc::new(StreamClient::new(opt.stream_config()));
    let request = SubscribeRequest::new(1, &[opt.subscription()]);
    let cancel = CancellationToken::new();

    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        tracing::error!("Failed to listen for Ctrl-C: {e}");
                    } else {
                        tracing::info!("Received Ctrl-C, shutting down");
                    }
                    cancel.cancel();
                }
                () = cancel.cancelled() => {}
            }
        })
    };

    tracing::info!(
        "Streaming {} from {}",
        opt.subscription(),
        client.config().url()
    );

    let result = runner::run_stream(
        client,
        &request,
        opt.max_messages,
        cancel.clone(),
        |msg| println!("{msg}"),
    )
    .await;

    cancel.cancel();
    let _ = interrupt.await;

    let summary = result?;
    tracing::info!(
        "Stream finished: {} messages delivered, {} read timeouts",
        summary.delivered,
        summary.timeouts
    );
    Ok(())
}
