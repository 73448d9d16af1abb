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

//! Subscribe-then-stream runner.

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tradewire_network::stream::StreamClient;

use crate::subscription::SubscribeRequest;

/// Counters reported when a stream run ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamSummary {
    /// Frames handed to the message callback.
    pub delivered: usize,
    /// Receives that ended with a read timeout.
    pub timeouts: usize,
}

/// Connects `client`, sends `request`, then streams frames into `on_message`.
///
/// Frames are received on a dedicated task until `cancel` fires or `max_messages` frames have
/// been delivered. Cancelling while connecting or subscribing stops the run immediately. Read timeouts are counted and the loop continues. The client is always
/// disconnected before returning.
///
/// # Errors
///
/// Returns an error if connecting or sending the subscription fails, or if a receive fails
/// with anything other than a read timeout.
pub async fn run_stream<F>(
    client: Arc<StreamClient>,
    request: &SubscribeRequest,
    max_messages: Option<usize>,
    cancel: CancellationToken,
    on_message: F,
) -> anyhow::Result<StreamSummary>
where
    F: FnMut(&str) + Send + 'static,
{
    let envelope = request
        .to_json()
        .context("failed to serialize subscription")?;

    let connected = tokio::select! {
        () = cancel.cancelled() => None,
        result = client.connect() => Some(result),
    };
    match connected {
        Some(result) => result.context("failed to connect")?,
        None => {
            tracing::info!("Cancelled while connecting");
            return Ok(StreamSummary::default());
        }
    }

    let sent = tokio::select! {
        () = cancel.cancelled() => None,
        result = client.send(&envelope) => Some(result),
    };
    match sent {
        Some(Ok(())) => tracing::debug!("Sent subscription: {envelope}"),
        Some(Err(e)) => {
            client.disconnect().await;
            return Err(e).context("failed to send subscription");
        }
        None => {
            tracing::info!("Cancelled while subscribing");
            client.disconnect().await;
            return Ok(StreamSummary::default());
        }
    }

    let receiver = tokio::spawn(receive_loop(
        client.clone(),
        max_messages,
        cancel.clone(),
        on_message,
    ));
    let outcome = receiver.await;

    cancel.cancel();
    client.disconnect().await;

    outcome.context("receive task failed")?
}

async fn receive_loop<F>(
    client: Arc<StreamClient>,
    max_messages: Option<usize>,
    cancel: CancellationToken,
    mut on_message: F,
) -> anyhow::Result<StreamSummary>
where
    F: FnMut(&str) + Send + 'static,
{
    let mut summary = StreamSummary::default();

    loop {
        if max_messages.is_some_and(|max| summary.delivered >= max) {
            tracing::debug!("Reached {} messages", summary.delivered);
            break;
        }

        let result = tokio::select! {
            () = cancel.cancelled() => break,
            result = client.receive(|msg| on_message(msg)) => result,
        };

        match result {
            Ok(()) => summary.delivered += 1,
            Err(e) if e.is_timeout() => {
                summary.timeouts += 1;
                tracing::debug!("{e}, waiting again");
            }
            Err(e) => return Err(e).context("stream receive failed"),
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, sync::Mutex, time::Duration};

    use async_trait::async_trait;
    use rstest::rstest;
    use tradewire_network::stream::{
        ConnectionState, FrameTransport, StreamConfig, StreamConnector, StreamError,
        StreamResult, TracingObserver,
    };

    use super::*;
    use crate::subscription::{ChannelKind, SubscriptionChannel, UpdateInterval};

    /// Frames served to the client. Reads pend forever once the queue is empty.
    #[derive(Debug, Default)]
    struct Feed {
        open_delay: Mutex<Option<Duration>>,
        inbound: Mutex<VecDeque<StreamResult<String>>>,
        written: Mutex<Vec<String>>,
        closes: Mutex<usize>,
    }

    #[derive(Debug)]
    struct FeedConnector(Arc<Feed>);

    struct FeedTransport(Arc<Feed>);

    #[async_trait]
    impl StreamConnector for FeedConnector {
        async fn open(&self, _config: &StreamConfig) -> StreamResult<Box<dyn FrameTransport>> {
            let delay = *self.0.open_delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            Ok(Box::new(FeedTransport(self.0.clone())))
        }
    }

    #[async_trait]
    impl FrameTransport for FeedTransport {
        async fn write_frame(&mut self, payload: &str) -> StreamResult<()> {
            self.0.written.lock().unwrap().push(payload.to_string());
            Ok(())
        }

        async fn read_frame(&mut self) -> StreamResult<String> {
            let next = self.0.inbound.lock().unwrap().pop_front();
            match next {
                Some(frame) => frame,
                None => std::future::pending().await,
            }
        }

        async fn close(&mut self) -> StreamResult<()> {
            *self.0.closes.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn feed_with(frames: Vec<StreamResult<String>>) -> Arc<Feed> {
        let feed = Arc::new(Feed::default());
        feed.inbound.lock().unwrap().extend(frames);
        feed
    }

    fn client_for(feed: &Arc<Feed>, read_timeout: Option<Duration>) -> Arc<StreamClient> {
        let config = StreamConfig::new("feed.local", "443").with_read_timeout(read_timeout);
        Arc::new(StreamClient::with_connector(
            config,
            Arc::new(FeedConnector(feed.clone())),
            Arc::new(TracingObserver),
        ))
    }

    fn book_request() -> SubscribeRequest {
        SubscribeRequest::new(
            1,
            &[SubscriptionChannel::new(
                ChannelKind::Book,
                "BTC-PERPETUAL",
                UpdateInterval::Ms100,
            )],
        )
    }

    fn collector() -> (Arc<Mutex<Vec<String>>>, impl FnMut(&str) + Send + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |msg: &str| sink.lock().unwrap().push(msg.to_string()))
    }

    #[rstest]
    #[tokio::test]
    async fn test_stops_after_max_messages() {
        let feed = feed_with(vec![
            Ok("a".to_string()),
            Ok("b".to_string()),
            Ok("c".to_string()),
            Ok("d".to_string()),
        ]);
        let client = client_for(&feed, None);
        let request = book_request();
        let (seen, on_message) = collector();

        let summary = run_stream(
            client.clone(),
            &request,
            Some(3),
            CancellationToken::new(),
            on_message,
        )
        .await
        .unwrap();

        assert_eq!(summary.delivered, 3);
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b", "c"]);
        assert_eq!(
            *feed.written.lock().unwrap(),
            vec![request.to_json().unwrap()]
        );
        assert_eq!(*feed.closes.lock().unwrap(), 1);
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[rstest]
    #[tokio::test]
    async fn test_read_timeouts_continue_until_cancelled() {
        let feed = feed_with(vec![Ok("first".to_string())]);
        let client = client_for(&feed, Some(Duration::from_millis(20)));
        let cancel = CancellationToken::new();
        let (seen, on_message) = collector();

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(150)).await;
                cancel.cancel();
            })
        };

        let summary = run_stream(client.clone(), &book_request(), None, cancel, on_message)
            .await
            .unwrap();
        canceller.await.unwrap();

        assert_eq!(summary.delivered, 1);
        assert!(summary.timeouts >= 1);
        assert_eq!(*seen.lock().unwrap(), vec!["first"]);
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[rstest]
    #[tokio::test]
    async fn test_cancel_interrupts_pending_receive() {
        let feed = feed_with(vec![]);
        let client = client_for(&feed, None);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let (_, on_message) = collector();

        let summary = run_stream(client.clone(), &book_request(), None, cancel, on_message)
            .await
            .unwrap();

        assert_eq!(summary, StreamSummary::default());
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[rstest]
    #[tokio::test]
    async fn test_cancel_interrupts_connect() {
        let feed = feed_with(vec![Ok("unused".to_string())]);
        *feed.open_delay.lock().unwrap() = Some(Duration::from_secs(5));
        let client = client_for(&feed, None);
        let cancel = CancellationToken::new();
        let (seen, on_message) = collector();

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                cancel.cancel();
            })
        };

        let start = std::time::Instant::now();
        let summary = run_stream(client.clone(), &book_request(), None, cancel, on_message)
            .await
            .unwrap();
        canceller.await.unwrap();

        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(summary, StreamSummary::default());
        assert!(seen.lock().unwrap().is_empty());
        assert!(feed.written.lock().unwrap().is_empty());
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[rstest]
    #[tokio::test]
    async fn test_read_fault_ends_stream_with_error() {
        let feed = feed_with(vec![
            Ok("a".to_string()),
            Err(StreamError::Read("connection reset".to_string())),
        ]);
        let client = client_for(&feed, None);
        let (seen, on_message) = collector();

        let result = run_stream(
            client.clone(),
            &book_request(),
            None,
            CancellationToken::new(),
            on_message,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(*seen.lock().unwrap(), vec!["a"]);
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(
            client.last_error().as_deref(),
            Some("Read error: connection reset")
        );
    }
}
