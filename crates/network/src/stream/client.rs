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

//! Thread-shared streaming channel client.
//!
//! # Gate
//!
//! Every stateful operation (`connect`, `disconnect`, `send`, `receive`) runs under one
//! exclusive async mutex guarding the client's single [`TransportSession`]. A `send` in flight
//! therefore blocks a concurrent `receive` and vice versa. The protocol itself allows
//! independent read and write directions; splitting the session into separate reader and writer
//! halves with their own locks is the alternative if throughput ever requires it.
//!
//! # Faults
//!
//! Connect-phase faults revert the state to `Disconnected` and are returned. Close faults are
//! recorded and suppressed. Send and receive faults are returned but leave the state unchanged,
//! so a caller seeing repeated I/O faults should call [`StreamClient::reconnect`]. Every fault
//! overwrites the single last-error slot.
//!
//! # Teardown
//!
//! Dropping a [`StreamClient`] cancels its queue workers, so pending queued operations resolve
//! with [`StreamError::NotConnected`], then closes a live connection on the current runtime.

use std::{
    fmt::Debug,
    sync::{Arc, OnceLock},
};

use arc_swap::ArcSwapOption;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use super::{
    config::StreamConfig,
    error::{StreamError, StreamResult},
    observer::{StreamObserver, StreamOperation, TracingObserver},
    state::{AtomicConnectionState, ConnectionState},
    transport::{StreamConnector, TransportSession, WsConnector},
};

type ReceiveCallback = Box<dyn FnOnce(&str) + Send + 'static>;

struct QueuedSend {
    payload: String,
    reply: oneshot::Sender<StreamResult<()>>,
}

struct QueuedReceive {
    callback: ReceiveCallback,
    reply: oneshot::Sender<StreamResult<()>>,
}

/// Completion handle for an operation queued with [`StreamClient::send_async`] or
/// [`StreamClient::receive_async`].
#[derive(Debug)]
#[must_use = "dropping a receipt discards the result of the queued operation"]
pub struct Receipt {
    rx: oneshot::Receiver<StreamResult<()>>,
}

impl Receipt {
    fn resolved(result: StreamResult<()>) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(result);
        Self { rx }
    }

    /// Waits for the queued operation to complete.
    ///
    /// # Errors
    ///
    /// Returns the operation's error, or [`StreamError::NotConnected`] if the client was dropped
    /// before the operation ran.
    pub async fn wait(self) -> StreamResult<()> {
        self.rx.await.unwrap_or(Err(StreamError::NotConnected))
    }
}

/// Reverts the state to `Disconnected` unless the attempt was settled, covering a caller
/// dropping the `connect` future mid-handshake.
struct ConnectAttempt<'a> {
    state: &'a AtomicConnectionState,
    settled: bool,
}

impl<'a> ConnectAttempt<'a> {
    fn begin(state: &'a AtomicConnectionState) -> Self {
        state.store(ConnectionState::Connecting);
        Self {
            state,
            settled: false,
        }
    }

    fn settle(mut self, state: ConnectionState) {
        self.state.store(state);
        self.settled = true;
    }
}

impl Drop for ConnectAttempt<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.state.store(ConnectionState::Disconnected);
        }
    }
}

/// State shared between a [`StreamClient`] handle and its queue workers.
struct ClientCore {
    config: StreamConfig,
    gate: Mutex<TransportSession>,
    state: AtomicConnectionState,
    last_error: ArcSwapOption<String>,
    observer: Arc<dyn StreamObserver>,
}

impl ClientCore {
    fn state(&self) -> ConnectionState {
        self.state.load()
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.load_full().map(|msg| msg.as_ref().clone())
    }

    async fn connect(&self) -> StreamResult<()> {
        let mut session = self.gate.lock().await;

        if self.state() == ConnectionState::Connected {
            return Ok(());
        }

        self.last_error.store(None);
        let attempt = ConnectAttempt::begin(&self.state);
        let timeout = self.config.connect_timeout;

        tracing::debug!("Connecting to {}", self.config.url());

        // Timer and attempt share one future, so completion also disarms the timer
        let result = tokio::time::timeout(timeout, session.open(&self.config))
            .await
            .unwrap_or(Err(StreamError::ConnectTimeout(timeout)));

        match result {
            Ok(()) => {
                attempt.settle(ConnectionState::Connected);
                self.observer.on_connected(&self.config);
                Ok(())
            }
            Err(e) => {
                session.take();
                attempt.settle(ConnectionState::Disconnected);
                self.record(StreamOperation::Connect, &e);
                Err(e)
            }
        }
    }

    async fn disconnect(&self) {
        let mut session = self.gate.lock().await;

        if self.state() != ConnectionState::Connected {
            return;
        }

        let timeout = self.config.connect_timeout;
        let result = tokio::time::timeout(timeout, session.close())
            .await
            .unwrap_or_else(|_| Err(StreamError::Close(format!("timed out after {timeout:?}"))));

        if let Err(e) = result {
            self.record(StreamOperation::Disconnect, &e);
        }

        session.take();
        self.state.store(ConnectionState::Disconnected);
        self.observer.on_disconnected(&self.config);
    }

    async fn send(&self, message: &str) -> StreamResult<()> {
        let mut session = self.gate.lock().await;

        self.ensure_connected(StreamOperation::Send)?;

        session
            .write(message)
            .await
            .inspect_err(|e| self.record(StreamOperation::Send, e))
    }

    async fn receive<F>(&self, on_message: F) -> StreamResult<()>
    where
        F: FnOnce(&str),
    {
        let mut session = self.gate.lock().await;

        self.ensure_connected(StreamOperation::Receive)?;

        let result = match self.config.read_timeout {
            Some(timeout) => tokio::time::timeout(timeout, session.read())
                .await
                .unwrap_or(Err(StreamError::ReadTimeout(timeout))),
            None => session.read().await,
        };

        match result {
            Ok(payload) => {
                on_message(&payload);
                Ok(())
            }
            Err(e) => {
                self.record(StreamOperation::Receive, &e);
                Err(e)
            }
        }
    }

    /// Releases the transport without I/O when no runtime is left to run a close.
    fn release(&self) {
        match self.gate.try_lock() {
            Ok(mut session) => {
                session.take();
                self.state.store(ConnectionState::Disconnected);
                self.observer.on_disconnected(&self.config);
            }
            Err(_) => tracing::debug!("Transport busy on drop, leaving it to its owner"),
        }
    }

    fn ensure_connected(&self, operation: StreamOperation) -> StreamResult<()> {
        if self.state() == ConnectionState::Connected {
            Ok(())
        } else {
            let error = StreamError::NotConnected;
            self.record(operation, &error);
            Err(error)
        }
    }

    fn record(&self, operation: StreamOperation, error: &StreamError) {
        self.last_error.store(Some(Arc::new(error.to_string())));
        self.observer.on_fault(operation, error);
    }
}

/// A long-lived, TLS-secured streaming channel client.
///
/// Share it between tasks or threads through an [`Arc`]. State and last-error queries are
/// lock-free; all I/O is serialized through the client gate. Dropping the client cancels any
/// queued operations and closes the connection.
pub struct StreamClient {
    core: Arc<ClientCore>,
    cancellation_token: CancellationToken,
    outbox: OnceLock<mpsc::UnboundedSender<QueuedSend>>,
    inbox: OnceLock<mpsc::UnboundedSender<QueuedReceive>>,
}

impl Debug for StreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(StreamClient))
            .field("url", &self.core.config.url())
            .field("state", &self.state())
            .field("last_error", &self.last_error())
            .field("observer", &self.core.observer)
            .finish_non_exhaustive()
    }
}

impl StreamClient {
    /// Creates a new [`StreamClient`] using the WebSocket connector and `tracing` observer.
    ///
    /// No I/O happens until [`Self::connect`] is called.
    #[must_use]
    pub fn new(config: StreamConfig) -> Self {
        Self::with_connector(config, Arc::new(WsConnector), Arc::new(TracingObserver))
    }

    /// Creates a new [`StreamClient`] with injected transport and observability collaborators.
    #[must_use]
    pub fn with_connector(
        config: StreamConfig,
        connector: Arc<dyn StreamConnector>,
        observer: Arc<dyn StreamObserver>,
    ) -> Self {
        let core = ClientCore {
            config,
            gate: Mutex::new(TransportSession::new(connector)),
            state: AtomicConnectionState::default(),
            last_error: ArcSwapOption::empty(),
            observer,
        };

        Self {
            core: Arc::new(core),
            cancellation_token: CancellationToken::new(),
            outbox: OnceLock::new(),
            inbox: OnceLock::new(),
        }
    }

    /// Returns the immutable connection configuration.
    #[must_use]
    pub fn config(&self) -> &StreamConfig {
        &self.core.config
    }

    /// Returns the current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.core.state()
    }

    /// Returns `true` if the client is connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Returns the most recently recorded failure message.
    ///
    /// Cleared at the start of every connect attempt.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.core.last_error()
    }

    /// Connects to the configured server.
    ///
    /// Returns immediately without I/O when already connected. Resolution, TCP connect, TLS
    /// handshake and protocol handshake are bounded together by `connect_timeout`.
    ///
    /// # Errors
    ///
    /// Returns a connect-phase error (see [`StreamError::is_connect_failure`]). The state is
    /// `Disconnected` afterwards and the failure is recorded.
    pub async fn connect(&self) -> StreamResult<()> {
        self.core.connect().await
    }

    /// Disconnects from the server.
    ///
    /// When connected, a close handshake is attempted (bounded by `connect_timeout`). Its
    /// failure is recorded but never returned. The state is `Disconnected` afterwards. Calling
    /// this while not connected performs no I/O.
    pub async fn disconnect(&self) {
        self.core.disconnect().await;
    }

    /// Disconnects (if connected) and connects again.
    ///
    /// Subscriptions sent on the previous connection are not replayed.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Self::connect`].
    pub async fn reconnect(&self) -> StreamResult<()> {
        self.core.disconnect().await;
        self.core.connect().await
    }

    /// Sends `message` as one frame, waiting until the write completes.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::NotConnected`] unless connected, or [`StreamError::Write`] if the
    /// write fails. Neither changes the connection state.
    pub async fn send(&self, message: &str) -> StreamResult<()> {
        self.core.send(message).await
    }

    /// Waits for exactly one frame and passes its payload to `on_message` before returning.
    ///
    /// The wait is bounded by `read_timeout` when configured. Call repeatedly (typically from a
    /// dedicated task) for continuous streaming.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::NotConnected`] unless connected, [`StreamError::ReadTimeout`] if
    /// no frame arrived in time, or [`StreamError::Read`] if the read fails. None of these
    /// change the connection state.
    pub async fn receive<F>(&self, on_message: F) -> StreamResult<()>
    where
        F: FnOnce(&str),
    {
        self.core.receive(on_message).await
    }

    /// Queues `message` for sending without waiting.
    ///
    /// Queued sends are written in submission order by a single worker task; each one behaves
    /// exactly like [`Self::send`]. The returned [`Receipt`] resolves with that send's result,
    /// or [`StreamError::NotConnected`] if the client is dropped first.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime on first use (the worker task is spawned lazily).
    pub fn send_async(&self, message: impl Into<String>) -> Receipt {
        let (reply, rx) = oneshot::channel();
        let queued = QueuedSend {
            payload: message.into(),
            reply,
        };

        match self.outbox().send(queued) {
            Ok(()) => Receipt { rx },
            Err(_) => Receipt::resolved(Err(StreamError::NotConnected)),
        }
    }

    /// Queues a single receive without waiting.
    ///
    /// Queued receives run in submission order by a single worker task; each one behaves
    /// exactly like [`Self::receive`]. The returned [`Receipt`] resolves after `on_message`
    /// has been invoked, with the fault, or with [`StreamError::NotConnected`] if the client is
    /// dropped first.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime on first use (the worker task is spawned lazily).
    pub fn receive_async<F>(&self, on_message: F) -> Receipt
    where
        F: FnOnce(&str) + Send + 'static,
    {
        let (reply, rx) = oneshot::channel();
        let queued = QueuedReceive {
            callback: Box::new(on_message),
            reply,
        };

        match self.inbox().send(queued) {
            Ok(()) => Receipt { rx },
            Err(_) => Receipt::resolved(Err(StreamError::NotConnected)),
        }
    }

    fn outbox(&self) -> &mpsc::UnboundedSender<QueuedSend> {
        self.outbox.get_or_init(|| {
            let (tx, mut rx) = mpsc::unbounded_channel::<QueuedSend>();
            let core = self.core.clone();
            let cancel = self.cancellation_token.clone();

            tokio::spawn(async move {
                loop {
                    let QueuedSend { payload, reply } = tokio::select! {
                        biased;
                        () = cancel.cancelled() => break,
                        queued = rx.recv() => match queued {
                            Some(queued) => queued,
                            None => break,
                        },
                    };
                    let result = tokio::select! {
                        biased;
                        () = cancel.cancelled() => Err(StreamError::NotConnected),
                        result = core.send(&payload) => result,
                    };
                    let _ = reply.send(result);
                }
                tracing::trace!("Send queue closed");
            });

            tx
        })
    }

    fn inbox(&self) -> &mpsc::UnboundedSender<QueuedReceive> {
        self.inbox.get_or_init(|| {
            let (tx, mut rx) = mpsc::unbounded_channel::<QueuedReceive>();
            let core = self.core.clone();
            let cancel = self.cancellation_token.clone();

            tokio::spawn(async move {
                loop {
                    let QueuedReceive { callback, reply } = tokio::select! {
                        biased;
                        () = cancel.cancelled() => break,
                        queued = rx.recv() => match queued {
                            Some(queued) => queued,
                            None => break,
                        },
                    };
                    let result = tokio::select! {
                        biased;
                        () = cancel.cancelled() => Err(StreamError::NotConnected),
                        result = core.receive(callback) => result,
                    };
                    let _ = reply.send(result);
                }
                tracing::trace!("Receive queue closed");
            });

            tx
        })
    }
}

impl Drop for StreamClient {
    fn drop(&mut self) {
        // Queue workers abandon their pending operation and release the gate
        self.cancellation_token.cancel();

        if self.core.state() != ConnectionState::Connected {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let core = self.core.clone();
                handle.spawn(async move { core.disconnect().await });
            }
            Err(_) => {
                tracing::debug!("No runtime available, releasing transport without close");
                self.core.release();
            }
        }
    }
}
