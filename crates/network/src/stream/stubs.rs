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

//! Scripted in-memory transport and recording observer for client tests.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::Notify;

use super::{
    config::StreamConfig,
    error::{StreamError, StreamResult},
    observer::{StreamObserver, StreamOperation},
    transport::{FrameTransport, StreamConnector},
};

/// Shared script controlling and recording the behavior of [`ScriptedConnector`].
#[derive(Debug, Default)]
pub(crate) struct Script {
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    pub open_delay: Mutex<Option<Duration>>,
    pub open_errors: Mutex<VecDeque<StreamError>>,
    pub fail_writes: AtomicBool,
    pub fail_close: AtomicBool,
    /// Frames written by the client, echoed back to the inbound queue when `echo` is set.
    pub written: Mutex<Vec<String>>,
    pub echo: AtomicBool,
    pub inbound: Mutex<VecDeque<String>>,
    pub inbound_ready: Notify,
    /// Artificial latency for each write and read, widening any overlap window.
    pub io_delay: Mutex<Option<Duration>>,
    in_flight: AtomicBool,
    pub overlaps: AtomicUsize,
}

impl Script {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn push_inbound(&self, payload: impl Into<String>) {
        self.inbound.lock().unwrap().push_back(payload.into());
        self.inbound_ready.notify_one();
    }

    pub(crate) fn fail_next_open(&self, error: StreamError) {
        self.open_errors.lock().unwrap().push_back(error);
    }

    pub(crate) fn set_open_delay(&self, delay: Duration) {
        *self.open_delay.lock().unwrap() = Some(delay);
    }

    pub(crate) fn set_io_delay(&self, delay: Duration) {
        *self.io_delay.lock().unwrap() = Some(delay);
    }

    pub(crate) fn written(&self) -> Vec<String> {
        self.written.lock().unwrap().clone()
    }

    fn enter(&self) -> InFlight<'_> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        InFlight(self)
    }

    async fn io_pause(&self) {
        let delay = *self.io_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Marks a transport operation in flight until dropped, including when the operation's
/// future is cancelled.
struct InFlight<'a>(&'a Script);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub(crate) struct ScriptedConnector {
    script: Arc<Script>,
}

impl ScriptedConnector {
    pub(crate) fn new(script: Arc<Script>) -> Arc<Self> {
        Arc::new(Self { script })
    }
}

#[async_trait]
impl StreamConnector for ScriptedConnector {
    async fn open(&self, _config: &StreamConfig) -> StreamResult<Box<dyn FrameTransport>> {
        self.script.opens.fetch_add(1, Ordering::SeqCst);

        let delay = *self.script.open_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let error = self.script.open_errors.lock().unwrap().pop_front();
        match error {
            Some(e) => Err(e),
            None => Ok(Box::new(ScriptedTransport {
                script: self.script.clone(),
            })),
        }
    }
}

struct ScriptedTransport {
    script: Arc<Script>,
}

#[async_trait]
impl FrameTransport for ScriptedTransport {
    async fn write_frame(&mut self, payload: &str) -> StreamResult<()> {
        {
            let _io = self.script.enter();
            self.script.io_pause().await;
        }

        if self.script.fail_writes.load(Ordering::SeqCst) {
            return Err(StreamError::Write("broken pipe".to_string()));
        }

        self.script.written.lock().unwrap().push(payload.to_string());
        if self.script.echo.load(Ordering::SeqCst) {
            self.script.push_inbound(payload);
        }
        Ok(())
    }

    async fn read_frame(&mut self) -> StreamResult<String> {
        // The frame stays queued until the pause completes, so a cancelled read loses nothing
        loop {
            let ready = !self.script.inbound.lock().unwrap().is_empty();
            if ready {
                let _io = self.script.enter();
                self.script.io_pause().await;
                let next = self.script.inbound.lock().unwrap().pop_front();
                if let Some(payload) = next {
                    return Ok(payload);
                }
                continue;
            }
            self.script.inbound_ready.notified().await;
        }
    }

    async fn close(&mut self) -> StreamResult<()> {
        self.script.closes.fetch_add(1, Ordering::SeqCst);

        if self.script.fail_close.load(Ordering::SeqCst) {
            return Err(StreamError::Close("connection reset".to_string()));
        }
        Ok(())
    }
}

/// Observer counting each hook invocation.
#[derive(Debug, Default)]
pub(crate) struct RecordingObserver {
    pub connected: AtomicUsize,
    pub disconnected: AtomicUsize,
    pub faults: Mutex<Vec<(StreamOperation, StreamError)>>,
}

impl RecordingObserver {
    pub(crate) fn faults(&self) -> Vec<(StreamOperation, StreamError)> {
        self.faults.lock().unwrap().clone()
    }
}

impl StreamObserver for RecordingObserver {
    fn on_connected(&self, _config: &StreamConfig) {
        self.connected.fetch_add(1, Ordering::SeqCst);
    }

    fn on_fault(&self, operation: StreamOperation, error: &StreamError) {
        self.faults.lock().unwrap().push((operation, error.clone()));
    }

    fn on_disconnected(&self, _config: &StreamConfig) {
        self.disconnected.fetch_add(1, Ordering::SeqCst);
    }
}
