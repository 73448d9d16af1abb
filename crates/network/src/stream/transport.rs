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

//! Transport session for the streaming channel.
//!
//! Connection setup is split into the steps a secure WebSocket needs, each mapped to its own
//! [`StreamError`] variant:
//!
//! 1. Resolve host and port into endpoints ([`StreamError::Resolution`]).
//! 2. Connect TCP to the first endpoint that accepts ([`StreamError::Connect`]).
//! 3. Negotiate TLS ([`StreamError::TlsHandshake`]).
//! 4. Upgrade to the WebSocket protocol ([`StreamError::ProtocolHandshake`]).
//!
//! The [`StreamConnector`] and [`FrameTransport`] traits are the seams between the client state
//! machine and the network, so alternative transports can be injected.

use std::{fmt::Debug, net::SocketAddr, sync::Arc};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, client_async_with_config,
    tungstenite::{
        Message,
        client::IntoClientRequest,
        protocol::{CloseFrame, frame::coding::CloseCode},
    },
};

use super::{
    config::StreamConfig,
    error::{StreamError, StreamResult},
};
use crate::tls::Connector;

/// An established, framed, bidirectional connection.
#[async_trait]
pub trait FrameTransport: Send {
    /// Writes `payload` as one complete frame.
    async fn write_frame(&mut self, payload: &str) -> StreamResult<()>;

    /// Waits for the next complete data frame and returns its payload.
    async fn read_frame(&mut self) -> StreamResult<String>;

    /// Performs the protocol-level close handshake.
    async fn close(&mut self) -> StreamResult<()>;
}

/// Establishes [`FrameTransport`]s from a [`StreamConfig`].
#[async_trait]
pub trait StreamConnector: Debug + Send + Sync {
    /// Runs every setup step and returns a ready transport.
    ///
    /// The caller bounds this future with the connect timeout; dropping it cancels whichever
    /// step is pending.
    async fn open(&self, config: &StreamConfig) -> StreamResult<Box<dyn FrameTransport>>;
}

/// Production connector: DNS resolution, TCP, `rustls` and `tokio-tungstenite`.
#[derive(Clone, Copy, Debug, Default)]
pub struct WsConnector;

impl WsConnector {
    async fn resolve(host: &str, port: &str) -> StreamResult<Vec<SocketAddr>> {
        let port: u16 = port
            .parse()
            .map_err(|e| StreamError::Resolution(format!("Invalid port '{port}': {e}")))?;
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);

        let endpoints: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
            .await
            .map_err(|e| StreamError::Resolution(format!("{host}:{port}: {e}")))?
            .collect();

        if endpoints.is_empty() {
            return Err(StreamError::Resolution(format!(
                "{host}:{port}: no endpoints found"
            )));
        }

        Ok(endpoints)
    }

    async fn connect_tcp(endpoints: &[SocketAddr]) -> StreamResult<TcpStream> {
        let mut last_error = None;

        for endpoint in endpoints {
            match TcpStream::connect(endpoint).await {
                Ok(socket) => {
                    if let Err(e) = socket.set_nodelay(true) {
                        tracing::debug!("Failed to set TCP_NODELAY on {endpoint}: {e}");
                    }
                    return Ok(socket);
                }
                Err(e) => {
                    tracing::debug!("TCP connect to {endpoint} failed: {e}");
                    last_error = Some(format!("{endpoint}: {e}"));
                }
            }
        }

        Err(StreamError::Connect(
            last_error.unwrap_or_else(|| "no endpoints to connect".to_string()),
        ))
    }
}

#[async_trait]
impl StreamConnector for WsConnector {
    async fn open(&self, config: &StreamConfig) -> StreamResult<Box<dyn FrameTransport>> {
        let endpoints = Self::resolve(&config.host, &config.port).await?;
        tracing::debug!("Resolved {}:{} to {endpoints:?}", config.host, config.port);

        let socket = Self::connect_tcp(&endpoints).await?;
        tracing::debug!("TCP connected to {}", config.host);

        let connector = Connector::new(config.use_tls, config.verify_certificate);
        let stream = connector
            .wrap_stream(socket, &config.host)
            .await
            .map_err(|e| StreamError::TlsHandshake(e.to_string()))?;
        if connector.is_tls() {
            tracing::debug!("TLS handshake completed with {}", config.host);
        }

        let request = config
            .url()
            .into_client_request()
            .map_err(|e| StreamError::ProtocolHandshake(e.to_string()))?;
        let (stream, response) = client_async_with_config(request, stream, None)
            .await
            .map_err(|e| StreamError::ProtocolHandshake(e.to_string()))?;
        tracing::debug!(
            "Protocol handshake completed on {} (status {})",
            config.path,
            response.status()
        );

        Ok(Box::new(WsTransport::new(stream)))
    }
}

/// [`FrameTransport`] over a (possibly TLS-wrapped) WebSocket stream.
pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Debug for WsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(WsTransport)).finish_non_exhaustive()
    }
}

impl WsTransport {
    #[must_use]
    pub const fn new(stream: WebSocketStream<MaybeTlsStream<TcpStream>>) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl FrameTransport for WsTransport {
    async fn write_frame(&mut self, payload: &str) -> StreamResult<()> {
        self.stream
            .send(Message::text(payload.to_string()))
            .await
            .map_err(|e| StreamError::Write(e.to_string()))
    }

    async fn read_frame(&mut self) -> StreamResult<String> {
        // Control frames are answered by tungstenite and never surface as payloads
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text.to_string()),
                Some(Ok(Message::Binary(data))) => {
                    return String::from_utf8(data.to_vec()).map_err(|e| {
                        StreamError::Read(format!("Binary frame is not valid UTF-8: {e}"))
                    });
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                Some(Ok(Message::Close(frame))) => {
                    let detail = frame.map(|f| format!(": {f}")).unwrap_or_default();
                    return Err(StreamError::Read(format!(
                        "Connection closed by peer{detail}"
                    )));
                }
                Some(Err(e)) => return Err(e.into()),
                None => return Err(StreamError::Read("Stream ended".to_string())),
            }
        }
    }

    async fn close(&mut self) -> StreamResult<()> {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "".into(),
        };
        self.stream
            .close(Some(frame))
            .await
            .map_err(|e| StreamError::Close(e.to_string()))
    }
}

/// The single transport slot owned by a client.
///
/// Created empty at client construction; holds a transport only between a successful open and
/// the next close. Not `Clone`: a live encrypted socket is moved, never duplicated.
pub(crate) struct TransportSession {
    connector: Arc<dyn StreamConnector>,
    transport: Option<Box<dyn FrameTransport>>,
}

impl Debug for TransportSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(TransportSession))
            .field("connector", &self.connector)
            .field("is_open", &self.is_open())
            .finish()
    }
}

impl TransportSession {
    pub(crate) fn new(connector: Arc<dyn StreamConnector>) -> Self {
        Self {
            connector,
            transport: None,
        }
    }

    pub(crate) const fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    pub(crate) async fn open(&mut self, config: &StreamConfig) -> StreamResult<()> {
        // A stale transport from a faulted session is discarded, not closed
        self.transport = None;
        self.transport = Some(self.connector.open(config).await?);
        Ok(())
    }

    pub(crate) async fn write(&mut self, payload: &str) -> StreamResult<()> {
        self.transport_mut()?.write_frame(payload).await
    }

    pub(crate) async fn read(&mut self) -> StreamResult<String> {
        self.transport_mut()?.read_frame().await
    }

    pub(crate) async fn close(&mut self) -> StreamResult<()> {
        match self.transport.take() {
            Some(mut transport) => transport.close().await,
            None => Ok(()),
        }
    }

    pub(crate) fn take(&mut self) -> Option<Box<dyn FrameTransport>> {
        self.transport.take()
    }

    fn transport_mut(&mut self) -> StreamResult<&mut Box<dyn FrameTransport>> {
        self.transport.as_mut().ok_or(StreamError::NotConnected)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("")]
    #[case("https")]
    #[case("70000")]
    #[tokio::test]
    async fn test_resolve_rejects_invalid_port(#[case] port: &str) {
        let result = WsConnector::resolve("localhost", port).await;
        assert!(matches!(result, Err(StreamError::Resolution(_))));
    }

    #[rstest]
    #[tokio::test]
    async fn test_resolve_ip_literals() {
        let v4 = WsConnector::resolve("127.0.0.1", "443").await.unwrap();
        assert_eq!(v4, vec!["127.0.0.1:443".parse::<SocketAddr>().unwrap()]);

        let v6 = WsConnector::resolve("[::1]", "443").await.unwrap();
        assert_eq!(v6, vec!["[::1]:443".parse::<SocketAddr>().unwrap()]);
    }

    #[rstest]
    #[tokio::test]
    async fn test_resolve_empty_host_fails() {
        let result = WsConnector::resolve("", "443").await;
        assert!(matches!(result, Err(StreamError::Resolution(_))));
    }

    #[rstest]
    #[tokio::test]
    async fn test_connect_tcp_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = WsConnector::connect_tcp(&[addr]).await;
        assert!(matches!(result, Err(StreamError::Connect(_))));
    }

    #[rstest]
    #[tokio::test]
    async fn test_session_without_transport_is_not_connected() {
        let mut session = TransportSession::new(Arc::new(WsConnector));

        assert!(!session.is_open());
        assert_eq!(session.write("ping").await, Err(StreamError::NotConnected));
        assert_eq!(session.read().await, Err(StreamError::NotConnected));
        assert_eq!(session.close().await, Ok(()));
    }
}
