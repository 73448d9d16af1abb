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

//! Module for wrapping raw socket streams with TLS encryption.

use std::sync::{Arc, Once};

use rustls::{
    ClientConfig, DigitallySignedStruct, SignatureScheme,
    client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier},
    crypto::{CryptoProvider, WebPkiSupportedAlgorithms},
    pki_types::{CertificateDer, ServerName, UnixTime},
};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::TlsConnector;
use tokio_tungstenite::MaybeTlsStream;

/// A connector used when establishing stream connections, controlling whether the socket is
/// wrapped with `rustls` or left as plain TCP.
#[derive(Clone)]
pub enum Connector {
    /// No TLS connection.
    Plain,
    /// TLS connection using `rustls`.
    Rustls(Arc<ClientConfig>),
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => write!(f, "Connector::Plain"),
            Self::Rustls(_) => write!(f, "Connector::Rustls"),
        }
    }
}

impl Connector {
    /// Creates a connector for the given transport settings.
    #[must_use]
    pub fn new(use_tls: bool, verify_certificate: bool) -> Self {
        if use_tls {
            Self::Rustls(create_tls_config(verify_certificate))
        } else {
            Self::Plain
        }
    }

    /// Returns `true` if this connector negotiates TLS.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Rustls(_))
    }

    /// Wraps `socket`, performing the TLS handshake against `host` when required.
    ///
    /// # Errors
    ///
    /// Returns an error if `host` is not a valid server name or the TLS handshake fails.
    pub async fn wrap_stream<S>(&self, socket: S, host: &str) -> std::io::Result<MaybeTlsStream<S>>
    where
        S: 'static + AsyncRead + AsyncWrite + Send + Unpin,
    {
        match self {
            Self::Plain => Ok(MaybeTlsStream::Plain(socket)),
            Self::Rustls(config) => {
                let domain = server_name(host)?;
                let stream = TlsConnector::from(config.clone())
                    .connect(domain, socket)
                    .await?;
                Ok(MaybeTlsStream::Rustls(stream))
            }
        }
    }
}

/// Installs the `ring` crypto provider as the process default (once).
///
/// Installation is skipped when another provider has already been installed.
pub fn install_cryptographic_provider() {
    static INSTALL: Once = Once::new();

    INSTALL.call_once(|| {
        if CryptoProvider::get_default().is_none()
            && rustls::crypto::ring::default_provider()
                .install_default()
                .is_err()
        {
            tracing::debug!("Crypto provider already installed by another thread");
        }
    });
}

/// Creates a `rustls` client configuration.
///
/// With `verify_certificate` the WebPKI roots are trusted, otherwise every server certificate
/// is accepted while handshake signatures are still checked.
#[must_use]
pub fn create_tls_config(verify_certificate: bool) -> Arc<ClientConfig> {
    install_cryptographic_provider();

    let config = if verify_certificate {
        let mut root_store = rustls::RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth()
    } else {
        tracing::warn!("TLS certificate verification disabled");
        let algorithms = CryptoProvider::get_default().map_or_else(
            || rustls::crypto::ring::default_provider().signature_verification_algorithms,
            |provider| provider.signature_verification_algorithms,
        );

        ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert { algorithms }))
            .with_no_client_auth()
    };

    Arc::new(config)
}

/// Converts a host into a TLS server name.
///
/// # Errors
///
/// Returns an error if the host is neither a DNS name nor an IP address.
pub fn server_name(host: &str) -> std::io::Result<ServerName<'static>> {
    // rustls expects IPv6 addresses without the surrounding [] brackets
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);

    ServerName::try_from(host.to_string()).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("Invalid TLS server name '{host}': {e}"),
        )
    })
}

/// Server certificate verifier which trusts any certificate chain.
#[derive(Debug)]
struct AcceptAnyServerCert {
    algorithms: WebPkiSupportedAlgorithms,
}

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(message, cert, dss, &self.algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(message, cert, dss, &self.algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.algorithms.supported_schemes()
    }
}
