//! TCP and TLS transport setup.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::ClientError;

/// Byte stream the session runs over: plain TCP or TLS.
pub(crate) trait Transport: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> Transport for T {}

pub(crate) type BoxedTransport = Box<dyn Transport>;

/// Open a transport to the configured server.
///
/// The connect timeout covers the TCP connect and the TLS handshake
/// separately.
pub(crate) async fn connect(server: &ServerConfig) -> Result<BoxedTransport, ClientError> {
    let limit = server.connect_timeout();
    let timed_out = || ClientError::ConnectTimeout {
        host: server.host.clone(),
        port: server.port,
        secs: server.connect_timeout_secs,
    };

    let tcp = timeout(limit, TcpStream::connect((server.host.as_str(), server.port)))
        .await
        .map_err(|_| timed_out())??;
    if let Err(e) = tcp.set_nodelay(true) {
        debug!(error = %e, "failed to set TCP_NODELAY");
    }

    if !server.tls {
        info!(host = %server.host, port = server.port, "TCP connection established");
        return Ok(Box::new(tcp));
    }

    let server_name = ServerName::try_from(server.host.clone())
        .map_err(|_| ClientError::InvalidServerName(server.host.clone()))?;
    let tls = timeout(limit, tls_connector().connect(server_name, tcp))
        .await
        .map_err(|_| timed_out())?
        .map_err(|e| ClientError::Tls(e.to_string()))?;

    info!(host = %server.host, port = server.port, "TLS handshake completed");
    Ok(Box::new(tls))
}

/// TLS connector trusting the platform's native root certificates.
fn tls_connector() -> TlsConnector {
    let mut roots = RootCertStore::empty();
    let certs = rustls_native_certs::load_native_certs();
    for cert in certs.certs {
        if let Err(e) = roots.add(cert) {
            warn!("Failed to add root cert: {}", e);
        }
    }
    for e in &certs.errors {
        warn!("Error loading native certs: {}", e);
    }

    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}
