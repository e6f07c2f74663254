//! Outbound connection wrapping and datacenter-scoped peer verification.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use rustls::ClientConfig;
use rustls_pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

use crate::error::Error;
use crate::tls::configurator::Configurator;
use crate::tls::verify::{rpc_server_name, verify_peer_name};

/// Perform a client-side handshake over an existing connection.
///
/// Engine verification errors (untrusted chain, and the name check when the
/// configuration carries it) surface as [`Error::Handshake`].
pub async fn wrap_tls_client<S>(
    conn: S,
    config: Arc<ClientConfig>,
    server_name: ServerName<'static>,
) -> Result<TlsStream<S>, Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    TlsConnector::from(config)
        .connect(server_name, conn)
        .await
        .map_err(Error::Handshake)
}

/// A connection that is either plaintext or wrapped in TLS.
///
/// The outgoing RPC wrapper returns the plaintext variant when the active
/// settings do not call for TLS at all.
pub enum MaybeTlsStream<S> {
    Plain(S),
    Tls(Box<TlsStream<S>>),
}

impl<S> std::fmt::Debug for MaybeTlsStream<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaybeTlsStream::Plain(_) => f.write_str("MaybeTlsStream::Plain"),
            MaybeTlsStream::Tls(_) => f.write_str("MaybeTlsStream::Tls"),
        }
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> AsyncRead for MaybeTlsStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            MaybeTlsStream::Tls(stream) => Pin::new(stream.as_mut()).poll_read(cx, buf),
        }
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> AsyncWrite for MaybeTlsStream<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            MaybeTlsStream::Tls(stream) => Pin::new(stream.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(stream) => Pin::new(stream).poll_flush(cx),
            MaybeTlsStream::Tls(stream) => Pin::new(stream.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            MaybeTlsStream::Tls(stream) => Pin::new(stream.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Wraps outbound RPC connections to one target datacenter.
///
/// Produced by [`Configurator::outgoing_rpc_wrapper`]; a single RPC client
/// holds one wrapper per datacenter it dials, and every wrapped connection
/// is authenticated against that datacenter's expected identity.
#[derive(Debug, Clone)]
pub struct OutgoingRpcWrapper {
    configurator: Configurator,
    datacenter: String,
}

impl Configurator {
    /// Wrapper for outbound RPC dials into `datacenter`.
    pub fn outgoing_rpc_wrapper(&self, datacenter: impl Into<String>) -> OutgoingRpcWrapper {
        OutgoingRpcWrapper {
            configurator: self.clone(),
            datacenter: datacenter.into(),
        }
    }
}

impl OutgoingRpcWrapper {
    pub fn datacenter(&self) -> &str {
        &self.datacenter
    }

    /// Wrap an established connection according to the current snapshot.
    ///
    /// Passes the connection through untouched when outbound TLS is not
    /// enabled. Otherwise handshakes and then matches the peer's leaf
    /// certificate against `server.<datacenter>.<domain>`; a mismatch fails
    /// with [`Error::HostnameMismatch`] and the caller must drop the
    /// connection.
    pub async fn wrap<S>(&self, conn: S) -> Result<MaybeTlsStream<S>, Error>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        // One snapshot read covers both the engine config and the expected
        // name, so an update cannot split a single dial's policy.
        let snapshot = self.configurator.current();
        let config = match snapshot.outgoing_rpc_config()? {
            Some(config) => config,
            None => return Ok(MaybeTlsStream::Plain(conn)),
        };

        let domain = snapshot.settings.domain.clone().unwrap_or_default();
        let server_name = rpc_server_name(&self.datacenter, &domain)?;
        let expected_name = format!("server.{}.{domain}", self.datacenter);

        let stream = wrap_tls_client(conn, config, server_name.clone()).await?;

        let (_, session) = stream.get_ref();
        let leaf = session
            .peer_certificates()
            .and_then(|certs| certs.first())
            .ok_or(Error::NoPeerCertificate)?;
        verify_peer_name(leaf, &server_name, &expected_name, &self.datacenter)?;

        Ok(MaybeTlsStream::Tls(Box::new(stream)))
    }
}
