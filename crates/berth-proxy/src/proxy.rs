//! Accept loop and per-connection forwarding.

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UnixStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ProxyError, ProxyResult};

/// Where to listen and where to forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// TCP address to accept connections on.
    pub listen: SocketAddr,
    /// Unix-domain socket every connection is forwarded to.
    pub endpoint: PathBuf,
}

impl ProxyConfig {
    /// Create a config.
    #[must_use]
    pub fn new(listen: SocketAddr, endpoint: impl Into<PathBuf>) -> Self {
        Self {
            listen,
            endpoint: endpoint.into(),
        }
    }

    /// Listen on every interface at `port`.
    #[must_use]
    pub fn on_port(port: u16, endpoint: impl Into<PathBuf>) -> Self {
        Self::new(SocketAddr::from(([0, 0, 0, 0], port)), endpoint)
    }
}

/// A bound TCP listener that forwards each connection to a Unix socket.
pub struct StreamProxy {
    listener: TcpListener,
    local_addr: SocketAddr,
    endpoint: Arc<Path>,
}

impl StreamProxy {
    /// Bind the listener.
    ///
    /// The endpoint is not dialled until a connection arrives, so a missing
    /// socket only affects individual connections.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Bind`] if the address cannot be bound.
    pub async fn bind(config: ProxyConfig) -> ProxyResult<Self> {
        let bind_err = |source| ProxyError::Bind {
            addr: config.listen,
            source,
        };
        let listener = TcpListener::bind(config.listen).await.map_err(bind_err)?;
        let local_addr = listener.local_addr().map_err(bind_err)?;

        info!(
            listen = %local_addr,
            endpoint = %config.endpoint.display(),
            "Stream proxy listening"
        );
        Ok(Self {
            listener,
            local_addr,
            endpoint: Arc::from(config.endpoint),
        })
    }

    /// The address actually bound (resolves port 0).
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The Unix socket connections are forwarded to.
    #[must_use]
    pub fn endpoint(&self) -> &Path {
        &self.endpoint
    }

    /// Accept connections until `cancel` fires.
    ///
    /// Accept and dial failures are logged and never end the loop.
    /// Connections already open keep forwarding after the loop returns.
    ///
    /// # Errors
    ///
    /// Currently always returns `Ok`; the signature leaves room for fatal
    /// listener errors.
    pub async fn serve(self, cancel: CancellationToken) -> ProxyResult<()> {
        loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    info!(listen = %self.local_addr, "Stream proxy stopped");
                    return Ok(());
                }

                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let endpoint = Arc::clone(&self.endpoint);
                        tokio::spawn(async move {
                            handle_connection(stream, peer, &endpoint).await;
                        });
                    },
                    Err(e) => {
                        warn!(error = %e, "Failed to accept proxy connection");
                    },
                },
            }
        }
    }
}

impl fmt::Debug for StreamProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamProxy")
            .field("local_addr", &self.local_addr)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

/// Bind `0.0.0.0:port` and forward to `endpoint` until Ctrl-C.
///
/// # Errors
///
/// Returns a bind error, or an error if the Ctrl-C handler cannot be
/// installed.
pub async fn start_proxy(port: u16, endpoint: impl Into<PathBuf>) -> ProxyResult<()> {
    let proxy = StreamProxy::bind(ProxyConfig::on_port(port, endpoint)).await?;
    let cancel = CancellationToken::new();

    tokio::select! {
        result = proxy.serve(cancel.clone()) => result,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Interrupt received, stopping stream proxy");
            cancel.cancel();
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    ToEndpoint,
    ToClient,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ToEndpoint => "client->endpoint",
            Self::ToClient => "endpoint->client",
        })
    }
}

async fn handle_connection(inbound: TcpStream, peer: SocketAddr, endpoint: &Path) {
    let outbound = match UnixStream::connect(endpoint).await {
        Ok(s) => s,
        Err(e) => {
            warn!(%peer, endpoint = %endpoint.display(), error = %e, "Failed to dial proxy endpoint");
            return;
        },
    };
    debug!(%peer, "Proxy connection opened");

    let (client_read, client_write) = inbound.into_split();
    let (local_read, local_write) = outbound.into_split();

    let upstream = tokio::spawn(forward(client_read, local_write, peer, Direction::ToEndpoint));
    let downstream = tokio::spawn(forward(local_read, client_write, peer, Direction::ToClient));

    // Each task owns one read half and one write half; both sockets close
    // once both tasks have returned.
    let (sent, received) = tokio::join!(upstream, downstream);
    debug!(
        %peer,
        sent = sent.unwrap_or(0),
        received = received.unwrap_or(0),
        "Proxy connection closed"
    );
}

/// Copy `src` into `dst` until EOF, then shut down only `dst`'s write side.
async fn forward<R, W>(mut src: R, mut dst: W, peer: SocketAddr, direction: Direction) -> u64
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let copied = match tokio::io::copy(&mut src, &mut dst).await {
        Ok(bytes) => {
            debug!(%peer, %direction, bytes, "Stream reached EOF");
            bytes
        },
        Err(e) => {
            warn!(%peer, %direction, error = %e, "Proxy copy failed");
            0
        },
    };
    if let Err(e) = dst.shutdown().await {
        debug!(%peer, %direction, error = %e, "Half-close failed");
    }
    copied
}
