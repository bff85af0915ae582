//! State Listener
//!
//! Accepts the match process's TCP connection and feeds decoded state
//! messages into the [`StateStore`]. One connection is served at a time -
//! this is a single-match display, not a fan-out server.
//!
//! Reads use a short timeout so the loop stays responsive to shutdown;
//! timeouts are expected and are not errors. On disconnect the listener
//! re-accepts by default, since the match server restarts between games;
//! the in-flight animation keeps rendering the last known state until a
//! new connection delivers a new token.
//!
//! Bind failure at startup is the only fatal error this module produces.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::animator::CancelToken;
use crate::protocol::{LineFramer, MessageDecoder, DEFAULT_MAX_PENDING_BYTES};
use crate::state::StateStore;

/// Default per-read timeout.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// How often the accept loop re-checks the shutdown token.
const ACCEPT_POLL: Duration = Duration::from_millis(250);

/// Listener startup errors.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The fixed local address could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested
        addr: SocketAddr,
        /// Underlying socket error
        source: std::io::Error,
    },
}

/// TCP listener feeding the state store.
pub struct StateListener {
    listener: TcpListener,
    store: Arc<StateStore>,
    shutdown: CancelToken,
    read_timeout: Duration,
    max_pending: usize,
    reaccept: bool,
}

impl StateListener {
    /// Bind the fixed local address.
    pub async fn bind(
        addr: SocketAddr,
        store: Arc<StateStore>,
        shutdown: CancelToken,
    ) -> Result<Self, ListenerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ListenerError::Bind { addr, source })?;
        Ok(Self {
            listener,
            store,
            shutdown,
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_pending: DEFAULT_MAX_PENDING_BYTES,
            reaccept: true,
        })
    }

    /// Override the per-read timeout.
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Override the framer's unterminated-byte cap.
    pub fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = max_pending;
        self
    }

    /// Exit after the first connection ends instead of re-accepting.
    pub fn with_reaccept(mut self, reaccept: bool) -> Self {
        self.reaccept = reaccept;
        self
    }

    /// The bound address (useful when binding port 0).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept and serve connections until shutdown.
    pub async fn run(self) {
        match self.local_addr() {
            Ok(addr) => info!(addr = %addr, "listening for match process"),
            Err(_) => info!("listening for match process"),
        }

        while !self.shutdown.is_cancelled() {
            match tokio::time::timeout(ACCEPT_POLL, self.listener.accept()).await {
                // No connection yet; re-check shutdown.
                Err(_) => continue,
                Ok(Err(e)) => {
                    warn!(error = %e, "accept failed");
                }
                Ok(Ok((stream, peer))) => {
                    info!(peer = %peer, "match process connected");
                    self.serve_connection(stream, peer).await;
                    if !self.reaccept {
                        break;
                    }
                }
            }
        }
        info!("listener stopped");
    }

    /// Read one connection to EOF, applying messages in arrival order.
    async fn serve_connection(&self, mut stream: TcpStream, peer: SocketAddr) {
        let mut framer = LineFramer::with_max_pending(self.max_pending);
        let mut decoder = MessageDecoder::new();
        let mut buf = [0u8; 1024];
        let mut first = true;

        loop {
            if self.shutdown.is_cancelled() {
                return;
            }
            match tokio::time::timeout(self.read_timeout, stream.read(&mut buf)).await {
                // Read timeout: expected, keeps the loop responsive.
                Err(_) => continue,
                Ok(Ok(0)) => {
                    info!(peer = %peer, "match process disconnected");
                    return;
                }
                Ok(Ok(n)) => {
                    framer.push(&buf[..n]);
                    while let Some(line) = framer.next_line() {
                        for msg in decoder.feed_line(&line) {
                            if first {
                                info!(peer = %peer, state = %msg, "first state from connection");
                                first = false;
                            } else {
                                debug!(state = %msg, "state received");
                            }
                            self.store.set(msg);
                        }
                    }
                }
                Ok(Err(e)) => {
                    warn!(peer = %peer, error = %e, "read error, dropping connection");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tokio::io::AsyncWriteExt;

    use super::*;
    use crate::protocol::{StateKind, StateMessage};

    async fn wait_for_version(store: &StateStore, at_least: u64) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while store.version() < at_least {
            assert!(
                tokio::time::Instant::now() < deadline,
                "store never reached version {at_least}"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    async fn start_listener(store: Arc<StateStore>, shutdown: CancelToken) -> SocketAddr {
        let listener = StateListener::bind("127.0.0.1:0".parse().unwrap(), store, shutdown)
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(listener.run());
        addr
    }

    #[tokio::test]
    async fn test_messages_applied_in_order() {
        let store = StateStore::new();
        let shutdown = CancelToken::new();
        let addr = start_listener(Arc::clone(&store), shutdown.clone()).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"thinking\n").await.unwrap();
        wait_for_version(&store, 1).await;
        assert_eq!(store.get(), StateMessage::new(StateKind::Thinking));

        // Two messages in one write: both applied, last one visible.
        stream.write_all(b"lose\ndraw\n").await.unwrap();
        wait_for_version(&store, 3).await;
        assert_eq!(store.get(), StateMessage::new(StateKind::Draw));

        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_split_score_message() {
        let store = StateStore::new();
        let shutdown = CancelToken::new();
        let addr = start_listener(Arc::clone(&store), shutdown.clone()).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"sco").await.unwrap();
        stream.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        stream.write_all(b"re\n4").await.unwrap();
        stream.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        stream.write_all(b"2\n").await.unwrap();

        wait_for_version(&store, 1).await;
        assert_eq!(store.get(), StateMessage::score(42));

        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_reaccept_after_disconnect() {
        let store = StateStore::new();
        let shutdown = CancelToken::new();
        let addr = start_listener(Arc::clone(&store), shutdown.clone()).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"thinking\n").await.unwrap();
        wait_for_version(&store, 1).await;
        drop(stream);

        // State is not reset by the disconnect.
        assert_eq!(store.get(), StateMessage::new(StateKind::Thinking));

        // The remote restarts and reconnects.
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"off\n").await.unwrap();
        wait_for_version(&store, 2).await;
        assert_eq!(store.get(), StateMessage::new(StateKind::Off));

        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let store = StateStore::new();
        let first = StateListener::bind(
            "127.0.0.1:0".parse().unwrap(),
            Arc::clone(&store),
            CancelToken::new(),
        )
        .await
        .unwrap();
        let taken = first.local_addr().unwrap();

        let result = StateListener::bind(taken, store, CancelToken::new()).await;
        assert!(matches!(result, Err(ListenerError::Bind { .. })));
    }
}
