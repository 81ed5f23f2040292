//! Bidirectional byte relay for one accepted connection pair

use crate::config::RelaySettings;
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// One proxied session: an accepted client and its dialed target
pub struct ConnectionPair {
    pub client: TcpStream,
    pub target: TcpStream,
    /// Address of the client, for logging
    pub peer: SocketAddr,
}

/// Copy direction within a pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToTarget,
    TargetToClient,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ClientToTarget => write!(f, "client->target"),
            Direction::TargetToClient => write!(f, "target->client"),
        }
    }
}

/// How one copy direction ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionEnd {
    /// Source reached end-of-stream
    Eof,
    /// Read or write failed
    Error(io::ErrorKind),
    /// The pair was closed from elsewhere (other direction or shutdown)
    Closed,
}

#[derive(Debug, Clone, Copy)]
pub struct DirectionSummary {
    pub direction: Direction,
    /// Bytes copied; only counted when the direction reached end-of-stream
    pub bytes: u64,
    pub end: DirectionEnd,
}

#[derive(Debug, Clone, Copy)]
pub struct RelaySummary {
    pub client_to_target: DirectionSummary,
    pub target_to_client: DirectionSummary,
}

/// Shared teardown state for a pair.
///
/// Both directions may race to close the pair; only the first call to
/// [`PairCloser::close`] has any effect.
pub struct PairCloser {
    closed: AtomicBool,
    open_directions: AtomicUsize,
    token: CancellationToken,
}

impl PairCloser {
    /// Create a closer that is also closed when `shutdown` is cancelled
    pub fn new(shutdown: &CancellationToken) -> Self {
        Self {
            closed: AtomicBool::new(false),
            open_directions: AtomicUsize::new(2),
            token: shutdown.child_token(),
        }
    }

    /// Close the pair. Returns `true` only for the call that actually closed it.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.token.cancel();
        true
    }

    #[cfg(test)]
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.token.is_cancelled()
    }

    /// Mark one direction finished; the pair closes after the last one.
    pub fn direction_done(&self) {
        if self.open_directions.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.close();
        }
    }

    /// Resolves once the pair is closed
    pub async fn closed(&self) {
        self.token.cancelled().await
    }
}

/// Handles to the two copy tasks of a running relay
pub struct RelayHandle {
    client_to_target: JoinHandle<DirectionSummary>,
    target_to_client: JoinHandle<DirectionSummary>,
}

impl RelayHandle {
    /// Wait for both directions to finish
    pub async fn join(self) -> io::Result<RelaySummary> {
        let client_to_target = self.client_to_target.await.map_err(io::Error::other)?;
        let target_to_client = self.target_to_client.await.map_err(io::Error::other)?;
        Ok(RelaySummary {
            client_to_target,
            target_to_client,
        })
    }
}

/// Relays bytes between the two sockets of a [`ConnectionPair`]
#[derive(Clone)]
pub struct ConnectionForwarder {
    buffer_size: usize,
    half_close: bool,
    shutdown: CancellationToken,
}

impl ConnectionForwarder {
    pub fn new(settings: &RelaySettings, shutdown: CancellationToken) -> Self {
        Self {
            buffer_size: settings.buffer_size.max(1),
            half_close: settings.half_close,
            shutdown,
        }
    }

    /// Spawn the two directional copy tasks for `pair` and return immediately
    pub fn relay(&self, pair: ConnectionPair) -> RelayHandle {
        let ConnectionPair {
            client,
            target,
            peer,
        } = pair;
        let closer = Arc::new(PairCloser::new(&self.shutdown));

        let (client_read, client_write) = client.into_split();
        let (target_read, target_write) = target.into_split();

        debug!(%peer, "Relaying session");

        let client_to_target = tokio::spawn(self.clone().copy_direction(
            Direction::ClientToTarget,
            client_read,
            target_write,
            closer.clone(),
            peer,
        ));
        let target_to_client = tokio::spawn(self.clone().copy_direction(
            Direction::TargetToClient,
            target_read,
            client_write,
            closer,
            peer,
        ));

        RelayHandle {
            client_to_target,
            target_to_client,
        }
    }

    async fn copy_direction(
        self,
        direction: Direction,
        reader: OwnedReadHalf,
        mut writer: OwnedWriteHalf,
        closer: Arc<PairCloser>,
        peer: SocketAddr,
    ) -> DirectionSummary {
        let mut reader = BufReader::with_capacity(self.buffer_size, reader);

        let result = tokio::select! {
            r = tokio::io::copy_buf(&mut reader, &mut writer) => Some(r),
            _ = closer.closed() => None,
        };

        let (bytes, end) = match result {
            Some(Ok(bytes)) if self.half_close => {
                // Forward end-of-stream and let the other direction drain
                match writer.shutdown().await {
                    Ok(()) => {
                        debug!(%peer, %direction, bytes, "End of stream, write side shut down");
                        closer.direction_done();
                        (bytes, DirectionEnd::Eof)
                    }
                    Err(e) => {
                        debug!(%peer, %direction, bytes, "Shutdown failed: {}", e);
                        closer.close();
                        (bytes, DirectionEnd::Error(e.kind()))
                    }
                }
            }
            Some(Ok(bytes)) => {
                debug!(%peer, %direction, bytes, "End of stream, closing session");
                closer.close();
                (bytes, DirectionEnd::Eof)
            }
            Some(Err(e)) => {
                debug!(%peer, %direction, "Relay error: {}", e);
                closer.close();
                (0, DirectionEnd::Error(e.kind()))
            }
            None => {
                debug!(%peer, %direction, "Session closed");
                (0, DirectionEnd::Closed)
            }
        };

        DirectionSummary {
            direction,
            bytes,
            end,
        }
    }
}
