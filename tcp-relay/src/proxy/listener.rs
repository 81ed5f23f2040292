//! Per-rule listening socket and accept loop

use super::forwarder::{ConnectionForwarder, ConnectionPair};
use crate::config::{ForwardingRule, RelaySettings};
use crate::error::{RelayError, Result};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Pause after a failed accept; errors like EMFILE repeat on every call
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Owns the bound socket for one forwarding rule
pub struct RuleListener {
    rule: ForwardingRule,
    listener: TcpListener,
    forwarder: ConnectionForwarder,
    shutdown: CancellationToken,
}

impl RuleListener {
    /// Bind the rule's listen port on `settings.bind_host`.
    ///
    /// A failure here concerns this rule only.
    pub async fn bind(
        rule: ForwardingRule,
        settings: &RelaySettings,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        let addr = rule.listen_addr(&settings.bind_host);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| RelayError::Bind { addr, source: e })?;

        Ok(Self {
            rule,
            listener,
            forwarder: ConnectionForwarder::new(settings, shutdown.clone()),
            shutdown,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until shutdown is requested.
    ///
    /// Accept and dial failures are logged and the loop keeps going.
    pub async fn run(self) {
        info!("Proxy started for {}", self.rule);

        loop {
            let accepted = tokio::select! {
                r = self.listener.accept() => r,
                _ = self.shutdown.cancelled() => break,
            };

            let (client, peer) = match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    if self.accept_failed(e).await {
                        continue;
                    }
                    break;
                }
            };
            debug!(%peer, rule = %self.rule, "Client connected");

            // Dial before accepting the next client
            let dialed = tokio::select! {
                r = self.dial() => r,
                _ = self.shutdown.cancelled() => break,
            };

            match dialed {
                Ok(target) => {
                    self.forwarder.relay(ConnectionPair {
                        client,
                        target,
                        peer,
                    });
                }
                Err(e) => {
                    warn!(%peer, "{}", e);
                    drop(client);
                }
            }
        }

        info!("Proxy stopped for {}", self.rule);
    }

    /// Log an accept error and back off. Returns `false` if shutdown was
    /// requested meanwhile.
    async fn accept_failed(&self, e: io::Error) -> bool {
        warn!(rule = %self.rule, "{}", RelayError::Accept(e));
        tokio::select! {
            _ = tokio::time::sleep(ACCEPT_BACKOFF) => true,
            _ = self.shutdown.cancelled() => false,
        }
    }

    async fn dial(&self) -> Result<TcpStream> {
        let target = self.rule.target_addr();
        TcpStream::connect(&target)
            .await
            .map_err(|e| RelayError::Dial { target, source: e })
    }
}
