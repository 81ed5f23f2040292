//! Starts one listener per rule and keeps them running

use super::listener::RuleListener;
use crate::config::{ForwardingRule, RelaySettings};
use crate::error::Result;
use std::net::SocketAddr;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Start outcome of a single rule
pub struct RuleOutcome {
    pub rule: ForwardingRule,
    /// Bound address, or why the rule is inert
    pub result: Result<SocketAddr>,
}

pub struct ProxyRunner {
    settings: RelaySettings,
    shutdown: CancellationToken,
}

impl ProxyRunner {
    pub fn new(settings: RelaySettings) -> Self {
        Self {
            settings,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that stops every listener and session when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Bind every rule independently and spawn the accept loops that succeeded.
    ///
    /// A rule that fails to bind is logged and left inert; it never affects
    /// the others.
    pub async fn start(&self, rules: Vec<ForwardingRule>) -> RunningProxy {
        let mut outcomes = Vec::with_capacity(rules.len());
        let mut tasks = Vec::new();

        for rule in rules {
            match RuleListener::bind(rule.clone(), &self.settings, self.shutdown.clone()).await {
                Ok(listener) => {
                    let result = listener.local_addr();
                    tasks.push(tokio::spawn(listener.run()));
                    outcomes.push(RuleOutcome { rule, result });
                }
                Err(e) => {
                    error!("Failed to start proxy for {}: {}", rule, e);
                    outcomes.push(RuleOutcome {
                        rule,
                        result: Err(e),
                    });
                }
            }
        }

        info!(
            "{} of {} rule(s) listening",
            tasks.len(),
            outcomes.len()
        );

        RunningProxy {
            outcomes,
            tasks,
            shutdown: self.shutdown.clone(),
        }
    }
}

/// Listeners started by [`ProxyRunner::start`]
pub struct RunningProxy {
    outcomes: Vec<RuleOutcome>,
    tasks: Vec<JoinHandle<()>>,
    shutdown: CancellationToken,
}

impl RunningProxy {
    pub fn outcomes(&self) -> &[RuleOutcome] {
        &self.outcomes
    }

    /// Number of rules with a live listener
    pub fn listening(&self) -> usize {
        self.tasks.len()
    }

    /// Stop all listeners and sessions
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Run until shutdown is requested, then wait for the accept loops to exit
    pub async fn wait(self) {
        if self.tasks.is_empty() {
            warn!("No listeners running, waiting for shutdown");
            self.shutdown.cancelled().await;
            return;
        }

        for task in self.tasks {
            if let Err(e) = task.await {
                error!("Listener task failed: {}", e);
            }
        }
    }
}
