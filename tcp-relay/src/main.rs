use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tcp_relay::{FileRuleSource, ProxyRunner, RuleSource};
use tracing_subscriber::filter::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tcp-relay")]
#[command(about = "Forward TCP connections from local ports to fixed remote targets")]
struct Args {
    /// Rule file: `listenPort targetHost targetPort` per line, or a .toml config
    #[arg(long, short = 'c', env = "TCP_RELAY_CONFIG", default_value = "proxy.conf")]
    config: PathBuf,

    /// Interface to listen on (overrides the config file)
    #[arg(long)]
    bind: Option<String>,

    /// Enable debug logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let env_filter = if args.verbose {
        EnvFilter::from_default_env()
            .add_directive(tracing_subscriber::filter::LevelFilter::DEBUG.into())
    } else {
        EnvFilter::from_default_env()
            .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    // Unreadable config is the only fatal error
    let mut config = FileRuleSource::new(&args.config)
        .load()
        .with_context(|| format!("Failed to load rules from {:?}", args.config))?;

    if let Some(bind) = args.bind {
        config.settings.bind_host = bind;
    }

    let runner = ProxyRunner::new(config.settings);
    let shutdown = runner.shutdown_token();
    let running = runner.start(config.rules).await;

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutting down"),
            Err(e) => {
                // Without a signal handler, run until killed
                tracing::warn!("Failed to listen for Ctrl-C: {}", e);
                return;
            }
        }
        shutdown.cancel();
    });

    running.wait().await;
    Ok(())
}
