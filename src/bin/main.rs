//! dnsname-resolver binary entry point.
//!
//! Replays a JSON-lines file of watch notifications through the resolver
//! and prints the resulting index.

use clap::Parser;
use dnsname_resolver::{telemetry, ChannelSource, Config, DnsNameResolver, Notification};
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Replay DNSNameResolver notifications and print the owner index.
#[derive(Parser, Debug)]
#[command(name = "dnsname-resolver")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON-lines notification file; reads stdin when omitted.
    #[arg(short, long)]
    events: Option<PathBuf>,
}

fn load_config(path: Option<&PathBuf>) -> Result<Config, config::ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path.clone()));
    }
    builder
        .add_source(
            config::Environment::with_prefix("DNSNAME_RESOLVER")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}

fn read_notifications(path: Option<&PathBuf>) -> io::Result<Vec<Notification>> {
    let reader: Box<dyn BufRead> = match path {
        Some(path) => Box::new(BufReader::new(std::fs::File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let mut notifications = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(notification) => notifications.push(notification),
            Err(e) => warn!(line = line_no + 1, "skipping undecodable notification: {}", e),
        }
    }
    Ok(notifications)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(args.config.as_ref())?;

    telemetry::init(&config.telemetry).map_err(|e| e as Box<dyn std::error::Error>)?;

    let notifications = read_notifications(args.events.as_ref())?;
    info!(
        notifications = notifications.len(),
        namespaces = ?config.resolver.namespaces,
        "Starting dnsname-resolver replay"
    );

    let (source, tx) = ChannelSource::new();
    let needs_sync_marker = !notifications.contains(&Notification::Synced);
    for notification in notifications {
        tx.unbounded_send(notification)?;
    }
    if needs_sync_marker {
        tx.unbounded_send(Notification::Synced)?;
    }
    drop(tx);

    let resolver = DnsNameResolver::new(config.resolver, &source).await?;
    resolver.start().await?;

    let wait = resolver.wait();
    tokio::pin!(wait);
    let drained = tokio::select! {
        _ = &mut wait => true,
        _ = tokio::signal::ctrl_c() => false,
    };

    if let Err(e) = resolver.shutdown() {
        error!("shutdown error: {}", e);
    }
    if drained {
        info!("notification stream drained");
    } else {
        info!("interrupted, waiting for watch task to stop");
        wait.await;
    }

    println!("{}", serde_json::to_string_pretty(&resolver.index().snapshot())?);

    info!("dnsname-resolver shutdown complete");
    Ok(())
}
