//! Publish a single message to a relay.
//!
//! ```bash
//! relay-publish [--url URL] [--name NAME] [--action ACTION] [--timeout SECS] [PAYLOAD]
//! ```
//!
//! The payload is read from stdin when not given. Any failure is fatal: the
//! error is logged and the process exits with status 1.

use anyhow::{Context, Result};
use clap::Parser;
use plotrelay_client::{Publisher, PublisherConfig, DEFAULT_CONNECT_TIMEOUT};
use plotrelay_protocol::{actions, PROVIDER_PATH};
use std::io::Read;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    name = "relay-publish",
    about = "Publish one message to a plot relay provider endpoint"
)]
struct Args {
    /// Provider endpoint URL.
    #[arg(long, default_value_t = format!("ws://localhost:8080{}", PROVIDER_PATH))]
    url: String,

    /// Display name. Defaults to a prefix of the generated id.
    #[arg(long)]
    name: Option<String>,

    /// Envelope action.
    #[arg(long, default_value = actions::PLOT)]
    action: String,

    /// Connection timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_CONNECT_TIMEOUT.as_secs())]
    timeout: u64,

    /// Payload to send. Read from stdin when omitted.
    payload: Option<String>,
}

impl Args {
    fn publisher_config(&self) -> PublisherConfig {
        let config = PublisherConfig::new(self.url.clone())
            .with_connect_timeout(Duration::from_secs(self.timeout));
        match &self.name {
            Some(name) => config.with_name(name.clone()),
            None => config,
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = args.publisher_config();

    let payload = match args.payload {
        Some(payload) => payload,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("cannot read payload from stdin")?;
            buf
        }
    };

    let mut publisher = Publisher::connect(config).await?;
    publisher.publish(&args.action, payload).await?;
    publisher.close().await?;

    Ok(())
}

#[tokio::main]
async fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        // --help and --version are not failures
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "plotrelay_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run(args).await {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["relay-publish", "hello"]).unwrap();
        assert_eq!(args.url, "ws://localhost:8080/provider");
        assert_eq!(args.action, "plot");
        assert_eq!(args.timeout, 60);
        assert_eq!(args.payload.as_deref(), Some("hello"));

        let config = args.publisher_config();
        assert!(config.name.is_none());
        assert_eq!(config.connect_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_flags() {
        let args = Args::try_parse_from([
            "relay-publish",
            "--url",
            "ws://relay:9000/provider",
            "--name",
            "sine",
            "--action",
            "clear",
            "--timeout",
            "5",
        ])
        .unwrap();

        assert!(args.payload.is_none());
        assert_eq!(args.action, "clear");

        let config = args.publisher_config();
        assert_eq!(config.url, "ws://relay:9000/provider");
        assert_eq!(config.name.as_deref(), Some("sine"));
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(Args::try_parse_from(["relay-publish", "--bogus"]).is_err());
        assert!(Args::try_parse_from(["relay-publish", "--timeout", "soon"]).is_err());
        assert!(Args::try_parse_from(["relay-publish", "--url"]).is_err());
    }
}
