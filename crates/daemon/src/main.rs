// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `goferd` — the gofer agent execution gateway daemon.

use clap::Parser;
use gofer_daemon::{Gateway, GatewayOptions};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "goferd", about = "Agent execution gateway daemon", version)]
struct Args {
    /// Directory for persistent state (stores, logs, lock file).
    #[arg(long, default_value = ".gofer")]
    state_dir: PathBuf,

    /// Override the configured HTTP bind address.
    #[arg(long)]
    http_addr: Option<String>,

    /// Path to the config document (default: <state-dir>/gateway-config.json).
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    std::fs::create_dir_all(args.state_dir.join("logs"))?;

    // Non-rotating on purpose: the control plane's SSE endpoint tails
    // this exact path, so the file name must stay stable.
    let file_appender =
        tracing_appender::rolling::never(args.state_dir.join("logs"), "goferd.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let options = GatewayOptions {
            state_dir: args.state_dir,
            http_addr: args.http_addr,
            config_path: args.config,
        };
        let gateway = Gateway::build(options, Arc::new(gofer_daemon::lifecycle::LogEgress))?;
        gateway.serve().await
    })
}
