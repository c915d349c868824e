// SPDX-License-Identifier: MIT

use std::net::IpAddr;

use anyhow::Result;
use clap::Parser;
use td_server::ServerConfig;

/// Task director: assigns build steps to connected workers over WebSocket
/// and reassigns them on disconnect.
#[derive(Debug, Parser)]
#[command(name = "taskdirectord", version)]
struct Cli {
    /// Address to bind the worker-facing WebSocket listener on
    #[arg(long, default_value = "127.0.0.1")]
    bind: IpAddr,

    /// Port for the worker-facing WebSocket listener
    #[arg(long, default_value_t = 7900)]
    port: u16,

    /// Port for the administrative query listener (line-delimited JSON
    /// over TCP). Disabled unless set.
    #[arg(long)]
    admin: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("taskdirectord=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = ServerConfig { bind: cli.bind, port: cli.port, admin: cli.admin };

    td_server::run(config).await?;
    Ok(())
}
