//! DevConsole remote tool entry point.
//!
//! ```text
//! devconsole-remote discover                 list hosts on the LAN
//! devconsole-remote exec 10.0.0.5:24810 cmdlist
//! devconsole-remote repl [10.0.0.5:24810]    interactive session
//! ```
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ Cli::parse()            -- clap, flags may also come from the environment
//!  └─ RemoteClient::start()   -- UDP socket + receive thread
//!  └─ sub-command
//!       ├─ discover  -> broadcast, collect ServerDiscovered until the timeout
//!       ├─ exec      -> connect, send one line, print output until it settles
//!       └─ repl      -> connect, stdin lines -> send_command, output -> stdout
//! ```

use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::info;
use tracing_subscriber::EnvFilter;

use console_core::protocol::{ReliabilityConfig, DEFAULT_PORT};
use console_remote::application::render::{render_frame, StdoutTerminal, DEFAULT_WIDTH};
use console_remote::application::{ConnectionStatus, RemoteEvent, ServerInfo};
use console_remote::infrastructure::network::{drive, RemoteClient, RemoteConfig, TICK};

/// Output frames are unreliable and carry no end marker, so `exec` keeps
/// listening this long after the command was acknowledged.
const OUTPUT_LINGER: Duration = Duration::from_millis(300);

#[derive(Debug, Parser)]
#[command(name = "devconsole-remote", version, about = "Remote developer console")]
struct Cli {
    /// Port console hosts listen on.
    #[arg(long, env = "DEVCONSOLE_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Address discovery requests are sent to.
    #[arg(long, env = "DEVCONSOLE_BROADCAST", default_value = "255.255.255.255")]
    broadcast: IpAddr,

    /// How long to wait for discovery responses.
    #[arg(long, default_value_t = 1000)]
    discover_timeout_ms: u64,

    /// Time without an ack before a command is resent.
    #[arg(long, default_value_t = 250)]
    resend_interval_ms: u64,

    /// Sends of one command before the session is considered lost.
    #[arg(long, default_value_t = 20)]
    max_attempts: u32,

    /// `tracing` level used when `RUST_LOG` is not set.
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Lists console hosts on the local network.
    Discover,
    /// Runs one command line on a host and prints its output.
    Exec {
        /// Host endpoint, e.g. 192.168.1.20:24810.
        addr: SocketAddr,
        /// The command line.
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        line: Vec<String>,
    },
    /// Interactive session.  Without an address the first discovered host is used.
    Repl { addr: Option<SocketAddr> },
}

impl Cli {
    fn remote_config(&self) -> RemoteConfig {
        RemoteConfig {
            port: self.port,
            broadcast: self.broadcast,
            discover_timeout: Duration::from_millis(self.discover_timeout_ms),
            reliability: ReliabilityConfig {
                resend_interval: Duration::from_millis(self.resend_interval_ms),
                max_attempts: self.max_attempts.max(1),
            },
            ..RemoteConfig::default()
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = cli.remote_config();
    let mut client = RemoteClient::start(config.clone()).context("failed to open UDP socket")?;

    match cli.command {
        Command::Discover => {
            let servers = discover(&mut client, &config).await?;
            if servers.is_empty() {
                println!("no console hosts answered");
            }
            for server in servers {
                println!("{:<32} {}", server.identity, server.endpoint);
            }
        }
        Command::Exec { addr, line } => {
            connect(&mut client, addr, &config).await?;
            let result = exec(&mut client, &line.join(" ")).await;
            client.disconnect(Instant::now());
            result?;
        }
        Command::Repl { addr } => {
            let addr = match addr {
                Some(addr) => addr,
                None => {
                    let servers = discover(&mut client, &config).await?;
                    let Some(first) = servers.into_iter().next() else {
                        bail!("no console hosts answered; pass an address");
                    };
                    println!("using {first}");
                    first.endpoint
                }
            };
            connect(&mut client, addr, &config).await?;
            let result = repl(&mut client).await;
            client.disconnect(Instant::now());
            result?;
        }
    }
    Ok(())
}

async fn discover(client: &mut RemoteClient, config: &RemoteConfig) -> anyhow::Result<Vec<ServerInfo>> {
    client.discover(Instant::now()).context("discovery broadcast failed")?;
    drive(client, config.discover_timeout + Duration::from_secs(1), |c, _| {
        c.status() == ConnectionStatus::Disconnected
    })
    .await;
    Ok(client.servers().iter().cloned().collect())
}

async fn connect(client: &mut RemoteClient, addr: SocketAddr, config: &RemoteConfig) -> anyhow::Result<()> {
    client
        .connect(addr, Instant::now())
        .with_context(|| format!("failed to contact {addr}"))?;
    drive(client, config.connect_timeout + Duration::from_secs(1), |c, _| {
        c.status() != ConnectionStatus::Connecting
    })
    .await;
    if client.status() != ConnectionStatus::Connected {
        bail!("could not connect to {addr}");
    }
    info!("connected to {addr}");
    Ok(())
}

async fn exec(client: &mut RemoteClient, line: &str) -> anyhow::Result<()> {
    let width = terminal_width();
    let mut term = StdoutTerminal;
    client
        .send_command(line, true, Instant::now())
        .context("failed to send command")?;

    let mut acked_at: Option<Instant> = None;
    let mut lost = false;
    drive(client, Duration::from_secs(30), |c, events| {
        for event in events {
            match event {
                RemoteEvent::Output(frame) => render_frame(&frame, width, &mut term),
                RemoteEvent::StatusChanged(ConnectionStatus::Disconnected) => lost = true,
                _ => {}
            }
        }
        if lost {
            return true;
        }
        if c.pending_commands() == 0 {
            let since = *acked_at.get_or_insert_with(Instant::now);
            return since.elapsed() >= OUTPUT_LINGER;
        }
        false
    })
    .await;

    if lost {
        bail!("session lost before the command completed");
    }
    Ok(())
}

async fn repl(client: &mut RemoteClient) -> anyhow::Result<()> {
    let width = terminal_width();
    let mut term = StdoutTerminal;
    let mut lines = spawn_stdin_reader().context("failed to start stdin reader")?;
    let mut ticker = tokio::time::interval(TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    println!("connected; type commands, '/quit' to leave");
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            line = lines.recv() => {
                let Some(line) = line else { break };
                if line == "/quit" {
                    break;
                }
                client.send_command(&line, true, Instant::now())?;
            }
            _ = ticker.tick() => {
                for event in client.update(Instant::now()) {
                    match event {
                        RemoteEvent::Output(frame) => render_frame(&frame, width, &mut term),
                        RemoteEvent::StatusChanged(ConnectionStatus::Disconnected) => {
                            println!("session closed");
                            return Ok(());
                        }
                        RemoteEvent::StatusChanged(status) => info!("status: {status}"),
                        RemoteEvent::ServerDiscovered(_) => {}
                    }
                }
            }
        }
    }
    Ok(())
}

fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|c| c.parse().ok())
        .unwrap_or(DEFAULT_WIDTH)
}

/// Reads stdin on a plain thread; blocking reads must not hold up the runtime
/// at shutdown.
fn spawn_stdin_reader() -> std::io::Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::Builder::new()
        .name("devconsole-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lines() {
                let Ok(line) = line else { break };
                if tx.blocking_send(line.trim().to_string()).is_err() {
                    break;
                }
            }
        })?;
    Ok(rx)
}
