//! wxlink CLI - control an ESP32 weather display from the terminal

use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast;
use tracing::warn;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wxlink::{
    Broadcast, ConnectionState, DeviceConfig, DeviceSession, DispatchOutcome, SessionEvent,
};

const CONNECT_DEADLINE: Duration = Duration::from_secs(10);

#[derive(Parser, Debug)]
#[command(name = "wxlink")]
#[command(about = "Session controller for ESP32 weather display devices")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Device host or IP (stream on :81, commands on :80)
    #[arg(long, global = true, env = "WXLINK_HOST")]
    host: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Connect and print broadcast readings until interrupted
    Watch,
    /// Push a city selection over the stream
    City { name: String },
    /// Inject a manual temperature for the override window
    Manual { value: String },
    /// Halt the device's automatic updates
    Stop,
    /// Resume the device's automatic updates
    Resume,
}

impl Cli {
    fn initialize_logging(&self) {
        let filter = if self.debug {
            EnvFilter::new("debug")
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli.initialize_logging();

    let host = cli
        .host
        .clone()
        .ok_or_else(|| anyhow!("device host required: pass --host or set WXLINK_HOST"))?;
    let session =
        DeviceSession::new(DeviceConfig::new(host)).context("failed to set up device session")?;

    match cli.command {
        CliCommand::Watch => watch(&session).await,
        CliCommand::City { name } => send_city(&session, &name).await,
        CliCommand::Manual { value } => {
            let outcome = session.manual_override(&value).await?;
            print_outcome(&outcome);
            Ok(())
        }
        CliCommand::Stop => {
            let outcome = session.stop().await?;
            print_outcome(&outcome);
            Ok(())
        }
        CliCommand::Resume => {
            let outcome = session.resume().await?;
            print_outcome(&outcome);
            Ok(())
        }
    }
}

async fn watch(session: &DeviceSession) -> anyhow::Result<()> {
    let mut rx = session.subscribe();
    session.connect().await?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = rx.recv() => match event {
                Ok(event) => print_event(&event),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    session.disconnect().await;
    Ok(())
}

async fn send_city(session: &DeviceSession, name: &str) -> anyhow::Result<()> {
    let mut rx = session.subscribe();
    session.connect().await?;
    wait_until_connected(&mut rx).await?;
    session.send_city(name).await?;
    println!("city \"{name}\" sent");
    session.disconnect().await;
    Ok(())
}

async fn wait_until_connected(
    rx: &mut broadcast::Receiver<SessionEvent>,
) -> anyhow::Result<()> {
    tokio::time::timeout(CONNECT_DEADLINE, async {
        loop {
            match rx.recv().await {
                Ok(SessionEvent::StatusChanged {
                    state: ConnectionState::Connected,
                    ..
                }) => return Ok(()),
                Ok(SessionEvent::StatusChanged {
                    state: ConnectionState::Disconnected,
                    detail,
                }) => bail!("connection failed: {}", detail.unwrap_or_default()),
                Ok(_) => {}
                Err(e) => bail!("event channel closed: {e}"),
            }
        }
    })
    .await
    .map_err(|_| anyhow!("timed out waiting for connection"))?
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::StatusChanged { state, detail } => match detail {
            Some(detail) => println!("[status] {state}: {detail}"),
            None => println!("[status] {state}"),
        },
        SessionEvent::ReadingUpdated(Broadcast::Structured(reading)) => {
            println!(
                "{} — {} °C — {}",
                reading.city, reading.temperature, reading.description
            );
        }
        SessionEvent::ReadingUpdated(Broadcast::Opaque(text)) => println!("{text}"),
        SessionEvent::BroadcastSuppressed { raw } => {
            println!("[override] broadcast ignored: {raw}");
        }
        SessionEvent::OverrideStarted { value } => {
            println!("[override] showing {value} °C");
        }
        SessionEvent::OverrideEnded => {
            println!("[override] ended, back to live readings");
        }
        SessionEvent::CommandCompleted(outcome) => print_outcome(outcome),
    }
}

fn print_outcome(outcome: &DispatchOutcome) {
    match (&outcome.status, &outcome.error) {
        (Some(status), _) => println!(
            "POST /update -> {status} {} : {}",
            outcome.status_text.as_deref().unwrap_or(""),
            outcome.body.as_deref().unwrap_or("")
        ),
        (None, Some(error)) => println!("POST /update failed: {error}"),
        (None, None) => println!("POST /update: no response"),
    }
}
