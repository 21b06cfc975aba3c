use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use clap::Parser;
use color_eyre::Result;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use ledgrid_sim::config::SimConfig;
use ledgrid_sim::joypad::{JoypadHandle, WriterHandle};
use ledgrid_sim::wled::{FrameBuffer, ReceiverHandle, UpdateProcessor, PACKET_QUEUE_CAPACITY};

// Presentation tick cadence
const TICK_RATE_HZ: u64 = 60;

#[derive(Parser, Debug)]
#[command(
    name = "ledgrid-sim",
    about = "LED matrix display simulator speaking the WLED realtime protocol"
)]
struct Cli {
    /// Grid width
    #[arg(short = 'W', long)]
    width: Option<usize>,

    /// Grid height
    #[arg(short = 'H', long)]
    height: Option<usize>,

    /// Listen address
    #[arg(short, long)]
    address: Option<IpAddr>,

    /// Listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Joypad fifo path, created as a named pipe when absent
    #[arg(short, long)]
    fifo: Option<PathBuf>,

    /// Settings file; flags given on the command line override it
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> Result<SimConfig> {
        let mut config = match &self.config {
            Some(path) => SimConfig::load(path)?,
            None => SimConfig::load_or_default(),
        };

        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(address) = self.address {
            config.address = address;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(fifo) = self.fifo {
            config.fifo = Some(fifo);
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = Cli::parse().into_config()?;
    info!("Starting LED grid simulator");
    info!(
        "Grid resolution: {} x {}, listening on {}",
        config.width,
        config.height,
        config.listen_addr()
    );

    let framebuffer = Arc::new(Mutex::new(FrameBuffer::new(config.width, config.height)));

    // Receive task; a failed bind aborts startup before anything else runs
    let (packet_sender, packet_receiver) = mpsc::channel(PACKET_QUEUE_CAPACITY);
    let _receiver_handle = ReceiverHandle::spawn(config.listen_addr(), packet_sender).await?;

    // Joypad bridge and its writer task. The handle stays alive for the
    // process lifetime; dropping it would close the queue and end the writer.
    let (joypad, joypad_events) = JoypadHandle::create();
    let _writer_handle = WriterHandle::spawn(config.fifo.clone(), joypad_events)?;
    let _joypad = joypad;
    match &config.fifo {
        Some(path) => info!("Forwarding joypad events to {}", path.display()),
        None => info!("No joypad fifo configured, events will be discarded"),
    }

    let mut processor = UpdateProcessor::new(packet_receiver, framebuffer.clone());

    // Headless stand-in for the presentation tick: drain, refresh activity,
    // report status instead of rendering.
    let mut ticker = tokio::time::interval(Duration::from_micros(1_000_000 / TICK_RATE_HZ));
    let mut last_status = String::new();
    loop {
        ticker.tick().await;
        let now = Local::now();
        processor.process_pending(now).await;

        let mut fb = framebuffer.lock().await;
        if fb.updated() {
            let status = fb.status_line(now);
            if status != last_status {
                info!("{}", status);
                last_status = status;
            }
            fb.clear_updated();
        }
    }
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "width = 16\nheight = 16\nport = 19446\n").unwrap();

        let cli = Cli::try_parse_from([
            "ledgrid-sim",
            "--config",
            path.to_str().unwrap(),
            "--width",
            "32",
        ])
        .unwrap();

        let config = cli.into_config().unwrap();
        assert_eq!(config.width, 32); // flag wins
        assert_eq!(config.height, 16); // file value
        assert_eq!(config.port, 19446);
        assert_eq!(config.address, IpAddr::from([127, 0, 0, 1]));
    }

    #[test]
    fn zero_grid_from_flags_is_rejected() {
        let cli = Cli::try_parse_from(["ledgrid-sim", "--width", "0"]).unwrap();
        assert!(cli.into_config().is_err());
    }
}
