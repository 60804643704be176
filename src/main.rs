use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing_subscriber::EnvFilter;

use httptap::capture::PcapSource;
use httptap::config::Config;
use httptap::dispatcher::Dispatcher;
use httptap::http::{FlowEvent, HttpEvent};

/// Passively observe HTTP traffic on a network interface.
#[derive(Parser, Debug)]
#[command(name = "httptap")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML configuration file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Read packets from a pcap savefile instead of a live device
    #[arg(short = 'r', long = "read", value_name = "PCAP")]
    read: Option<PathBuf>,

    /// Capture device
    #[arg(short = 'i', long = "device")]
    device: Option<String>,

    /// Directory for in-flight fragments
    #[arg(long = "storage-root", value_name = "DIR")]
    storage_root: Option<PathBuf>,

    /// TCP port to observe
    #[arg(short = 'p', long = "port")]
    port: Option<u16>,

    /// Maximum concurrent packet units
    #[arg(long = "max-in-flight")]
    max_in_flight: Option<usize>,

    /// Seconds to drop traffic after the in-flight limit is hit
    #[arg(long = "cooldown-secs")]
    cooldown_secs: Option<u64>,
}

impl Args {
    fn apply(&self, cfg: &mut Config) {
        if let Some(device) = &self.device {
            cfg.device = device.clone();
        }
        if let Some(root) = &self.storage_root {
            cfg.storage_root = root.clone();
        }
        if let Some(port) = self.port {
            cfg.port = port;
        }
        if let Some(max) = self.max_in_flight {
            cfg.max_in_flight = max;
        }
        if let Some(secs) = self.cooldown_secs {
            cfg.shed_cooldown_secs = secs;
        }
    }
}

async fn log_events(mut events: mpsc::Receiver<FlowEvent>) {
    while let Some(FlowEvent { flow, event }) = events.recv().await {
        match &event {
            HttpEvent::Request(req) => tracing::info!(
                %flow,
                method = %req.method,
                target = %req.target,
                version = %req.version,
                "HTTP request"
            ),
            HttpEvent::Response(resp) => tracing::info!(
                %flow,
                version = %resp.version,
                status = %resp.status,
                "HTTP response"
            ),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true)
        .init();

    let args = Args::parse();
    let mut cfg = Config::load(args.config.as_deref())?;
    args.apply(&mut cfg);
    cfg.validate()?;

    std::fs::create_dir_all(&cfg.storage_root)
        .with_context(|| format!("Failed to create storage root {}", cfg.storage_root.display()))?;

    let (events_tx, events_rx) = mpsc::channel(cfg.event_buffer);
    let consumer = tokio::spawn(log_events(events_rx));
    let mut dispatcher = Dispatcher::new(&cfg, events_tx, Handle::current());

    // libpcap reads block, so intake gets its own OS thread.
    let (done_tx, done_rx) = oneshot::channel();
    let read = args.read.clone();
    std::thread::Builder::new()
        .name("capture".to_string())
        .spawn(move || {
            let result = match read {
                Some(path) => PcapSource::open_file(&path, &cfg).and_then(|mut src| dispatcher.run(&mut src)),
                None => PcapSource::open_live(&cfg).and_then(|mut src| dispatcher.run(&mut src)),
            };
            let _ = done_tx.send(result.map(|()| dispatcher));
        })
        .context("Failed to start capture thread")?;

    tokio::select! {
        res = done_rx => {
            let dispatcher = res.context("Capture thread exited unexpectedly")??;
            dispatcher.drain().await;
            tracing::info!(stats = ?dispatcher.stats(), "Capture finished");
            drop(dispatcher);
            consumer.await?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
