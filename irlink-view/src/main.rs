//! irlink viewer — entry point.
//!
//! ```text
//! irlink-view                          Connect with defaults
//! irlink-view --connect <addr>         Connect to a specific sender
//! irlink-view --record <dir>           Also record decoded frames
//! irlink-view --frames <n>             Stop after n frames
//! irlink-view --gen-config             Dump default config and exit
//! ```
//!
//! Connects to a sender, then drives reassembled frames through the
//! decode / record / enhance pipeline into the display seam.

mod config;

use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use irlink_core::{
    FramePipeline, HistogramStretch, SequenceWriter, StatsDisplay, VideoClient, VideoDisplay,
    VideoRx, ZstdDecoder,
};

use crate::config::ViewConfig;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "irlink-view", about = "irlink thermal video viewer/recorder")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "irlink-view.toml")]
    config: PathBuf,

    /// Sender address (overrides config). Example: 192.168.1.50:9000
    #[arg(long)]
    connect: Option<String>,

    /// Record decoded frames into this sequence directory.
    #[arg(short, long)]
    record: Option<String>,

    /// Stop after receiving this many frames.
    #[arg(long)]
    frames: Option<u64>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&ViewConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = ViewConfig::load(&cli.config);
    if let Some(addr) = cli.connect {
        config.network.server_addr = addr;
    }
    if let Some(dir) = cli.record {
        config.record.dir = dir;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("irlink-view v{}", env!("CARGO_PKG_VERSION"));

    if !config.enhance.num_bins.is_power_of_two() {
        return Err("enhance.num_bins must be a power of two".into());
    }

    // ── 1. Connect to the sender ────────────────────────────────

    let mut client = VideoClient::new(config.network.server_addr.parse()?);
    info!("connecting to {}", config.network.server_addr);
    client.connect().await?;

    let format = client.frame_format()?;
    info!(
        width = format.width,
        height = format.height,
        components = format.num_components,
        bpp = format.bits_per_pixel,
        "video format"
    );

    // ── 2. Build the receive pipeline ───────────────────────────

    let mut pipeline = FramePipeline::new();
    pipeline.add_stage(ZstdDecoder::new());
    if !config.record.dir.is_empty() {
        info!("recording to {}", config.record.dir);
        pipeline.add_stage(SequenceWriter::new(&config.record.dir)?);
    }
    if config.enhance.stretch {
        pipeline.add_stage(HistogramStretch::new(config.enhance.num_bins));
    }

    let mut display = StatsDisplay::new();
    if let Some(limit) = cli.frames {
        display = display.with_frame_limit(limit);
    }
    display.open()?;

    // ── 3. Consume frames ───────────────────────────────────────

    loop {
        let frame = client.recv_frame().await?;
        match pipeline.run(frame) {
            Ok(frame) => {
                display.set_frame(&frame);
                if !display.update() {
                    info!("frame limit reached");
                    break;
                }
            }
            // A bad frame is dropped; the next one is unaffected.
            Err(e) => warn!(error = %e, "frame dropped"),
        }
    }

    let frames_seen = display.frames_seen();
    info!(frames = frames_seen, "shutting down");
    Ok(())
}
