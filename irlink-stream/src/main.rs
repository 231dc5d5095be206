//! irlink sender — entry point.
//!
//! ```text
//! irlink-stream                       Stream the test pattern
//! irlink-stream --source <dir>        Replay a recorded sequence
//! irlink-stream --config <path>       Use custom config TOML
//! irlink-stream --gen-config          Dump default config and exit
//! ```
//!
//! Waits for one viewer on the control port, then pushes frames from
//! the selected source through the encode pipeline and onto the wire.

mod config;

use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use irlink_core::{
    FramePipeline, RecordingSource, TestPatternSource, VideoFrame, VideoServer, VideoSource,
    VideoTx, ZstdEncoder,
};

use crate::config::StreamConfig;

/// Control-channel liveness is probed once per this many frames.
const POLL_INTERVAL_FRAMES: u32 = 32;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "irlink-stream", about = "irlink thermal video sender")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "irlink-stream.toml")]
    config: PathBuf,

    /// Listen address (overrides config). Example: 0.0.0.0:9000
    #[arg(short, long)]
    listen: Option<String>,

    /// Video source (overrides config): "pattern" or a sequence directory.
    #[arg(short, long)]
    source: Option<String>,

    /// Frames per second (overrides config).
    #[arg(long)]
    fps: Option<u32>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&StreamConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = StreamConfig::load(&cli.config);
    if let Some(listen) = cli.listen {
        config.network.listen_addr = listen;
    }
    if let Some(source) = cli.source {
        if source == "pattern" {
            config.source.kind = "pattern".into();
        } else {
            config.source.kind = "recording".into();
            config.source.sequence_dir = source;
        }
    }
    if let Some(fps) = cli.fps {
        config.source.fps = fps;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("irlink-stream v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Open the video source ────────────────────────────────

    let mut source: Box<dyn VideoSource> = match config.source.kind.as_str() {
        "pattern" => Box::new(TestPatternSource::new(
            config.source.width,
            config.source.height,
            config.source.fps,
        )),
        "recording" => Box::new(RecordingSource::new(
            &config.source.sequence_dir,
            config.source.fps,
        )?),
        other => return Err(format!("unknown source kind: {other}").into()),
    };

    let format = source.format()?;
    info!(
        width = format.width,
        height = format.height,
        components = format.num_components,
        bpp = format.bits_per_pixel,
        "video format"
    );

    // ── 2. Await the viewer ─────────────────────────────────────

    let mut server = VideoServer::bind(config.network.listen_addr.parse()?).await?;
    server.set_frame_format(format);
    info!("waiting for viewer on {}", config.network.listen_addr);
    server.await_connection().await?;

    // ── 3. Stream ───────────────────────────────────────────────

    let (tx, mut rx) = tokio::sync::mpsc::channel::<VideoFrame>(4);
    source.on_frame(Box::new(move |frame| {
        // The link is best-effort: drop frames when the sender lags.
        if tx.try_send(frame).is_err() {
            tracing::debug!("send queue full; frame dropped");
        }
    }));
    source.start()?;

    let mut pipeline = FramePipeline::new();
    pipeline.add_stage(ZstdEncoder::new().with_level(config.encoder.level));

    let frame_len = format.frame_len();
    let mut frames_sent = 0u64;
    let mut since_poll = 0u32;

    while let Some(mut frame) = rx.recv().await {
        if frame.buffer.len() < frame_len {
            warn!(
                got = frame.buffer.len(),
                want = frame_len,
                "incomplete frame from source; skipped"
            );
            continue;
        }
        frame.buffer.truncate(frame_len);

        let encoded = match pipeline.run(frame) {
            Ok(f) => f,
            Err(e) => {
                warn!(error = %e, "encode failed; frame dropped");
                continue;
            }
        };

        server.send_frame(&encoded).await?;
        frames_sent += 1;

        since_poll += 1;
        if since_poll >= POLL_INTERVAL_FRAMES {
            since_poll = 0;
            if !server.poll_client().await? {
                info!("viewer disconnected");
                break;
            }
        }
    }

    info!(frames_sent, "source drained; shutting down");
    Ok(())
}
