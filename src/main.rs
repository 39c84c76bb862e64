// src/main.rs
mod classifier;
mod codec;
mod config;
mod control;
mod device;
mod dispatcher;
mod hand;
mod pose;
mod transport;

use anyhow::{Context, Result};
use chrono::Local;
use config::AppConfig;
use control::ControlLoop;
use device::DurationParams;
use pose::{PoseSample, PoseSource, ReplaySource};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, info_span, warn, Instrument};
use transport::{FileLink, LoopbackLink, SerialLink};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref())?;
    let source = ReplaySource::open(&config.replay)?;

    let session = format!("session_{}", Local::now().format("%Y%m%d_%H%M%S"));
    let span = info_span!("run", %session, id = %uuid::Uuid::new_v4());
    launch(&config, source).instrument(span).await
}

/// Pick the link for this run and drive it to completion.
async fn launch(config: &AppConfig, mut source: ReplaySource) -> Result<()> {
    if config.dry_run {
        info!("Dry run: commands stay in memory");
        let control = start(LoopbackLink::new(), &mut source, config).await?;
        info!("Dry run produced {} writes", control.link().written().len());
    } else {
        start(FileLink::new(), &mut source, config).await?;
    }
    Ok(())
}

async fn start<L: SerialLink>(
    link: L,
    source: &mut ReplaySource,
    config: &AppConfig,
) -> Result<ControlLoop<L>> {
    info!(
        "Replaying {} frames at {} Hz",
        source.total_frames(),
        config.tick_hz()
    );

    let durations = config.initial_durations();
    let mut control = ControlLoop::new(link, durations);
    if config.auto_connect {
        control
            .connect(&config.link)
            .with_context(|| format!("Failed to open {}", config.link.port.display()))?;

        // The controller boots with the stock durations; only push ours if they differ.
        if durations != DurationParams::default() {
            control.set_durations(durations.red, durations.yellow, durations.green);
        }
    } else {
        warn!("auto_connect is off; commands will be dropped");
    }

    let elapsed_ms = run(&mut control, source, config.tick_period()).await;

    info!(
        "Stopped at {:.0}% of replay: {}",
        source.progress() * 100.0,
        control.snapshot(elapsed_ms)
    );
    control.disconnect();
    Ok(control)
}

/// Tick until the replay runs out or Ctrl-C arrives. Returns elapsed milliseconds.
async fn run<L: SerialLink>(
    control: &mut ControlLoop<L>,
    source: &mut impl PoseSource,
    period: Duration,
) -> u64 {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let start = Instant::now();
    let mut now_ms = 0;
    let mut last_summary = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut shutdown => {
                info!("Interrupted, stopping");
                break;
            }
        }

        // Monotonic clock, sampled once per iteration.
        now_ms = start.elapsed().as_millis() as u64;

        let sample = source.next_sample();
        if sample == PoseSample::Finished {
            info!("Replay finished");
            break;
        }

        control.step(sample.hand(), now_ms);

        let snapshot = control.snapshot(now_ms);
        let summary = (snapshot.status, snapshot.gesture, snapshot.durations, snapshot.connected);
        if last_summary != Some(summary) {
            info!("{}", snapshot);
            last_summary = Some(summary);
        }
    }

    now_ms
}
