//! Recycler main entry point.
//!
//! Hexagonal architecture: adapters on the outside, the controller in the
//! middle, a single synchronous control thread.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  SimHardware       LogEventSink   JsonConfigFile   HostTime    │
//! │  (Sensor+Actuator) (EventSink)    (ConfigPort)     (Clock)     │
//! │  SimCamera         DatasetStore   StagingUploader  FileStore   │
//! │  (FrameSource)     (ImageStore)   (UploadSink)     (Storage)   │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            BinController (pure logic)                  │    │
//! │  │  FSM · Sequencer · Watchdog · Challenge window         │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Signal thread (tokio) · Operator console (stdin)              │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::io::BufRead;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recycler::adapters::config_file::JsonConfigFile;
use recycler::adapters::image_store::DatasetStore;
use recycler::adapters::kv_store::{FileStore, MemoryStore};
use recycler::adapters::log_sink::LogEventSink;
use recycler::adapters::sim::{SimCamera, SimClassifier, SimHardware, SimPanel};
use recycler::adapters::staging::StagingUploader;
use recycler::adapters::time::{HostTime, MonotonicClock};
use recycler::app::commands::ControlRequest;
use recycler::app::ports::{Clock, ConfigPort, StoragePort};
use recycler::app::service::{BinController, Collaborators};
use recycler::config::BinConfig;
use recycler::drivers::shutdown::ShutdownSignal;
use recycler::events::RequestQueue;
use recycler::sensors::{BeamId, SensorSource};

/// Directory for the persisted maintenance log.
const STATE_DIR_ENV: &str = "RECYCLER_STATE_DIR";
const DEFAULT_STATE_DIR: &str = ".recycler-state";

/// Simulated camera resolution.
const SIM_FRAME_WIDTH: u32 = 64;
const SIM_FRAME_HEIGHT: u32 = 48;

fn main() -> Result<()> {
    // ── 1. Logging ────────────────────────────────────────────
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Recycler v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Config (file or defaults) ──────────────────────────
    let config_file = JsonConfigFile::from_env();
    let config = match config_file.load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(
                "Config {} unusable ({}), running with defaults",
                config_file.path().display(),
                e
            );
            BinConfig::default()
        }
    };

    // ── 3. Shutdown on Ctrl-C / SIGTERM ───────────────────────
    let shutdown = ShutdownSignal::new();
    spawn_signal_thread(shutdown.clone())?;

    // ── 4. Construct adapters ─────────────────────────────────
    let clock = MonotonicClock::new();
    let panel = SimPanel::new();
    let hw = SimHardware::new(panel.clone());

    let state_dir = std::env::var(STATE_DIR_ENV).unwrap_or_else(|_| DEFAULT_STATE_DIR.into());
    let storage: Box<dyn StoragePort> = match FileStore::open(&state_dir) {
        Ok(store) => Box::new(store),
        Err(e) => {
            warn!("State dir {} unusable ({}), maintenance log not persisted", state_dir, e);
            Box::new(MemoryStore::new())
        }
    };

    let io = Collaborators {
        camera: Box::new(SimCamera::new(SIM_FRAME_WIDTH, SIM_FRAME_HEIGHT)),
        classifier: Box::new(SimClassifier::new()),
        images: Box::new(DatasetStore::new(&config.classified_dir)),
        uploads: Box::new(StagingUploader::new(&config.challenged_dir)),
        events: Box::new(LogEventSink::new()),
        storage,
    };

    let mut controller = BinController::new(
        config,
        hw,
        HostTime::new(clock, shutdown.clone()),
        io,
        shutdown.clone(),
    )
    .context("controller configuration rejected")?;

    // ── 5. Operator console ───────────────────────────────────
    spawn_console(controller.requests(), panel, clock, shutdown);

    // ── 6. Control loop ───────────────────────────────────────
    let result = controller.run();
    let status = controller.status();
    info!(
        "Stopped in {:?} after {} cycle(s); {} fault(s) on record",
        status.state, status.cycles, status.faults
    );
    result.context("controller stopped on a fatal error")
}

// ── Signal handling ───────────────────────────────────────────

fn spawn_signal_thread(shutdown: ShutdownSignal) -> Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("signal runtime")?;

    std::thread::Builder::new()
        .name("signals".into())
        .spawn(move || {
            rt.block_on(async {
                wait_for_signal().await;
                shutdown.request();
            });
        })
        .context("signal thread")?;
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            error!("SIGTERM handler not installed: {}", e);
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Ctrl-C handler failed: {}", e);
            }
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Ctrl-C received"),
        _ = term.recv() => info!("SIGTERM received"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Ctrl-C handler failed: {}", e);
    }
}

// ── Operator console ──────────────────────────────────────────
//
// One command per line on stdin:
//   m        toggle motion
//   b1..b4   toggle a break-beam (occluded / clear)
//   a        activate (classify now)
//   c        challenge the last decision
//   u        clear the door lock
//   r        reset the maintenance log
//   q        shut down

fn spawn_console(
    requests: Arc<RequestQueue>,
    panel: Arc<SimPanel>,
    clock: MonotonicClock,
    shutdown: ShutdownSignal,
) {
    let spawned = std::thread::Builder::new()
        .name("console".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                match line.trim() {
                    "m" => {
                        let on = panel.toggle(SensorSource::Motion);
                        info!("[console] motion {}", if on { "on" } else { "off" });
                    }
                    "b1" | "b2" | "b3" | "b4" => {
                        let idx = line.trim()[1..].parse::<usize>().unwrap_or(1) - 1;
                        let beam = BeamId::ALL[idx.min(3)];
                        let blocked = panel.toggle(SensorSource::Beam(beam));
                        info!(
                            "[console] {} {}",
                            beam,
                            if blocked { "occluded" } else { "clear" }
                        );
                    }
                    "a" => {
                        requests.push_event(ControlRequest::Activate);
                    }
                    "c" => {
                        requests.push_event(ControlRequest::Challenge {
                            at_ms: clock.now_ms(),
                        });
                    }
                    "u" => {
                        requests.push_event(ControlRequest::ClearLock);
                    }
                    "r" => {
                        requests.push_event(ControlRequest::ResetMaintenance);
                    }
                    "q" => {
                        shutdown.request();
                        break;
                    }
                    "" => {}
                    other => warn!("[console] unknown command '{}'", other),
                }
            }
        });
    if let Err(e) = spawned {
        warn!("Operator console unavailable: {}", e);
    }
}
