//! Pulsehub CLI.
//!
//! Runs the telemetry hub against the built-in simulated sensor source and
//! prints every broadcast event as a JSON line. The real radio driver and
//! the web layer plug in through the library seams instead.

use clap::{Args, Parser, Subcommand};
use pulsehub::{
    BroadcastHub, Config, DeviceError, DeviceSession, LivenessMonitor, NoIdentity, SampleSink,
    SensorRegistry, SessionConfig, SimulatedConfig, SimulatedDevice, VERSION,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pulsehub")]
#[command(version = VERSION)]
#[command(about = "Multi-sensor heart-rate telemetry hub", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the hub against the simulated sensor source
    Run(RunArgs),

    /// Show the effective configuration
    Config,
}

#[derive(Args)]
struct RunArgs {
    /// Sensor ids the simulated straps report
    #[arg(long, value_delimiter = ',', default_value = "101,102")]
    sensors: Vec<u32>,

    /// Interval between simulated samples in milliseconds
    #[arg(long, default_value = "500")]
    sample_interval_ms: u64,

    /// Stop transmitting after N beats to demonstrate signal loss
    #[arg(long)]
    dropout_after: Option<u32>,

    /// Override the heartbeat timeout in seconds
    #[arg(long)]
    heartbeat_timeout: Option<f64>,

    /// Override the number of samples retained per sensor
    #[arg(long)]
    max_points: Option<usize>,

    /// Override the liveness monitor tick in milliseconds
    #[arg(long)]
    liveness_tick_ms: Option<u64>,

    /// Override the cool-down between device reopen attempts, in seconds
    #[arg(long)]
    reconnect_backoff: Option<f64>,

    /// Override the device startup window in seconds
    #[arg(long)]
    init_timeout: Option<f64>,

    /// Override the broadcast channel depth
    #[arg(long)]
    event_capacity: Option<usize>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            if let Err(e) = cmd_run(args).await {
                tracing::error!("fatal: {e}");
                // Init timeouts get a distinguishable exit status so a
                // supervisor can tell "device never came up" from other
                // failures.
                let code = match e {
                    DeviceError::InitTimeout(_) => 2,
                    _ => 1,
                };
                std::process::exit(code);
            }
        }
        Commands::Config => {
            cmd_config();
        }
    }
}

async fn cmd_run(args: RunArgs) -> Result<(), DeviceError> {
    let mut config = Config::load().unwrap_or_default();
    if let Some(secs) = args.heartbeat_timeout {
        config.heartbeat_timeout = Duration::from_secs_f64(secs);
    }
    if let Some(points) = args.max_points {
        config.max_points = points;
    }
    if let Some(ms) = args.liveness_tick_ms {
        config.liveness_tick = Duration::from_millis(ms);
    }
    if let Some(secs) = args.reconnect_backoff {
        config.reconnect_backoff = Duration::from_secs_f64(secs);
    }
    if let Some(secs) = args.init_timeout {
        config.init_timeout = Duration::from_secs_f64(secs);
    }
    if let Some(depth) = args.event_capacity {
        config.event_capacity = depth;
    }

    tracing::info!(version = VERSION, "starting pulsehub");

    let registry = Arc::new(SensorRegistry::new(config.max_points));
    let hub = BroadcastHub::new(config.event_capacity);
    let sink = SampleSink::new(registry.clone(), hub.clone(), Arc::new(NoIdentity));

    // Subscribe before the session opens so startup events are not missed.
    let mut events = hub.subscribe();

    let device = Box::new(SimulatedDevice::new(SimulatedConfig {
        sensor_ids: args.sensors,
        sample_interval: Duration::from_millis(args.sample_interval_ms),
        dropout_after: args.dropout_after,
    }));

    let session = DeviceSession::start(
        device,
        sink.clone(),
        SessionConfig {
            reconnect_backoff: config.reconnect_backoff,
            init_timeout: config.init_timeout,
        },
    )?;
    let monitor = LivenessMonitor::spawn(sink, config.liveness_tick, config.heartbeat_timeout);

    tracing::info!("telemetry hub running, press Ctrl+C to stop");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            event = events.recv() => match event {
                Ok(message) => match serde_json::to_string(&message) {
                    Ok(line) => println!("{line}"),
                    Err(e) => tracing::warn!("failed to serialize event: {e}"),
                },
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!("output fell behind, dropped {n} events");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    tracing::info!(sensors_seen = registry.len(), "shutting down");
    monitor.shutdown().await;
    // The session thread may block up to its poll interval; join it off
    // the async runtime.
    let _ = tokio::task::spawn_blocking(move || session.shutdown()).await;

    Ok(())
}

fn cmd_config() {
    let config = Config::load().unwrap_or_default();

    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}
