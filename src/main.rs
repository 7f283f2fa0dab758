// Standard library
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

// 3rd party crates
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::signal::ctrl_c;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

// Project imports
use swarm_admission::gate::Command;
use swarm_admission::settings::ConfigManager;
use swarm_admission::RateLimiter;

/// Main entry point for the admission gate.
/// Reads destination ids and control commands from stdin, one per line, and
/// answers each with a JSON document on stdout.
///
/// Features:
/// - Two-level rate limiting (global and per destination)
/// - Periodic backpressure monitoring
/// - Configurable limits with safe fallbacks
/// - Detailed logging
#[tokio::main]
async fn main() {
    // loads the .env file from the current directory or parents.
    dotenvy::dotenv_override().ok();

    let config: Arc<ConfigManager> = match ConfigManager::new().await {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("Failed to initialize configuration: {}", e);
            std::process::exit(1);
        }
    };

    // setup logging.
    let log_level: String = config.get_log_level().await;

    let filter: EnvFilter = EnvFilter::builder()
        .with_default_directive(LevelFilter::ERROR.into())
        .parse_lossy(log_level);

    // stdout carries the JSON responses, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    config.adjust_logging_level().await;

    if config.created_default {
        info!("Default configuration file created at: {:?}", config.config_path);
    }
    info!("Settings have been loaded from {:?}", config.config_path);

    // Create a broadcast channel for shutdown signal
    let (shutdown_tx, _) = broadcast::channel(1);
    let shutdown_tx_clone = shutdown_tx.clone();

    // Handle Ctrl+C
    tokio::spawn(async move {
        if let Err(e) = ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        info!("Received shutdown signal, initiating graceful shutdown...");
        let _ = shutdown_tx_clone.send(());
    });

    // Run the main application logic with shutdown signal
    if let Err(e) = run(config, shutdown_tx.subscribe()).await {
        error!("Application error: {}", e);
    }

    info!("Shutdown complete.");
}

/// Main application loop.
///
/// This function:
/// - Answers admission checks and control commands read from stdin
/// - Evaluates backpressure on the configured monitor interval
/// - Stops on end of input or on the shutdown signal
async fn run(
    config: Arc<ConfigManager>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), Box<dyn Error>> {
    let settings = config.get_settings().await;
    let monitor_interval: u64 = settings.get_monitor_interval();
    let limiter = RateLimiter::new(settings.get_limiter());
    // Drop the settings lock
    drop(settings);

    info!(
        "Evaluating backpressure every {} ms, threshold {}",
        monitor_interval,
        limiter.config().backpressure_threshold
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut monitor = tokio::time::interval(Duration::from_millis(monitor_interval));

    loop {
        tokio::select! {
            // Handle shutdown signal
            Ok(_) = shutdown_rx.recv() => {
                break;
            }

            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("End of input reached");
                    break;
                };
                let Some(command) = Command::parse(&line) else {
                    continue;
                };

                let response = command.execute(&limiter)?;
                let mut rendered = serde_json::to_vec(&response)?;
                rendered.push(b'\n');
                stdout.write_all(&rendered).await?;
                stdout.flush().await?;
            }

            _ = monitor.tick() => {
                let status = limiter.backpressure();
                if status.backpressure {
                    warn!(
                        "Backpressure: level {} across {} saturated buckets",
                        status.level,
                        status.signals.len()
                    );
                } else {
                    debug!(
                        "No backpressure: level {}, {} destinations tracked",
                        status.level,
                        limiter.tracked_agents()
                    );
                }
            }
        }
    }

    let metrics = limiter.metrics();
    info!(
        "Final metrics: {} requests, {} allowed, {} denied, {} backpressure events",
        metrics.total_requests, metrics.allowed, metrics.denied, metrics.backpressure_events
    );
    Ok(())
}
