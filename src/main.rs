//! marga-sim - Perturbation-testing harness daemon
//!
//! Binds the simulator-facing TCP channel, waits for the simulator to
//! connect, and drives generated roads episode after episode with a
//! placeholder cruise policy. Real experiments link against the library and
//! supply their own [`DrivingAgent`].

use marga_sim::bridge::{RawFrameDecoder, TcpChannel};
use marga_sim::{Action, DrivingAgent, Error, HarnessConfig, Result, RoadGenerator, SimulatorBridge};
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Fixed-throttle stand-in policy used when no agent is wired up
struct CruiseAgent {
    throttle: f64,
}

impl DrivingAgent for CruiseAgent {
    fn act(&mut self, _frame: &marga_sim::bridge::CameraFrame) -> Action {
        Action {
            steering: 0.0,
            throttle: self.throttle,
        }
    }
}

/// Parse config path from command line arguments.
///
/// Supports:
/// - `marga-sim <path>` (positional)
/// - `marga-sim --config <path>` (flag-based)
/// - `marga-sim -c <path>` (short flag)
///
/// Defaults to `marga-sim.toml` if not specified.
fn parse_config_path() -> String {
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }

    if args.len() > 1 && !args[1].starts_with('-') {
        return args[1].clone();
    }

    "marga-sim.toml".to_string()
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("marga-sim v0.1.0 starting...");

    let config_path = parse_config_path();
    let config = match HarnessConfig::from_file(&config_path) {
        Ok(config) => {
            log::info!("Using config: {}", config_path);
            config
        }
        Err(e) => {
            log::warn!("Could not load {}: {}; using defaults", config_path, e);
            HarnessConfig::udacity_defaults()
        }
    };

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("error setting Ctrl-C handler: {}", e)))?;

    let mut generator = RoadGenerator::new(&config.road)?;

    let channel = TcpChannel::bind(&config.network.bind_address)?;
    let decoder = Arc::new(RawFrameDecoder::new(config.camera));
    let mut bridge = SimulatorBridge::new(Box::new(channel), decoder, config.episode);

    bridge.start()?;

    let mut agent = CruiseAgent { throttle: 0.3 };
    let mut episode: u64 = 0;

    while running.load(Ordering::Relaxed) {
        episode += 1;
        let road = generator.generate()?;
        let track = road.to_track_string()?;
        log::info!(
            "Episode {}: driving road with {} sample points",
            episode,
            road.road_points.len()
        );

        bridge.reset(Some(track), false);

        let mut steps: u64 = 0;
        loop {
            if !running.load(Ordering::Relaxed) {
                break;
            }
            let step = match bridge.observe() {
                Ok(step) => step,
                Err(Error::ConnectionTimeout) => {
                    log::error!("Episode {}: simulator stalled, abandoning episode", episode);
                    break;
                }
                Err(e) => return Err(e),
            };
            steps += 1;

            if step.done {
                log::info!(
                    "Episode {} finished after {} steps: success={}, cte={:.2}",
                    episode,
                    steps,
                    step.info.is_success,
                    step.info.cte
                );
                break;
            }

            bridge.take_action(agent.act(&step.frame));
        }
    }

    bridge.quit();
    log::info!("marga-sim stopped");
    Ok(())
}
