//! Vida Nova -- headless host.
//!
//! Runs one session without a display surface. Frames are paced at the clock's
//! frame interval unless `--unpaced` is given, in which case an open narrative
//! request is waited on instead. The session is played either by the autopilot or by a
//! replay script, and the final snapshot is printed as JSON.
//!
//! Narrative messages come from the Gemini API when `API_KEY` is set; without
//! it every conversation shows the fallback message.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;

use vn_game::autopilot;
use vn_game::config::{load_config_from_path, GameConfig};
use vn_game::environment::HeadlessEnvironment;
use vn_game::narrative::{GeminiCollaborator, NarrativeCollaborator, OfflineCollaborator};
use vn_game::phase::Phase;
use vn_game::replay::{load_replay_from_path, run_replay};
use vn_game::session::Session;

const DEFAULT_VIEWPORT_HEIGHT: f32 = 900.0;
const DEFAULT_MAX_FRAMES: u64 = 36_000;

struct Options {
    config_path: Option<PathBuf>,
    replay_path: Option<PathBuf>,
    seed: Option<u64>,
    viewport_height: f32,
    max_frames: u64,
    unpaced: bool,
}

fn usage() -> String {
    "Usage: vida_nova [--config <path>] [--replay <path>] [--seed <u64>] \
     [--viewport-height <f32>] [--max-frames <n>] [--unpaced]"
        .to_string()
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut options = Options {
        config_path: None,
        replay_path: None,
        seed: None,
        viewport_height: DEFAULT_VIEWPORT_HEIGHT,
        max_frames: DEFAULT_MAX_FRAMES,
        unpaced: false,
    };

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--unpaced" => options.unpaced = true,
            "--help" | "-h" => return Err(usage()),
            flag @ ("--config" | "--replay" | "--seed" | "--viewport-height" | "--max-frames") => {
                let value = iter
                    .next()
                    .ok_or_else(|| format!("Missing value for {flag}\n{}", usage()))?;
                match flag {
                    "--config" => options.config_path = Some(PathBuf::from(value)),
                    "--replay" => options.replay_path = Some(PathBuf::from(value)),
                    "--seed" => {
                        options.seed = Some(
                            value
                                .parse::<u64>()
                                .map_err(|e| format!("Invalid seed '{value}': {e}"))?,
                        )
                    }
                    "--viewport-height" => {
                        options.viewport_height = value
                            .parse::<f32>()
                            .map_err(|e| format!("Invalid viewport height '{value}': {e}"))?
                    }
                    _ => {
                        options.max_frames = value
                            .parse::<u64>()
                            .map_err(|e| format!("Invalid max frames '{value}': {e}"))?
                    }
                }
            }
            other => return Err(format!("Unknown argument '{other}'\n{}", usage())),
        }
    }
    Ok(options)
}

fn main() -> Result<(), String> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = parse_args(&args)?;

    let config = match &options.config_path {
        Some(path) => load_config_from_path(path)?,
        None => GameConfig::default(),
    };
    let replay = match &options.replay_path {
        Some(path) => Some(load_replay_from_path(path)?),
        None => None,
    };

    let seed = options
        .seed
        .or_else(|| replay.as_ref().and_then(|r| r.seed))
        .unwrap_or_else(rand::random);
    log::info!("Vida Nova starting (seed {seed})");

    let collaborator: Arc<dyn NarrativeCollaborator> =
        match GeminiCollaborator::from_env(Duration::from_millis(config.narrative_timeout_ms)) {
            Some(gemini) => Arc::new(gemini),
            None => {
                log::info!("API_KEY not set; conversations will use the fallback message");
                Arc::new(OfflineCollaborator)
            }
        };

    let env = HeadlessEnvironment::new(options.viewport_height);
    let frame_interval = Duration::from_micros(env.clock.frame_interval_us);
    let mut session = Session::new(config, env, StdRng::seed_from_u64(seed), collaborator);

    match replay {
        Some(replay) => {
            let report = run_replay(&mut session, &replay.expanded_inputs());
            log::info!(
                "Replay finished after {} frames ({} rejected actions)",
                report.frames,
                report.rejected_actions
            );
        }
        None => {
            let mut frames = 0;
            while frames < options.max_frames && autopilot::drive_frame(&mut session) {
                frames += 1;
                if options.unpaced {
                    if session.is_loading() {
                        session.await_message();
                    }
                } else {
                    thread::sleep(frame_interval);
                }
            }
            if session.phase() == Phase::Won {
                session.proceed().map_err(|e| e.to_string())?;
            } else {
                log::warn!(
                    "Autopilot stopped in {} after {frames} frames",
                    session.phase()
                );
            }
        }
    }

    println!("{}", session.snapshot().to_json()?);
    Ok(())
}
