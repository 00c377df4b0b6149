//! Scripted input replays.
//!
//! A replay lists frames of held keys, each optionally repeated and optionally
//! carrying a user action that fires on the first repetition. Running the same
//! replay against the same seed always ends in the same state.

use rand::Rng;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use vn_core::input::Key;

use crate::environment::HeadlessEnvironment;
use crate::session::Session;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReplayAction {
    Start,
    ConfirmMission,
    Proceed,
    Restart,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReplaySequence {
    #[serde(default)]
    pub seed: Option<u64>,
    pub frames: Vec<ReplayFrame>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReplayFrame {
    #[serde(default)]
    pub keys: Vec<Key>,
    #[serde(default)]
    pub action: Option<ReplayAction>,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayInput {
    pub keys: Vec<Key>,
    pub action: Option<ReplayAction>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub frames: usize,
    pub rejected_actions: usize,
}

impl ReplaySequence {
    pub fn expanded_inputs(&self) -> Vec<ReplayInput> {
        let mut out = Vec::new();
        for frame in &self.frames {
            for i in 0..frame.repeat.max(1) {
                out.push(ReplayInput {
                    keys: frame.keys.clone(),
                    action: if i == 0 { frame.action } else { None },
                });
            }
        }
        out
    }
}

pub fn load_replay_from_path(path: &Path) -> Result<ReplaySequence, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let replay: ReplaySequence = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse replay JSON {}: {e}", path.display()))?;
    validate_replay(&replay)?;
    Ok(replay)
}

fn validate_replay(replay: &ReplaySequence) -> Result<(), String> {
    if replay.frames.is_empty() {
        return Err("Replay validation failed: frames list is empty".to_string());
    }
    Ok(())
}

/// Feeds each input to the session and runs one host frame per input. Actions
/// that the current phase does not accept are logged and skipped, the same as
/// a click on a button that is not shown. Frames run as fast as possible, so
/// an open narrative request is waited on before the next input; this also
/// keeps the outcome independent of how long the collaborator takes.
pub fn run_replay<R: Rng>(
    session: &mut Session<HeadlessEnvironment, R>,
    inputs: &[ReplayInput],
) -> ReplayReport {
    let mut report = ReplayReport::default();
    for input in inputs {
        session.set_held_keys(&input.keys);
        if let Some(action) = input.action {
            let result = match action {
                ReplayAction::Start => session.start(),
                ReplayAction::ConfirmMission => session.confirm_mission(),
                ReplayAction::Proceed => session.proceed(),
                ReplayAction::Restart => session.restart(),
            };
            if let Err(err) = result {
                log::warn!("Replay frame {}: {err}", report.frames);
                report.rejected_actions += 1;
            }
        }
        session.run_frame();
        if session.is_loading() {
            session.await_message();
        }
        report.frames += 1;
    }
    report
}

const fn default_repeat() -> u32 {
    1
}
