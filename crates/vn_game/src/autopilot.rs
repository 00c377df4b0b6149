//! Steering helper that plays a session by pressing direction keys.
//!
//! The target is always the first entity still outstanding in world order,
//! then the landmark for the current phase. Steering is per-axis with a small
//! dead zone, so the player wobbles by at most one step around a target, well
//! inside every capture radius.

use glam::Vec2;
use rand::Rng;
use vn_core::input::Key;

use crate::environment::{Environment, HeadlessEnvironment};
use crate::phase::Phase;
use crate::session::Session;

const DEAD_ZONE: f32 = 2.0;

pub fn next_target<E: Environment, R: Rng>(session: &Session<E, R>) -> Option<Vec2> {
    let world = session.world();
    let config = session.config();
    match session.phase() {
        Phase::Playing => Some(
            world
                .fragments()
                .iter()
                .find(|f| !f.collected)
                .map(|f| f.position)
                .unwrap_or(config.regeneration_landmark),
        ),
        Phase::Evangelizing => Some(
            world
                .souls()
                .iter()
                .find(|s| !s.saved)
                .map(|s| s.position)
                .unwrap_or(config.eternal_landmark),
        ),
        _ => None,
    }
}

pub fn steer_keys(from: Vec2, to: Vec2) -> Vec<Key> {
    let mut keys = Vec::with_capacity(2);
    let delta = to - from;
    if delta.x > DEAD_ZONE {
        keys.push(Key::Right);
    } else if delta.x < -DEAD_ZONE {
        keys.push(Key::Left);
    }
    if delta.y > DEAD_ZONE {
        keys.push(Key::Down);
    } else if delta.y < -DEAD_ZONE {
        keys.push(Key::Up);
    }
    keys
}

/// Plays one host frame. Returns `false` once the session has been won, i.e.
/// there is nothing left for the autopilot to do.
pub fn drive_frame<R: Rng>(session: &mut Session<HeadlessEnvironment, R>) -> bool {
    match session.phase() {
        Phase::Start => {
            if let Err(err) = session.start() {
                log::warn!("Autopilot could not start: {err}");
            }
        }
        Phase::Playing | Phase::Evangelizing => {
            let keys = next_target(session)
                .map(|target| steer_keys(session.world().player, target))
                .unwrap_or_default();
            session.set_held_keys(&keys);
        }
        Phase::Conversation => {
            session.set_held_keys(&[]);
            if !session.is_loading() {
                if let Err(err) = session.confirm_mission() {
                    log::warn!("Autopilot could not confirm mission: {err}");
                }
            }
        }
        Phase::Won | Phase::Epilogue => return false,
    }
    session.run_frame();
    true
}

/// Drives the session until it is won or `max_frames` frames have run.
/// Frames are not paced, so a narrative request is waited on rather than
/// spun through.
pub fn play_through<R: Rng>(
    session: &mut Session<HeadlessEnvironment, R>,
    max_frames: u64,
) -> Phase {
    for _ in 0..max_frames {
        if !drive_frame(session) {
            break;
        }
        if session.is_loading() {
            session.await_message();
        }
    }
    session.phase()
}
