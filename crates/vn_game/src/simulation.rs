//! One simulation tick: move, clamp, then run the proximity checks for the
//! current phase.
//!
//! `step` only touches the world. It reports captures and landmark arrivals in
//! a `TickOutcome`; the session decides what they mean (verse display, phase
//! transition, rescheduling).

use glam::Vec2;
use vn_core::input::Directions;

use crate::config::GameConfig;
use crate::phase::{Phase, PhaseEvent};
use crate::world::World;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    /// Indices of fragments collected this tick, in world order.
    pub collected: Vec<usize>,
    /// Indices of souls saved this tick, in world order.
    pub saved: Vec<usize>,
    pub landmark: Option<PhaseEvent>,
}

/// Per-tick displacement for a single held direction.
pub fn movement_speed(phase: Phase, collected: usize, config: &GameConfig) -> f32 {
    if phase == Phase::Evangelizing {
        config.evangelizing_speed
    } else {
        config.base_speed + collected as f32 * config.speed_per_fragment
    }
}

/// Directions add up independently; a diagonal is not normalized and covers
/// more ground per tick than a single axis.
pub fn displacement(directions: Directions, speed: f32) -> Vec2 {
    let mut delta = Vec2::ZERO;
    if directions.right {
        delta.x += speed;
    }
    if directions.left {
        delta.x -= speed;
    }
    if directions.up {
        delta.y -= speed;
    }
    if directions.down {
        delta.y += speed;
    }
    delta
}

pub fn clamp_position(position: Vec2, config: &GameConfig, viewport_height: f32) -> Vec2 {
    let max_x = config.world_width - config.player_size;
    // A viewport shorter than the margins pins the player to min_y.
    let max_y = (viewport_height - config.bottom_margin).max(config.min_y);
    Vec2::new(
        position.x.clamp(0.0, max_x),
        position.y.clamp(config.min_y, max_y),
    )
}

pub fn step(
    world: &mut World,
    phase: Phase,
    directions: Directions,
    config: &GameConfig,
    viewport_height: f32,
) -> TickOutcome {
    let mut outcome = TickOutcome::default();
    if !phase.is_interactive() {
        return outcome;
    }

    let speed = movement_speed(phase, world.collected_count(), config);
    let moved = world.player + displacement(directions, speed);
    world.player = clamp_position(moved, config, viewport_height);
    let player = world.player;

    match phase {
        Phase::Playing => {
            let in_reach: Vec<usize> = world
                .fragments()
                .iter()
                .enumerate()
                .filter(|(_, f)| {
                    !f.collected && f.position.distance(player) < config.fragment_capture_radius
                })
                .map(|(i, _)| i)
                .collect();
            for index in in_reach {
                if world.collect_fragment(index) {
                    outcome.collected.push(index);
                }
            }

            if world.collected_count() >= config.regeneration_threshold
                && player.distance(config.regeneration_landmark) < config.regeneration_radius
            {
                outcome.landmark = Some(PhaseEvent::RegenerationReached);
            }
        }
        Phase::Evangelizing => {
            let in_reach: Vec<usize> = world
                .souls()
                .iter()
                .enumerate()
                .filter(|(_, s)| {
                    !s.saved && s.position.distance(player) < config.soul_capture_radius
                })
                .map(|(i, _)| i)
                .collect();
            for index in in_reach {
                if world.save_soul(index) {
                    outcome.saved.push(index);
                }
            }

            if world.saved_count() >= config.eternal_threshold
                && player.distance(config.eternal_landmark) < config.eternal_radius
            {
                outcome.landmark = Some(PhaseEvent::EternalReached);
            }
        }
        _ => {}
    }

    outcome
}
