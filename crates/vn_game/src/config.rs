//! World geometry, thresholds and timing.
//!
//! Every field has a built-in default, so a config file only needs to list the
//! values it overrides. Positions are `[x, y]` pairs.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::world::VIRTUES;

/// How a row of collectibles is scattered: `x = base_x + i * spacing_x +
/// U[0, jitter_x)`, `y = base_y + U[0, jitter_y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub base_x: f32,
    pub spacing_x: f32,
    pub jitter_x: f32,
    pub base_y: f32,
    pub jitter_y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub world_width: f32,
    pub player_size: f32,
    pub start_position: Vec2,
    pub min_y: f32,
    pub bottom_margin: f32,

    pub regeneration_landmark: Vec2,
    pub regeneration_radius: f32,
    pub regeneration_threshold: usize,
    pub eternal_landmark: Vec2,
    pub eternal_radius: f32,
    pub eternal_threshold: usize,

    pub fragment_capture_radius: f32,
    pub soul_capture_radius: f32,
    pub fragment_placement: Placement,
    pub soul_placement: Placement,
    pub soul_count: usize,

    pub base_speed: f32,
    pub speed_per_fragment: f32,
    pub evangelizing_speed: f32,

    pub verse_duration_ms: u64,
    pub mission_prompt_duration_ms: u64,
    pub narrative_timeout_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            world_width: 3500.0,
            player_size: 40.0,
            start_position: Vec2::new(100.0, 350.0),
            min_y: 50.0,
            bottom_margin: 150.0,

            regeneration_landmark: Vec2::new(2000.0, 350.0),
            regeneration_radius: 80.0,
            regeneration_threshold: VIRTUES.len(),
            eternal_landmark: Vec2::new(3300.0, 350.0),
            eternal_radius: 100.0,
            eternal_threshold: 5,

            fragment_capture_radius: 40.0,
            soul_capture_radius: 50.0,
            fragment_placement: Placement {
                base_x: 300.0,
                spacing_x: 200.0,
                jitter_x: 40.0,
                base_y: 150.0,
                jitter_y: 400.0,
            },
            soul_placement: Placement {
                base_x: 2300.0,
                spacing_x: 200.0,
                jitter_x: 50.0,
                base_y: 200.0,
                jitter_y: 300.0,
            },
            soul_count: 5,

            base_speed: 3.0,
            speed_per_fragment: 0.6,
            evangelizing_speed: 8.0,

            verse_duration_ms: 3_000,
            mission_prompt_duration_ms: 5_000,
            narrative_timeout_ms: 10_000,
        }
    }
}

pub fn load_config_from_path(path: &Path) -> Result<GameConfig, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let config: GameConfig = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse config JSON {}: {e}", path.display()))?;
    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &GameConfig) -> Result<(), String> {
    if config.player_size <= 0.0 {
        return Err("Config validation failed: player_size must be > 0".to_string());
    }
    if config.world_width <= config.player_size {
        return Err("Config validation failed: world_width must exceed player_size".to_string());
    }
    let radii = [
        ("regeneration_radius", config.regeneration_radius),
        ("eternal_radius", config.eternal_radius),
        ("fragment_capture_radius", config.fragment_capture_radius),
        ("soul_capture_radius", config.soul_capture_radius),
    ];
    for (name, radius) in radii {
        if radius <= 0.0 {
            return Err(format!("Config validation failed: {name} must be > 0"));
        }
    }
    if config.soul_count == 0 {
        return Err("Config validation failed: soul_count must be > 0".to_string());
    }
    if config.regeneration_threshold > VIRTUES.len() {
        return Err(format!(
            "Config validation failed: regeneration_threshold {} exceeds {} fragments",
            config.regeneration_threshold,
            VIRTUES.len()
        ));
    }
    if config.eternal_threshold > config.soul_count {
        return Err(format!(
            "Config validation failed: eternal_threshold {} exceeds {} souls",
            config.eternal_threshold, config.soul_count
        ));
    }
    if config.base_speed < 0.0 || config.speed_per_fragment < 0.0 || config.evangelizing_speed < 0.0
    {
        return Err("Config validation failed: speeds must be >= 0".to_string());
    }
    Ok(())
}
