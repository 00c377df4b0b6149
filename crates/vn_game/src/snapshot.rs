use glam::Vec2;
use serde::Serialize;

use crate::phase::Phase;
use crate::world::{Fragment, SoulNpc};

/// Everything the presentation layer may read, copied out of the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub phase: Phase,
    pub player: Vec2,
    pub fragments: Vec<Fragment>,
    pub souls: Vec<SoulNpc>,
    pub collected_count: usize,
    pub saved_count: usize,
    pub active_verse: Option<String>,
    pub message: String,
    pub loading: bool,
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self).map_err(|e| format!("Failed to serialize snapshot: {e}"))
    }
}
