//! Held-key tracking for continuous movement.
//!
//! Key state is level-triggered only: `key_down` marks a key as held until the
//! matching `key_up`. There is no debouncing and no repeat suppression, so a key
//! held across many frames moves the player on every one of them.
//!
//! Each logical direction is bound to two physical aliases (arrow key and the
//! `w/a/s/d` letter scheme). `directions()` folds the aliases together once per
//! simulation tick.

use serde::Deserialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum Key {
    #[serde(rename = "ArrowLeft")]
    Left,
    #[serde(rename = "ArrowRight")]
    Right,
    #[serde(rename = "ArrowUp")]
    Up,
    #[serde(rename = "ArrowDown")]
    Down,
    #[serde(rename = "w")]
    W,
    #[serde(rename = "a")]
    A,
    #[serde(rename = "s")]
    S,
    #[serde(rename = "d")]
    D,
}

impl Key {
    pub const ALL: &'static [Key] = &[
        Key::Left,
        Key::Right,
        Key::Up,
        Key::Down,
        Key::W,
        Key::A,
        Key::S,
        Key::D,
    ];

    /// Maps a DOM-style key identifier to a movement key. Anything else is
    /// not a movement key and is ignored by the sampler.
    pub fn from_name(name: &str) -> Option<Key> {
        match name {
            "ArrowLeft" => Some(Key::Left),
            "ArrowRight" => Some(Key::Right),
            "ArrowUp" => Some(Key::Up),
            "ArrowDown" => Some(Key::Down),
            "w" => Some(Key::W),
            "a" => Some(Key::A),
            "s" => Some(Key::S),
            "d" => Some(Key::D),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Key::Left => "ArrowLeft",
            Key::Right => "ArrowRight",
            Key::Up => "ArrowUp",
            Key::Down => "ArrowDown",
            Key::W => "w",
            Key::A => "a",
            Key::S => "s",
            Key::D => "d",
        }
    }
}

/// The four logical directions sampled for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Directions {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

#[derive(Debug, Clone, Default)]
pub struct InputState {
    held: HashSet<Key>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_down(&mut self, key: Key) {
        self.held.insert(key);
    }

    pub fn key_up(&mut self, key: Key) {
        self.held.remove(&key);
    }

    /// Routes a named key event. Returns `false` for keys that are not bound
    /// to a direction.
    pub fn key_event(&mut self, name: &str, pressed: bool) -> bool {
        let Some(key) = Key::from_name(name) else {
            log::trace!("Ignoring unbound key '{name}'");
            return false;
        };
        if pressed {
            self.key_down(key);
        } else {
            self.key_up(key);
        }
        true
    }

    /// Replaces the held set wholesale. Scripted drivers use this to express
    /// "exactly these keys are down this frame".
    pub fn set_held(&mut self, keys: &[Key]) {
        self.held.clear();
        self.held.extend(keys.iter().copied());
    }

    pub fn release_all(&mut self) {
        self.held.clear();
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    pub fn directions(&self) -> Directions {
        Directions {
            left: self.is_held(Key::Left) || self.is_held(Key::A),
            right: self.is_held(Key::Right) || self.is_held(Key::D),
            up: self.is_held(Key::Up) || self.is_held(Key::W),
            down: self.is_held(Key::Down) || self.is_held(Key::S),
        }
    }
}
