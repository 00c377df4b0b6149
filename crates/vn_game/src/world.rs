//! Entities of one session: the virtue fragments, the souls, and the player.
//!
//! Generation is pure with respect to the random source passed in, so a seeded
//! `StdRng` reproduces the same world exactly.

use glam::Vec2;
use rand::Rng;
use serde::Serialize;

use crate::config::{GameConfig, Placement};

#[derive(Debug, Clone, Copy)]
pub struct Virtue {
    pub name: &'static str,
    pub verse: &'static str,
}

pub const VIRTUES: [Virtue; 8] = [
    Virtue {
        name: "Perdão",
        verse: "Efésios 4:32: 'Sede uns para com os outros benignos, misericordiosos, perdoando-vos uns aos outros...'",
    },
    Virtue {
        name: "Amor",
        verse: "1 Coríntios 13:4: 'O amor é sofredor, é benigno; o amor não é invejoso; o amor não trata com leviandade...'",
    },
    Virtue {
        name: "Arrependimento",
        verse: "Atos 3:19: 'Arrependei-vos, pois, e convertei-vos, para que sejam apagados os vossos pecados...'",
    },
    Virtue {
        name: "Fé",
        verse: "Hebreus 11:1: 'Ora, a fé é o firme fundamento das coisas que se esperam, e a prova das coisas que se não veem.'",
    },
    Virtue {
        name: "Gratidão",
        verse: "1 Tessalonicenses 5:18: 'Em tudo dai graças, porque esta é a vontade de Deus em Cristo Jesus para convosco.'",
    },
    Virtue {
        name: "Esperança",
        verse: "Romanos 15:13: 'O Deus de esperança vos encha de todo o gozo e paz em crença...'",
    },
    Virtue {
        name: "Humildade",
        verse: "Tiago 4:10: 'Humilhai-vos perante o Senhor, e ele vos exaltará.'",
    },
    Virtue {
        name: "Coragem",
        verse: "Josué 1:9: 'Não to mandei eu? Esforça-te, e tem bom ânimo; não temas, nem te espantes...'",
    },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fragment {
    pub id: String,
    pub position: Vec2,
    pub name: String,
    pub verse: String,
    pub collected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoulNpc {
    pub id: String,
    pub position: Vec2,
    pub saved: bool,
}

/// Entity state for one session. Flags and counters only change together
/// through `collect_fragment` / `save_soul`, which keeps each counter equal to
/// the number of flagged entities.
#[derive(Debug, Clone)]
pub struct World {
    fragments: Vec<Fragment>,
    souls: Vec<SoulNpc>,
    pub player: Vec2,
    collected_count: usize,
    saved_count: usize,
}

impl World {
    /// A world with no entities yet, used before the first session start.
    pub fn empty(player: Vec2) -> Self {
        Self {
            fragments: Vec::new(),
            souls: Vec::new(),
            player,
            collected_count: 0,
            saved_count: 0,
        }
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn souls(&self) -> &[SoulNpc] {
        &self.souls
    }

    pub fn collected_count(&self) -> usize {
        self.collected_count
    }

    pub fn saved_count(&self) -> usize {
        self.saved_count
    }

    /// Marks fragment `index` collected. Returns `false` (and changes nothing)
    /// if it was already collected or does not exist.
    pub fn collect_fragment(&mut self, index: usize) -> bool {
        match self.fragments.get_mut(index) {
            Some(fragment) if !fragment.collected => {
                fragment.collected = true;
                self.collected_count += 1;
                true
            }
            _ => false,
        }
    }

    pub fn save_soul(&mut self, index: usize) -> bool {
        match self.souls.get_mut(index) {
            Some(soul) if !soul.saved => {
                soul.saved = true;
                self.saved_count += 1;
                true
            }
            _ => false,
        }
    }
}

pub fn initialize_world<R: Rng + ?Sized>(config: &GameConfig, rng: &mut R) -> World {
    let fragments = VIRTUES
        .iter()
        .enumerate()
        .map(|(i, virtue)| Fragment {
            id: format!("f-{i}"),
            position: scatter(&config.fragment_placement, i, rng),
            name: virtue.name.to_string(),
            verse: virtue.verse.to_string(),
            collected: false,
        })
        .collect();

    let souls = (0..config.soul_count)
        .map(|i| SoulNpc {
            id: format!("soul-{i}"),
            position: scatter(&config.soul_placement, i, rng),
            saved: false,
        })
        .collect();

    World {
        fragments,
        souls,
        player: config.start_position,
        collected_count: 0,
        saved_count: 0,
    }
}

fn scatter<R: Rng + ?Sized>(placement: &Placement, index: usize, rng: &mut R) -> Vec2 {
    let jitter_x = rng.gen::<f32>() * placement.jitter_x;
    let jitter_y = rng.gen::<f32>() * placement.jitter_y;
    Vec2::new(
        placement.base_x + index as f32 * placement.spacing_x + jitter_x,
        placement.base_y + jitter_y,
    )
}
