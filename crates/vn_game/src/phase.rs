//! Narrative phase machine.
//!
//! ```text
//! START -> PLAYING -> CONVERSATION -> EVANGELIZING -> WON -> EPILOGUE
//!             ^                                                 |
//!             +------------------- restart ---------------------+
//! ```
//!
//! Transitions are one-directional; only `Restart` from EPILOGUE loops back.
//! Every other (phase, event) pair is rejected without changing the phase.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    #[default]
    Start,
    Playing,
    Conversation,
    Evangelizing,
    Won,
    Epilogue,
}

impl Phase {
    pub const ALL: &'static [Phase] = &[
        Phase::Start,
        Phase::Playing,
        Phase::Conversation,
        Phase::Evangelizing,
        Phase::Won,
        Phase::Epilogue,
    ];

    /// Phases in which the simulation loop is scheduled.
    pub fn is_interactive(self) -> bool {
        matches!(self, Phase::Playing | Phase::Evangelizing)
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Start => "START",
            Phase::Playing => "PLAYING",
            Phase::Conversation => "CONVERSATION",
            Phase::Evangelizing => "EVANGELIZING",
            Phase::Won => "WON",
            Phase::Epilogue => "EPILOGUE",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseEvent {
    /// User pressed start.
    Start,
    /// Player reached the regeneration landmark with enough fragments.
    RegenerationReached,
    /// User accepted the mission after the conversation.
    MissionConfirmed,
    /// Player reached the eternal landmark with enough souls.
    EternalReached,
    /// User moved on from the win screen.
    Proceed,
    /// User asked for a new game.
    Restart,
}

impl fmt::Display for PhaseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PhaseEvent::Start => "start",
            PhaseEvent::RegenerationReached => "reach regeneration landmark",
            PhaseEvent::MissionConfirmed => "confirm mission",
            PhaseEvent::EternalReached => "reach eternal landmark",
            PhaseEvent::Proceed => "proceed",
            PhaseEvent::Restart => "restart",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot {event} while in {phase}")]
    NotAllowed { phase: Phase, event: PhaseEvent },
}

/// The transition table. Pure; `PhaseMachine` applies it.
pub fn next_phase(phase: Phase, event: PhaseEvent) -> Result<Phase, TransitionError> {
    match (phase, event) {
        (Phase::Start, PhaseEvent::Start) => Ok(Phase::Playing),
        (Phase::Playing, PhaseEvent::RegenerationReached) => Ok(Phase::Conversation),
        (Phase::Conversation, PhaseEvent::MissionConfirmed) => Ok(Phase::Evangelizing),
        (Phase::Evangelizing, PhaseEvent::EternalReached) => Ok(Phase::Won),
        (Phase::Won, PhaseEvent::Proceed) => Ok(Phase::Epilogue),
        (Phase::Epilogue, PhaseEvent::Restart) => Ok(Phase::Playing),
        _ => Err(TransitionError::NotAllowed { phase, event }),
    }
}

#[derive(Debug, Clone, Default)]
pub struct PhaseMachine {
    phase: Phase,
    transitions: u64,
}

impl PhaseMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of transitions applied since construction.
    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    pub fn apply(&mut self, event: PhaseEvent) -> Result<Phase, TransitionError> {
        let next = next_phase(self.phase, event)?;
        log::info!("Phase {} -> {} ({event})", self.phase, next);
        self.phase = next;
        self.transitions += 1;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENTS: &[PhaseEvent] = &[
        PhaseEvent::Start,
        PhaseEvent::RegenerationReached,
        PhaseEvent::MissionConfirmed,
        PhaseEvent::EternalReached,
        PhaseEvent::Proceed,
        PhaseEvent::Restart,
    ];

    #[test]
    fn happy_path_walks_every_phase() {
        let mut machine = PhaseMachine::new();
        assert_eq!(machine.phase(), Phase::Start);
        for (event, expected) in [
            (PhaseEvent::Start, Phase::Playing),
            (PhaseEvent::RegenerationReached, Phase::Conversation),
            (PhaseEvent::MissionConfirmed, Phase::Evangelizing),
            (PhaseEvent::EternalReached, Phase::Won),
            (PhaseEvent::Proceed, Phase::Epilogue),
            (PhaseEvent::Restart, Phase::Playing),
        ] {
            assert_eq!(machine.apply(event), Ok(expected));
        }
        assert_eq!(machine.transitions(), 6);
    }

    #[test]
    fn each_phase_accepts_exactly_one_event() {
        for &phase in Phase::ALL {
            let accepted = EVENTS
                .iter()
                .filter(|&&event| next_phase(phase, event).is_ok())
                .count();
            assert_eq!(accepted, 1, "{phase} should accept exactly one event");
        }
    }

    #[test]
    fn rejected_event_leaves_phase_unchanged() {
        let mut machine = PhaseMachine::new();
        machine.apply(PhaseEvent::Start).expect("start");
        let err = machine
            .apply(PhaseEvent::MissionConfirmed)
            .expect_err("mission cannot be confirmed while playing");
        assert_eq!(
            err,
            TransitionError::NotAllowed {
                phase: Phase::Playing,
                event: PhaseEvent::MissionConfirmed
            }
        );
        assert_eq!(machine.phase(), Phase::Playing);
        assert_eq!(machine.transitions(), 1);
    }

    #[test]
    fn landmark_transition_does_not_refire() {
        let mut machine = PhaseMachine::new();
        machine.apply(PhaseEvent::Start).expect("start");
        machine
            .apply(PhaseEvent::RegenerationReached)
            .expect("first arrival");
        assert!(machine.apply(PhaseEvent::RegenerationReached).is_err());
        assert_eq!(machine.phase(), Phase::Conversation);
    }

    #[test]
    fn only_playing_and_evangelizing_are_interactive() {
        let interactive: Vec<Phase> = Phase::ALL
            .iter()
            .copied()
            .filter(|p| p.is_interactive())
            .collect();
        assert_eq!(interactive, vec![Phase::Playing, Phase::Evangelizing]);
    }

    #[test]
    fn error_message_names_phase_and_event() {
        let err = next_phase(Phase::Won, PhaseEvent::Restart).expect_err("restart from won");
        assert_eq!(err.to_string(), "cannot restart while in WON");
    }
}
