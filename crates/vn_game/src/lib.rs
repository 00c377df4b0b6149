//! Vida Nova game core.
//!
//! A `Session` owns the whole game: the phase machine, the world entities, held
//! input, display timers and the in-flight narrative request. Hosts drive it
//! through an `Environment` (viewport, clock, frame scheduling) and read it
//! back as an immutable `Snapshot`.

pub mod autopilot;
pub mod config;
pub mod environment;
pub mod narrative;
pub mod phase;
pub mod replay;
pub mod session;
pub mod simulation;
pub mod snapshot;
pub mod world;
