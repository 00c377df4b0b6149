//! Session controller: the single owner of all mutable game state.
//!
//! The host feeds it key events and user actions, delivers the frames it asked
//! for through `on_frame`, and calls `poll` once per host frame so timers and
//! the narrative request can resolve even while the simulation is paused.
//!
//! Frame scheduling invariant: `pending_frame` is `Some` exactly when the phase
//! is interactive. Leaving an interactive phase cancels the pending frame, and
//! a frame handle that is not the pending one is ignored.

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use vn_core::input::{InputState, Key};
use vn_core::timer::TimedSlot;

use crate::config::GameConfig;
use crate::environment::{Environment, FrameHandle, HeadlessEnvironment};
use crate::narrative::{NarrativeCollaborator, PendingMessage, ResolvedMessage};
use crate::phase::{Phase, PhaseEvent, PhaseMachine, TransitionError};
use crate::simulation;
use crate::snapshot::Snapshot;
use crate::world::{initialize_world, World};

pub const START_MESSAGE: &str = "Renuncie a si mesmo...";
pub const PLAYING_MESSAGE: &str = "Negue-se a si mesmo e siga a luz.";
pub const MISSION_MESSAGE: &str = "Agora compartilhe a luz que você recebeu.";
pub const MISSION_PROMPT: &str =
    "Marcos 16:15: 'Ide por todo o mundo, pregai o evangelho a toda criatura.'";

pub struct Session<E: Environment, R: Rng> {
    config: GameConfig,
    env: E,
    rng: R,
    collaborator: Arc<dyn NarrativeCollaborator>,
    input: InputState,
    phases: PhaseMachine,
    world: World,
    active_verse: TimedSlot<String>,
    message: String,
    pending_message: Option<PendingMessage>,
    pending_frame: Option<FrameHandle>,
    ticks: u64,
}

impl<E: Environment, R: Rng> Session<E, R> {
    pub fn new(
        config: GameConfig,
        env: E,
        rng: R,
        collaborator: Arc<dyn NarrativeCollaborator>,
    ) -> Self {
        let world = World::empty(config.start_position);
        Self {
            config,
            env,
            rng,
            collaborator,
            input: InputState::new(),
            phases: PhaseMachine::new(),
            world,
            active_verse: TimedSlot::new(),
            message: START_MESSAGE.to_string(),
            pending_message: None,
            pending_frame: None,
            ticks: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phases.phase()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut E {
        &mut self.env
    }

    /// Simulation ticks run since construction.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn active_verse(&self) -> Option<&str> {
        self.active_verse.get().map(String::as_str)
    }

    pub fn is_loading(&self) -> bool {
        self.pending_message.is_some()
    }

    pub fn has_pending_frame(&self) -> bool {
        self.pending_frame.is_some()
    }

    // --- Input -------------------------------------------------------------------

    pub fn key_down(&mut self, key: Key) {
        self.input.key_down(key);
    }

    pub fn key_up(&mut self, key: Key) {
        self.input.key_up(key);
    }

    pub fn key_event(&mut self, name: &str, pressed: bool) -> bool {
        self.input.key_event(name, pressed)
    }

    pub fn set_held_keys(&mut self, keys: &[Key]) {
        self.input.set_held(keys);
    }

    // --- User actions ------------------------------------------------------------

    pub fn start(&mut self) -> Result<(), TransitionError> {
        self.phases.apply(PhaseEvent::Start)?;
        self.reset_world();
        self.sync_frame_schedule();
        Ok(())
    }

    pub fn confirm_mission(&mut self) -> Result<(), TransitionError> {
        self.phases.apply(PhaseEvent::MissionConfirmed)?;
        if self.pending_message.take().is_some() {
            log::debug!("Mission confirmed before the narrative message arrived; dropping it");
        }
        self.message = MISSION_MESSAGE.to_string();
        let now = self.env.now_ms();
        self.active_verse.set(
            MISSION_PROMPT.to_string(),
            now,
            self.config.mission_prompt_duration_ms,
        );
        self.sync_frame_schedule();
        Ok(())
    }

    pub fn proceed(&mut self) -> Result<(), TransitionError> {
        self.phases.apply(PhaseEvent::Proceed)?;
        self.sync_frame_schedule();
        Ok(())
    }

    /// Full reinitialization: new world, zeroed counters, no held keys, no
    /// verse, no pending request. There is no partial reset.
    pub fn restart(&mut self) -> Result<(), TransitionError> {
        self.phases.apply(PhaseEvent::Restart)?;
        self.input.release_all();
        self.reset_world();
        self.sync_frame_schedule();
        Ok(())
    }

    // --- Frame loop --------------------------------------------------------------

    pub fn on_frame(&mut self, handle: FrameHandle) {
        if self.pending_frame != Some(handle) {
            log::trace!("Ignoring stale frame {handle:?}");
            return;
        }
        self.pending_frame = None;
        if self.phases.phase().is_interactive() {
            self.tick();
        }
        self.sync_frame_schedule();
    }

    /// Expire display timers and collect the narrative answer if it is ready.
    pub fn poll(&mut self) {
        let now = self.env.now_ms();
        if self.active_verse.expire(now) {
            log::debug!("Active verse cleared at {now}ms");
        }
        let resolved = self.pending_message.as_ref().and_then(PendingMessage::poll);
        if let Some(resolved) = resolved {
            self.show_narrative(resolved);
        }
    }

    /// Blocks until the narrative request resolves. For hosts that run frames
    /// faster than real time and would otherwise spin through the wait.
    pub fn await_message(&mut self) {
        if let Some(pending) = self.pending_message.take() {
            self.show_narrative(pending.wait());
        }
    }

    fn show_narrative(&mut self, resolved: ResolvedMessage) {
        log::info!("Narrative message ready ({:?})", resolved.source);
        self.message = resolved.text;
        self.pending_message = None;
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phases.phase(),
            player: self.world.player,
            fragments: self.world.fragments().to_vec(),
            souls: self.world.souls().to_vec(),
            collected_count: self.world.collected_count(),
            saved_count: self.world.saved_count(),
            active_verse: self.active_verse.get().cloned(),
            message: self.message.clone(),
            loading: self.is_loading(),
        }
    }

    fn tick(&mut self) {
        let viewport_height = self.env.viewport_height();
        let outcome = simulation::step(
            &mut self.world,
            self.phases.phase(),
            self.input.directions(),
            &self.config,
            viewport_height,
        );
        self.ticks += 1;

        let now = self.env.now_ms();
        for &index in &outcome.collected {
            let fragment = &self.world.fragments()[index];
            log::info!(
                "Collected '{}' ({}/{})",
                fragment.name,
                self.world.collected_count(),
                self.world.fragments().len()
            );
            self.active_verse
                .set(fragment.verse.clone(), now, self.config.verse_duration_ms);
        }
        for &index in &outcome.saved {
            log::info!(
                "Reached {} ({}/{})",
                self.world.souls()[index].id,
                self.world.saved_count(),
                self.world.souls().len()
            );
        }

        if let Some(event) = outcome.landmark {
            match self.phases.apply(event) {
                Ok(Phase::Conversation) => self.begin_conversation(),
                Ok(_) => {}
                // `step` only reports the landmark of the current phase.
                Err(err) => log::debug!("Landmark event ignored: {err}"),
            }
        }
    }

    fn begin_conversation(&mut self) {
        self.pending_message = Some(PendingMessage::spawn(
            Arc::clone(&self.collaborator),
            self.world.collected_count(),
            Duration::from_millis(self.config.narrative_timeout_ms),
        ));
    }

    fn reset_world(&mut self) {
        self.world = initialize_world(&self.config, &mut self.rng);
        self.active_verse.clear();
        self.pending_message = None;
        self.message = PLAYING_MESSAGE.to_string();
        log::info!(
            "Session initialized: {} fragments, {} souls",
            self.world.fragments().len(),
            self.world.souls().len()
        );
    }

    fn sync_frame_schedule(&mut self) {
        if self.phases.phase().is_interactive() {
            if self.pending_frame.is_none() {
                self.pending_frame = Some(self.env.request_frame());
            }
        } else if let Some(handle) = self.pending_frame.take() {
            log::debug!("Cancelling frame {handle:?} on entering {}", self.phase());
            self.env.cancel_frame(handle);
        }
    }
}

impl<R: Rng> Session<HeadlessEnvironment, R> {
    /// One host frame: deliver the scheduled tick if there is one, then poll.
    pub fn run_frame(&mut self) {
        if let Some(handle) = self.env.next_frame() {
            self.on_frame(handle);
        }
        self.poll();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::narrative::tests::{ScriptedCollaborator, SlowCollaborator, StalledCollaborator};
    use crate::narrative::{NarrativeError, FALLBACK_MESSAGE};
    use glam::Vec2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    type TestSession = Session<HeadlessEnvironment, StdRng>;

    #[derive(Default)]
    struct CountingCollaborator {
        calls: AtomicUsize,
    }

    impl NarrativeCollaborator for CountingCollaborator {
        fn generate_message(&self, _collected: usize) -> Result<String, NarrativeError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("Mensagem {call}"))
        }
    }

    fn session_with(collaborator: Arc<dyn NarrativeCollaborator>) -> TestSession {
        session_with_config(GameConfig::default(), collaborator)
    }

    fn session_with_config(
        config: GameConfig,
        collaborator: Arc<dyn NarrativeCollaborator>,
    ) -> TestSession {
        Session::new(
            config,
            HeadlessEnvironment::new(900.0),
            StdRng::seed_from_u64(5),
            collaborator,
        )
    }

    fn session() -> TestSession {
        session_with(Arc::new(ScriptedCollaborator {
            reply: Some("Tudo se fez novo.".to_string()),
        }))
    }

    fn wait_until_resolved(session: &mut TestSession) {
        for _ in 0..2_000 {
            session.poll();
            if !session.is_loading() {
                return;
            }
            thread::sleep(Duration::from_millis(1));
        }
        panic!("narrative message never resolved");
    }

    /// Collect every fragment in place and stand on the regeneration landmark.
    fn reach_conversation(session: &mut TestSession) {
        session.start().expect("start");
        for i in 0..8 {
            session.world.collect_fragment(i);
        }
        session.world.player = session.config.regeneration_landmark;
        session.run_frame();
        assert_eq!(session.phase(), Phase::Conversation);
    }

    fn reach_evangelizing(session: &mut TestSession) {
        reach_conversation(session);
        wait_until_resolved(session);
        session.confirm_mission().expect("confirm");
    }

    fn assert_counters_match_flags(session: &TestSession) {
        let world = session.world();
        let collected = world.fragments().iter().filter(|f| f.collected).count();
        let saved = world.souls().iter().filter(|s| s.saved).count();
        assert_eq!(collected, world.collected_count());
        assert_eq!(saved, world.saved_count());
    }

    #[test]
    fn new_session_waits_at_start() {
        let session = session();
        assert_eq!(session.phase(), Phase::Start);
        assert_eq!(session.message(), START_MESSAGE);
        assert!(!session.has_pending_frame());
        assert!(session.world().fragments().is_empty());
    }

    #[test]
    fn start_initializes_world_and_schedules_one_frame() {
        let mut session = session();
        session.start().expect("start");
        assert_eq!(session.phase(), Phase::Playing);
        assert_eq!(session.world().fragments().len(), 8);
        assert_eq!(session.world().souls().len(), 5);
        assert_eq!(session.world().player, Vec2::new(100.0, 350.0));
        assert_eq!(session.message(), PLAYING_MESSAGE);
        assert_eq!(session.env().pending_frames(), 1);

        session.run_frame();
        assert_eq!(session.ticks(), 1);
        assert_eq!(session.env().pending_frames(), 1);
    }

    #[test]
    fn held_key_moves_player_every_frame() {
        let mut session = session();
        session.start().expect("start");
        session.key_down(Key::D);
        for _ in 0..10 {
            session.run_frame();
        }
        assert_eq!(session.world().player, Vec2::new(130.0, 350.0));
        session.key_up(Key::D);
        session.run_frame();
        assert_eq!(session.world().player, Vec2::new(130.0, 350.0));
    }

    #[test]
    fn named_key_events_drive_movement() {
        let mut session = session();
        session.start().expect("start");
        assert!(session.key_event("ArrowLeft", true));
        assert!(!session.key_event("Shift", true));
        session.run_frame();
        assert_eq!(session.world().player, Vec2::new(97.0, 350.0));
        assert!(session.key_event("ArrowLeft", false));
        session.run_frame();
        assert_eq!(session.world().player, Vec2::new(97.0, 350.0));
    }

    #[test]
    fn viewport_is_reread_every_tick() {
        let mut session = session();
        session.start().expect("start");
        session.key_down(Key::S);
        session.env_mut().viewport_height = 500.0;
        session.run_frame();
        // 350 + 3 clamps to 500 - 150.
        assert_eq!(session.world().player.y, 350.0);
        session.env_mut().viewport_height = 300.0;
        session.run_frame();
        assert_eq!(session.world().player.y, 150.0);
    }

    #[test]
    fn unknown_handle_is_ignored() {
        let mut session = session();
        session.start().expect("start");
        let stale = session.env_mut().request_frame();
        session.on_frame(stale);
        assert_eq!(session.ticks(), 0);
    }

    #[test]
    fn collected_fragment_shows_verse_for_three_seconds() {
        let mut session = session();
        session.start().expect("start");
        session.world.player = session.world().fragments()[0].position;
        session.run_frame();

        assert_eq!(session.world().collected_count(), 1);
        let verse = session.world().fragments()[0].verse.clone();
        assert_eq!(session.active_verse(), Some(verse.as_str()));

        session.env_mut().clock.advance_ms(2_900);
        session.poll();
        assert!(session.active_verse().is_some());
        session.env_mut().clock.advance_ms(200);
        session.poll();
        assert_eq!(session.active_verse(), None);
    }

    #[test]
    fn newer_verse_survives_older_clear() {
        let mut session = session();
        session.start().expect("start");
        session.world.player = session.world().fragments()[0].position;
        session.run_frame();

        session.env_mut().clock.advance_ms(2_000);
        session.world.player = session.world().fragments()[1].position;
        session.run_frame();
        let second = session.world().fragments()[1].verse.clone();

        // Past the first verse's deadline, before the second's.
        session.env_mut().clock.advance_ms(1_500);
        session.poll();
        assert_eq!(session.active_verse(), Some(second.as_str()));
    }

    #[test]
    fn seven_fragments_at_landmark_keeps_playing() {
        let mut session = session();
        session.start().expect("start");
        for i in 0..7 {
            session.world.collect_fragment(i);
        }
        session.world.player = session.config.regeneration_landmark;
        for _ in 0..5 {
            session.run_frame();
        }
        assert_eq!(session.phase(), Phase::Playing);
        assert!(!session.is_loading());
        assert!(session.has_pending_frame());
    }

    #[test]
    fn eight_fragments_at_landmark_enters_conversation_once() {
        let mut session = session();
        reach_conversation(&mut session);
        let transitions = session.phases.transitions();
        assert!(session.is_loading());
        assert!(!session.has_pending_frame());
        assert_eq!(session.env().pending_frames(), 0);

        let ticks = session.ticks();
        for _ in 0..10 {
            session.run_frame();
        }
        assert_eq!(session.ticks(), ticks);
        assert_eq!(session.phases.transitions(), transitions);
        assert_eq!(session.phase(), Phase::Conversation);
    }

    #[test]
    fn collaborator_reply_becomes_message() {
        let mut session = session();
        reach_conversation(&mut session);
        wait_until_resolved(&mut session);
        assert_eq!(session.message(), "Tudo se fez novo.");
        assert!(!session.snapshot().loading);
    }

    #[test]
    fn collaborator_error_still_reaches_evangelizing() {
        let mut session = session_with(Arc::new(ScriptedCollaborator { reply: None }));
        reach_conversation(&mut session);
        wait_until_resolved(&mut session);
        assert_eq!(session.message(), FALLBACK_MESSAGE);

        session.confirm_mission().expect("confirm");
        assert_eq!(session.phase(), Phase::Evangelizing);
        assert_eq!(session.message(), MISSION_MESSAGE);
        assert_eq!(session.active_verse(), Some(MISSION_PROMPT));
        assert!(session.has_pending_frame());
    }

    #[test]
    fn stalled_collaborator_times_out_to_fallback() {
        let config = GameConfig {
            narrative_timeout_ms: 50,
            ..GameConfig::default()
        };
        let mut session = session_with_config(config, Arc::new(StalledCollaborator));
        reach_conversation(&mut session);
        session.poll();
        assert!(session.is_loading());

        wait_until_resolved(&mut session);
        assert_eq!(session.message(), FALLBACK_MESSAGE);
        assert_eq!(session.phase(), Phase::Conversation);
    }

    #[test]
    fn fast_frames_do_not_time_out_a_slow_reply() {
        let mut session = session_with(Arc::new(SlowCollaborator {
            delay: Duration::from_millis(200),
            reply: "A resposta chegou.".to_string(),
        }));
        reach_conversation(&mut session);
        // Far more simulated time than the timeout, in almost no wall time.
        for _ in 0..700 {
            session.run_frame();
        }
        session.env_mut().clock.advance_ms(60_000);
        session.poll();
        assert_ne!(session.message(), FALLBACK_MESSAGE);

        session.await_message();
        assert!(!session.is_loading());
        assert_eq!(session.message(), "A resposta chegou.");
    }

    #[test]
    fn one_narrative_request_per_conversation() {
        let collaborator = Arc::new(CountingCollaborator::default());
        let mut session = session_with(collaborator.clone());
        reach_conversation(&mut session);
        for _ in 0..10 {
            session.run_frame();
        }
        wait_until_resolved(&mut session);
        for _ in 0..10 {
            session.run_frame();
        }
        assert_eq!(collaborator.calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.message(), "Mensagem 1");

        session.confirm_mission().expect("confirm");
        for i in 0..5 {
            session.world.save_soul(i);
        }
        session.world.player = session.config.eternal_landmark;
        session.run_frame();
        session.proceed().expect("proceed");
        session.restart().expect("restart");
        assert_eq!(collaborator.calls.load(Ordering::SeqCst), 1);

        for i in 0..8 {
            session.world.collect_fragment(i);
        }
        session.world.player = session.config.regeneration_landmark;
        for _ in 0..10 {
            session.run_frame();
        }
        wait_until_resolved(&mut session);
        assert_eq!(session.phase(), Phase::Conversation);
        assert_eq!(collaborator.calls.load(Ordering::SeqCst), 2);
        assert_eq!(session.message(), "Mensagem 2");
    }

    #[test]
    fn confirming_while_loading_drops_the_request() {
        let mut session = session_with(Arc::new(StalledCollaborator));
        reach_conversation(&mut session);
        session.confirm_mission().expect("confirm");
        assert!(!session.is_loading());
        assert_eq!(session.message(), MISSION_MESSAGE);
    }

    #[test]
    fn mission_prompt_clears_after_five_seconds() {
        let mut session = session();
        reach_evangelizing(&mut session);
        session.env_mut().clock.advance_ms(4_999);
        session.poll();
        assert_eq!(session.active_verse(), Some(MISSION_PROMPT));
        session.env_mut().clock.advance_ms(1);
        session.poll();
        assert_eq!(session.active_verse(), None);
    }

    #[test]
    fn evangelizing_speed_is_fixed() {
        let mut session = session();
        reach_evangelizing(&mut session);
        session.world.player = Vec2::new(2000.0, 60.0);
        session.key_down(Key::Left);
        session.run_frame();
        assert_eq!(session.world().player, Vec2::new(1992.0, 60.0));
    }

    #[test]
    fn four_souls_at_eternal_landmark_keeps_evangelizing() {
        let mut session = session();
        reach_evangelizing(&mut session);
        for i in 0..4 {
            session.world.save_soul(i);
        }
        session.world.player = session.config.eternal_landmark;
        session.run_frame();
        assert_eq!(session.phase(), Phase::Evangelizing);
    }

    #[test]
    fn five_souls_at_eternal_landmark_wins_once() {
        let mut session = session();
        reach_evangelizing(&mut session);
        for i in 0..5 {
            session.world.save_soul(i);
        }
        session.world.player = session.config.eternal_landmark;
        session.run_frame();
        assert_eq!(session.phase(), Phase::Won);
        assert!(!session.has_pending_frame());

        let transitions = session.phases.transitions();
        for _ in 0..5 {
            session.run_frame();
        }
        assert_eq!(session.phases.transitions(), transitions);
        assert_counters_match_flags(&session);
    }

    #[test]
    fn actions_in_wrong_phase_are_rejected() {
        let mut session = session();
        assert!(session.confirm_mission().is_err());
        assert!(session.restart().is_err());
        session.start().expect("start");
        assert!(session.start().is_err());
        assert!(session.proceed().is_err());
        assert_eq!(session.phase(), Phase::Playing);
        assert_eq!(session.env().pending_frames(), 1);
    }

    #[test]
    fn restart_from_epilogue_resets_everything() {
        let mut session = session();
        reach_evangelizing(&mut session);
        for i in 0..5 {
            session.world.save_soul(i);
        }
        session.world.player = session.config.eternal_landmark;
        session.key_down(Key::Right);
        session.run_frame();
        assert_eq!(session.phase(), Phase::Won);
        session.proceed().expect("proceed");
        assert_eq!(session.phase(), Phase::Epilogue);

        session.restart().expect("restart");
        let snapshot = session.snapshot();
        assert_eq!(snapshot.phase, Phase::Playing);
        assert_eq!(snapshot.collected_count, 0);
        assert_eq!(snapshot.saved_count, 0);
        assert!(snapshot.fragments.iter().all(|f| !f.collected));
        assert!(snapshot.souls.iter().all(|s| !s.saved));
        assert_eq!(snapshot.player, Vec2::new(100.0, 350.0));
        assert_eq!(snapshot.active_verse, None);
        assert_eq!(snapshot.message, PLAYING_MESSAGE);
        assert!(!snapshot.loading);

        // Held keys do not survive the reset.
        session.run_frame();
        assert_eq!(session.world().player, Vec2::new(100.0, 350.0));
    }
}
