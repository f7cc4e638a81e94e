use crate::high_score::{HighScoreKey, HighScoreStore};
use crate::question::{Difficulty, Mode, Operation, QuestionGenerator, SessionConfig};
use crate::round::{Round, RoundSettings, SubmitOutcome, TickOutcome};
use rand::{rngs::StdRng, Rng, SeedableRng};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Setup,
    Playing,
    Finished,
}

/// What the player has picked on the setup screen so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub operation: Option<Operation>,
    pub difficulty: Option<Difficulty>,
    pub mode: Mode,
}

impl Selection {
    pub fn select_operation(&mut self, operation: Operation) {
        if operation == Operation::Equation {
            self.enable_equations();
        } else {
            self.operation = Some(operation);
            if self.mode == Mode::Equations {
                self.mode = Mode::Normal;
                self.difficulty = None;
            }
        }
    }

    pub fn select_difficulty(&mut self, difficulty: Difficulty) {
        if self.mode == Mode::Equations {
            return;
        }
        self.difficulty = Some(difficulty);
    }

    pub fn toggle_equations(&mut self) {
        if self.mode == Mode::Equations {
            *self = Selection::default();
        } else {
            self.enable_equations();
        }
    }

    fn enable_equations(&mut self) {
        let config = SessionConfig::equations();
        self.operation = Some(config.operation);
        self.difficulty = Some(config.difficulty);
        self.mode = config.mode;
    }

    /// The config to start a round with, once the selection is complete
    pub fn config(&self) -> Option<SessionConfig> {
        if self.mode == Mode::Equations {
            return Some(SessionConfig::equations());
        }
        match (self.operation, self.difficulty) {
            (Some(operation), Some(difficulty)) => Some(SessionConfig::new(operation, difficulty)),
            _ => None,
        }
    }
}

/// Scores reported to the results screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundResult {
    pub config: SessionConfig,
    pub score: u32,
    pub best_streak: u32,
    pub high_score: u32,
    pub previous_high_score: u32,
    pub is_new_record: bool,
}

/// Top-level flow: setup, then a round, then results
pub struct Session<S: HighScoreStore> {
    pub phase: Phase,
    pub selection: Selection,
    pub settings: RoundSettings,
    pub round: Option<Round>,
    pub result: Option<RoundResult>,
    store: S,
    rng: StdRng,
}

impl<S: HighScoreStore> Session<S> {
    pub fn new(store: S, settings: RoundSettings) -> Self {
        Self::with_rng(store, settings, StdRng::from_entropy())
    }

    /// Reproducible question sequences for every round of this session
    pub fn seeded(store: S, settings: RoundSettings, seed: u64) -> Self {
        Self::with_rng(store, settings, StdRng::seed_from_u64(seed))
    }

    fn with_rng(store: S, settings: RoundSettings, rng: StdRng) -> Self {
        Self {
            phase: Phase::Setup,
            selection: Selection::default(),
            settings,
            round: None,
            result: None,
            store,
            rng,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn can_start(&self) -> bool {
        self.phase == Phase::Setup && self.selection.config().is_some()
    }

    /// Begin a round with the current selection. Returns false if it isn't complete.
    pub fn start(&mut self) -> bool {
        if !self.can_start() {
            return false;
        }
        let Some(config) = self.selection.config() else {
            return false;
        };

        let generator = QuestionGenerator::new(StdRng::seed_from_u64(self.rng.gen()));
        self.round = Some(Round::new(config, self.settings, generator));
        self.result = None;
        self.phase = Phase::Playing;
        tracing::info!(
            operation = %config.operation,
            difficulty = %config.difficulty,
            mode = %config.mode,
            "round started"
        );
        true
    }

    pub fn push_digit(&mut self, digit: char) {
        if let Some(round) = self.playing_round() {
            round.push_digit(digit);
        }
    }

    pub fn backspace(&mut self) {
        if let Some(round) = self.playing_round() {
            round.backspace();
        }
    }

    pub fn submit(&mut self) -> SubmitOutcome {
        let Some(round) = self.playing_round() else {
            return SubmitOutcome::Ignored;
        };
        let outcome = round.submit();
        self.finish_if_done();
        outcome
    }

    /// One second of round time
    pub fn tick(&mut self) -> TickOutcome {
        let Some(round) = self.playing_round() else {
            return TickOutcome::Ignored;
        };
        let outcome = round.tick();
        self.finish_if_done();
        outcome
    }

    /// Leave a round in progress without recording it
    pub fn abandon(&mut self) {
        if self.phase == Phase::Playing {
            tracing::info!("round abandoned");
            self.reset();
        }
    }

    pub fn play_again(&mut self) {
        self.reset();
    }

    pub fn go_home(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        self.phase = Phase::Setup;
        self.selection = Selection::default();
        self.round = None;
        self.result = None;
    }

    fn playing_round(&mut self) -> Option<&mut Round> {
        if self.phase != Phase::Playing {
            return None;
        }
        self.round.as_mut()
    }

    fn finish_if_done(&mut self) {
        let Some(round) = self.round.as_ref() else {
            return;
        };
        let Some(score) = round.final_score() else {
            return;
        };

        let config = round.config;
        let best_streak = round.state.best_streak;
        let key = HighScoreKey::from(&config);
        let previous_high_score = self.store.get(&key);
        let is_new_record = score > previous_high_score;

        if is_new_record {
            if let Err(e) = self.store.set(&key, score) {
                tracing::warn!(key = %key, error = %e, "failed to persist high score");
            }
        }

        let result = RoundResult {
            config,
            score,
            best_streak,
            high_score: previous_high_score.max(score),
            previous_high_score,
            is_new_record,
        };
        tracing::info!(
            key = %key,
            score,
            high_score = result.high_score,
            new_record = is_new_record,
            "round finished"
        );

        self.result = Some(result);
        self.phase = Phase::Finished;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::high_score::MemoryHighScoreStore;
    use crate::round::RoundPhase;

    fn session() -> Session<MemoryHighScoreStore> {
        Session::seeded(MemoryHighScoreStore::new(), RoundSettings::default(), 5)
    }

    fn answer(session: &mut Session<MemoryHighScoreStore>, correct: bool) {
        let round = session.round.as_ref().unwrap();
        let value = round.question.answer + if correct { 0 } else { 1 };
        for c in value.to_string().chars() {
            session.push_digit(c);
        }
        session.submit();
    }

    #[test]
    fn test_start_requires_complete_selection() {
        let mut session = session();
        assert!(!session.can_start());
        assert!(!session.start());

        session.selection.select_operation(Operation::Mult);
        assert!(!session.can_start());

        session.selection.select_difficulty(Difficulty::Table(7));
        assert!(session.can_start());
        assert!(session.start());
        assert_eq!(session.phase, Phase::Playing);
        assert!(session.round.is_some());
        assert!(!session.can_start());
    }

    #[test]
    fn test_difficulty_first_then_operation() {
        let mut session = session();
        session.selection.select_difficulty(Difficulty::Mix);
        assert!(!session.can_start());
        session.selection.select_operation(Operation::Sqrt);
        assert_eq!(
            session.selection.config(),
            Some(SessionConfig::new(Operation::Sqrt, Difficulty::Mix))
        );
    }

    #[test]
    fn test_equations_mode_fixes_selection() {
        let mut selection = Selection::default();
        selection.toggle_equations();
        assert_eq!(selection.config(), Some(SessionConfig::equations()));

        // difficulty picks are ignored in equations mode
        selection.select_difficulty(Difficulty::Table(3));
        assert_eq!(selection.difficulty, Some(Difficulty::Mix));

        // picking a plain operation leaves equations mode
        selection.select_operation(Operation::Add);
        assert_eq!(selection.mode, Mode::Normal);
        assert_eq!(selection.config(), None);

        selection.select_operation(Operation::Equation);
        assert_eq!(selection.mode, Mode::Equations);
        selection.toggle_equations();
        assert_eq!(selection, Selection::default());
    }

    #[test]
    fn test_new_high_score_is_persisted() {
        let mut store = MemoryHighScoreStore::new();
        store.insert_raw("mult_7_normal", "10");
        let settings = RoundSettings {
            round_secs: 600,
            ..RoundSettings::default()
        };
        let mut session = Session::seeded(store, settings, 1);
        session.selection.select_operation(Operation::Mult);
        session.selection.select_difficulty(Difficulty::Table(7));
        session.start();

        for _ in 0..12 {
            answer(&mut session, true);
        }
        for _ in 0..600 {
            session.tick();
        }

        assert_eq!(session.phase, Phase::Finished);
        let result = session.result.unwrap();
        assert_eq!(result.score, 12);
        assert_eq!(result.previous_high_score, 10);
        assert_eq!(result.high_score, 12);
        assert!(result.is_new_record);
        assert_eq!(session.store().raw("mult_7_normal"), Some("12"));
    }

    #[test]
    fn test_lower_score_keeps_high_score() {
        let mut store = MemoryHighScoreStore::new();
        store.insert_raw("add_2_normal", "10");
        let mut session = Session::seeded(store, RoundSettings::default(), 2);
        session.selection.select_operation(Operation::Add);
        session.selection.select_difficulty(Difficulty::Table(2));
        session.start();

        answer(&mut session, true);
        answer(&mut session, true);
        for _ in 0..15 {
            session.tick();
        }

        let result = session.result.unwrap();
        assert_eq!(result.score, 2);
        assert_eq!(result.high_score, 10);
        assert!(!result.is_new_record);
        assert_eq!(session.store().raw("add_2_normal"), Some("10"));
    }

    #[test]
    fn test_equation_session_finishes_after_five() {
        let mut session = session();
        session.selection.toggle_equations();
        session.start();

        answer(&mut session, true);
        answer(&mut session, false);
        assert_eq!(session.tick(), TickOutcome::Counted);
        assert_eq!(session.tick(), TickOutcome::FeedbackReleased);
        answer(&mut session, true);
        for _ in 0..60 {
            session.tick();
        }
        assert_eq!(session.phase, Phase::Playing);
        assert_eq!(
            session.round.as_ref().unwrap().state.questions_answered,
            4
        );

        answer(&mut session, false);
        assert_eq!(session.phase, Phase::Playing);
        session.tick();
        session.tick();

        assert_eq!(session.phase, Phase::Finished);
        let round = session.round.as_ref().unwrap();
        assert_eq!(round.phase, RoundPhase::Finished);
        assert_eq!(round.state.questions_answered, 5);
        let result = session.result.unwrap();
        assert_eq!(result.score, 2);
        assert_eq!(session.store().raw("equation_mix_equations"), Some("2"));
    }

    #[test]
    fn test_input_ignored_outside_playing() {
        let mut session = session();
        session.push_digit('4');
        assert_eq!(session.submit(), SubmitOutcome::Ignored);
        assert_eq!(session.tick(), TickOutcome::Ignored);
        assert!(session.round.is_none());
    }

    #[test]
    fn test_play_again_and_go_home_reset_everything() {
        let mut session = session();
        session.selection.select_operation(Operation::Div);
        session.selection.select_difficulty(Difficulty::Table(4));
        session.start();
        for _ in 0..15 {
            session.tick();
        }
        assert_eq!(session.phase, Phase::Finished);

        session.play_again();
        assert_eq!(session.phase, Phase::Setup);
        assert_eq!(session.selection, Selection::default());
        assert!(session.round.is_none());
        assert!(session.result.is_none());

        session.selection.toggle_equations();
        session.start();
        for _ in 0..(60 * 5) {
            session.tick();
        }
        assert_eq!(session.phase, Phase::Finished);
        session.go_home();
        assert_eq!(session.phase, Phase::Setup);
        assert!(!session.can_start());
    }

    #[test]
    fn test_abandon_does_not_record() {
        let mut session = session();
        session.selection.select_operation(Operation::Add);
        session.selection.select_difficulty(Difficulty::Table(1));
        session.start();
        answer(&mut session, true);

        session.abandon();
        assert_eq!(session.phase, Phase::Setup);
        assert!(session.result.is_none());
        assert_eq!(session.store().raw("add_1_normal"), None);
    }
}
