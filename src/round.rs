use crate::question::{Question, QuestionGenerator, SessionConfig};
use rand::{rngs::StdRng, Rng};
use serde::{Deserialize, Serialize};

pub const MAX_INPUT_LEN: usize = 4;
pub const EQUATION_QUESTIONS: u32 = 5;
pub const STREAK_CHAIN: u32 = 5;
const STREAK_HEAT_CAP: u32 = 10;

/// Timings for a round, all in whole seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSettings {
    pub round_secs: u32,
    pub question_secs: u32,
    pub feedback_secs: u32,
}

impl Default for RoundSettings {
    fn default() -> Self {
        Self {
            round_secs: 15,
            question_secs: 60,
            feedback_secs: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    Active,
    /// Wrong answer shown to the player, input locked until `remaining` hits zero
    Feedback { correct_answer: i64, remaining: u32 },
    Finished,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundState {
    pub time_remaining: u32,
    pub score: u32,
    pub streak: u32,
    pub best_streak: u32,
    pub input: String,
    pub questions_answered: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Ignored,
    Correct,
    Incorrect { correct_answer: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Ignored,
    Counted,
    /// Equation-mode question ran out of time
    QuestionMissed,
    FeedbackReleased,
    Finished,
}

/// How hot the current streak is, for the streak indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StreakHeat {
    Cold,
    Warm,
    Hot,
    Blazing,
    Inferno,
}

impl StreakHeat {
    /// Intensity is `streak / 10`, capped at 1
    pub fn from_streak(streak: u32) -> Self {
        match streak.min(STREAK_HEAT_CAP) {
            0 => StreakHeat::Cold,
            1..=2 => StreakHeat::Warm,
            3..=5 => StreakHeat::Hot,
            6..=8 => StreakHeat::Blazing,
            _ => StreakHeat::Inferno,
        }
    }
}

/// A single timed round: the current question, the player's input and the score
#[derive(Debug)]
pub struct Round<R: Rng = StdRng> {
    pub config: SessionConfig,
    pub settings: RoundSettings,
    pub question: Question,
    pub state: RoundState,
    pub phase: RoundPhase,
    /// Bumped every time a new question is shown
    pub question_serial: u64,
    generator: QuestionGenerator<R>,
}

impl<R: Rng> Round<R> {
    pub fn new(
        config: SessionConfig,
        settings: RoundSettings,
        mut generator: QuestionGenerator<R>,
    ) -> Self {
        let question = generator.next(&config, None);
        let time_remaining = if config.is_equations() {
            settings.question_secs
        } else {
            settings.round_secs
        };

        Self {
            config,
            settings,
            question,
            state: RoundState {
                time_remaining,
                ..RoundState::default()
            },
            phase: RoundPhase::Active,
            question_serial: 0,
            generator,
        }
    }

    pub fn is_active(&self) -> bool {
        self.phase == RoundPhase::Active
    }

    pub fn is_locked(&self) -> bool {
        matches!(self.phase, RoundPhase::Feedback { .. })
    }

    pub fn has_finished(&self) -> bool {
        self.phase == RoundPhase::Finished
    }

    pub fn final_score(&self) -> Option<u32> {
        self.has_finished().then_some(self.state.score)
    }

    pub fn revealed_answer(&self) -> Option<i64> {
        match self.phase {
            RoundPhase::Feedback { correct_answer, .. } => Some(correct_answer),
            _ => None,
        }
    }

    /// The "chain" marker: every fifth consecutive correct answer
    pub fn is_streak_milestone(&self) -> bool {
        self.state.streak > 0 && self.state.streak % STREAK_CHAIN == 0
    }

    pub fn streak_heat(&self) -> StreakHeat {
        StreakHeat::from_streak(self.state.streak)
    }

    /// Seconds the current timer started from, for progress display
    pub fn timer_total(&self) -> u32 {
        if self.config.is_equations() {
            self.settings.question_secs
        } else {
            self.settings.round_secs
        }
    }

    pub fn push_digit(&mut self, digit: char) {
        if !self.is_active() || !digit.is_ascii_digit() {
            return;
        }
        if self.state.input.len() < MAX_INPUT_LEN {
            self.state.input.push(digit);
        }
    }

    pub fn backspace(&mut self) {
        if self.is_active() {
            self.state.input.pop();
        }
    }

    pub fn submit(&mut self) -> SubmitOutcome {
        if !self.is_active() || self.state.input.is_empty() {
            return SubmitOutcome::Ignored;
        }

        let Ok(given) = self.state.input.parse::<i64>() else {
            self.state.input.clear();
            return SubmitOutcome::Ignored;
        };
        self.state.input.clear();

        if given == self.question.answer {
            self.state.score += 1;
            self.state.streak += 1;
            self.state.best_streak = self.state.best_streak.max(self.state.streak);

            if self.config.is_equations() {
                self.complete_question();
            } else {
                self.advance_question();
            }
            SubmitOutcome::Correct
        } else {
            let correct_answer = self.question.answer;
            self.state.streak = 0;

            if self.settings.feedback_secs == 0 {
                self.release_feedback();
            } else {
                self.phase = RoundPhase::Feedback {
                    correct_answer,
                    remaining: self.settings.feedback_secs,
                };
            }
            SubmitOutcome::Incorrect { correct_answer }
        }
    }

    /// Advance the round by one second
    pub fn tick(&mut self) -> TickOutcome {
        match self.phase {
            RoundPhase::Finished => TickOutcome::Ignored,
            RoundPhase::Feedback {
                correct_answer,
                remaining,
            } => {
                // equation timers are frozen while the answer is revealed
                if !self.config.is_equations() && self.count_down() {
                    self.phase = RoundPhase::Finished;
                    return TickOutcome::Finished;
                }

                let remaining = remaining.saturating_sub(1);
                if remaining > 0 {
                    self.phase = RoundPhase::Feedback {
                        correct_answer,
                        remaining,
                    };
                    return TickOutcome::Counted;
                }

                self.release_feedback();
                if self.has_finished() {
                    TickOutcome::Finished
                } else {
                    TickOutcome::FeedbackReleased
                }
            }
            RoundPhase::Active => {
                if !self.count_down() {
                    return TickOutcome::Counted;
                }

                if !self.config.is_equations() {
                    self.phase = RoundPhase::Finished;
                    return TickOutcome::Finished;
                }

                self.state.streak = 0;
                self.state.input.clear();
                self.complete_question();
                if self.has_finished() {
                    TickOutcome::Finished
                } else {
                    TickOutcome::QuestionMissed
                }
            }
        }
    }

    /// Returns true once the timer has run out
    fn count_down(&mut self) -> bool {
        self.state.time_remaining = self.state.time_remaining.saturating_sub(1);
        self.state.time_remaining == 0
    }

    fn release_feedback(&mut self) {
        self.phase = RoundPhase::Active;
        if self.config.is_equations() {
            self.complete_question();
        } else {
            self.advance_question();
        }
    }

    fn complete_question(&mut self) {
        self.state.questions_answered += 1;
        if self.state.questions_answered >= EQUATION_QUESTIONS {
            self.phase = RoundPhase::Finished;
            return;
        }
        self.state.time_remaining = self.settings.question_secs;
        self.advance_question();
    }

    fn advance_question(&mut self) {
        self.question = self.generator.next(&self.config, Some(&self.question));
        self.question_serial += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::{Difficulty, Operation};
    use assert_matches::assert_matches;

    fn round(config: SessionConfig) -> Round {
        Round::new(config, RoundSettings::default(), QuestionGenerator::seeded(17))
    }

    fn normal_round() -> Round {
        round(SessionConfig::new(Operation::Mult, Difficulty::Table(3)))
    }

    fn type_answer(round: &mut Round, answer: i64) {
        for c in answer.to_string().chars() {
            round.push_digit(c);
        }
    }

    fn answer_correctly(round: &mut Round) -> SubmitOutcome {
        let answer = round.question.answer;
        type_answer(round, answer);
        round.submit()
    }

    fn answer_wrong(round: &mut Round) -> SubmitOutcome {
        let wrong = round.question.answer + 1;
        type_answer(round, wrong);
        round.submit()
    }

    #[test]
    fn test_new_round_normal_mode() {
        let round = normal_round();
        assert_eq!(round.state.time_remaining, 15);
        assert_eq!(round.state.score, 0);
        assert_eq!(round.state.streak, 0);
        assert!(round.state.input.is_empty());
        assert!(round.is_active());
        assert!(round.question.text.starts_with("3 x "));
    }

    #[test]
    fn test_new_round_equation_mode_uses_question_timer() {
        let round = round(SessionConfig::equations());
        assert_eq!(round.state.time_remaining, 60);
        assert_eq!(round.timer_total(), 60);
        assert_eq!(round.state.questions_answered, 0);
    }

    #[test]
    fn test_input_buffer_capped_at_four_digits() {
        let mut round = normal_round();
        for c in "123456".chars() {
            round.push_digit(c);
        }
        assert_eq!(round.state.input, "1234");
    }

    #[test]
    fn test_non_digit_input_ignored() {
        let mut round = normal_round();
        round.push_digit('a');
        round.push_digit('-');
        assert!(round.state.input.is_empty());
    }

    #[test]
    fn test_backspace() {
        let mut round = normal_round();
        round.push_digit('4');
        round.push_digit('2');
        round.backspace();
        assert_eq!(round.state.input, "4");
        round.backspace();
        round.backspace();
        assert!(round.state.input.is_empty());
    }

    #[test]
    fn test_empty_submit_is_noop() {
        let mut round = normal_round();
        let before = round.question.clone();
        assert_eq!(round.submit(), SubmitOutcome::Ignored);
        assert_eq!(round.question, before);
        assert_eq!(round.state.score, 0);
    }

    #[test]
    fn test_correct_answer_scores_and_advances() {
        let mut round = normal_round();
        let before = round.question.clone();

        assert_eq!(answer_correctly(&mut round), SubmitOutcome::Correct);
        assert_eq!(round.state.score, 1);
        assert_eq!(round.state.streak, 1);
        assert!(round.state.input.is_empty());
        assert_ne!(round.question.text, before.text);
        assert_eq!(round.question_serial, 1);
        assert!(round.is_active());
    }

    #[test]
    fn test_wrong_answer_locks_and_reveals() {
        let mut round = normal_round();
        answer_correctly(&mut round);
        let expected = round.question.answer;

        assert_matches!(
            answer_wrong(&mut round),
            SubmitOutcome::Incorrect { correct_answer } if correct_answer == expected
        );
        assert_eq!(round.state.streak, 0);
        assert_eq!(round.state.score, 1);
        assert!(round.is_locked());
        assert_eq!(round.revealed_answer(), Some(expected));

        // input is disabled during the feedback window
        round.push_digit('1');
        assert!(round.state.input.is_empty());
        assert_eq!(round.submit(), SubmitOutcome::Ignored);
    }

    #[test]
    fn test_feedback_releases_after_two_ticks() {
        let mut round = normal_round();
        let before = round.question.clone();
        answer_wrong(&mut round);

        assert_eq!(round.tick(), TickOutcome::Counted);
        assert!(round.is_locked());
        assert_eq!(round.tick(), TickOutcome::FeedbackReleased);
        assert!(round.is_active());
        assert_ne!(round.question.text, before.text);
        assert_eq!(round.revealed_answer(), None);
    }

    #[test]
    fn test_zero_feedback_advances_immediately() {
        let settings = RoundSettings {
            feedback_secs: 0,
            ..RoundSettings::default()
        };
        let mut round = Round::new(
            SessionConfig::new(Operation::Add, Difficulty::Table(5)),
            settings,
            QuestionGenerator::seeded(3),
        );
        answer_wrong(&mut round);
        assert!(round.is_active());
        assert_eq!(round.question_serial, 1);
    }

    #[test]
    fn test_normal_round_ends_when_timer_expires() {
        let mut round = normal_round();
        answer_correctly(&mut round);
        for _ in 0..14 {
            assert_eq!(round.tick(), TickOutcome::Counted);
        }
        assert_eq!(round.tick(), TickOutcome::Finished);
        assert!(round.has_finished());
        assert_eq!(round.final_score(), Some(1));
        assert_eq!(round.tick(), TickOutcome::Ignored);
    }

    #[test]
    fn test_normal_timer_runs_during_feedback_and_can_end_round() {
        let settings = RoundSettings {
            round_secs: 1,
            ..RoundSettings::default()
        };
        let mut round = Round::new(
            SessionConfig::new(Operation::Sub, Difficulty::Table(2)),
            settings,
            QuestionGenerator::seeded(8),
        );
        answer_wrong(&mut round);
        assert_eq!(round.tick(), TickOutcome::Finished);
        assert!(round.has_finished());
        assert_eq!(round.revealed_answer(), None);
    }

    #[test]
    fn test_input_after_finish_is_ignored() {
        let mut round = normal_round();
        for _ in 0..15 {
            round.tick();
        }
        round.push_digit('9');
        assert!(round.state.input.is_empty());
        assert_eq!(round.submit(), SubmitOutcome::Ignored);
    }

    #[test]
    fn test_score_never_decreases() {
        let mut round = normal_round();
        let mut last = 0;
        for i in 0..10 {
            if i % 3 == 0 {
                answer_wrong(&mut round);
                round.tick();
                round.tick();
            } else {
                answer_correctly(&mut round);
            }
            assert!(round.state.score >= last);
            last = round.state.score;
        }
    }

    #[test]
    fn test_streak_milestones() {
        let settings = RoundSettings {
            round_secs: 600,
            ..RoundSettings::default()
        };
        let mut round = Round::new(
            SessionConfig::new(Operation::Add, Difficulty::Mix),
            settings,
            QuestionGenerator::seeded(2),
        );

        for n in 1..=12u32 {
            answer_correctly(&mut round);
            assert_eq!(round.state.streak, n);
            assert_eq!(round.is_streak_milestone(), n == 5 || n == 10);
        }
        assert_eq!(round.state.best_streak, 12);

        answer_wrong(&mut round);
        assert!(!round.is_streak_milestone());
        assert_eq!(round.state.best_streak, 12);
    }

    #[test]
    fn test_streak_heat_buckets() {
        assert_eq!(StreakHeat::from_streak(0), StreakHeat::Cold);
        assert_eq!(StreakHeat::from_streak(2), StreakHeat::Warm);
        assert_eq!(StreakHeat::from_streak(3), StreakHeat::Hot);
        assert_eq!(StreakHeat::from_streak(6), StreakHeat::Blazing);
        assert_eq!(StreakHeat::from_streak(9), StreakHeat::Inferno);
        assert_eq!(StreakHeat::from_streak(40), StreakHeat::Inferno);
    }

    #[test]
    fn test_equation_correct_answer_resets_question_timer() {
        let mut round = round(SessionConfig::equations());
        round.tick();
        round.tick();
        assert_eq!(round.state.time_remaining, 58);

        answer_correctly(&mut round);
        assert_eq!(round.state.questions_answered, 1);
        assert_eq!(round.state.time_remaining, 60);
        assert_eq!(round.state.score, 1);
    }

    #[test]
    fn test_equation_timeout_counts_as_missed() {
        let mut round = round(SessionConfig::equations());
        answer_correctly(&mut round);
        let before = round.question.clone();

        for _ in 0..59 {
            assert_eq!(round.tick(), TickOutcome::Counted);
        }
        assert_eq!(round.tick(), TickOutcome::QuestionMissed);
        assert_eq!(round.state.questions_answered, 2);
        assert_eq!(round.state.streak, 0);
        assert_eq!(round.state.time_remaining, 60);
        assert_ne!(round.question.text, before.text);
    }

    #[test]
    fn test_equation_timer_frozen_during_feedback() {
        let mut round = round(SessionConfig::equations());
        round.tick();
        answer_wrong(&mut round);
        assert_eq!(round.state.questions_answered, 0);

        round.tick();
        assert_eq!(round.state.time_remaining, 59);
        assert_eq!(round.tick(), TickOutcome::FeedbackReleased);
        assert_eq!(round.state.questions_answered, 1);
        assert_eq!(round.state.time_remaining, 60);
    }

    #[test]
    fn test_equation_round_finishes_after_five_questions() {
        let mut round = round(SessionConfig::equations());

        answer_correctly(&mut round);
        answer_wrong(&mut round);
        round.tick();
        round.tick();
        answer_correctly(&mut round);
        assert_eq!(round.state.questions_answered, 3);

        // fourth question times out
        for _ in 0..60 {
            round.tick();
        }
        assert_eq!(round.state.questions_answered, 4);
        assert!(!round.has_finished());

        assert_eq!(answer_correctly(&mut round), SubmitOutcome::Correct);
        assert_eq!(round.state.questions_answered, 5);
        assert!(round.has_finished());
        assert_eq!(round.final_score(), Some(3));
    }

    #[test]
    fn test_equation_round_finishes_on_wrong_fifth_after_feedback() {
        let mut round = round(SessionConfig::equations());
        for _ in 0..4 {
            answer_correctly(&mut round);
        }
        answer_wrong(&mut round);
        assert!(!round.has_finished());
        round.tick();
        assert_eq!(round.tick(), TickOutcome::Finished);
        assert_eq!(round.state.questions_answered, 5);
        assert_eq!(round.final_score(), Some(4));
    }

    #[test]
    fn test_equation_round_finishes_on_fifth_timeout() {
        let settings = RoundSettings {
            question_secs: 1,
            ..RoundSettings::default()
        };
        let mut round = Round::new(
            SessionConfig::equations(),
            settings,
            QuestionGenerator::seeded(4),
        );
        for _ in 0..4 {
            assert_eq!(round.tick(), TickOutcome::QuestionMissed);
        }
        assert_eq!(round.tick(), TickOutcome::Finished);
        assert_eq!(round.state.questions_answered, 5);
        assert_eq!(round.final_score(), Some(0));
    }
}
