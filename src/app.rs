use std::time::Duration;

use chrono::Local;
use crossterm::event::KeyEvent;

use crate::celebration::Celebration;
use crate::controls::{self, control_for};
use crate::high_score::HighScoreStore;
use crate::history::{HistoryLog, RoundRecord};
use crate::runtime::SecondClock;
use crate::session::{Phase, Session};

pub type DynStore = Box<dyn HighScoreStore>;

/// Everything the event loop and the renderer share
pub struct App {
    pub session: Session<DynStore>,
    pub celebration: Celebration,
    history: Option<HistoryLog>,
    clock: SecondClock,
    seen: Moment,
}

/// Snapshot of what the second clock is timing; any change restarts it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Moment {
    phase: Phase,
    question_serial: u64,
    locked: bool,
}

impl Moment {
    fn of(session: &Session<DynStore>) -> Self {
        let round = session.round.as_ref();
        Self {
            phase: session.phase,
            question_serial: round.map_or(0, |r| r.question_serial),
            locked: round.is_some_and(|r| r.is_locked()),
        }
    }
}

impl App {
    pub fn new(
        session: Session<DynStore>,
        history: Option<HistoryLog>,
        tick_interval: Duration,
    ) -> Self {
        let seen = Moment::of(&session);
        Self {
            session,
            celebration: Celebration::default(),
            history,
            clock: SecondClock::new(tick_interval),
            seen,
        }
    }

    pub fn phase(&self) -> Phase {
        self.session.phase
    }

    /// Returns false when the app should exit
    pub fn handle_key(&mut self, key: KeyEvent, width: u16, height: u16) -> bool {
        let Some(control) = control_for(self.session.phase, key) else {
            return true;
        };

        let before = self.session.phase;
        let keep_running = controls::apply(&mut self.session, control);
        self.after_update(before, width, height);
        keep_running
    }

    /// One UI tick. Every full second of ticks advances the round.
    pub fn on_tick(&mut self, width: u16, height: u16) {
        self.celebration.update();

        if self.session.phase == Phase::Playing && self.clock.on_tick() {
            let before = self.session.phase;
            self.session.tick();
            self.after_update(before, width, height);
        }
    }

    fn after_update(&mut self, before: Phase, width: u16, height: u16) {
        let now = Moment::of(&self.session);
        if now != self.seen {
            self.clock.restart();
            self.seen = now;
        }

        if before == Phase::Playing && self.session.phase == Phase::Finished {
            self.record_result(width, height);
        }
        if self.session.phase != Phase::Finished {
            self.celebration.stop();
        }
    }

    fn record_result(&mut self, width: u16, height: u16) {
        let Some(result) = self.session.result else {
            return;
        };

        if result.is_new_record {
            self.celebration.start(width, height);
        }

        if let Some(history) = &self.history {
            let record = RoundRecord::from_result(&result, Local::now());
            if let Err(e) = history.append(&record) {
                tracing::warn!(error = %e, "failed to append round history");
            }
        }
    }
}
