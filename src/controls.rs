use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::high_score::HighScoreStore;
use crate::question::{Difficulty, Operation};
use crate::session::{Phase, Session};

/// Everything the player can do, independent of which key produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    SelectOperation(Operation),
    SelectDifficulty(Difficulty),
    ToggleEquations,
    Start,
    Digit(char),
    Backspace,
    Submit,
    PlayAgain,
    GoHome,
    /// Esc: abandons a round in progress, quits everywhere else
    Back,
    Quit,
}

/// Setup-screen key for each operation
pub fn operation_key(operation: Operation) -> char {
    match operation {
        Operation::Add => 'a',
        Operation::Sub => 's',
        Operation::Mult => 'm',
        Operation::Div => 'd',
        Operation::Sqrt => 'r',
        Operation::Equation => 'e',
    }
}

pub const MIX_KEY: char = 'x';

/// Map a key press to a control for the given phase
pub fn control_for(phase: Phase, key: KeyEvent) -> Option<Control> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Control::Quit);
    }

    match (phase, key.code) {
        (_, KeyCode::Esc) => Some(Control::Back),

        (Phase::Setup, KeyCode::Enter) => Some(Control::Start),
        (Phase::Setup, KeyCode::Char(c)) => {
            let c = c.to_ascii_lowercase();
            if let Some(n) = c.to_digit(10) {
                return u8::try_from(n)
                    .ok()
                    .and_then(Difficulty::table)
                    .map(Control::SelectDifficulty);
            }
            if c == MIX_KEY {
                return Some(Control::SelectDifficulty(Difficulty::Mix));
            }
            if c == operation_key(Operation::Equation) {
                return Some(Control::ToggleEquations);
            }
            Operation::ALL
                .into_iter()
                .find(|op| operation_key(*op) == c)
                .map(Control::SelectOperation)
        }

        (Phase::Playing, KeyCode::Char(c)) if c.is_ascii_digit() => Some(Control::Digit(c)),
        (Phase::Playing, KeyCode::Backspace) => Some(Control::Backspace),
        (Phase::Playing, KeyCode::Enter) => Some(Control::Submit),

        (Phase::Finished, KeyCode::Char('p')) | (Phase::Finished, KeyCode::Enter) => {
            Some(Control::PlayAgain)
        }
        (Phase::Finished, KeyCode::Char('h')) => Some(Control::GoHome),

        _ => None,
    }
}

/// Apply a control to the session. Returns false when the app should exit.
pub fn apply<S: HighScoreStore>(session: &mut Session<S>, control: Control) -> bool {
    match control {
        Control::SelectOperation(op) => session.selection.select_operation(op),
        Control::SelectDifficulty(d) => session.selection.select_difficulty(d),
        Control::ToggleEquations => session.selection.toggle_equations(),
        Control::Start => {
            session.start();
        }
        Control::Digit(c) => session.push_digit(c),
        Control::Backspace => session.backspace(),
        Control::Submit => {
            session.submit();
        }
        Control::PlayAgain => session.play_again(),
        Control::GoHome => session.go_home(),
        Control::Back => {
            if session.phase != Phase::Playing {
                return false;
            }
            session.abandon();
        }
        Control::Quit => return false,
    }
    true
}
