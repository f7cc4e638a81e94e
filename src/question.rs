use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

/// Operations offered on the setup screen
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Operation {
    Add,
    Sub,
    Mult,
    Div,
    Sqrt,
    Equation,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::Add,
        Operation::Sub,
        Operation::Mult,
        Operation::Div,
        Operation::Sqrt,
        Operation::Equation,
    ];

    /// Operations a mix round draws from, one per question
    pub const MIXED: [Operation; 4] = [
        Operation::Add,
        Operation::Sub,
        Operation::Mult,
        Operation::Div,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Operation::Add => "Addition",
            Operation::Sub => "Subtraction",
            Operation::Mult => "Multiplication",
            Operation::Div => "Division",
            Operation::Sqrt => "Square root",
            Operation::Equation => "Equations",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Operation::Add => "+",
            Operation::Sub => "-",
            Operation::Mult => "x",
            Operation::Div => "÷",
            Operation::Sqrt => "√",
            Operation::Equation => "ax+b",
        }
    }
}

/// Fixed table number, or `Mix` for a fresh random table per question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Difficulty {
    Table(u8),
    Mix,
}

impl Difficulty {
    pub const MAX_TABLE: u8 = 9;

    /// Returns `None` for tables outside 0-9
    pub fn table(n: u8) -> Option<Self> {
        (n <= Self::MAX_TABLE).then_some(Difficulty::Table(n))
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Table(n) => write!(f, "{n}"),
            Difficulty::Mix => f.write_str("mix"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("mix") {
            return Ok(Difficulty::Mix);
        }
        s.parse::<u8>()
            .ok()
            .and_then(Difficulty::table)
            .ok_or_else(|| format!("difficulty must be 0-9 or 'mix', got '{s}'"))
    }
}

impl Serialize for Difficulty {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Difficulty {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    #[default]
    Normal,
    Equations,
}

/// What a round drills. Fixed for the lifetime of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionConfig {
    pub operation: Operation,
    pub difficulty: Difficulty,
    pub mode: Mode,
}

impl SessionConfig {
    /// Picking the equation operation implies equations mode.
    pub fn new(operation: Operation, difficulty: Difficulty) -> Self {
        if operation == Operation::Equation {
            return Self::equations();
        }
        Self {
            operation,
            difficulty,
            mode: Mode::Normal,
        }
    }

    pub fn equations() -> Self {
        Self {
            operation: Operation::Equation,
            difficulty: Difficulty::Mix,
            mode: Mode::Equations,
        }
    }

    pub fn is_equations(&self) -> bool {
        self.mode == Mode::Equations
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub text: String,
    pub answer: i64,
}

/// Builds questions from a `SessionConfig` using an injected random source
#[derive(Debug)]
pub struct QuestionGenerator<R: Rng = StdRng> {
    rng: R,
}

impl QuestionGenerator<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> QuestionGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    pub fn generate(&mut self, config: &SessionConfig) -> Question {
        if config.is_equations() || config.operation == Operation::Equation {
            return self.equation();
        }

        // mix draws both the table and the operation afresh for every question
        let (operation, table) = match config.difficulty {
            Difficulty::Table(n) => (config.operation, i64::from(n)),
            Difficulty::Mix => {
                let operation = Operation::MIXED[self.rng.gen_range(0..Operation::MIXED.len())];
                (operation, self.rng.gen_range(1..=10))
            }
        };

        // nothing divides by zero, so the zero table drills "0 x n" instead
        let operation = if operation == Operation::Div && table == 0 {
            Operation::Mult
        } else {
            operation
        };

        match operation {
            Operation::Add => {
                let other = self.rng.gen_range(1..=10);
                Question {
                    text: format!("{table} + {other} ="),
                    answer: table + other,
                }
            }
            Operation::Sub => {
                let minuend = self.rng.gen_range(table..=table + 10);
                Question {
                    text: format!("{minuend} - {table} ="),
                    answer: minuend - table,
                }
            }
            Operation::Mult => {
                let other = self.rng.gen_range(1..=10);
                Question {
                    text: format!("{table} x {other} ="),
                    answer: table * other,
                }
            }
            Operation::Div => {
                let quotient = self.rng.gen_range(1..=10);
                Question {
                    text: format!("{} ÷ {table} =", table * quotient),
                    answer: quotient,
                }
            }
            Operation::Sqrt => {
                let root = self.rng.gen_range(1..=(table + 5).max(10));
                Question {
                    text: format!("√{} =", root * root),
                    answer: root,
                }
            }
            Operation::Equation => self.equation(),
        }
    }

    /// Like `generate`, but never repeats the text of `previous`
    pub fn next(&mut self, config: &SessionConfig, previous: Option<&Question>) -> Question {
        loop {
            let question = self.generate(config);
            if previous.map_or(true, |p| p.text != question.text) {
                return question;
            }
        }
    }

    fn equation(&mut self) -> Question {
        let a: i64 = self.rng.gen_range(2..=10);
        let x: i64 = self.rng.gen_range(1..=20);
        let b: i64 = self.rng.gen_range(-20..=20);
        let c = a * x + b;
        let sign = if b < 0 { '-' } else { '+' };

        Question {
            text: format!("{a}x {sign} {} = {c}", b.abs()),
            answer: x,
        }
    }
}
