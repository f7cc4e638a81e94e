// Library surface for the binary and the headless integration tests.
pub mod app;
pub mod app_dirs;
pub mod celebration;
pub mod config;
pub mod controls;
pub mod error;
pub mod high_score;
pub mod history;
pub mod question;
pub mod round;
pub mod runtime;
pub mod session;
pub mod ui;
pub mod util;
