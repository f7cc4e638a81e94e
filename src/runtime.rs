use std::cell::Cell;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

pub const TICK_RATE_MS: u64 = 100;

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum DrillEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Source of terminal events (keyboard, resize, etc.)
pub trait DrillEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<DrillEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    rx: Receiver<DrillEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let evt = match event::read() {
                // key release events would double every digit on some terminals
                Ok(CtEvent::Key(key)) if key.kind != KeyEventKind::Release => {
                    DrillEvent::Key(key)
                }
                Ok(CtEvent::Resize(_, _)) => DrillEvent::Resize,
                Ok(_) => continue,
                Err(_) => break,
            };
            if tx.send(evt).is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl DrillEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<DrillEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<DrillEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<DrillEvent>) -> Self {
        Self { rx }
    }
}

impl DrillEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<DrillEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the application one event/tick at a time.
///
/// Ticks are scheduled against a deadline, so a steady stream of key events
/// can't starve them.
pub struct Runner<E: DrillEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
    next_tick: Cell<Instant>,
}

impl<E: DrillEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        let next_tick = Cell::new(Instant::now() + ticker.interval());
        Self {
            event_source,
            ticker,
            next_tick,
        }
    }

    /// Blocks until the next event or the next tick deadline, whichever is first
    pub fn step(&self) -> DrillEvent {
        let now = Instant::now();
        let deadline = self.next_tick.get();

        if now < deadline {
            match self.event_source.recv_timeout(deadline - now) {
                Ok(ev) => return ev,
                Err(RecvTimeoutError::Timeout) => {}
                // no more input: keep ticking on schedule
                Err(RecvTimeoutError::Disconnected) => {
                    std::thread::sleep(deadline.saturating_duration_since(Instant::now()))
                }
            }
        }

        self.next_tick.set(deadline + self.ticker.interval());
        if self.next_tick.get() < Instant::now() {
            // fell far behind (e.g. suspended); don't burst ticks to catch up
            self.next_tick.set(Instant::now() + self.ticker.interval());
        }
        DrillEvent::Tick
    }
}

/// Turns UI ticks into whole seconds of round time.
///
/// `restart` drops any partial second, so a new question always gets a
/// full first second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecondClock {
    ticks_per_second: u32,
    elapsed_ticks: u32,
}

impl SecondClock {
    /// Intervals that don't divide a second round up, so a round second is
    /// never shorter than a real one
    pub fn new(tick_interval: Duration) -> Self {
        let per_second = 1000u128.div_ceil(tick_interval.as_millis().max(1));
        Self {
            ticks_per_second: u32::try_from(per_second).unwrap_or(u32::MAX).max(1),
            elapsed_ticks: 0,
        }
    }

    /// Returns true when this tick completes a second
    pub fn on_tick(&mut self) -> bool {
        self.elapsed_ticks += 1;
        if self.elapsed_ticks >= self.ticks_per_second {
            self.elapsed_ticks = 0;
            true
        } else {
            false
        }
    }

    pub fn restart(&mut self) {
        self.elapsed_ticks = 0;
    }
}
