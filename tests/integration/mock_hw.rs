//! Mock hardware adapters for integration tests.
//!
//! `MockGpio` records every level change with a timestamp so tests can
//! assert on pulse lengths, and lets tests drive sense levels, fire buzzer
//! edges and inject failures without touching real GPIO.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use pcpower::app::events::AppEvent;
use pcpower::app::ports::{
    EdgeHandler, EventSink, GpioPort, LineId, SenseInput, StatusStore, StoreError, SwitchOutput,
};
use pcpower::error::GpioError;
use pcpower::status::{PowerStatus, StatusRecord};

// ── Line state ────────────────────────────────────────────────

#[derive(Default)]
struct Line {
    claimed: bool,
    level: bool,
    history: Vec<(Instant, bool)>,
    handler: Option<EdgeHandler>,
    fail_reads: bool,
    fail_writes: bool,
    fail_edge_setup: bool,
    fail_claim: Option<GpioError>,
    stale: bool,
}

#[derive(Default)]
struct Board {
    lines: HashMap<LineId, Line>,
    released_stale: HashSet<LineId>,
    closes: HashMap<LineId, u32>,
}

// ── MockGpio ──────────────────────────────────────────────────

/// Shared fake GPIO controller.  Clones observe the same lines.
#[derive(Clone, Default)]
pub struct MockGpio {
    board: Arc<Mutex<Board>>,
}

#[allow(dead_code)]
impl MockGpio {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_line<R>(&self, line: LineId, f: impl FnOnce(&mut Line) -> R) -> R {
        let mut board = self.board.lock().unwrap();
        f(board.lines.entry(line).or_default())
    }

    /// Drive a sense line.  A low→high change fires the edge handler.
    pub fn set_level(&self, line: LineId, high: bool) {
        let handler = self.with_line(line, |l| {
            let rising = high && !l.level;
            l.level = high;
            l.history.push((Instant::now(), high));
            if rising { l.handler.take() } else { None }
        });
        if let Some(mut handler) = handler {
            handler();
            self.with_line(line, |l| {
                if l.claimed && l.handler.is_none() {
                    l.handler = Some(handler);
                }
            });
        }
    }

    /// One full beep: rising then falling edge.
    pub fn pulse(&self, line: LineId) {
        self.set_level(line, true);
        self.set_level(line, false);
    }

    pub fn level(&self, line: LineId) -> bool {
        self.with_line(line, |l| l.level)
    }

    pub fn fail_reads(&self, line: LineId, fail: bool) {
        self.with_line(line, |l| l.fail_reads = fail);
    }

    pub fn fail_writes(&self, line: LineId, fail: bool) {
        self.with_line(line, |l| l.fail_writes = fail);
    }

    pub fn fail_edge_setup(&self, line: LineId) {
        self.with_line(line, |l| l.fail_edge_setup = true);
    }

    pub fn fail_claim(&self, line: LineId, error: GpioError) {
        self.with_line(line, |l| l.fail_claim = Some(error));
    }

    /// Pretend an earlier process exited without releasing `line`.
    pub fn mark_stale(&self, line: LineId) {
        self.with_line(line, |l| l.stale = true);
    }

    pub fn released_stale(&self, line: LineId) -> bool {
        self.board.lock().unwrap().released_stale.contains(&line)
    }

    pub fn is_claimed(&self, line: LineId) -> bool {
        self.with_line(line, |l| l.claimed)
    }

    pub fn has_edge_handler(&self, line: LineId) -> bool {
        self.with_line(line, |l| l.handler.is_some())
    }

    pub fn close_count(&self, line: LineId) -> u32 {
        self.board.lock().unwrap().closes.get(&line).copied().unwrap_or(0)
    }

    /// Every level the line was driven to, oldest first.  The first entry
    /// of an output is its claim level.
    pub fn history(&self, line: LineId) -> Vec<(Instant, bool)> {
        self.with_line(line, |l| l.history.clone())
    }

    pub fn levels(&self, line: LineId) -> Vec<bool> {
        self.history(line).into_iter().map(|(_, level)| level).collect()
    }

    /// Lengths of every completed interval the line spent at `active`.
    pub fn asserted_intervals(&self, line: LineId, active: bool) -> Vec<(Instant, Duration)> {
        let mut out = Vec::new();
        let mut since = None;
        for (at, level) in self.history(line) {
            match (level == active, since) {
                (true, None) => since = Some(at),
                (false, Some(start)) => {
                    out.push((start, at.duration_since(start)));
                    since = None;
                }
                _ => {}
            }
        }
        out
    }
}

impl GpioPort for MockGpio {
    type Input = MockInput;
    type Output = MockOutput;

    fn claim_input(&mut self, line: LineId) -> Result<MockInput, GpioError> {
        self.with_line(line, |l| {
            if let Some(e) = l.fail_claim {
                return Err(e);
            }
            if l.claimed {
                return Err(GpioError::Busy);
            }
            l.claimed = true;
            Ok(())
        })?;
        Ok(MockInput {
            line,
            gpio: self.clone(),
        })
    }

    fn claim_output(&mut self, line: LineId, initial_high: bool) -> Result<MockOutput, GpioError> {
        self.with_line(line, |l| {
            if let Some(e) = l.fail_claim {
                return Err(e);
            }
            if l.claimed || l.stale {
                return Err(GpioError::Busy);
            }
            l.claimed = true;
            l.level = initial_high;
            l.history.push((Instant::now(), initial_high));
            Ok(())
        })?;
        Ok(MockOutput {
            line,
            gpio: self.clone(),
        })
    }

    fn release(&mut self, line: LineId) -> Result<(), GpioError> {
        let mut board = self.board.lock().unwrap();
        let l = board.lines.entry(line).or_default();
        if !l.stale {
            return Err(GpioError::NotInitialized);
        }
        l.stale = false;
        board.released_stale.insert(line);
        Ok(())
    }
}

fn close_line(gpio: &MockGpio, line: LineId) -> Result<(), GpioError> {
    let mut board = gpio.board.lock().unwrap();
    *board.closes.entry(line).or_default() += 1;
    let l = board.lines.entry(line).or_default();
    l.claimed = false;
    l.handler = None;
    Ok(())
}

// ── Pins ──────────────────────────────────────────────────────

pub struct MockInput {
    line: LineId,
    gpio: MockGpio,
}

impl ErrorType for MockInput {
    type Error = GpioError;
}

impl InputPin for MockInput {
    fn is_high(&mut self) -> Result<bool, GpioError> {
        self.gpio.with_line(self.line, |l| {
            if !l.claimed {
                Err(GpioError::Closed)
            } else if l.fail_reads {
                Err(GpioError::ReadFailed)
            } else {
                Ok(l.level)
            }
        })
    }

    fn is_low(&mut self) -> Result<bool, GpioError> {
        self.is_high().map(|h| !h)
    }
}

impl SenseInput for MockInput {
    fn on_rising_edge(&mut self, handler: EdgeHandler) -> Result<(), GpioError> {
        self.gpio.with_line(self.line, |l| {
            if l.fail_edge_setup || l.handler.is_some() {
                return Err(GpioError::EdgeSetupFailed);
            }
            l.handler = Some(handler);
            Ok(())
        })
    }

    fn close(&mut self) -> Result<(), GpioError> {
        close_line(&self.gpio, self.line)
    }
}

pub struct MockOutput {
    line: LineId,
    gpio: MockGpio,
}

impl MockOutput {
    fn drive(&mut self, high: bool) -> Result<(), GpioError> {
        self.gpio.with_line(self.line, |l| {
            if !l.claimed {
                return Err(GpioError::Closed);
            }
            if l.fail_writes {
                return Err(GpioError::WriteFailed);
            }
            l.level = high;
            l.history.push((Instant::now(), high));
            Ok(())
        })
    }
}

impl ErrorType for MockOutput {
    type Error = GpioError;
}

impl OutputPin for MockOutput {
    fn set_low(&mut self) -> Result<(), GpioError> {
        self.drive(false)
    }

    fn set_high(&mut self) -> Result<(), GpioError> {
        self.drive(true)
    }
}

impl SwitchOutput for MockOutput {
    fn close(&mut self) -> Result<(), GpioError> {
        close_line(&self.gpio, self.line)
    }
}

// ── MemoryStore ───────────────────────────────────────────────

/// In-memory status store that records every accepted write.
#[derive(Default)]
pub struct MemoryStore {
    record: Mutex<Option<StatusRecord>>,
    writes: Mutex<Vec<StatusRecord>>,
    fail_writes: AtomicBool,
    fail_initialize: AtomicBool,
    fail_destroy: AtomicBool,
}

#[allow(dead_code)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(status: PowerStatus) -> Self {
        let store = Self::default();
        *store.record.lock().unwrap() = Some(StatusRecord::new(status, 0));
        store
    }

    pub fn set_status(&self, status: PowerStatus) {
        let mut record = self.record.lock().unwrap();
        let count = record.map_or(0, |r| r.buzzer_pulse_count);
        *record = Some(StatusRecord::new(status, count));
    }

    pub fn exists(&self) -> bool {
        self.record.lock().unwrap().is_some()
    }

    pub fn writes(&self) -> Vec<StatusRecord> {
        self.writes.lock().unwrap().clone()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_initialize(&self) {
        self.fail_initialize.store(true, Ordering::SeqCst);
    }

    pub fn fail_destroy(&self) {
        self.fail_destroy.store(true, Ordering::SeqCst);
    }
}

impl StatusStore for MemoryStore {
    fn try_read(&self) -> Result<StatusRecord, StoreError> {
        self.record.lock().unwrap().ok_or(StoreError::NotFound)
    }

    fn write(&self, record: &StatusRecord) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::ErrorKind::Other));
        }
        *self.record.lock().unwrap() = Some(*record);
        self.writes.lock().unwrap().push(*record);
        Ok(())
    }

    fn initialize(&self) -> Result<(), StoreError> {
        if self.fail_initialize.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::ErrorKind::PermissionDenied));
        }
        *self.record.lock().unwrap() = Some(StatusRecord::default());
        Ok(())
    }

    fn destroy(&self) -> Result<(), StoreError> {
        if self.fail_destroy.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::ErrorKind::PermissionDenied));
        }
        *self.record.lock().unwrap() = None;
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

/// Event sink that keeps every event for later assertions.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<AppEvent>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AppEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &AppEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ── Helpers ───────────────────────────────────────────────────

/// Poll `cond` every 5 ms until it holds or `timeout` passes.
#[allow(dead_code)]
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}
