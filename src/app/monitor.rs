//! Status monitor: the single writer of the shared status record.
//!
//! ```text
//!   ┌─ pcpower-monitor thread ─────────────────────────────────────┐
//!   │  edge_executor::LocalExecutor                                │
//!   │   ├─ status task: sample power-good every poll interval      │
//!   │   └─ buzzer task: wake on edge signal, read pulse counter    │
//!   │                │                     │                       │
//!   │                └──▶ RecordWriter ◀───┘ ──▶ StatusStore       │
//!   └──────────────────────────────────────────────────────────────┘
//!        ▲ edge signal + AtomicU32            ▲ stop flag + wake signals
//!   buzzer edge handler (input's context)   StatusMonitor::shutdown
//! ```
//!
//! Both tasks funnel through one [`RecordWriter`], which always persists
//! the whole record, so a reader never sees one field from an older write
//! paired with the other from a newer one.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use async_io_mini::Timer;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use futures_lite::future::{block_on, or, zip};
use log::{debug, error, info};

use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, GpioPort, SenseInput, StatusStore};
use crate::config::SystemConfig;
use crate::drivers::sense::SenseLine;
use crate::drivers::worker::spawn_named;
use crate::error::{Error, Result};
use crate::status::{PowerStatus, StatusRecord};

const WORKER_NAME: &str = "pcpower-monitor";
const WORKER_STACK_KB: usize = 64;

type WakeSignal = Signal<CriticalSectionRawMutex, ()>;

/// Cooperative stop request shared with the worker.
struct StopSignal {
    requested: AtomicBool,
    status_wake: WakeSignal,
    buzzer_wake: WakeSignal,
}

impl StopSignal {
    fn new() -> Self {
        Self {
            requested: AtomicBool::new(false),
            status_wake: Signal::new(),
            buzzer_wake: Signal::new(),
        }
    }

    fn request(&self) {
        self.requested.store(true, Ordering::Release);
        self.status_wake.signal(());
        self.buzzer_wake.signal(());
    }

    fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }
}

/// Owns the in-memory copy of the record and is the only code path that
/// writes the store.
struct RecordWriter {
    /// Last record the store accepted.
    written: StatusRecord,
    /// Record the store should hold.
    wanted: StatusRecord,
    store: Arc<dyn StatusStore>,
    sink: Arc<dyn EventSink>,
    write_failing: bool,
}

impl RecordWriter {
    fn new(store: Arc<dyn StatusStore>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            written: StatusRecord::default(),
            wanted: StatusRecord::default(),
            store,
            sink,
            write_failing: false,
        }
    }

    fn observe_status(&mut self, status: PowerStatus) {
        self.wanted.status = status;
        self.flush();
    }

    fn observe_pulses(&mut self, count: u32) {
        self.wanted.buzzer_pulse_count = count;
        self.flush();
    }

    /// Persist `wanted` if it differs from what the store holds.  A failed
    /// write leaves `written` untouched, so the next observation retries.
    fn flush(&mut self) {
        if self.wanted == self.written {
            return;
        }
        match self.store.write(&self.wanted) {
            Ok(()) => {
                if self.write_failing {
                    info!("status record writable again");
                    self.write_failing = false;
                }
                let (old, new) = (self.written, self.wanted);
                self.written = new;
                if old.status != new.status {
                    self.sink.emit(&AppEvent::StatusChanged {
                        from: old.status,
                        to: new.status,
                    });
                }
                if old.buzzer_pulse_count != new.buzzer_pulse_count {
                    self.sink.emit(&AppEvent::BuzzerPulse {
                        count: new.buzzer_pulse_count,
                    });
                }
            }
            Err(e) if self.write_failing => debug!("status record write still failing: {}", e),
            Err(e) => {
                self.write_failing = true;
                self.sink.emit(&AppEvent::StoreWriteFailed(e));
            }
        }
    }
}

/// Everything the worker thread needs besides the two lines.
struct WorkerContext {
    interval: Duration,
    store: Arc<dyn StatusStore>,
    sink: Arc<dyn EventSink>,
    stop: Arc<StopSignal>,
    pulses: Arc<AtomicU32>,
    edges: Arc<WakeSignal>,
}

/// Continuously observes the power-good and buzzer sense lines and keeps
/// the shared status record current.
pub struct StatusMonitor<I: SenseInput + 'static> {
    /// Returns both lines once the tasks stop.  `None` after shutdown.
    worker: Option<JoinHandle<(SenseLine<I>, SenseLine<I>)>>,
    stop: Arc<StopSignal>,
    pulses: Arc<AtomicU32>,
    store: Arc<dyn StatusStore>,
    sink: Arc<dyn EventSink>,
}

impl<I: SenseInput + 'static> StatusMonitor<I> {
    /// Claim both sense lines, create the status record as `{Unknown, 0}`,
    /// install the buzzer edge handler and start polling.
    pub fn start<G: GpioPort<Input = I>>(
        gpio: &mut G,
        config: &SystemConfig,
        store: Arc<dyn StatusStore>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        let status_line = config.power_status_gpio;
        let buzzer_line = config.buzzer_gpio;
        let polarity = config.sense_polarity;

        let pin = gpio.claim_input(status_line).map_err(|source| Error::Acquire {
            line: status_line,
            source,
        })?;
        let mut status = SenseLine::new("power status", status_line, polarity, pin);

        let pin = match gpio.claim_input(buzzer_line) {
            Ok(pin) => pin,
            Err(source) => {
                release_line(&mut status, sink.as_ref());
                return Err(Error::Acquire {
                    line: buzzer_line,
                    source,
                });
            }
        };
        let mut buzzer = SenseLine::new("buzzer", buzzer_line, polarity, pin);

        if let Err(e) = store.initialize() {
            release_line(&mut status, sink.as_ref());
            release_line(&mut buzzer, sink.as_ref());
            return Err(Error::Store(e));
        }

        let pulses = Arc::new(AtomicU32::new(0));
        let edges: Arc<WakeSignal> = Arc::new(Signal::new());
        let handler = {
            let pulses = pulses.clone();
            let edges = edges.clone();
            Box::new(move || {
                pulses.fetch_add(1, Ordering::AcqRel);
                edges.signal(());
            })
        };
        if let Err(source) = buzzer.on_rising_edge(handler) {
            release_line(&mut status, sink.as_ref());
            release_line(&mut buzzer, sink.as_ref());
            remove_record(store.as_ref(), sink.as_ref());
            return Err(Error::Acquire {
                line: buzzer_line,
                source,
            });
        }

        let stop = Arc::new(StopSignal::new());
        let ctx = WorkerContext {
            interval: config.status_poll_interval(),
            store: store.clone(),
            sink: sink.clone(),
            stop: stop.clone(),
            pulses: pulses.clone(),
            edges,
        };
        // On spawn failure the closure, and both lines with it, are dropped,
        // which releases them.
        let worker = spawn_named(WORKER_NAME, WORKER_STACK_KB, move || {
            run_worker(status, buzzer, ctx)
        })
        .map_err(|e| {
            error!("monitor worker spawn failed: {}", e);
            remove_record(store.as_ref(), sink.as_ref());
            Error::Spawn
        })?;

        sink.emit(&AppEvent::MonitorStarted {
            status_line,
            buzzer_line,
        });

        Ok(Self {
            worker: Some(worker),
            stop,
            pulses,
            store,
            sink,
        })
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Rising edges counted on the buzzer line since start.
    pub fn pulse_count(&self) -> u32 {
        self.pulses.load(Ordering::Acquire)
    }

    /// Stop both tasks, remove the status record and release both lines.
    ///
    /// Never fails; problems are logged.  A second call is a no-op.
    pub fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            info!("monitor already shut down");
            return;
        };

        self.stop.request();
        let lines = worker.join();

        remove_record(self.store.as_ref(), self.sink.as_ref());

        match lines {
            Ok((mut status, mut buzzer)) => {
                release_line(&mut status, self.sink.as_ref());
                release_line(&mut buzzer, self.sink.as_ref());
            }
            Err(_) => error!("monitor worker panicked; sense lines released on unwind"),
        }

        self.sink.emit(&AppEvent::MonitorStopped);
    }
}

impl<I: SenseInput + 'static> Drop for StatusMonitor<I> {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.shutdown();
        }
    }
}

fn remove_record(store: &dyn StatusStore, sink: &dyn EventSink) {
    if let Err(e) = store.destroy() {
        sink.emit(&AppEvent::StoreRemoveFailed(e));
    }
}

fn release_line<I: SenseInput>(line: &mut SenseLine<I>, sink: &dyn EventSink) {
    if let Err(error) = line.close() {
        sink.emit(&AppEvent::ReleaseFailed {
            name: line.name(),
            error,
        });
    }
}

// ── Worker ───────────────────────────────────────────────────

/// Worker thread body.  Runs both tasks to completion, then hands the
/// lines back for release.
fn run_worker<I: SenseInput>(
    mut status: SenseLine<I>,
    buzzer: SenseLine<I>,
    ctx: WorkerContext,
) -> (SenseLine<I>, SenseLine<I>) {
    {
        let writer = Rc::new(RefCell::new(RecordWriter::new(
            ctx.store.clone(),
            ctx.sink.clone(),
        )));
        let executor: edge_executor::LocalExecutor<'_, 4> = edge_executor::LocalExecutor::new();

        let status_task = executor.spawn(status_loop(
            &mut status,
            writer.clone(),
            ctx.interval,
            &ctx.stop,
            ctx.sink.as_ref(),
        ));
        let buzzer_task = executor.spawn(buzzer_loop(writer, &ctx.pulses, &ctx.edges, &ctx.stop));

        debug!("monitor tasks started (poll={:?})", ctx.interval);
        block_on(executor.run(zip(status_task, buzzer_task)));
    }
    (status, buzzer)
}

async fn status_loop<I: SenseInput>(
    line: &mut SenseLine<I>,
    writer: Rc<RefCell<RecordWriter>>,
    interval: Duration,
    stop: &StopSignal,
    sink: &dyn EventSink,
) {
    let mut failing = false;
    while !stop.is_requested() {
        let status = match line.is_active() {
            Ok(level) => {
                if failing {
                    failing = false;
                    sink.emit(&AppEvent::SenseReadRecovered { line: line.line() });
                }
                PowerStatus::from_level(level)
            }
            Err(error) => {
                if !failing {
                    failing = true;
                    sink.emit(&AppEvent::SenseReadFailed {
                        line: line.line(),
                        error,
                    });
                }
                PowerStatus::Unknown
            }
        };
        writer.borrow_mut().observe_status(status);

        or(
            async {
                Timer::after(interval).await;
            },
            stop.status_wake.wait(),
        )
        .await;
    }
}

async fn buzzer_loop(
    writer: Rc<RefCell<RecordWriter>>,
    pulses: &AtomicU32,
    edges: &WakeSignal,
    stop: &StopSignal,
) {
    loop {
        or(edges.wait(), stop.buzzer_wake.wait()).await;
        writer
            .borrow_mut()
            .observe_pulses(pulses.load(Ordering::Acquire));
        if stop.is_requested() {
            break;
        }
    }
}
