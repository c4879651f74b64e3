//! Linux sysfs GPIO adapter.
//!
//! Implements [`GpioPort`] on the legacy `/sys/class/gpio` interface, which
//! every Raspberry Pi kernel still ships.  The root directory is
//! configurable so tests can point it at a fake tree.
//!
//! ```text
//!   <root>/export            write "N"  → <root>/gpioN/ appears
//!   <root>/unexport          write "N"  → <root>/gpioN/ disappears
//!   <root>/gpioN/direction   "in" | "high" | "low"
//!   <root>/gpioN/value       "0" | "1"
//! ```
//!
//! Rising edges are detected by a named watcher thread sampling `value`
//! every millisecond.  Motherboard beeps last tens of milliseconds, well
//! above that resolution.
//!
//! ## Ownership
//!
//! Sysfs has no notion of which process exported a line.  With an owner
//! directory configured, every claim leaves `<dir>/gpioN.owner` holding
//! the claiming pid, removed again on close.  [`GpioPort::release`] only
//! unexports a line whose owner is gone.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use log::{debug, warn};

use crate::app::ports::{EdgeHandler, GpioPort, LineId, SenseInput, SwitchOutput};
use crate::drivers::worker::spawn_named;
use crate::error::GpioError;

/// `EBUSY` on Linux: the line is already exported.
const EBUSY: i32 = 16;

/// How long to wait for `gpioN/` to appear after export.
const EXPORT_TIMEOUT: Duration = Duration::from_millis(500);

const EDGE_SAMPLE_PERIOD: Duration = Duration::from_millis(1);
const WATCHER_STACK_KB: usize = 32;

/// Sysfs GPIO controller rooted at `root`.
#[derive(Debug, Clone)]
pub struct SysfsGpio {
    root: PathBuf,
    owner_dir: Option<PathBuf>,
}

impl SysfsGpio {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            owner_dir: None,
        }
    }

    /// Record line ownership under `dir`.
    #[must_use]
    pub fn with_owner_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.owner_dir = Some(dir.into());
        self
    }

    fn line_dir(&self, line: LineId) -> PathBuf {
        self.root.join(format!("gpio{line}"))
    }

    fn owner_file(&self, line: LineId) -> Option<PathBuf> {
        self.owner_dir
            .as_ref()
            .map(|dir| dir.join(format!("gpio{line}.owner")))
    }

    /// Mark `line` as held by this process.  Returns the record's path.
    fn record_owner(&self, line: LineId) -> Option<PathBuf> {
        let path = self.owner_file(line)?;
        let written = path
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|()| fs::write(&path, std::process::id().to_string()));
        match written {
            Ok(()) => Some(path),
            Err(e) => {
                warn!("GPIO {}: owner record {} not written: {}", line, path.display(), e);
                None
            }
        }
    }

    /// Export `line` and set its direction.  Returns the line directory.
    fn export(&self, line: LineId, direction: &str) -> Result<PathBuf, GpioError> {
        match fs::write(self.root.join("export"), line.to_string()) {
            Ok(()) => {}
            Err(e) if e.raw_os_error() == Some(EBUSY) => return Err(GpioError::Busy),
            Err(e) => {
                warn!("GPIO {}: export failed: {}", line, e);
                return Err(GpioError::Unavailable);
            }
        }

        let dir = self.line_dir(line);
        let deadline = Instant::now() + EXPORT_TIMEOUT;
        while !dir.is_dir() {
            if Instant::now() >= deadline {
                warn!("GPIO {}: {} never appeared", line, dir.display());
                return Err(GpioError::Unavailable);
            }
            std::thread::sleep(Duration::from_millis(5));
        }

        // udev may still be fixing permissions on the fresh attributes.
        let mut attempts = 0;
        loop {
            match fs::write(dir.join("direction"), direction) {
                Ok(()) => break,
                Err(e) if e.kind() == io::ErrorKind::PermissionDenied && attempts < 20 => {
                    attempts += 1;
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(e) => {
                    warn!("GPIO {}: set direction '{}' failed: {}", line, direction, e);
                    let _ = unexport(&self.root, line);
                    return Err(GpioError::Unavailable);
                }
            }
        }

        debug!("GPIO {}: exported as '{}'", line, direction);
        Ok(dir)
    }
}

fn unexport(root: &Path, line: LineId) -> Result<(), GpioError> {
    fs::write(root.join("unexport"), line.to_string()).map_err(|e| {
        warn!("GPIO {}: unexport failed: {}", line, e);
        GpioError::Unavailable
    })
}

/// Unexport a claimed line and drop its owner record.
fn unclaim(root: &Path, line: LineId, owner: Option<&Path>) -> Result<(), GpioError> {
    let result = unexport(root, line);
    if let Some(path) = owner {
        if let Err(e) = fs::remove_file(path) {
            debug!("GPIO {}: owner record {}: {}", line, path.display(), e);
        }
    }
    result
}

fn process_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

fn read_level(value: &Path) -> Result<bool, GpioError> {
    let raw = fs::read_to_string(value).map_err(|_| GpioError::ReadFailed)?;
    match raw.trim() {
        "1" => Ok(true),
        "0" => Ok(false),
        _ => Err(GpioError::ReadFailed),
    }
}

impl GpioPort for SysfsGpio {
    type Input = SysfsInput;
    type Output = SysfsOutput;

    fn claim_input(&mut self, line: LineId) -> Result<SysfsInput, GpioError> {
        let dir = self.export(line, "in")?;
        Ok(SysfsInput {
            line,
            root: self.root.clone(),
            owner: self.record_owner(line),
            value: dir.join("value"),
            watcher: None,
            closed: false,
        })
    }

    fn claim_output(&mut self, line: LineId, initial_high: bool) -> Result<SysfsOutput, GpioError> {
        let direction = if initial_high { "high" } else { "low" };
        let dir = self.export(line, direction)?;
        Ok(SysfsOutput {
            line,
            root: self.root.clone(),
            owner: self.record_owner(line),
            value: dir.join("value"),
            closed: false,
        })
    }

    /// Refuses with [`GpioError::Busy`] while the recorded owner is alive.
    /// A line exported with no owner record is released with a warning.
    fn release(&mut self, line: LineId) -> Result<(), GpioError> {
        if !self.line_dir(line).is_dir() {
            return Err(GpioError::NotInitialized);
        }

        let owner = self.owner_file(line);
        let pid = owner
            .as_deref()
            .and_then(|path| fs::read_to_string(path).ok())
            .and_then(|raw| raw.trim().parse::<u32>().ok());
        match pid {
            Some(pid) if process_alive(pid) => {
                warn!("GPIO {}: held by running process {}, not releasing", line, pid);
                return Err(GpioError::Busy);
            }
            Some(pid) => debug!("GPIO {}: owner {} is gone", line, pid),
            None => warn!(
                "GPIO {}: exported with no owner record, releasing; any process using it loses it",
                line
            ),
        }
        unclaim(&self.root, line, owner.as_deref())
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

struct Watcher {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// An exported sysfs input line.
pub struct SysfsInput {
    line: LineId,
    root: PathBuf,
    owner: Option<PathBuf>,
    value: PathBuf,
    watcher: Option<Watcher>,
    closed: bool,
}

impl ErrorType for SysfsInput {
    type Error = GpioError;
}

impl InputPin for SysfsInput {
    fn is_high(&mut self) -> Result<bool, GpioError> {
        if self.closed {
            return Err(GpioError::Closed);
        }
        read_level(&self.value)
    }

    fn is_low(&mut self) -> Result<bool, GpioError> {
        self.is_high().map(|high| !high)
    }
}

impl SenseInput for SysfsInput {
    fn on_rising_edge(&mut self, mut handler: EdgeHandler) -> Result<(), GpioError> {
        if self.closed || self.watcher.is_some() {
            return Err(GpioError::EdgeSetupFailed);
        }

        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let value = self.value.clone();
        let name = format!("gpio{}-edge", self.line);

        let handle = spawn_named(&name, WATCHER_STACK_KB, move || {
            let mut last = read_level(&value).unwrap_or(false);
            while !stop_flag.load(Ordering::Acquire) {
                // A torn or failed read keeps the previous level.
                if let Ok(level) = read_level(&value) {
                    if level && !last {
                        handler();
                    }
                    last = level;
                }
                std::thread::sleep(EDGE_SAMPLE_PERIOD);
            }
        })
        .map_err(|e| {
            warn!("GPIO {}: edge watcher spawn failed: {}", self.line, e);
            GpioError::EdgeSetupFailed
        })?;

        self.watcher = Some(Watcher { stop, handle });
        Ok(())
    }

    fn close(&mut self) -> Result<(), GpioError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if let Some(w) = self.watcher.take() {
            w.stop.store(true, Ordering::Release);
            if w.handle.join().is_err() {
                warn!("GPIO {}: edge handler panicked", self.line);
            }
        }
        unclaim(&self.root, self.line, self.owner.as_deref())
    }
}

impl Drop for SysfsInput {
    fn drop(&mut self) {
        let _ = SenseInput::close(self);
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// An exported sysfs output line.
pub struct SysfsOutput {
    line: LineId,
    root: PathBuf,
    owner: Option<PathBuf>,
    value: PathBuf,
    closed: bool,
}

impl SysfsOutput {
    fn write(&mut self, high: bool) -> Result<(), GpioError> {
        if self.closed {
            return Err(GpioError::Closed);
        }
        fs::write(&self.value, if high { "1" } else { "0" }).map_err(|e| {
            debug!("GPIO {}: write failed: {}", self.line, e);
            GpioError::WriteFailed
        })
    }
}

impl ErrorType for SysfsOutput {
    type Error = GpioError;
}

impl OutputPin for SysfsOutput {
    fn set_low(&mut self) -> Result<(), GpioError> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), GpioError> {
        self.write(true)
    }
}

impl SwitchOutput for SysfsOutput {
    fn close(&mut self) -> Result<(), GpioError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        unclaim(&self.root, self.line, self.owner.as_deref())
    }
}

impl Drop for SysfsOutput {
    fn drop(&mut self) {
        let _ = SwitchOutput::close(self);
    }
}
