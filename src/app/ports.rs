//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ StatusMonitor / PowerController (domain)
//! ```
//!
//! Driven adapters (GPIO lines, the status store, event sinks, config
//! storage) implement these traits.  The monitor and controller consume
//! them via generics or trait objects, so the domain core never touches a
//! GPIO register or a file path directly.
//!
//! ## Contracts
//!
//! - **StatusStore** writes MUST be atomic: a concurrent reader sees either
//!   the old record or the new one, never a mix.
//! - **SenseInput** edge handlers are installed once and stay installed
//!   until the line is closed.
//! - All port errors are typed; callers handle every variant explicitly.

use crate::config::SystemConfig;
use crate::error::GpioError;
use crate::status::StatusRecord;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

/// Platform GPIO line number.
pub type LineId = u32;

/// Callback invoked once per rising edge, from the input's own context.
pub type EdgeHandler = Box<dyn FnMut() + Send + 'static>;

// ───────────────────────────────────────────────────────────────
// Line ports (driven adapter: hardware ↔ domain)
// ───────────────────────────────────────────────────────────────

/// A claimed digital input with rising-edge detection.
pub trait SenseInput: InputPin + ErrorType<Error = GpioError> + Send {
    /// Install the rising-edge handler.  A second registration is rejected
    /// with [`GpioError::EdgeSetupFailed`].
    fn on_rising_edge(&mut self, handler: EdgeHandler) -> Result<(), GpioError>;

    /// Remove any edge handler and release the line.
    fn close(&mut self) -> Result<(), GpioError>;
}

/// A claimed digital output driving a relay coil.
pub trait SwitchOutput: OutputPin + ErrorType<Error = GpioError> + Send {
    /// Release the line.
    fn close(&mut self) -> Result<(), GpioError>;
}

/// Claims and releases lines.
pub trait GpioPort {
    type Input: SenseInput + 'static;
    type Output: SwitchOutput + 'static;

    /// Claim `line` as an input.
    fn claim_input(&mut self, line: LineId) -> Result<Self::Input, GpioError>;

    /// Claim `line` as an output, driven to `initial_high` as it is claimed.
    fn claim_output(&mut self, line: LineId, initial_high: bool)
    -> Result<Self::Output, GpioError>;

    /// Release a line left claimed by an unclean previous run.
    /// Returns [`GpioError::NotInitialized`] when nothing held it.
    fn release(&mut self, line: LineId) -> Result<(), GpioError>;
}

// ───────────────────────────────────────────────────────────────
// Status store port (driven adapter: domain ↔ shared record)
// ───────────────────────────────────────────────────────────────

/// The shared "last known power state" record.
///
/// Exactly one writer (the monitor) at a time; any number of readers, in
/// any process.
pub trait StatusStore: Send + Sync {
    /// Read the record, reporting why it is unavailable.
    fn try_read(&self) -> Result<StatusRecord, StoreError>;

    /// Replace the record atomically.
    fn write(&self, record: &StatusRecord) -> Result<(), StoreError>;

    /// Create the backing storage holding the initial record.
    fn initialize(&self) -> Result<(), StoreError>;

    /// Remove the backing storage.  `Ok(())` if it was already gone.
    fn destroy(&self) -> Result<(), StoreError>;

    /// Read the record; missing or corrupt storage reads as the default
    /// `{Unknown, 0}` record.
    fn read(&self) -> StatusRecord {
        match self.try_read() {
            Ok(record) => record,
            Err(e) => {
                log::debug!("status store unavailable ({}), reporting Unknown", e);
                StatusRecord::default()
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// Each component emits structured [`AppEvent`](super::events::AppEvent)s
/// through its own injected sink.  Adapters decide where they go.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate config values before persisting and after
/// loading.  Invalid values are rejected with
/// [`ConfigError::ValidationFailed`], not silently clamped.
pub trait ConfigPort {
    /// Load configuration.  [`ConfigError::NotFound`] if none is stored.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// No config file present.
    NotFound,
    /// Stored config failed to parse.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StatusStore`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// No record exists (monitor not running).
    NotFound,
    /// The record failed its integrity / deserialization check.
    Corrupted,
    /// Underlying I/O error.
    Io(std::io::ErrorKind),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound
        } else {
            Self::Io(e.kind())
        }
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl core::fmt::Display for StoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "record not found"),
            Self::Corrupted => write!(f, "record corrupted"),
            Self::Io(kind) => write!(f, "I/O error ({})", kind),
        }
    }
}

impl std::error::Error for StoreError {}
