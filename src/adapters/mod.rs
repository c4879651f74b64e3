//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements  | Connects to                 |
//! |---------------|-------------|-----------------------------|
//! | `sysfs_gpio`  | GpioPort    | Linux `/sys/class/gpio`     |
//! | `status_file` | StatusStore | Shared record file in /run  |
//! | `config_file` | ConfigPort  | JSON config file            |
//! | `log_sink`    | EventSink   | `log` facade                |

pub mod config_file;
pub mod log_sink;
pub mod status_file;
pub mod sysfs_gpio;
