//! pcpower operator entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  SysfsGpio     StatusFile     JsonConfigFile   LogEventSink  │
//! │  (GpioPort)    (StatusStore)  (ConfigPort)     (EventSink)   │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ─────────────────      │
//! │                                                              │
//! │  ┌───────────────────┐    status file    ┌────────────────┐  │
//! │  │  StatusMonitor    │ ───────────────▶  │ PowerController│  │
//! │  │  (single writer)  │                   │ (gated presses)│  │
//! │  └───────────────────┘                   └────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! `shell` runs both halves in one process.  `monitor` runs the writer
//! alone so that one-shot `on` / `off` / `reboot` invocations from other
//! processes can read its record.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::mpsc::{self, Sender};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info, warn};

use pcpower::adapters::config_file::JsonConfigFile;
use pcpower::adapters::log_sink::LogEventSink;
use pcpower::adapters::status_file::StatusFile;
use pcpower::adapters::sysfs_gpio::{SysfsGpio, SysfsOutput};
use pcpower::app::ports::{ConfigError, ConfigPort, StatusStore};
use pcpower::config::SystemConfig;
use pcpower::drivers::worker::spawn_named;
use pcpower::{CommandResult, PowerCommand, PowerController, StatusMonitor, StatusRecord};

const DEFAULT_CONFIG: &str = "/etc/pcpower/config.json";

const STDIN_READER: &str = "pcpower-stdin";
const STDIN_READER_STACK_KB: usize = 64;

#[derive(Parser)]
#[command(name = "pcpower")]
#[command(version, about = "Out-of-band PC power control through relay-pulsed front-panel buttons", long_about = None)]
struct Cli {
    /// JSON config file (defaults are used when it does not exist)
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_CONFIG, global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run monitor and controller with an interactive prompt
    Shell,
    /// Run only the status monitor until `quit` or end of input
    Monitor {
        /// Never read stdin; run until SIGTERM / SIGINT
        #[arg(long)]
        daemon: bool,
    },
    /// Short press on the power button (requires Powered Off)
    On,
    /// Long press on the power button (requires Powered On)
    Off,
    /// Press the reset button (requires Powered On)
    Reboot,
    /// Print the shared status record
    Status,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(cli.config)?;
    info!(
        "pcpower v{} | power=GPIO{} reboot=GPIO{} status=GPIO{} buzzer=GPIO{}",
        env!("CARGO_PKG_VERSION"),
        config.power_switch_gpio,
        config.reboot_switch_gpio,
        config.power_status_gpio,
        config.buzzer_gpio,
    );

    match cli.command {
        Command::Shell => shell(&config),
        Command::Monitor { daemon } => monitor(&config, daemon),
        Command::On => one_shot(&config, PowerCommand::PowerOn),
        Command::Off => one_shot(&config, PowerCommand::PowerOff),
        Command::Reboot => one_shot(&config, PowerCommand::Reboot),
        Command::Status => {
            print_status(&StatusFile::new(&config.status_file).read());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_config(path: PathBuf) -> Result<SystemConfig> {
    let file = JsonConfigFile::new(path);
    match file.load() {
        Ok(config) => Ok(config),
        Err(ConfigError::NotFound) => {
            warn!("{} not found, using defaults", file.path().display());
            Ok(SystemConfig::default())
        }
        Err(e) => Err(e).with_context(|| format!("loading {}", file.path().display())),
    }
}

fn store(config: &SystemConfig) -> Arc<dyn StatusStore> {
    Arc::new(StatusFile::new(&config.status_file))
}

/// Line ownership records live next to the status record.
fn gpio(config: &SystemConfig) -> SysfsGpio {
    let gpio = SysfsGpio::new(&config.gpio_root);
    match config.status_file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => gpio.with_owner_dir(dir),
        _ => gpio,
    }
}

// ── Main-thread wake-ups ─────────────────────────────────────

/// What the main thread waits on between commands.
enum Input {
    Line(String),
    Closed,
    /// SIGINT, SIGTERM or SIGHUP.
    Terminate,
}

/// Route termination signals into `tx`.  With a controller, the handler
/// also shuts it down directly, which cuts a press on the main thread
/// short and leaves the relay open.
fn on_terminate(
    tx: &Sender<Input>,
    controller: Option<Arc<PowerController<SysfsOutput>>>,
) -> Result<()> {
    let tx = tx.clone();
    ctrlc::set_handler(move || {
        info!("termination signal received, shutting down");
        if let Some(controller) = &controller {
            controller.shutdown();
        }
        let _ = tx.send(Input::Terminate);
    })
    .context("installing signal handler")
}

/// Forward stdin lines into `tx` from a named reader thread, so the main
/// thread can also be woken by a signal.
fn read_stdin(tx: &Sender<Input>) -> Result<()> {
    let tx = tx.clone();
    spawn_named(STDIN_READER, STDIN_READER_STACK_KB, move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(Input::Line(line)).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    warn!("stdin: {}", e);
                    break;
                }
            }
        }
        let _ = tx.send(Input::Closed);
    })
    .context("spawning stdin reader")?;
    Ok(())
}

// ── Subcommands ──────────────────────────────────────────────

fn shell(config: &SystemConfig) -> Result<ExitCode> {
    let store = store(config);
    let mut gpio = gpio(config);
    let (tx, rx) = mpsc::channel();

    let mut monitor = StatusMonitor::start(
        &mut gpio,
        config,
        store.clone(),
        Arc::new(LogEventSink::monitor()),
    )
    .context("starting status monitor")?;
    let controller = Arc::new(
        PowerController::new(
            &mut gpio,
            config,
            store.clone(),
            Arc::new(LogEventSink::controller()),
        )
        .context("starting power controller")?,
    );
    on_terminate(&tx, Some(controller.clone()))?;
    read_stdin(&tx)?;

    print_help();
    prompt();
    while let Ok(Input::Line(line)) = rx.recv() {
        match line.trim() {
            "" => {}
            "on" => print_result(&controller.power_on()),
            "off" => print_result(&controller.power_off()),
            "reboot" => print_result(&controller.reboot()),
            "status" => print_status(&store.read()),
            "help" => print_help(),
            "quit" | "exit" => break,
            other => println!("unknown command '{}'; type 'help'", other),
        }
        prompt();
    }

    controller.shutdown();
    monitor.shutdown();
    Ok(ExitCode::SUCCESS)
}

fn monitor(config: &SystemConfig, daemon: bool) -> Result<ExitCode> {
    let (tx, rx) = mpsc::channel();
    // Installed first: the record must not outlive a signal that lands
    // right after it is created.
    on_terminate(&tx, None)?;
    if !daemon {
        read_stdin(&tx)?;
    }

    let mut gpio = gpio(config);
    let mut monitor = StatusMonitor::start(
        &mut gpio,
        config,
        store(config),
        Arc::new(LogEventSink::monitor()),
    )
    .context("starting status monitor")?;

    loop {
        match rx.recv() {
            Ok(Input::Line(line)) if matches!(line.trim(), "quit" | "exit") => break,
            Ok(Input::Line(_)) => {}
            Ok(Input::Closed | Input::Terminate) | Err(_) => break,
        }
    }

    monitor.shutdown();
    Ok(ExitCode::SUCCESS)
}

fn one_shot(config: &SystemConfig, command: PowerCommand) -> Result<ExitCode> {
    let (tx, _rx) = mpsc::channel();
    let mut gpio = gpio(config);
    let controller = Arc::new(
        PowerController::new(
            &mut gpio,
            config,
            store(config),
            Arc::new(LogEventSink::controller()),
        )
        .context("starting power controller")?,
    );
    on_terminate(&tx, Some(controller.clone()))?;

    let result = controller.execute(command);
    controller.shutdown();
    print_result(&result);
    Ok(if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

// ── Output ───────────────────────────────────────────────────

fn print_result(result: &CommandResult) {
    println!("{}", result.to_json());
}

fn print_status(record: &StatusRecord) {
    let json = serde_json::json!({
        "status": record.status.as_str(),
        "code": record.status.code(),
        "buzzer_pulse_count": record.buzzer_pulse_count,
    });
    println!("{}", json);
}

fn print_help() {
    println!("commands: on | off | reboot | status | help | quit");
}

fn prompt() {
    print!("pcpower> ");
    let _ = io::stdout().flush();
}
