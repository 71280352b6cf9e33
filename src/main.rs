use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::debug;
use uart_selftest::config::{Config, ConfigLoader};
use uart_selftest::error::AppError;
use uart_selftest::logging;
use uart_selftest::platform::{PlatformId, SysfsProbe};
use uart_selftest::selftest::{GateMode, RunOptions, STATUS_FAILURE};

/// Join bound for unattended runs when the configuration sets none.
const UNATTENDED_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    version,
    about = "UART self-test for ARTIK 5 and ARTIK 10 development boards.",
    long_about = "Runs a loopback test (wire TX to RX on the board's test UART first) and a \
                  blocking-wait cancellation test. With no arguments the cancellation test \
                  waits for the space key before cancelling."
)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Cancel as soon as the rx worker is waiting instead of waiting for the space key.
    #[arg(short, long)]
    unattended: bool,

    /// Assume this platform instead of detecting it (artik5, artik10).
    #[arg(long)]
    platform: Option<String>,

    /// Only run the loopback test.
    #[arg(long, conflicts_with = "cancel_only")]
    loopback_only: bool,

    /// Only run the cancellation test.
    #[arg(long)]
    cancel_only: bool,

    /// List the serial ports visible to the OS and exit.
    #[arg(long)]
    list_ports: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("uart-selftest: {e}");
            ExitCode::from(STATUS_FAILURE as u8)
        }
    }
}

async fn run(args: Args) -> Result<ExitCode, AppError> {
    let loader = match &args.config {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    let config_path = loader.config_path.clone();
    let config = loader.into_config();

    logging::init(&config.logging, args.verbose)?;
    debug!(?config_path, "configuration loaded");

    if args.list_ports {
        list_ports()?;
        return Ok(ExitCode::SUCCESS);
    }

    let forced = args
        .platform
        .as_deref()
        .map(PlatformId::from_model)
        .or_else(|| config.platform.forced());
    let probe = SysfsProbe::new(&config.platform.model_path, &config.platform.cpuinfo_path)
        .with_forced(forced);

    let gate = if args.unattended {
        GateMode::Ready
    } else {
        config.testing.gate
    };
    let join_timeout = config
        .testing
        .cancel_timeout()
        .or((gate == GateMode::Ready).then_some(UNATTENDED_JOIN_TIMEOUT));
    let options = RunOptions {
        gate,
        join_timeout,
        loopback: !args.cancel_only,
        cancel: !args.loopback_only,
    };

    run_selftest(probe, &config, options).await
}

#[cfg(unix)]
async fn run_selftest(
    probe: SysfsProbe,
    config: &Config,
    options: RunOptions,
) -> Result<ExitCode, AppError> {
    use uart_selftest::port::TtySerialDriver;
    use uart_selftest::selftest::SelfTest;

    let driver = TtySerialDriver::new(config.ports.devices.clone(), config.testing.read_timeout());
    let report = SelfTest::new(probe, driver, options).run().await;
    debug!(?report, "self-test finished");
    Ok(report.exit_code())
}

#[cfg(not(unix))]
async fn run_selftest(
    _probe: SysfsProbe,
    _config: &Config,
    _options: RunOptions,
) -> Result<ExitCode, AppError> {
    Err(AppError::Unsupported("tty serial driver"))
}

fn list_ports() -> Result<(), AppError> {
    let ports = serialport::available_ports()?;
    if ports.is_empty() {
        println!("No serial ports detected on this system");
        return Ok(());
    }

    println!("Available serial ports ({}):", ports.len());
    for (idx, port) in ports.iter().enumerate() {
        let kind = match &port.port_type {
            serialport::SerialPortType::UsbPort(usb) => {
                format!("USB {:04x}:{:04x}", usb.vid, usb.pid)
            }
            serialport::SerialPortType::BluetoothPort => "Bluetooth".to_string(),
            serialport::SerialPortType::PciPort => "PCI".to_string(),
            serialport::SerialPortType::Unknown => "Unknown".to_string(),
        };
        println!("  {}. {} ({})", idx + 1, port.port_name, kind);
    }
    Ok(())
}
