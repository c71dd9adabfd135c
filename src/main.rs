use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use color_eyre::Result;
use color_eyre::eyre::{WrapErr, eyre};

use sysmon_relay::appearance::Appearance;
use sysmon_relay::bridge::control::{DeviceCommand, parse_brightness};
use sysmon_relay::bridge::AdbBridge;
use sysmon_relay::config::ConfigSource;
use sysmon_relay::document::{Document, OutputFormat};
use sysmon_relay::logging::{LogFormat, init_tracing};
use sysmon_relay::publish::{Publisher, StdoutTransport};
use sysmon_relay::relay::{Relay, RelayOptions};
use sysmon_relay::system::SnapshotSource;
use sysmon_relay::system::sampler::Sampler;

#[derive(Parser)]
#[command(
    name = "sysmon-relay",
    about = "Relay host CPU/memory/GPU stats to an Android viewer over adb"
)]
struct Cli {
    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Sample and publish on an interval until interrupted (default)
    Run(RunArgs),
    /// Sample once and print the document without pushing it
    Show {
        /// Print the flat legacy layout
        #[arg(long)]
        legacy: bool,
    },
    /// Send an input command to the device
    Control {
        #[command(subcommand)]
        action: ControlAction,
    },
}

#[derive(Args, Default)]
struct RunArgs {
    /// Publish interval in milliseconds, overriding the config
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Run a single tick and exit
    #[arg(long)]
    once: bool,

    /// Print documents to stdout instead of pushing them
    #[arg(long)]
    dry_run: bool,

    /// Publish the flat legacy layout
    #[arg(long)]
    legacy: bool,
}

#[derive(Subcommand, Clone, Copy)]
enum ControlAction {
    /// Wake the screen and swipe to unlock
    ScreenOn,
    ScreenOff,
    Wake,
    /// Press the power button
    Power,
    Unlock,
    VolumeUp,
    VolumeDown,
    /// Set screen brightness (0-255, clamped)
    Brightness { level: u32 },
    /// Print the current screen brightness
    GetBrightness,
}

impl From<ControlAction> for DeviceCommand {
    fn from(action: ControlAction) -> Self {
        match action {
            ControlAction::ScreenOn => DeviceCommand::ScreenOn,
            ControlAction::ScreenOff => DeviceCommand::ScreenOff,
            ControlAction::Wake => DeviceCommand::Wake,
            ControlAction::Power => DeviceCommand::Power,
            ControlAction::Unlock => DeviceCommand::Unlock,
            ControlAction::VolumeUp => DeviceCommand::VolumeUp,
            ControlAction::VolumeDown => DeviceCommand::VolumeDown,
            ControlAction::Brightness { level } => DeviceCommand::brightness(level),
            ControlAction::GetBrightness => DeviceCommand::GetBrightness,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format)?;

    let mut config = ConfigSource::from_cli(cli.config.clone());
    match cli.command {
        None => run(config, RunArgs::default()).await,
        Some(Command::Run(args)) => run(config, args).await,
        Some(Command::Show { legacy }) => show(&mut config, legacy),
        Some(Command::Control { action }) => control(&mut config, action),
    }
}

async fn run(mut config: ConfigSource, args: RunArgs) -> Result<()> {
    if args.interval_ms == Some(0) {
        return Err(eyre!("--interval-ms must be greater than 0"));
    }

    let initial = config.load();
    let sampler = Sampler::new(&initial);
    let options = RelayOptions {
        interval: args.interval_ms.map(Duration::from_millis),
        format: args.legacy.then_some(OutputFormat::Legacy),
        max_ticks: args.once.then_some(1),
    };
    tracing::info!(
        config = %config.path().map(|p| p.display().to_string()).unwrap_or_else(|| "defaults".into()),
        target = %initial.bridge.target_path,
        "starting relay"
    );

    if args.dry_run {
        let mut relay = Relay::new(sampler, config, Publisher::new(StdoutTransport), options);
        relay.run(shutdown_signal()).await;
        return Ok(());
    }

    let bridge = AdbBridge::from_config(&initial.bridge);
    if !bridge.is_available() {
        tracing::warn!(
            program = bridge.program(),
            "bridge tool not found; pushes will fail until it is installed"
        );
    }
    let mut relay = Relay::new(sampler, config, Publisher::new(bridge), options);
    relay.run(shutdown_signal()).await;
    Ok(())
}

fn show(config: &mut ConfigSource, legacy: bool) -> Result<()> {
    let loaded = config.load();
    let mut sampler = Sampler::new(&loaded);
    let document = Document::now(sampler.sample(), Appearance::from_config(&loaded.appearance));
    let format = if legacy {
        OutputFormat::Legacy
    } else {
        OutputFormat::from_str_config(&loaded.monitoring.format)
    };
    let body = format.render(&document)?;
    println!("{body}");
    Ok(())
}

fn control(config: &mut ConfigSource, action: ControlAction) -> Result<()> {
    let loaded = config.load();
    let bridge = AdbBridge::from_config(&loaded.bridge);
    let command = DeviceCommand::from(action);
    let output = command
        .execute(&bridge)
        .wrap_err_with(|| format!("{command:?} failed"))?;

    if command == DeviceCommand::GetBrightness {
        let level = parse_brightness(&output)
            .ok_or_else(|| eyre!("device reported unexpected brightness `{output}`"))?;
        println!("{level}");
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
