//! RF Explorer command-line tool
//!
//! Lists candidate serial ports and reads the device configuration from an
//! analyzer, or from a built-in virtual analyzer with `--simulate`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use clap::{Args, Parser, Subcommand};
use rfe_session::transport::DEFAULT_BAUD_RATE;
use rfe_session::{AnalyzerSettings, ConfigSnapshot, Diagnostic, PortScanner, RfAnalyzer};
use rfe_sim::{run_virtual_analyzer_task, TaskOptions, VirtualAnalyzer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "rfe", version, about = "RF Explorer configuration reader")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List serial ports.
    Ports(PortsArgs),
    /// Read the analyzer configuration.
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
struct PortsArgs {
    /// Include ports that do not look like an analyzer.
    #[arg(long)]
    all: bool,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// Serial port the analyzer is attached to.
    #[arg(long, env = "RFE_PORT", required_unless_present_any = ["simulate", "settings"])]
    port: Option<String>,

    /// JSON settings file; command-line values take precedence.
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Serial baud rate.
    #[arg(long)]
    baud: Option<u32>,

    /// Time to wait for each line, in milliseconds.
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Bound on the whole read, in milliseconds.
    #[arg(long, value_name = "MS")]
    overall_timeout_ms: Option<u64>,

    /// Print the snapshot as JSON.
    #[arg(long)]
    json: bool,

    /// Talk to a virtual analyzer instead of a serial port.
    #[arg(long, conflicts_with_all = ["port", "settings"])]
    simulate: bool,
}

impl ConfigArgs {
    fn resolve_settings(&self) -> anyhow::Result<AnalyzerSettings> {
        let mut settings = match &self.settings {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => AnalyzerSettings::for_port(self.port.clone().unwrap_or_default()),
        };

        if let Some(port) = &self.port {
            settings.port = port.clone();
        }
        if let Some(baud) = self.baud {
            settings.baud_rate = baud;
        }
        if let Some(ms) = self.timeout_ms {
            settings.line_timeout_ms = ms;
        }
        if let Some(ms) = self.overall_timeout_ms {
            settings.overall_timeout_ms = Some(ms);
        }
        if settings.baud_rate == 0 {
            bail!("baud rate must be non-zero (the analyzer uses {DEFAULT_BAUD_RATE})");
        }
        Ok(settings)
    }
}

fn init_logging() {
    // stdout carries command output, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "rfe=info,rfe_protocol=info,rfe_session=info,rfe_sim=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();

    match cli.command {
        Command::Ports(args) => list_ports(&args),
        Command::Config(args) => read_config(&args).await,
    }
}

fn list_ports(args: &PortsArgs) -> anyhow::Result<()> {
    let scanner = PortScanner::new();
    let ports = if args.all {
        scanner.enumerate_ports()?
    } else {
        scanner.analyzer_ports()?
    };

    if ports.is_empty() {
        println!("No ports found");
    }
    for port in ports {
        let ids = match (port.vid, port.pid) {
            (Some(vid), Some(pid)) => format!("{vid:04x}:{pid:04x}"),
            _ => "-".to_string(),
        };
        let marker = if port.is_likely_analyzer() { "*" } else { " " };
        println!(
            "{marker} {:<24} {ids:<10} {}",
            port.port,
            port.product.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

async fn read_config(args: &ConfigArgs) -> anyhow::Result<()> {
    let settings = args.resolve_settings()?;

    let snapshot = if args.simulate {
        info!("Reading configuration from a virtual analyzer");
        let (client, device) = tokio::io::duplex(4096);
        let task = tokio::spawn(run_virtual_analyzer_task(
            device,
            VirtualAnalyzer::new(),
            TaskOptions {
                line_delay: Some(Duration::from_millis(5)),
            },
        ));

        let analyzer = RfAnalyzer::new(client, settings.session_config());
        let result = analyzer.read_config_until(interrupted()).await;
        drop(analyzer.close().await?);
        task.await.context("virtual analyzer task panicked")??;
        result.context("reading device configuration")?
    } else {
        let analyzer = RfAnalyzer::open_until(&settings, interrupted())
            .await
            .with_context(|| format!("reading device configuration on {}", settings.port))?;
        let snapshot = analyzer.config().await;
        analyzer.close().await?;
        snapshot.ok_or_else(|| anyhow!("no configuration stored after a successful read"))?
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_snapshot(&snapshot);
    }
    Ok(())
}

/// Completes on Ctrl-C; never completes if the handler cannot be installed
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Unable to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

fn print_snapshot(snapshot: &ConfigSnapshot) {
    let config = &snapshot.config;
    println!("{config}");

    if let Some(model) = config.main_model_kind() {
        println!("Model: {model}");
    }
    if let Some(model) = config.expansion_model_kind() {
        println!("Expansion: {model}");
    }
    if let Some(firmware) = &config.firmware {
        println!("Firmware: {firmware}");
    }
    if let Some(stage) = config.input_stage {
        println!("Input stage: {stage}");
    }
    if let Some(sweep) = &config.sweep {
        let end = match sweep.end_frequency() {
            Some(end) => end.to_string(),
            None => "?".to_string(),
        };
        println!(
            "Sweep: {} - {end} kHz, {} points, RBW {} kHz",
            sweep.start_frequency, sweep.number_points, sweep.resolution_bandwidth
        );
    }

    for diagnostic in &snapshot.diagnostics {
        match diagnostic {
            Diagnostic::PartialTransmission { discarded } => {
                println!("note: recovered a torn transmission ({discarded} bytes dropped)")
            }
            Diagnostic::FieldDecode(e) => println!("warning: {e}"),
            Diagnostic::UnrecognizedRecord {
                raw,
                invalid_text: true,
            } => println!("warning: record is not valid text: {raw:02X?}"),
            Diagnostic::UnrecognizedRecord { raw, .. } => {
                println!("note: unhandled record {:?}", String::from_utf8_lossy(raw))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_config_subcommand() {
        let cli = Cli::try_parse_from([
            "rfe",
            "config",
            "--port",
            "/dev/ttyUSB0",
            "--timeout-ms",
            "500",
            "--json",
        ])
        .expect("config args should parse");

        let Command::Config(args) = cli.command else {
            panic!("expected config subcommand");
        };
        let settings = args.resolve_settings().unwrap();
        assert_eq!(settings.port, "/dev/ttyUSB0");
        assert_eq!(settings.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(settings.line_timeout(), Duration::from_millis(500));
        assert!(args.json);
    }

    #[test]
    fn simulate_conflicts_with_port() {
        let err = Cli::try_parse_from(["rfe", "config", "--simulate", "--port", "COM3"])
            .expect_err("conflicting args should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn parses_ports_subcommand() {
        let cli = Cli::try_parse_from(["rfe", "ports", "--all"]).expect("ports args should parse");
        assert!(matches!(cli.command, Command::Ports(PortsArgs { all: true })));
    }

    #[test]
    fn rejects_zero_baud() {
        let cli = Cli::try_parse_from(["rfe", "config", "--simulate", "--baud", "0"]).unwrap();
        let Command::Config(args) = cli.command else {
            panic!("expected config subcommand");
        };
        assert!(args.resolve_settings().is_err());
    }

    #[test]
    fn prints_snapshot_with_overflowing_sweep() {
        let mut config = rfe_protocol::DeviceConfig::new();
        config.sweep = Some(rfe_protocol::SweepSettings::from_fields([
            1,
            9_999_999_999_999,
            0,
            0,
            9_999_999,
            0,
            0,
            0,
            0,
            0,
            0,
            0,
            0,
        ]));
        print_snapshot(&ConfigSnapshot {
            config,
            diagnostics: vec![Diagnostic::UnrecognizedRecord {
                raw: b"#\xFF".to_vec(),
                invalid_text: true,
            }],
        });
    }

    #[tokio::test]
    async fn simulated_read_returns_profile() {
        let cli = Cli::try_parse_from(["rfe", "config", "--simulate", "--timeout-ms", "1000"])
            .unwrap();
        let Command::Config(args) = cli.command else {
            panic!("expected config subcommand");
        };
        read_config(&args).await.unwrap();
    }
}
