//! NDR radio command-line tool
//!
//! Connects to one radio (or an in-process virtual radio), runs a single
//! command and prints the result as JSON on stdout. Failures exit non-zero
//! with the collected error text on stderr.

mod logging;
mod settings;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use ndr_driver::{ConfigurationTree, RadioHandler};
use ndr_protocol::models::ComponentKind;
use ndr_protocol::RadioDatabase;
use ndr_sim::VirtualRadio;
use ndr_transport::serial::DEFAULT_BAUD_RATE;
use ndr_transport::{ConnectionMode, PortScanner};
use serde_json::{json, Value};
use tracing::{debug, info};

use settings::{LinkMode, Settings};

#[derive(Debug, Parser)]
#[command(name = "ndr", version, about = "Configure NDR software-defined radios")]
struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Radio model, e.g. NDR308
    #[arg(long)]
    model: Option<String>,

    /// How to reach the radio
    #[arg(long, value_enum)]
    mode: Option<LinkMode>,

    /// Host name, address or serial device
    #[arg(long)]
    host: Option<String>,

    /// Port, or baud rate for serial links
    #[arg(long)]
    port: Option<u32>,

    /// Reply timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Log wire traffic
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(flatten)]
    Radio(RadioCommand),
    /// List serial ports
    Ports,
    /// List known radio models
    Models,
    /// Write the effective link settings to the settings file
    Save,
}

/// Commands that talk to a radio
#[derive(Debug, Subcommand)]
enum RadioCommand {
    /// Print identification and version strings
    Version,
    /// Print radio health
    Status,
    /// Query every component and print the configuration tree
    Query,
    /// Print the configuration tree, querying only what is not cached
    Get,
    /// Apply a configuration tree given as JSON (or @file)
    Set { json: String },
    /// Reset the radio
    Reset {
        #[arg(long)]
        reset_type: Option<i64>,
    },
    /// Send one raw command line and print the reply lines
    Raw { line: String },
}

/// What a command produced
struct Report {
    output: Value,
    errors: Vec<String>,
}

impl Report {
    fn ok(output: Value) -> Self {
        Self {
            output,
            errors: Vec::new(),
        }
    }

    fn from_radio(output: Value, radio: &RadioHandler) -> Self {
        Self {
            output,
            errors: radio.get_last_command_error_info().to_vec(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match &cli.settings {
        Some(path) => match Settings::load_from(path) {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => Settings::load(),
    };

    let level = if cli.verbose { "debug" } else { settings.log_level.as_str() };
    let recent = match logging::init(level, settings.log_file.as_deref()) {
        Ok(recent) => recent,
        Err(e) => {
            eprintln!("error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&cli, &settings) {
        Ok(report) => {
            match serde_json::to_string_pretty(&report.output) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("error: {}", e);
                    return ExitCode::FAILURE;
                }
            }
            if report.errors.is_empty() {
                ExitCode::SUCCESS
            } else {
                for error in &report.errors {
                    eprintln!("error: {}", error);
                }
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("error: {:#}", e);
            for line in recent.lines() {
                eprintln!("  {}", line);
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, settings: &Settings) -> anyhow::Result<Report> {
    match &cli.command {
        Command::Models => Ok(Report::ok(list_models())),
        Command::Ports => {
            let ports = PortScanner::new()
                .enumerate_ports()
                .context("Failed to list serial ports")?;
            Ok(Report::ok(serde_json::to_value(ports)?))
        }
        Command::Save => {
            let effective = effective_settings(cli, settings);
            match &cli.settings {
                Some(path) => effective.save_to(path),
                None => effective.save(),
            }
            .map_err(anyhow::Error::msg)?;
            Ok(Report::ok(serde_json::to_value(&effective)?))
        }
        Command::Radio(command) => {
            let mut radio = connect(cli, settings)?;
            let report = run_radio(command, &mut radio);
            radio.disconnect();
            report
        }
    }
}

fn run_radio(command: &RadioCommand, radio: &mut RadioHandler) -> anyhow::Result<Report> {
    let report = match command {
        RadioCommand::Version => {
            let info = radio.get_version_info();
            Report::from_radio(serde_json::to_value(info)?, radio)
        }
        RadioCommand::Status => {
            let status = radio.get_status();
            Report::from_radio(serde_json::to_value(status)?, radio)
        }
        RadioCommand::Query => {
            let tree = radio.query_configuration();
            Report::from_radio(serde_json::to_value(tree)?, radio)
        }
        RadioCommand::Get => {
            let tree = radio.get_configuration();
            Report::from_radio(serde_json::to_value(tree)?, radio)
        }
        RadioCommand::Set { json } => {
            let tree = parse_tree(json)?;
            let success = radio.set_configuration(&tree);
            Report::from_radio(json!({ "success": success }), radio)
        }
        RadioCommand::Reset { reset_type } => {
            let success = radio.reset(*reset_type);
            Report::from_radio(json!({ "success": success }), radio)
        }
        RadioCommand::Raw { line } => {
            let lines = radio.send_command(line)?;
            Report::ok(json!(lines))
        }
    };
    Ok(report)
}

/// Settings with the command-line flags applied
fn effective_settings(cli: &Cli, settings: &Settings) -> Settings {
    let mut effective = settings.clone();
    if let Some(model) = &cli.model {
        effective.model = model.clone();
    }
    if let Some(host) = &cli.host {
        effective.host = host.clone();
    }
    effective.mode = cli.mode.or(settings.mode);
    effective.port = cli.port.or(settings.port);
    effective.timeout_ms = cli.timeout_ms.unwrap_or(settings.timeout_ms);
    effective
}

/// Open the radio named by flags and settings
fn connect(cli: &Cli, settings: &Settings) -> anyhow::Result<RadioHandler> {
    let model = cli.model.as_deref().unwrap_or(&settings.model);
    let mut radio = RadioHandler::for_model(model)?;
    radio.set_timeout(Duration::from_millis(
        cli.timeout_ms.unwrap_or(settings.timeout_ms),
    ));

    let mode = cli
        .mode
        .or(settings.mode)
        .unwrap_or_else(|| LinkMode::from(radio.default_mode()));

    let connected = match mode.connection_mode() {
        None => {
            info!("Using virtual {}", radio.model().name);
            let sim = VirtualRadio::new(radio.model().clone());
            radio.connect_with(Box::new(sim))
        }
        Some(connection) => {
            let host = cli.host.as_deref().unwrap_or(&settings.host);
            let port = cli
                .port
                .or(settings.port)
                .unwrap_or_else(|| default_port(&radio, connection));
            debug!("Connecting to {} at {}:{} over {}", model, host, port, connection);
            radio.connect(connection, host, port)
        }
    };

    if !connected {
        bail!(
            "could not connect to {}: {}",
            model,
            radio.last_error().unwrap_or("unknown error")
        );
    }
    Ok(radio)
}

fn default_port(radio: &RadioHandler, connection: ConnectionMode) -> u32 {
    if connection == ConnectionMode::Serial && radio.default_mode() != ConnectionMode::Serial {
        DEFAULT_BAUD_RATE
    } else {
        radio.default_port()
    }
}

/// Parse a tree given inline or as `@path`
fn parse_tree(arg: &str) -> anyhow::Result<ConfigurationTree> {
    let text = match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path))?,
        None => arg.to_string(),
    };
    serde_json::from_str(&text).context("Invalid configuration tree")
}

fn list_models() -> Value {
    let kinds = [
        ComponentKind::Tuner,
        ComponentKind::Wbddc,
        ComponentKind::Nbddc,
        ComponentKind::Wbduc,
        ComponentKind::WbddcGroup,
        ComponentKind::NbddcGroup,
        ComponentKind::GigePort,
    ];
    RadioDatabase::all()
        .map(|model| {
            let counts: serde_json::Map<String, Value> = kinds
                .iter()
                .filter(|kind| model.count(**kind) > 0)
                .map(|kind| (kind.name().to_string(), json!(model.count(*kind))))
                .collect();
            json!({
                "name": model.name,
                "protocol": model.protocol.name(),
                "components": counts,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sim_cli(command: RadioCommand) -> Cli {
        Cli {
            settings: None,
            model: Some("NDR308".to_string()),
            mode: Some(LinkMode::Sim),
            host: None,
            port: None,
            timeout_ms: None,
            verbose: false,
            command: Command::Radio(command),
        }
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::try_parse_from([
            "ndr", "--model", "NDR358", "--mode", "udp", "--port", "19091", "get",
        ])
        .unwrap();
        assert_eq!(cli.model.as_deref(), Some("NDR358"));
        assert_eq!(cli.mode, Some(LinkMode::Udp));
        assert!(matches!(cli.command, Command::Radio(RadioCommand::Get)));
    }

    #[test]
    fn test_models_listing() {
        let models = list_models();
        let names: Vec<&str> = models
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|m| m["name"].as_str())
            .collect();
        assert!(names.contains(&"NDR308"));
        assert!(names.contains(&"NDR551"));
    }

    #[test]
    fn test_set_against_virtual_radio() {
        let cli = sim_cli(RadioCommand::Set {
            json: r#"{"tunerConfiguration": {"1": {"frequency": 1000000000.0}}}"#.to_string(),
        });
        let report = run(&cli, &Settings::default()).unwrap();
        assert_eq!(report.output, json!({"success": true}));
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_version_against_virtual_radio() {
        let report = run(&sim_cli(RadioCommand::Version), &Settings::default()).unwrap();
        assert_eq!(report.output["model"], "NDR308");
        assert_eq!(report.output["serialNumber"], "SIM0001");
    }

    #[test]
    fn test_missing_component_is_an_error() {
        let cli = sim_cli(RadioCommand::Set {
            json: r#"{"tunerConfiguration": {"12": {"frequency": 1.0}}}"#.to_string(),
        });
        let report = run(&cli, &Settings::default()).unwrap();
        assert_eq!(report.output, json!({"success": false}));
        assert_eq!(report.errors, vec!["no tuner at index 12".to_string()]);
    }

    #[test]
    fn test_save_writes_effective_settings() {
        let path = std::env::temp_dir()
            .join(format!("ndr-cli-{}", std::process::id()))
            .join("settings.json");
        let mut cli = sim_cli(RadioCommand::Get);
        cli.settings = Some(path.clone());
        cli.port = Some(8617);
        cli.command = Command::Save;
        run(&cli, &Settings::default()).unwrap();

        let saved = Settings::load_from(&path).unwrap();
        assert_eq!(saved.mode, Some(LinkMode::Sim));
        assert_eq!(saved.port, Some(8617));
        assert_eq!(saved.host, "192.168.0.10");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_bad_tree_rejected() {
        assert!(parse_tree("{not json").is_err());
        assert!(parse_tree(r#"{"referenceMode": 1}"#).is_ok());
    }

    #[test]
    fn test_unknown_model_fails() {
        let mut cli = sim_cli(RadioCommand::Get);
        cli.model = Some("NDR000".to_string());
        let err = run(&cli, &Settings::default()).err().unwrap();
        assert!(err.to_string().contains("unknown radio model"));
    }
}
