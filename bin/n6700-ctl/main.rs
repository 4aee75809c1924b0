use agilent_n6700::config::{AppConfig, load_config, load_config_or_default};
use agilent_n6700::{
    Attribute, Channel, DisplayMode, MeasurementKind, MockTransport, N6700, ScpiTransport,
    TcpTransport,
};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{LevelFilter, info};
use std::path::PathBuf;

/// Command-line control of an Agilent N6700 modular power system
#[derive(Parser, Debug)]
#[command(name = "n6700-ctl")]
#[command(
    about = "Query and program N6700 power supply channels",
    long_about = None
)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Run against a simulated mainframe
    #[arg(long)]
    simulate: bool,

    /// Override the instrument host
    #[arg(long)]
    host: Option<String>,

    /// Override the SCPI port
    #[arg(long)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show every property of one or all channels
    Status {
        channel: Option<Channel>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Read one property
    Get { channel: Channel, attribute: Attribute },
    /// Write one property
    Set {
        channel: Channel,
        attribute: Attribute,
        value: String,
    },
    /// Switch outputs on together
    Enable {
        #[arg(required = true)]
        channels: Vec<Channel>,
    },
    /// Switch outputs off together
    Disable {
        #[arg(required = true)]
        channels: Vec<Channel>,
    },
    /// Couple the enable state of channels
    Couple {
        #[arg(required = true)]
        channels: Vec<Channel>,
    },
    /// Remove all output coupling
    Decouple,
    /// Select the front-panel meter view
    Display {
        mode: DisplayMode,
        #[arg(default_value = "0")]
        channel: Channel,
    },
    /// Measure at the output terminals
    Measure { channel: Channel, kind: MeasurementKind },
    /// Clear a latched protection fault
    ClearProtection { channel: Channel },
    /// Arm the transient system (all channels when none given)
    Initiate { channels: Vec<Channel> },
    /// Send a bus trigger
    Trigger,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => load_config(Some(path))?,
        None => load_config_or_default(None),
    };
    apply_overrides(&mut config, &args);

    let log_level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    initialize_logging(&log_level)?;

    let mut psu = open_driver(&config)?;
    run(&mut psu, args.command)?;
    Ok(())
}

fn apply_overrides(config: &mut AppConfig, args: &Args) {
    if args.simulate {
        config.connection.simulate = true;
    }
    if let Some(host) = &args.host {
        config.connection.host = host.clone();
    }
    if let Some(port) = args.port {
        config.connection.port = port;
    }
}

fn open_driver(
    config: &AppConfig,
) -> Result<N6700<Box<dyn ScpiTransport>>, Box<dyn std::error::Error>> {
    let table = config.module_table();

    if config.connection.simulate {
        let specs = config.simulated_specs(&table)?;
        info!("Simulating a mainframe with {} channels", specs.len());
        let transport: Box<dyn ScpiTransport> = Box::new(MockTransport::new());
        return Ok(N6700::simulated(transport, specs));
    }

    info!(
        "Connecting to {}:{}",
        config.connection.host, config.connection.port
    );
    let transport = TcpTransport::builder()
        .address(&config.connection.host)
        .port(config.connection.port)
        .config(config.connection_config())
        .build()?;
    let transport: Box<dyn ScpiTransport> = Box::new(transport);
    Ok(N6700::connect(transport, &table)?)
}

fn run(
    psu: &mut N6700<Box<dyn ScpiTransport>>,
    command: Command,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Status { channel, json } => {
            let channels = match channel {
                Some(channel) => vec![psu.resolve_channel(channel)?],
                None => (0..psu.channel_count()).collect(),
            };
            let mut statuses = Vec::with_capacity(channels.len());
            for index in channels {
                statuses.push(psu.channel_status(index)?);
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&statuses)?);
            } else {
                for status in &statuses {
                    println!("{} (max {} V)", status.name, status.voltage_max);
                    for (name, value) in &status.properties {
                        println!("  {name:<24} {value}");
                    }
                }
            }
        }
        Command::Get { channel, attribute } => {
            println!("{}", psu.get_property(channel, attribute)?);
        }
        Command::Set {
            channel,
            attribute,
            value,
        } => psu.set_property(channel, attribute, &value)?,
        Command::Enable { channels } => psu.set_outputs_enabled(true, channels)?,
        Command::Disable { channels } => psu.set_outputs_enabled(false, channels)?,
        Command::Couple { channels } => psu.set_channel_coupling(true, channels)?,
        Command::Decouple => psu.set_channel_coupling(false, Vec::<Channel>::new())?,
        Command::Display { mode, channel } => psu.set_display_mode(mode, channel)?,
        Command::Measure { channel, kind } => {
            let value = psu.measure(channel, kind)?;
            if psu.is_simulating() {
                println!("{value} (simulated)");
            } else {
                println!("{value}");
            }
        }
        Command::ClearProtection { channel } => psu.reset_output_protection(channel)?,
        Command::Initiate { channels } if channels.is_empty() => psu.trigger_initiate_all()?,
        Command::Initiate { channels } => psu.trigger_initiate(channels)?,
        Command::Trigger => psu.send_software_trigger()?,
    }
    Ok(())
}

fn initialize_logging(log_level: &str) -> Result<(), Box<dyn std::error::Error>> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => {
            eprintln!("Warning: Invalid log level '{}', using 'info'", log_level);
            LevelFilter::Info
        }
    };

    env_logger::Builder::from_env(Env::default())
        .filter_level(level)
        .format_timestamp_millis()
        .init();

    Ok(())
}
