//! rust_ivi command line tool
//!
//! Lists model tables and performs one-shot attribute reads and writes on
//! instruments defined in the configuration file.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use rust_ivi::attribute::Scope;
use rust_ivi::config::IviConfig;
use rust_ivi::driver::Driver;
use rust_ivi::models::ModelRegistry;
use rust_ivi::range::Quantity;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rust_ivi", version, about = "Table-driven IVI instrument drivers")]
struct Cli {
    /// Configuration file.
    #[arg(long, global = true, default_value = "config/rust_ivi.toml")]
    config: PathBuf,

    /// Simulate every instrument regardless of the configuration.
    #[arg(long, global = true)]
    simulate: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the available model tables.
    Models,
    /// Show the channels, attributes and commands of a model.
    Describe {
        /// Model name or supported instrument model.
        model: String,
        /// Print the full table as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Read an attribute.
    Get {
        /// Instrument ID from the configuration.
        instrument: String,
        /// Attribute name.
        attribute: String,
        /// Channel name or zero-based index (channel attributes only).
        #[arg(long, short, default_value = "0")]
        channel: String,
    },
    /// Write an attribute.
    Set {
        /// Instrument ID from the configuration.
        instrument: String,
        /// Attribute name.
        attribute: String,
        /// New value.
        value: String,
        /// Channel name or zero-based index (channel attributes only).
        #[arg(long, short, default_value = "0")]
        channel: String,
    },
    /// Measure voltage or current on a channel.
    Measure {
        /// Instrument ID from the configuration.
        instrument: String,
        /// `voltage` or `current`.
        quantity: Quantity,
        /// Channel name or zero-based index.
        #[arg(long, short, default_value = "0")]
        channel: String,
    },
    /// Print the instrument identity.
    Identify {
        /// Instrument ID from the configuration.
        instrument: String,
    },
    /// Transfer a scope waveform as `time,voltage` lines.
    Waveform {
        /// Instrument ID from the configuration.
        instrument: String,
        /// Channel name or zero-based index.
        #[arg(long, short, default_value = "0")]
        channel: String,
    },
    /// Transfer a spectrum analyzer trace, one amplitude per line.
    Trace {
        /// Instrument ID from the configuration.
        instrument: String,
        /// Trace name or zero-based index.
        #[arg(long, short, default_value = "0")]
        channel: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = IviConfig::load_from(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.application.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let registry = config.registry()?;

    match &cli.command {
        Command::Models => list_models(&registry),
        Command::Describe { model, json } => describe(&registry, model, *json)?,
        Command::Get {
            instrument,
            attribute,
            channel,
        } => {
            let mut driver = connect(&config, &registry, instrument, cli.simulate)?;
            let value = match scope_of(&driver, attribute)? {
                Scope::Channel => driver.get(attribute, channel_selector(channel))?,
                Scope::Instrument => driver.get_instrument(attribute)?,
            };
            println!("{value}");
        }
        Command::Set {
            instrument,
            attribute,
            value,
            channel,
        } => {
            let mut driver = connect(&config, &registry, instrument, cli.simulate)?;
            let parsed = driver
                .model()
                .attribute(attribute)
                .ok_or_else(|| anyhow!("Unknown attribute '{attribute}'"))?
                .kind
                .parse_input(attribute, value)?;
            match scope_of(&driver, attribute)? {
                Scope::Channel => driver.set(attribute, channel_selector(channel), parsed)?,
                Scope::Instrument => driver.set_instrument(attribute, parsed)?,
            }
            info!("{instrument}: {attribute} = {value}");
        }
        Command::Measure {
            instrument,
            quantity,
            channel,
        } => {
            let mut driver = connect(&config, &registry, instrument, cli.simulate)?;
            println!("{}", driver.measure(channel_selector(channel), *quantity)?);
        }
        Command::Identify { instrument } => {
            let mut driver = connect(&config, &registry, instrument, cli.simulate)?;
            let identity = driver.identity()?;
            println!("Manufacturer: {}", identity.manufacturer);
            println!("Model:        {}", identity.model);
            println!("Serial:       {}", identity.serial_number);
            println!("Firmware:     {}", identity.firmware_revision);
        }
        Command::Waveform { instrument, channel } => {
            let mut driver = connect(&config, &registry, instrument, cli.simulate)?;
            for (time, voltage) in driver.fetch_waveform(channel_selector(channel))? {
                println!("{time:e},{voltage:e}");
            }
        }
        Command::Trace { instrument, channel } => {
            let mut driver = connect(&config, &registry, instrument, cli.simulate)?;
            for amplitude in driver.fetch_trace(channel_selector(channel))? {
                println!("{amplitude}");
            }
        }
    }

    Ok(())
}

fn connect(config: &IviConfig, registry: &ModelRegistry, id: &str, simulate: bool) -> Result<Driver> {
    let mut definition = config
        .instrument(id)
        .cloned()
        .ok_or_else(|| anyhow!("No instrument '{id}' in configuration"))?;
    if !definition.enabled {
        return Err(anyhow!("Instrument '{id}' is disabled"));
    }
    definition.simulate |= simulate;

    let driver = definition
        .connect(registry)
        .with_context(|| format!("Failed to connect to '{id}' ({})", definition.model))?;
    info!("Connected to '{}' as {}", id, driver.model().name);
    Ok(driver)
}

fn scope_of(driver: &Driver, attribute: &str) -> Result<Scope> {
    driver
        .model()
        .attribute(attribute)
        .map(|a| a.scope)
        .ok_or_else(|| anyhow!("Unknown attribute '{attribute}'"))
}

/// Numeric arguments are indices, anything else is a channel name.
fn channel_selector(channel: &str) -> rust_ivi::channel::ChannelSelector {
    match channel.parse::<usize>() {
        Ok(index) => index.into(),
        Err(_) => channel.into(),
    }
}

fn list_models(registry: &ModelRegistry) {
    for model in registry.iter() {
        println!(
            "{:<14} {:<16} {} channel(s)  {}",
            model.name,
            model.class.to_string(),
            model.channel_count(),
            model.description
        );
    }
}

fn describe(registry: &ModelRegistry, name: &str, json: bool) -> Result<()> {
    let model = registry.find(name)?;
    if json {
        println!("{}", serde_json::to_string_pretty(model)?);
        return Ok(());
    }

    println!("{} ({}, {})", model.name, model.manufacturer, model.class);
    if !model.supported_models.is_empty() {
        println!("Supports: {}", model.supported_models.join(", "));
    }
    println!("Channels:");
    let channels = model.channel_list();
    for (name, spec) in channels.names().iter().zip(&model.channels) {
        let ranges: Vec<_> = spec.ranges.iter().map(|r| r.name.as_str()).collect();
        println!(
            "  {}  {} V / {} A  ovp {}  ranges [{}]",
            name,
            spec.voltage_max,
            spec.current_max,
            spec.ovp_max,
            ranges.join(", ")
        );
    }
    println!("Attributes:");
    for attr in &model.attributes {
        // driver-side settings read back what was written
        let access = match (attr.is_readable() || attr.local, attr.is_writable()) {
            (true, true) => "rw",
            (true, false) => "r",
            (false, true) => "w",
            (false, false) => "-",
        };
        println!(
            "  {:<32} {:<10} {:<10} {:<2} {}",
            attr.name,
            attr.scope.to_string(),
            attr.kind.name(),
            access,
            attr.description.as_deref().unwrap_or("")
        );
    }
    if model.memory_size > 0 {
        println!("Memory slots: {}", model.memory_size);
    }
    Ok(())
}
