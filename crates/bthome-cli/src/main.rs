use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use bthome_core::channels::{ChannelKey, ChannelSet, ChannelSpec};
use bthome_core::pipeline::{self, Availability, DeviceContext, PacketSink};
use bthome_core::project::{OutputValue, StandardUnits};
use bthome_core::properties;
use bthome_types::catalog;
use bthome_types::Value;

mod payload;

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "bthome")]
#[command(author, version, about = "Decoder for BTHome v2 BLE service data", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a single service-data payload
    Decode {
        /// Payload bytes as hex ("400164") or comma-separated decimals ("64, 1, 100")
        payload: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Run payloads through the full processing pipeline
    ///
    /// Reads one payload per line (hex or decimal notation, '#' starts a
    /// comment) and prints every channel creation, state update, trigger and
    /// availability transition, exactly as a host integration would see them.
    Process {
        /// File with one payload per line, or "-" for stdin
        file: PathBuf,
    },

    /// List the object-id catalog
    Catalog {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.quiet {
        EnvFilter::new("error")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Decode { payload, format } => decode_command(&payload, format),
        Commands::Process { file } => process_command(&file),
        Commands::Catalog { format } => catalog_command(format),
    }
}

fn decode_command(input: &str, format: OutputFormat) -> Result<()> {
    let bytes = payload::parse(input)?;
    tracing::debug!("decoding {} byte payload", bytes.len());
    let packet = bthome_core::decode(&bytes)?;
    let split = properties::split(&packet.measurements);

    match format {
        OutputFormat::Json => {
            let measurements: Vec<_> = split
                .sensors
                .iter()
                .map(|m| {
                    json!({
                        "objectId": format!("0x{:02X}", m.object_id),
                        "channel": m.channel(),
                        "value": value_json(&m.value),
                        "unit": m.entry().and_then(|e| e.unit),
                    })
                })
                .collect();
            let doc = json!({
                "encrypted": packet.header.as_ref().is_some_and(|h| h.encrypted),
                "triggerBased": packet.header.as_ref().is_some_and(|h| h.trigger_based),
                "packetId": packet.packet_id(),
                "measurements": measurements,
                "properties": split.properties,
            });
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        OutputFormat::Text => {
            for m in &split.sensors {
                let name = m.channel().unwrap_or("?");
                let unit = m.entry().and_then(|e| e.unit).unwrap_or("");
                println!("0x{:02X}  {name:<18} {} {unit}", m.object_id, m.value);
            }
            for (key, value) in &split.properties {
                println!("      {key:<18} {value}");
            }
        }
    }
    Ok(())
}

fn value_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Numeric(n) => json!(n),
        Value::Boolean(b) => json!(b),
        Value::Timestamp(epoch) => json!(epoch),
        other => json!(other.to_string()),
    }
}

fn process_command(file: &PathBuf) -> Result<()> {
    let contents = if file.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin())?
    } else {
        fs::read_to_string(file).with_context(|| format!("cannot read {}", file.display()))?
    };

    let mut ctx = DeviceContext::new();
    let mut channels = ChannelSet::new();
    let mut sink = PrintSink;

    for (number, line) in contents.lines().enumerate() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let bytes =
            payload::parse(line).with_context(|| format!("line {}: bad payload", number + 1))?;
        tracing::debug!("processing line {}: {} byte payload", number + 1, bytes.len());
        println!("-- packet {line}");
        match pipeline::process_packet(&mut ctx, &mut channels, &bytes, &StandardUnits, &mut sink) {
            Ok(outcome) => println!("   {outcome:?}"),
            Err(err) => println!("   error: {err}"),
        }
    }
    Ok(())
}

fn catalog_command(format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let entries: Vec<_> = catalog::entries()
                .iter()
                .map(|e| {
                    json!({
                        "objectId": format!("0x{:02X}", e.object_id),
                        "channel": e.channel,
                        "unit": e.unit,
                        "deviceProperty": e.is_device_property(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        OutputFormat::Text => {
            for e in catalog::entries() {
                let channel = e.channel.unwrap_or("(property)");
                let unit = e.unit.unwrap_or("");
                println!("0x{:02X}  {channel:<18} {unit}", e.object_id);
            }
        }
    }
    Ok(())
}

/// Sink that prints every pipeline effect to stdout.
struct PrintSink;

impl PacketSink for PrintSink {
    fn create_channels(&mut self, new_channels: &[ChannelSpec]) {
        for spec in new_channels {
            println!("   + channel {} ({:?})", spec.key, spec.kind);
        }
    }

    fn update_state(&mut self, key: &ChannelKey, value: OutputValue) {
        println!("   {key} = {value}");
    }

    fn trigger_channel(&mut self, key: &ChannelKey, event: &str) {
        println!("   {key} ! {event}");
    }

    fn update_properties(&mut self, properties: &std::collections::BTreeMap<String, String>) {
        for (key, value) in properties {
            println!("   property {key} = {value}");
        }
    }

    fn invalidate_channel(&mut self, key: &ChannelKey) {
        println!("   {key} = UNDEF");
    }

    fn update_availability(&mut self, availability: Availability) {
        match availability {
            Availability::Online => println!("   device ONLINE"),
            Availability::Offline { detail } => println!("   device OFFLINE: {detail}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_command_accepts_both_notations() {
        decode_command("400164", OutputFormat::Text).unwrap();
        decode_command("64, 1, 100", OutputFormat::Json).unwrap();
    }

    #[test]
    fn test_decode_command_rejects_bad_payloads() {
        assert!(decode_command("zz", OutputFormat::Text).is_err());
        // Encrypted payload: parse succeeds, decode fails.
        assert!(decode_command("410164", OutputFormat::Text).is_err());
    }

    #[test]
    fn test_catalog_command_renders_both_formats() {
        catalog_command(OutputFormat::Text).unwrap();
        catalog_command(OutputFormat::Json).unwrap();
    }
}
