//! UDS Database CLI Application
//!
//! Command-line front end for the uds-decoder library:
//! - Database statistics and converter dumps
//! - File resolution (redirections and include files)
//! - Listing resolved dataset rows
//! - Decoding ECU responses with measurement block descriptors

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use uds_decoder::{ParseInfo, SegmentType, UdsReader};

mod config;

use config::{AppConfig, OutputFormat};

/// UDS Reader - Decode ECU responses with a diagnostic database
#[derive(Parser, Debug)]
#[command(name = "uds-cli")]
#[command(about = "Inspect a UDS diagnostic database and decode ECU responses", long_about = None)]
#[command(version)]
struct Args {
    /// Database directory (overrides the config file)
    #[arg(short, long, value_name = "DIR")]
    db: Option<PathBuf>,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output format (overrides the config file)
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show table sizes of the loaded database
    Stats,
    /// Render every fixed converter against the probe buffers
    FixedTypes,
    /// List the containers an ECU file resolves to
    Files {
        /// ECU file base name
        name: String,
    },
    /// Resolve the rows of one dataset kind for an ECU file
    Segment {
        /// ECU file base name
        name: String,
        /// Dataset kind (adp, dtc, ffmux, ges, mwb, sot, xpl)
        kind: SegmentType,
    },
    /// Decode a hex payload with a measurement block of an ECU file
    Decode {
        /// ECU file base name
        name: String,
        /// Position of the measurement block in the resolved list, starting at 0
        index: usize,
        /// Response payload as hex, e.g. "0064" or "00 64"
        payload: String,
    },
}

/// One resolved row as printed by `segment`
#[derive(Debug, Serialize)]
struct RowView {
    row: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    service_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_type: Option<String>,
}

impl From<&ParseInfo> for RowView {
    fn from(info: &ParseInfo) -> Self {
        let mwb = info.as_mwb();
        Self {
            row: info.row().clone(),
            service_id: mwb.map(|mwb| mwb.service_id),
            name: mwb.map(|mwb| mwb.display_name().to_string()),
            data_type: mwb.map(|mwb| mwb.data_type.type_name()),
        }
    }
}

#[derive(Debug, Serialize)]
struct DecodeView {
    name: String,
    service_id: u32,
    data_type: String,
    payload: String,
    text: String,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("UDS Reader CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using decoder library v{}", uds_decoder::VERSION);

    let app_config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };
    let format = args.format.unwrap_or(app_config.output.format);

    let Some(db_dir) = args.db.clone().or(app_config.database.dir) else {
        bail!("No database directory given, use --db or [database] dir in the config file");
    };

    let reader = UdsReader::init(&db_dir, app_config.reader)
        .with_context(|| format!("Failed to load database from {:?}", db_dir))?;

    run_command(&reader, &args.command, format)
}

fn run_command(reader: &UdsReader, command: &Command, format: OutputFormat) -> Result<()> {
    match command {
        Command::Stats => {
            let stats = reader.stats();
            if format == OutputFormat::Json {
                return print_json(&stats);
            }
            println!("Database: {:?}", reader.dir());
            println!("  Texts:            {}", stats.num_texts);
            println!("  Units:            {}", stats.num_units);
            println!("  Enumerations:     {}", stats.num_value_name_groups);
            println!("  Multiplexers:     {}", stats.num_mux_groups);
            println!("  Fixed converters: {}", stats.num_fixed_converters);
            println!("  Redirections:     {}", stats.num_redirects);
            println!("  Chassis codes:    {}", stats.num_chassis_codes);
            for (kind, rows) in &stats.master_rows {
                println!("  {:<17} {}", format!("{}:", kind), rows);
            }
        }
        Command::FixedTypes => {
            let dump = reader.test_fixed_types();
            if format == OutputFormat::Json {
                return print_json(&dump.lines().collect::<Vec<_>>());
            }
            print!("{}", dump);
        }
        Command::Files { name } => {
            let files = reader.file_list(name)?;
            if format == OutputFormat::Json {
                return print_json(&files);
            }
            for file in files {
                println!("{}", file.display());
            }
        }
        Command::Segment { name, kind } => {
            let rows: Vec<RowView> = reader.parse_file(name, *kind)?.iter().map(RowView::from).collect();
            if format == OutputFormat::Json {
                return print_json(&rows);
            }
            for (index, row) in rows.iter().enumerate() {
                match (&row.service_id, &row.name, &row.data_type) {
                    (Some(service_id), Some(name), Some(data_type)) => {
                        println!("{:4}: {:04X} {} [{}]", index, service_id, name, data_type)
                    }
                    _ => println!("{:4}: {}", index, row.row.join(",")),
                }
            }
        }
        Command::Decode { name, index, payload } => {
            let data = parse_payload(payload)?;
            let entries = reader.parse_file(name, SegmentType::Mwb)?;
            let mwb = entries
                .get(*index)
                .and_then(ParseInfo::as_mwb)
                .with_context(|| format!("{} has no measurement block {} ({} found)", name, index, entries.len()))?;

            let view = DecodeView {
                name: mwb.display_name().to_string(),
                service_id: mwb.service_id,
                data_type: mwb.data_type.type_name(),
                payload: hex::encode_upper(&data),
                text: reader.decode(&mwb.data_type, &data),
            };
            if format == OutputFormat::Json {
                return print_json(&view);
            }
            println!("{} ({:04X}, {}): {}", view.name, view.service_id, view.data_type, view.text);
        }
    }
    Ok(())
}

/// Hex payload, whitespace between bytes allowed
fn parse_payload(payload: &str) -> Result<Vec<u8>> {
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&compact).with_context(|| format!("Invalid hex payload: {:?}", payload))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
