// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! schemapack-dump - decode framed message streams
//!
//! Binds dynamic records to a schema file, so no generated code is needed,
//! and prints every decodable message as one JSON line.

use anyhow::{Context, Result};
use clap::Parser;
use schemapack::framing::FramingStats;
use schemapack::{
    register_dynamic_layouts, Config, MessageReader, ReadOutcome, Reflector, Schema,
    SchemaDefinition, Serializer,
};
use serde_json::Value;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Decode framed schemapack streams into JSON lines
#[derive(Parser, Debug)]
#[command(name = "schemapack-dump")]
#[command(version)]
#[command(about = "Print framed schemapack messages as JSON lines")]
struct Args {
    /// Schema definition (.yaml, .yml or .json)
    #[arg(short, long, value_name = "FILE")]
    schema: PathBuf,

    /// Serializer and framing settings (.yaml, .yml or .json)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Framed streams to decode ("-" for stdin)
    #[arg(value_name = "STREAM", default_value = "-")]
    inputs: Vec<PathBuf>,

    /// Print read counters to stderr when done
    #[arg(long)]
    stats: bool,

    /// List the schema's messages and exit
    #[arg(long)]
    list: bool,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn build_serializer(args: &Args) -> Result<(Serializer, Config)> {
    let config = match &args.config {
        Some(path) => Config::load_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    let def = SchemaDefinition::load_file(&args.schema)
        .with_context(|| format!("loading schema {}", args.schema.display()))?;
    let schema = Schema::load(&def).context("resolving schema")?;

    let mut reflector = Reflector::new();
    register_dynamic_layouts(&schema, &mut reflector).context("deriving record layouts")?;
    let mut serializer = Serializer::new(config.serializer.clone());
    serializer
        .initialize(schema, reflector)
        .context("binding schema")?;
    Ok((serializer, config))
}

fn open(path: &Path) -> Result<Box<dyn Read>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

fn dump_stream<W: Write>(
    serializer: &Serializer,
    config: &Config,
    input: Box<dyn Read>,
    out: &mut W,
) -> Result<FramingStats> {
    let mut reader = MessageReader::new(input, config.framing.clone());
    loop {
        match reader.read(serializer)? {
            ReadOutcome::Message { id, message } => {
                let mut line = serializer.print(message.as_ref())?;
                if let Value::Object(map) = &mut line {
                    map.insert("id".into(), Value::from(id));
                }
                writeln!(out, "{}", line)?;
            }
            ReadOutcome::Skipped { id, length } => {
                log::debug!("[dump] skipped message {} ({} bytes)", id, length);
            }
            ReadOutcome::EndOfStream => break,
        }
    }
    Ok(reader.stats())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let (serializer, config) = build_serializer(&args)?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    if args.list {
        for id in serializer.message_ids() {
            if let Some(info) = serializer.message_info(id) {
                writeln!(out, "{:>10}  {}", info.id, info.type_path)?;
            }
        }
        out.flush()?;
        return Ok(());
    }

    let mut total = FramingStats::default();
    for path in &args.inputs {
        let input = open(path)?;
        let stats = dump_stream(&serializer, &config, input, &mut out)
            .with_context(|| format!("decoding {}", path.display()))?;
        total.messages_read += stats.messages_read;
        total.messages_skipped += stats.messages_skipped;
        total.bytes_read += stats.bytes_read;
    }
    out.flush()?;

    if args.stats {
        eprintln!(
            "messages: {} decoded, {} skipped, {} bytes",
            total.messages_read, total.messages_skipped, total.bytes_read
        );
    }
    Ok(())
}
