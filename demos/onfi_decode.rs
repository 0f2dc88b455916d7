//! Example: ONFI NAND bus decoding
//!
//! Decodes `(address, data)` transactions from a DSL file and prints them.
//!
//! Usage:
//!   cargo run --release --example onfi_decode -- \
//!       --file nand.dsl \
//!       --ale 0 --cle 1 --nce 2 --nwe 3 --nwp 4 --nre 5 --rnb 6 \
//!       --io0 7 --io1 8 --io2 9 --io3 10 --io4 11 --io5 12 --io6 13 --io7 14 \
//!       -n 100
//!
//! With CSV and binary output:
//!   cargo run --release --example onfi_decode -- \
//!       --file nand.dsl ... \
//!       --csv-output output.csv --bin-output output.bin
//!
//! Probes can be given by number or by their name in the capture header.

use clap::{Arg, ArgMatches, CommandFactory, FromArgMatches, Parser};
use onfi::nodes::decoders::channels::{self, CE1, CHANNELS, NUM_CHANNELS};
use onfi::nodes::decoders::{ANNOTATIONS, Annotation, BinaryRecord, ChannelSink, DECODER_INFO};
use onfi::runtime::Receiver;
use onfi::{DataRateMode, DslCapture, OnfiConfig, OnfiDecoder, OnfiVersion, Session, WordSize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::thread::{self, JoinHandle};
use tracing::{info, warn};

/// Channel probe flags (`--ale`, `--io3`, ...) are added from the channel table
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to DSL file
    #[arg(short, long)]
    file: String,

    /// Bus width in bits (8 or 16)
    #[arg(long, default_value = "8")]
    wordsize: WordSize,

    /// Data rate mode (SDR, NV-DDR, NV-DDR2, NV-DDR3, NV-LPDDR4)
    #[arg(long, default_value = "SDR")]
    mode: DataRateMode,

    /// ONFI standard version (informational)
    #[arg(long, default_value = "3.2")]
    onfi: OnfiVersion,

    /// Probes used as bank (chip enable) lines, lowest bank bit first
    #[arg(long, num_args = 1..=7)]
    bank: Vec<String>,

    /// Number of transactions to decode (0 = unlimited)
    #[arg(short, long, default_value = "100")]
    n: u64,

    /// CSV output file path (optional)
    #[arg(long)]
    csv_output: Option<String>,

    /// Binary output file path (optional, 3 bytes per transaction)
    #[arg(long)]
    bin_output: Option<String>,
}

/// Add one `--<channel> <probe>` flag per decoder channel
fn channel_args() -> Vec<Arg> {
    (0..NUM_CHANNELS)
        .filter_map(channels::channel_info)
        .map(|info| {
            Arg::new(info.id)
                .long(info.id)
                .value_name("PROBE")
                .help(format!("Probe for {} ({})", info.name, info.desc))
                .required(CHANNELS.iter().any(|c| c.id == info.id))
        })
        .collect()
}

/// Print annotations and optionally write them as CSV
fn spawn_annotation_writer(
    annotations: Receiver<Annotation>,
    csv_path: Option<String>,
    sample_period: f64,
) -> std::io::Result<JoinHandle<std::io::Result<usize>>> {
    let mut csv = match csv_path {
        Some(path) => {
            info!("CSV output: {}", path);
            let mut writer = BufWriter::new(File::create(path)?);
            writeln!(writer, "Id,Start,End,Address,Data")?;
            Some(writer)
        }
        None => None,
    };

    Ok(thread::spawn(move || {
        let mut count = 0;
        for annotation in annotations {
            count += 1;
            let text = annotation.texts.first().map(String::as_str).unwrap_or("");
            info!(
                "ONFI #{} {}: {} (samples {}..{}, t={:.3} us)",
                count,
                ANNOTATIONS[annotation.class.index()].1,
                text,
                annotation.start,
                annotation.end,
                annotation.end as f64 * sample_period * 1e6
            );
            if let Some(writer) = csv.as_mut() {
                let (address, data) = text.split_once(':').unwrap_or((text, ""));
                writeln!(
                    writer,
                    "{},{},{},{},{}",
                    count, annotation.start, annotation.end, address, data
                )?;
            }
        }
        if let Some(mut writer) = csv {
            writer.flush()?;
        }
        Ok(count)
    }))
}

/// Concatenate binary records into a file, or just drain them
fn spawn_binary_writer(
    records: Receiver<BinaryRecord>,
    bin_path: Option<String>,
) -> std::io::Result<JoinHandle<std::io::Result<usize>>> {
    let mut out = match bin_path {
        Some(path) => {
            info!("Binary output: {}", path);
            Some(BufWriter::new(File::create(path)?))
        }
        None => None,
    };

    Ok(thread::spawn(move || {
        let mut count = 0;
        for record in records {
            count += 1;
            if let Some(writer) = out.as_mut() {
                writer.write_all(&record.bytes)?;
            }
        }
        if let Some(mut writer) = out {
            writer.flush()?;
        }
        Ok(count)
    }))
}

fn assign_channels(capture: &mut DslCapture, matches: &ArgMatches) -> onfi::Result<()> {
    for channel in 0..NUM_CHANNELS {
        let Some(info) = channels::channel_info(channel) else {
            continue;
        };
        if let Some(probe) = matches.get_one::<String>(info.id) {
            let probe = capture.resolve_probe(probe)?;
            capture.assign(channel, probe)?;
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let matches = Args::command().args(channel_args()).get_matches();
    let args = Args::from_arg_matches(&matches)?;

    info!("=== {} decode ===", DECODER_INFO.longname);
    info!("File: {}", args.file);
    info!(
        "ONFI {}: x{} {}",
        args.onfi,
        args.wordsize.bits(),
        args.mode
    );

    let mut capture = DslCapture::open(&args.file)?;
    assign_channels(&mut capture, &matches)?;

    let mut config = OnfiConfig::new()
        .with_version(args.onfi)
        .with_wordsize(args.wordsize)
        .with_mode(args.mode);

    if !args.bank.is_empty() {
        let mut bank = Vec::with_capacity(args.bank.len());
        for (i, probe) in args.bank.iter().enumerate() {
            if capture.probe_for(CE1 + i).is_some() {
                warn!("Bank line {} overrides --ce{}", i, i + 1);
            }
            let probe = capture.resolve_probe(probe)?;
            capture.assign(CE1 + i, probe)?;
            bank.push(CE1 + i);
        }
        info!("Bank: {} line(s)", bank.len());
        let layout = config.bus_layout().with_bank(bank);
        config = config.with_layout(layout);
    }

    let max_events = (args.n > 0).then_some(args.n);
    let decoder = OnfiDecoder::new(config)?.with_max_events(max_events);

    let (sink, annotations, records) = ChannelSink::bounded(10_000);
    let annotation_writer =
        spawn_annotation_writer(annotations, args.csv_output.clone(), capture.sample_period())?;
    let binary_writer = spawn_binary_writer(records, args.bin_output.clone())?;

    info!("Running...");
    let mut session = Session::new(capture, decoder);
    let summary = session.run(sink)?;

    let printed = annotation_writer
        .join()
        .map_err(|_| "annotation writer panicked")??;
    let written = binary_writer
        .join()
        .map_err(|_| "binary writer panicked")??;

    info!(
        "Done! {} samples, {} transactions ({} printed, {} binary records)",
        summary.samples, summary.events, printed, written
    );
    if summary.suppressed > 0 {
        info!(
            "{} data strobe(s) before the first address latch were ignored",
            summary.suppressed
        );
    }

    Ok(())
}
