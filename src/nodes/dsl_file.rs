//! DSLogic `.dsl` capture reader
//!
//! A `.dsl` file is a ZIP archive holding a `header` text file and one
//! packed-bit block per probe and block index (`L-<probe>/<block>`, LSB
//! first). [`DslCapture`] parses the header, maps decoder channels to probes
//! and streams lockstep [`BlockFrame`]s from a reader thread.

use crate::nodes::decoders::channels::NUM_CHANNELS;
use crate::nodes::decoders::config::ConfigError;
use crate::runtime::{BlockFrame, Receiver, SampleBlock, Sender, Watchdog, bounded};
use crate::{OnfiError, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};
use zip::ZipArchive;

/// Header information from a DSL file
#[derive(Debug, Clone, PartialEq)]
pub struct DslHeader {
    /// Total number of probes/channels
    pub total_probes: usize,
    /// Sample rate as a string (e.g., "50 MHz")
    pub samplerate: String,
    /// Sample rate in Hz
    pub samplerate_hz: f64,
    /// Sample period in seconds (1 / sample_rate), kept unrounded
    pub sample_period: f64,
    /// Total number of samples captured
    pub total_samples: u64,
    /// Total number of data blocks
    pub total_blocks: u64,
    /// Samples per block, from the bit length of `L-0/0`
    pub samples_per_block: u64,
    /// Probe names indexed by probe number (0-based)
    pub probe_names: Vec<String>,
}

impl DslHeader {
    /// Parse the `header` file of an open archive
    pub fn parse<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Self> {
        let mut header_file = archive
            .by_name("header")
            .map_err(|e| OnfiError::ParseHeader(format!("Cannot find header file: {}", e)))?;

        let mut content = String::new();
        header_file.read_to_string(&mut content)?;
        drop(header_file);

        let mut total_probes: Option<usize> = None;
        let mut samplerate: Option<String> = None;
        let mut total_samples: Option<u64> = None;
        let mut total_blocks: Option<u64> = None;
        let mut probe_names_map: HashMap<usize, String> = HashMap::new();

        for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(value) = line.strip_prefix("total probes = ") {
                total_probes = value.parse().ok();
            } else if let Some(value) = line.strip_prefix("samplerate = ") {
                samplerate = Some(value.to_string());
            } else if let Some(value) = line.strip_prefix("total samples = ") {
                total_samples = value.parse().ok();
            } else if let Some(value) = line.strip_prefix("total blocks = ") {
                total_blocks = value.parse().ok();
            } else if let Some((probe_part, name)) = line.split_once(" = ")
                && let Some(num_str) = probe_part.strip_prefix("probe")
                && let Ok(probe_num) = num_str.parse::<usize>()
            {
                probe_names_map.insert(probe_num, name.to_string());
            }
        }

        let total_probes =
            total_probes.ok_or_else(|| OnfiError::MissingField("total probes".to_string()))?;
        let samplerate =
            samplerate.ok_or_else(|| OnfiError::MissingField("samplerate".to_string()))?;
        let total_samples =
            total_samples.ok_or_else(|| OnfiError::MissingField("total samples".to_string()))?;
        let total_blocks =
            total_blocks.ok_or_else(|| OnfiError::MissingField("total blocks".to_string()))?;

        let samplerate_hz = parse_sample_rate(&samplerate)
            .ok_or_else(|| OnfiError::ParseHeader(format!("Invalid sample rate: {}", samplerate)))?;

        // Blocks are fixed-size except the last one
        let samples_per_block = {
            let mut file = archive
                .by_name("L-0/0")
                .map_err(|_| OnfiError::ParseHeader("Could not read first block".to_string()))?;
            let mut buf = Vec::new();
            file.read_to_end(&mut buf)?;
            (buf.len() * 8) as u64
        };
        if samples_per_block == 0 {
            return Err(OnfiError::ParseHeader("First block is empty".to_string()));
        }

        debug!(
            "File has {} samples across {} blocks ({} samples/block)",
            total_samples, total_blocks, samples_per_block
        );

        let probe_names = (0..total_probes)
            .map(|i| {
                probe_names_map
                    .get(&i)
                    .cloned()
                    .unwrap_or_else(|| format!("Probe{}", i))
            })
            .collect();

        Ok(Self {
            total_probes,
            samplerate,
            samplerate_hz,
            sample_period: 1.0 / samplerate_hz,
            total_samples,
            total_blocks,
            samples_per_block,
            probe_names,
        })
    }

    /// Time of a sample position in seconds from the capture start
    pub fn sample_time(&self, position: u64) -> f64 {
        position as f64 * self.sample_period
    }
}

/// Parse a sample rate string (e.g., "50 MHz") into Hz
pub fn parse_sample_rate(samplerate: &str) -> Option<f64> {
    let parts: Vec<&str> = samplerate.split_whitespace().collect();
    if parts.len() >= 2
        && let Ok(value) = parts[0].parse::<f64>()
    {
        let multiplier = match parts[1] {
            "GHz" => 1_000_000_000.0,
            "MHz" => 1_000_000.0,
            "KHz" | "kHz" => 1_000.0,
            "Hz" => 1.0,
            _ => return None,
        };
        return Some(value * multiplier);
    }
    None
}

/// Archive handle shared with the reader thread
#[derive(Clone)]
struct BlockStore {
    archive: Arc<Mutex<ZipArchive<File>>>,
}

impl BlockStore {
    /// Blocks are read once per stream and never kept
    fn load(&self, probe: usize, block_num: u64) -> Result<Arc<[u8]>> {
        let mut archive = self.archive.lock().unwrap_or_else(PoisonError::into_inner);
        let mut file = archive
            .by_name(&format!("L-{}/{}", probe, block_num))
            .map_err(|_| OnfiError::InvalidBlock(block_num))?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;
        Ok(Arc::from(buf))
    }
}

/// An opened `.dsl` capture with a decoder-channel → probe assignment
///
/// ```no_run
/// use onfi::nodes::DslCapture;
/// use onfi::nodes::decoders::channels::{ALE, NRE};
///
/// let mut capture = DslCapture::open("capture.dsl")?;
/// capture.assign(ALE, 0)?;
/// capture.assign(NRE, 1)?;
/// # Ok::<(), onfi::OnfiError>(())
/// ```
pub struct DslCapture {
    name: String,
    store: BlockStore,
    header: DslHeader,
    /// Probe per decoder channel; `None` = not wired
    assignment: Vec<Option<usize>>,
    max_samples: Option<u64>,
    shutdown: Arc<AtomicBool>,
}

impl DslCapture {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let mut archive = ZipArchive::new(file)?;
        let header = DslHeader::parse(&mut archive)?;

        info!(
            "Opened capture: {} probes, {} samples at {}",
            header.total_probes, header.total_samples, header.samplerate
        );

        Ok(Self {
            name: "dsl_capture".to_string(),
            store: BlockStore {
                archive: Arc::new(Mutex::new(archive)),
            },
            header,
            assignment: vec![None; NUM_CHANNELS],
            max_samples: None,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Limit the number of samples streamed by the reader
    pub fn with_max_samples(mut self, max_samples: Option<u64>) -> Self {
        self.max_samples = max_samples;
        self
    }

    pub fn header(&self) -> &DslHeader {
        &self.header
    }

    pub fn total_probes(&self) -> usize {
        self.header.total_probes
    }

    pub fn total_samples(&self) -> u64 {
        self.header.total_samples
    }

    pub fn samplerate_hz(&self) -> f64 {
        self.header.samplerate_hz
    }

    pub fn sample_period(&self) -> f64 {
        self.header.sample_period
    }

    /// Total capture duration in seconds
    pub fn capture_duration(&self) -> f64 {
        self.header.total_samples as f64 * self.header.sample_period
    }

    /// Resolve a probe given by number or by its header name
    pub fn resolve_probe(&self, probe: &str) -> Result<usize> {
        let index = match probe.parse::<usize>() {
            Ok(index) => index,
            Err(_) => self
                .header
                .probe_names
                .iter()
                .position(|name| name.eq_ignore_ascii_case(probe))
                .ok_or_else(|| OnfiError::ParseError(format!("Unknown probe '{}'", probe)))?,
        };
        if index >= self.header.total_probes {
            return Err(OnfiError::InvalidProbe(index));
        }
        Ok(index)
    }

    /// Wire a decoder channel to a probe of the capture
    pub fn assign(&mut self, channel: usize, probe: usize) -> Result<()> {
        if channel >= NUM_CHANNELS {
            return Err(ConfigError::UnknownChannel(channel).into());
        }
        if probe >= self.header.total_probes {
            return Err(OnfiError::InvalidProbe(probe));
        }
        debug!(
            "[{}] Channel {} <- probe {} ({})",
            self.name, channel, probe, self.header.probe_names[probe]
        );
        self.assignment[channel] = Some(probe);
        Ok(())
    }

    /// Probe wired to a decoder channel
    pub fn probe_for(&self, channel: usize) -> Option<usize> {
        self.assignment.get(channel).copied().flatten()
    }

    /// Ask a running reader thread to stop after its current frame
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Spawn the reader thread and return its frame stream.
    ///
    /// The thread sends one [`BlockFrame`] per capture block and closes the
    /// channel at the end. A read error also closes the stream; the join
    /// handle then yields that error instead of the number of samples sent.
    pub fn spawn_reader(
        &self,
        capacity: usize,
        watchdog: Option<&Watchdog>,
    ) -> (JoinHandle<Result<u64>>, Receiver<BlockFrame>) {
        let (mut sender, mut receiver) = bounded(capacity);
        if let Some(watchdog) = watchdog {
            sender = sender.with_watchdog(watchdog, &self.name, "frames");
            receiver = receiver.with_watchdog(watchdog, "decoder", "frames");
        }

        let reader = FrameReader {
            name: self.name.clone(),
            store: self.store.clone(),
            header: self.header.clone(),
            assignment: self.assignment.clone(),
            max_samples: self.max_samples,
            shutdown: Arc::clone(&self.shutdown),
        };

        let handle = thread::spawn(move || reader.run(sender));
        (handle, receiver)
    }
}

impl Drop for DslCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// State moved into the reader thread
struct FrameReader {
    name: String,
    store: BlockStore,
    header: DslHeader,
    assignment: Vec<Option<usize>>,
    max_samples: Option<u64>,
    shutdown: Arc<AtomicBool>,
}

impl FrameReader {
    fn run(self, sender: Sender<BlockFrame>) -> Result<u64> {
        let total_samples = self
            .max_samples
            .unwrap_or(self.header.total_samples)
            .min(self.header.total_samples);
        let wired = self.assignment.iter().filter(|p| p.is_some()).count();
        let mut position = 0u64;

        info!(
            "[{}] Starting reader ({} samples, {} blocks, {} wired channels)",
            self.name, total_samples, self.header.total_blocks, wired
        );

        for block_num in 0..self.header.total_blocks {
            if self.shutdown.load(Ordering::Relaxed) {
                debug!("[{}] Shutdown signal received at block {}", self.name, block_num);
                break;
            }
            if position >= total_samples {
                break;
            }

            let frame = match self.read_frame(block_num, position, total_samples) {
                Ok(frame) => frame,
                Err(e) => {
                    error!("[{}] Failed to read block {}: {}", self.name, block_num, e);
                    sender.close();
                    return Err(e);
                }
            };
            position = frame.end_position();

            if sender.send(frame).is_err() {
                debug!("[{}] Decoder disconnected at position {}", self.name, position);
                return Ok(position);
            }

            if block_num > 0 && block_num % 10 == 0 {
                let pct = (position as f64 / total_samples as f64) * 100.0;
                debug!("[{}] Progress: {:.1}% ({} samples)", self.name, pct, position);
            }
        }

        if position < total_samples && !self.shutdown.load(Ordering::Relaxed) {
            warn!(
                "[{}] Stream ended at {} of {} samples",
                self.name, position, total_samples
            );
        }

        sender.close();
        info!("[{}] Reader complete: {} samples", self.name, position);
        Ok(position)
    }

    fn read_frame(&self, block_num: u64, start: u64, total_samples: u64) -> Result<BlockFrame> {
        let num_samples = self.header.samples_per_block.min(total_samples - start) as usize;

        let blocks = self
            .assignment
            .iter()
            .map(|probe| {
                probe
                    .map(|p| {
                        self.store
                            .load(p, block_num)
                            .map(|data| SampleBlock::new(data, start, num_samples))
                    })
                    .transpose()
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(BlockFrame::new(start, num_samples, blocks))
    }
}
