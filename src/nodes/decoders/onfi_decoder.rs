//! ONFI transaction reconstructor
//!
//! Pairs each data strobe with the most recently latched address:
//!
//! - falling ALE: pack the address bus (plus any wired bank lines) above the
//!   data bus bits and remember it with its sample position;
//! - rising nRE: pack the data bus and, once an address has been seen, emit
//!   one `AAAA:DD` annotation and a 3-byte binary record spanning
//!   address position → data position.
//!
//! Bit packing is little-endian over the channel lists of the [`BusLayout`]:
//! the first channel of each list is bit 0.

use super::channels::BusLayout;
use super::config::{ConfigError, DataRateMode, OnfiConfig};
use super::edge_waiter::EdgeWaiter;
use super::sink::OutputSink;
use super::types::{Annotation, BinaryRecord, DecodedEvent, EdgeCondition, LatchedValue};
use crate::nodes::pin_source::PinSource;
use crate::runtime::PinVector;
use tracing::{debug, info, trace, warn};

/// Index of the address-latch condition in the wait set
const COND_ADDRESS: usize = 0;
/// Index of the data-strobe condition in the wait set
const COND_DATA: usize = 1;

/// Pack channel levels little-endian: `channels[i]` becomes bit `i`.
///
/// Unwired channels read as 0.
pub fn pack_bits(pins: &PinVector, channels: &[usize]) -> u64 {
    channels
        .iter()
        .enumerate()
        .filter(|&(_, &ch)| pins.get(ch) == Some(true))
        .fold(0u64, |acc, (bit, _)| acc | (1 << bit))
}

/// Latched address/data slots of the reconstructor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconstructorState {
    pub current_address: LatchedValue,
    pub current_data: LatchedValue,
    /// Set by the first address latch; data edges before it emit nothing
    pub started: bool,
}

impl ReconstructorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Back to the unstarted, all-zero state
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Address latch: recompute the address from the bus and mark the decoder started
pub fn on_address_edge(
    state: &mut ReconstructorState,
    layout: &BusLayout,
    pins: &PinVector,
    position: u64,
) {
    // Only bank lines that are actually wired add address bits
    let bank: Vec<usize> = layout
        .bank
        .iter()
        .copied()
        .filter(|&ch| pins.is_wired(ch))
        .collect();

    let mut address = pack_bits(pins, &layout.address_bus);
    address |= pack_bits(pins, &bank) << layout.address_bus.len();
    address <<= layout.data_bus.len();
    address |= pack_bits(pins, &layout.data_bus);

    state.current_address = LatchedValue {
        value: address as u32,
        sample_position: position,
    };
    state.started = true;

    trace!("Address latched: 0x{:04X} at sample {}", address, position);
}

/// Data strobe: recompute the data and return an event once an address has been seen
pub fn on_data_edge(
    state: &mut ReconstructorState,
    layout: &BusLayout,
    pins: &PinVector,
    position: u64,
) -> Option<DecodedEvent> {
    let data = pack_bits(pins, &layout.data_bus);
    state.current_data = LatchedValue {
        value: data as u32,
        sample_position: position,
    };

    if !state.started {
        trace!("Data 0x{:02X} at sample {} before any address, ignored", data, position);
        return None;
    }

    Some(DecodedEvent {
        start: state.current_address.sample_position,
        end: state.current_data.sample_position,
        address: state.current_address.value,
        data: data as u8,
    })
}

/// Counters for one decode run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeSummary {
    pub samples: u64,
    pub address_latches: u64,
    pub data_latches: u64,
    pub events: u64,
    /// Data strobes seen before the first address latch
    pub suppressed: u64,
}

/// ONFI NAND bus decoder
///
/// # Example
/// ```
/// use onfi::nodes::MemorySource;
/// use onfi::nodes::decoders::{CollectSink, OnfiConfig, OnfiDecoder};
///
/// let mut decoder = OnfiDecoder::new(OnfiConfig::default())?;
/// let mut sink = CollectSink::new();
/// let summary = decoder.decode(MemorySource::default(), &mut sink);
/// assert_eq!(summary.events, 0);
/// # Ok::<(), onfi::nodes::decoders::ConfigError>(())
/// ```
pub struct OnfiDecoder {
    name: String,
    config: OnfiConfig,
    layout: BusLayout,
    state: ReconstructorState,
    max_events: Option<u64>,
}

impl OnfiDecoder {
    /// Create a decoder; the configuration is validated here, never mid-stream
    pub fn new(config: OnfiConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        if config.mode != DataRateMode::Sdr {
            warn!(
                "{} mode requested; decoding with SDR edge detection",
                config.mode
            );
        }

        let layout = config.bus_layout();
        debug!(
            "ONFI {} x{} {}: data bus {} bits, address bus {} bits, {} bank line(s)",
            config.version,
            config.wordsize.bits(),
            config.mode,
            layout.data_bus.len(),
            layout.address_bus.len(),
            layout.bank.len()
        );

        Ok(Self {
            name: "onfi_decoder".to_string(),
            config,
            layout,
            state: ReconstructorState::new(),
            max_events: None,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Stop after this many events (`None` = decode the whole stream)
    pub fn with_max_events(mut self, max_events: Option<u64>) -> Self {
        self.max_events = max_events;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &OnfiConfig {
        &self.config
    }

    pub fn layout(&self) -> &BusLayout {
        &self.layout
    }

    pub fn state(&self) -> &ReconstructorState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// The two-condition wait set: address latch, then data strobe
    pub fn wait_set(&self) -> [EdgeCondition; 2] {
        let (ale, ale_edge) = self.layout.address_latch;
        let (strobe, strobe_edge) = self.layout.data_strobe;
        [
            EdgeCondition::single(ale, ale_edge),
            EdgeCondition::single(strobe, strobe_edge),
        ]
    }

    /// Run the decode loop until the source is exhausted.
    ///
    /// Starts from a reset state. Output goes to `sink` in stream order and
    /// `sink.finish()` is called once at the end.
    pub fn decode<S, O>(&mut self, source: S, mut sink: O) -> DecodeSummary
    where
        S: PinSource,
        O: OutputSink,
    {
        self.reset();

        let conditions = self.wait_set();
        let mut waiter = EdgeWaiter::new(source);
        let mut summary = DecodeSummary::default();

        info!(
            "[{}] Decoding, waiting on {} / {}",
            self.name, conditions[COND_ADDRESS], conditions[COND_DATA]
        );

        while let Some(m) = waiter.wait(&conditions) {
            // Address before data when both fire on the same sample
            if m.fired(COND_ADDRESS) {
                on_address_edge(&mut self.state, &self.layout, &m.pins, m.position);
                summary.address_latches += 1;
            }

            if m.fired(COND_DATA) {
                summary.data_latches += 1;
                match on_data_edge(&mut self.state, &self.layout, &m.pins, m.position) {
                    Some(event) => {
                        trace!("[{}] {}", self.name, event);
                        sink.put_annotation(Annotation::from_event(&event));
                        sink.put_binary(BinaryRecord::from_event(&event));
                        summary.events += 1;
                    }
                    None => summary.suppressed += 1,
                }
            }

            if self.max_events.is_some_and(|max| summary.events >= max) {
                info!("[{}] Max events ({}) reached", self.name, summary.events);
                break;
            }
        }

        summary.samples = waiter.samples_consumed();
        sink.finish();

        info!(
            "[{}] Done: {} samples, {} address latches, {} data latches, {} events ({} before first address)",
            self.name,
            summary.samples,
            summary.address_latches,
            summary.data_latches,
            summary.events,
            summary.suppressed
        );

        summary
    }
}
