//! Core data types for sampled bus signals

use std::fmt;
use std::sync::Arc;

/// Pin states of every decoder channel at one sample position
///
/// Each entry is `Some(level)` for a wired channel and `None` for a channel
/// the capture does not provide. Indexed by decoder channel id.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct PinVector {
    pins: Vec<Option<bool>>,
}

impl PinVector {
    /// Create a pin vector from explicit pin states
    pub fn new(pins: Vec<Option<bool>>) -> Self {
        Self { pins }
    }

    /// Create a pin vector with `len` unwired channels
    pub fn unwired(len: usize) -> Self {
        Self {
            pins: vec![None; len],
        }
    }

    /// Set a channel's level, growing the vector if needed
    pub fn set(&mut self, channel: usize, level: bool) {
        if channel >= self.pins.len() {
            self.pins.resize(channel + 1, None);
        }
        self.pins[channel] = Some(level);
    }

    /// Builder form of [`PinVector::set`]
    pub fn with(mut self, channel: usize, level: bool) -> Self {
        self.set(channel, level);
        self
    }

    /// Level of a channel, `None` if unwired or out of range
    #[inline]
    pub fn get(&self, channel: usize) -> Option<bool> {
        self.pins.get(channel).copied().flatten()
    }

    /// Whether the channel carries a sampled value
    #[inline]
    pub fn is_wired(&self, channel: usize) -> bool {
        self.get(channel).is_some()
    }

    /// Number of channel slots
    pub fn len(&self) -> usize {
        self.pins.len()
    }

    /// Whether the vector has no channel slots
    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    /// Raw pin states
    pub fn as_slice(&self) -> &[Option<bool>] {
        &self.pins
    }
}

impl fmt::Display for PinVector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Pins[")?;
        for pin in &self.pins {
            let c = match pin {
                Some(true) => '1',
                Some(false) => '0',
                None => '-',
            };
            write!(f, "{}", c)?;
        }
        write!(f, "]")
    }
}

/// A block of packed-bit samples from a single probe
///
/// Carries raw packed-bit data directly from DSL file blocks, enabling O(1) bit
/// lookup. All probes in a DSL file share the same block structure, so blocks
/// with the same `start_position` can be walked in lockstep.
///
/// ## Bit Packing Format
///
/// LSB-first within each byte: bit N is at `data[N/8] >> (N%8) & 1`.
/// This matches the DSLogic on-disk format, so blocks are sent with
/// zero transformation from the ZIP archive.
#[derive(Clone, Debug)]
pub struct SampleBlock {
    /// Packed bit data (LSB-first). Shared via Arc so frames clone cheaply.
    pub data: Arc<[u8]>,
    /// Position of the first sample in this block (0-based, global sample index)
    pub start_position: u64,
    /// Number of valid samples in this block (may be < capacity for the last block)
    pub num_samples: usize,
}

impl SampleBlock {
    /// Create a new SampleBlock
    pub fn new(data: Arc<[u8]>, start_position: u64, num_samples: usize) -> Self {
        Self {
            data,
            start_position,
            num_samples,
        }
    }

    /// Pack a slice of levels into a block (mostly useful for synthetic captures)
    pub fn from_levels(levels: &[bool], start_position: u64) -> Self {
        let mut data = vec![0u8; levels.len().div_ceil(8)];
        for (i, &level) in levels.iter().enumerate() {
            if level {
                data[i / 8] |= 1 << (i % 8);
            }
        }
        Self::new(Arc::from(data), start_position, levels.len())
    }

    /// O(1) bit lookup at a global sample position.
    ///
    /// Positions outside `[start_position, end_position)` read as low.
    #[inline]
    pub fn get_bit(&self, position: u64) -> bool {
        if !self.contains(position) {
            return false;
        }
        let local = (position - self.start_position) as usize;
        self.data
            .get(local / 8)
            .is_some_and(|byte| (byte >> (local % 8)) & 1 == 1)
    }

    /// Whether a global sample position falls inside this block
    #[inline]
    pub fn contains(&self, position: u64) -> bool {
        position >= self.start_position && position < self.end_position()
    }

    /// The position one past the last valid sample in this block
    #[inline]
    pub fn end_position(&self) -> u64 {
        self.start_position + self.num_samples as u64
    }
}

impl fmt::Display for SampleBlock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "SampleBlock[start={}, samples={}, bytes={}]",
            self.start_position,
            self.num_samples,
            self.data.len()
        )
    }
}

/// Lockstep blocks for every decoder channel over one position range
///
/// `blocks[channel]` is `None` when the channel is not wired to a probe.
#[derive(Clone, Debug)]
pub struct BlockFrame {
    pub start_position: u64,
    pub num_samples: usize,
    pub blocks: Vec<Option<SampleBlock>>,
}

impl BlockFrame {
    pub fn new(start_position: u64, num_samples: usize, blocks: Vec<Option<SampleBlock>>) -> Self {
        Self {
            start_position,
            num_samples,
            blocks,
        }
    }

    /// The position one past the last sample of this frame
    pub fn end_position(&self) -> u64 {
        self.start_position + self.num_samples as u64
    }

    /// Build the pin vector at a global position inside this frame
    pub fn pins_at(&self, position: u64) -> PinVector {
        PinVector::new(
            self.blocks
                .iter()
                .map(|block| block.as_ref().map(|b| b.get_bit(position)))
                .collect(),
        )
    }
}
