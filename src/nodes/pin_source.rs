//! Forward-only providers of pin vectors
//!
//! The decoder only ever pulls one [`PinVector`] at a time, in stream order,
//! together with its capture sample position. [`MemorySource`] serves
//! vectors held in memory; [`BlockSource`] walks lockstep [`BlockFrame`]s
//! received from a capture reader thread.

use std::collections::VecDeque;

use crate::runtime::{BlockFrame, PinVector, Receiver};
use tracing::{debug, warn};

/// A forward-only stream of pin vectors tagged with their sample position
///
/// Positions strictly increase. A jump of more than one means the samples in
/// between are missing from the stream.
pub trait PinSource {
    /// The next `(position, pins)`, or `None` once the stream is exhausted
    fn next_pins(&mut self) -> Option<(u64, PinVector)>;
}

impl<S: PinSource + ?Sized> PinSource for Box<S> {
    fn next_pins(&mut self) -> Option<(u64, PinVector)> {
        (**self).next_pins()
    }
}

/// Contiguous pin vectors held in memory, starting at position 0
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    samples: VecDeque<PinVector>,
    next_position: u64,
}

impl MemorySource {
    pub fn new(samples: Vec<PinVector>) -> Self {
        Self {
            samples: samples.into(),
            next_position: 0,
        }
    }

    /// Build from per-channel level traces of equal length.
    ///
    /// Channels not listed are unwired.
    pub fn from_traces(num_channels: usize, traces: &[(usize, &[bool])]) -> Self {
        let len = traces.iter().map(|(_, levels)| levels.len()).max().unwrap_or(0);
        let samples = (0..len)
            .map(|i| {
                let mut pins = PinVector::unwired(num_channels);
                for &(channel, levels) in traces {
                    if let Some(&level) = levels.get(i) {
                        pins.set(channel, level);
                    }
                }
                pins
            })
            .collect();
        Self::new(samples)
    }

    pub fn push(&mut self, pins: PinVector) {
        self.samples.push_back(pins);
    }

    pub fn remaining(&self) -> usize {
        self.samples.len()
    }
}

impl PinSource for MemorySource {
    fn next_pins(&mut self) -> Option<(u64, PinVector)> {
        let pins = self.samples.pop_front()?;
        let position = self.next_position;
        self.next_position += 1;
        Some((position, pins))
    }
}

/// Pin vectors decoded from a stream of lockstep block frames
///
/// Blocks while waiting for the next frame; ends on end-of-stream or when
/// the producing side disconnects. A frame starting past the expected
/// position leaves a gap in the reported positions.
pub struct BlockSource {
    frames: Receiver<BlockFrame>,
    current: Option<BlockFrame>,
    position: u64,
    frames_seen: u64,
}

impl BlockSource {
    pub fn new(frames: Receiver<BlockFrame>) -> Self {
        Self {
            frames,
            current: None,
            position: 0,
            frames_seen: 0,
        }
    }

    /// Number of frames received so far
    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    fn advance_frame(&mut self) -> bool {
        match self.frames.recv() {
            Ok(frame) => {
                if frame.start_position > self.position {
                    warn!(
                        "Frame starts at {}, expected {}; {} samples missing",
                        frame.start_position,
                        self.position,
                        frame.start_position - self.position
                    );
                    self.position = frame.start_position;
                } else if frame.start_position < self.position {
                    debug!(
                        "Frame starts at {}, already at {}; skipping overlap",
                        frame.start_position, self.position
                    );
                }
                self.frames_seen += 1;
                self.current = Some(frame);
                true
            }
            Err(_) => {
                debug!(
                    "Frame stream ended after {} frames at position {}",
                    self.frames_seen, self.position
                );
                self.current = None;
                false
            }
        }
    }
}

impl PinSource for BlockSource {
    fn next_pins(&mut self) -> Option<(u64, PinVector)> {
        loop {
            if let Some(frame) = &self.current
                && self.position < frame.end_position()
            {
                let position = self.position;
                self.position += 1;
                return Some((position, frame.pins_at(position)));
            }
            if !self.advance_frame() {
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{SampleBlock, bounded};

    fn frame(start: u64, levels: &[bool]) -> BlockFrame {
        BlockFrame::new(
            start,
            levels.len(),
            vec![Some(SampleBlock::from_levels(levels, start))],
        )
    }

    fn drain(source: &mut impl PinSource) -> Vec<(u64, Option<bool>)> {
        std::iter::from_fn(|| source.next_pins())
            .map(|(position, pins)| (position, pins.get(0)))
            .collect()
    }

    #[test]
    fn test_memory_source_from_traces() {
        let mut source = MemorySource::from_traces(3, &[(0, &[true, false]), (2, &[false, true])]);
        assert_eq!(source.remaining(), 2);
        let (position, pins) = source.next_pins().unwrap();
        assert_eq!(position, 0);
        assert_eq!(pins.as_slice(), &[Some(true), None, Some(false)]);
        let (position, pins) = source.next_pins().unwrap();
        assert_eq!(position, 1);
        assert_eq!(pins.as_slice(), &[Some(false), None, Some(true)]);
        assert!(source.next_pins().is_none());
    }

    #[test]
    fn test_block_source_walks_frames_in_order() {
        let (tx, rx) = bounded::<BlockFrame>(4);
        tx.send(frame(0, &[false, true, true])).unwrap();
        tx.send(frame(3, &[false, true])).unwrap();
        tx.close();

        let mut source = BlockSource::new(rx);
        assert_eq!(
            drain(&mut source),
            vec![
                (0, Some(false)),
                (1, Some(true)),
                (2, Some(true)),
                (3, Some(false)),
                (4, Some(true)),
            ]
        );
        assert_eq!(source.frames_seen(), 2);
    }

    #[test]
    fn test_block_source_reports_capture_positions_after_gap() {
        let (tx, rx) = bounded::<BlockFrame>(4);
        tx.send(frame(0, &[false, false])).unwrap();
        tx.send(frame(10, &[false, true])).unwrap();
        tx.close();

        let mut source = BlockSource::new(rx);
        assert_eq!(
            drain(&mut source),
            vec![(0, Some(false)), (1, Some(false)), (10, Some(false)), (11, Some(true))]
        );
    }

    #[test]
    fn test_block_source_skips_overlap() {
        let (tx, rx) = bounded::<BlockFrame>(4);
        tx.send(frame(0, &[false, false, false])).unwrap();
        tx.send(frame(2, &[true, true])).unwrap();
        tx.close();

        let mut source = BlockSource::new(rx);
        assert_eq!(
            drain(&mut source),
            vec![(0, Some(false)), (1, Some(false)), (2, Some(false)), (3, Some(true))]
        );
    }

    #[test]
    fn test_block_source_ends_on_disconnect() {
        let (tx, rx) = bounded::<BlockFrame>(1);
        drop(tx);
        let mut source = BlockSource::new(rx);
        assert!(source.next_pins().is_none());
    }
}
