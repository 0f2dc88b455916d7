//! Capture session: reader thread, watchdog and decoder wired together
//!
//! The `.dsl` reader runs on its own thread and feeds block frames through a
//! bounded channel; the decoder runs on the calling thread and blocks on that
//! channel. A watchdog thread reports sends or receives blocked for more than
//! five seconds. Each run gets a fresh watchdog.

use super::watchdog::Watchdog;
use crate::nodes::decoders::{DecodeSummary, OnfiDecoder, OutputSink};
use crate::nodes::{BlockSource, DslCapture};
use crate::{OnfiError, Result};
use tracing::{error, info};

/// Default number of frames buffered between reader and decoder
pub const DEFAULT_FRAME_CAPACITY: usize = 16;

pub struct Session {
    capture: DslCapture,
    decoder: OnfiDecoder,
    frame_capacity: usize,
}

impl Session {
    pub fn new(capture: DslCapture, decoder: OnfiDecoder) -> Self {
        Self {
            capture,
            decoder,
            frame_capacity: DEFAULT_FRAME_CAPACITY,
        }
    }

    pub fn with_frame_capacity(mut self, capacity: usize) -> Self {
        self.frame_capacity = capacity.max(1);
        self
    }

    pub fn capture(&self) -> &DslCapture {
        &self.capture
    }

    pub fn decoder(&self) -> &OnfiDecoder {
        &self.decoder
    }

    /// Decode the whole capture into `sink` and join the reader thread.
    ///
    /// The sink is always finished. A reader failure (unreadable block,
    /// panic) is returned after the decoder has drained what was read.
    pub fn run<O: OutputSink>(&mut self, sink: O) -> Result<DecodeSummary> {
        let watchdog = Watchdog::new();
        let watchdog_thread = watchdog.start_monitoring_thread();
        info!("Watchdog enabled - will report operations blocked >5 seconds");

        let (reader, frames) = self
            .capture
            .spawn_reader(self.frame_capacity, Some(&watchdog));

        // Dropping the source at the end of decode disconnects the reader
        let summary = self.decoder.decode(BlockSource::new(frames), sink);

        let outcome = match reader.join() {
            Ok(Ok(samples)) => {
                info!("[session] Reader thread completed ({} samples)", samples);
                Ok(summary)
            }
            Ok(Err(e)) => {
                error!("[session] Reader failed after {} samples: {}", summary.samples, e);
                Err(e)
            }
            Err(e) => {
                error!("[session] Reader thread panicked: {:?}", e);
                Err(OnfiError::ReaderPanicked)
            }
        };

        watchdog.stop();
        let _ = watchdog_thread.join();

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::decoders::channels::{ALE, IO0, NRE};
    use crate::nodes::decoders::{CollectSink, OnfiConfig};
    use crate::nodes::dsl_file::tests::write_capture;

    fn fill(bit: bool) -> u8 {
        if bit { 0xFF } else { 0x00 }
    }

    /// ALE falls at sample 1 with 0x05 on the bus; nRE rises at sample 8
    /// (first sample of the second block) with 0x3C on the bus
    fn boundary_session(tag: &str) -> (Session, std::path::PathBuf) {
        let mut probes = vec![vec![vec![0b0000_0001], vec![0x00]], vec![vec![0x00], vec![0xFF]]];
        for bit in 0..8 {
            probes.push(vec![
                vec![fill((0x05 >> bit) & 1 == 1)],
                vec![fill((0x3C >> bit) & 1 == 1)],
            ]);
        }
        let path = write_capture(tag, 16, &probes);

        let mut capture = DslCapture::open(&path).unwrap();
        capture.assign(ALE, 0).unwrap();
        capture.assign(NRE, 1).unwrap();
        for bit in 0..8 {
            capture.assign(IO0 + bit, 2 + bit).unwrap();
        }

        let decoder = OnfiDecoder::new(OnfiConfig::default()).unwrap();
        (Session::new(capture, decoder).with_frame_capacity(1), path)
    }

    #[test]
    fn test_session_decodes_across_frame_boundary() {
        let (mut session, path) = boundary_session("session");
        let mut sink = CollectSink::new();
        let summary = session.run(&mut sink).unwrap();

        assert_eq!(summary.samples, 16);
        assert_eq!(summary.events, 1);
        assert_eq!(sink.annotations[0].texts[0], "0005:3C");
        assert_eq!((sink.annotations[0].start, sink.annotations[0].end), (1, 8));
        assert_eq!(sink.binary[0].bytes, vec![0x00, 0x05, 0x3C]);
        assert!(sink.finished);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_session_runs_twice() {
        let (mut session, path) = boundary_session("session_twice");
        let mut first = CollectSink::new();
        let mut second = CollectSink::new();
        let a = session.run(&mut first).unwrap();
        let b = session.run(&mut second).unwrap();

        assert_eq!(a, b);
        assert_eq!(first.annotations, second.annotations);
        assert_eq!(first.binary, second.binary);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_session_reports_reader_failure() {
        // Header claims two blocks but ALE has only the first one
        let mut probes = vec![vec![vec![0b0000_0001]], vec![vec![0x00], vec![0xFF]]];
        for _ in 0..8 {
            probes.push(vec![vec![0x00], vec![0x00]]);
        }
        let path = write_capture("session_missing", 16, &probes);

        let mut capture = DslCapture::open(&path).unwrap();
        capture.assign(ALE, 0).unwrap();
        capture.assign(NRE, 1).unwrap();
        let decoder = OnfiDecoder::new(OnfiConfig::default()).unwrap();
        let mut session = Session::new(capture, decoder);

        let mut sink = CollectSink::new();
        let result = session.run(&mut sink);
        assert!(matches!(result, Err(OnfiError::InvalidBlock(1))));
        assert!(sink.finished);
        assert!(sink.annotations.is_empty());
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_session_early_stop_releases_reader() {
        // nRE toggles every sample over many blocks; stop after two events
        let blocks = 20;
        let mut ale = vec![vec![0x00]; blocks];
        ale[0] = vec![0b0000_0001];
        let probes = vec![ale, vec![vec![0xAA]; blocks]];
        let path = write_capture("session_early", 8 * blocks as u64, &probes);

        let mut capture = DslCapture::open(&path).unwrap();
        capture.assign(ALE, 0).unwrap();
        capture.assign(NRE, 1).unwrap();

        let decoder = OnfiDecoder::new(OnfiConfig::default())
            .unwrap()
            .with_max_events(Some(2));
        let mut session = Session::new(capture, decoder).with_frame_capacity(1);
        let mut sink = CollectSink::new();
        let summary = session.run(&mut sink).unwrap();

        assert_eq!(summary.events, 2);
        assert!(summary.samples < 8 * blocks as u64);
        std::fs::remove_file(path).ok();
    }
}
