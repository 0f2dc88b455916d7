//! Output sinks for decoded annotations and binary records

use super::types::{Annotation, BinaryRecord};
use crate::runtime::{Receiver, Sender, StreamResult, bounded};

/// Consumer of decoder output, called synchronously in stream order
pub trait OutputSink {
    fn put_annotation(&mut self, annotation: Annotation);

    fn put_binary(&mut self, record: BinaryRecord);

    /// Called once after the last output of a decode run
    fn finish(&mut self) {}
}

impl<S: OutputSink + ?Sized> OutputSink for &mut S {
    fn put_annotation(&mut self, annotation: Annotation) {
        (**self).put_annotation(annotation)
    }

    fn put_binary(&mut self, record: BinaryRecord) {
        (**self).put_binary(record)
    }

    fn finish(&mut self) {
        (**self).finish()
    }
}

/// Sink that keeps everything in memory
#[derive(Debug, Clone, Default)]
pub struct CollectSink {
    pub annotations: Vec<Annotation>,
    pub binary: Vec<BinaryRecord>,
    pub finished: bool,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputSink for CollectSink {
    fn put_annotation(&mut self, annotation: Annotation) {
        self.annotations.push(annotation);
    }

    fn put_binary(&mut self, record: BinaryRecord) {
        self.binary.push(record);
    }

    fn finish(&mut self) {
        self.finished = true;
    }
}

/// Sink that forwards output to other threads over bounded channels
///
/// `finish()` sends end-of-stream on both channels. A send that finds no
/// receiver left is dropped and counted.
pub struct ChannelSink {
    annotations: Sender<Annotation>,
    binary: Sender<BinaryRecord>,
    dropped: usize,
}

impl ChannelSink {
    /// Create a sink plus the receiving ends for annotations and binary records
    pub fn bounded(capacity: usize) -> (Self, Receiver<Annotation>, Receiver<BinaryRecord>) {
        let (ann_tx, ann_rx) = bounded(capacity);
        let (bin_tx, bin_rx) = bounded(capacity);
        (Self::new(ann_tx, bin_tx), ann_rx, bin_rx)
    }

    pub fn new(annotations: Sender<Annotation>, binary: Sender<BinaryRecord>) -> Self {
        Self {
            annotations,
            binary,
            dropped: 0,
        }
    }

    /// Outputs lost because every receiver had gone
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    fn record(&mut self, result: StreamResult) {
        if let Err(e) = result {
            self.dropped += 1;
            tracing::debug!("ChannelSink dropped output: {}", e);
        }
    }
}

impl OutputSink for ChannelSink {
    fn put_annotation(&mut self, annotation: Annotation) {
        let result = self.annotations.send(annotation);
        self.record(result);
    }

    fn put_binary(&mut self, record: BinaryRecord) {
        let result = self.binary.send(record);
        self.record(result);
    }

    fn finish(&mut self) {
        self.annotations.close();
        self.binary.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::decoders::types::{AnnotationClass, DecodedEvent};

    fn event() -> DecodedEvent {
        DecodedEvent {
            start: 1,
            end: 2,
            address: 0xBEEF,
            data: 0x42,
        }
    }

    #[test]
    fn test_channel_sink_forwards_then_closes() {
        let (mut sink, ann_rx, bin_rx) = ChannelSink::bounded(8);
        sink.put_annotation(Annotation::from_event(&event()));
        sink.put_binary(BinaryRecord::from_event(&event()));
        sink.finish();

        let anns: Vec<_> = ann_rx.collect();
        let bins: Vec<_> = bin_rx.collect();
        assert_eq!(anns.len(), 1);
        assert_eq!(anns[0].class, AnnotationClass::Data);
        assert_eq!(anns[0].texts[0], "BEEF:42");
        assert_eq!(bins[0].bytes, vec![0xBE, 0xEF, 0x42]);
        assert_eq!(sink.dropped(), 0);
    }

    #[test]
    fn test_channel_sink_counts_dropped() {
        let (mut sink, ann_rx, bin_rx) = ChannelSink::bounded(8);
        drop(ann_rx);
        drop(bin_rx);
        sink.put_annotation(Annotation::from_event(&event()));
        sink.put_binary(BinaryRecord::from_event(&event()));
        assert_eq!(sink.dropped(), 2);
    }

    #[test]
    fn test_collect_sink_through_reference() {
        fn feed(mut sink: impl OutputSink) {
            sink.put_annotation(Annotation::from_event(&event()));
            sink.finish();
        }

        let mut sink = CollectSink::new();
        feed(&mut sink);
        assert_eq!(sink.annotations.len(), 1);
        assert!(sink.finished);
    }
}
