//! ONFI NAND bus decoder
//!
//! The decoder waits for two conditions on the pin stream (address latch and
//! data strobe), reconstructs `(address, data)` pairs and writes them to an
//! [`OutputSink`].

pub mod channels;
pub mod config;
pub mod edge_waiter;
pub mod metadata;
pub mod onfi_decoder;
pub mod sink;
pub mod types;

pub use channels::{BusLayout, CHANNELS, ChannelInfo, OPTIONAL_CHANNELS};
pub use config::{ConfigError, DataRateMode, OPTIONS, OnfiConfig, OnfiVersion, WordSize};
pub use edge_waiter::{EdgeWaiter, WaitMatch};
pub use metadata::{ANNOTATIONS, BINARY_CLASSES, DECODER_INFO};
pub use onfi_decoder::{DecodeSummary, OnfiDecoder, ReconstructorState};
pub use sink::{ChannelSink, CollectSink, OutputSink};
pub use types::{
    Annotation, AnnotationClass, BinaryRecord, DecodedEvent, EdgeCondition, LatchedValue,
    Transition,
};
