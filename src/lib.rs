//! ONFI NAND flash bus decoder for logic analyzer captures
//!
//! This library reconstructs `(address, data)` transactions from sampled ONFI
//! bus signals: every falling ALE latches an address, every rising nRE latches
//! a data byte and emits one event pairing it with the latest address.
//!
//! # Architecture
//!
//! - **OnfiDecoder**: single-pass decode loop over a [`PinSource`]
//! - **DslCapture**: streams DSLogic `.dsl` captures as lockstep block frames
//! - **Session**: reader thread + watchdog + decoder on the calling thread
//! - **Sinks**: annotations and 3-byte binary records, collected in memory or
//!   forwarded over crossbeam channels
//!
//! # Example
//!
//! ```no_run
//! use onfi::nodes::decoders::channels::{ALE, IO0, NRE};
//! use onfi::{CollectSink, DslCapture, OnfiConfig, OnfiDecoder, Session};
//!
//! let mut capture = DslCapture::open("capture.dsl")?;
//! capture.assign(ALE, 0)?;
//! capture.assign(NRE, 1)?;
//! for bit in 0..8 {
//!     capture.assign(IO0 + bit, 2 + bit)?;
//! }
//!
//! let decoder = OnfiDecoder::new(OnfiConfig::default())?;
//! let mut sink = CollectSink::new();
//! let summary = Session::new(capture, decoder).run(&mut sink)?;
//! println!("{} transactions", summary.events);
//! # Ok::<(), onfi::OnfiError>(())
//! ```

use thiserror::Error;

pub mod nodes;
pub mod runtime;

// Re-export decoder data types
pub use nodes::decoders::{
    Annotation, AnnotationClass, BinaryRecord, BusLayout, ConfigError, DataRateMode,
    DecodeSummary, DecodedEvent, EdgeCondition, OnfiConfig, OnfiVersion, Transition, WordSize,
};

// Re-export the decoder and its sinks
pub use nodes::decoders::{ChannelSink, CollectSink, OnfiDecoder, OutputSink};

// Re-export sources
pub use nodes::{BlockSource, DslCapture, DslHeader, MemorySource, PinSource};

// Re-export runtime components
pub use runtime::{BlockFrame, PinVector, SampleBlock, Session};

#[derive(Error, Debug)]
pub enum OnfiError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Header parsing error: {0}")]
    ParseHeader(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid probe number: {0}")]
    InvalidProbe(usize),

    #[error("Invalid block number: {0}")]
    InvalidBlock(u64),

    #[error("Capture reader thread panicked")]
    ReaderPanicked,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, OnfiError>;
