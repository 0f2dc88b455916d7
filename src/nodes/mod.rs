//! Capture sources and the ONFI decoder
//!
//! - **Pin sources**: forward-only streams of pin vectors ([`MemorySource`],
//!   [`BlockSource`])
//! - **Capture reader**: DSLogic `.dsl` archives ([`DslCapture`])
//! - **Decoders**: the ONFI bus decoder and its sinks

pub mod decoders;
pub mod dsl_file;
pub mod pin_source;

pub use dsl_file::{DslCapture, DslHeader};
pub use pin_source::{BlockSource, MemorySource, PinSource};
