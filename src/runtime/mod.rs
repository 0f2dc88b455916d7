//! Runtime support: sample storage, watched channels and the capture session

pub mod errors;
pub mod receiver;
pub mod sample;
pub mod sender;
pub mod session;
pub mod watchdog;

pub use errors::{StreamError, StreamResult};
pub use receiver::Receiver;
pub use sample::{BlockFrame, PinVector, SampleBlock};
pub use sender::{ChannelMessage, Sender, bounded};
pub use session::Session;
pub use watchdog::Watchdog;
