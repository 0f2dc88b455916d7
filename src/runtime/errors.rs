//! Error types for the runtime system

use crossbeam_channel::SendError;

/// Error type for channel operations between the capture reader and the decoder
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("Failed to send to output channel: {0}")]
    SendError(String),

    #[error("Sender disconnected without end of stream")]
    Disconnected,

    #[error("End of stream")]
    Shutdown,
}

impl<T> From<SendError<T>> for StreamError {
    fn from(e: SendError<T>) -> Self {
        StreamError::SendError(format!("{}", e))
    }
}

/// Result type for channel operations
pub type StreamResult<T = ()> = Result<T, StreamError>;
