//! Sender half of the watched frame/output channels

use crossbeam_channel::Sender as CrossbeamSender;

use super::errors::StreamResult;
use super::receiver::Receiver;
use super::watchdog::{OperationGuard, Watchdog, WatchdogHandle};

/// Channel message wrapper for end-of-stream signaling
///
/// Producers call [`Sender::close`] once they are done so the consumer sees an
/// explicit end of stream even while cloned sender handles are still alive.
/// `Sender::send()` wraps values in `Item(T)` and `Receiver::recv()` unwraps
/// them, so callers never see this enum directly.
#[derive(Clone, Debug)]
pub enum ChannelMessage<T> {
    Item(T),
    EndOfStream,
}

/// Create a bounded channel pair
pub fn bounded<T>(capacity: usize) -> (Sender<T>, Receiver<T>) {
    let (tx, rx) = crossbeam_channel::bounded(capacity);
    (Sender::new(tx), Receiver::new(rx))
}

pub struct Sender<T> {
    inner: CrossbeamSender<ChannelMessage<T>>,
    watchdog_handle: Option<WatchdogHandle>,
}

impl<T> Sender<T> {
    pub fn new(inner: CrossbeamSender<ChannelMessage<T>>) -> Self {
        Self {
            inner,
            watchdog_handle: None,
        }
    }

    /// Register this sender with a watchdog
    pub fn with_watchdog(mut self, watchdog: &Watchdog, component: &str, endpoint: &str) -> Self {
        self.watchdog_handle = Some(watchdog.register(component, "send", endpoint));
        self
    }

    /// Blocking send; fails once the receiver is gone
    pub fn send(&self, value: T) -> StreamResult {
        let _guard = self.watchdog_handle.as_ref().map(OperationGuard::new);
        self.inner
            .send(ChannelMessage::Item(value))
            .map_err(Into::into)
    }

    /// Signal end-of-stream
    pub fn close(&self) {
        let _guard = self.watchdog_handle.as_ref().map(OperationGuard::new);
        let _ = self.inner.send(ChannelMessage::EndOfStream);
    }
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            watchdog_handle: self.watchdog_handle.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::StreamError;

    #[test]
    fn test_close_reaches_receiver_while_clone_alive() {
        let (tx, mut rx) = bounded::<u32>(4);
        let other = tx.clone();
        tx.send(7).unwrap();
        tx.close();

        assert_eq!(rx.recv().unwrap(), 7);
        assert!(matches!(rx.recv(), Err(StreamError::Shutdown)));
        drop(other);
    }

    #[test]
    fn test_send_fails_when_receiver_gone() {
        let (tx, rx) = bounded::<u32>(4);
        drop(rx);
        assert!(matches!(tx.send(1), Err(StreamError::SendError(_))));
    }
}
