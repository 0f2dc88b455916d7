//! Channel receiver with cached end-of-stream state
//!
//! [`Receiver`] wraps a `crossbeam_channel::Receiver<ChannelMessage<T>>`.
//! Once end-of-stream or a disconnect has been seen every later `recv`
//! fails immediately, so items sent after `close()` are never delivered.

use crossbeam_channel::Receiver as CrossbeamReceiver;

use super::errors::{StreamError, StreamResult};
use super::sender::ChannelMessage;
use super::watchdog::{OperationGuard, Watchdog, WatchdogHandle};

pub struct Receiver<T> {
    receiver: CrossbeamReceiver<ChannelMessage<T>>,
    watchdog_handle: Option<WatchdogHandle>,
    /// Set by end-of-stream or disconnect
    ended: Option<StreamEnd>,
}

#[derive(Clone, Copy)]
enum StreamEnd {
    Closed,
    Disconnected,
}

impl<T> Receiver<T> {
    pub fn new(receiver: CrossbeamReceiver<ChannelMessage<T>>) -> Self {
        Self {
            receiver,
            watchdog_handle: None,
            ended: None,
        }
    }

    /// Register this receiver with a watchdog
    pub fn with_watchdog(mut self, watchdog: &Watchdog, component: &str, endpoint: &str) -> Self {
        self.watchdog_handle = Some(watchdog.register(component, "recv", endpoint));
        self
    }

    /// Blocking receive.
    ///
    /// Fails with [`StreamError::Shutdown`] after `close()` and with
    /// [`StreamError::Disconnected`] when every sender was dropped without it.
    pub fn recv(&mut self) -> StreamResult<T> {
        if let Some(end) = self.ended {
            return Err(end.error());
        }

        let _guard = self.watchdog_handle.as_ref().map(OperationGuard::new);
        match self.receiver.recv() {
            Ok(ChannelMessage::Item(item)) => Ok(item),
            Ok(ChannelMessage::EndOfStream) => {
                tracing::debug!("End of stream received");
                self.ended = Some(StreamEnd::Closed);
                Err(StreamError::Shutdown)
            }
            Err(_) => {
                tracing::debug!("Sender disconnected without end of stream");
                self.ended = Some(StreamEnd::Disconnected);
                Err(StreamError::Disconnected)
            }
        }
    }
}

impl StreamEnd {
    fn error(self) -> StreamError {
        match self {
            StreamEnd::Closed => StreamError::Shutdown,
            StreamEnd::Disconnected => StreamError::Disconnected,
        }
    }
}

impl<T> Iterator for Receiver<T> {
    type Item = T;

    /// Drains the stream until end-of-stream or disconnect
    fn next(&mut self) -> Option<T> {
        self.recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{PinVector, bounded};

    #[test]
    fn test_items_arrive_in_order() {
        let (tx, mut rx) = bounded::<PinVector>(4);
        tx.send(PinVector::unwired(2).with(0, false)).unwrap();
        tx.send(PinVector::unwired(2).with(0, true)).unwrap();

        assert_eq!(rx.recv().unwrap().get(0), Some(false));
        assert_eq!(rx.recv().unwrap().get(0), Some(true));
    }

    #[test]
    fn test_items_after_close_are_never_delivered() {
        let (tx, rx) = crossbeam_channel::bounded::<ChannelMessage<u64>>(4);
        let mut rx = Receiver::new(rx);
        tx.send(ChannelMessage::Item(7)).unwrap();
        tx.send(ChannelMessage::EndOfStream).unwrap();
        tx.send(ChannelMessage::Item(8)).unwrap();

        assert_eq!(rx.recv().unwrap(), 7);
        assert!(matches!(rx.recv(), Err(StreamError::Shutdown)));
        assert!(matches!(rx.recv(), Err(StreamError::Shutdown)));
    }

    #[test]
    fn test_dropped_sender_reports_disconnect() {
        let (tx, mut rx) = bounded::<u64>(4);
        tx.send(5).unwrap();
        drop(tx);
        assert_eq!(rx.recv().unwrap(), 5);
        assert!(matches!(rx.recv(), Err(StreamError::Disconnected)));
        assert!(matches!(rx.recv(), Err(StreamError::Disconnected)));
    }

    #[test]
    fn test_iterator_stops_at_close() {
        let (tx, rx) = bounded::<u64>(8);
        for position in [3, 9, 12] {
            tx.send(position).unwrap();
        }
        tx.close();
        let positions: Vec<_> = rx.collect();
        assert_eq!(positions, vec![3, 9, 12]);
    }
}
