use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, TryRecvError};
use serde::{Deserialize, Serialize};

use crate::error::{ExecutionError, PilotError, PilotResult};

use super::bus::{dispatching_sequence, ListenerId, Subscription, SubscriptionBus};

/// One observed store change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNotice {
    /// Sequence number of the publish that produced this notice (1-based).
    ///
    /// Strictly increasing within a stream, unless a listener publishes from
    /// inside a notification.
    pub sequence: u64,
    /// When the listener observed the change.
    pub observed_at: DateTime<Utc>,
}

/// A bounded stream of change notices for observers on other threads.
///
/// Publishers never block on a slow stream: notices that do not fit are
/// dropped and counted. Dropping this stream unsubscribes it.
#[derive(Debug)]
pub struct ChangeStream {
    rx: Receiver<ChangeNotice>,
    subscription: Subscription,
    dropped: Arc<AtomicU64>,
}

impl ChangeStream {
    pub(crate) fn attach(bus: &SubscriptionBus, capacity: usize) -> Self {
        let (tx, rx) = bounded::<ChangeNotice>(capacity.max(1));
        let dropped = Arc::new(AtomicU64::new(0));

        let key = bus.dispatch_key();
        let listener_dropped = Arc::clone(&dropped);
        let subscription = bus.subscribe(move || {
            let Some(sequence) = dispatching_sequence(key) else {
                return;
            };
            let notice = ChangeNotice {
                sequence,
                observed_at: Utc::now(),
            };
            if tx.try_send(notice).is_err() {
                listener_dropped.fetch_add(1, Ordering::Relaxed);
            }
        });

        Self {
            rx,
            subscription,
            dropped,
        }
    }

    /// The bus registration backing this stream.
    #[must_use]
    pub const fn listener_id(&self) -> ListenerId {
        self.subscription.id()
    }

    /// Notices discarded because the stream was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Explicit unregistration. Idempotent.
    ///
    /// Notices already queued remain readable; afterwards the stream reports
    /// disconnection.
    pub fn unsubscribe(&self) {
        self.subscription.unsubscribe();
    }

    /// Receive the next notice (blocking).
    pub fn recv(&self) -> PilotResult<ChangeNotice> {
        self.rx.recv().map_err(|_| disconnected())
    }

    /// Receive the next notice with a timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> PilotResult<ChangeNotice> {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => timed_out(timeout),
            RecvTimeoutError::Disconnected => disconnected(),
        })
    }

    /// Take a queued notice without waiting.
    pub fn try_recv(&self) -> PilotResult<Option<ChangeNotice>> {
        match self.rx.try_recv() {
            Ok(notice) => Ok(Some(notice)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(disconnected()),
        }
    }
}

fn timed_out(timeout: Duration) -> PilotError {
    PilotError::Execution(ExecutionError::Timeout {
        duration_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
    })
}

fn disconnected() -> PilotError {
    PilotError::Execution(ExecutionError::Disconnected {
        path: "change_stream".to_string(),
    })
}

impl Drop for ChangeStream {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_receives_sequenced_notices() {
        let bus = SubscriptionBus::new();
        let stream = bus.watch(8);

        bus.publish();
        bus.publish();

        assert_eq!(stream.recv().unwrap().sequence, 1);
        assert_eq!(stream.recv_timeout(Duration::from_millis(100)).unwrap().sequence, 2);
        assert!(stream.try_recv().unwrap().is_none());
    }

    #[test]
    fn full_stream_drops_without_blocking() {
        let bus = SubscriptionBus::new();
        let stream = bus.watch(1);

        bus.publish();
        bus.publish();
        bus.publish();

        assert_eq!(stream.dropped(), 2);
        assert_eq!(stream.recv().unwrap().sequence, 1);
    }

    #[test]
    fn recv_timeout_reports_timeout() {
        let bus = SubscriptionBus::new();
        let stream = bus.watch(1);
        let err = stream.recv_timeout(Duration::from_millis(10)).unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn timeout_error_saturates_duration() {
        assert!(matches!(
            timed_out(Duration::from_millis(250)),
            PilotError::Execution(ExecutionError::Timeout { duration_ms: 250 })
        ));
        assert!(matches!(
            timed_out(Duration::MAX),
            PilotError::Execution(ExecutionError::Timeout { duration_ms }) if duration_ms == u64::MAX
        ));
    }

    #[test]
    fn shared_bus_numbers_each_publish_once() {
        let bus = SubscriptionBus::new();
        let _slow = bus.subscribe(|| std::thread::sleep(Duration::from_micros(200)));
        let stream = bus.watch(1024);

        let publishers: Vec<_> = (0..2)
            .map(|_| {
                let bus = bus.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        bus.publish();
                    }
                })
            })
            .collect();
        for p in publishers {
            p.join().unwrap();
        }

        let mut sequences = Vec::new();
        while let Some(notice) = stream.try_recv().unwrap() {
            sequences.push(notice.sequence);
        }
        assert_eq!(sequences, (1..=200).collect::<Vec<u64>>());
    }

    #[test]
    fn unsubscribe_disconnects_after_drain() {
        let bus = SubscriptionBus::new();
        let stream = bus.watch(4);
        bus.publish();

        stream.unsubscribe();
        assert_eq!(bus.listener_count(), 0);
        assert!(stream.try_recv().unwrap().is_some());
        assert!(stream.try_recv().is_err());
    }

    #[test]
    fn drop_unregisters() {
        let bus = SubscriptionBus::new();
        {
            let _stream = bus.watch(4);
            assert_eq!(bus.listener_count(), 1);
        }
        assert_eq!(bus.listener_count(), 0);
    }
}
