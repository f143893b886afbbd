use crate::core::error::MatchError;
use crate::models::{MatchEvent, SessionEvent};
use futures::Stream;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, Notify};

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cooperative cancellation shared between a session and its consumer
#[derive(Debug, Clone, Default)]
pub struct CancellationHandle {
    inner: Arc<CancelInner>,
}

impl CancellationHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once `cancel` has been called
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Create a bounded, ordered event channel for one session
pub fn event_channel(capacity: usize, cancel: CancellationHandle) -> (EventEmitter, EventStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        EventEmitter {
            tx,
            seq: 0,
            cancel: cancel.clone(),
        },
        EventStream { rx, cancel },
    )
}

/// Sending half; assigns sequence numbers in generation order
#[derive(Debug)]
pub struct EventEmitter {
    tx: mpsc::Sender<SessionEvent>,
    seq: u64,
    cancel: CancellationHandle,
}

impl EventEmitter {
    /// Send one event, waiting on backpressure.
    ///
    /// Fails with `SessionCancelled` once the consumer cancelled or went away.
    pub async fn emit(&mut self, event: MatchEvent) -> Result<u64, MatchError> {
        if self.cancel.is_cancelled() {
            return Err(MatchError::SessionCancelled);
        }
        let seq = self.seq + 1;
        let send = self.tx.send(SessionEvent { seq, event });

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(MatchError::SessionCancelled),
            sent = send => match sent {
                Ok(()) => {
                    self.seq = seq;
                    Ok(seq)
                }
                Err(_) => {
                    self.cancel.cancel();
                    Err(MatchError::SessionCancelled)
                }
            },
        }
    }

    /// Best-effort `cancelled` acknowledgement; never waits
    pub fn acknowledge_cancel(&mut self, message: impl Into<String>) -> bool {
        let seq = self.seq + 1;
        let event = SessionEvent {
            seq,
            event: MatchEvent::Cancelled {
                message: message.into(),
            },
        };
        match self.tx.try_send(event) {
            Ok(()) => {
                self.seq = seq;
                true
            }
            Err(_) => false,
        }
    }

    pub fn cancellation(&self) -> CancellationHandle {
        self.cancel.clone()
    }

    pub fn last_seq(&self) -> u64 {
        self.seq
    }
}

/// Receiving half; dropping it cancels the session
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::Receiver<SessionEvent>,
    cancel: CancellationHandle,
}

impl EventStream {
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        self.rx.recv().await
    }

    pub fn cancellation(&self) -> CancellationHandle {
        self.cancel.clone()
    }

    /// Cancel the session; already buffered events can still be drained
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Stream for EventStream {
    type Item = SessionEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
