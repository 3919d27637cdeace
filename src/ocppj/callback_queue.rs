//! Per-peer pending-call queue.
//!
//! OCPP-J allows at most one outstanding CALL per peer. This queue
//! serializes outbound calls: the head entry is "pending" (on the wire,
//! awaiting its CALLRESULT/CALLERROR), later submissions wait in FIFO order
//! and are promoted one at a time as terminal outcomes arrive.
//!
//! Locking discipline: the peer map is read-mostly (`DashMap`); each peer's
//! state sits behind its own mutex. Send closures run under the per-peer
//! lock (they only push onto a transport channel); completion callbacks are
//! always invoked with no lock held.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use dashmap::DashMap;
use thiserror::Error;

use crate::feature::Response;
use crate::support::errors::OcppError;

/// Terminal outcome of a call: the peer's typed confirmation, or an error
/// (CALLERROR, send failure, cancellation).
pub type CallOutcome = Result<Response, OcppError>;

/// Completion callback for an outbound call. Invoked exactly once.
pub type CallCallback = Box<dyn FnOnce(CallOutcome) + Send + 'static>;

/// Deferred transport write for a queued call.
pub(crate) type SendFn = Box<dyn FnOnce() -> Result<(), OcppError> + Send + 'static>;

/// A call that is on the wire, awaiting its response.
pub(crate) struct PendingCall {
    pub unique_id: String,
    pub action: &'static str,
    pub callback: CallCallback,
    pub sent_at: Instant,
}

struct QueuedEntry {
    unique_id: String,
    action: &'static str,
    send: SendFn,
    callback: CallCallback,
}

#[derive(Default)]
struct PeerQueue {
    pending: Option<PendingCall>,
    waiting: VecDeque<QueuedEntry>,
    /// Set when this peer's entry was removed from the map; an operation
    /// holding a stale handle must re-fetch instead of touching it.
    detached: bool,
}

/// Failed promotions collected under the lock, dispatched after release.
type FailedSends = Vec<(CallCallback, OcppError)>;

fn advance(queue: &mut PeerQueue) -> FailedSends {
    let mut failed = Vec::new();
    while let Some(entry) = queue.waiting.pop_front() {
        match (entry.send)() {
            Ok(()) => {
                queue.pending = Some(PendingCall {
                    unique_id: entry.unique_id,
                    action: entry.action,
                    callback: entry.callback,
                    sent_at: Instant::now(),
                });
                break;
            }
            Err(e) => failed.push((entry.callback, e)),
        }
    }
    failed
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("callback queue is shut down")]
    ShutDown,
}

/// FIFO callback queue per peer id.
pub(crate) struct CallbackQueue {
    peers: DashMap<String, Arc<Mutex<PeerQueue>>>,
    shut_down: AtomicBool,
}

impl CallbackQueue {
    pub fn new() -> Self {
        Self {
            peers: DashMap::new(),
            shut_down: AtomicBool::new(false),
        }
    }

    fn slot(&self, peer_id: &str) -> Option<Arc<Mutex<PeerQueue>>> {
        self.peers.get(peer_id).map(|entry| entry.value().clone())
    }

    /// Append a call for `peer_id`. If the peer has no pending call, the
    /// send closure runs immediately and the entry becomes pending; a send
    /// failure is delivered through the entry's own callback and the next
    /// waiting entry (if any) is promoted.
    ///
    /// Returns `Err` only when the queue has been shut down. A send failure
    /// is still an accepted call: its callback has fired.
    pub fn try_queue(
        &self,
        peer_id: &str,
        unique_id: String,
        action: &'static str,
        send: SendFn,
        callback: CallCallback,
    ) -> Result<(), QueueError> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(QueueError::ShutDown);
        }
        let failed = loop {
            let slot = {
                let entry = self.peers.entry(peer_id.to_string()).or_default();
                entry.value().clone()
            };
            let mut queue = slot.lock().unwrap();
            if queue.detached {
                // Lost a race with dequeue_all; the map entry is fresh now.
                continue;
            }
            if self.shut_down.load(Ordering::SeqCst) {
                return Err(QueueError::ShutDown);
            }
            queue.waiting.push_back(QueuedEntry {
                unique_id,
                action,
                send,
                callback,
            });
            if queue.pending.is_none() {
                break advance(&mut queue);
            }
            break Vec::new();
        };
        for (callback, error) in failed {
            callback(Err(error));
        }
        Ok(())
    }

    /// Pop the pending call for `peer_id` if its id matches `unique_id`,
    /// promoting the next waiting entry. A missing or mismatched pending
    /// call returns `None` and leaves the queue untouched (the response is
    /// an orphan).
    pub fn dequeue(&self, peer_id: &str, unique_id: &str) -> Option<PendingCall> {
        let slot = self.slot(peer_id)?;
        let (pending, failed) = {
            let mut queue = slot.lock().unwrap();
            if queue.detached {
                return None;
            }
            let matched = queue
                .pending
                .as_ref()
                .is_some_and(|p| p.unique_id == unique_id);
            if !matched {
                return None;
            }
            let Some(pending) = queue.pending.take() else {
                return None;
            };
            let failed = advance(&mut queue);
            (pending, failed)
        };
        for (callback, error) in failed {
            callback(Err(error));
        }
        Some(pending)
    }

    /// Remove a specific call, pending or still waiting. Used for per-call
    /// cancellation (timeouts). Promotes the next entry when the cancelled
    /// call was pending.
    pub fn cancel(&self, peer_id: &str, unique_id: &str) -> Option<CallCallback> {
        let slot = self.slot(peer_id)?;
        let (callback, failed) = {
            let mut queue = slot.lock().unwrap();
            if queue.detached {
                return None;
            }
            if queue
                .pending
                .as_ref()
                .is_some_and(|p| p.unique_id == unique_id)
            {
                let Some(pending) = queue.pending.take() else {
                    return None;
                };
                let failed = advance(&mut queue);
                (pending.callback, failed)
            } else if let Some(pos) = queue
                .waiting
                .iter()
                .position(|entry| entry.unique_id == unique_id)
            {
                let Some(entry) = queue.waiting.remove(pos) else {
                    return None;
                };
                (entry.callback, Vec::new())
            } else {
                return None;
            }
        };
        for (callback, error) in failed {
            callback(Err(error));
        }
        Some(callback)
    }

    /// Drain pending + waiting callbacks for `peer_id` in FIFO order and
    /// clear its state. A subsequent `try_queue` re-initializes the peer
    /// fresh; draining an already-drained peer returns an empty vec.
    pub fn dequeue_all(&self, peer_id: &str) -> Vec<(String, CallCallback)> {
        let Some((_, slot)) = self.peers.remove(peer_id) else {
            return Vec::new();
        };
        let mut queue = slot.lock().unwrap();
        queue.detached = true;
        let mut drained = Vec::new();
        if let Some(pending) = queue.pending.take() {
            drained.push((pending.unique_id, pending.callback));
        }
        for entry in queue.waiting.drain(..) {
            drained.push((entry.unique_id, entry.callback));
        }
        drained
    }

    /// Drain every peer and reject all future `try_queue` calls.
    pub fn shutdown(&self) -> Vec<(String, String, CallCallback)> {
        self.shut_down.store(true, Ordering::SeqCst);
        let peer_ids: Vec<String> = self.peers.iter().map(|entry| entry.key().clone()).collect();
        let mut drained = Vec::new();
        for peer_id in peer_ids {
            for (unique_id, callback) in self.dequeue_all(&peer_id) {
                drained.push((peer_id.clone(), unique_id, callback));
            }
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_callback() -> CallCallback {
        Box::new(|_| {})
    }

    fn recording_callback(log: &Arc<Mutex<Vec<String>>>, tag: &str) -> CallCallback {
        let log = log.clone();
        let tag = tag.to_string();
        Box::new(move |outcome| {
            let suffix = match outcome {
                Ok(_) => "ok",
                Err(e) => e.code.as_str(),
            };
            log.lock().unwrap().push(format!("{tag}:{suffix}"));
        })
    }

    fn ok_send(wire: &Arc<Mutex<Vec<String>>>, frame: &str) -> SendFn {
        let wire = wire.clone();
        let frame = frame.to_string();
        Box::new(move || {
            wire.lock().unwrap().push(frame);
            Ok(())
        })
    }

    fn failing_send(message: &str) -> SendFn {
        let message = message.to_string();
        Box::new(move || Err(OcppError::generic(message)))
    }

    fn heartbeat_response() -> Response {
        Response::Heartbeat(rust_ocpp::v1_6::messages::heart_beat::HeartbeatResponse {
            current_time: chrono::Utc::now(),
        })
    }

    #[test]
    fn first_call_sends_immediately() {
        let queue = CallbackQueue::new();
        let wire = Arc::new(Mutex::new(Vec::new()));
        queue
            .try_queue("cp1", "1".into(), "Heartbeat", ok_send(&wire, "f1"), noop_callback())
            .unwrap();
        assert_eq!(*wire.lock().unwrap(), vec!["f1"]);
    }

    #[test]
    fn at_most_one_in_flight_and_fifo_dispatch() {
        let queue = CallbackQueue::new();
        let wire = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::new(Mutex::new(Vec::new()));

        for i in 1..=3 {
            queue
                .try_queue(
                    "cp1",
                    i.to_string(),
                    "Heartbeat",
                    ok_send(&wire, &format!("f{i}")),
                    recording_callback(&log, &format!("cb{i}")),
                )
                .unwrap();
        }
        // Only the first frame is on the wire.
        assert_eq!(*wire.lock().unwrap(), vec!["f1"]);

        let pending = queue.dequeue("cp1", "1").unwrap();
        assert_eq!(pending.unique_id, "1");
        (pending.callback)(Ok(heartbeat_response()));
        assert_eq!(*wire.lock().unwrap(), vec!["f1", "f2"]);

        let pending = queue.dequeue("cp1", "2").unwrap();
        (pending.callback)(Ok(heartbeat_response()));
        let pending = queue.dequeue("cp1", "3").unwrap();
        (pending.callback)(Ok(heartbeat_response()));

        assert_eq!(*wire.lock().unwrap(), vec!["f1", "f2", "f3"]);
        assert_eq!(*log.lock().unwrap(), vec!["cb1:ok", "cb2:ok", "cb3:ok"]);
    }

    #[test]
    fn send_failure_fails_that_call_and_promotes_next() {
        let queue = CallbackQueue::new();
        let wire = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::new(Mutex::new(Vec::new()));

        // Occupy the wire, then queue a failing entry and a healthy one.
        queue
            .try_queue("cp1", "1".into(), "Heartbeat", ok_send(&wire, "f1"), noop_callback())
            .unwrap();
        queue
            .try_queue(
                "cp1",
                "2".into(),
                "Heartbeat",
                failing_send("boom"),
                recording_callback(&log, "cb2"),
            )
            .unwrap();
        queue
            .try_queue(
                "cp1",
                "3".into(),
                "Heartbeat",
                ok_send(&wire, "f3"),
                recording_callback(&log, "cb3"),
            )
            .unwrap();

        // Completing #1 skips the failing #2 (its callback fires with the
        // send error) and puts #3 on the wire.
        let pending = queue.dequeue("cp1", "1").unwrap();
        (pending.callback)(Ok(heartbeat_response()));
        assert_eq!(*log.lock().unwrap(), vec!["cb2:GenericError"]);
        assert_eq!(*wire.lock().unwrap(), vec!["f1", "f3"]);
        assert!(queue.dequeue("cp1", "3").is_some());
    }

    #[test]
    fn mismatched_response_id_is_orphan() {
        let queue = CallbackQueue::new();
        let wire = Arc::new(Mutex::new(Vec::new()));
        queue
            .try_queue("cp1", "7".into(), "Heartbeat", ok_send(&wire, "f"), noop_callback())
            .unwrap();
        assert!(queue.dequeue("cp1", "8").is_none());
        assert!(queue.dequeue("unknown-peer", "7").is_none());
        // The real response still correlates.
        assert!(queue.dequeue("cp1", "7").is_some());
    }

    #[test]
    fn dequeue_all_drains_fifo_then_reinitializes() {
        let queue = CallbackQueue::new();
        let wire = Arc::new(Mutex::new(Vec::new()));
        for i in 1..=3 {
            queue
                .try_queue(
                    "cp1",
                    i.to_string(),
                    "Heartbeat",
                    ok_send(&wire, &format!("f{i}")),
                    noop_callback(),
                )
                .unwrap();
        }
        let drained = queue.dequeue_all("cp1");
        let ids: Vec<&str> = drained.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);

        // Idempotent: second drain is a no-op.
        assert!(queue.dequeue_all("cp1").is_empty());

        // The peer starts fresh afterwards.
        queue
            .try_queue("cp1", "9".into(), "Heartbeat", ok_send(&wire, "f9"), noop_callback())
            .unwrap();
        assert_eq!(wire.lock().unwrap().last().unwrap(), "f9");
    }

    #[test]
    fn cancel_pending_promotes_next() {
        let queue = CallbackQueue::new();
        let wire = Arc::new(Mutex::new(Vec::new()));
        queue
            .try_queue("cp1", "1".into(), "Heartbeat", ok_send(&wire, "f1"), noop_callback())
            .unwrap();
        queue
            .try_queue("cp1", "2".into(), "Heartbeat", ok_send(&wire, "f2"), noop_callback())
            .unwrap();

        let callback = queue.cancel("cp1", "1").unwrap();
        callback(Err(OcppError::generic("timed out")));
        assert_eq!(*wire.lock().unwrap(), vec!["f1", "f2"]);
        // The cancelled call's late response is now an orphan.
        assert!(queue.dequeue("cp1", "1").is_none());
        assert!(queue.dequeue("cp1", "2").is_some());
    }

    #[test]
    fn cancel_waiting_entry_without_touching_pending() {
        let queue = CallbackQueue::new();
        let wire = Arc::new(Mutex::new(Vec::new()));
        queue
            .try_queue("cp1", "1".into(), "Heartbeat", ok_send(&wire, "f1"), noop_callback())
            .unwrap();
        queue
            .try_queue("cp1", "2".into(), "Heartbeat", ok_send(&wire, "f2"), noop_callback())
            .unwrap();

        assert!(queue.cancel("cp1", "2").is_some());
        assert!(queue.cancel("cp1", "2").is_none());
        // Pending #1 is untouched and #2 never hits the wire.
        assert!(queue.dequeue("cp1", "1").is_some());
        assert_eq!(*wire.lock().unwrap(), vec!["f1"]);
    }

    #[test]
    fn shutdown_drains_all_peers_and_rejects_new_calls() {
        let queue = CallbackQueue::new();
        let wire = Arc::new(Mutex::new(Vec::new()));
        queue
            .try_queue("cp1", "1".into(), "Heartbeat", ok_send(&wire, "a"), noop_callback())
            .unwrap();
        queue
            .try_queue("cp2", "1".into(), "Heartbeat", ok_send(&wire, "b"), noop_callback())
            .unwrap();

        let drained = queue.shutdown();
        assert_eq!(drained.len(), 2);

        let err = queue
            .try_queue("cp3", "1".into(), "Heartbeat", ok_send(&wire, "c"), noop_callback())
            .unwrap_err();
        assert_eq!(err, QueueError::ShutDown);
    }
}
