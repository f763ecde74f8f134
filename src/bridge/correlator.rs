//! Request/response correlation by request kind.
//!
//! The client protocol has no mandatory request id, so pending requests are
//! keyed by [`RequestKind`]: at most one slot per kind. Issuing a request
//! replaces any unresolved slot of the same kind, and only the newest slot
//! can ever be resolved. Concurrent callers of one kind race; the losers
//! observe [`Error::Timeout`].
//!
//! Each slot also carries a generated [`RequestId`] that is sent as
//! `requestId`. A response echoing a different id is stale and is dropped;
//! a response without one resolves whatever slot is pending for its kind.
//!
//! # Slot lifecycle
//!
//! ```text
//! IDLE ──request()──► AWAITING_RESPONSE ──complete()──► RESOLVED
//!                            │
//!                            └──deadline / superseded──► TIMED_OUT
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::protocol::{OutboundMessage, Reply, RequestKind};
use crate::transport::ConnectionRegistry;

// ============================================================================
// Types
// ============================================================================

/// A pending request awaiting its response.
struct Slot {
    request_id: RequestId,
    response_tx: oneshot::Sender<Reply>,
}

/// Map of request kinds to their single pending slot.
type SlotTable = FxHashMap<RequestKind, Slot>;

// ============================================================================
// RequestCorrelator
// ============================================================================

/// Matches outgoing requests to inbound responses.
///
/// Written from caller context (install, timeout cleanup) and from the
/// dispatcher (resolve), always under one mutex that is never held across
/// an await.
#[derive(Default)]
pub struct RequestCorrelator {
    slots: Mutex<SlotTable>,
}

impl RequestCorrelator {
    /// Creates an empty correlator.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends a request over the current connection and waits for its reply.
    ///
    /// `build` receives the generated request id and returns the frame to
    /// send.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] immediately if no connection is registered
    /// - [`Error::Timeout`] if no response arrives within `deadline`, or the
    ///   slot is superseded by a newer request of the same kind
    ///
    /// Malformed responses never reach this call; the dispatcher drops them
    /// and the slot keeps waiting.
    pub async fn request<F>(
        &self,
        registry: &ConnectionRegistry,
        kind: RequestKind,
        build: F,
        deadline: Duration,
    ) -> Result<Reply>
    where
        F: FnOnce(RequestId) -> OutboundMessage,
    {
        let connection = registry.current().ok_or(Error::NotConnected)?;

        let request_id = RequestId::generate();
        let text = build(request_id).to_text()?;

        let response_rx = self.install(kind, request_id);

        debug!(kind = %kind, %request_id, connection = %connection.id(), "Sending request");
        if let Err(e) = connection.send(text).await {
            self.remove_if_current(kind, request_id);
            return Err(e);
        }

        let started = Instant::now();

        match timeout(deadline, response_rx).await {
            Ok(Ok(reply)) => {
                trace!(kind = %kind, %request_id, "Request resolved");
                Ok(reply)
            }
            Ok(Err(_)) => {
                let waited_ms = millis(started.elapsed());
                debug!(
                    kind = %kind,
                    %request_id,
                    waited_ms,
                    "Request superseded by a newer one of the same kind"
                );
                Err(Error::timeout(kind.as_str(), waited_ms))
            }
            Err(_) => {
                self.remove_if_current(kind, request_id);
                let timeout_ms = millis(deadline);
                warn!(kind = %kind, %request_id, timeout_ms, "Request timed out");
                Err(Error::timeout(kind.as_str(), timeout_ms))
            }
        }
    }

    /// Resolves the pending slot for `kind`.
    ///
    /// Called only by the dispatcher. Returns `true` if a waiting caller
    /// received the reply. With no slot pending, or when `request_id`
    /// names a different request, the reply is dropped.
    pub fn complete(
        &self,
        kind: RequestKind,
        request_id: Option<RequestId>,
        reply: Reply,
    ) -> bool {
        let slot = {
            let mut slots = self.slots.lock();

            match (slots.get(&kind), request_id) {
                (None, _) => {
                    debug!(kind = %kind, "No request waiting, response dropped");
                    return false;
                }
                (Some(slot), Some(echoed)) if slot.request_id != echoed => {
                    warn!(
                        kind = %kind,
                        %echoed,
                        pending = %slot.request_id,
                        "Stale response dropped"
                    );
                    return false;
                }
                _ => slots.remove(&kind),
            }
        };

        match slot {
            Some(slot) => {
                let delivered = slot.response_tx.send(reply).is_ok();
                trace!(kind = %kind, request_id = %slot.request_id, delivered, "Slot resolved");
                delivered
            }
            None => false,
        }
    }

    /// Returns `true` if a request of `kind` is awaiting a response.
    #[must_use]
    pub fn is_pending(&self, kind: RequestKind) -> bool {
        self.slots.lock().contains_key(&kind)
    }

    /// Returns the number of pending slots.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.slots.lock().len()
    }

    /// Installs a fresh slot, replacing any unresolved one of the same kind.
    fn install(&self, kind: RequestKind, request_id: RequestId) -> oneshot::Receiver<Reply> {
        let (response_tx, response_rx) = oneshot::channel();

        let replaced = self.slots.lock().insert(
            kind,
            Slot {
                request_id,
                response_tx,
            },
        );

        if let Some(old) = replaced {
            debug!(
                kind = %kind,
                replaced = %old.request_id,
                %request_id,
                "Overwriting unresolved request slot"
            );
        }

        response_rx
    }

    /// Removes the slot for `kind` only if it still belongs to `request_id`.
    fn remove_if_current(&self, kind: RequestKind, request_id: RequestId) {
        let mut slots = self.slots.lock();
        if slots
            .get(&kind)
            .is_some_and(|slot| slot.request_id == request_id)
        {
            slots.remove(&kind);
        }
    }
}

/// Milliseconds in `duration`, saturating at `u64::MAX`.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use serde_json::Value;
    use tokio::sync::mpsc;

    use crate::protocol::{InventorySnapshot, TransferResult};
    use crate::transport::Connection;

    struct Harness {
        correlator: Arc<RequestCorrelator>,
        registry: Arc<ConnectionRegistry>,
        outbound: mpsc::Receiver<String>,
    }

    fn harness() -> Harness {
        let registry = Arc::new(ConnectionRegistry::new());
        let (connection, outbound) = Connection::detached(8);
        registry.attach(connection);
        Harness {
            correlator: Arc::new(RequestCorrelator::new()),
            registry,
            outbound,
        }
    }

    fn spawn_ping(
        h: &Harness,
        deadline: Duration,
    ) -> tokio::task::JoinHandle<Result<Reply>> {
        let correlator = Arc::clone(&h.correlator);
        let registry = Arc::clone(&h.registry);
        tokio::spawn(async move {
            correlator
                .request(&registry, RequestKind::Pong, OutboundMessage::ping, deadline)
                .await
        })
    }

    /// Waits for the next outbound frame and returns its `requestId`.
    async fn next_request_id(h: &mut Harness) -> RequestId {
        let text = h.outbound.recv().await.expect("frame sent");
        let value: Value = serde_json::from_str(&text).unwrap();
        RequestId::parse(value["requestId"].as_str().unwrap()).unwrap()
    }

    fn inventory() -> Reply {
        Reply::Inventory(InventorySnapshot::default())
    }

    #[tokio::test]
    async fn test_not_connected_fails_immediately() {
        let correlator = RequestCorrelator::new();
        let registry = ConnectionRegistry::new();

        let started = Instant::now();
        let result = correlator
            .request(
                &registry,
                RequestKind::Pong,
                OutboundMessage::ping,
                Duration::from_secs(10),
            )
            .await;

        assert!(matches!(result, Err(Error::NotConnected)));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(correlator.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_response_resolves_waiting_request() {
        let mut h = harness();
        let task = spawn_ping(&h, Duration::from_secs(5));

        next_request_id(&mut h).await;
        assert!(h.correlator.is_pending(RequestKind::Pong));
        assert!(h.correlator.complete(RequestKind::Pong, None, inventory()));

        let reply = task.await.unwrap().unwrap();
        assert_eq!(reply, Reply::Inventory(InventorySnapshot::default()));
        assert!(!h.correlator.is_pending(RequestKind::Pong));
    }

    #[tokio::test]
    async fn test_timeout_clears_slot_and_next_request_succeeds() {
        let mut h = harness();

        let first = spawn_ping(&h, Duration::from_millis(50));
        next_request_id(&mut h).await;
        let result = first.await.unwrap();
        assert!(matches!(result, Err(Error::Timeout { kind: "pong", .. })));
        assert!(!h.correlator.is_pending(RequestKind::Pong));

        let second = spawn_ping(&h, Duration::from_secs(5));
        next_request_id(&mut h).await;
        h.correlator.complete(RequestKind::Pong, None, inventory());
        assert!(second.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_complete_without_slot_is_dropped() {
        let correlator = RequestCorrelator::new();
        assert!(!correlator.complete(RequestKind::TransferItems, None, inventory()));
    }

    #[tokio::test]
    async fn test_reissue_supersedes_earlier_caller() {
        let mut h = harness();

        let first = spawn_ping(&h, Duration::from_secs(5));
        next_request_id(&mut h).await;
        let second = spawn_ping(&h, Duration::from_secs(5));
        next_request_id(&mut h).await;

        h.correlator.complete(RequestKind::Pong, None, inventory());

        assert!(matches!(first.await.unwrap(), Err(Error::Timeout { .. })));
        assert!(second.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_echoed_request_id_must_match() {
        let mut h = harness();
        let task = spawn_ping(&h, Duration::from_secs(5));
        let request_id = next_request_id(&mut h).await;

        let stale = RequestId::generate();
        assert!(!h.correlator.complete(RequestKind::Pong, Some(stale), inventory()));
        assert!(h.correlator.is_pending(RequestKind::Pong));

        assert!(h.correlator.complete(RequestKind::Pong, Some(request_id), inventory()));
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_kinds_are_independent() {
        let mut h = harness();
        let ping = spawn_ping(&h, Duration::from_secs(5));
        next_request_id(&mut h).await;

        let correlator = Arc::clone(&h.correlator);
        let registry = Arc::clone(&h.registry);
        let transfer = tokio::spawn(async move {
            correlator
                .request(
                    &registry,
                    RequestKind::TransferItems,
                    OutboundMessage::ping,
                    Duration::from_secs(5),
                )
                .await
        });
        next_request_id(&mut h).await;
        assert_eq!(h.correlator.pending_count(), 2);

        h.correlator.complete(
            RequestKind::TransferItems,
            None,
            Reply::Transfer(TransferResult::default()),
        );
        assert!(matches!(
            transfer.await.unwrap(),
            Ok(Reply::Transfer(_))
        ));
        assert!(h.correlator.is_pending(RequestKind::Pong));

        h.correlator.complete(RequestKind::Pong, None, inventory());
        assert!(ping.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_superseded_caller_reports_time_waited() {
        let mut h = harness();
        let deadline = Duration::from_secs(30);

        let first = spawn_ping(&h, deadline);
        next_request_id(&mut h).await;
        let second = spawn_ping(&h, deadline);
        next_request_id(&mut h).await;

        match first.await.unwrap() {
            Err(Error::Timeout { kind, timeout_ms }) => {
                assert_eq!(kind, "pong");
                assert!(timeout_ms < 30_000);
            }
            other => panic!("expected Timeout, got {other:?}"),
        }

        h.correlator.complete(RequestKind::Pong, None, inventory());
        assert!(second.await.unwrap().is_ok());
    }

    #[test]
    fn test_millis_saturates() {
        assert_eq!(millis(Duration::from_millis(1500)), 1500);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }

    #[tokio::test]
    async fn test_send_on_closed_connection_cleans_up() {
        let correlator = RequestCorrelator::new();
        let registry = ConnectionRegistry::new();
        let (connection, outbound) = Connection::detached(1);
        registry.attach(connection);
        drop(outbound);

        let result = correlator
            .request(
                &registry,
                RequestKind::Pong,
                OutboundMessage::ping,
                Duration::from_secs(5),
            )
            .await;

        assert!(matches!(result, Err(Error::NotConnected)));
        assert!(!correlator.is_pending(RequestKind::Pong));
    }
}
