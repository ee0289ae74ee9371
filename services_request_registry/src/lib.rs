//! # Request Registry Service
//!
//! Correlates fire-and-forget outbound requests with the responses that
//! eventually come back, possibly out of order.
//!
//! ## Philosophy
//!
//! - **Correlate by id, not by kind**: Any number of requests of the same
//!   kind may be outstanding at once
//! - **Exactly once**: Every entry ends through one of response, timeout,
//!   cancellation or cleanup; whichever removes it from the map first wins
//! - **No answer is not an error**: Timeouts resolve the caller with `None`
//! - **Owned, not global**: Each host constructs its own registry
//!
//! ## Runtime
//!
//! Timeouts run as Tokio tasks, so requests must be sent from within a Tokio
//! runtime. Everything else is synchronous.

use core_types::RequestId;
use ipc::MessageKind;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

type PendingMap<R> = Arc<Mutex<HashMap<RequestId, PendingEntry<R>>>>;

struct PendingEntry<R> {
    kind: MessageKind,
    resolver: oneshot::Sender<Option<R>>,
    timeout: JoinHandle<()>,
}

impl<R> PendingEntry<R> {
    fn resolve(self, value: Option<R>) {
        self.timeout.abort();
        // The caller may have dropped its future.
        let _ = self.resolver.send(value);
    }
}

/// Registry of requests awaiting a response
///
/// Cloning yields another handle to the same registry.
pub struct RequestRegistry<R> {
    pending: PendingMap<R>,
}

impl<R> Clone for RequestRegistry<R> {
    fn clone(&self) -> Self {
        Self {
            pending: Arc::clone(&self.pending),
        }
    }
}

impl<R: Send + 'static> RequestRegistry<R> {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Sends a request and returns a future for its response
    ///
    /// `dispatch` is invoked once with the kind and the fresh request id. If
    /// it fails, the entry is discarded and the returned future resolves to
    /// `None` immediately. Otherwise the future resolves to the matching
    /// response, or to `None` once `timeout` elapses.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn send_request<F, E>(
        &self,
        kind: MessageKind,
        dispatch: F,
        timeout: Duration,
    ) -> PendingResponse<R>
    where
        F: FnOnce(MessageKind, &RequestId) -> Result<(), E>,
        E: fmt::Display,
    {
        let response = self.register(kind, timeout);
        if let Err(err) = dispatch(kind, &response.request_id) {
            warn!(
                request_id = %response.request_id,
                kind = %kind,
                error = %err,
                "request.dispatch_failed"
            );
            self.discard(&response.request_id);
        }
        response
    }

    /// Like [`send_request`](Self::send_request), but surfaces a dispatch
    /// failure to the caller instead of resolving `None`
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn try_send_request<F, E>(
        &self,
        kind: MessageKind,
        dispatch: F,
        timeout: Duration,
    ) -> Result<PendingResponse<R>, E>
    where
        F: FnOnce(MessageKind, &RequestId) -> Result<(), E>,
    {
        let response = self.register(kind, timeout);
        match dispatch(kind, &response.request_id) {
            Ok(()) => Ok(response),
            Err(err) => {
                self.discard(&response.request_id);
                Err(err)
            }
        }
    }

    /// Delivers a response
    ///
    /// Returns `false` when no request with this id is pending, which covers
    /// unknown ids, duplicates and responses arriving after a timeout.
    pub fn handle_response(&self, request_id: &RequestId, value: R) -> bool {
        let entry = self.pending.lock().remove(request_id);
        match entry {
            Some(entry) => {
                debug!(request_id = %request_id, kind = %entry.kind, "request.resolved");
                entry.resolve(Some(value));
                true
            }
            None => {
                debug!(request_id = %request_id, "request.unmatched_response");
                false
            }
        }
    }

    /// Gives up on a pending request, resolving its caller with `None`
    pub fn cancel(&self, request_id: &RequestId) -> bool {
        let entry = self.pending.lock().remove(request_id);
        match entry {
            Some(entry) => {
                debug!(request_id = %request_id, kind = %entry.kind, "request.cancelled");
                entry.resolve(None);
                true
            }
            None => false,
        }
    }

    /// Cancels every outstanding timer and drops every pending entry
    ///
    /// Outstanding callers resolve to `None`.
    pub fn cleanup(&self) {
        let drained: Vec<PendingEntry<R>> = {
            let mut pending = self.pending.lock();
            pending.drain().map(|(_, entry)| entry).collect()
        };
        if !drained.is_empty() {
            debug!(count = drained.len(), "request.cleanup");
        }
        for entry in drained {
            entry.resolve(None);
        }
    }

    /// Number of requests awaiting a response
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Checks whether a request is still awaiting a response
    pub fn is_pending(&self, request_id: &RequestId) -> bool {
        self.pending.lock().contains_key(request_id)
    }

    fn register(&self, kind: MessageKind, timeout: Duration) -> PendingResponse<R> {
        let request_id = RequestId::generate();
        let (resolver, receiver) = oneshot::channel();

        // Held across the spawn so the timer cannot observe the map before
        // its own entry is in it.
        let mut pending = self.pending.lock();
        let timer = tokio::spawn(expire(
            Arc::clone(&self.pending),
            request_id.clone(),
            timeout,
        ));
        pending.insert(
            request_id.clone(),
            PendingEntry {
                kind,
                resolver,
                timeout: timer,
            },
        );

        PendingResponse {
            request_id,
            receiver,
        }
    }

    fn discard(&self, request_id: &RequestId) {
        let entry = self.pending.lock().remove(request_id);
        if let Some(entry) = entry {
            entry.resolve(None);
        }
    }
}

impl<R: Send + 'static> Default for RequestRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Timeout in whole milliseconds, saturating at `u64::MAX`
fn timeout_millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}

async fn expire<R>(pending: PendingMap<R>, request_id: RequestId, timeout: Duration) {
    tokio::time::sleep(timeout).await;
    let entry = pending.lock().remove(&request_id);
    if let Some(entry) = entry {
        warn!(
            request_id = %request_id,
            kind = %entry.kind,
            timeout_ms = timeout_millis(timeout),
            "request.timeout"
        );
        // Dropping our own handle inside the task is fine; abort is a no-op.
        let _ = entry.resolver.send(None);
    }
}

/// Future for the response to one request
///
/// Resolves to `Some(response)` or to `None` when the request timed out, was
/// cancelled, or the registry was cleaned up.
#[derive(Debug)]
pub struct PendingResponse<R> {
    request_id: RequestId,
    receiver: oneshot::Receiver<Option<R>>,
}

impl<R> PendingResponse<R> {
    /// Id the request was dispatched with
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }
}

impl<R> Future for PendingResponse<R> {
    type Output = Option<R>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.receiver).poll(cx) {
            Poll::Ready(Ok(value)) => Poll::Ready(value),
            Poll::Ready(Err(_)) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::convert::Infallible;

    const TIMEOUT: Duration = Duration::from_millis(5);

    fn ok(_: MessageKind, _: &RequestId) -> Result<(), Infallible> {
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_response_resolves_request() {
        let registry: RequestRegistry<String> = RequestRegistry::new();
        let pending = registry.send_request(MessageKind::GetContent, ok, TIMEOUT);
        let id = pending.request_id().clone();

        assert!(registry.is_pending(&id));
        assert!(registry.handle_response(&id, "doc".to_string()));
        assert_eq!(pending.await, Some("doc".to_string()));
        assert_eq!(registry.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_receives_kind_and_id() {
        let registry: RequestRegistry<String> = RequestRegistry::new();
        let seen = RefCell::new(None);

        let pending = registry.send_request(
            MessageKind::GetContent,
            |kind, id| {
                *seen.borrow_mut() = Some((kind, id.clone()));
                Ok::<(), Infallible>(())
            },
            TIMEOUT,
        );

        let (kind, id) = seen.into_inner().unwrap();
        assert_eq!(kind, MessageKind::GetContent);
        assert_eq!(&id, pending.request_id());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_resolves_none_and_late_response_is_dropped() {
        let registry: RequestRegistry<String> = RequestRegistry::new();
        let pending = registry.send_request(MessageKind::GetContent, ok, TIMEOUT);
        let id = pending.request_id().clone();

        assert_eq!(pending.await, None);
        assert!(!registry.is_pending(&id));
        assert!(!registry.handle_response(&id, "late".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_response_returns_false() {
        let registry: RequestRegistry<u32> = RequestRegistry::new();
        let pending = registry.send_request(MessageKind::GetContent, ok, TIMEOUT);
        let id = pending.request_id().clone();

        assert!(registry.handle_response(&id, 1));
        assert!(!registry.handle_response(&id, 2));
        assert_eq!(pending.await, Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_response_cancels_timeout() {
        let registry: RequestRegistry<u32> = RequestRegistry::new();
        let pending = registry.send_request(MessageKind::GetContent, ok, TIMEOUT);
        let id = pending.request_id().clone();

        registry.handle_response(&id, 7);
        tokio::time::sleep(TIMEOUT * 4).await;
        assert_eq!(pending.await, Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_order_responses_same_kind() {
        let registry: RequestRegistry<&'static str> = RequestRegistry::new();
        let first = registry.send_request(MessageKind::GetContent, ok, TIMEOUT);
        let second = registry.send_request(MessageKind::GetContent, ok, TIMEOUT);
        assert_ne!(first.request_id(), second.request_id());
        assert_eq!(registry.pending_count(), 2);

        assert!(registry.handle_response(second.request_id(), "second"));
        assert!(registry.handle_response(first.request_id(), "first"));

        assert_eq!(first.await, Some("first"));
        assert_eq!(second.await, Some("second"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_id_returns_false() {
        let registry: RequestRegistry<u32> = RequestRegistry::new();
        assert!(!registry.handle_response(&RequestId::from_string("nope"), 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_resolves_none() {
        let registry: RequestRegistry<u32> = RequestRegistry::new();
        let pending = registry.send_request(MessageKind::GetContent, ok, Duration::from_secs(60));
        let id = pending.request_id().clone();

        assert!(registry.cancel(&id));
        assert!(!registry.cancel(&id));
        assert!(!registry.handle_response(&id, 3));
        assert_eq!(pending.await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_clears_everything() {
        let registry: RequestRegistry<u32> = RequestRegistry::new();
        let a = registry.send_request(MessageKind::GetContent, ok, Duration::from_secs(60));
        let b = registry.send_request(MessageKind::GetContent, ok, Duration::from_secs(60));
        let a_id = a.request_id().clone();

        registry.cleanup();

        assert_eq!(registry.pending_count(), 0);
        assert_eq!(a.await, None);
        assert_eq!(b.await, None);
        assert!(!registry.handle_response(&a_id, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_dispatch_resolves_none() {
        let registry: RequestRegistry<u32> = RequestRegistry::new();
        let pending = registry.send_request(
            MessageKind::GetContent,
            |_, _| Err("bridge closed"),
            Duration::from_secs(60),
        );

        assert_eq!(registry.pending_count(), 0);
        assert_eq!(pending.await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_try_send_surfaces_dispatch_error() {
        let registry: RequestRegistry<u32> = RequestRegistry::new();
        let result = registry.try_send_request(
            MessageKind::GetContent,
            |_, _| Err("bridge closed"),
            TIMEOUT,
        );

        assert!(matches!(result, Err("bridge closed")));
        assert_eq!(registry.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_independent_registries() {
        let one: RequestRegistry<u32> = RequestRegistry::new();
        let two: RequestRegistry<u32> = RequestRegistry::new();
        let pending = one.send_request(MessageKind::GetContent, ok, TIMEOUT);

        assert!(!two.handle_response(pending.request_id(), 1));
        assert_eq!(one.pending_count(), 1);
        assert_eq!(two.pending_count(), 0);
        one.cleanup();
    }

    #[tokio::test(start_paused = true)]
    async fn test_clone_shares_entries() {
        let registry: RequestRegistry<u32> = RequestRegistry::new();
        let handle = registry.clone();
        let pending = registry.send_request(MessageKind::GetContent, ok, TIMEOUT);

        assert!(handle.handle_response(pending.request_id(), 9));
        assert_eq!(pending.await, Some(9));
    }

    #[test]
    fn test_timeout_millis_saturates() {
        assert_eq!(timeout_millis(Duration::from_millis(250)), 250);
        assert_eq!(timeout_millis(Duration::MAX), u64::MAX);
    }
}
