use std::sync::Arc;

use crate::invocation::{Invocation, ReceiverId};
use crate::types::MethodSig;

/// The append-only, queryable log of real calls for one execution context.
///
/// Histories are never shared between contexts; the engine keeps one recorder
/// per thread. Growth happens only through real (non-monitored) calls, and
/// shrinking only through [`reset`](InvocationRecorder::reset),
/// [`unrecord_last`](InvocationRecorder::unrecord_last), or a receiver purge
/// during a mock-level reset.
#[derive(Debug, Default)]
pub struct InvocationRecorder {
    history: Vec<Arc<Invocation>>,
    last: Option<Arc<Invocation>>,
}

impl InvocationRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        InvocationRecorder::default()
    }

    /// Appends an invocation to history and updates the last-invocation slot.
    pub fn record(&mut self, invocation: Arc<Invocation>) {
        self.last = Some(Arc::clone(&invocation));
        self.history.push(invocation);
    }

    /// Removes exactly the most recently appended entry.
    ///
    /// Used to strip a call that turned out to be a template rather than a
    /// real invocation. A no-op on an empty history; the last-invocation slot
    /// is kept so the stripped call's arguments remain available.
    pub fn unrecord_last(&mut self) {
        self.history.pop();
    }

    /// The most recently recorded invocation, stripped or not.
    #[must_use]
    pub fn last(&self) -> Option<&Arc<Invocation>> {
        self.last.as_ref()
    }

    /// All recorded invocations, in insertion order.
    #[must_use]
    pub fn history(&self) -> &[Arc<Invocation>] {
        &self.history
    }

    /// All entries for one (receiver, signature) pairing, in insertion order.
    #[must_use]
    pub fn query(&self, receiver: ReceiverId, sig: &MethodSig) -> Vec<Arc<Invocation>> {
        self.history
            .iter()
            .filter(|inv| inv.receiver() == receiver && inv.sig() == sig)
            .cloned()
            .collect()
    }

    /// Clears history and the last-invocation slot.
    pub fn reset(&mut self) {
        self.history.clear();
        self.last = None;
    }

    /// Removes every entry recorded against one receiver, clearing the
    /// last-invocation slot when it pointed at that receiver.
    pub fn purge_receiver(&mut self, receiver: ReceiverId) {
        self.history.retain(|inv| inv.receiver() != receiver);
        if self
            .last
            .as_ref()
            .is_some_and(|inv| inv.receiver() == receiver)
        {
            self.last = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TypeDesc, Value};

    fn ping_sig() -> MethodSig {
        MethodSig::new("ping", vec![TypeDesc::of::<i32>()], TypeDesc::of::<()>())
    }

    fn pong_sig() -> MethodSig {
        MethodSig::new("pong", vec![TypeDesc::of::<i32>()], TypeDesc::of::<()>())
    }

    fn call(receiver: u64, sig: MethodSig, n: i32) -> Arc<Invocation> {
        Arc::new(Invocation::new(
            ReceiverId::new(receiver),
            sig,
            vec![Value::of(n)],
        ))
    }

    #[test]
    fn test_record_preserves_insertion_order() {
        let mut rec = InvocationRecorder::new();
        rec.record(call(1, ping_sig(), 1));
        rec.record(call(1, pong_sig(), 2));
        rec.record(call(1, ping_sig(), 3));

        let pings = rec.query(ReceiverId::new(1), &ping_sig());
        assert_eq!(pings.len(), 2);
        assert_eq!(pings[0].args()[0].downcast_ref::<i32>(), Some(&1));
        assert_eq!(pings[1].args()[0].downcast_ref::<i32>(), Some(&3));
        assert_eq!(rec.history().len(), 3);
    }

    #[test]
    fn test_query_filters_by_receiver_and_sig() {
        let mut rec = InvocationRecorder::new();
        rec.record(call(1, ping_sig(), 1));
        rec.record(call(2, ping_sig(), 2));

        assert_eq!(rec.query(ReceiverId::new(1), &ping_sig()).len(), 1);
        assert_eq!(rec.query(ReceiverId::new(1), &pong_sig()).len(), 0);
        assert_eq!(rec.query(ReceiverId::new(3), &ping_sig()).len(), 0);
    }

    #[test]
    fn test_unrecord_last_removes_only_newest() {
        let mut rec = InvocationRecorder::new();
        rec.record(call(1, ping_sig(), 1));
        rec.record(call(1, ping_sig(), 2));

        rec.unrecord_last();
        let remaining = rec.query(ReceiverId::new(1), &ping_sig());
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].args()[0].downcast_ref::<i32>(), Some(&1));

        // the last-invocation slot still holds the stripped call's args
        assert_eq!(
            rec.last().unwrap().args()[0].downcast_ref::<i32>(),
            Some(&2)
        );
    }

    #[test]
    fn test_unrecord_last_on_empty_history_is_silent() {
        let mut rec = InvocationRecorder::new();
        rec.unrecord_last();
        assert!(rec.history().is_empty());
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut rec = InvocationRecorder::new();
        rec.record(call(1, ping_sig(), 1));
        rec.reset();
        assert!(rec.history().is_empty());
        assert!(rec.last().is_none());
    }

    #[test]
    fn test_purge_receiver_is_selective() {
        let mut rec = InvocationRecorder::new();
        rec.record(call(1, ping_sig(), 1));
        rec.record(call(2, ping_sig(), 2));
        rec.record(call(1, ping_sig(), 3));

        rec.purge_receiver(ReceiverId::new(1));
        assert_eq!(rec.history().len(), 1);
        assert_eq!(rec.query(ReceiverId::new(2), &ping_sig()).len(), 1);
        assert!(rec.last().is_none());
    }
}
