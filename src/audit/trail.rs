//! In-memory audit trail recorder.

use parking_lot::Mutex;

use super::AuditEvent;

/// In-memory recorder for audit events.
///
/// The trail is `Sync`, so one instance can be shared by concurrent requests.
/// Production deployments forward events from the `recipe_audit` tracing
/// target instead.
///
/// # Example
///
/// ```
/// use recipe_policy::audit::{AuditEvent, AuditTrail};
/// use recipe_policy::{Action, ResourceKind, Verdict};
///
/// let trail = AuditTrail::new();
/// trail.record(AuditEvent::new(
///     "req-123",
///     None,
///     ResourceKind::Recipe,
///     Action::List,
///     Verdict::Allow,
/// ));
///
/// assert_eq!(trail.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct AuditTrail {
    events: Mutex<Vec<AuditEvent>>,
}

impl AuditTrail {
    /// Creates a new empty audit trail.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an audit event.
    ///
    /// Events are stored in the order they are recorded.
    pub fn record(&self, event: AuditEvent) {
        self.events.lock().push(event);
    }

    /// Returns a snapshot of all recorded events.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    /// Returns the number of recorded events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns true if no events have been recorded.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Clears all recorded events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::gate::Verdict;
    use crate::policy::{Action, ResourceKind};
    use crate::request::UserId;

    fn event(request_id: &str) -> AuditEvent {
        AuditEvent::new(
            request_id,
            Some(UserId(1)),
            ResourceKind::Ingredient,
            Action::Create,
            Verdict::Allow,
        )
    }

    #[test]
    fn audit_trail_starts_empty() {
        let trail = AuditTrail::new();
        assert!(trail.is_empty());
        assert_eq!(trail.len(), 0);
    }

    #[test]
    fn audit_trail_records_in_order() {
        let trail = AuditTrail::new();
        trail.record(event("req-1"));
        trail.record(event("req-2"));

        let events = trail.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].request_id(), "req-1");
        assert_eq!(events[1].request_id(), "req-2");
    }

    #[test]
    fn audit_trail_can_be_cleared() {
        let trail = AuditTrail::new();
        trail.record(event("req-1"));
        trail.clear();
        assert!(trail.is_empty());
    }

    #[test]
    fn audit_trail_is_shared_across_threads() {
        let trail = Arc::new(AuditTrail::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let trail = Arc::clone(&trail);
                thread::spawn(move || trail.record(event(&format!("req-{}", i))))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(trail.len(), 4);
    }
}
