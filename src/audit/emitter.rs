//! Emits audit events through tracing.

use super::{AuditEvent, AuditTrail};

/// Emits audit events as structured `tracing` records.
///
/// Events go to the `recipe_audit` target so subscribers can route them
/// separately from diagnostic logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct AuditEmitter {
    _private: (),
}

impl AuditEmitter {
    /// Creates a new emitter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits an audit event through the tracing infrastructure.
    pub fn emit(&self, event: &AuditEvent) {
        tracing::info!(
            target: "recipe_audit",
            request_id = %event.request_id(),
            principal = ?event.principal(),
            kind = %event.kind(),
            resource = %event.resource(),
            action = %event.action(),
            verdict = %event.verdict(),
            target_id = ?event.target_id(),
            "audit event"
        );
    }

    /// Emits an audit event and also records it to `trail`.
    pub fn emit_and_record(&self, event: &AuditEvent, trail: &AuditTrail) {
        self.emit(event);
        trail.record(event.clone());
    }
}
