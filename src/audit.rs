//! Audit trail of access decisions.
//!
//! This module provides:
//! - `AuditEvent`: Structured record of one gate decision
//! - `AuditTrail`: In-memory, thread-safe event recorder
//! - `AuditEmitter`: Emits events through `tracing`
//!
//! Audit events hold identifiers only. Payloads, comment bodies and
//! profile details never reach the trail.

mod emitter;
mod event;
mod trail;

pub use emitter::AuditEmitter;
pub use event::{AuditEvent, AuditEventKind};
pub use trail::AuditTrail;
