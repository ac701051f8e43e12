//! Audit event schema and types.

use std::fmt;

use crate::gate::Verdict;
use crate::policy::{Action, ResourceKind};
use crate::request::UserId;

/// Kind of audit event being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditEventKind {
    /// A read of a collection or single object
    Access,
    /// A change of stored state
    Mutation,
    /// Access to the caller's own profile
    SelfService,
}

impl AuditEventKind {
    fn for_action(action: Action) -> Self {
        if action.is_mutation() {
            AuditEventKind::Mutation
        } else if action == Action::Me {
            AuditEventKind::SelfService
        } else {
            AuditEventKind::Access
        }
    }
}

impl fmt::Display for AuditEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditEventKind::Access => write!(f, "access"),
            AuditEventKind::Mutation => write!(f, "mutation"),
            AuditEventKind::SelfService => write!(f, "self_service"),
        }
    }
}

/// A structured record of one access decision.
///
/// # Example
///
/// ```
/// use recipe_policy::audit::{AuditEvent, AuditEventKind};
/// use recipe_policy::{Action, ResourceKind, UserId, Verdict};
///
/// let event = AuditEvent::new(
///     "req-123",
///     Some(UserId(7)),
///     ResourceKind::Comment,
///     Action::Destroy,
///     Verdict::Allow,
/// )
/// .with_target_id(42);
///
/// assert_eq!(event.kind(), AuditEventKind::Mutation);
/// assert_eq!(event.target_id(), Some(42));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    /// Request identifier for correlation
    request_id: String,
    /// Authenticated caller, `None` for anonymous requests
    principal: Option<UserId>,
    kind: AuditEventKind,
    resource: ResourceKind,
    action: Action,
    verdict: Verdict,
    /// Identifier of the object acted on
    target_id: Option<u64>,
}

impl AuditEvent {
    /// Creates a new audit event with required fields.
    pub fn new(
        request_id: impl Into<String>,
        principal: Option<UserId>,
        resource: ResourceKind,
        action: Action,
        verdict: Verdict,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            principal,
            kind: AuditEventKind::for_action(action),
            resource,
            action,
            verdict,
            target_id: None,
        }
    }

    /// Sets the identifier of the object acted on.
    pub fn with_target_id(mut self, id: u64) -> Self {
        self.target_id = Some(id);
        self
    }

    /// Returns the request identifier.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Returns the principal, if authenticated.
    pub fn principal(&self) -> Option<UserId> {
        self.principal
    }

    /// Returns the event kind.
    pub fn kind(&self) -> AuditEventKind {
        self.kind
    }

    /// Returns the resource kind.
    pub fn resource(&self) -> ResourceKind {
        self.resource
    }

    /// Returns the action.
    pub fn action(&self) -> Action {
        self.action
    }

    /// Returns the decision.
    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    /// Returns the target identifier, if set.
    pub fn target_id(&self) -> Option<u64> {
        self.target_id
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AuditEvent[kind={}, verdict={}, request_id={}, principal=",
            self.kind, self.verdict, self.request_id
        )?;
        match self.principal {
            Some(id) => write!(f, "{}", id)?,
            None => write!(f, "<anonymous>")?,
        }
        write!(f, ", {} {}", self.action, self.resource)?;
        if let Some(id) = self.target_id {
            write!(f, ", target_id={}", id)?;
        }
        write!(f, "]")
    }
}
