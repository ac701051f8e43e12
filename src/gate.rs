//! The access decision engine and the gate that enforces it.
//!
//! [`decide`] is a pure function of `(kind, action, principal, target)`.
//! [`AccessGate`] wraps it for a request: it logs and audits the verdict and
//! turns an allow into a [`Grant`], which every mutation requires.

use std::fmt;

use crate::audit::{AuditEmitter, AuditEvent, AuditTrail};
use crate::capability::Grant;
use crate::context::PrincipalContext;
use crate::error::Violation;
use crate::policy::{requirement_for, Action, Requirement, ResourceKind};
use crate::request::{Principal, UserId};

/// Ownership facts about the object an action targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    /// Identifier of the object, for auditing
    pub id: Option<u64>,
    /// Owner of the object; `None` when it has none (e.g. creator removed)
    pub owner: Option<UserId>,
}

impl Target {
    /// Describes object `id` owned by `owner`.
    pub fn new(id: u64, owner: Option<UserId>) -> Self {
        Self {
            id: Some(id),
            owner,
        }
    }

    fn is_owned_by(&self, principal: &Principal) -> bool {
        self.owner == Some(principal.id)
    }
}

/// The outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The action may proceed
    Allow,
    /// The action needs a principal and the caller is anonymous
    Unauthenticated,
    /// The caller lacks the required capability
    Forbidden,
}

impl Verdict {
    /// True for [`Verdict::Allow`].
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allow)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Allow => write!(f, "allow"),
            Verdict::Unauthenticated => write!(f, "unauthenticated"),
            Verdict::Forbidden => write!(f, "forbidden"),
        }
    }
}

/// Decides whether `principal` may perform `action` on a `kind` resource.
///
/// `target` is the object acted on, when there is one. Owner requirements
/// without a target are refused.
///
/// # Examples
///
/// ```
/// use recipe_policy::{decide, Action, Principal, ResourceKind, Target, UserId, Verdict};
///
/// let recipe = Target::new(1, Some(UserId(10)));
///
/// assert_eq!(
///     decide(ResourceKind::Recipe, Action::Retrieve, &Principal::anonymous(), Some(&recipe)),
///     Verdict::Allow,
/// );
/// assert_eq!(
///     decide(ResourceKind::Recipe, Action::Update, &Principal::user(11), Some(&recipe)),
///     Verdict::Forbidden,
/// );
/// ```
pub fn decide(
    kind: ResourceKind,
    action: Action,
    principal: &Principal,
    target: Option<&Target>,
) -> Verdict {
    evaluate(requirement_for(kind, action), principal, target)
}

/// Evaluates a single requirement.
fn evaluate(requirement: Requirement, principal: &Principal, target: Option<&Target>) -> Verdict {
    let owns = target.is_some_and(|t| t.is_owned_by(principal));

    match requirement {
        Requirement::Public => Verdict::Allow,
        Requirement::AuthenticatedAny => {
            if principal.is_authenticated {
                Verdict::Allow
            } else {
                Verdict::Unauthenticated
            }
        }
        // Ownership mismatch is forbidden whether or not the caller is authenticated.
        Requirement::OwnerOnly => {
            if !owns {
                Verdict::Forbidden
            } else if !principal.is_authenticated {
                Verdict::Unauthenticated
            } else {
                Verdict::Allow
            }
        }
        Requirement::OwnerOrAdmin => {
            if !principal.is_authenticated {
                Verdict::Unauthenticated
            } else if owns || principal.is_effective_admin() {
                Verdict::Allow
            } else {
                Verdict::Forbidden
            }
        }
        Requirement::AdminOnly => {
            if !principal.is_authenticated {
                Verdict::Unauthenticated
            } else if principal.is_effective_admin() {
                Verdict::Allow
            } else {
                Verdict::Forbidden
            }
        }
        Requirement::SystemOnly => {
            if principal.is_authenticated {
                Verdict::Forbidden
            } else {
                Verdict::Unauthenticated
            }
        }
    }
}

/// The policy enforcement gate of one request.
///
/// `AccessGate::check` is the only way to obtain a [`Grant`].
///
/// # Examples
///
/// ```
/// use recipe_policy::{AccessGate, Action, Principal, PrincipalContext, ResourceKind};
///
/// let ctx = PrincipalContext::new("req-1", Principal::user(3));
/// let grant = AccessGate::new(&ctx)
///     .check(ResourceKind::Recipe, Action::Create, None)
///     .expect("authenticated users may create recipes");
///
/// assert_eq!(grant.principal().map(|p| p.id.0), Some(3));
/// ```
pub struct AccessGate<'a> {
    ctx: &'a PrincipalContext,
    trail: Option<&'a AuditTrail>,
}

impl<'a> AccessGate<'a> {
    /// Creates a gate for the request described by `ctx`.
    pub fn new(ctx: &'a PrincipalContext) -> Self {
        Self { ctx, trail: None }
    }

    /// Records every decision of this gate into `trail` as well.
    pub fn with_trail(mut self, trail: &'a AuditTrail) -> Self {
        self.trail = Some(trail);
        self
    }

    /// Checks `action` on `kind` and returns the grant proving it was allowed.
    ///
    /// # Errors
    ///
    /// Returns an `Unauthenticated` or `Forbidden` violation when refused.
    pub fn check(
        &self,
        kind: ResourceKind,
        action: Action,
        target: Option<&Target>,
    ) -> Result<Grant, Violation> {
        let principal = self.ctx.principal();
        let verdict = decide(kind, action, principal, target);

        let mut event = AuditEvent::new(
            self.ctx.request_id(),
            principal.authenticated_id(),
            kind,
            action,
            verdict,
        );
        if let Some(id) = target.and_then(|t| t.id) {
            event = event.with_target_id(id);
        }
        let emitter = AuditEmitter::new();
        match self.trail {
            Some(trail) => emitter.emit_and_record(&event, trail),
            None => emitter.emit(&event),
        }

        match verdict {
            Verdict::Allow => {
                tracing::debug!(
                    request_id = %self.ctx.request_id(),
                    resource = %kind,
                    action = %action,
                    "access granted"
                );
                Ok(Grant::new(kind, action, *principal, target.and_then(|t| t.id)))
            }
            Verdict::Unauthenticated => {
                tracing::warn!(
                    request_id = %self.ctx.request_id(),
                    resource = %kind,
                    action = %action,
                    "access refused: unauthenticated"
                );
                Err(Violation::unauthenticated(
                    "Authentication credentials were not provided",
                ))
            }
            Verdict::Forbidden => {
                tracing::warn!(
                    request_id = %self.ctx.request_id(),
                    principal = ?principal.authenticated_id(),
                    resource = %kind,
                    action = %action,
                    "access refused: forbidden"
                );
                Err(Violation::forbidden(
                    action.as_str(),
                    format!("You do not have permission to {} this {}", action, kind),
                ))
            }
        }
    }
}
