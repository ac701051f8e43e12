use crate::error::Violation;
use crate::model::RecipeId;
use crate::request::{Principal, RequestMeta, UserId};

/// Per-request caller context, threaded explicitly through every operation.
///
/// There is no ambient "current user": everything the core knows about the
/// caller arrives in this value.
///
/// # Examples
///
/// ```
/// use recipe_policy::{PrincipalContext, Principal, RequestMeta};
///
/// let ctx = PrincipalContext::from(RequestMeta::new("req-1", Principal::user(7)));
/// assert_eq!(ctx.request_id(), "req-1");
/// assert!(ctx.principal().is_authenticated);
/// ```
#[derive(Debug, Clone)]
pub struct PrincipalContext {
    request_id: String,
    principal: Principal,
}

impl PrincipalContext {
    /// Creates a context for `principal` within request `request_id`.
    pub fn new(request_id: impl Into<String>, principal: Principal) -> Self {
        Self {
            request_id: request_id.into(),
            principal,
        }
    }

    /// Returns the request ID for this context.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Returns the caller.
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Returns the caller's account id, or `Unauthenticated`.
    pub fn require_authenticated(&self) -> Result<UserId, Violation> {
        self.principal
            .authenticated_id()
            .ok_or_else(|| Violation::unauthenticated("Authentication credentials were not provided"))
    }
}

impl From<RequestMeta> for PrincipalContext {
    fn from(meta: RequestMeta) -> Self {
        Self::new(meta.request_id, meta.principal)
    }
}

/// The parent recipe a nested comment route is scoped to.
///
/// Derived from the request path, never from the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeContext {
    parent: RecipeId,
}

impl ScopeContext {
    /// Scopes an operation to recipe `parent`.
    pub fn new(parent: RecipeId) -> Self {
        Self { parent }
    }

    /// Returns the parent recipe.
    pub fn parent(&self) -> RecipeId {
        self.parent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ViolationKind;

    #[test]
    fn anonymous_context_requires_authentication() {
        let ctx = PrincipalContext::new("req-1", Principal::anonymous());
        let err = ctx.require_authenticated().unwrap_err();
        assert_eq!(err.kind, ViolationKind::Unauthenticated);
    }

    #[test]
    fn authenticated_context_yields_id() {
        let ctx = PrincipalContext::new("req-2", Principal::user(9));
        assert_eq!(ctx.require_authenticated().unwrap(), UserId(9));
    }

    #[test]
    fn scope_carries_parent() {
        assert_eq!(ScopeContext::new(RecipeId(5)).parent(), RecipeId(5));
    }
}
